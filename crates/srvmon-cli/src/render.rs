//! Terminal rendering of health and readiness views.
//!
//! Everything here builds strings; nothing writes to the terminal.

use crate::client::FetchError;
use crate::view::{CheckView, HealthView, ReadinessView};
use std::fmt::Write as _;
use std::time::SystemTime;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const BG_RED: &str = "\x1b[41m";
pub const BG_GREEN: &str = "\x1b[42m";
pub const BG_YELLOW: &str = "\x1b[43m";
pub const BG_CYAN: &str = "\x1b[46m";

pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
pub const HIDE_CURSOR: &str = "\x1b[?25l";
pub const SHOW_CURSOR: &str = "\x1b[?25h";
pub const MOVE_HOME: &str = "\x1b[H";

/// Colored dot and label for a check status
pub fn status_icon(status: &str) -> (String, String) {
    let (color, label) = match status {
        "STATUS_UP" => (GREEN, "UP"),
        "STATUS_DOWN" => (RED, "DOWN"),
        "STATUS_DEGRADED" => (YELLOW, "DEGRADED"),
        _ => (DIM, "UNKNOWN"),
    };
    (format!("{color}●{RESET}"), format!("{color}{label}{RESET}"))
}

/// Background badge for an overall status
pub fn status_badge(status: &str) -> String {
    let (background, label) = match status {
        "STATUS_UP" => (BG_GREEN, "UP"),
        "STATUS_DOWN" => (BG_RED, "DOWN"),
        "STATUS_DEGRADED" => (BG_YELLOW, "DEGRADED"),
        _ => (BG_CYAN, "UNKNOWN"),
    };
    format!("{background}{BOLD} {label} {RESET}")
}

pub fn ready_badge(ready: bool) -> String {
    if ready {
        format!("{BG_GREEN}{BOLD} READY {RESET}")
    } else {
        format!("{BG_RED}{BOLD} NOT READY {RESET}")
    }
}

/// Wall-clock `HH:MM:SS` (UTC) for the footer
pub fn clock(now: SystemTime) -> String {
    let stamp = humantime::format_rfc3339_seconds(now).to_string();
    stamp.get(11..19).unwrap_or_default().to_string()
}

fn header(out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{BOLD}{CYAN}  srvmon{RESET}{DIM} · service health monitor{RESET}");
    let _ = writeln!(out, "{DIM}  {}{RESET}", "─".repeat(48));
}

fn checks_tree(out: &mut String, checks: &[CheckView]) {
    let width = checks
        .iter()
        .map(|check| check.name.chars().count())
        .max()
        .unwrap_or(0);

    for (i, check) in checks.iter().enumerate() {
        let last = i + 1 == checks.len();
        let connector = if last { "└" } else { "├" };
        let (icon, label) = status_icon(&check.status);

        let _ = write!(
            out,
            "  {DIM}{connector}──{RESET} {BOLD}{:<width$}{RESET}  {icon} {label}",
            check.name
        );
        if !check.message.is_empty() {
            let _ = write!(out, "  {DIM}{}{RESET}", check.message);
        }
        let _ = writeln!(out);

        if let Some(error) = check.error.as_deref().filter(|e| !e.is_empty()) {
            let rail = if last { " " } else { "│" };
            let _ = writeln!(out, "  {DIM}{rail}{RESET}     {RED}{error}{RESET}");
        }
    }
}

fn health_section(out: &mut String, health: &HealthView) {
    let _ = write!(
        out,
        "\n  {BOLD}HEALTH{RESET}  Health: {}",
        status_badge(&health.status)
    );
    if !health.version.is_empty() {
        let _ = write!(out, "  {DIM}{}{RESET}", health.version);
    }
    let _ = writeln!(out);
    let _ = writeln!(out);
    checks_tree(out, &health.checks);
}

fn readiness_section(out: &mut String, readiness: &ReadinessView) {
    let _ = write!(
        out,
        "\n  {BOLD}READY{RESET}  Readiness: {}",
        ready_badge(readiness.ready)
    );
    if !readiness.ready && !readiness.reason.is_empty() {
        let _ = write!(out, "  {DIM}{}{RESET}", readiness.reason);
    }
    let _ = writeln!(out);
}

/// Health section on its own
pub fn render_health(health: &HealthView) -> String {
    let mut out = String::new();
    health_section(&mut out, health);
    out.push('\n');
    out
}

/// Readiness section on its own
pub fn render_ready(readiness: &ReadinessView) -> String {
    let mut out = String::new();
    readiness_section(&mut out, readiness);
    out.push('\n');
    out
}

/// One-line error for an address that did not answer
pub fn render_unreachable(addr: &str, error: &FetchError) -> String {
    format!("{RED}● Cannot reach {addr}{RESET}\n  {error}{RESET}\n")
}

/// Full dashboard frame: header, health tree, readiness and footer.
///
/// The frame is built in one piece so watch mode can repaint without
/// flicker. A readiness failure only drops that section.
pub fn render_frame(
    addr: &str,
    health: &Result<HealthView, FetchError>,
    readiness: Option<&ReadinessView>,
    now: SystemTime,
) -> String {
    let mut out = String::new();
    header(&mut out);

    match health {
        Ok(health) => health_section(&mut out, health),
        Err(error) if error.is_unreachable() => {
            let _ = writeln!(out, "\n  {RED}●{RESET}  Cannot reach {BOLD}{addr}{RESET}");
            let _ = writeln!(out, "     {DIM}{error}{RESET}\n");
            let _ = writeln!(out, "{DIM}  retrying...{RESET}");
            return out;
        }
        Err(error) => {
            let _ = writeln!(out, "\n  {RED}{error}{RESET}");
            return out;
        }
    }

    if let Some(readiness) = readiness {
        readiness_section(&mut out, readiness);
    }

    let _ = writeln!(out, "\n  {DIM}{}{RESET}", clock(now));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn check(name: &str, status: &str, message: &str, error: Option<&str>) -> CheckView {
        CheckView {
            name: name.to_string(),
            status: status.to_string(),
            message: message.to_string(),
            error: error.map(str::to_string),
            ..CheckView::default()
        }
    }

    fn degraded() -> HealthView {
        HealthView {
            status: "STATUS_DEGRADED".to_string(),
            version: "1.2.0".to_string(),
            checks: vec![
                check("redis", "STATUS_UP", "connection successful", None),
                check("metrics", "STATUS_DOWN", "connection failed", Some("dial tcp: refused")),
            ],
            ..HealthView::default()
        }
    }

    #[test]
    fn test_badges() {
        assert!(status_badge("STATUS_UP").contains(" UP "));
        assert!(status_badge("STATUS_DOWN").starts_with(BG_RED));
        assert!(status_badge("STATUS_DEGRADED").contains(" DEGRADED "));
        assert!(status_badge("STATUS_SOMETHING").contains(" UNKNOWN "));

        assert!(ready_badge(true).contains(" READY "));
        assert!(ready_badge(false).contains(" NOT READY "));
    }

    #[test]
    fn test_status_icon() {
        let (icon, label) = status_icon("STATUS_DOWN");
        assert_eq!(icon, format!("{RED}●{RESET}"));
        assert_eq!(label, format!("{RED}DOWN{RESET}"));

        let (_, label) = status_icon("");
        assert!(label.contains("UNKNOWN"));
    }

    #[test]
    fn test_health_tree() {
        let out = render_health(&degraded());
        let lines: Vec<&str> = out.lines().collect();

        assert!(out.contains(" DEGRADED "));
        assert!(out.contains("1.2.0"));

        let redis = lines.iter().find(|l| l.contains("redis")).unwrap();
        assert!(redis.contains("├──"));
        // Names are padded to the longest one
        assert!(redis.contains(&format!("{BOLD}redis  {RESET}")));

        let metrics = lines.iter().position(|l| l.contains("metrics")).unwrap();
        assert!(lines[metrics].contains("└──"));
        assert!(lines[metrics].contains("connection failed"));
        assert!(lines[metrics + 1].contains(&format!("{RED}dial tcp: refused{RESET}")));
        assert!(!lines[metrics + 1].contains('│'));
    }

    #[test]
    fn test_error_rail_on_inner_check() {
        let health = HealthView {
            checks: vec![
                check("a", "STATUS_DOWN", "", Some("boom")),
                check("b", "STATUS_UP", "", None),
            ],
            ..HealthView::default()
        };
        let out = render_health(&health);
        let error_line = out.lines().find(|l| l.contains("boom")).unwrap();
        assert!(error_line.contains('│'));
    }

    #[test]
    fn test_readiness_reason_only_when_not_ready() {
        let not_ready = ReadinessView {
            ready: false,
            reason: "service is not ready".to_string(),
            ..ReadinessView::default()
        };
        assert!(render_ready(&not_ready).contains("service is not ready"));

        let ready = ReadinessView {
            ready: true,
            reason: "stale".to_string(),
            ..ReadinessView::default()
        };
        assert!(!render_ready(&ready).contains("stale"));
    }

    #[test]
    fn test_frame_includes_footer_clock() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(3600 + 2 * 60 + 3);
        let readiness = ReadinessView {
            ready: true,
            ..ReadinessView::default()
        };
        let frame = render_frame("localhost:8080", &Ok(degraded()), Some(&readiness), now);

        assert!(frame.contains("srvmon"));
        assert!(frame.contains(" READY "));
        assert!(frame.contains("01:02:03"));
    }

    #[test]
    fn test_frame_with_server_error() {
        let error = FetchError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "dependency check: probe misconfigured".to_string(),
        };
        let frame = render_frame("localhost:8080", &Err(error), None, SystemTime::now());

        assert!(frame.contains("503 Service Unavailable: dependency check: probe misconfigured"));
        assert!(!frame.contains("Readiness"));
    }

    #[test]
    fn test_clock() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(23 * 3600 + 59 * 60 + 58);
        assert_eq!(clock(now), "23:59:58");
    }
}
