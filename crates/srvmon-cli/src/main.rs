//! srvmon-cli binary

use anyhow::Context;
use clap::Parser;
use srvmon_cli::render::{
    CLEAR_SCREEN, HIDE_CURSOR, MOVE_HOME, SHOW_CURSOR, render_frame, render_health, render_ready,
    render_unreachable,
};
use srvmon_cli::{Cli, Client, Command};
use std::io::Write;
use std::process::ExitCode;
use std::time::{Duration, SystemTime};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    common::logging::init("warn");

    let client = Client::new(cli.addr.as_str(), cli.timeout).context("build HTTP client")?;

    match cli.command {
        Some(Command::Health) => match client.health().await {
            Ok(health) => print(&render_health(&health))?,
            Err(e) if e.is_unreachable() => {
                eprint!("{}", render_unreachable(client.addr(), &e));
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e).context("fetch health"),
        },
        Some(Command::Ready) => match client.ready().await {
            Ok(readiness) => print(&render_ready(&readiness))?,
            Err(e) if e.is_unreachable() => {
                eprint!("{}", render_unreachable(client.addr(), &e));
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e).context("fetch readiness"),
        },
        None if cli.watch => watch(&client, cli.interval).await?,
        None => {
            let (frame, reachable) = dashboard(&client).await;
            print(&frame)?;
            if !reachable {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Render one dashboard frame; the flag is false when `/health` is unreachable
async fn dashboard(client: &Client) -> (String, bool) {
    let health = client.health().await;
    let readiness = match &health {
        Ok(_) => client.ready().await.ok(),
        Err(_) => None,
    };
    let reachable = !matches!(&health, Err(e) if e.is_unreachable());

    let frame = render_frame(client.addr(), &health, readiness.as_ref(), SystemTime::now());
    (frame, reachable)
}

/// Repaint the dashboard every `interval` until Ctrl-C
async fn watch(client: &Client, interval: Duration) -> anyhow::Result<()> {
    print(&format!("{HIDE_CURSOR}{CLEAR_SCREEN}"))?;

    let mut ticker = tokio::time::interval(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            _ = ticker.tick() => {
                let (frame, _) = dashboard(client).await;
                if let Err(e) = print(&format!("{MOVE_HOME}{CLEAR_SCREEN}{frame}")) {
                    break Err(e);
                }
            }
        }
    };

    print(SHOW_CURSOR)?;
    result
}

fn print(text: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
