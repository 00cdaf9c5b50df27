use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "srvmon-cli",
    version,
    about = "CLI client for srvmon service health monitoring",
    long_about = "Query srvmon HTTP endpoints and display service health and readiness status."
)]
pub struct Cli {
    /// srvmon HTTP address
    #[arg(short, long, global = true, default_value = "localhost:8080")]
    pub addr: String,

    /// Request timeout
    #[arg(short, long, global = true, default_value = "3s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Continuously poll and update in place
    #[arg(short, long)]
    pub watch: bool,

    /// Poll interval (with --watch)
    #[arg(short, long, default_value = "2s", value_parser = humantime::parse_duration)]
    pub interval: Duration,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    #[command(about = "Show only health status")]
    Health,

    #[command(about = "Show only readiness status")]
    Ready,
}
