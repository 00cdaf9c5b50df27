//! srvmon-cli: terminal client for the srvmon REST endpoints.

pub mod cli;
pub mod client;
pub mod render;
pub mod view;

pub use cli::{Cli, Command};
pub use client::{Client, FetchError};
