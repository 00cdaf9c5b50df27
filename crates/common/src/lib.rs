//! Common utilities and types shared across srvmon crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
