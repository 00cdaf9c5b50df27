//! Lenient views of the srvmon REST payloads.
//!
//! Every field is optional and statuses stay strings, so a newer or older
//! server still renders.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckView {
    pub name: String,
    pub status: String,
    pub message: String,
    pub error: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthView {
    pub status: String,
    pub version: String,
    pub checks: Vec<CheckView>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReadinessView {
    pub ready: bool,
    pub reason: String,
    pub checks: Vec<CheckView>,
    pub timestamp: String,
}
