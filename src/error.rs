//! Error taxonomy for the scanning and monitoring core
//!
//! Only input-validation failures surface to callers; per-probe and
//! per-tick failures are absorbed and reflected as status or absence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LanwatchError {
    #[error("invalid network range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("invalid threshold configuration: {0}")]
    InvalidThreshold(String),

    #[error("network interface error: {0}")]
    Interface(String),
}

impl LanwatchError {
    pub fn invalid_range(range: impl Into<String>, reason: impl Into<String>) -> Self {
        LanwatchError::InvalidRange {
            range: range.into(),
            reason: reason.into(),
        }
    }
}
