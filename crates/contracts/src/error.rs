//! Layered error definitions
//!
//! Grouped by source: config / directory / transport / sink

use thiserror::Error;

/// Unified error type shared across crates
#[derive(Debug, Error)]
pub enum ContractError {
    /// Configuration could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Configuration parsed but carries inconsistent values
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Coordinate resolution failed for an anchor id
    #[error("anchor resolution failed for '{anchor_id}': {message}")]
    AnchorResolution { anchor_id: String, message: String },

    /// Incoming payload could not be decoded
    #[error("payload decode error: {0}")]
    PayloadDecode(String),

    /// A sink could not be built, written to, or closed
    #[error("sink '{name}': {message}")]
    Sink { name: String, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create a configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an anchor resolution error
    pub fn anchor_resolution(anchor_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AnchorResolution {
            anchor_id: anchor_id.into(),
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sink {
            name: name.into(),
            message: message.into(),
        }
    }
}
