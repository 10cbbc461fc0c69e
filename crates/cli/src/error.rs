//! CLI error types.

use thiserror::Error;

/// Errors the commands report to the user directly.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file not found
    #[error("configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Directory section required but absent
    #[error("configuration has no [directory] section; required unless running with --mock")]
    DirectoryRequired,
}
