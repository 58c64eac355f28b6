//! Error types for catalog-cli

use catalog_core::staging::SinkError;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from catalog-core
    #[error(transparent)]
    Core(#[from] catalog_core::Error),

    /// The staging sink could not be opened
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON output could not be rendered
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A bulk job finished with failed items
    #[error("{failed} of {total} items failed")]
    JobFailed { failed: usize, total: usize },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
