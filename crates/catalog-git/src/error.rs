//! Error types for catalog-git

use std::path::PathBuf;

/// Result type for catalog-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in catalog-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] catalog_fs::Error),

    #[error("Repository at {path} has no work tree")]
    BareRepository { path: PathBuf },

    #[error("Path {path} is not valid UTF-8")]
    NonUtf8Path { path: PathBuf },
}
