//! Error types for catalog-core
//!
//! [`Error`] covers failures of whole operations (loading configuration,
//! listing a collaborator's records). Per-entity and per-item failures have
//! their own types ([`crate::normalize::NormalizeError`],
//! [`crate::classify::ConsistencyError`], [`crate::bulk::ItemError`]) and are
//! folded into results instead of being returned as `Err`.

use std::path::PathBuf;

use crate::collab::{CatalogError, StoreError};

/// Result type for catalog-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in catalog-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file could not be parsed
    #[error("Invalid configuration at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// Unrecognised entity type name
    #[error("Unknown entity type: {value}")]
    UnknownEntityType { value: String },

    /// Unrecognised sync state name
    #[error("Unknown sync state: {value}")]
    UnknownSyncState { value: String },

    /// Unrecognised bulk operation name
    #[error("Unknown bulk operation: {value}")]
    UnknownOperation { value: String },

    /// The remote catalog could not serve a listing
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The local store could not serve a listing
    #[error(transparent)]
    Store(#[from] StoreError),

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from catalog-fs
    #[error(transparent)]
    Fs(#[from] catalog_fs::Error),

    /// Git error from catalog-git
    #[error(transparent)]
    Git(#[from] catalog_git::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}
