//! Per-item failures of a bulk job

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collab::{CatalogError, StoreError};
use crate::staging::EmitError;

/// Classification of an item failure, used for summaries and retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Stale,
    ConcurrentModification,
    Validation,
    Serialization,
    RemoteUnavailable,
    Timeout,
    LocalStore,
    Staging,
}

impl FailureKind {
    /// Whether retrying the item unchanged can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable | Self::Timeout | Self::ConcurrentModification | Self::Staging
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::ConcurrentModification => "concurrent_modification",
            Self::Validation => "validation",
            Self::Serialization => "serialization",
            Self::RemoteUnavailable => "remote_unavailable",
            Self::Timeout => "timeout",
            Self::LocalStore => "local_store",
            Self::Staging => "staging",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one target of a bulk job failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("{identity_key} no longer exists in the latest snapshot")]
    Stale { identity_key: String },

    #[error("{identity_key} is being modified by another job")]
    ConcurrentModification { identity_key: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("cannot serialize {identity_key}: {message}")]
    Serialization {
        identity_key: String,
        message: String,
    },

    #[error("{message}")]
    RemoteUnavailable { message: String },

    #[error("timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("local store: {message}")]
    LocalStore { message: String },

    #[error("staging: {message}")]
    Staging { message: String },
}

impl ItemError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Stale { .. } => FailureKind::Stale,
            Self::ConcurrentModification { .. } => FailureKind::ConcurrentModification,
            Self::Validation { .. } => FailureKind::Validation,
            Self::Serialization { .. } => FailureKind::Serialization,
            Self::RemoteUnavailable { .. } => FailureKind::RemoteUnavailable,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::LocalStore { .. } => FailureKind::LocalStore,
            Self::Staging { .. } => FailureKind::Staging,
        }
    }
}

impl From<CatalogError> for ItemError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { identity_key } => Self::Stale { identity_key },
            CatalogError::Rejected { .. } => Self::validation(err.to_string()),
            CatalogError::Unavailable { .. } | CatalogError::Fs(_) | CatalogError::Json(_) => {
                Self::RemoteUnavailable {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<StoreError> for ItemError {
    fn from(err: StoreError) -> Self {
        Self::LocalStore {
            message: err.to_string(),
        }
    }
}

impl From<EmitError> for ItemError {
    fn from(err: EmitError) -> Self {
        match err {
            EmitError::Unrepresentable {
                identity_key,
                reason,
            } => Self::Serialization {
                identity_key,
                message: reason,
            },
            EmitError::NothingWritten { .. } | EmitError::Encode { .. } => Self::Staging {
                message: err.to_string(),
            },
        }
    }
}
