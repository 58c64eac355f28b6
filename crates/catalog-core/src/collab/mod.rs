//! Collaborator interfaces
//!
//! The engine reaches the remote catalog, the local store, the principal
//! directory and the version-control staging area only through these traits.
//! [`memory`] holds in-process implementations; [`file`] holds JSON-file
//! backed ones used by the CLI.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::model::{Entity, EntityType, PrincipalKind, RawLocal, RawRemote};
use crate::staging::SinkError;

/// Failure reported by a remote catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog could not be reached
    #[error("remote catalog unavailable: {message}")]
    Unavailable { message: String },

    /// The catalog refused the request
    #[error("remote catalog rejected {identity_key}: {message}")]
    Rejected {
        identity_key: String,
        message: String,
    },

    /// No entity with this key exists remotely
    #[error("{identity_key} not found in remote catalog")]
    NotFound { identity_key: String },

    /// Backing files of a file-based catalog
    #[error(transparent)]
    Fs(#[from] catalog_fs::Error),

    /// Malformed catalog content
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Failure reported by a local store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("local store unavailable: {message}")]
    Unavailable { message: String },

    /// No record with this local id exists
    #[error("local record {local_id} not found")]
    NotFound { local_id: String },

    /// The store refused the record
    #[error("local store rejected {local_id}: {message}")]
    Rejected { local_id: String, message: String },

    #[error(transparent)]
    Fs(#[from] catalog_fs::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Client for the remote metadata catalog
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// List every remote entity of one type.
    async fn fetch_entities(&self, entity_type: EntityType)
    -> Result<Vec<RawRemote>, CatalogError>;

    /// Create or update an entity remotely.
    ///
    /// Returns the new version marker, or `None` for catalogs that do not
    /// version their records.
    async fn push(&self, entity: &Entity) -> Result<Option<String>, CatalogError>;

    /// Fetch one entity; `None` when it does not exist.
    async fn pull(&self, identity_key: &str) -> Result<Option<RawRemote>, CatalogError>;

    async fn delete(&self, identity_key: &str) -> Result<(), CatalogError>;
}

/// Store of locally edited records
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn list_entities(&self, entity_type: EntityType) -> Result<Vec<RawLocal>, StoreError>;

    /// Insert or replace a record, returning its local id.
    ///
    /// A record with an empty `local_id` is matched by type and URN, and is
    /// assigned a fresh id when nothing matches.
    async fn upsert(&self, record: RawLocal) -> Result<String, StoreError>;

    async fn delete(&self, local_id: &str) -> Result<(), StoreError>;
}

/// A user or group known to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub key: String,
    pub kind: PrincipalKind,
    pub display_name: String,
}

impl Principal {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            kind: PrincipalKind::from_urn(&key),
            key,
            display_name: display_name.into(),
        }
    }
}

/// Source of the principal directory for a connection
#[async_trait]
pub trait PrincipalSource: Send + Sync {
    async fn fetch_principals(&self, connection_id: &str) -> Result<Vec<Principal>, CatalogError>;
}

/// Destination for staged artifacts
#[async_trait]
pub trait StagingSink: Send + Sync {
    /// Write one artifact. `file_name` is a relative, forward-slash path.
    async fn write(&self, file_name: &str, content: &[u8]) -> Result<(), SinkError>;
}

/// Insert or replace `record` in `records` following the [`LocalStore::upsert`]
/// matching rules, returning the record's local id.
pub(crate) fn upsert_local(records: &mut Vec<RawLocal>, mut record: RawLocal) -> String {
    let position = if record.local_id.is_empty() {
        record.urn.as_deref().and_then(|urn| {
            records
                .iter()
                .position(|r| r.entity_type == record.entity_type && r.urn.as_deref() == Some(urn))
        })
    } else {
        records.iter().position(|r| r.local_id == record.local_id)
    };

    match position {
        Some(i) => {
            if record.local_id.is_empty() {
                record.local_id = records[i].local_id.clone();
            }
            let id = record.local_id.clone();
            records[i] = record;
            id
        }
        None => {
            if record.local_id.is_empty() {
                record.local_id = uuid::Uuid::new_v4().to_string();
            }
            let id = record.local_id.clone();
            records.push(record);
            id
        }
    }
}
