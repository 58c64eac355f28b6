//! JSON-file collaborators
//!
//! Both stores keep one pretty-printed JSON array per entity type
//! (`<dir>/<type>.json`) and write through [`catalog_fs::io::write_atomic`].
//! A std mutex serializes read-modify-write cycles within the process.
//! [`FileDirectory`] reads the principal list from the same mirror directory.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use catalog_fs::{CatalogPath, NormalizedPath, checksum, io};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    CatalogError, LocalStore, Principal, PrincipalSource, RemoteCatalog, StoreError, upsert_local,
};
use crate::model::{Entity, EntityType, RawLocal, RawRemote};

fn type_file(dir: &NormalizedPath, entity_type: EntityType) -> NormalizedPath {
    dir.join(&format!("{}.json", entity_type.as_str()))
}

fn read_records<T, E>(path: &NormalizedPath) -> Result<Vec<T>, E>
where
    T: DeserializeOwned,
    E: From<catalog_fs::Error> + From<serde_json::Error>,
{
    match io::read_text_optional(path)? {
        Some(text) if !text.trim().is_empty() => Ok(serde_json::from_str(&text)?),
        _ => Ok(Vec::new()),
    }
}

fn write_records<T, E>(path: &NormalizedPath, records: &[T]) -> Result<(), E>
where
    T: Serialize,
    E: From<catalog_fs::Error> + From<serde_json::Error>,
{
    let mut text = serde_json::to_string_pretty(records)?;
    text.push('\n');
    io::write_text(path, &text)?;
    Ok(())
}

fn guard(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A remote catalog mirrored as JSON files
///
/// Pushed records are versioned with the checksum of their content, so an
/// unchanged push keeps its version.
#[derive(Debug)]
pub struct FileCatalog {
    dir: NormalizedPath,
    write_lock: Mutex<()>,
}

impl FileCatalog {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: NormalizedPath::new(dir),
            write_lock: Mutex::new(()),
        }
    }

    /// The mirror under a workspace root (`.catalog/remote`)
    pub fn in_workspace(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(CatalogPath::RemoteMirrorDir))
    }

    pub fn dir(&self) -> &NormalizedPath {
        &self.dir
    }

    fn find(&self, identity_key: &str) -> Result<Option<(EntityType, RawRemote)>, CatalogError> {
        for entity_type in EntityType::ALL {
            let path = type_file(&self.dir, entity_type);
            let records: Vec<RawRemote> = read_records::<_, CatalogError>(&path)?;
            if let Some(record) = records.into_iter().find(|r| r.urn == identity_key) {
                return Ok(Some((entity_type, record)));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl RemoteCatalog for FileCatalog {
    async fn fetch_entities(
        &self,
        entity_type: EntityType,
    ) -> Result<Vec<RawRemote>, CatalogError> {
        read_records::<_, CatalogError>(&type_file(&self.dir, entity_type))
    }

    async fn push(&self, entity: &Entity) -> Result<Option<String>, CatalogError> {
        let _guard = guard(&self.write_lock);
        let path = type_file(&self.dir, entity.entity_type);
        let mut records: Vec<RawRemote> = read_records::<_, CatalogError>(&path)?;

        let mut record = entity.to_remote_record();
        let version = checksum::compute_json_checksum(&record)?;
        record.version = Some(version.clone());

        match records.iter_mut().find(|r| r.urn == record.urn) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
        write_records::<_, CatalogError>(&path, &records)?;
        tracing::debug!(identity_key = %entity.identity_key, %version, "pushed to file catalog");
        Ok(Some(version))
    }

    async fn pull(&self, identity_key: &str) -> Result<Option<RawRemote>, CatalogError> {
        Ok(self.find(identity_key)?.map(|(_, record)| record))
    }

    async fn delete(&self, identity_key: &str) -> Result<(), CatalogError> {
        let _guard = guard(&self.write_lock);
        let Some((entity_type, _)) = self.find(identity_key)? else {
            return Err(CatalogError::NotFound {
                identity_key: identity_key.to_string(),
            });
        };
        let path = type_file(&self.dir, entity_type);
        let mut records: Vec<RawRemote> = read_records::<_, CatalogError>(&path)?;
        records.retain(|r| r.urn != identity_key);
        write_records::<_, CatalogError>(&path, &records)
    }
}

/// Local records stored as JSON files
#[derive(Debug)]
pub struct FileLocalStore {
    dir: NormalizedPath,
    write_lock: Mutex<()>,
}

impl FileLocalStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: NormalizedPath::new(dir),
            write_lock: Mutex::new(()),
        }
    }

    /// The store under a workspace root (`.catalog/local`)
    pub fn in_workspace(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(CatalogPath::LocalStoreDir))
    }

    pub fn dir(&self) -> &NormalizedPath {
        &self.dir
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn list_entities(&self, entity_type: EntityType) -> Result<Vec<RawLocal>, StoreError> {
        let path = type_file(&self.dir, entity_type);
        let mut records: Vec<RawLocal> = read_records::<_, StoreError>(&path)?;
        // The file name decides the type
        for record in &mut records {
            record.entity_type = entity_type;
        }
        Ok(records)
    }

    async fn upsert(&self, record: RawLocal) -> Result<String, StoreError> {
        let _guard = guard(&self.write_lock);
        let path = type_file(&self.dir, record.entity_type);
        let mut records: Vec<RawLocal> = read_records::<_, StoreError>(&path)?;
        let local_id = upsert_local(&mut records, record);
        write_records::<_, StoreError>(&path, &records)?;
        Ok(local_id)
    }

    async fn delete(&self, local_id: &str) -> Result<(), StoreError> {
        let _guard = guard(&self.write_lock);
        for entity_type in EntityType::ALL {
            let path = type_file(&self.dir, entity_type);
            let mut records: Vec<RawLocal> = read_records::<_, StoreError>(&path)?;
            let before = records.len();
            records.retain(|r| r.local_id != local_id);
            if records.len() != before {
                return write_records::<_, StoreError>(&path, &records);
            }
        }
        Err(StoreError::NotFound {
            local_id: local_id.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PrincipalRecord {
    key: String,
    #[serde(default)]
    display_name: String,
}

/// Principal directory read from `<dir>/principals.json`
///
/// Every connection sees the same file. A missing file is an empty directory.
#[derive(Debug)]
pub struct FileDirectory {
    path: NormalizedPath,
}

impl FileDirectory {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: NormalizedPath::new(dir).join("principals.json"),
        }
    }

    pub fn in_workspace(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(CatalogPath::RemoteMirrorDir))
    }
}

#[async_trait]
impl PrincipalSource for FileDirectory {
    async fn fetch_principals(&self, connection_id: &str) -> Result<Vec<Principal>, CatalogError> {
        let records: Vec<PrincipalRecord> = read_records::<_, CatalogError>(&self.path)?;
        tracing::debug!(connection_id, principals = records.len(), "read principal directory");
        Ok(records
            .into_iter()
            .map(|r| Principal::new(r.key, r.display_name))
            .collect())
    }
}
