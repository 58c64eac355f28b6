//! In-memory collaborators
//!
//! Each implementation holds its state behind a std mutex that is never held
//! across an await, and exposes hooks to inject failures and latency.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    CatalogError, LocalStore, Principal, PrincipalSource, RemoteCatalog, StagingSink,
    StoreError, upsert_local,
};
use crate::model::{Entity, EntityType, RawLocal, RawRemote};
use crate::staging::SinkError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct CatalogState {
    records: Vec<(EntityType, RawRemote)>,
    revision: u64,
    unversioned: bool,
    offline: bool,
    rejected: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: Vec<String>,
    fetches: usize,
}

/// An in-memory remote catalog
///
/// Pushed records receive `rev-<n>` version markers unless the catalog was
/// built with [`MemoryCatalog::unversioned`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog that exposes no version markers
    pub fn unversioned() -> Self {
        let catalog = Self::default();
        lock(&catalog.state).unversioned = true;
        catalog
    }

    pub fn with_record(self, entity_type: EntityType, record: RawRemote) -> Self {
        self.insert(entity_type, record);
        self
    }

    /// Insert or replace a record by URN.
    pub fn insert(&self, entity_type: EntityType, record: RawRemote) {
        let mut state = lock(&self.state);
        match state.records.iter_mut().find(|(_, r)| r.urn == record.urn) {
            Some(slot) => *slot = (entity_type, record),
            None => state.records.push((entity_type, record)),
        }
    }

    /// Remove a record out of band, as another client would.
    pub fn remove(&self, identity_key: &str) -> bool {
        let mut state = lock(&self.state);
        let before = state.records.len();
        state.records.retain(|(_, r)| r.urn != identity_key);
        state.records.len() != before
    }

    pub fn get(&self, identity_key: &str) -> Option<RawRemote> {
        lock(&self.state)
            .records
            .iter()
            .find(|(_, r)| r.urn == identity_key)
            .map(|(_, r)| r.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.state).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every call fail with [`CatalogError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        lock(&self.state).offline = offline;
    }

    /// Reject mutations of one key.
    pub fn reject(&self, identity_key: &str, message: &str) {
        lock(&self.state)
            .rejected
            .insert(identity_key.to_string(), message.to_string());
    }

    /// Delay every per-key call for `identity_key`.
    pub fn delay(&self, identity_key: &str, delay: Duration) {
        lock(&self.state)
            .delays
            .insert(identity_key.to_string(), delay);
    }

    /// Per-key calls in the order they were received, as `op:key`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        lock(&self.state).fetches
    }

    fn begin(&self, op: &str, identity_key: &str) -> Result<Option<Duration>, CatalogError> {
        let mut state = lock(&self.state);
        state.calls.push(format!("{op}:{identity_key}"));
        if state.offline {
            return Err(CatalogError::unavailable("catalog is offline"));
        }
        Ok(state.delays.get(identity_key).copied())
    }

    async fn enter(&self, op: &str, identity_key: &str) -> Result<(), CatalogError> {
        if let Some(delay) = self.begin(op, identity_key)? {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    fn check_rejected(&self, identity_key: &str) -> Result<(), CatalogError> {
        match lock(&self.state).rejected.get(identity_key) {
            Some(message) => Err(CatalogError::Rejected {
                identity_key: identity_key.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteCatalog for MemoryCatalog {
    async fn fetch_entities(
        &self,
        entity_type: EntityType,
    ) -> Result<Vec<RawRemote>, CatalogError> {
        let mut state = lock(&self.state);
        state.fetches += 1;
        if state.offline {
            return Err(CatalogError::unavailable("catalog is offline"));
        }
        Ok(state
            .records
            .iter()
            .filter(|(t, _)| *t == entity_type)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn push(&self, entity: &Entity) -> Result<Option<String>, CatalogError> {
        self.enter("push", &entity.identity_key).await?;
        self.check_rejected(&entity.identity_key)?;

        let mut state = lock(&self.state);
        state.revision += 1;
        let version = (!state.unversioned).then(|| format!("rev-{}", state.revision));
        let mut record = entity.to_remote_record();
        record.version = version.clone();
        let entity_type = entity.entity_type;
        match state.records.iter_mut().find(|(_, r)| r.urn == record.urn) {
            Some(slot) => *slot = (entity_type, record),
            None => state.records.push((entity_type, record)),
        }
        Ok(version)
    }

    async fn pull(&self, identity_key: &str) -> Result<Option<RawRemote>, CatalogError> {
        self.enter("pull", identity_key).await?;
        Ok(self.get(identity_key))
    }

    async fn delete(&self, identity_key: &str) -> Result<(), CatalogError> {
        self.enter("delete", identity_key).await?;
        self.check_rejected(identity_key)?;
        if self.remove(identity_key) {
            Ok(())
        } else {
            Err(CatalogError::NotFound {
                identity_key: identity_key.to_string(),
            })
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<RawLocal>,
    offline: bool,
    read_only: bool,
}

/// An in-memory local store
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    state: Mutex<StoreState>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: RawLocal) -> Self {
        lock(&self.state).records.push(record);
        self
    }

    pub fn records(&self) -> Vec<RawLocal> {
        lock(&self.state).records.clone()
    }

    pub fn get(&self, local_id: &str) -> Option<RawLocal> {
        lock(&self.state)
            .records
            .iter()
            .find(|r| r.local_id == local_id)
            .cloned()
    }

    pub fn set_offline(&self, offline: bool) {
        lock(&self.state).offline = offline;
    }

    /// Make every upsert and delete fail with [`StoreError::Rejected`].
    pub fn set_read_only(&self, read_only: bool) {
        lock(&self.state).read_only = read_only;
    }

    fn writable(&self, local_id: &str) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        let state = lock(&self.state);
        if state.offline {
            return Err(StoreError::unavailable("store is offline"));
        }
        if state.read_only {
            return Err(StoreError::Rejected {
                local_id: local_id.to_string(),
                message: "store is read-only".into(),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn list_entities(&self, entity_type: EntityType) -> Result<Vec<RawLocal>, StoreError> {
        let state = lock(&self.state);
        if state.offline {
            return Err(StoreError::unavailable("store is offline"));
        }
        Ok(state
            .records
            .iter()
            .filter(|r| r.entity_type == entity_type)
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: RawLocal) -> Result<String, StoreError> {
        let mut state = self.writable(&record.local_id)?;
        Ok(upsert_local(&mut state.records, record))
    }

    async fn delete(&self, local_id: &str) -> Result<(), StoreError> {
        let mut state = self.writable(local_id)?;
        let before = state.records.len();
        state.records.retain(|r| r.local_id != local_id);
        if state.records.len() == before {
            return Err(StoreError::NotFound {
                local_id: local_id.to_string(),
            });
        }
        Ok(())
    }
}

/// An in-memory principal directory that counts its fetches
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    principals: Mutex<Vec<Principal>>,
    latency: Option<Duration>,
    failing: Mutex<bool>,
    fetches: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new(principals: Vec<Principal>) -> Self {
        Self {
            principals: Mutex::new(principals),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_principals(&self, principals: Vec<Principal>) {
        *lock(&self.principals) = principals;
    }

    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrincipalSource for MemoryDirectory {
    async fn fetch_principals(&self, connection_id: &str) -> Result<Vec<Principal>, CatalogError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if *lock(&self.failing) {
            return Err(CatalogError::unavailable(format!(
                "directory for {connection_id} is offline"
            )));
        }
        Ok(lock(&self.principals).clone())
    }
}

/// A staging sink that keeps artifacts in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write to `file_name`.
    pub fn fail_on(&self, file_name: &str) {
        lock(&self.failing).insert(file_name.to_string());
    }

    pub fn file(&self, file_name: &str) -> Option<Vec<u8>> {
        lock(&self.files).get(file_name).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        lock(&self.files).keys().cloned().collect()
    }
}

#[async_trait]
impl StagingSink for MemorySink {
    async fn write(&self, file_name: &str, content: &[u8]) -> Result<(), SinkError> {
        if lock(&self.failing).contains(file_name) {
            return Err(SinkError::Rejected {
                file_name: file_name.to_string(),
                message: "write refused".into(),
            });
        }
        lock(&self.files).insert(file_name.to_string(), content.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attributes;
    use pretty_assertions::assert_eq;

    fn tag(key: &str) -> Entity {
        Entity {
            identity_key: key.to_string(),
            local_id: Some("l-1".into()),
            entity_type: EntityType::Tag,
            attributes: Attributes {
                name: "pii".into(),
                ..Attributes::default()
            },
            parent_key: None,
            ownership: Vec::new(),
            has_local: true,
            has_remote: false,
            last_synced_fingerprint: None,
            remote_modified_fingerprint: None,
        }
    }

    #[tokio::test]
    async fn push_assigns_increasing_versions() {
        let catalog = MemoryCatalog::new();
        let first = catalog.push(&tag("urn:li:tag:pii")).await.unwrap();
        let second = catalog.push(&tag("urn:li:tag:pii")).await.unwrap();

        assert_eq!(first.as_deref(), Some("rev-1"));
        assert_eq!(second.as_deref(), Some("rev-2"));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("urn:li:tag:pii").unwrap().version.as_deref(), Some("rev-2"));
    }

    #[tokio::test]
    async fn unversioned_catalog_returns_no_marker() {
        let catalog = MemoryCatalog::unversioned();
        assert_eq!(catalog.push(&tag("urn:li:tag:pii")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn offline_catalog_fails_every_call() {
        let catalog = MemoryCatalog::new();
        catalog.set_offline(true);
        assert!(matches!(
            catalog.fetch_entities(EntityType::Tag).await,
            Err(CatalogError::Unavailable { .. })
        ));
        assert!(matches!(
            catalog.pull("urn:li:tag:x").await,
            Err(CatalogError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn delete_missing_key_is_not_found() {
        let catalog = MemoryCatalog::new();
        assert!(matches!(
            catalog.delete("urn:li:tag:gone").await,
            Err(CatalogError::NotFound { .. })
        ));
        assert_eq!(catalog.calls(), vec!["delete:urn:li:tag:gone".to_string()]);
    }

    #[tokio::test]
    async fn store_delete_unknown_id_fails() {
        let store = MemoryLocalStore::new();
        assert!(matches!(
            store.delete("nope").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn sink_refuses_configured_file() {
        let sink = MemorySink::new();
        sink.fail_on("tag/bad.json");
        assert!(sink.write("tag/bad.json", b"{}").await.is_err());
        sink.write("tag/good.json", b"{}").await.unwrap();
        assert_eq!(sink.file_names(), vec!["tag/good.json".to_string()]);
    }
}
