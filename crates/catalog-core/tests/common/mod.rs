//! Shared fixtures for catalog-core integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::bulk::{ItemHandler, ItemOutcome};
use catalog_core::collab::memory::{MemoryCatalog, MemoryLocalStore};
use catalog_core::snapshot::ClassifiedEntity;
use catalog_core::{BulkOperation, EntityType, ItemError, RawLocal, Reconciler};
use tokio_util::sync::CancellationToken;

pub fn tag_key(name: &str) -> String {
    format!("urn:li:tag:{name}")
}

/// A local tag record that has never been pushed
pub fn local_tag(name: &str) -> RawLocal {
    RawLocal::new(format!("local-{name}"), EntityType::Tag, name).with_urn(tag_key(name))
}

/// Collaborators holding one local-only tag per name
pub fn seeded(names: &[&str]) -> (Arc<MemoryCatalog>, Arc<MemoryLocalStore>, Reconciler) {
    let store = names
        .iter()
        .fold(MemoryLocalStore::new(), |store, name| store.with_record(local_tag(name)));
    let catalog = Arc::new(MemoryCatalog::new());
    let store = Arc::new(store);
    let reconciler = Reconciler::new(catalog.clone(), store.clone());
    (catalog, store, reconciler)
}

/// Scriptable per-item handler that records every call
#[derive(Default)]
pub struct ScriptedHandler {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    cancel_after: Option<(usize, CancellationToken)>,
    handled: AtomicUsize,
}

impl ScriptedHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, identity_key: &str) -> Self {
        self.failing.insert(identity_key.to_string());
        self
    }

    pub fn delaying(mut self, identity_key: &str, delay: Duration) -> Self {
        self.delays.insert(identity_key.to_string(), delay);
        self
    }

    /// Fire `token` once `count` items have been handled.
    pub fn cancelling_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemHandler for ScriptedHandler {
    async fn handle(
        &self,
        _operation: BulkOperation,
        entity: &ClassifiedEntity,
    ) -> Result<ItemOutcome, ItemError> {
        let key = entity.entity.identity_key.clone();
        self.calls.lock().unwrap().push(key.clone());

        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }

        let handled = self.handled.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = &self.cancel_after
            && handled == *count
        {
            token.cancel();
        }

        if self.failing.contains(&key) {
            Err(ItemError::validation(format!("{key} is designed to fail")))
        } else {
            Ok(ItemOutcome::artifacts(vec![format!("{key}.json")]))
        }
    }
}
