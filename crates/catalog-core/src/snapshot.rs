//! Classified snapshots of the catalog
//!
//! A [`Reconciler`] lists both collaborators, normalizes and classifies the
//! records, and returns a [`Snapshot`]: the view the presentation layer
//! renders and the bulk coordinator checks targets against.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Result;
use crate::classify::{Classifier, ConsistencyError, SyncState};
use crate::clock::{Clock, SystemClock};
use crate::collab::{LocalStore, RemoteCatalog};
use crate::hierarchy::{self, Forest, Hierarchical, SortOrder};
use crate::model::{Entity, EntityType};
use crate::normalize::{self, NormalizeError};

/// An entity with its sync state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedEntity {
    #[serde(flatten)]
    pub entity: Entity,
    pub state: SyncState,
}

impl Hierarchical for ClassifiedEntity {
    fn node_key(&self) -> &str {
        self.entity.node_key()
    }

    fn parent_node_key(&self) -> Option<&str> {
        self.entity.parent_node_key()
    }

    fn sort_name(&self) -> &str {
        self.entity.sort_name()
    }
}

/// Something that went wrong for a single entity during a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshWarning {
    /// The entity could not be normalized and was dropped
    Dropped(NormalizeError),
    /// The entity violated a classifier precondition and was dropped
    Inconsistent(ConsistencyError),
}

impl fmt::Display for RefreshWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dropped(e) => write!(f, "{e}"),
            Self::Inconsistent(e) => write!(f, "{e}"),
        }
    }
}

/// Entity counts per sync state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub synced: usize,
    pub modified: usize,
    pub local_only: usize,
    pub remote_only: usize,
}

impl SnapshotSummary {
    pub fn count(&self, state: SyncState) -> usize {
        match state {
            SyncState::Synced => self.synced,
            SyncState::Modified => self.modified,
            SyncState::LocalOnly => self.local_only,
            SyncState::RemoteOnly => self.remote_only,
        }
    }

    pub fn total(&self) -> usize {
        self.synced + self.modified + self.local_only + self.remote_only
    }

    fn record(&mut self, state: SyncState) {
        match state {
            SyncState::Synced => self.synced += 1,
            SyncState::Modified => self.modified += 1,
            SyncState::LocalOnly => self.local_only += 1,
            SyncState::RemoteOnly => self.remote_only += 1,
        }
    }
}

/// Classified entities at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    entity_types: Vec<EntityType>,
    entities: Vec<ClassifiedEntity>,
    index: HashMap<String, usize>,
    warnings: Vec<RefreshWarning>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Classify already-normalized entities.
    ///
    /// Entities that fail classification are dropped, logged and reported in
    /// [`Snapshot::warnings`].
    pub fn from_entities(
        entity_types: Vec<EntityType>,
        entities: Vec<Entity>,
        classifier: Classifier,
        taken_at: DateTime<Utc>,
    ) -> Self {
        let mut classified = Vec::with_capacity(entities.len());
        let mut warnings = Vec::new();
        for entity in entities {
            match classifier.classify(&entity) {
                Ok(state) => classified.push(ClassifiedEntity { entity, state }),
                Err(e) => {
                    tracing::error!(identity_key = %entity.identity_key, "{e}");
                    warnings.push(RefreshWarning::Inconsistent(e));
                }
            }
        }

        let mut index = HashMap::with_capacity(classified.len());
        for (i, item) in classified.iter().enumerate() {
            index.entry(item.entity.identity_key.clone()).or_insert(i);
        }

        Self {
            entity_types,
            entities: classified,
            index,
            warnings,
            taken_at,
        }
    }

    fn with_warnings(mut self, mut warnings: Vec<RefreshWarning>) -> Self {
        warnings.append(&mut self.warnings);
        self.warnings = warnings;
        self
    }

    pub fn entity_types(&self) -> &[EntityType] {
        &self.entity_types
    }

    /// Entities in refresh order
    pub fn entities(&self) -> &[ClassifiedEntity] {
        &self.entities
    }

    pub fn get(&self, identity_key: &str) -> Option<&ClassifiedEntity> {
        self.index.get(identity_key).map(|&i| &self.entities[i])
    }

    pub fn contains(&self, identity_key: &str) -> bool {
        self.index.contains_key(identity_key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn warnings(&self) -> &[RefreshWarning] {
        &self.warnings
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn summary(&self) -> SnapshotSummary {
        let mut summary = SnapshotSummary::default();
        for item in &self.entities {
            summary.record(item.state);
        }
        summary
    }

    pub fn filter(&self, state: SyncState) -> impl Iterator<Item = &ClassifiedEntity> + '_ {
        self.entities.iter().filter(move |e| e.state == state)
    }

    /// Entities of one type
    pub fn of_type(&self, entity_type: EntityType) -> impl Iterator<Item = &ClassifiedEntity> + '_ {
        self.entities
            .iter()
            .filter(move |e| e.entity.entity_type == entity_type)
    }

    /// Hierarchy over the snapshot's hierarchical entities
    pub fn forest(&self, order: SortOrder) -> Forest<&ClassifiedEntity> {
        let items = self
            .entities
            .iter()
            .filter(|e| e.entity.entity_type.is_hierarchical())
            .collect();
        hierarchy::build_sorted(items, order)
    }
}

/// Provider of fresh snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, entity_types: &[EntityType]) -> Result<Snapshot>;

    /// Re-read one entity; `None` once it exists on neither side.
    async fn lookup(
        &self,
        entity_type: EntityType,
        identity_key: &str,
    ) -> Result<Option<ClassifiedEntity>> {
        Ok(self.snapshot(&[entity_type]).await?.get(identity_key).cloned())
    }
}

/// Builds snapshots from a remote catalog and a local store
#[derive(Clone)]
pub struct Reconciler {
    remote: Arc<dyn RemoteCatalog>,
    local: Arc<dyn LocalStore>,
    classifier: Classifier,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("classifier", &self.classifier)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(remote: Arc<dyn RemoteCatalog>, local: Arc<dyn LocalStore>) -> Self {
        Self {
            remote,
            local,
            classifier: Classifier::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn remote(&self) -> &Arc<dyn RemoteCatalog> {
        &self.remote
    }

    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    /// Refresh the given entity types.
    ///
    /// All types are paired together, so an identity key claimed under two
    /// types is reported as a conflict.
    ///
    /// # Errors
    ///
    /// Fails only when a collaborator cannot list a type. Per-entity
    /// problems are reported through [`Snapshot::warnings`].
    pub async fn refresh(&self, entity_types: &[EntityType]) -> Result<Snapshot> {
        let mut locals = Vec::new();
        let mut remotes = Vec::new();
        for &entity_type in entity_types {
            locals.extend(self.local.list_entities(entity_type).await?);
            let listed = self.remote.fetch_entities(entity_type).await?;
            remotes.extend(listed.into_iter().map(|r| (entity_type, r)));
        }
        tracing::debug!(
            local = locals.len(),
            remote = remotes.len(),
            "listed raw records"
        );

        let (entities, dropped) = normalize::normalize_all(locals, remotes);
        let snapshot = Snapshot::from_entities(
            entity_types.to_vec(),
            entities,
            self.classifier,
            self.clock.now(),
        )
        .with_warnings(dropped.into_iter().map(RefreshWarning::Dropped).collect());

        let summary = snapshot.summary();
        tracing::info!(
            entities = snapshot.len(),
            synced = summary.synced,
            modified = summary.modified,
            local_only = summary.local_only,
            remote_only = summary.remote_only,
            warnings = snapshot.warnings().len(),
            "refreshed snapshot"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl SnapshotSource for Reconciler {
    async fn snapshot(&self, entity_types: &[EntityType]) -> Result<Snapshot> {
        self.refresh(entity_types).await
    }

    /// Lists the local records of `entity_type` but pulls only one remote
    /// record.
    async fn lookup(
        &self,
        entity_type: EntityType,
        identity_key: &str,
    ) -> Result<Option<ClassifiedEntity>> {
        let locals: Vec<_> = self
            .local
            .list_entities(entity_type)
            .await?
            .into_iter()
            .filter(|r| normalize::local_identity_key(r) == identity_key)
            .collect();
        let remotes: Vec<_> = self
            .remote
            .pull(identity_key)
            .await?
            .into_iter()
            .map(|r| (entity_type, r))
            .collect();

        let (entities, _) = normalize::normalize_all(locals, remotes);
        let snapshot =
            Snapshot::from_entities(vec![entity_type], entities, self.classifier, self.clock.now());
        Ok(snapshot.get(identity_key).cloned())
    }
}
