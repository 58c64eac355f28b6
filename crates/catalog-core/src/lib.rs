//! Core reconciliation engine for Catalog Sync
//!
//! Pairs locally edited metadata with a remote catalog, classifies each
//! entity's sync state, arranges hierarchical types into forests, and runs
//! bulk push/pull/delete/stage jobs with per-item failure isolation.

pub mod bulk;
pub mod cache;
pub mod classify;
pub mod clock;
pub mod collab;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod normalize;
pub mod snapshot;
pub mod staging;

pub use bulk::{
    BulkJob, BulkOperation, Coordinator, FailureKind, ItemError, ItemResult, ItemStatus,
    JobStatus, JobSummary, OperationHandler,
};
pub use cache::{AuxCache, CacheContext, PrincipalDirectory};
pub use classify::{Classifier, ConsistencyError, DriftMode, SyncState};
pub use config::{ConfigResolver, SinkKind, SyncConfig};
pub use error::{Error, Result};
pub use hierarchy::{Forest, HierarchyNode, SortOrder};
pub use model::{Entity, EntityType, Owner, RawLocal, RawRemote};
pub use normalize::{NormalizeError, normalize};
pub use snapshot::{ClassifiedEntity, Reconciler, Snapshot, SnapshotSource};
pub use staging::Emitter;
