//! Sequential job runner
//!
//! Targets of one job are processed strictly in input order, one at a time.
//! Independent jobs may run concurrently; mutating operations claim their
//! identity key in a shared [`InFlight`] registry, and a job that finds a key
//! already claimed records [`ItemError::ConcurrentModification`] for it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{BulkJob, BulkOperation, ItemError, ItemOutcome, ItemResult};
use crate::model::EntityType;
use crate::snapshot::{ClassifiedEntity, Snapshot, SnapshotSource};

/// Default per-item timeout
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-item work of a bulk job
#[async_trait]
pub trait ItemHandler: Send + Sync {
    /// Apply `operation` to one entity resolved from a fresh snapshot.
    async fn handle(
        &self,
        operation: BulkOperation,
        entity: &ClassifiedEntity,
    ) -> Result<ItemOutcome, ItemError>;
}

/// Registry of identity keys currently being mutated
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `identity_key`; `None` if another holder has it.
    pub fn claim(&self, identity_key: &str) -> Option<Claim> {
        if self.keys().insert(identity_key.to_string()) {
            Some(Claim {
                keys: Arc::clone(&self.keys),
                identity_key: identity_key.to_string(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, identity_key: &str) -> bool {
        self.keys().contains(identity_key)
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// A held key; released on drop
#[derive(Debug)]
pub struct Claim {
    keys: Arc<Mutex<HashSet<String>>>,
    identity_key: String,
}

impl Claim {
    pub fn identity_key(&self) -> &str {
        &self.identity_key
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.identity_key);
    }
}

/// Runs bulk jobs
///
/// Clones share one [`InFlight`] registry.
#[derive(Debug, Clone)]
pub struct Coordinator {
    in_flight: InFlight,
    item_timeout: Duration,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_TIMEOUT)
    }
}

impl Coordinator {
    pub fn new(item_timeout: Duration) -> Self {
        Self {
            in_flight: InFlight::new(),
            item_timeout,
        }
    }

    /// Share an existing registry with other coordinators.
    pub fn with_in_flight(mut self, in_flight: InFlight) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn item_timeout(&self) -> Duration {
        self.item_timeout
    }

    /// Run `job` to completion and return it.
    ///
    /// Targets are checked against a snapshot taken when the job starts and
    /// re-read from `source` right before their turn. Targets missing from
    /// either fail as stale without calling `handler`; if the snapshot
    /// cannot be taken every target fails as remote unavailable. `cancel` is checked before each target, and targets not
    /// started when it fires are recorded as cancelled. A completed job is
    /// returned unchanged.
    pub async fn run(
        &self,
        mut job: BulkJob,
        source: &dyn SnapshotSource,
        handler: &dyn ItemHandler,
        cancel: &CancellationToken,
    ) -> BulkJob {
        if job.is_completed() {
            return job;
        }
        let span = tracing::info_span!(
            "bulk_job",
            job_id = %job.id(),
            operation = %job.operation()
        );
        async move {
            job.start();
            tracing::info!(targets = job.targets().len(), "starting bulk job");

            let snapshot = source
                .snapshot(job.entity_types())
                .await
                .map_err(|e| format!("snapshot refresh failed: {e}"));
            if let Err(message) = &snapshot {
                tracing::warn!("{message}");
            }

            let operation = job.operation();
            let targets = job.targets().to_vec();
            for identity_key in targets {
                let result = if cancel.is_cancelled() {
                    ItemResult::cancelled(&identity_key)
                } else {
                    self.process(operation, &identity_key, &snapshot, source, handler)
                        .await
                };
                job.record(result);
            }

            job.finish();
            let summary = job.summary();
            tracing::info!(
                succeeded = summary.succeeded_count,
                failed = summary.failed_count,
                cancelled = summary.cancelled_count,
                "bulk job completed"
            );
            job
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        operation: BulkOperation,
        identity_key: &str,
        snapshot: &Result<Snapshot, String>,
        source: &dyn SnapshotSource,
        handler: &dyn ItemHandler,
    ) -> ItemResult {
        let outcome = match snapshot {
            Err(message) => Err(ItemError::RemoteUnavailable {
                message: message.clone(),
            }),
            Ok(snapshot) => match snapshot.get(identity_key) {
                None => Err(stale(identity_key)),
                Some(listed) => {
                    self.dispatch(operation, listed.entity.entity_type, identity_key, source, handler)
                        .await
                }
            },
        };

        match outcome {
            Ok(outcome) => {
                tracing::debug!(identity_key, "item succeeded");
                ItemResult::succeeded(identity_key, outcome)
            }
            Err(error) => {
                tracing::debug!(identity_key, kind = %error.kind(), "item failed: {error}");
                ItemResult::failed(identity_key, &error)
            }
        }
    }

    /// Claim the key, re-read the entity and hand it to `handler`.
    ///
    /// The re-read happens under the claim, so an entity removed by another
    /// job or an earlier item since the job started is reported as stale.
    async fn dispatch(
        &self,
        operation: BulkOperation,
        entity_type: EntityType,
        identity_key: &str,
        source: &dyn SnapshotSource,
        handler: &dyn ItemHandler,
    ) -> Result<ItemOutcome, ItemError> {
        let _claim = if operation.is_mutating() {
            let claim = self.in_flight.claim(identity_key).ok_or_else(|| {
                ItemError::ConcurrentModification {
                    identity_key: identity_key.to_string(),
                }
            })?;
            Some(claim)
        } else {
            None
        };

        let item = async {
            let entity = source
                .lookup(entity_type, identity_key)
                .await
                .map_err(|e| ItemError::RemoteUnavailable {
                    message: format!("re-reading {identity_key} failed: {e}"),
                })?
                .ok_or_else(|| stale(identity_key))?;
            handler.handle(operation, &entity).await
        };

        match tokio::time::timeout(self.item_timeout, item).await {
            Ok(result) => result,
            Err(_) => Err(ItemError::Timeout {
                after: self.item_timeout,
            }),
        }
    }
}

fn stale(identity_key: &str) -> ItemError {
    ItemError::Stale {
        identity_key: identity_key.to_string(),
    }
}
