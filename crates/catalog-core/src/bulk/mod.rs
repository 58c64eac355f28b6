//! Bulk operations
//!
//! A [`BulkJob`] applies one [`BulkOperation`] to an ordered list of target
//! identity keys. The [`Coordinator`] runs it to completion, recording one
//! [`ItemResult`] per target; failures never abort the remaining targets.

mod coordinator;
mod error;
mod handler;

pub use coordinator::{Claim, Coordinator, DEFAULT_ITEM_TIMEOUT, InFlight, ItemHandler};
pub use error::{FailureKind, ItemError};
pub use handler::OperationHandler;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::Error;
use crate::model::EntityType;

/// The operation a bulk job applies to every target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    /// Push the local copy to the remote catalog
    SyncToRemote,
    /// Pull the remote copy into the local store
    SyncToLocal,
    DeleteLocal,
    DeleteRemote,
    /// Write staged artifacts for version-control review
    StageForReview,
}

impl BulkOperation {
    pub const ALL: [BulkOperation; 5] = [
        BulkOperation::SyncToRemote,
        BulkOperation::SyncToLocal,
        BulkOperation::DeleteLocal,
        BulkOperation::DeleteRemote,
        BulkOperation::StageForReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncToRemote => "sync_to_remote",
            Self::SyncToLocal => "sync_to_local",
            Self::DeleteLocal => "delete_local",
            Self::DeleteRemote => "delete_remote",
            Self::StageForReview => "stage_for_review",
        }
    }

    /// Short command-line name
    pub fn command_name(&self) -> &'static str {
        match self {
            Self::SyncToRemote => "push",
            Self::SyncToLocal => "pull",
            Self::DeleteLocal => "delete-local",
            Self::DeleteRemote => "delete-remote",
            Self::StageForReview => "stage",
        }
    }

    /// Whether the operation mutates an entity and must be serialized per key
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::StageForReview)
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == wanted || op.command_name().replace('-', "_") == wanted)
            .ok_or_else(|| Error::UnknownOperation {
                value: s.to_string(),
            })
    }
}

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
}

/// Outcome of one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded,
    Failed,
    /// Not attempted because the job was cancelled first
    Cancelled,
}

/// Failure detail recorded in an [`ItemResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// What a successful per-item call produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    pub artifact_names: Vec<String>,
    pub message: Option<String>,
}

impl ItemOutcome {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            artifact_names: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn artifacts(artifact_names: Vec<String>) -> Self {
        Self {
            artifact_names,
            message: None,
        }
    }
}

/// Result for one target of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub identity_key: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ItemFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifact_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemResult {
    pub fn succeeded(identity_key: impl Into<String>, outcome: ItemOutcome) -> Self {
        Self {
            identity_key: identity_key.into(),
            status: ItemStatus::Succeeded,
            failure: None,
            artifact_names: outcome.artifact_names,
            message: outcome.message,
        }
    }

    pub fn failed(identity_key: impl Into<String>, error: &ItemError) -> Self {
        Self {
            identity_key: identity_key.into(),
            status: ItemStatus::Failed,
            failure: Some(ItemFailure {
                kind: error.kind(),
                message: error.to_string(),
            }),
            artifact_names: Vec::new(),
            message: None,
        }
    }

    pub fn cancelled(identity_key: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
            status: ItemStatus::Cancelled,
            failure: None,
            artifact_names: Vec::new(),
            message: None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }
}

/// Incremental progress of a running job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processed {} / {}", self.processed, self.total)
    }
}

/// Aggregate outcome of a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub cancelled_count: usize,
    /// Failed items whose failure kind is retryable
    pub retryable_count: usize,
    /// Artifact names from every item, in order, duplicates kept
    pub created_artifact_names: Vec<String>,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
}

impl JobSummary {
    pub fn from_results(results: &[ItemResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.status {
                ItemStatus::Succeeded => summary.succeeded_count += 1,
                ItemStatus::Failed => summary.failed_count += 1,
                ItemStatus::Cancelled => summary.cancelled_count += 1,
            }
            if let Some(kind) = result.failure_kind() {
                *summary.failures_by_kind.entry(kind).or_default() += 1;
                if kind.is_retryable() {
                    summary.retryable_count += 1;
                }
            }
            summary
                .created_artifact_names
                .extend(result.artifact_names.iter().cloned());
        }
        summary
    }
}

/// One batch operation over a set of targets
#[derive(Debug)]
pub struct BulkJob {
    id: Uuid,
    operation: BulkOperation,
    entity_types: Vec<EntityType>,
    targets: Vec<String>,
    results: Vec<ItemResult>,
    status: JobStatus,
    progress: watch::Sender<Progress>,
}

impl BulkJob {
    /// Create a pending job.
    ///
    /// Repeated targets are kept once, at their first position.
    /// `entity_types` scopes the snapshot the targets are checked against.
    pub fn new<I, S>(operation: BulkOperation, entity_types: Vec<EntityType>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let targets: Vec<String> = targets
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| seen.insert(t.clone()))
            .collect();
        let (progress, _) = watch::channel(Progress {
            total: targets.len(),
            ..Progress::default()
        });

        Self {
            id: Uuid::new_v4(),
            operation,
            entity_types,
            targets,
            results: Vec::new(),
            status: JobStatus::Pending,
            progress,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn operation(&self) -> BulkOperation {
        self.operation
    }

    pub fn entity_types(&self) -> &[EntityType] {
        &self.entity_types
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Results in target order; complete once the job has completed
    pub fn results(&self) -> &[ItemResult] {
        &self.results
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary::from_results(&self.results)
    }

    /// Watch progress; the value changes after every processed target.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    /// A new pending job over the targets that failed retryably, in order.
    pub fn retry_failed(&self) -> BulkJob {
        let targets = self
            .results
            .iter()
            .filter(|r| r.failure_kind().is_some_and(|k| k.is_retryable()))
            .map(|r| r.identity_key.clone());
        BulkJob::new(self.operation, self.entity_types.clone(), targets)
    }

    pub(crate) fn start(&mut self) {
        self.status = JobStatus::Running;
        self.results.clear();
        self.progress.send_replace(Progress {
            total: self.targets.len(),
            ..Progress::default()
        });
    }

    pub(crate) fn record(&mut self, result: ItemResult) {
        let mut progress = *self.progress.borrow();
        progress.processed += 1;
        match result.status {
            ItemStatus::Succeeded => progress.succeeded += 1,
            ItemStatus::Failed => progress.failed += 1,
            ItemStatus::Cancelled => {}
        }
        self.results.push(result);
        self.progress.send_replace(progress);
    }

    pub(crate) fn finish(&mut self) {
        self.status = JobStatus::Completed;
    }

    /// A serializable view of the job
    pub fn report(&self) -> JobReport<'_> {
        JobReport {
            id: self.id,
            operation: self.operation,
            status: self.status,
            results: &self.results,
            summary: self.summary(),
        }
    }
}

/// Serializable view of a [`BulkJob`]
#[derive(Debug, Serialize)]
pub struct JobReport<'a> {
    pub id: Uuid,
    pub operation: BulkOperation,
    pub status: JobStatus,
    pub results: &'a [ItemResult],
    pub summary: JobSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn operation_parses_both_spellings() {
        assert_eq!(
            "sync_to_remote".parse::<BulkOperation>().unwrap(),
            BulkOperation::SyncToRemote
        );
        assert_eq!(
            "delete-local".parse::<BulkOperation>().unwrap(),
            BulkOperation::DeleteLocal
        );
        assert_eq!("stage".parse::<BulkOperation>().unwrap(), BulkOperation::StageForReview);
        assert!("frobnicate".parse::<BulkOperation>().is_err());
    }

    #[test]
    fn new_job_dedupes_targets_in_order() {
        let job = BulkJob::new(BulkOperation::SyncToRemote, vec![EntityType::Tag], ["b", "a", "b", "c"]);
        assert_eq!(job.targets(), &["b", "a", "c"]);
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.progress().total, 3);
    }

    #[test]
    fn summary_concatenates_artifacts_without_dedup() {
        let results = vec![
            ItemResult::succeeded("a", ItemOutcome::artifacts(vec!["tag/a.json".into()])),
            ItemResult::succeeded("b", ItemOutcome::artifacts(vec!["tag/a.json".into()])),
            ItemResult::failed(
                "c",
                &ItemError::Timeout {
                    after: Duration::from_secs(1),
                },
            ),
            ItemResult::failed("d", &ItemError::validation("no local copy")),
            ItemResult::cancelled("e"),
        ];
        let summary = JobSummary::from_results(&results);

        assert_eq!(summary.succeeded_count, 2);
        assert_eq!(summary.failed_count, 2);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.retryable_count, 1);
        assert_eq!(
            summary.created_artifact_names,
            vec!["tag/a.json".to_string(), "tag/a.json".to_string()]
        );
        assert_eq!(summary.failures_by_kind.get(&FailureKind::Timeout), Some(&1));
    }

    #[test]
    fn retry_keeps_only_retryable_failures() {
        let mut job = BulkJob::new(BulkOperation::SyncToRemote, vec![EntityType::Tag], ["a", "b", "c", "d"]);
        job.start();
        job.record(ItemResult::failed(
            "a",
            &ItemError::RemoteUnavailable {
                message: "down".into(),
            },
        ));
        job.record(ItemResult::succeeded("b", ItemOutcome::default()));
        job.record(ItemResult::failed(
            "c",
            &ItemError::Stale {
                identity_key: "c".into(),
            },
        ));
        job.record(ItemResult::failed(
            "d",
            &ItemError::ConcurrentModification {
                identity_key: "d".into(),
            },
        ));
        job.finish();

        let retry = job.retry_failed();
        assert_eq!(retry.targets(), &["a", "d"]);
        assert_eq!(retry.status(), JobStatus::Pending);
        assert_ne!(retry.id(), job.id());
    }

    #[test]
    fn progress_tracks_recorded_items() {
        let mut job = BulkJob::new(BulkOperation::StageForReview, vec![EntityType::Tag], ["a", "b"]);
        let rx = job.subscribe();
        job.start();
        job.record(ItemResult::succeeded("a", ItemOutcome::default()));

        let progress = *rx.borrow();
        assert_eq!(progress.processed, 1);
        assert_eq!(progress.total, 2);
        assert_eq!(progress.to_string(), "processed 1 / 2");
    }

    #[test]
    fn progress_counts_each_status() {
        let mut job = BulkJob::new(BulkOperation::SyncToRemote, vec![EntityType::Tag], ["a", "b", "c"]);
        job.start();
        job.record(ItemResult::succeeded("a", ItemOutcome::default()));
        job.record(ItemResult::failed("b", &ItemError::validation("bad")));
        job.record(ItemResult::cancelled("c"));

        assert_eq!(
            job.progress(),
            Progress {
                processed: 3,
                total: 3,
                succeeded: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn restart_resets_progress() {
        let mut job = BulkJob::new(BulkOperation::SyncToRemote, vec![EntityType::Tag], ["a"]);
        job.start();
        job.record(ItemResult::succeeded("a", ItemOutcome::default()));
        job.start();
        assert_eq!(job.progress().processed, 0);
        assert_eq!(job.progress().succeeded, 0);
    }
}
