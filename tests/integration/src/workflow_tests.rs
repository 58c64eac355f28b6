//! Cross-crate workflow tests
//!
//! Wire the core library to the file collaborators, the git staging area and
//! the layered configuration exactly as a workspace on disk would, then check
//! what ends up in the JSON mirrors and the git index.

use std::path::Path;
use std::sync::Arc;

use catalog_core::collab::StagingSink;
use catalog_core::collab::file::{FileCatalog, FileLocalStore};
use catalog_core::staging::{DirectorySink, GitSink};
use catalog_core::{
    BulkJob, BulkOperation, ConfigResolver, Coordinator, Emitter, EntityType, OperationHandler,
    Reconciler, SinkKind, SyncConfig, SyncState,
};
use catalog_git::StagingArea;
use catalog_test_utils::TestWorkspace;
use tokio_util::sync::CancellationToken;

const LOCAL_TAGS: &str = r#"[
  { "local_id": "t-1", "entity_type": "tag", "name": "pii",
    "owners": [{ "principal_key": "urn:li:corpuser:ann", "principal_kind": "user" }] },
  { "local_id": "t-2", "entity_type": "tag", "name": "gdpr", "urn": "urn:li:tag:gdpr",
    "last_synced_fingerprint": "v1" }
]"#;

const REMOTE_TAGS: &str = r#"[
  { "urn": "urn:li:tag:gdpr", "properties": { "name": "GDPR" }, "version": "v2" },
  { "urn": "urn:li:tag:finance", "properties": { "name": "Finance" } }
]"#;

/// Collaborators for a workspace, built from its resolved configuration
struct Wired {
    config: SyncConfig,
    reconciler: Reconciler,
    handler: OperationHandler,
    coordinator: Coordinator,
}

fn wire(root: &Path) -> Wired {
    let config = ConfigResolver::with_global_config_dir(root, root.join(".xdg"))
        .resolve()
        .unwrap();
    let catalog = Arc::new(FileCatalog::in_workspace(root));
    let store = Arc::new(FileLocalStore::in_workspace(root));
    let sink: Arc<dyn StagingSink> = match config.staging.sink {
        SinkKind::Directory => Arc::new(DirectorySink::new(root.join(&config.staging.dir))),
        SinkKind::Git => Arc::new(GitSink::open(root, config.staging.dir.as_str()).unwrap()),
    };
    Wired {
        reconciler: Reconciler::new(catalog.clone(), store.clone())
            .with_classifier(config.classifier()),
        handler: OperationHandler::new(catalog, store, Emitter::new(sink)),
        coordinator: Coordinator::new(config.item_timeout()),
        config,
    }
}

async fn state_of(wired: &Wired, key: &str) -> Option<SyncState> {
    let snapshot = wired.reconciler.refresh(&[EntityType::Tag]).await.unwrap();
    snapshot.get(key).map(|e| e.state)
}

// ============================================================================
// Configuration drives reconciliation
// ============================================================================

#[tokio::test]
async fn test_drift_mode_follows_workspace_config() {
    let workspace = TestWorkspace::new()
        .with_local_records("tag", LOCAL_TAGS)
        .with_remote_records("tag", REMOTE_TAGS);

    let wired = wire(workspace.root());
    assert_eq!(state_of(&wired, "urn:li:tag:gdpr").await, Some(SyncState::Modified));

    let workspace = workspace.with_local_config("[sync]\ndrift = \"presence\"\n");
    let wired = wire(workspace.root());
    assert_eq!(state_of(&wired, "urn:li:tag:gdpr").await, Some(SyncState::Synced));
}

#[tokio::test]
async fn test_item_timeout_comes_from_config() {
    let workspace = TestWorkspace::new().with_config("[sync]\nitem_timeout_secs = 5\n");
    let wired = wire(workspace.root());
    assert_eq!(wired.coordinator.item_timeout().as_secs(), 5);
    assert_eq!(wired.config.cache_ttl().as_secs(), 300);
}

// ============================================================================
// Push records one fingerprint on both sides
// ============================================================================

#[tokio::test]
async fn test_push_records_fingerprint_on_both_sides() {
    let workspace = TestWorkspace::new()
        .with_local_records("tag", LOCAL_TAGS)
        .with_remote_records("tag", REMOTE_TAGS);
    let wired = wire(workspace.root());
    let cancel = CancellationToken::new();

    let job = BulkJob::new(BulkOperation::SyncToRemote, vec![EntityType::Tag], ["urn:li:tag:gdpr"]);
    let job = wired
        .coordinator
        .run(job, &wired.reconciler, &wired.handler, &cancel)
        .await;
    assert_eq!(job.summary().succeeded_count, 1);

    let remote: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(workspace.remote_file("tag")).unwrap())
            .unwrap();
    let local: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(workspace.local_file("tag")).unwrap())
            .unwrap();
    let gdpr_remote = remote
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["urn"] == "urn:li:tag:gdpr")
        .unwrap();
    let gdpr_local = local
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["local_id"] == "t-2")
        .unwrap();

    let version = gdpr_remote["version"].as_str().unwrap();
    assert!(version.starts_with("sha256:"), "{version}");
    assert_eq!(gdpr_local["last_synced_fingerprint"], version);
    assert_eq!(gdpr_local["urn"], "urn:li:tag:gdpr");
    assert_eq!(state_of(&wired, "urn:li:tag:gdpr").await, Some(SyncState::Synced));
}

// ============================================================================
// Staging into git
// ============================================================================

#[tokio::test]
async fn test_git_sink_from_config_stages_job_artifacts() {
    let workspace = TestWorkspace::new()
        .init_git()
        .with_config("[staging]\nsink = \"git\"\ndir = \"review\"\n")
        .with_local_records("tag", LOCAL_TAGS);
    let wired = wire(workspace.root());
    let cancel = CancellationToken::new();

    let job = BulkJob::new(
        BulkOperation::StageForReview,
        vec![EntityType::Tag],
        ["urn:li:tag:pii", "urn:li:tag:gdpr"],
    );
    let job = wired
        .coordinator
        .run(job, &wired.reconciler, &wired.handler, &cancel)
        .await;

    assert_eq!(
        job.summary().created_artifact_names,
        vec![
            "tag/pii.json".to_string(),
            "tag/pii.ownership.json".to_string(),
            "tag/gdpr.json".to_string(),
        ]
    );
    let area = StagingArea::open(workspace.root()).unwrap();
    assert_eq!(
        area.staged_paths().unwrap(),
        vec![
            "review/tag/gdpr.json".to_string(),
            "review/tag/pii.json".to_string(),
            "review/tag/pii.ownership.json".to_string(),
        ]
    );
}
