//! Workflows over the JSON-file collaborators

use std::sync::Arc;

use catalog_core::collab::file::{FileCatalog, FileLocalStore};
use catalog_core::collab::{LocalStore, StagingSink};
use catalog_core::staging::{DirectorySink, GitSink};
use catalog_core::{
    BulkJob, BulkOperation, Coordinator, Emitter, EntityType, OperationHandler, Reconciler,
    SyncState,
};
use catalog_test_utils::TestWorkspace;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const LOCAL_TAGS: &str = r#"[
  { "local_id": "t-1", "entity_type": "tag", "name": "pii", "color": "red" },
  { "local_id": "t-2", "entity_type": "tag", "name": "gdpr", "urn": "urn:li:tag:gdpr" }
]"#;

const REMOTE_TAGS: &str = r##"[
  { "urn": "urn:li:tag:gdpr", "properties": { "name": "GDPR" }, "version": "sha256:old" },
  { "urn": "urn:li:tag:finance", "properties": { "name": "Finance", "colorHex": "#00ff00" } }
]"##;

fn collaborators(workspace: &TestWorkspace) -> (Arc<FileCatalog>, Arc<FileLocalStore>) {
    (
        Arc::new(FileCatalog::in_workspace(workspace.root())),
        Arc::new(FileLocalStore::in_workspace(workspace.root())),
    )
}

#[tokio::test]
async fn test_refresh_from_workspace_files() {
    let workspace = TestWorkspace::new()
        .with_local_records("tag", LOCAL_TAGS)
        .with_remote_records("tag", REMOTE_TAGS);
    let (catalog, store) = collaborators(&workspace);

    let snapshot = Reconciler::new(catalog, store)
        .refresh(&[EntityType::Tag])
        .await
        .unwrap();

    let states: Vec<(&str, SyncState)> = snapshot
        .entities()
        .iter()
        .map(|e| (e.entity.identity_key.as_str(), e.state))
        .collect();
    assert_eq!(
        states,
        vec![
            ("urn:li:tag:pii", SyncState::LocalOnly),
            ("urn:li:tag:gdpr", SyncState::Modified),
            ("urn:li:tag:finance", SyncState::RemoteOnly),
        ]
    );
    let finance = snapshot.get("urn:li:tag:finance").unwrap();
    assert_eq!(finance.entity.attributes.color, "#00ff00");
}

#[tokio::test]
async fn test_push_all_then_everything_is_synced() {
    let workspace = TestWorkspace::new()
        .with_local_records("tag", LOCAL_TAGS)
        .with_remote_records("tag", REMOTE_TAGS);
    let (catalog, store) = collaborators(&workspace);
    let reconciler = Reconciler::new(catalog.clone(), store.clone());
    let staged = workspace.root().join("staged");
    let handler = OperationHandler::new(
        catalog,
        store.clone(),
        Emitter::new(Arc::new(DirectorySink::new(&staged))),
    );
    let coordinator = Coordinator::default();
    let cancel = CancellationToken::new();

    let push = BulkJob::new(
        BulkOperation::SyncToRemote,
        vec![EntityType::Tag],
        ["urn:li:tag:pii", "urn:li:tag:gdpr"],
    );
    let push = coordinator.run(push, &reconciler, &handler, &cancel).await;
    assert_eq!(push.summary().succeeded_count, 2);

    let pull = BulkJob::new(BulkOperation::SyncToLocal, vec![EntityType::Tag], ["urn:li:tag:finance"]);
    let pull = coordinator.run(pull, &reconciler, &handler, &cancel).await;
    assert_eq!(pull.summary().succeeded_count, 1);

    let snapshot = reconciler.refresh(&[EntityType::Tag]).await.unwrap();
    assert_eq!(snapshot.summary().synced, 3);
    assert_eq!(store.list_entities(EntityType::Tag).await.unwrap().len(), 3);

    let stage = BulkJob::new(
        BulkOperation::StageForReview,
        vec![EntityType::Tag],
        ["urn:li:tag:finance"],
    );
    let stage = coordinator.run(stage, &reconciler, &handler, &cancel).await;
    assert_eq!(
        stage.summary().created_artifact_names,
        vec!["tag/finance.json".to_string()]
    );
    assert!(staged.join("tag/finance.json").is_file());
}

#[tokio::test]
async fn test_git_sink_stages_emitted_files() {
    let workspace = TestWorkspace::new().init_git();
    let sink = Arc::new(GitSink::open(workspace.root(), "staged").unwrap());

    sink.write("tag/pii.json", b"{}\n").await.unwrap();
    sink.write("tag/pii.json", b"{}\n").await.unwrap();

    assert_eq!(sink.staged_paths().unwrap(), vec!["staged/tag/pii.json".to_string()]);
}
