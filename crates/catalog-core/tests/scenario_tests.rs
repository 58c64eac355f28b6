//! End-to-end scenarios over in-memory collaborators

mod common;

use std::sync::Arc;

use catalog_core::collab::memory::{MemoryCatalog, MemoryLocalStore, MemorySink};
use catalog_core::{
    BulkJob, BulkOperation, Coordinator, Emitter, EntityType, ItemStatus, OperationHandler,
    RawLocal, RawRemote, Reconciler, SortOrder, SyncState,
};
use common::{ScriptedHandler, seeded, tag_key};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_presence_combinations_classify() {
    // A local only, B on both sides with matching fingerprints, C remote only
    let store = MemoryLocalStore::new()
        .with_record(RawLocal::new("1", EntityType::Tag, "A").with_urn("A"))
        .with_record(
            RawLocal::new("2", EntityType::Tag, "B")
                .with_urn("B")
                .with_fingerprint("fp-b"),
        );
    let catalog = MemoryCatalog::new()
        .with_record(EntityType::Tag, RawRemote::new("B").with_version("fp-b"))
        .with_record(EntityType::Tag, RawRemote::new("C"));

    let snapshot = Reconciler::new(Arc::new(catalog), Arc::new(store))
        .refresh(&[EntityType::Tag])
        .await
        .unwrap();

    let states: Vec<SyncState> = ["A", "B", "C"]
        .iter()
        .map(|key| snapshot.get(key).unwrap().state)
        .collect();
    assert_eq!(
        states,
        vec![SyncState::LocalOnly, SyncState::Synced, SyncState::RemoteOnly]
    );
}

#[tokio::test]
async fn test_remote_edit_after_sync_is_modified() {
    let store = MemoryLocalStore::new().with_record(
        RawLocal::new("1", EntityType::Tag, "pii")
            .with_urn(tag_key("pii"))
            .with_fingerprint("rev-1"),
    );
    let catalog = MemoryCatalog::new()
        .with_record(EntityType::Tag, RawRemote::new(tag_key("pii")).with_version("rev-2"));

    let snapshot = Reconciler::new(Arc::new(catalog), Arc::new(store))
        .refresh(&[EntityType::Tag])
        .await
        .unwrap();

    assert_eq!(snapshot.get(&tag_key("pii")).unwrap().state, SyncState::Modified);
    assert_eq!(snapshot.summary().modified, 1);
}

#[tokio::test]
async fn test_glossary_forest_promotes_orphan() {
    let store = MemoryLocalStore::new()
        .with_record(RawLocal::new("1", EntityType::GlossaryNode, "root").with_urn("root"))
        .with_record(
            RawLocal::new("2", EntityType::GlossaryTerm, "child")
                .with_urn("child")
                .with_parent("root"),
        )
        .with_record(
            RawLocal::new("3", EntityType::GlossaryTerm, "orphan")
                .with_urn("orphan")
                .with_parent("missing"),
        );

    let snapshot = Reconciler::new(Arc::new(MemoryCatalog::new()), Arc::new(store))
        .refresh(&EntityType::GLOSSARY)
        .await
        .unwrap();
    let forest = snapshot.forest(SortOrder::Input);

    let roots: Vec<&str> = forest
        .roots()
        .map(|n| n.item().entity.identity_key.as_str())
        .collect();
    assert_eq!(roots, vec!["root", "orphan"]);

    let root = forest.get("root").unwrap();
    let children: Vec<&str> = root
        .children()
        .map(|n| n.item().entity.identity_key.as_str())
        .collect();
    assert_eq!(children, vec!["child"]);
    assert_eq!(forest.broken_edges().len(), 1);
}

#[tokio::test]
async fn test_cancel_after_second_item() {
    // Five targets; the token fires as item 2 completes
    let names = ["a", "b", "c", "d", "e"];
    let (_, _, reconciler) = seeded(&names);
    let cancel = CancellationToken::new();
    let handler = ScriptedHandler::new().cancelling_after(2, cancel.clone());
    let job = BulkJob::new(
        BulkOperation::SyncToRemote,
        vec![EntityType::Tag],
        names.iter().map(|n| tag_key(n)),
    );

    let job = Coordinator::default()
        .run(job, &reconciler, &handler, &cancel)
        .await;

    let statuses: Vec<ItemStatus> = job.results().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ItemStatus::Succeeded,
            ItemStatus::Succeeded,
            ItemStatus::Cancelled,
            ItemStatus::Cancelled,
            ItemStatus::Cancelled,
        ]
    );
    assert_eq!(handler.calls(), vec![tag_key("a"), tag_key("b")]);
    assert!(job.is_completed());
    assert_eq!(job.summary().cancelled_count, 3);
    assert_eq!(job.summary().failed_count, 0);
}

#[tokio::test]
async fn test_stage_remote_only_entity() {
    // No local record exists; staging works from the remote copy alone
    let catalog = Arc::new(MemoryCatalog::new().with_record(
        EntityType::GlossaryTerm,
        RawRemote::new("urn:li:glossaryTerm:revenue")
            .with_property("name", "Revenue")
            .with_property("definition", "Money coming in"),
    ));
    let store = Arc::new(MemoryLocalStore::new());
    let sink = Arc::new(MemorySink::new());
    let reconciler = Reconciler::new(catalog.clone(), store.clone());
    let handler = OperationHandler::new(catalog, store.clone(), Emitter::new(sink.clone()));

    let job = BulkJob::new(
        BulkOperation::StageForReview,
        vec![EntityType::GlossaryTerm],
        ["urn:li:glossaryTerm:revenue"],
    );
    let job = Coordinator::default()
        .run(job, &reconciler, &handler, &CancellationToken::new())
        .await;

    let summary = job.summary();
    assert_eq!(summary.succeeded_count, 1);
    assert_eq!(
        summary.created_artifact_names,
        vec!["glossary_term/revenue.json".to_string()]
    );
    let content = String::from_utf8(sink.file("glossary_term/revenue.json").unwrap()).unwrap();
    assert!(content.contains("\"description\": \"Money coming in\""));
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_push_then_refresh_is_synced() {
    let (catalog, store, reconciler) = seeded(&["pii"]);
    let handler = OperationHandler::new(
        catalog.clone(),
        store.clone(),
        Emitter::new(Arc::new(MemorySink::new())),
    );

    let job = BulkJob::new(BulkOperation::SyncToRemote, vec![EntityType::Tag], [tag_key("pii")]);
    let job = Coordinator::default()
        .run(job, &reconciler, &handler, &CancellationToken::new())
        .await;
    assert_eq!(job.summary().succeeded_count, 1);

    let snapshot = reconciler.refresh(&[EntityType::Tag]).await.unwrap();
    assert_eq!(snapshot.get(&tag_key("pii")).unwrap().state, SyncState::Synced);
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn test_delete_remote_leaves_local_only() {
    let (catalog, store, reconciler) = seeded(&["pii"]);
    let handler = OperationHandler::new(
        catalog.clone(),
        store,
        Emitter::new(Arc::new(MemorySink::new())),
    );
    let coordinator = Coordinator::default();
    let cancel = CancellationToken::new();

    let push = BulkJob::new(BulkOperation::SyncToRemote, vec![EntityType::Tag], [tag_key("pii")]);
    coordinator.run(push, &reconciler, &handler, &cancel).await;
    let delete = BulkJob::new(BulkOperation::DeleteRemote, vec![EntityType::Tag], [tag_key("pii")]);
    let delete = coordinator.run(delete, &reconciler, &handler, &cancel).await;

    assert_eq!(delete.summary().succeeded_count, 1);
    assert!(catalog.is_empty());
    let snapshot = reconciler.refresh(&[EntityType::Tag]).await.unwrap();
    assert_eq!(snapshot.get(&tag_key("pii")).unwrap().state, SyncState::LocalOnly);
}
