//! Tests for staging review artifacts into the git index

use catalog_git::{Error, StagingArea};
use catalog_test_utils::git::{bare_git_repo, real_git_repo, real_git_repo_with_commit};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_stage_file_writes_and_adds_to_index() {
    let temp = TempDir::new().unwrap();
    real_git_repo(temp.path());

    let area = StagingArea::open(temp.path()).unwrap();
    area.stage_file("staged/tag/pii.json", b"{}\n").unwrap();

    let on_disk = fs::read_to_string(temp.path().join("staged/tag/pii.json")).unwrap();
    assert_eq!(on_disk, "{}\n");
    assert_eq!(area.staged_paths().unwrap(), vec!["staged/tag/pii.json".to_string()]);
    assert!(area.is_staged("staged/tag/pii.json").unwrap());
}

#[test]
fn test_restaging_identical_content_keeps_blob() {
    let temp = TempDir::new().unwrap();
    real_git_repo(temp.path());
    let area = StagingArea::open(temp.path()).unwrap();

    area.stage_file("a.json", b"same").unwrap();
    let first = area.staged_blob_id("a.json").unwrap();
    area.stage_file("a.json", b"same").unwrap();
    let second = area.staged_blob_id("a.json").unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_committed_unchanged_file_is_not_staged() {
    let temp = TempDir::new().unwrap();
    real_git_repo_with_commit(temp.path());
    let area = StagingArea::open(temp.path()).unwrap();

    assert!(area.staged_paths().unwrap().is_empty());

    area.stage_file("README.md", b"# Test\n").unwrap();
    assert!(!area.is_staged("README.md").unwrap());

    area.stage_file("README.md", b"# Changed\n").unwrap();
    assert!(area.is_staged("README.md").unwrap());
}

#[test]
fn test_stage_file_rejects_escaping_path() {
    let temp = TempDir::new().unwrap();
    real_git_repo(temp.path());
    let area = StagingArea::open(temp.path()).unwrap();

    let err = area.stage_file("../outside.json", b"x").unwrap_err();
    assert!(matches!(err, Error::Fs(_)));
}

#[test]
fn test_open_bare_repository_fails() {
    let temp = TempDir::new().unwrap();
    bare_git_repo(temp.path());

    let err = StagingArea::open(temp.path()).err().unwrap();
    assert!(matches!(err, Error::BareRepository { .. }));
}

#[test]
fn test_open_non_repository_fails() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(StagingArea::open(temp.path()), Err(Error::Git(_))));
}
