//! Git repository fixtures.
//!
//! Choose the lowest-realism fixture that satisfies your test's needs.

use std::fs;
use std::path::Path;

/// Initialises a real git repository using `git2` (no initial commit).
///
/// Use for: tests that stage files into the index but never read history.
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn real_git_repo(path: &Path) -> git2::Repository {
    git2::Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Initialises a real git repository with one commit containing `README.md`.
///
/// Use for: tests that compare the index against an existing HEAD tree.
///
/// # Panics
/// Panics if any git operation fails.
pub fn real_git_repo_with_commit(path: &Path) -> git2::Repository {
    let repo = real_git_repo(path);
    fs::write(path.join("README.md"), "# Test\n")
        .unwrap_or_else(|e| panic!("real_git_repo_with_commit: failed to write README: {e}"));

    {
        let mut index = repo.index().expect("index");
        index.add_path(Path::new("README.md")).expect("add README");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        let sig = git2::Signature::now("Test User", "test@example.com").expect("signature");
        repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
            .expect("initial commit");
    }

    repo
}

/// Initialises a bare repository (no work tree).
///
/// # Panics
/// Panics if `git2::Repository::init_bare` fails.
pub fn bare_git_repo(path: &Path) -> git2::Repository {
    git2::Repository::init_bare(path)
        .unwrap_or_else(|e| panic!("bare_git_repo: failed to init at {}: {e}", path.display()))
}
