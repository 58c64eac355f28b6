//! On-disk workspace fixture.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary directory with a `.catalog/` layout.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty workspace with `.catalog/local` and `.catalog/remote`.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        fs::create_dir_all(temp_dir.path().join(".catalog/local")).expect("create local dir");
        fs::create_dir_all(temp_dir.path().join(".catalog/remote")).expect("create remote dir");
        Self { temp_dir }
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `.catalog/config.toml`.
    pub fn with_config(self, content: &str) -> Self {
        fs::write(self.root().join(".catalog/config.toml"), content).expect("write config");
        self
    }

    /// Write `.catalog/config.local.toml`.
    pub fn with_local_config(self, content: &str) -> Self {
        fs::write(self.root().join(".catalog/config.local.toml"), content)
            .expect("write local config");
        self
    }

    /// Write a local-store file for an entity type (e.g. `tag`).
    pub fn with_local_records(self, entity_type: &str, json: &str) -> Self {
        fs::write(self.local_file(entity_type), json).expect("write local records");
        self
    }

    /// Write a remote-mirror file for an entity type.
    pub fn with_remote_records(self, entity_type: &str, json: &str) -> Self {
        fs::write(self.remote_file(entity_type), json).expect("write remote records");
        self
    }

    /// Path of the local-store file for an entity type.
    pub fn local_file(&self, entity_type: &str) -> PathBuf {
        self.root().join(format!(".catalog/local/{entity_type}.json"))
    }

    /// Path of the remote-mirror file for an entity type.
    pub fn remote_file(&self, entity_type: &str) -> PathBuf {
        self.root().join(format!(".catalog/remote/{entity_type}.json"))
    }

    /// Initialise a git repository at the workspace root.
    pub fn init_git(self) -> Self {
        crate::git::real_git_repo(self.root());
        self
    }
}
