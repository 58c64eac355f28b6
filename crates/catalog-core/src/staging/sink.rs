//! Filesystem and git staging sinks

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use catalog_fs::{NormalizedPath, io};
use catalog_git::StagingArea;

use super::SinkError;
use crate::collab::StagingSink;

/// Writes artifacts under a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: NormalizedPath,
}

impl DirectorySink {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: NormalizedPath::new(root),
        }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }
}

#[async_trait]
impl StagingSink for DirectorySink {
    async fn write(&self, file_name: &str, content: &[u8]) -> Result<(), SinkError> {
        let target = self.root.join_relative(file_name)?;
        io::write_atomic(&target, content)?;
        Ok(())
    }
}

/// Writes artifacts into a git work tree and adds them to the index
pub struct GitSink {
    area: Mutex<StagingArea>,
    prefix: String,
}

impl std::fmt::Debug for GitSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitSink")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl GitSink {
    /// Open the repository at `repo_root`; artifacts go under `prefix`.
    ///
    /// # Errors
    ///
    /// Fails when `repo_root` is not a non-bare git repository.
    pub fn open(repo_root: &Path, prefix: impl Into<String>) -> Result<Self, SinkError> {
        Ok(Self {
            area: Mutex::new(StagingArea::open(repo_root)?),
            prefix: prefix.into().trim_matches('/').to_string(),
        })
    }

    fn relative(&self, file_name: &str) -> String {
        if self.prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{file_name}", self.prefix)
        }
    }

    /// Paths currently staged in the index
    pub fn staged_paths(&self) -> Result<Vec<String>, SinkError> {
        let area = self.area.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(area.staged_paths()?)
    }
}

#[async_trait]
impl StagingSink for GitSink {
    async fn write(&self, file_name: &str, content: &[u8]) -> Result<(), SinkError> {
        let relative = self.relative(file_name);
        let area = self.area.lock().unwrap_or_else(PoisonError::into_inner);
        area.stage_file(&relative, content)?;
        Ok(())
    }
}
