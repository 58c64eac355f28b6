//! Index staging for review artifacts

use std::path::{Path, PathBuf};

use catalog_fs::{NormalizedPath, io, path::validate_relative};
use git2::{Repository, Status, StatusOptions};

use crate::{Error, Result};

/// Statuses that mean a path has changes recorded in the index.
const INDEX_CHANGES: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

/// A repository work tree into which files are written and staged.
pub struct StagingArea {
    repo: Repository,
    workdir: PathBuf,
}

impl StagingArea {
    /// Open the repository rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not a git repository or is bare.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path)?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::BareRepository {
                path: path.to_path_buf(),
            })?;
        Ok(Self { repo, workdir })
    }

    /// Root of the work tree.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Write `content` to `relative` inside the work tree and stage it.
    ///
    /// Writing identical content twice leaves the index entry unchanged.
    pub fn stage_file(&self, relative: &str, content: &[u8]) -> Result<()> {
        validate_relative(relative)?;

        let target = NormalizedPath::new(&self.workdir).join(relative);
        io::write_atomic(&target, content)?;

        let mut index = self.repo.index()?;
        index.add_path(Path::new(relative))?;
        index.write()?;

        tracing::debug!(path = relative, "staged artifact");
        Ok(())
    }

    /// Paths with index changes relative to HEAD, sorted.
    pub fn staged_paths(&self) -> Result<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut paths = Vec::new();
        for entry in statuses.iter() {
            if !entry.status().intersects(INDEX_CHANGES) {
                continue;
            }
            match entry.path() {
                Some(p) => paths.push(p.to_string()),
                None => {
                    return Err(Error::NonUtf8Path {
                        path: PathBuf::from(String::from_utf8_lossy(entry.path_bytes()).as_ref()),
                    });
                }
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Whether `relative` has index changes.
    pub fn is_staged(&self, relative: &str) -> Result<bool> {
        Ok(self.staged_paths()?.iter().any(|p| p == relative))
    }

    /// Object id of the blob staged for `relative`, if any.
    pub fn staged_blob_id(&self, relative: &str) -> Result<Option<String>> {
        let index = self.repo.index()?;
        Ok(index
            .get_path(Path::new(relative), 0)
            .map(|entry| entry.id.to_string()))
    }
}
