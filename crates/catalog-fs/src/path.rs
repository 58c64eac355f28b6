//! Forward-slash paths for workspace files
//!
//! Record files, config layers and staged artifacts are addressed with
//! forward slashes on every platform. [`NormalizedPath`] keeps that form and
//! converts to a native [`PathBuf`] only when touching the filesystem.

use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// A path stored with `/` separators
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: path.as_ref().to_string_lossy().replace('\\', "/"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Native form for I/O calls.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append `segment`, which may itself contain separators.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let base = self.inner.trim_end_matches('/');
        Self {
            inner: format!("{base}/{segment}"),
        }
    }

    /// Join a relative path that must stay beneath this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafePath`] for absolute paths, empty paths and any
    /// `..` component.
    pub fn join_relative(&self, relative: &str) -> Result<Self> {
        validate_relative(relative)?;
        Ok(self.join(relative))
    }

    /// Last component, ignoring a trailing separator.
    pub fn file_name(&self) -> Option<&str> {
        self.inner
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }

    /// Extension of the last component; dotfiles have none.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }
}

/// Check that `relative` is a non-empty path with no root, drive or `..`.
pub fn validate_relative(relative: &str) -> Result<()> {
    let normalized = relative.replace('\\', "/");
    let escapes = normalized.is_empty()
        || normalized.starts_with('/')
        || normalized.contains(':')
        || normalized
            .split('/')
            .any(|segment| segment.is_empty() || segment == "..");

    if escapes {
        return Err(Error::UnsafePath {
            path: relative.to_string(),
        });
    }
    Ok(())
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}
