//! Well-known locations inside a catalog workspace.

use std::path::Path;

/// Paths relative to the workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogPath {
    /// The `.catalog` directory (configuration and local state root)
    ConfigDir,
    /// Shared configuration, `.catalog/config.toml`
    ConfigFile,
    /// Git-ignored overrides, `.catalog/config.local.toml`
    LocalConfigFile,
    /// Local entity records, one JSON file per entity type
    LocalStoreDir,
    /// Offline mirror of the remote catalog
    RemoteMirrorDir,
}

impl CatalogPath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigDir => ".catalog",
            Self::ConfigFile => ".catalog/config.toml",
            Self::LocalConfigFile => ".catalog/config.local.toml",
            Self::LocalStoreDir => ".catalog/local",
            Self::RemoteMirrorDir => ".catalog/remote",
        }
    }
}

impl AsRef<Path> for CatalogPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for CatalogPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for CatalogPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
