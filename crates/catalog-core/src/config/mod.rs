//! Layered configuration
//!
//! [`ConfigResolver`] merges, in order:
//! 1. Global defaults (`<config_dir>/catalog-sync/config.toml`)
//! 2. Workspace config (`.catalog/config.toml`)
//! 3. Local overrides (`.catalog/config.local.toml`), git-ignored
//!
//! Tables merge key by key, later layers winning. Missing layers are skipped;
//! a layer that is not valid TOML, or that holds a value of the wrong type,
//! is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog_fs::{CatalogPath, ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};
use toml::Value;

use crate::classify::{Classifier, DriftMode};
use crate::hierarchy::SortOrder;
use crate::{Error, Result};

/// Effective configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub sync: SyncSection,
    pub cache: CacheSection,
    pub staging: StagingSection,
    pub connection: ConnectionSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Timeout for each per-item call of a bulk job
    pub item_timeout_secs: u64,
    pub drift: DriftMode,
    /// Sort hierarchy roots by name instead of listing order
    pub sort_roots: bool,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            item_timeout_secs: 30,
            drift: DriftMode::Fingerprint,
            sort_roots: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// Where staged artifacts go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Plain files under the staging directory
    #[default]
    Directory,
    /// Files under the staging directory, added to the git index
    Git,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingSection {
    /// Staging directory, relative to the workspace root
    pub dir: String,
    pub sink: SinkKind,
}

impl Default for StagingSection {
    fn default() -> Self {
        Self {
            dir: "staged".to_string(),
            sink: SinkKind::Directory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSection {
    /// Connection id used when none is given
    pub default: String,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            default: "default".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.item_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.sync.drift)
    }

    pub fn root_order(&self) -> SortOrder {
        if self.sync.sort_roots {
            SortOrder::RootsByName
        } else {
            SortOrder::Input
        }
    }
}

/// Resolves [`SyncConfig`] for a workspace
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    root: NormalizedPath,
    /// Override for the global config directory; `dirs::config_dir()` otherwise
    global_config_dir_override: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: NormalizedPath::new(root),
            global_config_dir_override: None,
        }
    }

    /// Use `global_config_dir` instead of the platform config directory.
    pub fn with_global_config_dir(root: impl AsRef<Path>, global_config_dir: PathBuf) -> Self {
        Self {
            root: NormalizedPath::new(root),
            global_config_dir_override: Some(global_config_dir),
        }
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.global_config_dir_override {
            return Some(dir.clone());
        }
        dirs::config_dir().map(|d| d.join("catalog-sync"))
    }

    /// Config files in merge order, whether or not they exist
    pub fn layers(&self) -> Vec<NormalizedPath> {
        let mut layers = Vec::with_capacity(3);
        if let Some(dir) = self.global_config_dir() {
            layers.push(NormalizedPath::new(dir.join("config.toml")));
        }
        layers.push(self.root.join(CatalogPath::ConfigFile.as_str()));
        layers.push(self.root.join(CatalogPath::LocalConfigFile.as_str()));
        layers
    }

    /// Merge every existing layer into the effective configuration.
    pub fn resolve(&self) -> Result<SyncConfig> {
        let store = ConfigStore::new();
        let mut merged = Value::Table(toml::Table::new());
        for path in self.layers() {
            let layer = match store.load_optional::<toml::Table>(&path) {
                Ok(Some(layer)) => layer,
                Ok(None) => {
                    tracing::debug!(%path, "no config layer, skipping");
                    continue;
                }
                Err(catalog_fs::Error::ConfigParse { path, message, .. }) => {
                    return Err(Error::InvalidConfig { path, message });
                }
                Err(e) => return Err(e.into()),
            };
            tracing::debug!(%path, "loaded config layer");
            merge(&mut merged, Value::Table(layer));
        }

        merged.try_into().map_err(|e: toml::de::Error| Error::InvalidConfig {
            path: self.root.join(CatalogPath::ConfigFile.as_str()).to_native(),
            message: e.to_string(),
        })
    }

    /// Write the default configuration to `.catalog/config.toml` unless the
    /// file already exists. Returns whether a file was written.
    pub fn write_default(&self) -> Result<bool> {
        let path = self.root.join(CatalogPath::ConfigFile.as_str());
        if path.to_native().exists() {
            return Ok(false);
        }
        ConfigStore::new().save(&path, &SyncConfig::default())?;
        tracing::info!(%path, "wrote default configuration");
        Ok(true)
    }
}

/// Deep-merge `overlay` into `base`; non-table values replace.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(text: &str) -> Value {
        Value::Table(toml::from_str(text).unwrap())
    }

    #[test]
    fn empty_config_is_default() {
        let config: SyncConfig = table("").try_into().unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.item_timeout(), Duration::from_secs(30));
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.root_order(), SortOrder::Input);
    }

    #[test]
    fn merge_overrides_leaf_values_only() {
        let mut base = table("[sync]\nitem_timeout_secs = 10\nsort_roots = true\n");
        merge(&mut base, table("[sync]\nitem_timeout_secs = 5\n"));
        let config: SyncConfig = base.try_into().unwrap();
        assert_eq!(config.sync.item_timeout_secs, 5);
        assert!(config.sync.sort_roots);
    }

    #[test]
    fn presence_mode_parses() {
        let config: SyncConfig = table("[sync]\ndrift = \"presence\"\n[staging]\nsink = \"git\"\n")
            .try_into()
            .unwrap();
        assert_eq!(config.classifier().mode(), DriftMode::Presence);
        assert_eq!(config.staging.sink, SinkKind::Git);
    }

    #[test]
    fn default_config_survives_a_save() {
        let temp = tempfile::TempDir::new().unwrap();
        let resolver = ConfigResolver::with_global_config_dir(temp.path(), temp.path().join("global"));

        assert!(resolver.write_default().unwrap());
        assert!(!resolver.write_default().unwrap());
        assert_eq!(resolver.resolve().unwrap(), SyncConfig::default());
    }
}
