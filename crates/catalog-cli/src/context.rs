//! Workspace context
//!
//! Locates the workspace root, resolves its configuration and wires the
//! file-backed collaborators every command works against.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalog_core::clock::SystemClock;
use catalog_core::collab::file::{FileCatalog, FileDirectory, FileLocalStore};
use catalog_core::collab::StagingSink;
use catalog_core::staging::{DirectorySink, GitSink};
use catalog_core::{
    CacheContext, ConfigResolver, Coordinator, Emitter, EntityType, OperationHandler,
    PrincipalDirectory, Reconciler, SinkKind, SyncConfig,
};
use catalog_fs::CatalogPath;

use crate::error::{CliError, Result};

/// Walk up from `cwd` to the nearest directory holding `.catalog/`.
///
/// Falls back to `cwd` so a fresh directory works as an empty workspace.
pub fn find_root(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .find(|dir| dir.join(CatalogPath::ConfigDir).is_dir())
        .unwrap_or(cwd)
        .to_path_buf()
}

/// Parse `--type` values, defaulting to every entity type.
pub fn parse_types(values: &[String]) -> Result<Vec<EntityType>> {
    parse_types_or(values, &EntityType::ALL)
}

/// Parse `--type` values, defaulting to `default`.
///
/// `glossary` selects both glossary types.
pub fn parse_types_or(values: &[String], default: &[EntityType]) -> Result<Vec<EntityType>> {
    if values.is_empty() {
        return Ok(default.to_vec());
    }
    let mut types = Vec::with_capacity(values.len());
    for value in values {
        for entity_type in EntityType::parse_group(value)? {
            if !types.contains(&entity_type) {
                types.push(entity_type);
            }
        }
    }
    Ok(types)
}

/// Everything a command needs for one workspace
pub struct Context {
    pub root: PathBuf,
    pub config: SyncConfig,
    pub connection_id: String,
    catalog: Arc<FileCatalog>,
    store: Arc<FileLocalStore>,
    directory: FileDirectory,
    caches: CacheContext,
}

impl Context {
    /// Load the context for `root`, or for the workspace around the current
    /// directory.
    pub fn load(root: Option<PathBuf>, connection: Option<String>) -> Result<Self> {
        let root = match root {
            Some(root) => root,
            None => find_root(&std::env::current_dir()?),
        };
        let config = ConfigResolver::new(&root).resolve()?;
        let connection_id = connection.unwrap_or_else(|| config.connection.default.clone());
        tracing::debug!(root = %root.display(), %connection_id, "loaded workspace context");

        Ok(Self {
            catalog: Arc::new(FileCatalog::in_workspace(&root)),
            store: Arc::new(FileLocalStore::in_workspace(&root)),
            directory: FileDirectory::in_workspace(&root),
            caches: CacheContext::new(Arc::new(SystemClock), config.cache_ttl()),
            root,
            config,
            connection_id,
        })
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.catalog.clone(), self.store.clone())
            .with_classifier(self.config.classifier())
    }

    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(self.config.item_timeout())
    }

    /// The per-item handler, writing staged artifacts to the configured sink.
    pub fn handler(&self, dry_run: bool) -> Result<OperationHandler> {
        let sink: Arc<dyn StagingSink> = match self.config.staging.sink {
            SinkKind::Directory => {
                Arc::new(DirectorySink::new(self.root.join(&self.config.staging.dir)))
            }
            SinkKind::Git => Arc::new(GitSink::open(&self.root, self.config.staging.dir.as_str())?),
        };
        Ok(
            OperationHandler::new(self.catalog.clone(), self.store.clone(), Emitter::new(sink))
                .with_dry_run(dry_run),
        )
    }

    /// Principal directory for the current connection.
    ///
    /// A directory that cannot be read degrades to raw principal keys.
    pub async fn principals(&self) -> Arc<PrincipalDirectory> {
        let cache = self.caches.get(&self.connection_id);
        match cache.principals(&self.directory).await {
            Ok(directory) => directory,
            Err(e) => {
                tracing::warn!(connection_id = %self.connection_id, "principal directory unavailable: {e}");
                Arc::new(PrincipalDirectory::new(Vec::new()))
            }
        }
    }
}

/// Fail with a user error unless `targets` is non-empty.
pub fn require_targets(targets: &[String]) -> Result<()> {
    if targets.is_empty() {
        return Err(CliError::user("no targets given; pass identity keys or --state"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_root_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".catalog")).unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_root(&nested), temp.path());
    }

    #[test]
    fn test_find_root_falls_back_to_cwd() {
        let temp = TempDir::new().unwrap();
        assert_eq!(find_root(temp.path()), temp.path());
    }

    #[test]
    fn test_parse_types_defaults_and_dedupes() {
        assert_eq!(parse_types(&[]).unwrap().len(), EntityType::ALL.len());
        assert_eq!(
            parse_types(&["tag".into(), "tag".into(), "domain".into()]).unwrap(),
            vec![EntityType::Tag, EntityType::Domain]
        );
        assert!(parse_types(&["nonsense".into()]).is_err());
        assert_eq!(
            parse_types(&["glossary".into(), "glossary_term".into()]).unwrap(),
            EntityType::GLOSSARY.to_vec()
        );
        assert_eq!(
            parse_types_or(&[], &EntityType::GLOSSARY).unwrap(),
            EntityType::GLOSSARY.to_vec()
        );
    }
}
