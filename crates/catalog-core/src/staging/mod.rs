//! Staged-change emission
//!
//! The [`Emitter`] projects an entity into review artifacts and hands them to
//! a [`StagingSink`]. Artifacts are deterministic: emitting an unchanged
//! entity twice produces the same file names with byte-identical content.

pub mod projection;
pub mod sink;

pub use projection::{Artifact, project};
pub use sink::{DirectorySink, GitSink};

use std::sync::Arc;

use crate::collab::StagingSink;
use crate::model::Entity;

/// Failure writing one artifact to a sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink rejected {file_name}: {message}")]
    Rejected { file_name: String, message: String },

    #[error(transparent)]
    Fs(#[from] catalog_fs::Error),

    #[error(transparent)]
    Git(#[from] catalog_git::Error),
}

/// Failure emitting an entity
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// The entity's attributes cannot be represented as artifacts
    #[error("cannot stage {identity_key}: {reason}")]
    Unrepresentable { identity_key: String, reason: String },

    #[error("failed to encode artifact for {identity_key}")]
    Encode {
        identity_key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Every artifact write failed
    #[error("no artifact for {identity_key} could be written ({attempted} attempted)")]
    NothingWritten {
        identity_key: String,
        attempted: usize,
    },
}

/// Result of emitting one entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emitted {
    /// Artifacts the sink accepted, in projection order
    pub file_names: Vec<String>,
    /// Artifacts the sink refused
    pub failed: Vec<String>,
}

/// Writes staged artifacts for entities
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<dyn StagingSink>,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

impl Emitter {
    pub fn new(sink: Arc<dyn StagingSink>) -> Self {
        Self { sink }
    }

    /// File names `emit` would write, without writing anything.
    pub fn plan(&self, entity: &Entity) -> Result<Vec<String>, EmitError> {
        Ok(project(entity)?
            .into_iter()
            .map(|a| a.file_name)
            .collect())
    }

    /// Project `entity` and write its artifacts.
    ///
    /// A remote-only entity is staged from its remote attributes. Artifacts
    /// the sink refuses are left out of [`Emitted::file_names`].
    ///
    /// # Errors
    ///
    /// [`EmitError::Unrepresentable`] when projection fails, and
    /// [`EmitError::NothingWritten`] when the sink refused every artifact.
    pub async fn emit(&self, entity: &Entity) -> Result<Emitted, EmitError> {
        let artifacts = project(entity)?;
        let attempted = artifacts.len();
        let mut emitted = Emitted::default();

        for artifact in artifacts {
            match self.sink.write(&artifact.file_name, &artifact.content).await {
                Ok(()) => emitted.file_names.push(artifact.file_name),
                Err(e) => {
                    tracing::warn!(file_name = %artifact.file_name, "failed to write staged artifact: {e}");
                    emitted.failed.push(artifact.file_name);
                }
            }
        }

        if emitted.file_names.is_empty() {
            return Err(EmitError::NothingWritten {
                identity_key: entity.identity_key.clone(),
                attempted,
            });
        }
        tracing::debug!(
            identity_key = %entity.identity_key,
            files = emitted.file_names.len(),
            "staged entity"
        );
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::memory::MemorySink;
    use crate::model::{Attributes, EntityType, Owner};
    use pretty_assertions::assert_eq;

    fn remote_only_term() -> Entity {
        Entity {
            identity_key: "urn:li:glossaryTerm:revenue".into(),
            local_id: None,
            entity_type: EntityType::GlossaryTerm,
            attributes: Attributes {
                name: "Revenue".into(),
                description: "Money in".into(),
                ..Attributes::default()
            },
            parent_key: Some("urn:li:glossaryNode:finance".into()),
            ownership: vec![Owner::new("urn:li:corpuser:ann", "TECHNICAL_OWNER")],
            has_local: false,
            has_remote: true,
            last_synced_fingerprint: None,
            remote_modified_fingerprint: Some("rev-3".into()),
        }
    }

    #[tokio::test]
    async fn remote_only_entity_stages() {
        let sink = Arc::new(MemorySink::new());
        let emitter = Emitter::new(sink.clone());

        let emitted = emitter.emit(&remote_only_term()).await.unwrap();

        assert_eq!(
            emitted.file_names,
            vec![
                "glossary_term/revenue.json".to_string(),
                "glossary_term/revenue.ownership.json".to_string(),
            ]
        );
        assert!(sink.file("glossary_term/revenue.json").is_some());
    }

    #[tokio::test]
    async fn emitting_twice_is_byte_identical() {
        let sink = Arc::new(MemorySink::new());
        let emitter = Emitter::new(sink.clone());
        let entity = remote_only_term();

        let first = emitter.emit(&entity).await.unwrap();
        let content = sink.file("glossary_term/revenue.json").unwrap();
        let second = emitter.emit(&entity).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(sink.file("glossary_term/revenue.json").unwrap(), content);
    }

    #[tokio::test]
    async fn refused_file_is_omitted() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_on("glossary_term/revenue.ownership.json");
        let emitter = Emitter::new(sink);

        let emitted = emitter.emit(&remote_only_term()).await.unwrap();

        assert_eq!(emitted.file_names, vec!["glossary_term/revenue.json".to_string()]);
        assert_eq!(
            emitted.failed,
            vec!["glossary_term/revenue.ownership.json".to_string()]
        );
    }

    #[tokio::test]
    async fn all_files_refused_is_an_error() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_on("glossary_term/revenue.json");
        sink.fail_on("glossary_term/revenue.ownership.json");
        let emitter = Emitter::new(sink);

        assert!(matches!(
            emitter.emit(&remote_only_term()).await,
            Err(EmitError::NothingWritten { attempted: 2, .. })
        ));
    }

    #[test]
    fn plan_lists_names_without_writing() {
        let sink = Arc::new(MemorySink::new());
        let emitter = Emitter::new(sink.clone());
        let names = emitter.plan(&remote_only_term()).unwrap();
        assert_eq!(names.len(), 2);
        assert!(sink.file_names().is_empty());
    }
}
