//! Per-item implementation of each bulk operation

use std::sync::Arc;

use async_trait::async_trait;

use super::{BulkOperation, ItemError, ItemHandler, ItemOutcome};
use crate::collab::{LocalStore, RemoteCatalog};
use crate::model::Entity;
use crate::normalize::{self, RecordPair};
use crate::snapshot::ClassifiedEntity;
use crate::staging::Emitter;

/// Applies bulk operations through the collaborators
///
/// With `dry_run` set, preconditions are still checked but no collaborator
/// is called; each item reports what it would have done.
#[derive(Clone)]
pub struct OperationHandler {
    remote: Arc<dyn RemoteCatalog>,
    local: Arc<dyn LocalStore>,
    emitter: Emitter,
    dry_run: bool,
}

impl std::fmt::Debug for OperationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationHandler")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl OperationHandler {
    pub fn new(remote: Arc<dyn RemoteCatalog>, local: Arc<dyn LocalStore>, emitter: Emitter) -> Self {
        Self {
            remote,
            local,
            emitter,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn push(&self, entity: &Entity) -> Result<ItemOutcome, ItemError> {
        if !entity.has_local {
            return Err(ItemError::validation(format!(
                "{} has no local copy to push",
                entity.identity_key
            )));
        }
        if self.dry_run {
            return Ok(would(format!("push {}", entity.identity_key)));
        }

        let version = self.remote.push(entity).await?;
        let mut record = entity.to_local_record();
        if version.is_some() {
            record.last_synced_fingerprint = version.clone();
        }
        self.local.upsert(record).await?;

        Ok(ItemOutcome::message(match version {
            Some(v) => format!("pushed {} at {v}", entity.identity_key),
            None => format!("pushed {}", entity.identity_key),
        }))
    }

    async fn pull(&self, entity: &Entity) -> Result<ItemOutcome, ItemError> {
        if !entity.has_remote {
            return Err(ItemError::validation(format!(
                "{} has no remote copy to pull",
                entity.identity_key
            )));
        }
        if self.dry_run {
            return Ok(would(format!("pull {}", entity.identity_key)));
        }

        let remote = self
            .remote
            .pull(&entity.identity_key)
            .await?
            .ok_or_else(|| ItemError::Stale {
                identity_key: entity.identity_key.clone(),
            })?;
        let pulled = normalize::normalize(RecordPair::Remote(&remote), entity.entity_type)
            .map_err(|e| ItemError::validation(e.to_string()))?;

        let mut record = pulled.to_local_record();
        record.local_id = entity.local_id.clone().unwrap_or_default();
        record.last_synced_fingerprint = remote.version.clone();
        let local_id = self.local.upsert(record).await?;

        Ok(ItemOutcome::message(format!(
            "pulled {} into {local_id}",
            entity.identity_key
        )))
    }

    async fn delete_local(&self, entity: &Entity) -> Result<ItemOutcome, ItemError> {
        let local_id = entity
            .local_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ItemError::validation(format!("{} has no local copy", entity.identity_key))
            })?;
        if self.dry_run {
            return Ok(would(format!("delete local record {local_id}")));
        }
        self.local.delete(local_id).await?;
        Ok(ItemOutcome::message(format!("deleted local record {local_id}")))
    }

    async fn delete_remote(&self, entity: &Entity) -> Result<ItemOutcome, ItemError> {
        if !entity.has_remote {
            return Err(ItemError::validation(format!(
                "{} has no remote copy",
                entity.identity_key
            )));
        }
        if self.dry_run {
            return Ok(would(format!("delete {} remotely", entity.identity_key)));
        }
        self.remote.delete(&entity.identity_key).await?;
        Ok(ItemOutcome::message(format!(
            "deleted {} remotely",
            entity.identity_key
        )))
    }

    async fn stage(&self, entity: &Entity) -> Result<ItemOutcome, ItemError> {
        if self.dry_run {
            let names = self.emitter.plan(entity)?;
            return Ok(would(format!("stage {}", names.join(", "))));
        }
        let emitted = self.emitter.emit(entity).await?;
        Ok(ItemOutcome::artifacts(emitted.file_names))
    }
}

fn would(action: String) -> ItemOutcome {
    ItemOutcome::message(format!("[dry-run] Would {action}"))
}

#[async_trait]
impl ItemHandler for OperationHandler {
    async fn handle(
        &self,
        operation: BulkOperation,
        entity: &ClassifiedEntity,
    ) -> Result<ItemOutcome, ItemError> {
        let entity = &entity.entity;
        match operation {
            BulkOperation::SyncToRemote => self.push(entity).await,
            BulkOperation::SyncToLocal => self.pull(entity).await,
            BulkOperation::DeleteLocal => self.delete_local(entity).await,
            BulkOperation::DeleteRemote => self.delete_remote(entity).await,
            BulkOperation::StageForReview => self.stage(entity).await,
        }
    }
}
