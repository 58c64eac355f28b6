//! Sync-state classification
//!
//! Classification is a pure function of four inputs: whether a local copy
//! exists, whether a remote copy exists, the fingerprint recorded with the
//! local copy at its last sync, and the remote's current fingerprint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::model::Entity;

/// Presence and freshness of an entity relative to the remote catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Synced,
    Modified,
    LocalOnly,
    RemoteOnly,
}

impl SyncState {
    pub const ALL: [SyncState; 4] = [
        SyncState::Synced,
        SyncState::Modified,
        SyncState::LocalOnly,
        SyncState::RemoteOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "SYNCED",
            Self::Modified => "MODIFIED",
            Self::LocalOnly => "LOCAL_ONLY",
            Self::RemoteOnly => "REMOTE_ONLY",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_uppercase();
        SyncState::ALL
            .into_iter()
            .find(|state| state.as_str() == wanted)
            .ok_or_else(|| Error::UnknownSyncState {
                value: s.to_string(),
            })
    }
}

/// How drift between two present copies is detected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMode {
    /// Compare the remote version marker with the last-synced fingerprint
    #[default]
    Fingerprint,
    /// Presence only: two present copies are always SYNCED
    Presence,
}

/// Raised when an entity has neither a local nor a remote copy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("internal consistency error: {identity_key} has neither a local nor a remote copy")]
    NoProvenance { identity_key: String },
}

/// Stateless sync-state classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classifier {
    mode: DriftMode,
}

impl Classifier {
    pub fn new(mode: DriftMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DriftMode {
        self.mode
    }

    /// Classify from the four raw inputs.
    ///
    /// Returns `None` only for `!has_local && !has_remote`.
    ///
    /// With both copies present, the entity is MODIFIED when the remote
    /// exposes a fingerprint and it differs from the last-synced one. A local
    /// copy with no recorded fingerprint has no baseline and also counts as
    /// MODIFIED against a fingerprinted remote.
    pub fn classify_parts(
        &self,
        has_local: bool,
        has_remote: bool,
        last_synced_fingerprint: Option<&str>,
        remote_fingerprint: Option<&str>,
    ) -> Option<SyncState> {
        match (has_local, has_remote) {
            (true, false) => Some(SyncState::LocalOnly),
            (false, true) => Some(SyncState::RemoteOnly),
            (false, false) => None,
            (true, true) => {
                let drifted = match (self.mode, remote_fingerprint) {
                    (DriftMode::Presence, _) | (DriftMode::Fingerprint, None) => false,
                    (DriftMode::Fingerprint, Some(remote)) => {
                        last_synced_fingerprint != Some(remote)
                    }
                };
                Some(if drifted {
                    SyncState::Modified
                } else {
                    SyncState::Synced
                })
            }
        }
    }

    /// Classify an entity.
    ///
    /// # Errors
    ///
    /// Returns [`ConsistencyError::NoProvenance`] when the entity has neither
    /// copy. The normalizer never produces such an entity.
    pub fn classify(&self, entity: &Entity) -> Result<SyncState, ConsistencyError> {
        self.classify_parts(
            entity.has_local,
            entity.has_remote,
            entity.last_synced_fingerprint.as_deref(),
            entity.remote_modified_fingerprint.as_deref(),
        )
        .ok_or_else(|| ConsistencyError::NoProvenance {
            identity_key: entity.identity_key.clone(),
        })
    }
}

/// Classify with fingerprint drift detection.
pub fn classify(entity: &Entity) -> Result<SyncState, ConsistencyError> {
    Classifier::default().classify(entity)
}
