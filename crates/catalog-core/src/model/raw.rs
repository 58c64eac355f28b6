//! Raw record shapes as the collaborators deliver them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{EntityType, Owner};

/// A record from the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLocal {
    /// Store-assigned identifier; empty for a record not yet stored
    #[serde(default)]
    pub local_id: String,
    /// Catalog URN, absent until the record has been pushed or pulled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_urn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<Owner>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_fingerprint: Option<String>,
}

impl RawLocal {
    /// A minimal record with only an id, a type and a name.
    pub fn new(local_id: impl Into<String>, entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            urn: None,
            entity_type,
            name: Some(name.into()),
            description: None,
            color: None,
            category: None,
            parent_urn: None,
            owners: Vec::new(),
            custom_properties: BTreeMap::new(),
            last_synced_fingerprint: None,
        }
    }

    pub fn with_urn(mut self, urn: impl Into<String>) -> Self {
        self.urn = Some(urn.into());
        self
    }

    pub fn with_parent(mut self, parent_urn: impl Into<String>) -> Self {
        self.parent_urn = Some(parent_urn.into());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.last_synced_fingerprint = Some(fingerprint.into());
        self
    }
}

/// A record from the remote catalog
///
/// Display attributes live in the nested `properties` bag, whose keys follow
/// the catalog's camelCase conventions (`name`, `description`, `colorHex`,
/// `customProperties`, `parentNode`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRemote {
    pub urn: String,
    /// Type the catalog reports, when it reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_urn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ownership: Vec<Owner>,
    /// Version marker; its absence disables drift detection for this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl RawRemote {
    pub fn new(urn: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            entity_type: None,
            name: None,
            properties: Map::new(),
            parent_urn: None,
            ownership: Vec::new(),
            version: None,
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn with_parent(mut self, parent_urn: impl Into<String>) -> Self {
        self.parent_urn = Some(parent_urn.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}
