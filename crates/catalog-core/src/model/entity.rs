//! The canonical entity

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{EntityType, RawLocal, RawRemote};

/// Kind of principal that can own an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    /// Infer the kind from a principal URN (`urn:li:corpGroup:*` is a group).
    pub fn from_urn(urn: &str) -> Self {
        if urn.starts_with("urn:li:corpGroup:") {
            Self::Group
        } else {
            Self::User
        }
    }
}

/// One ownership entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Owner {
    pub principal_key: String,
    pub principal_kind: PrincipalKind,
    #[serde(default = "default_ownership_type")]
    pub ownership_type: String,
}

fn default_ownership_type() -> String {
    "TECHNICAL_OWNER".to_string()
}

impl Owner {
    pub fn new(principal_key: impl Into<String>, ownership_type: impl Into<String>) -> Self {
        let principal_key = principal_key.into();
        Self {
            principal_kind: PrincipalKind::from_urn(&principal_key),
            principal_key,
            ownership_type: ownership_type.into(),
        }
    }
}

/// Display attributes of an entity
///
/// Absent values are empty strings or empty maps, never `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub custom_properties: BTreeMap<String, String>,
}

/// Canonical record for one metadata item
///
/// Built by [`crate::normalize`]; `has_local` and `has_remote` are never both
/// false for an entity produced there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub identity_key: String,
    pub local_id: Option<String>,
    pub entity_type: EntityType,
    pub attributes: Attributes,
    pub parent_key: Option<String>,
    pub ownership: Vec<Owner>,
    pub has_local: bool,
    pub has_remote: bool,
    /// Remote fingerprint recorded with the local copy at its last sync
    pub last_synced_fingerprint: Option<String>,
    /// Current remote version marker, when the catalog exposes one
    pub remote_modified_fingerprint: Option<String>,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    /// Project this entity into a local-store record.
    ///
    /// Works for remote-only entities: the record carries no `local_id` and
    /// the store assigns one on upsert.
    pub fn to_local_record(&self) -> RawLocal {
        RawLocal {
            local_id: self.local_id.clone().unwrap_or_default(),
            urn: Some(self.identity_key.clone()),
            entity_type: self.entity_type,
            name: Some(self.attributes.name.clone()),
            description: non_empty(&self.attributes.description),
            color: non_empty(&self.attributes.color),
            category: non_empty(&self.attributes.category),
            parent_urn: self.parent_key.clone(),
            owners: self.ownership.clone(),
            custom_properties: self.attributes.custom_properties.clone(),
            last_synced_fingerprint: self.last_synced_fingerprint.clone(),
        }
    }

    /// Project this entity into the shape the remote catalog stores.
    ///
    /// The version marker is left unset; the catalog assigns it on push.
    pub fn to_remote_record(&self) -> RawRemote {
        let mut properties = Map::new();
        properties.insert("name".into(), Value::String(self.attributes.name.clone()));
        for (key, value) in [
            ("description", &self.attributes.description),
            ("colorHex", &self.attributes.color),
            ("category", &self.attributes.category),
        ] {
            if !value.is_empty() {
                properties.insert(key.into(), Value::String(value.clone()));
            }
        }
        if !self.attributes.custom_properties.is_empty() {
            let custom = self
                .attributes
                .custom_properties
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            properties.insert("customProperties".into(), Value::Object(custom));
        }

        RawRemote {
            urn: self.identity_key.clone(),
            entity_type: Some(self.entity_type),
            name: Some(self.attributes.name.clone()),
            properties,
            parent_urn: self.parent_key.clone(),
            ownership: self.ownership.clone(),
            version: None,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
