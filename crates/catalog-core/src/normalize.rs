//! Entity normalization
//!
//! Pairs raw local and remote records by identity key and converts each pair
//! into the canonical [`Entity`]. All knowledge of the raw shapes lives here:
//!
//! - display attributes prefer the local record when one exists, then the
//!   remote's nested property bag, then empty defaults
//! - names fall back from the explicit field, to `properties.name`, to the
//!   last colon-delimited segment of the identity key, to `Unnamed <Type>`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::model::{Attributes, Entity, EntityType, RawLocal, RawRemote};

/// Which collaborator a raw record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSide {
    Local,
    Remote,
}

impl std::fmt::Display for RecordSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// A normalization failure for a single entity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Two records claim one identity key with different types
    #[error("identity conflict on {identity_key}: claimed as both {first} and {second}")]
    IdentityConflict {
        identity_key: String,
        first: EntityType,
        second: EntityType,
    },

    /// A second record of the same type and side; the first one is kept
    #[error("duplicate {side} record for {identity_key} ignored")]
    DuplicateRecord {
        identity_key: String,
        side: RecordSide,
    },
}

impl NormalizeError {
    pub fn identity_key(&self) -> &str {
        match self {
            Self::IdentityConflict { identity_key, .. }
            | Self::DuplicateRecord { identity_key, .. } => identity_key,
        }
    }
}

/// The raw inputs for one entity; at least one side is always present
#[derive(Debug, Clone, Copy)]
pub enum RecordPair<'a> {
    Local(&'a RawLocal),
    Remote(&'a RawRemote),
    Both(&'a RawLocal, &'a RawRemote),
}

impl<'a> RecordPair<'a> {
    /// Build a pair from optional sides, `None` when both are absent.
    pub fn from_options(local: Option<&'a RawLocal>, remote: Option<&'a RawRemote>) -> Option<Self> {
        match (local, remote) {
            (Some(l), Some(r)) => Some(Self::Both(l, r)),
            (Some(l), None) => Some(Self::Local(l)),
            (None, Some(r)) => Some(Self::Remote(r)),
            (None, None) => None,
        }
    }

    pub fn local(&self) -> Option<&'a RawLocal> {
        match *self {
            Self::Local(l) | Self::Both(l, _) => Some(l),
            Self::Remote(_) => None,
        }
    }

    pub fn remote(&self) -> Option<&'a RawRemote> {
        match *self {
            Self::Remote(r) | Self::Both(_, r) => Some(r),
            Self::Local(_) => None,
        }
    }
}

/// Identity key of a local record: its URN, or one derived from its name.
pub fn local_identity_key(local: &RawLocal) -> String {
    if let Some(urn) = local.urn.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        return urn.to_string();
    }
    let id = [local.name.as_deref(), Some(local.local_id.as_str())]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("unnamed");
    format!("urn:li:{}:{}", local.entity_type.urn_segment(), id)
}

/// Normalize one record pair into an entity.
///
/// # Errors
///
/// Returns [`NormalizeError::IdentityConflict`] when either record's type
/// disagrees with `entity_type`.
pub fn normalize(pair: RecordPair<'_>, entity_type: EntityType) -> Result<Entity, NormalizeError> {
    let local = pair.local();
    let remote = pair.remote();

    let identity_key = match pair {
        RecordPair::Remote(r) | RecordPair::Both(_, r) => r.urn.trim().to_string(),
        RecordPair::Local(l) => local_identity_key(l),
    };

    let conflict = |other: EntityType| NormalizeError::IdentityConflict {
        identity_key: identity_key.clone(),
        first: entity_type,
        second: other,
    };
    if let Some(l) = local
        && l.entity_type != entity_type
    {
        return Err(conflict(l.entity_type));
    }
    if let Some(t) = remote.and_then(|r| r.entity_type)
        && t != entity_type
    {
        return Err(conflict(t));
    }

    let props = remote.map(|r| &r.properties);
    // A local copy owns every display field, blank ones included, so a
    // cleared value is pushed instead of refilled from the remote bag.
    let pick = |local_value: Option<&Option<String>>, keys: &[&str]| -> String {
        match local_value {
            Some(v) => non_blank(v.as_deref()),
            None => props.and_then(|p| prop_str(p, keys)),
        }
        .unwrap_or_default()
    };

    let name = local
        .and_then(|l| non_blank(l.name.as_deref()))
        .or_else(|| remote.and_then(|r| non_blank(r.name.as_deref())))
        .or_else(|| props.and_then(|p| prop_str(p, &["name"])))
        .or_else(|| key_segment(&identity_key))
        .unwrap_or_else(|| format!("Unnamed {}", entity_type.display_name()));

    let attributes = Attributes {
        name,
        description: pick(local.map(|l| &l.description), &["description", "definition"]),
        color: pick(local.map(|l| &l.color), &["colorHex", "color"]),
        category: pick(local.map(|l| &l.category), &["category", "type"]),
        custom_properties: match local {
            Some(l) => l.custom_properties.clone(),
            None => props.map(custom_properties).unwrap_or_default(),
        },
    };

    let parent_key = local
        .and_then(|l| non_blank(l.parent_urn.as_deref()))
        .or_else(|| remote.and_then(|r| non_blank(r.parent_urn.as_deref())))
        .or_else(|| props.and_then(parent_from_properties));

    let ownership = match pair {
        RecordPair::Local(l) | RecordPair::Both(l, _) => l.owners.clone(),
        RecordPair::Remote(r) => r.ownership.clone(),
    };

    Ok(Entity {
        identity_key,
        local_id: local.map(|l| l.local_id.clone()),
        entity_type,
        attributes,
        parent_key,
        ownership,
        has_local: local.is_some(),
        has_remote: remote.is_some(),
        last_synced_fingerprint: local.and_then(|l| l.last_synced_fingerprint.clone()),
        remote_modified_fingerprint: remote.and_then(|r| r.version.clone()),
    })
}

/// Raw records that share an identity key
#[derive(Debug, Clone)]
pub struct PairedRecord {
    pub identity_key: String,
    pub entity_type: EntityType,
    pub local: Option<RawLocal>,
    pub remote: Option<RawRemote>,
}

impl PairedRecord {
    pub fn as_pair(&self) -> Option<RecordPair<'_>> {
        RecordPair::from_options(self.local.as_ref(), self.remote.as_ref())
    }
}

struct Slot {
    record: PairedRecord,
    conflict: Option<NormalizeError>,
}

/// Group raw records by identity key.
///
/// Output order is local records in listing order, followed by remote-only
/// records in listing order. Keys claimed with two different types are
/// removed from the output and reported; same-type duplicates keep the first
/// record and are reported.
///
/// `remotes` carries the type each record was listed under; a type reported
/// by the record itself takes precedence.
pub fn pair_records(
    locals: Vec<RawLocal>,
    remotes: Vec<(EntityType, RawRemote)>,
) -> (Vec<PairedRecord>, Vec<NormalizeError>) {
    let mut slots: Vec<Slot> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();

    let mut place = |key: String,
                     entity_type: EntityType,
                     local: Option<RawLocal>,
                     remote: Option<RawRemote>,
                     warnings: &mut Vec<NormalizeError>| {
        let side = if local.is_some() { RecordSide::Local } else { RecordSide::Remote };
        let Some(&position) = index.get(&key) else {
            index.insert(key.clone(), slots.len());
            slots.push(Slot {
                record: PairedRecord {
                    identity_key: key,
                    entity_type,
                    local,
                    remote,
                },
                conflict: None,
            });
            return;
        };

        let slot = &mut slots[position];
        if slot.record.entity_type != entity_type {
            if slot.conflict.is_none() {
                slot.conflict = Some(NormalizeError::IdentityConflict {
                    identity_key: key,
                    first: slot.record.entity_type,
                    second: entity_type,
                });
            }
            return;
        }

        let occupied = match side {
            RecordSide::Local => slot.record.local.is_some(),
            RecordSide::Remote => slot.record.remote.is_some(),
        };
        if occupied {
            warnings.push(NormalizeError::DuplicateRecord {
                identity_key: key,
                side,
            });
        } else if local.is_some() {
            slot.record.local = local;
        } else {
            slot.record.remote = remote;
        }
    };

    for local in locals {
        let key = local_identity_key(&local);
        let entity_type = local.entity_type;
        place(key, entity_type, Some(local), None, &mut warnings);
    }
    for (listed_type, remote) in remotes {
        let key = remote.urn.trim().to_string();
        let entity_type = remote.entity_type.unwrap_or(listed_type);
        place(key, entity_type, None, Some(remote), &mut warnings);
    }

    let mut paired = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot.conflict {
            Some(conflict) => warnings.push(conflict),
            None => paired.push(slot.record),
        }
    }
    (paired, warnings)
}

/// Pair and normalize raw listings into entities.
///
/// Entities that fail normalization are dropped and reported; the rest are
/// returned in pairing order.
pub fn normalize_all(
    locals: Vec<RawLocal>,
    remotes: Vec<(EntityType, RawRemote)>,
) -> (Vec<Entity>, Vec<NormalizeError>) {
    let (paired, mut warnings) = pair_records(locals, remotes);
    let mut entities = Vec::with_capacity(paired.len());

    for record in &paired {
        let Some(pair) = record.as_pair() else {
            continue;
        };
        match normalize(pair, record.entity_type) {
            Ok(entity) => entities.push(entity),
            Err(e) => warnings.push(e),
        }
    }

    for warning in &warnings {
        tracing::warn!(identity_key = warning.identity_key(), "{warning}");
    }
    (entities, warnings)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

fn key_segment(identity_key: &str) -> Option<String> {
    non_blank(identity_key.rsplit(':').next())
}

/// First non-blank scalar found under any of `keys`.
fn prop_str(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| scalar_to_string(props.get(*key)?))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `customProperties` as either `{key: value}` or `[{key, value}]`.
fn custom_properties(props: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    match props.get("customProperties") {
        Some(Value::Object(map)) => {
            for (key, value) in map {
                if let Some(v) = scalar_to_string(value) {
                    out.insert(key.clone(), v);
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let key = item.get("key").and_then(scalar_to_string);
                let value = item.get("value").and_then(scalar_to_string);
                if let (Some(k), Some(v)) = (key, value) {
                    out.insert(k, v);
                }
            }
        }
        _ => {}
    }
    out
}

/// `parentNode` as either a URN string or `{ "urn": ... }`.
fn parent_from_properties(props: &Map<String, Value>) -> Option<String> {
    match props.get("parentNode")? {
        Value::String(s) => non_blank(Some(s)),
        Value::Object(map) => map.get("urn").and_then(scalar_to_string),
        _ => None,
    }
}
