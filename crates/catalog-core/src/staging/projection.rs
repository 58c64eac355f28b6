//! Entity to artifact projection
//!
//! An entity is staged from its local-equivalent record, so remote-only
//! entities stage the same way as local ones. Each entity yields
//! `<type>/<slug>.json` and, when it has owners, `<type>/<slug>.ownership.json`.
//! Store-specific fields (local ids, fingerprints) are never written.

use std::collections::BTreeMap;

use serde::Serialize;

use super::EmitError;
use crate::model::{Entity, EntityType, Owner, PrincipalKind, RawLocal};

/// One file to be staged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Serialize)]
struct StagedEntity<'a> {
    urn: &'a str,
    entity_type: EntityType,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_urn: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    custom_properties: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct StagedOwnership<'a> {
    urn: &'a str,
    owners: Vec<StagedOwner<'a>>,
}

#[derive(Serialize)]
struct StagedOwner<'a> {
    owner: &'a str,
    kind: PrincipalKind,
    ownership_type: &'a str,
}

/// Project an entity into its artifacts.
///
/// # Errors
///
/// Returns [`EmitError::Unrepresentable`] for a missing identity key or
/// name, a self or empty parent reference, an owner that is not a principal
/// URN, or an empty custom property key.
pub fn project(entity: &Entity) -> Result<Vec<Artifact>, EmitError> {
    let record = entity.to_local_record();
    let identity_key = entity.identity_key.trim();
    let fail = |reason: String| EmitError::Unrepresentable {
        identity_key: entity.identity_key.clone(),
        reason,
    };

    if identity_key.is_empty() {
        return Err(fail("missing identity key".into()));
    }
    let name = record.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(fail("missing name".into()));
    }
    if let Some(parent) = record.parent_urn.as_deref() {
        if parent.trim().is_empty() {
            return Err(fail("empty parent reference".into()));
        }
        if parent == identity_key {
            return Err(fail("entity is its own parent".into()));
        }
    }
    if let Some(owner) = record
        .owners
        .iter()
        .find(|o| !o.principal_key.starts_with("urn:li:corp"))
    {
        return Err(fail(format!(
            "unresolvable owner reference {}",
            owner.principal_key
        )));
    }
    if record.custom_properties.keys().any(|k| k.trim().is_empty()) {
        return Err(fail("empty custom property key".into()));
    }

    let slug = slug(identity_key).ok_or_else(|| fail("cannot derive a file name".into()))?;
    let base = format!("{}/{slug}", entity.entity_type.as_str());

    let mut artifacts = vec![Artifact {
        file_name: format!("{base}.json"),
        content: encode(entity, &staged_entity(&record, identity_key, name))?,
    }];
    if !record.owners.is_empty() {
        artifacts.push(Artifact {
            file_name: format!("{base}.ownership.json"),
            content: encode(entity, &staged_ownership(identity_key, &record.owners))?,
        });
    }
    Ok(artifacts)
}

fn staged_entity<'a>(record: &'a RawLocal, urn: &'a str, name: &'a str) -> StagedEntity<'a> {
    StagedEntity {
        urn,
        entity_type: record.entity_type,
        name,
        description: record.description.as_deref(),
        color: record.color.as_deref(),
        category: record.category.as_deref(),
        parent_urn: record.parent_urn.as_deref(),
        custom_properties: &record.custom_properties,
    }
}

fn staged_ownership<'a>(urn: &'a str, owners: &'a [Owner]) -> StagedOwnership<'a> {
    let mut owners: Vec<StagedOwner<'a>> = owners
        .iter()
        .map(|o| StagedOwner {
            owner: &o.principal_key,
            kind: o.principal_kind,
            ownership_type: &o.ownership_type,
        })
        .collect();
    owners.sort_by(|a, b| (a.owner, a.ownership_type).cmp(&(b.owner, b.ownership_type)));
    StagedOwnership { urn, owners }
}

fn encode<T: Serialize>(entity: &Entity, value: &T) -> Result<Vec<u8>, EmitError> {
    let mut content = serde_json::to_vec_pretty(value).map_err(|source| EmitError::Encode {
        identity_key: entity.identity_key.clone(),
        source,
    })?;
    content.push(b'\n');
    Ok(content)
}

/// File-name stem from the last segment of an identity key
fn slug(identity_key: &str) -> Option<String> {
    let segment = identity_key.rsplit(':').next()?;
    let slug: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches('-');
    (!slug.is_empty()).then(|| slug.to_string())
}
