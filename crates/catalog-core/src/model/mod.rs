//! Canonical metadata model
//!
//! Raw records from the local store ([`RawLocal`]) and the remote catalog
//! ([`RawRemote`]) are converted once, by the normalizer, into a single
//! [`Entity`] shape that every other component consumes.

mod entity;
mod raw;

pub use entity::{Attributes, Entity, Owner, PrincipalKind};
pub use raw::{RawLocal, RawRemote};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Kind of metadata entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Tag,
    Domain,
    GlossaryTerm,
    GlossaryNode,
    Test,
    DataProduct,
    DataContract,
    Assertion,
}

impl EntityType {
    /// Every entity type, in a stable order
    pub const ALL: [EntityType; 8] = [
        EntityType::Tag,
        EntityType::Domain,
        EntityType::GlossaryTerm,
        EntityType::GlossaryNode,
        EntityType::Test,
        EntityType::DataProduct,
        EntityType::DataContract,
        EntityType::Assertion,
    ];

    /// The glossary types, nodes first so parents precede children
    pub const GLOSSARY: [EntityType; 2] = [EntityType::GlossaryNode, EntityType::GlossaryTerm];

    /// Snake-case name used in files and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Domain => "domain",
            Self::GlossaryTerm => "glossary_term",
            Self::GlossaryNode => "glossary_node",
            Self::Test => "test",
            Self::DataProduct => "data_product",
            Self::DataContract => "data_contract",
            Self::Assertion => "assertion",
        }
    }

    /// Entity segment used in catalog URNs (`urn:li:<segment>:<id>`)
    pub fn urn_segment(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Domain => "domain",
            Self::GlossaryTerm => "glossaryTerm",
            Self::GlossaryNode => "glossaryNode",
            Self::Test => "test",
            Self::DataProduct => "dataProduct",
            Self::DataContract => "dataContract",
            Self::Assertion => "assertion",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tag => "Tag",
            Self::Domain => "Domain",
            Self::GlossaryTerm => "Glossary Term",
            Self::GlossaryNode => "Glossary Node",
            Self::Test => "Test",
            Self::DataProduct => "Data Product",
            Self::DataContract => "Data Contract",
            Self::Assertion => "Assertion",
        }
    }

    /// Parse a type name or the `glossary` group (nodes and terms).
    pub fn parse_group(s: &str) -> Result<Vec<EntityType>, Error> {
        if s.trim().eq_ignore_ascii_case("glossary") {
            return Ok(Self::GLOSSARY.to_vec());
        }
        Ok(vec![s.parse()?])
    }

    /// Whether entities of this type carry parent/child relationships
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, Self::GlossaryTerm | Self::GlossaryNode)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    /// Accepts the snake-case name, the URN segment, or a kebab-case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted || t.urn_segment() == s.trim())
            .ok_or_else(|| Error::UnknownEntityType {
                value: s.to_string(),
            })
    }
}
