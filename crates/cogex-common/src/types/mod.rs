//! Entity identifiers shared across CoGEx
//!
//! Graph nodes carry compact identifiers of the form `prefix:local_id`
//! ("curies"). [`EntityId`] is the typed form: the prefix is a closed
//! [`Namespace`] and the local id never repeats the prefix, so
//! `chebi:CHEBI:15377` and `CHEBI:15377` both parse to `chebi:15377`.

use crate::error::{CogexError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier namespace of a graph entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Hgnc,
    Go,
    Reactome,
    WikiPathways,
    Hp,
    Mesh,
    Chebi,
    EcCode,
    Fplx,
    Uniprot,
    Pubchem,
    Doid,
    Mondo,
    Efo,
    /// Any prefix without a dedicated variant, stored lower-cased
    Other(String),
}

impl Namespace {
    pub fn prefix(&self) -> &str {
        match self {
            Namespace::Hgnc => "hgnc",
            Namespace::Go => "go",
            Namespace::Reactome => "reactome",
            Namespace::WikiPathways => "wikipathways",
            Namespace::Hp => "hp",
            Namespace::Mesh => "mesh",
            Namespace::Chebi => "chebi",
            Namespace::EcCode => "eccode",
            Namespace::Fplx => "fplx",
            Namespace::Uniprot => "uniprot",
            Namespace::Pubchem => "pubchem",
            Namespace::Doid => "doid",
            Namespace::Mondo => "mondo",
            Namespace::Efo => "efo",
            Namespace::Other(prefix) => prefix,
        }
    }

    /// Parse a prefix case-insensitively. Never fails; unknown prefixes map
    /// to [`Namespace::Other`].
    pub fn from_prefix(prefix: &str) -> Self {
        let lower = prefix.to_ascii_lowercase();
        match lower.as_str() {
            "hgnc" => Namespace::Hgnc,
            "go" => Namespace::Go,
            "reactome" => Namespace::Reactome,
            "wikipathways" => Namespace::WikiPathways,
            "hp" => Namespace::Hp,
            "mesh" => Namespace::Mesh,
            "chebi" => Namespace::Chebi,
            "eccode" | "ec-code" | "ec" => Namespace::EcCode,
            "fplx" => Namespace::Fplx,
            "uniprot" => Namespace::Uniprot,
            "pubchem" | "pubchem.compound" => Namespace::Pubchem,
            "doid" => Namespace::Doid,
            "mondo" => Namespace::Mondo,
            "efo" => Namespace::Efo,
            _ => Namespace::Other(lower),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A `(namespace, local id)` pair identifying one graph entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub namespace: Namespace,
    pub local_id: String,
}

impl EntityId {
    /// Build an id, stripping a repeated prefix from `local_id`.
    pub fn new(namespace: Namespace, local_id: impl Into<String>) -> Self {
        let local_id = local_id.into();
        let local_id = strip_redundant_prefix(&namespace, &local_id).to_string();
        Self {
            namespace,
            local_id,
        }
    }

    pub fn hgnc(local_id: impl Into<String>) -> Self {
        Self::new(Namespace::Hgnc, local_id)
    }

    pub fn chebi(local_id: impl Into<String>) -> Self {
        Self::new(Namespace::Chebi, local_id)
    }

    pub fn is_in(&self, namespace: &Namespace) -> bool {
        &self.namespace == namespace
    }

    /// The curie as stored on graph nodes, e.g. `hgnc:1100`
    pub fn curie(&self) -> String {
        self.to_string()
    }
}

fn strip_redundant_prefix<'a>(namespace: &Namespace, local_id: &'a str) -> &'a str {
    let prefix = namespace.prefix();
    match local_id.split_once(':') {
        Some((head, rest)) if head.eq_ignore_ascii_case(prefix) && !rest.is_empty() => rest,
        _ => local_id,
    }
}

impl FromStr for EntityId {
    type Err = CogexError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (prefix, local_id) = trimmed
            .split_once(':')
            .ok_or_else(|| CogexError::invalid_identifier(s, "missing ':' separator"))?;

        if prefix.is_empty() {
            return Err(CogexError::invalid_identifier(s, "empty namespace"));
        }

        let id = EntityId::new(Namespace::from_prefix(prefix), local_id);
        if id.local_id.is_empty() {
            return Err(CogexError::invalid_identifier(s, "empty local id"));
        }

        Ok(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.local_id)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A reference entity with its display name; the key of every gene-set mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    pub id: EntityId,
    pub name: String,
}

impl Term {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
