//! HGNC symbol table loaded from a tab-separated download

use super::NameResolver;
use crate::error::{EnrichmentError, Result};
use async_trait::async_trait;
use cogex_common::EntityId;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct HgncRecord {
    hgnc_id: String,
    symbol: String,
    #[serde(default)]
    prev_symbol: Option<String>,
    #[serde(default)]
    alias_symbol: Option<String>,
}

/// In-memory HGNC lookup.
///
/// Columns `hgnc_id` and `symbol` are required; `prev_symbol` and
/// `alias_symbol` may hold several `|`-separated symbols. A previous or
/// alias symbol shared by more than one gene is not resolved.
#[derive(Debug, Clone, Default)]
pub struct HgncTable {
    symbols: HashMap<String, EntityId>,
    previous: HashMap<String, Option<EntityId>>,
    aliases: HashMap<String, Option<EntityId>>,
    names: HashMap<EntityId, String>,
}

impl HgncTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut table = Self::default();
        for record in csv_reader.deserialize() {
            let record: HgncRecord = record?;
            let id: EntityId = record.hgnc_id.parse().map_err(|e| {
                EnrichmentError::resolution(format!("bad HGNC id '{}': {}", record.hgnc_id, e))
            })?;

            for symbol in split_symbols(record.prev_symbol.as_deref()) {
                insert_unique(&mut table.previous, symbol, &id);
            }
            for symbol in split_symbols(record.alias_symbol.as_deref()) {
                insert_unique(&mut table.aliases, symbol, &id);
            }
            table.symbols.insert(record.symbol.to_ascii_uppercase(), id.clone());
            table.names.insert(id, record.symbol);
        }

        info!(genes = table.names.len(), "Loaded HGNC table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Current, then previous, then alias symbols; case-insensitive
    pub fn lookup(&self, symbol: &str) -> Option<&EntityId> {
        let key = symbol.to_ascii_uppercase();
        self.symbols
            .get(&key)
            .or_else(|| self.previous.get(&key).and_then(Option::as_ref))
            .or_else(|| self.aliases.get(&key).and_then(Option::as_ref))
    }
}

fn split_symbols(field: Option<&str>) -> impl Iterator<Item = &str> {
    field
        .unwrap_or_default()
        .split('|')
        .map(|s| s.trim().trim_matches('"'))
        .filter(|s| !s.is_empty())
}

fn insert_unique(map: &mut HashMap<String, Option<EntityId>>, symbol: &str, id: &EntityId) {
    map.entry(symbol.to_ascii_uppercase())
        .and_modify(|existing| {
            if existing.as_ref() != Some(id) {
                *existing = None;
            }
        })
        .or_insert_with(|| Some(id.clone()));
}

#[async_trait]
impl NameResolver for HgncTable {
    async fn resolve_symbol(&self, symbol: &str) -> Result<Option<EntityId>> {
        Ok(self.lookup(symbol).cloned())
    }

    async fn name_for(&self, id: &EntityId) -> Result<Option<String>> {
        Ok(self.names.get(id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const TABLE: &str = "hgnc_id\tsymbol\tname\tprev_symbol\talias_symbol\n\
        HGNC:11998\tTP53\ttumor protein p53\t\tp53|LFS1\n\
        HGNC:3236\tEGFR\tepidermal growth factor receptor\tERBB\tERBB1|HER1\n\
        HGNC:3430\tERBB2\terb-b2 receptor tyrosine kinase 2\tNGL\tHER2|SHARED\n\
        HGNC:9999\tFAKE1\tfake gene\t\tSHARED\n";

    #[test]
    fn test_lookup_order() {
        let table = HgncTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup("tp53"), Some(&EntityId::hgnc("11998")));
        assert_eq!(table.lookup("ERBB"), Some(&EntityId::hgnc("3236")));
        assert_eq!(table.lookup("HER1"), Some(&EntityId::hgnc("3236")));
        assert_eq!(table.lookup("NOPE"), None);
    }

    #[test]
    fn test_shared_alias_is_ambiguous() {
        let table = HgncTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(table.lookup("SHARED"), None);
    }

    #[tokio::test]
    async fn test_names_are_symbols() {
        let table = HgncTable::from_reader(TABLE.as_bytes()).unwrap();
        let name = table.name_for(&EntityId::hgnc("3236")).await.unwrap();
        assert_eq!(name.as_deref(), Some("EGFR"));
    }
}
