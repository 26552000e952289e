//! Differential-expression score files

use crate::error::{EnrichmentError, Result};
use crate::resolver::{resolve_token, NameResolver};
use cogex_common::Namespace;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Fewest scored genes a continuous analysis accepts
pub const MINIMUM_SCORED_GENES: usize = 2;

/// Symbol lookups in flight at once while reading a score file
pub const RESOLVE_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreColumns {
    /// Column holding gene symbols or HGNC ids
    pub id_column: String,
    /// Column holding the score, typically a log fold change
    pub score_column: String,
}

impl Default for ScoreColumns {
    fn default() -> Self {
        Self {
            id_column: "gene_name".to_string(),
            score_column: "log2FoldChange".to_string(),
        }
    }
}

/// HGNC local id to score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    pub scores: HashMap<String, f64>,
    /// Id-column values that did not resolve to an HGNC gene
    pub unresolved: Vec<String>,
}

impl ScoreTable {
    /// Read a CSV (`.csv`) or tab-separated (anything else) score file
    pub async fn from_path(
        path: &Path,
        columns: &ScoreColumns,
        resolver: Option<&dyn NameResolver>,
    ) -> Result<Self> {
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
            _ => b'\t',
        };
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, delimiter, columns, resolver).await
    }

    pub async fn from_reader(
        reader: impl Read,
        delimiter: u8,
        columns: &ScoreColumns,
        resolver: Option<&dyn NameResolver>,
    ) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
                EnrichmentError::config(format!(
                    "column '{}' not found; available columns: {}",
                    name,
                    headers.iter().collect::<Vec<_>>().join(", ")
                ))
            })
        };
        let id_index = column(&columns.id_column)?;
        let score_index = column(&columns.score_column)?;

        // rows without an id or a numeric score are skipped before resolution
        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for record in csv_reader.records() {
            let record = record?;
            let id = record.get(id_index).map(str::trim).unwrap_or_default();
            let score = record
                .get(score_index)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|s| s.is_finite());
            match score {
                Some(score) if !id.is_empty() => rows.push((id.to_string(), score)),
                _ => skipped += 1,
            }
        }

        // results come back in row order, so the first row of a gene wins
        let resolved: Vec<_> = stream::iter(rows)
            .map(|(token, score)| async move {
                let id = resolve_token(&token, &Namespace::Hgnc, resolver).await?;
                Ok::<_, EnrichmentError>((token, score, id))
            })
            .buffered(RESOLVE_CONCURRENCY)
            .try_collect()
            .await?;

        let mut table = Self::default();
        let mut duplicates = 0usize;
        for (token, score, id) in resolved {
            match id {
                Some(id) => {
                    if table.scores.contains_key(&id.local_id) {
                        duplicates += 1;
                    } else {
                        table.scores.insert(id.local_id, score);
                    }
                },
                None => table.unresolved.push(token),
            }
        }

        if skipped > 0 || duplicates > 0 {
            warn!(skipped, duplicates, "Ignored score rows");
        }
        info!(
            scored = table.scores.len(),
            unresolved = table.unresolved.len(),
            "Read score table"
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
