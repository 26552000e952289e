//! Over-representation analysis
//!
//! Each reference set is tested against the query with a one-sided Fisher
//! exact test; p-values are corrected across all tested sets at once.

use crate::error::Result;
use crate::gene_sets::GeneSetMapping;
use crate::stats::{self, ContingencyTable, CorrectionMethod};
use cogex_common::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Default significance threshold
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraOptions {
    /// `None` skips correction; rows are then ranked by p
    pub method: Option<CorrectionMethod>,
    pub alpha: f64,
    pub keep_insignificant: bool,
    /// Custom universe. Query and reference sets are restricted to it and
    /// its size replaces the universe size argument.
    #[serde(default)]
    pub background: Option<BTreeSet<String>>,
}

impl Default for OraOptions {
    fn default() -> Self {
        Self {
            method: Some(CorrectionMethod::FdrBh),
            alpha: DEFAULT_ALPHA,
            keep_insignificant: true,
            background: None,
        }
    }
}

/// One tested reference set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraRow {
    pub curie: EntityId,
    pub name: String,
    pub overlap: usize,
    pub set_size: usize,
    pub p: f64,
    /// Equal to `p` when correction is skipped
    pub q: f64,
    pub mlp: f64,
    pub mlq: f64,
}

/// Test every set in `reference_sets` for enrichment in `query`
pub fn ora(
    reference_sets: &GeneSetMapping,
    query: &BTreeSet<String>,
    universe_size: usize,
    options: &OraOptions,
) -> Result<Vec<OraRow>> {
    let restricted_query;
    let (query, universe_size) = match &options.background {
        Some(background) => {
            restricted_query = query.intersection(background).cloned().collect::<BTreeSet<_>>();
            (&restricted_query, background.len())
        },
        None => (query, universe_size),
    };

    let mut rows = Vec::with_capacity(reference_sets.len());
    for (term, members) in reference_sets {
        let set_size = match &options.background {
            Some(background) => members.intersection(background).count(),
            None => members.len(),
        };
        let overlap = members.intersection(query).count();
        let table = ContingencyTable::from_counts(overlap, query.len(), set_size, universe_size);
        let p = stats::fisher_exact_greater(&table)?;

        rows.push(OraRow {
            curie: term.id.clone(),
            name: term.name.clone(),
            overlap,
            set_size,
            p,
            q: p,
            mlp: stats::minus_log10(p),
            mlq: stats::minus_log10(p),
        });
    }

    if let Some(method) = options.method {
        let p_values: Vec<f64> = rows.iter().map(|row| row.p).collect();
        let q_values = stats::correct(&p_values, method, options.alpha);
        for (row, q) in rows.iter_mut().zip(q_values) {
            row.q = q;
            row.mlq = stats::minus_log10(q);
        }
    }

    let tested = rows.len();
    if !options.keep_insignificant {
        rows.retain(|row| row.q < options.alpha);
    }

    rows.sort_by(|a, b| {
        a.q.total_cmp(&b.q)
            .then_with(|| a.p.total_cmp(&b.p))
            .then_with(|| a.curie.cmp(&b.curie))
    });

    debug!(
        tested,
        kept = rows.len(),
        query_size = query.len(),
        universe_size,
        "Over-representation analysis finished"
    );
    Ok(rows)
}
