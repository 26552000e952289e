//! Gene-set enrichment analysis on pre-ranked scores

mod prerank;
pub mod report;

pub use prerank::{
    enrichment_score, running_enrichment, EnrichmentParams, EnrichmentRecord, PermutationEnrichment,
    PrerankEnrichment,
};

use crate::error::{EnrichmentError, Result};
use crate::gene_sets::GeneSetMapping;
use cogex_common::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_PERMUTATION_NUM: usize = 100;
pub const DEFAULT_MIN_SIZE: usize = 15;
pub const DEFAULT_MAX_SIZE: usize = 500;
pub const DEFAULT_PLOT_COUNT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GseaOptions {
    pub permutation_num: usize,
    pub seed: Option<u64>,
    pub min_size: usize,
    pub max_size: usize,
    pub weight: f64,
    pub alpha: f64,
    /// When false, rows with a nominal p-value not below `alpha` are dropped
    pub keep_insignificant: bool,
    /// Report and plots are written here when set
    pub directory: Option<PathBuf>,
    pub plot_count: usize,
}

impl Default for GseaOptions {
    fn default() -> Self {
        Self {
            permutation_num: DEFAULT_PERMUTATION_NUM,
            seed: None,
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            weight: 1.0,
            alpha: crate::ora::DEFAULT_ALPHA,
            keep_insignificant: true,
            directory: None,
            plot_count: DEFAULT_PLOT_COUNT,
        }
    }
}

impl GseaOptions {
    fn params(&self) -> EnrichmentParams {
        EnrichmentParams {
            permutation_num: self.permutation_num,
            seed: self.seed,
            min_size: self.min_size,
            max_size: self.max_size,
            weight: self.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GseaRow {
    pub curie: EntityId,
    pub name: String,
    pub es: f64,
    pub nes: f64,
    pub pval: f64,
    pub fdr: f64,
    pub geneset_size: usize,
    pub matched_size: usize,
}

impl From<&EnrichmentRecord> for GseaRow {
    fn from(record: &EnrichmentRecord) -> Self {
        Self {
            curie: record.term.id.clone(),
            name: record.term.name.clone(),
            es: record.es,
            nes: record.nes,
            pval: record.pval,
            fdr: record.fdr,
            geneset_size: record.geneset_size,
            matched_size: record.matched_size(),
        }
    }
}

/// Genes ordered by descending score
#[derive(Debug, Clone)]
pub struct Ranking {
    genes: Vec<String>,
    scores: Vec<f64>,
    ranks: HashMap<String, usize>,
}

impl Ranking {
    /// Sort scores descending, ties by gene id. Non-finite scores are dropped.
    pub fn from_scores(scores: &HashMap<String, f64>) -> Result<Self> {
        let mut entries: Vec<(&String, f64)> = Vec::with_capacity(scores.len());
        let mut dropped = 0usize;
        for (gene, &score) in scores {
            if score.is_finite() {
                entries.push((gene, score));
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(dropped, "Dropped genes with non-finite scores");
        }
        if entries.is_empty() {
            return Err(EnrichmentError::insufficient_data("no finite gene scores to rank"));
        }

        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let genes: Vec<String> = entries.iter().map(|(g, _)| (*g).clone()).collect();
        let ranks = genes.iter().enumerate().map(|(i, g)| (g.clone(), i)).collect();
        Ok(Self {
            genes,
            scores: entries.into_iter().map(|(_, s)| s).collect(),
            ranks,
        })
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Ascending ranks of the members present in the ranking
    pub fn positions(&self, members: &BTreeSet<String>) -> Vec<usize> {
        let mut positions: Vec<usize> = members.iter().filter_map(|m| self.ranks.get(m).copied()).collect();
        positions.sort_unstable();
        positions
    }
}

pub struct GseaEngine {
    strategy: Box<dyn PermutationEnrichment>,
}

impl Default for GseaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GseaEngine {
    pub fn new() -> Self {
        Self::with_strategy(PrerankEnrichment)
    }

    pub fn with_strategy(strategy: impl PermutationEnrichment + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    /// Run enrichment of `gene_sets` against the ranked `scores`.
    ///
    /// Rows are ordered by descending `|nes|`. With `options.directory` set the
    /// full table and running-score plots are written there.
    pub fn gsea(
        &self,
        scores: &HashMap<String, f64>,
        gene_sets: &GeneSetMapping,
        options: &GseaOptions,
    ) -> Result<Vec<GseaRow>> {
        if options.min_size > options.max_size {
            return Err(EnrichmentError::config(format!(
                "min_size {} exceeds max_size {}",
                options.min_size, options.max_size
            )));
        }

        let ranking = Ranking::from_scores(scores)?;
        let sets: Vec<_> = gene_sets.iter().map(|(term, members)| (term.clone(), members.clone())).collect();
        let mut records = self.strategy.run(&ranking, &sets, &options.params())?;

        records.sort_by(|a, b| {
            b.nes
                .abs()
                .total_cmp(&a.nes.abs())
                .then_with(|| a.term.id.cmp(&b.term.id))
        });

        if let Some(directory) = &options.directory {
            report::write_report(directory, &ranking, &records, options)?;
        }

        let tested = records.len();
        let mut rows: Vec<GseaRow> = records.iter().map(GseaRow::from).collect();
        if !options.keep_insignificant {
            rows.retain(|row| row.pval < options.alpha);
        }

        info!(
            ranked = ranking.len(),
            tested,
            kept = rows.len(),
            permutations = options.permutation_num,
            "Gene-set enrichment analysis finished"
        );
        Ok(rows)
    }
}
