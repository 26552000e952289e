//! Analysis entry points
//!
//! [`GeneAnalysis`] ties the resolver, the gene-set cache and the three
//! engines together: discrete lists go through ORA against every reference
//! dataset, signed lists through reverse causal reasoning and scored lists
//! through GSEA.

mod response;
mod scores;

pub use response::{AnalysisResponse, ErrorPayload};
pub use scores::{ScoreColumns, ScoreTable, MINIMUM_SCORED_GENES, RESOLVE_CONCURRENCY};

use crate::error::{EnrichmentError, Result};
use crate::gene_sets::queries::{self, EnzymeStatement};
use crate::gene_sets::{Dataset, EntityType, GeneSetCache, GeneSetMapping, Thresholds};
use crate::graph::GraphStore;
use crate::gsea::{GseaEngine, GseaOptions, GseaRow};
use crate::ora::{self, OraOptions, OraRow, DEFAULT_ALPHA};
use crate::rcr::{RcrEngine, RcrOptions, RcrRow};
use crate::resolver::{parse_id_field, NameResolver, ParsedIds};
use crate::stats::CorrectionMethod;
use cogex_common::{EntityId, Namespace};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};

/// Reference datasets tested by a discrete gene analysis
pub const DISCRETE_DATASETS: [Dataset; 6] = [
    Dataset::Go,
    Dataset::WikiPathways,
    Dataset::Reactome,
    Dataset::Phenotypes,
    Dataset::EntityToTargets,
    Dataset::EntityToRegulators,
];

pub type SignedOptions = RcrOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteOptions {
    pub method: Option<CorrectionMethod>,
    pub alpha: f64,
    pub keep_insignificant: bool,
    /// Applied to statement-derived datasets only
    pub thresholds: Thresholds,
    /// Credit ancestor terms with their descendants' genes where the dataset
    /// has an ontology
    pub extend_ontologies: bool,
}

impl Default for DiscreteOptions {
    fn default() -> Self {
        Self {
            method: Some(CorrectionMethod::FdrBh),
            alpha: DEFAULT_ALPHA,
            keep_insignificant: true,
            thresholds: Thresholds::default(),
            extend_ontologies: false,
        }
    }
}

impl DiscreteOptions {
    /// Defaults for metabolite sets, which are corrected with Bonferroni
    pub fn metabolite() -> Self {
        Self {
            method: Some(CorrectionMethod::Bonferroni),
            ..Self::default()
        }
    }

    fn ora_options(&self) -> OraOptions {
        OraOptions {
            method: self.method,
            alpha: self.alpha,
            keep_insignificant: self.keep_insignificant,
            background: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousOptions {
    pub gsea: GseaOptions,
    pub thresholds: Thresholds,
}

/// Discrete results keyed by dataset
pub type DiscreteResults = BTreeMap<Dataset, Vec<OraRow>>;

pub struct GeneAnalysis {
    cache: Arc<GeneSetCache>,
    resolver: Option<Arc<dyn NameResolver>>,
    metabolite_resolver: Option<Arc<dyn NameResolver>>,
    gsea: GseaEngine,
}

impl GeneAnalysis {
    pub fn new(cache: Arc<GeneSetCache>) -> Self {
        Self {
            cache,
            resolver: None,
            metabolite_resolver: None,
            gsea: GseaEngine::new(),
        }
    }

    /// Resolve gene symbols through `resolver`
    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Resolve metabolite names through `resolver`
    pub fn with_metabolite_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.metabolite_resolver = Some(resolver);
        self
    }

    pub fn with_gsea_engine(mut self, engine: GseaEngine) -> Self {
        self.gsea = engine;
        self
    }

    pub fn cache(&self) -> &Arc<GeneSetCache> {
        &self.cache
    }

    /// Parse a free-text gene list into HGNC ids
    pub async fn parse_genes(&self, raw: &str) -> Result<ParsedIds> {
        parse_id_field(raw, &Namespace::Hgnc, self.resolver.as_deref()).await
    }

    /// Parse a free-text metabolite list into ChEBI ids. Names are looked up
    /// only when a metabolite resolver is set.
    pub async fn parse_metabolites(&self, raw: &str) -> Result<ParsedIds> {
        parse_id_field(raw, &Namespace::Chebi, self.metabolite_resolver.as_deref()).await
    }

    async fn reference_sets(
        &self,
        dataset: Dataset,
        options: &DiscreteOptions,
    ) -> Result<Arc<GeneSetMapping>> {
        if options.extend_ontologies && dataset.ontology_namespace().is_some() {
            self.cache.get_extended_gene_sets(dataset, options.thresholds).await
        } else {
            self.cache.get_gene_sets(dataset, options.thresholds).await
        }
    }

    /// ORA of `genes` (HGNC local ids) against every dataset in [`DISCRETE_DATASETS`]
    #[instrument(skip_all, fields(genes = genes.len()))]
    pub async fn discrete(
        &self,
        genes: &BTreeSet<String>,
        options: &DiscreteOptions,
    ) -> Result<DiscreteResults> {
        options.thresholds.validate()?;
        let universe_size = self.cache.universe_size(EntityType::Gene).await?;
        let mappings = try_join_all(
            DISCRETE_DATASETS
                .iter()
                .map(|&dataset| self.reference_sets(dataset, options)),
        )
        .await?;

        let ora_options = options.ora_options();
        let mut results = DiscreteResults::new();
        for (dataset, mapping) in DISCRETE_DATASETS.iter().zip(mappings) {
            let rows = ora::ora(&mapping, genes, universe_size, &ora_options)?;
            info!(dataset = %dataset, rows = rows.len(), "Discrete analysis");
            results.insert(*dataset, rows);
        }
        Ok(results)
    }

    /// Reverse causal reasoning over up- and down-regulated HGNC local ids
    #[instrument(skip_all, fields(up = positive.len(), down = negative.len()))]
    pub async fn signed(
        &self,
        positive: &BTreeSet<String>,
        negative: &BTreeSet<String>,
        options: &SignedOptions,
    ) -> Result<Vec<RcrRow>> {
        RcrEngine::new(Arc::clone(&self.cache))
            .reverse_causal_reasoning(positive, negative, options)
            .await
    }

    /// GSEA of `scores` (HGNC local id to score) against one dataset
    #[instrument(skip_all, fields(scores = scores.len(), source = %source))]
    pub async fn continuous(
        &self,
        scores: &HashMap<String, f64>,
        source: Dataset,
        options: &ContinuousOptions,
    ) -> Result<Vec<GseaRow>> {
        if !DISCRETE_DATASETS.contains(&source) {
            return Err(EnrichmentError::config(format!(
                "dataset '{}' is not available for continuous analysis",
                source
            )));
        }
        if scores.len() < MINIMUM_SCORED_GENES {
            return Err(EnrichmentError::insufficient_data(format!(
                "at least {} scored genes are required, got {}",
                MINIMUM_SCORED_GENES,
                scores.len()
            )));
        }

        let gene_sets = self.cache.get_gene_sets(source, options.thresholds).await?;
        self.gsea.gsea(scores, &gene_sets, &options.gsea)
    }

    /// ORA of `metabolites` (ChEBI local ids) against enzyme metabolite sets
    #[instrument(skip_all, fields(metabolites = metabolites.len()))]
    pub async fn metabolite_discrete(
        &self,
        metabolites: &BTreeSet<String>,
        options: &DiscreteOptions,
    ) -> Result<Vec<OraRow>> {
        let universe_size = self.cache.universe_size(EntityType::Metabolite).await?;
        let mapping = self
            .cache
            .get_gene_sets(Dataset::Metabolomics, options.thresholds)
            .await?;
        ora::ora(&mapping, metabolites, universe_size, &options.ora_options())
    }

    /// Statements explaining why `ec_code` scored for `chebi_ids`: what the
    /// FamPlex families behind the enzyme do to those metabolites. An empty
    /// `chebi_ids` returns the statements for every metabolite.
    #[instrument(skip_all, fields(ec_code = %ec_code, metabolites = chebi_ids.len()))]
    pub async fn enzyme_analysis(
        &self,
        ec_code: &EntityId,
        chebi_ids: &BTreeSet<EntityId>,
        thresholds: &Thresholds,
    ) -> Result<Vec<EnzymeStatement>> {
        if !ec_code.is_in(&Namespace::EcCode) {
            return Err(EnrichmentError::config(format!("'{}' is not an EC code", ec_code)));
        }
        if let Some(other) = chebi_ids.iter().find(|id| !id.is_in(&Namespace::Chebi)) {
            return Err(EnrichmentError::config(format!("'{}' is not a ChEBI id", other)));
        }
        thresholds.validate()?;

        let query = queries::enzyme_statement_query(ec_code, chebi_ids, thresholds);
        let records = self.cache.store().query(&query.text, &query.params).await?;
        let statements = queries::collect_enzyme_statements(&records, &query.text)?;
        info!(statements = statements.len(), "Enzyme analysis");
        Ok(statements)
    }
}
