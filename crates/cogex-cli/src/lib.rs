//! CoGEx CLI Library
//!
//! Command-line front end for the CoGEx enrichment engine.
//!
//! # Overview
//!
//! - **Discrete analysis**: over-representation of a gene list in every reference dataset (`cogex discrete`)
//! - **Signed analysis**: reverse causal reasoning over up- and down-regulated genes (`cogex signed`)
//! - **Continuous analysis**: GSEA of a scored gene table (`cogex continuous`)
//! - **Metabolite analysis**: over-representation of metabolites in enzyme sets (`cogex metabolite`)
//! - **Enzyme explanation**: the statements behind one enzyme's metabolite set (`cogex enzyme`)
//! - **Cache management**: build and inspect the persisted gene-set cache (`cogex cache`)

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;

pub use error::{CliError, Result};
pub use output::OutputFormat;

use clap::{ArgAction, Args, Parser, Subcommand};
use cogex_enrichment::gene_sets::{Dataset, Thresholds};
use cogex_enrichment::stats::CorrectionMethod;
use std::path::PathBuf;
use std::str::FromStr;

/// CoGEx - enrichment analysis over the INDRA CoGEx knowledge graph
#[derive(Parser, Debug)]
#[command(name = "cogex")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print results and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Graph, cache and resolver settings. Unset flags fall back to `COGEX_*`
/// environment variables and then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Neo4j HTTP endpoint
    #[arg(long, env = "COGEX_NEO4J_URL", global = true)]
    pub neo4j_url: Option<String>,

    /// Neo4j user
    #[arg(long, env = "COGEX_NEO4J_USER", global = true)]
    pub neo4j_user: Option<String>,

    /// Neo4j password
    #[arg(long, env = "COGEX_NEO4J_PASSWORD", hide_env_values = true, global = true)]
    pub neo4j_password: Option<String>,

    /// Neo4j database name
    #[arg(long, env = "COGEX_NEO4J_DATABASE", global = true)]
    pub neo4j_database: Option<String>,

    /// Location of the persisted gene-set cache
    #[arg(long, env = "COGEX_CACHE_PATH", global = true)]
    pub cache_path: Option<PathBuf>,

    /// Read gene sets from the persisted cache before querying the graph
    #[arg(long, global = true)]
    pub sqlite_cache: bool,

    /// HGNC REST endpoint used to resolve gene symbols
    #[arg(long, env = "COGEX_HGNC_URL", global = true)]
    pub hgnc_url: Option<String>,

    /// EBI Ontology Lookup Service endpoint used to resolve metabolite names
    #[arg(long, env = "COGEX_CHEBI_URL", global = true)]
    pub chebi_url: Option<String>,

    /// Resolve gene symbols from a local HGNC TSV export instead of the REST service
    #[arg(long, global = true)]
    pub hgnc_table: Option<PathBuf>,

    /// Accept only identifiers; never look up gene symbols or metabolite names
    #[arg(long, global = true)]
    pub no_lookup: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Over-representation analysis of a gene list
    Discrete(DiscreteArgs),

    /// Reverse causal reasoning over up- and down-regulated genes
    Signed(SignedArgs),

    /// Gene-set enrichment analysis of a scored gene table
    Continuous(ContinuousArgs),

    /// Over-representation analysis of a metabolite list against enzyme sets
    Metabolite(MetaboliteArgs),

    /// Statements linking an EC code's enzyme families to metabolites
    Enzyme(EnzymeArgs),

    /// Manage the persisted gene-set cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

/// Relationship filters for INDRA-derived datasets
#[derive(Args, Debug, Clone, Default)]
pub struct ThresholdArgs {
    /// Minimum number of evidences supporting a relationship
    #[arg(long)]
    pub minimum_evidence: Option<u32>,

    /// Minimum belief score of a relationship
    #[arg(long)]
    pub minimum_belief: Option<f64>,
}

impl ThresholdArgs {
    pub fn thresholds(&self) -> Result<Thresholds> {
        Ok(Thresholds::new(self.minimum_evidence, self.minimum_belief)?)
    }
}

/// Multiple-testing correction, or `none`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction(pub Option<CorrectionMethod>);

impl FromStr for Correction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self(None));
        }
        s.parse::<CorrectionMethod>()
            .map(|method| Self(Some(method)))
            .map_err(|e| e.to_string())
    }
}

fn parse_dataset(s: &str) -> std::result::Result<Dataset, String> {
    s.parse().map_err(|e: cogex_enrichment::EnrichmentError| e.to_string())
}

#[derive(Args, Debug, Clone)]
pub struct DiscreteArgs {
    /// Gene symbols or HGNC ids, separated by commas or whitespace
    pub genes: Vec<String>,

    /// Read identifiers from a file
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Multiple-testing correction (`none` to skip)
    #[arg(long, default_value = "fdr_bh")]
    pub method: Correction,

    /// Significance threshold
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,

    /// Drop rows whose corrected p-value is not below alpha
    #[arg(long)]
    pub significant_only: bool,

    /// Credit GO and HP terms with the genes of their descendants
    #[arg(long)]
    pub extend_ontologies: bool,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SignedArgs {
    /// Up-regulated gene symbols or HGNC ids
    #[arg(long, num_args = 1.., required = true)]
    pub up: Vec<String>,

    /// Down-regulated gene symbols or HGNC ids
    #[arg(long, num_args = 1.., required = true)]
    pub down: Vec<String>,

    /// Skip regulators with fewer positive plus negative targets
    #[arg(long, default_value_t = 4)]
    pub minimum_size: usize,

    /// Significance threshold
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,

    /// Drop regulators whose binomial p-value is not below alpha
    #[arg(long)]
    pub significant_only: bool,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ContinuousArgs {
    /// Score table (CSV, or tab-separated for any other extension)
    pub input: PathBuf,

    /// Column holding gene symbols or HGNC ids
    #[arg(long, default_value = "gene_name")]
    pub id_column: String,

    /// Column holding the ranking score
    #[arg(long, default_value = "log2FoldChange")]
    pub score_column: String,

    /// Reference dataset to test
    #[arg(long, default_value = "go", value_parser = parse_dataset)]
    pub source: Dataset,

    /// Number of permutations for the null distribution
    #[arg(long, default_value_t = cogex_enrichment::gsea::DEFAULT_PERMUTATION_NUM)]
    pub permutations: usize,

    /// Random seed for reproducible permutations
    #[arg(long)]
    pub seed: Option<u64>,

    /// Smallest gene set tested, counted after matching to the ranking
    #[arg(long, default_value_t = cogex_enrichment::gsea::DEFAULT_MIN_SIZE)]
    pub min_size: usize,

    /// Largest gene set tested
    #[arg(long, default_value_t = cogex_enrichment::gsea::DEFAULT_MAX_SIZE)]
    pub max_size: usize,

    /// Exponent applied to scores in the running sum
    #[arg(long, default_value_t = 1.0)]
    pub weight: f64,

    /// Significance threshold
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,

    /// Drop rows whose nominal p-value is not below alpha
    #[arg(long)]
    pub significant_only: bool,

    /// Write the report and running-score plots here
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of top terms to plot
    #[arg(long, default_value_t = cogex_enrichment::gsea::DEFAULT_PLOT_COUNT)]
    pub plots: usize,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Args, Debug, Clone)]
pub struct MetaboliteArgs {
    /// ChEBI ids or metabolite names, separated by commas or whitespace
    pub metabolites: Vec<String>,

    /// Read identifiers from a file
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Multiple-testing correction (`none` to skip)
    #[arg(long, default_value = "bonferroni")]
    pub method: Correction,

    /// Significance threshold
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,

    /// Drop rows whose corrected p-value is not below alpha
    #[arg(long)]
    pub significant_only: bool,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Args, Debug, Clone)]
pub struct EnzymeArgs {
    /// EC code, e.g. `1.1.1.1` or `eccode:1.1.1.1`
    pub ec_code: String,

    /// Restrict to these ChEBI ids or metabolite names
    pub metabolites: Vec<String>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

/// Persisted cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Query every dataset from the graph and write the cache file
    Build {
        /// Rebuild even if the cache file exists
        #[arg(short, long)]
        force: bool,

        /// Keep at most this many records per dataset
        #[arg(long)]
        limit: Option<usize>,

        /// Datasets to build (default: all)
        #[arg(long = "dataset", value_parser = parse_dataset)]
        datasets: Vec<Dataset>,
    },

    /// Show the datasets in the cache file and whether they are current
    Status,

    /// Delete the cache file
    Clear,
}
