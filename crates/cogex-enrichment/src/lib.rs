//! CoGEx enrichment engine
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Statistical set-enrichment over a biomedical knowledge graph:
//!
//! - **Graph facade** ([`graph`]): the [`GraphStore`] trait and a Neo4j HTTP client
//! - **Gene sets** ([`gene_sets`]): dataset queries, the single-flight [`GeneSetCache`]
//!   and the SQLite warm-start store
//! - **Ontology** ([`ontology`]): propagating child-term members to ancestors
//! - **Statistics** ([`stats`]): hypergeometric and binomial tails, multiple-testing correction
//! - **Engines**: [`ora`], [`gsea`] and reverse causal reasoning ([`rcr`])
//! - **Resolver** ([`resolver`]): free-text gene lists to canonical identifiers
//! - **Analysis** ([`analysis`]): entry points returning tables keyed by analysis name
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cogex_enrichment::{EnrichmentConfig, GeneSetCache, Neo4jHttpStore};
//! use cogex_enrichment::gene_sets::{Dataset, Thresholds};
//!
//! # async fn run() -> cogex_enrichment::Result<()> {
//! let config = EnrichmentConfig::from_env()?;
//! let store = Arc::new(Neo4jHttpStore::new(&config.graph)?);
//! let cache = GeneSetCache::new(store);
//! let go = cache.get_gene_sets(Dataset::Go, Thresholds::default()).await?;
//! println!("{} GO terms", go.len());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod gene_sets;
pub mod graph;
pub mod gsea;
pub mod ontology;
pub mod ora;
pub mod rcr;
pub mod resolver;
pub mod stats;

pub use config::EnrichmentConfig;
pub use error::{EnrichmentError, ErrorKind, Result};
pub use gene_sets::GeneSetCache;
pub use graph::{GraphStore, Neo4jHttpStore};
