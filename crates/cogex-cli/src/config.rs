//! CLI configuration
//!
//! Builds the engine configuration from the environment, applies command-line
//! overrides and constructs the graph store, cache and resolver from it.

use crate::error::Result;
use crate::ConnectionArgs;
use cogex_enrichment::analysis::GeneAnalysis;
use cogex_enrichment::gene_sets::SqliteGeneSetStore;
use cogex_enrichment::resolver::{ChebiClient, GeneNamesClient, HgncTable, NameResolver};
use cogex_enrichment::{EnrichmentConfig, GeneSetCache, GraphStore, Neo4jHttpStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub enrichment: EnrichmentConfig,
    /// Local HGNC export used instead of the REST service
    pub hgnc_table: Option<PathBuf>,
    /// Resolve symbols at all
    pub lookup: bool,
}

impl CliConfig {
    /// Environment first, then flags
    pub fn load(args: &ConnectionArgs) -> Result<Self> {
        let mut enrichment = EnrichmentConfig::from_env()?;

        if let Some(url) = &args.neo4j_url {
            enrichment.graph.url = url.clone();
        }
        if let Some(user) = &args.neo4j_user {
            enrichment.graph.user = Some(user.clone());
        }
        if let Some(password) = &args.neo4j_password {
            enrichment.graph.password = Some(password.clone());
        }
        if let Some(database) = &args.neo4j_database {
            enrichment.graph.database = database.clone();
        }
        if let Some(path) = &args.cache_path {
            enrichment.cache.sqlite_path = path.clone();
        }
        if args.sqlite_cache {
            enrichment.cache.use_sqlite = true;
        }
        if let Some(url) = &args.hgnc_url {
            enrichment.resolver.hgnc_url = url.clone();
        }
        if let Some(url) = &args.chebi_url {
            enrichment.resolver.chebi_url = url.clone();
        }
        enrichment.validate()?;

        debug!(
            neo4j = %enrichment.graph.url,
            database = %enrichment.graph.database,
            cache = %enrichment.cache.sqlite_path.display(),
            "Loaded configuration"
        );

        Ok(Self {
            enrichment,
            hgnc_table: args.hgnc_table.clone(),
            lookup: !args.no_lookup,
        })
    }

    pub fn graph_store(&self) -> Result<Arc<dyn GraphStore>> {
        Ok(Arc::new(Neo4jHttpStore::new(&self.enrichment.graph)?))
    }

    /// Gene-set cache over the graph, reading through the persisted file
    /// when enabled and present
    pub fn gene_set_cache(&self) -> Result<Arc<GeneSetCache>> {
        let mut cache = GeneSetCache::new(self.graph_store()?);
        let path = &self.enrichment.cache.sqlite_path;
        if self.enrichment.cache.use_sqlite {
            if path.is_file() {
                info!(path = %path.display(), "Using persisted gene-set cache");
                cache = cache.with_persisted(SqliteGeneSetStore::open(path)?);
            } else {
                warn!(path = %path.display(), "Persisted gene-set cache not found, querying the graph");
            }
        }
        Ok(Arc::new(cache))
    }

    pub fn resolver(&self) -> Result<Option<Arc<dyn NameResolver>>> {
        if !self.lookup {
            return Ok(None);
        }
        let resolver: Arc<dyn NameResolver> = match &self.hgnc_table {
            Some(path) => {
                let table = HgncTable::from_path(path)?;
                info!(path = %path.display(), symbols = table.len(), "Loaded HGNC table");
                Arc::new(table)
            },
            None => Arc::new(GeneNamesClient::new(&self.enrichment.resolver)?),
        };
        Ok(Some(resolver))
    }

    /// ChEBI name lookup, unless lookups are disabled
    pub fn metabolite_resolver(&self) -> Result<Option<Arc<dyn NameResolver>>> {
        if !self.lookup {
            return Ok(None);
        }
        Ok(Some(Arc::new(ChebiClient::new(&self.enrichment.resolver)?)))
    }

    pub fn analysis(&self) -> Result<GeneAnalysis> {
        let analysis = GeneAnalysis::new(self.gene_set_cache()?);
        Ok(match self.resolver()? {
            Some(resolver) => analysis.with_resolver(resolver),
            None => analysis,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_environment() {
        let args = ConnectionArgs {
            neo4j_url: Some("http://graph.example:7474".to_string()),
            neo4j_database: Some("cogex".to_string()),
            cache_path: Some(PathBuf::from("/tmp/cogex-test/gene_sets.sqlite")),
            sqlite_cache: true,
            no_lookup: true,
            ..ConnectionArgs::default()
        };
        let config = CliConfig::load(&args).unwrap();

        assert_eq!(config.enrichment.graph.url, "http://graph.example:7474");
        assert_eq!(config.enrichment.graph.database, "cogex");
        assert!(config.enrichment.cache.use_sqlite);
        assert!(!config.lookup);
        assert!(config.resolver().unwrap().is_none());
        assert!(config.metabolite_resolver().unwrap().is_none());
    }

    #[test]
    fn test_chebi_url_flag() {
        let args = ConnectionArgs {
            chebi_url: Some("http://ols.example/ols4".to_string()),
            ..ConnectionArgs::default()
        };
        let config = CliConfig::load(&args).unwrap();
        assert_eq!(config.enrichment.resolver.chebi_url, "http://ols.example/ols4");
        assert!(config.metabolite_resolver().unwrap().is_some());
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let args = ConnectionArgs {
            neo4j_url: Some("  ".to_string()),
            ..ConnectionArgs::default()
        };
        assert!(CliConfig::load(&args).is_err());
    }

    #[test]
    fn test_missing_persisted_cache_falls_back_to_graph() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConnectionArgs {
            cache_path: Some(dir.path().join("missing.sqlite")),
            sqlite_cache: true,
            ..ConnectionArgs::default()
        };
        let config = CliConfig::load(&args).unwrap();
        assert!(config.gene_set_cache().is_ok());
    }
}
