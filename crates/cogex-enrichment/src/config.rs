//! Engine configuration
//!
//! Values come from `COGEX_*` environment variables (a `.env` file is read
//! first when present) with the defaults below.

use crate::error::{EnrichmentError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default Neo4j HTTP endpoint
pub const DEFAULT_NEO4J_URL: &str = "http://localhost:7474";

/// Default Neo4j database name
pub const DEFAULT_NEO4J_DATABASE: &str = "neo4j";

/// Default timeout for a single graph query. Full-graph gene-set queries
/// can take minutes on a cold database.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 600;

/// Default HGNC REST endpoint used for symbol lookup
pub const DEFAULT_HGNC_URL: &str = "https://rest.genenames.org";

/// Default Ontology Lookup Service endpoint used for ChEBI name lookup
pub const DEFAULT_CHEBI_URL: &str = "https://www.ebi.ac.uk/ols4";

/// Default timeout for name-resolution requests
pub const DEFAULT_RESOLVER_TIMEOUT_SECS: u64 = 30;

/// File name of the persisted gene-set cache inside the cache directory
pub const CACHE_FILE_NAME: &str = "gene_sets.sqlite";

/// Graph store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub url: String,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: String,
    pub timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_NEO4J_URL.to_string(),
            user: None,
            password: None,
            database: DEFAULT_NEO4J_DATABASE.to_string(),
            timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

/// Persisted cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Location of the SQLite warm-start file
    pub sqlite_path: PathBuf,

    /// Read through the SQLite file on an in-process miss
    pub use_sqlite: bool,
}

impl CacheConfig {
    pub fn new() -> Result<Self> {
        let dir = dirs::cache_dir()
            .ok_or_else(|| EnrichmentError::config("Could not determine cache directory"))?
            .join("cogex");

        Ok(Self {
            sqlite_path: dir.join(CACHE_FILE_NAME),
            use_sqlite: false,
        })
    }
}

/// Name-resolution service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub hgnc_url: String,
    pub chebi_url: String,
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            hgnc_url: DEFAULT_HGNC_URL.to_string(),
            chebi_url: DEFAULT_CHEBI_URL.to_string(),
            timeout_secs: DEFAULT_RESOLVER_TIMEOUT_SECS,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub graph: GraphConfig,
    pub cache: CacheConfig,
    pub resolver: ResolverConfig,
}

impl EnrichmentConfig {
    pub fn new() -> Result<Self> {
        Ok(Self {
            graph: GraphConfig::default(),
            cache: CacheConfig::new()?,
            resolver: ResolverConfig::default(),
        })
    }

    /// Load configuration from the environment
    ///
    /// - `COGEX_NEO4J_URL`, `COGEX_NEO4J_USER`, `COGEX_NEO4J_PASSWORD`, `COGEX_NEO4J_DATABASE`
    /// - `COGEX_QUERY_TIMEOUT_SECS`
    /// - `COGEX_CACHE_PATH`, `COGEX_USE_SQLITE_CACHE`
    /// - `COGEX_HGNC_URL`, `COGEX_CHEBI_URL`, `COGEX_RESOLVER_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::new()?;

        if let Ok(url) = std::env::var("COGEX_NEO4J_URL") {
            config.graph.url = url;
        }
        config.graph.user = std::env::var("COGEX_NEO4J_USER").ok();
        config.graph.password = std::env::var("COGEX_NEO4J_PASSWORD").ok();
        if let Ok(database) = std::env::var("COGEX_NEO4J_DATABASE") {
            config.graph.database = database;
        }
        if let Ok(timeout) = std::env::var("COGEX_QUERY_TIMEOUT_SECS") {
            config.graph.timeout_secs = parse_env("COGEX_QUERY_TIMEOUT_SECS", &timeout)?;
        }

        if let Ok(path) = std::env::var("COGEX_CACHE_PATH") {
            config.cache.sqlite_path = PathBuf::from(path);
        }
        if let Ok(flag) = std::env::var("COGEX_USE_SQLITE_CACHE") {
            config.cache.use_sqlite = parse_env("COGEX_USE_SQLITE_CACHE", &flag)?;
        }

        if let Ok(url) = std::env::var("COGEX_HGNC_URL") {
            config.resolver.hgnc_url = url;
        }
        if let Ok(url) = std::env::var("COGEX_CHEBI_URL") {
            config.resolver.chebi_url = url;
        }
        if let Ok(timeout) = std::env::var("COGEX_RESOLVER_TIMEOUT_SECS") {
            config.resolver.timeout_secs = parse_env("COGEX_RESOLVER_TIMEOUT_SECS", &timeout)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.graph.url.trim().is_empty() {
            return Err(EnrichmentError::config("Neo4j URL must not be empty"));
        }
        if self.graph.database.trim().is_empty() {
            return Err(EnrichmentError::config("Neo4j database must not be empty"));
        }
        if self.graph.timeout_secs == 0 {
            return Err(EnrichmentError::config("Query timeout must be at least 1 second"));
        }
        if self.resolver.hgnc_url.trim().is_empty() {
            return Err(EnrichmentError::config("HGNC URL must not be empty"));
        }
        if self.resolver.chebi_url.trim().is_empty() {
            return Err(EnrichmentError::config("ChEBI URL must not be empty"));
        }
        if self.resolver.timeout_secs == 0 {
            return Err(EnrichmentError::config(
                "Resolver timeout must be at least 1 second",
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EnrichmentError::config(format!("Invalid value for {}: '{}'", name, value)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EnrichmentConfig::new().unwrap();
        assert_eq!(config.graph.url, DEFAULT_NEO4J_URL);
        assert_eq!(config.graph.timeout_secs, DEFAULT_QUERY_TIMEOUT_SECS);
        assert!(config.cache.sqlite_path.ends_with(CACHE_FILE_NAME));
        assert!(!config.cache.use_sqlite);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = EnrichmentConfig::new().unwrap();
        config.graph.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(EnrichmentError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_chebi_url() {
        let mut config = EnrichmentConfig::new().unwrap();
        assert_eq!(config.resolver.chebi_url, DEFAULT_CHEBI_URL);
        config.resolver.chebi_url = " ".to_string();
        assert!(matches!(config.validate(), Err(EnrichmentError::Config(_))));
    }

    #[test]
    fn test_parse_env_reports_variable() {
        let err = parse_env::<u64>("COGEX_QUERY_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("COGEX_QUERY_TIMEOUT_SECS"));
        assert!(parse_env::<bool>("COGEX_USE_SQLITE_CACHE", "true").unwrap());
    }
}
