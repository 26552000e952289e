//! Error types for the enrichment engine

use serde::Serialize;
use thiserror::Error;

/// Result type alias for enrichment operations
pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Error type for every engine operation
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// The graph store could not be reached or rejected the query
    #[error("Graph query failed: {0}")]
    UpstreamQuery(String),

    /// A record did not have the shape its query promises
    #[error("Malformed record from '{query}': {reason}")]
    MalformedRecord { query: String, reason: String },

    #[error("Unknown dataset '{0}'. Expected one of: {datasets}", datasets = crate::gene_sets::Dataset::NAMES.join(", "))]
    UnknownDataset(String),

    #[error("Unknown correction method '{0}'. Expected one of: {methods}", methods = crate::stats::CorrectionMethod::NAMES.join(", "))]
    UnknownCorrectionMethod(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Not enough overlapping data to run a statistic
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The name-resolution service failed (not a missing symbol)
    #[error("Identifier resolution failed: {0}")]
    Resolution(String),

    #[error("Gene-set cache error: {0}")]
    Cache(String),

    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Delimited file error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Common(#[from] cogex_common::CogexError),
}

/// Coarse classification used in structured error payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Upstream,
    Configuration,
    InsufficientData,
    Resolution,
    Internal,
}

impl EnrichmentError {
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamQuery(msg.into())
    }

    pub fn malformed(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            query: query.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UpstreamQuery(_) | Self::MalformedRecord { .. } | Self::Http(_) => {
                ErrorKind::Upstream
            },
            Self::UnknownDataset(_) | Self::UnknownCorrectionMethod(_) | Self::Config(_) => {
                ErrorKind::Configuration
            },
            Self::InsufficientData(_) => ErrorKind::InsufficientData,
            Self::Resolution(_) => ErrorKind::Resolution,
            Self::Common(cogex_common::CogexError::InvalidIdentifier { .. }) => {
                ErrorKind::Resolution
            },
            Self::Common(cogex_common::CogexError::Config(_)) => ErrorKind::Configuration,
            Self::Cache(_)
            | Self::Sqlite(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Csv(_)
            | Self::Common(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_method_names_the_value() {
        let err = EnrichmentError::UnknownCorrectionMethod("fdr_magic".to_string());
        let msg = err.to_string();
        assert!(msg.contains("fdr_magic"));
        assert!(msg.contains("fdr_bh"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(EnrichmentError::upstream("down").kind(), ErrorKind::Upstream);
        assert_eq!(
            EnrichmentError::malformed("MATCH", "missing column").kind(),
            ErrorKind::Upstream
        );
        assert_eq!(
            EnrichmentError::insufficient_data("no sets").kind(),
            ErrorKind::InsufficientData
        );
    }
}
