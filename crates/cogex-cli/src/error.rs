//! Error types for the CoGEx CLI
//!
//! Messages are shown to the user as-is, so each variant says what to check.

use cogex_enrichment::EnrichmentError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// An analysis or cache operation in the engine failed
    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),

    /// No identifiers were given on the command line or in the input file
    #[error("No identifiers given: {0}. Pass them as arguments or with --input.")]
    NoInput(String),

    /// The analysis ran but reported an error; already printed in the chosen format
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your flags and COGEX_* environment variables.")]
    Config(String),

    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] cogex_common::CogexError),
}

impl CliError {
    pub fn no_input(msg: impl Into<String>) -> Self {
        Self::NoInput(msg.into())
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
