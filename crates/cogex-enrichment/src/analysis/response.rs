//! Serializable envelope distinguishing empty results from failed analyses

use crate::error::{EnrichmentError, ErrorKind, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&EnrichmentError> for ErrorPayload {
    fn from(error: &EnrichmentError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// `{"status":"ok","results":...}` or `{"status":"error","error":{...}}`,
/// each with the input tokens that could not be resolved
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisResponse<T> {
    Ok {
        results: T,
        unresolved: Vec<String>,
    },
    Error {
        error: ErrorPayload,
        unresolved: Vec<String>,
    },
}

impl<T> AnalysisResponse<T> {
    pub fn from_result(result: Result<T>, unresolved: Vec<String>) -> Self {
        match result {
            Ok(results) => Self::Ok { results, unresolved },
            Err(e) => Self::Error {
                error: ErrorPayload::from(&e),
                unresolved,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn unresolved(&self) -> &[String] {
        match self {
            Self::Ok { unresolved, .. } | Self::Error { unresolved, .. } => unresolved,
        }
    }
}
