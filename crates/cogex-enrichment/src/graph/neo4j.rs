//! Neo4j client over the HTTP transactional endpoint

use super::{GraphStore, Params, Record};
use crate::config::GraphConfig;
use crate::error::{EnrichmentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Graph store backed by `POST /db/{database}/tx/commit`
pub struct Neo4jHttpStore {
    client: Client,
    endpoint: String,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

impl Neo4jHttpStore {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let endpoint = format!(
            "{}/db/{}/tx/commit",
            config.url.trim_end_matches('/'),
            config.database
        );

        Ok(Self {
            client,
            endpoint,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    async fn query(&self, query: &str, params: &Params) -> Result<Vec<Record>> {
        let started = Instant::now();
        let body = json!({
            "statements": [{ "statement": query, "parameters": params }]
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.password.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            EnrichmentError::upstream(format!("Neo4j unreachable at {}: {}", self.endpoint, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::upstream(format!(
                "Neo4j returned {}: {}",
                status, text
            )));
        }

        let payload: CommitResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::malformed(query, format!("invalid response: {}", e)))?;

        if let Some(error) = payload.errors.first() {
            return Err(EnrichmentError::upstream(format!(
                "{}: {}",
                error.code, error.message
            )));
        }

        let result = payload
            .results
            .into_iter()
            .next()
            .ok_or_else(|| EnrichmentError::malformed(query, "response has no result set"))?;

        let columns = Arc::new(result.columns);
        let mut records = Vec::with_capacity(result.data.len());
        for row in result.data {
            if row.row.len() != columns.len() {
                return Err(EnrichmentError::malformed(
                    query,
                    format!("row has {} fields for {} columns", row.row.len(), columns.len()),
                ));
            }
            records.push(Record::new(Arc::clone(&columns), row.row));
        }

        debug!(
            rows = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Graph query finished"
        );
        Ok(records)
    }
}
