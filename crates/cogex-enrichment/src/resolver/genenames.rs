//! HGNC REST client (genenames.org)

use super::NameResolver;
use crate::config::ResolverConfig;
use crate::error::{EnrichmentError, Result};
use async_trait::async_trait;
use cogex_common::{EntityId, Namespace};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FetchResponse {
    response: FetchBody,
}

#[derive(Debug, Deserialize)]
struct FetchBody {
    #[serde(default)]
    docs: Vec<GeneDoc>,
}

#[derive(Debug, Deserialize)]
struct GeneDoc {
    hgnc_id: String,
    symbol: String,
}

/// Resolver backed by `GET /fetch/{field}/{value}`
pub struct GeneNamesClient {
    client: Client,
    base_url: Url,
}

impl GeneNamesClient {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.hgnc_url).map_err(|e| {
            EnrichmentError::config(format!("Invalid HGNC URL '{}': {}", config.hgnc_url, e))
        })?;
        Ok(Self { client, base_url })
    }

    async fn fetch(&self, field: &str, value: &str) -> Result<Vec<GeneDoc>> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EnrichmentError::config(format!("HGNC URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["fetch", field, value]);

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| EnrichmentError::resolution(format!("HGNC unreachable at {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::resolution(format!("HGNC returned {} for {}", status, url)));
        }

        let body: FetchResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::resolution(format!("Unreadable HGNC response: {}", e)))?;
        debug!(field, value, docs = body.response.docs.len(), "HGNC lookup");
        Ok(body.response.docs)
    }

    fn only_id(docs: Vec<GeneDoc>) -> Result<Option<EntityId>> {
        match docs.as_slice() {
            [doc] => doc
                .hgnc_id
                .parse()
                .map(Some)
                .map_err(|e| EnrichmentError::resolution(format!("bad HGNC id '{}': {}", doc.hgnc_id, e))),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl NameResolver for GeneNamesClient {
    async fn resolve_symbol(&self, symbol: &str) -> Result<Option<EntityId>> {
        if let Some(id) = Self::only_id(self.fetch("symbol", symbol).await?)? {
            return Ok(Some(id));
        }
        if let Some(id) = Self::only_id(self.fetch("prev_symbol", symbol).await?)? {
            return Ok(Some(id));
        }
        Self::only_id(self.fetch("alias_symbol", symbol).await?)
    }

    async fn name_for(&self, id: &EntityId) -> Result<Option<String>> {
        if !id.is_in(&Namespace::Hgnc) {
            return Ok(None);
        }
        let docs = self.fetch("hgnc_id", &id.local_id).await?;
        Ok(docs.into_iter().next().map(|doc| doc.symbol))
    }
}
