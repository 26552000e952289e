//! ChEBI name lookup through the EBI Ontology Lookup Service

use super::NameResolver;
use crate::config::ResolverConfig;
use crate::error::{EnrichmentError, Result};
use async_trait::async_trait;
use cogex_common::{EntityId, Namespace};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<TermDoc>,
}

#[derive(Debug, Deserialize)]
struct TermDoc {
    obo_id: Option<String>,
    label: Option<String>,
}

/// Resolver backed by `GET /api/search` restricted to the ChEBI ontology
///
/// A name resolves when exactly one ChEBI term carries it as its label, or
/// failing that as an exact synonym.
pub struct ChebiClient {
    client: Client,
    base_url: Url,
}

impl ChebiClient {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.chebi_url).map_err(|e| {
            EnrichmentError::config(format!("Invalid ChEBI URL '{}': {}", config.chebi_url, e))
        })?;
        Ok(Self { client, base_url })
    }

    async fn search(&self, text: &str, field: &str) -> Result<Vec<TermDoc>> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EnrichmentError::config(format!("ChEBI URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "search"]);
        url.query_pairs_mut()
            .append_pair("q", text)
            .append_pair("ontology", "chebi")
            .append_pair("exact", "true")
            .append_pair("queryFields", field)
            .append_pair("fieldList", "obo_id,label");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| EnrichmentError::resolution(format!("ChEBI lookup unreachable at {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::resolution(format!(
                "ChEBI lookup returned {} for {}",
                status, url
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::resolution(format!("Unreadable ChEBI response: {}", e)))?;
        debug!(text, field, docs = body.response.docs.len(), "ChEBI lookup");
        Ok(body.response.docs)
    }

    /// The single ChEBI id among `docs`, if there is exactly one
    fn only_id(docs: &[TermDoc]) -> Result<Option<EntityId>> {
        let ids: BTreeSet<&str> = docs
            .iter()
            .filter_map(|doc| doc.obo_id.as_deref())
            .filter(|id| id.to_ascii_uppercase().starts_with("CHEBI:"))
            .collect();
        match ids.into_iter().collect::<Vec<_>>().as_slice() {
            [id] => id
                .parse()
                .map(Some)
                .map_err(|e| EnrichmentError::resolution(format!("bad ChEBI id '{}': {}", id, e))),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl NameResolver for ChebiClient {
    async fn resolve_symbol(&self, name: &str) -> Result<Option<EntityId>> {
        if let Some(id) = Self::only_id(&self.search(name, "label").await?)? {
            return Ok(Some(id));
        }
        Self::only_id(&self.search(name, "synonym").await?)
    }

    async fn name_for(&self, id: &EntityId) -> Result<Option<String>> {
        if !id.is_in(&Namespace::Chebi) {
            return Ok(None);
        }
        let obo_id = format!("CHEBI:{}", id.local_id);
        let docs = self.search(&obo_id, "obo_id").await?;
        Ok(docs
            .into_iter()
            .find(|doc| doc.obo_id.as_deref() == Some(obo_id.as_str()))
            .and_then(|doc| doc.label))
    }
}
