//! Shared fixtures for enrichment integration tests
//!
//! [`MockGraphStore`] answers graph queries from canned rows. A route
//! matches when the query starts with the route's MATCH/WHERE body, ends
//! with its RETURN clause and carries the route's parameters, so threshold
//! clauses added in between still hit the same route.

#![allow(dead_code)]

use async_trait::async_trait;
use cogex_common::Namespace;
use cogex_enrichment::gene_sets::queries::{self, DatasetQuery};
use cogex_enrichment::gene_sets::{Dataset, EntityType, Thresholds};
use cogex_enrichment::graph::{GraphStore, Params, Record};
use cogex_enrichment::Result;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Route {
    body: String,
    returns: String,
    params: Params,
    rows: Vec<Record>,
}

impl Route {
    fn matches(&self, query: &str, params: &Params) -> bool {
        query.starts_with(&self.body)
            && query.ends_with(&self.returns)
            && self.params.iter().all(|(k, v)| params.get(k) == Some(v))
    }
}

#[derive(Default)]
pub struct MockGraphStore {
    routes: Vec<Route>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    queries: Mutex<Vec<(String, Params)>>,
}

impl MockGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` (and its thresholded variants) with `rows`
    pub fn route(mut self, query: &DatasetQuery, rows: Vec<Vec<Value>>) -> Self {
        let (body, returns) = match query.text.rfind("\nRETURN") {
            Some(at) => (query.text[..at].to_string(), query.text[at..].to_string()),
            None => (query.text.clone(), String::new()),
        };
        self.routes.push(Route {
            body,
            returns,
            params: query.params.clone(),
            rows: rows.into_iter().map(Record::from_values).collect(),
        });
        self
    }

    /// Gene sets as `(term curie, name, member curies)`
    pub fn with_gene_sets(self, dataset: Dataset, sets: &[(&str, &str, &[&str])]) -> Self {
        let rows = sets
            .iter()
            .map(|(id, name, members)| vec![json!(id), json!(name), json!(members)])
            .collect();
        self.route(&queries::gene_set_query(dataset, &Thresholds::default()), rows)
    }

    /// Relationship rows as `(term curie, name, member curie, belief, evidence count)`
    pub fn with_confidence(self, dataset: Dataset, rows: &[(&str, &str, &str, f64, i64)]) -> Self {
        let rows = rows
            .iter()
            .map(|(id, name, member, belief, count)| {
                vec![json!(id), json!(name), json!(member), json!(belief), json!(count)]
            })
            .collect();
        self.route(&queries::confidence_query(dataset), rows)
    }

    pub fn with_universe(self, entity_type: EntityType, size: i64) -> Self {
        self.route(&queries::universe_query(entity_type), vec![vec![json!(size)]])
    }

    /// Hierarchy edges as `(child curie, parent curie)`
    pub fn with_ontology(self, namespace: Namespace, edges: &[(&str, &str)]) -> Self {
        let rows = edges
            .iter()
            .map(|(child, parent)| vec![json!(child), json!(parent)])
            .collect();
        self.route(&queries::ontology_query(&namespace), rows)
    }

    /// Sleep before answering, so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<(String, Params)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn query(&self, query: &str, params: &Params) -> Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), params.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .routes
            .iter()
            .find(|route| route.matches(query, params))
            .map(|route| route.rows.clone())
            .unwrap_or_default())
    }
}

/// HGNC curies for local ids `1..=n`
pub fn hgnc_curies(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|i| format!("hgnc:{}", i)).collect()
}

pub fn local_ids(ids: &[&str]) -> std::collections::BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// A store with small GO, pathway, phenotype and statement datasets over a
/// universe of 100 genes
pub fn fixture_store() -> MockGraphStore {
    MockGraphStore::new()
        .with_universe(EntityType::Gene, 100)
        .with_universe(EntityType::Metabolite, 50)
        .with_gene_sets(
            Dataset::Go,
            &[
                ("go:0000001", "parent process", &["hgnc:1", "hgnc:2"]),
                ("go:0000002", "child process", &["hgnc:3", "hgnc:4", "hgnc:5"]),
                ("go:0000003", "unrelated process", &["hgnc:50", "hgnc:51"]),
            ],
        )
        .with_ontology(Namespace::Go, &[("go:0000002", "go:0000001")])
        .with_gene_sets(
            Dataset::Reactome,
            &[("reactome:R-HSA-1", "signaling", &["hgnc:1", "hgnc:2", "hgnc:3", "hgnc:60"])],
        )
        .with_gene_sets(
            Dataset::WikiPathways,
            &[("wikipathways:WP1", "pathway one", &["hgnc:70", "hgnc:71"])],
        )
        .with_gene_sets(
            Dataset::Phenotypes,
            &[("hp:0000001", "phenotype", &["hgnc:1", "hgnc:80"])],
        )
        .with_gene_sets(
            Dataset::EntityToTargets,
            &[("fplx:AKT", "AKT", &["hgnc:1", "hgnc:2", "hgnc:3", "hgnc:4"])],
        )
        .with_gene_sets(
            Dataset::EntityToRegulators,
            &[("hgnc:90", "REG90", &["hgnc:1", "hgnc:90"])],
        )
        .with_gene_sets(
            Dataset::Metabolomics,
            &[("eccode:1.1.1.1", "alcohol dehydrogenase", &["chebi:15377", "chebi:16236"])],
        )
}

pub fn shared(store: MockGraphStore) -> Arc<MockGraphStore> {
    Arc::new(store)
}
