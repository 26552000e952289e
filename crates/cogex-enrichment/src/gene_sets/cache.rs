//! In-process gene-set cache with one load per key

use super::queries;
use super::{merge_by_id, Dataset, EntityType, GeneSetMapping, SqliteGeneSetStore, Thresholds};
use crate::error::{EnrichmentError, Result};
use crate::graph::GraphStore;
use crate::ontology::{extend_by_ontology, Ontology};
use cogex_common::Namespace;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SetKey {
    dataset: Dataset,
    thresholds: (Option<u32>, Option<u64>),
    extended: bool,
}

impl SetKey {
    fn new(dataset: Dataset, thresholds: &Thresholds, extended: bool) -> Self {
        // thresholds cannot change an unweighted dataset
        let thresholds = if dataset.is_weighted() {
            thresholds.key()
        } else {
            Thresholds::default().key()
        };
        Self {
            dataset,
            thresholds,
            extended,
        }
    }

    fn thresholds(&self) -> Thresholds {
        Thresholds {
            minimum_evidence_count: self.thresholds.0,
            minimum_belief: self.thresholds.1.map(f64::from_bits),
        }
    }
}

type Slots<K, V> = Mutex<HashMap<K, Arc<OnceCell<V>>>>;

/// Shared cache of reference gene sets, universe sizes and ontologies
///
/// Construct once and share by `Arc`. Concurrent requests for the same key
/// wait on a single load; a failed load is not cached and the next caller
/// retries it.
pub struct GeneSetCache {
    store: Arc<dyn GraphStore>,
    persisted: Option<SqliteGeneSetStore>,
    gene_sets: Slots<SetKey, Arc<GeneSetMapping>>,
    universes: Slots<EntityType, usize>,
    ontologies: Slots<Namespace, Arc<Ontology>>,
}

impl GeneSetCache {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            persisted: None,
            gene_sets: Mutex::new(HashMap::new()),
            universes: Mutex::new(HashMap::new()),
            ontologies: Mutex::new(HashMap::new()),
        }
    }

    /// Read through a persisted cache file before querying the graph
    pub fn with_persisted(mut self, persisted: SqliteGeneSetStore) -> Self {
        self.persisted = Some(persisted);
        self
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    fn slot<K, V>(slots: &Slots<K, V>, key: K) -> Result<Arc<OnceCell<V>>>
    where
        K: Eq + Hash,
    {
        let mut map = slots
            .lock()
            .map_err(|e| EnrichmentError::cache(format!("Failed to acquire cache lock: {}", e)))?;
        Ok(Arc::clone(map.entry(key).or_default()))
    }

    /// Gene sets of `dataset` filtered by `thresholds`
    pub async fn get_gene_sets(
        &self,
        dataset: Dataset,
        thresholds: Thresholds,
    ) -> Result<Arc<GeneSetMapping>> {
        thresholds.validate()?;
        let key = SetKey::new(dataset, &thresholds, false);
        let cell = Self::slot(&self.gene_sets, key)?;
        let mapping = cell.get_or_try_init(|| self.load(key)).await?;
        Ok(Arc::clone(mapping))
    }

    /// Gene sets of `dataset` widened along its ontology
    pub async fn get_extended_gene_sets(
        &self,
        dataset: Dataset,
        thresholds: Thresholds,
    ) -> Result<Arc<GeneSetMapping>> {
        thresholds.validate()?;
        let namespace = dataset.ontology_namespace().ok_or_else(|| {
            EnrichmentError::config(format!("dataset '{}' has no ontology to extend by", dataset))
        })?;

        let key = SetKey::new(dataset, &thresholds, true);
        let cell = Self::slot(&self.gene_sets, key)?;
        let mapping = cell
            .get_or_try_init(|| async {
                let base = self.get_gene_sets(dataset, thresholds).await?;
                let ontology = self.ontology(namespace).await?;
                let mut extended = GeneSetMapping::clone(&base);
                extend_by_ontology(&mut extended, &ontology);
                Ok::<_, EnrichmentError>(Arc::new(extended))
            })
            .await?;
        Ok(Arc::clone(mapping))
    }

    async fn load(&self, key: SetKey) -> Result<Arc<GeneSetMapping>> {
        let dataset = key.dataset;
        let thresholds = key.thresholds();

        if let Some(persisted) = self.persisted.clone() {
            let loaded =
                tokio::task::spawn_blocking(move || persisted.load(dataset, &thresholds))
                    .await
                    .map_err(|e| EnrichmentError::cache(format!("cache read task failed: {}", e)))?;
            match loaded {
                Ok(Some(mapping)) => {
                    let mapping = merge_by_id(mapping);
                    info!(dataset = %dataset, terms = mapping.len(), "Loaded gene sets from persisted cache");
                    return Ok(Arc::new(mapping));
                },
                Ok(None) => debug!(dataset = %dataset, "Persisted cache miss"),
                Err(e) => warn!(dataset = %dataset, error = %e, "Persisted cache unreadable, querying graph"),
            }
        }

        let query = queries::gene_set_query(dataset, &thresholds);
        let started = Instant::now();
        let records = self.store.query(&query.text, &query.params).await?;
        let mapping = merge_by_id(queries::collect_gene_sets(&records, dataset, &query.text)?);

        info!(
            dataset = %dataset,
            terms = mapping.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded gene sets from graph"
        );
        Ok(Arc::new(mapping))
    }

    /// Number of entities of `entity_type` in the graph
    pub async fn universe_size(&self, entity_type: EntityType) -> Result<usize> {
        let cell = Self::slot(&self.universes, entity_type)?;
        let size = cell
            .get_or_try_init(|| async {
                let query = queries::universe_query(entity_type);
                let records = self.store.query(&query.text, &query.params).await?;
                let count = records
                    .first()
                    .ok_or_else(|| EnrichmentError::malformed(&query.text, "count query returned no rows"))?
                    .i64_at(0)
                    .map_err(|reason| EnrichmentError::malformed(&query.text, reason))?;
                let count = usize::try_from(count).map_err(|_| {
                    EnrichmentError::malformed(&query.text, format!("negative count {}", count))
                })?;
                info!(entity_type = %entity_type, count, "Counted universe");
                Ok::<_, EnrichmentError>(count)
            })
            .await?;
        Ok(*size)
    }

    /// Hierarchy of `namespace`, loaded from the graph once
    pub async fn ontology(&self, namespace: Namespace) -> Result<Arc<Ontology>> {
        let cell = Self::slot(&self.ontologies, namespace.clone())?;
        let ontology = cell
            .get_or_try_init(|| async {
                Ontology::load(self.store.as_ref(), &namespace)
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(ontology))
    }

    /// Whether a mapping for this key is already loaded
    pub fn is_cached(&self, dataset: Dataset, thresholds: &Thresholds) -> bool {
        let key = SetKey::new(dataset, thresholds, false);
        self.gene_sets
            .lock()
            .map(|map| map.get(&key).is_some_and(|cell| cell.initialized()))
            .unwrap_or(false)
    }

    /// Drop every cached mapping, universe size and ontology
    pub fn clear(&self) -> Result<()> {
        let poisoned = |e: String| EnrichmentError::cache(format!("Failed to acquire cache lock: {}", e));
        self.gene_sets.lock().map_err(|e| poisoned(e.to_string()))?.clear();
        self.universes.lock().map_err(|e| poisoned(e.to_string()))?.clear();
        self.ontologies.lock().map_err(|e| poisoned(e.to_string()))?.clear();
        info!("Cleared gene-set cache");
        Ok(())
    }

    /// Clear, then reload every gene-set key that was loaded before.
    /// Returns the number of mappings reloaded.
    pub async fn refresh(&self) -> Result<usize> {
        let keys: Vec<SetKey> = {
            let map = self
                .gene_sets
                .lock()
                .map_err(|e| EnrichmentError::cache(format!("Failed to acquire cache lock: {}", e)))?;
            map.iter()
                .filter(|(_, cell)| cell.initialized())
                .map(|(key, _)| *key)
                .collect()
        };

        self.clear()?;
        for key in &keys {
            if key.extended {
                self.get_extended_gene_sets(key.dataset, key.thresholds()).await?;
            } else {
                self.get_gene_sets(key.dataset, key.thresholds()).await?;
            }
        }

        info!(reloaded = keys.len(), "Refreshed gene-set cache");
        Ok(keys.len())
    }
}
