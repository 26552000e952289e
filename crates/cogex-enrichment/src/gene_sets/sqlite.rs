//! Persisted gene-set cache
//!
//! A SQLite file that lets a fresh process skip the full-graph gene-set
//! queries. It is written only by [`build_sqlite_cache`], which fills a
//! temporary file and renames it over the target, so readers never see a
//! half-written cache.

use super::queries::{self, build_query};
use super::{apply_thresholds, ConfidenceMapping, Dataset, GeneSetMapping, TargetEvidence, Thresholds};
use crate::error::{EnrichmentError, Result};
use crate::graph::GraphStore;
use chrono::Utc;
use cogex_common::Term;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Create the cache tables if they do not exist
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS gene_sets (
            cache_name TEXT NOT NULL,
            curie TEXT NOT NULL,
            name TEXT NOT NULL,
            value TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_gene_sets_cache_name ON gene_sets(cache_name);

        CREATE TABLE IF NOT EXISTS genes_with_confidence (
            cache_name TEXT NOT NULL,
            curie TEXT NOT NULL,
            name TEXT NOT NULL,
            inner_key TEXT NOT NULL,
            belief REAL NOT NULL,
            ev_count INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_genes_with_confidence_cache_name
            ON genes_with_confidence(cache_name);

        CREATE TABLE IF NOT EXISTS cache_metadata (
            cache_name TEXT PRIMARY KEY,
            query_hash TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            built_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// One dataset's entry in the cache file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryStatus {
    pub dataset: String,
    pub rows: usize,
    pub built_at: String,
    /// False when the dataset's query changed since the file was built
    pub fresh: bool,
}

/// Read access to a built cache file
#[derive(Debug, Clone)]
pub struct SqliteGeneSetStore {
    path: PathBuf,
}

impl SqliteGeneSetStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(EnrichmentError::cache(format!(
                "no gene-set cache at {}",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<Connection> {
        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }

    fn is_fresh(&self, conn: &Connection, dataset: Dataset) -> Result<bool> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT query_hash FROM cache_metadata WHERE cache_name = ?1",
                params![dataset.name()],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            None => {
                debug!(dataset = %dataset, "Dataset not in persisted cache");
                Ok(false)
            },
            Some(hash) if hash != build_query(dataset).fingerprint() => {
                warn!(dataset = %dataset, path = %self.path.display(), "Persisted gene sets are stale, ignoring");
                Ok(false)
            },
            Some(_) => Ok(true),
        }
    }

    /// Membership rows of an unweighted dataset
    pub fn gene_sets(&self, dataset: Dataset) -> Result<Option<GeneSetMapping>> {
        let conn = self.connection()?;
        if !self.is_fresh(&conn, dataset)? {
            return Ok(None);
        }
        read_gene_sets(&conn, dataset).map(Some)
    }

    /// Relationship rows of a weighted dataset
    pub fn genes_with_confidence(&self, dataset: Dataset) -> Result<Option<ConfidenceMapping>> {
        let conn = self.connection()?;
        if !self.is_fresh(&conn, dataset)? {
            return Ok(None);
        }
        read_confidence(&conn, dataset).map(Some)
    }

    /// Gene sets for `dataset` with `thresholds` applied, if the file has them
    pub fn load(&self, dataset: Dataset, thresholds: &Thresholds) -> Result<Option<GeneSetMapping>> {
        if dataset.is_weighted() {
            Ok(self
                .genes_with_confidence(dataset)?
                .map(|mapping| apply_thresholds(&mapping, thresholds)))
        } else {
            self.gene_sets(dataset)
        }
    }

    pub fn status(&self) -> Result<Vec<CacheEntryStatus>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT cache_name, query_hash, row_count, built_at FROM cache_metadata ORDER BY cache_name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut statuses = Vec::new();
        for row in rows {
            let (name, hash, row_count, built_at) = row?;
            let fresh = name
                .parse::<Dataset>()
                .map(|dataset| build_query(dataset).fingerprint() == hash)
                .unwrap_or(false);
            statuses.push(CacheEntryStatus {
                dataset: name,
                rows: usize::try_from(row_count).unwrap_or(0),
                built_at,
                fresh,
            });
        }
        Ok(statuses)
    }
}

fn read_gene_sets(conn: &Connection, dataset: Dataset) -> Result<GeneSetMapping> {
    let mut stmt = conn.prepare(
        "SELECT curie, name, value FROM gene_sets WHERE cache_name = ?1 ORDER BY curie",
    )?;
    let rows = stmt.query_map(params![dataset.name()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut mapping = GeneSetMapping::new();
    // rows arrive grouped by curie; parse each curie once
    let mut current: Option<(String, Term)> = None;
    for row in rows {
        let (curie, name, value) = row?;
        let same_term = matches!(&current, Some((last, _)) if *last == curie);
        if !same_term {
            let term = Term::new(curie.parse()?, name);
            current = Some((curie, term));
        }
        if let Some((_, term)) = &current {
            mapping.entry(term.clone()).or_default().insert(value);
        }
    }

    debug!(dataset = %dataset, terms = mapping.len(), "Read gene sets from persisted cache");
    Ok(mapping)
}

fn read_confidence(conn: &Connection, dataset: Dataset) -> Result<ConfidenceMapping> {
    let mut stmt = conn.prepare(
        "SELECT curie, name, inner_key, belief, ev_count FROM genes_with_confidence WHERE cache_name = ?1",
    )?;
    let rows = stmt.query_map(params![dataset.name()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut mapping = ConfidenceMapping::new();
    for row in rows {
        let (curie, name, member, belief, evidence_count) = row?;
        mapping
            .entry(Term::new(curie.parse()?, name))
            .or_default()
            .push(TargetEvidence {
                member,
                belief,
                evidence_count,
            });
    }
    Ok(mapping)
}

/// Options for [`build_sqlite_cache`]
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Rebuild even if the file exists
    pub force: bool,
    /// Keep at most this many records per dataset
    pub limit: Option<usize>,
    /// Datasets to build; empty means all
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub path: PathBuf,
    pub skipped: bool,
    pub datasets: Vec<CacheEntryStatus>,
}

enum Payload {
    Sets(GeneSetMapping),
    Confidence(ConfidenceMapping),
}

struct DatasetPayload {
    dataset: Dataset,
    fingerprint: String,
    payload: Payload,
}

/// Query every dataset from the graph and write the cache file at `path`
pub async fn build_sqlite_cache(
    store: &dyn GraphStore,
    path: &Path,
    options: &BuildOptions,
) -> Result<BuildReport> {
    if path.exists() && !options.force {
        info!(path = %path.display(), "Gene-set cache exists, skipping build");
        return Ok(BuildReport {
            path: path.to_path_buf(),
            skipped: true,
            datasets: SqliteGeneSetStore::open(path)?.status()?,
        });
    }

    let datasets = if options.datasets.is_empty() {
        Dataset::ALL.to_vec()
    } else {
        options.datasets.clone()
    };

    let mut payloads = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let query = build_query(dataset);
        let mut records = store.query(&query.text, &query.params).await?;
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }

        let payload = if dataset.is_weighted() {
            Payload::Confidence(queries::collect_confidence(&records, dataset, &query.text)?)
        } else {
            Payload::Sets(queries::collect_gene_sets(&records, dataset, &query.text)?)
        };
        info!(dataset = %dataset, records = records.len(), "Fetched dataset for persisted cache");

        payloads.push(DatasetPayload {
            dataset,
            fingerprint: query.fingerprint(),
            payload,
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let target = path.to_path_buf();
    let statuses = tokio::task::spawn_blocking(move || -> Result<Vec<CacheEntryStatus>> {
        if tmp.exists() {
            std::fs::remove_file(&tmp)?;
        }
        let statuses = write_cache_file(&tmp, &payloads)?;
        std::fs::rename(&tmp, &target)?;
        Ok(statuses)
    })
    .await
    .map_err(|e| EnrichmentError::cache(format!("cache build task failed: {}", e)))??;

    info!(path = %path.display(), datasets = statuses.len(), "Built persisted gene-set cache");
    Ok(BuildReport {
        path: path.to_path_buf(),
        skipped: false,
        datasets: statuses,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_cache_file(path: &Path, payloads: &[DatasetPayload]) -> Result<Vec<CacheEntryStatus>> {
    let mut conn = Connection::open(path)?;
    init_schema(&conn)?;

    let built_at = Utc::now().to_rfc3339();
    let mut statuses = Vec::with_capacity(payloads.len());
    let tx = conn.transaction()?;
    {
        let mut insert_set = tx.prepare(
            "INSERT INTO gene_sets (cache_name, curie, name, value) VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut insert_confidence = tx.prepare(
            r#"
            INSERT INTO genes_with_confidence (cache_name, curie, name, inner_key, belief, ev_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;
        let mut insert_metadata = tx.prepare(
            r#"
            INSERT OR REPLACE INTO cache_metadata (cache_name, query_hash, row_count, built_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )?;

        for item in payloads {
            let cache_name = item.dataset.name();
            let mut rows = 0usize;

            match &item.payload {
                Payload::Sets(mapping) => {
                    for (term, members) in mapping {
                        let curie = term.id.curie();
                        for member in members {
                            insert_set.execute(params![cache_name, curie, term.name, member])?;
                            rows += 1;
                        }
                    }
                },
                Payload::Confidence(mapping) => {
                    for (term, evidence) in mapping {
                        let curie = term.id.curie();
                        for row in evidence {
                            insert_confidence.execute(params![
                                cache_name,
                                curie,
                                term.name,
                                row.member,
                                row.belief,
                                row.evidence_count
                            ])?;
                            rows += 1;
                        }
                    }
                },
            }

            insert_metadata.execute(params![cache_name, item.fingerprint, rows as i64, built_at])?;
            statuses.push(CacheEntryStatus {
                dataset: cache_name.to_string(),
                rows,
                built_at: built_at.clone(),
                fresh: true,
            });
        }
    }
    tx.commit()?;

    Ok(statuses)
}
