//! Graph queries behind each dataset and the collectors for their records

use super::{ConfidenceMapping, Dataset, EntityType, GeneSetMapping, TargetEvidence, Thresholds};
use crate::error::{EnrichmentError, Result};
use crate::graph::{Params, Record};
use cogex_common::{EntityId, Namespace, Term};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::debug;

const POSITIVE_STATEMENT_TYPES: [&str; 2] = ["Activation", "IncreaseAmount"];
const NEGATIVE_STATEMENT_TYPES: [&str; 2] = ["Inhibition", "DecreaseAmount"];

/// Query text plus bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetQuery {
    pub text: String,
    pub params: Params,
}

impl DatasetQuery {
    /// Stable fingerprint of the query text, used to spot stale cache files
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        for (key, value) in &self.params {
            hasher.update(key.as_bytes());
            hasher.update(value.to_string().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// MATCH/WHERE body of a dataset. Binds `term`, `member` and, for weighted
/// datasets, the relationship `r`.
fn pattern(dataset: Dataset, params: &mut Params) -> String {
    match dataset {
        Dataset::Go => r#"MATCH (member:BioEntity)-[:associated_with]->(term:BioEntity)
WHERE term.id STARTS WITH "go:" AND member.id STARTS WITH "hgnc:""#
            .to_string(),
        Dataset::Reactome => r#"MATCH (term:BioEntity)-[:haspart]->(member:BioEntity)
WHERE term.id STARTS WITH "reactome:" AND member.id STARTS WITH "hgnc:""#
            .to_string(),
        Dataset::WikiPathways => r#"MATCH (term:BioEntity)-[:haspart]->(member:BioEntity)
WHERE term.id STARTS WITH "wikipathways:" AND member.id STARTS WITH "hgnc:""#
            .to_string(),
        Dataset::Phenotypes => r#"MATCH (term:BioEntity)-[:phenotype_has_gene]->(member:BioEntity)
WHERE term.id STARTS WITH "hp:" AND member.id STARTS WITH "hgnc:""#
            .to_string(),
        Dataset::EntityToTargets => r#"MATCH (term:BioEntity)-[r:indra_rel]->(member:BioEntity)
WHERE member.id STARTS WITH "hgnc:"
AND r.stmt_type <> "Complex"
AND NOT term.id STARTS WITH "uniprot:""#
            .to_string(),
        Dataset::EntityToRegulators => r#"MATCH (member:BioEntity)-[r:indra_rel]->(term:BioEntity)
WHERE member.id STARTS WITH "hgnc:"
AND r.stmt_type <> "Complex"
AND NOT term.id STARTS WITH "uniprot:""#
            .to_string(),
        Dataset::PositiveStatements | Dataset::NegativeStatements => {
            let types = if dataset == Dataset::PositiveStatements {
                POSITIVE_STATEMENT_TYPES
            } else {
                NEGATIVE_STATEMENT_TYPES
            };
            params.insert("statement_types".to_string(), json!(types));
            r#"MATCH (term:BioEntity)-[r:indra_rel]->(member:BioEntity)
WHERE member.id STARTS WITH "hgnc:"
AND r.stmt_type IN $statement_types
AND NOT term.id STARTS WITH "uniprot:""#
                .to_string()
        },
        Dataset::Metabolomics => {
            params.insert("statement_types".to_string(), json!(POSITIVE_STATEMENT_TYPES));
            r#"MATCH (term:BioEntity)-[:xref]-(family:BioEntity)-[r:indra_rel]->(member:BioEntity)
WHERE term.id STARTS WITH "ec"
AND family.id STARTS WITH "fplx:"
AND member.id STARTS WITH "chebi:"
AND r.stmt_type IN $statement_types"#
                .to_string()
        },
    }
}

/// Extra WHERE clauses for the non-trivial thresholds, bound as parameters
fn threshold_clauses(thresholds: &Thresholds, params: &mut Params) -> String {
    let mut clauses = String::new();
    if let Some(min) = thresholds.evidence_filter() {
        clauses.push_str("\nAND r.evidence_count >= $minimum_evidence_count");
        params.insert("minimum_evidence_count".to_string(), json!(min));
    }
    if let Some(min) = thresholds.belief_filter() {
        clauses.push_str("\nAND r.belief >= $minimum_belief");
        params.insert("minimum_belief".to_string(), json!(min));
    }
    clauses
}

/// Query returning `term.id, term.name, collect(member.id)`
pub fn gene_set_query(dataset: Dataset, thresholds: &Thresholds) -> DatasetQuery {
    let mut params = Params::new();
    let mut text = pattern(dataset, &mut params);
    if dataset.is_weighted() {
        text.push_str(&threshold_clauses(thresholds, &mut params));
    }
    text.push_str("\nRETURN term.id, term.name, collect(DISTINCT member.id)");
    DatasetQuery { text, params }
}

/// Query returning one row per relationship with its belief and evidence
/// count. Only meaningful for weighted datasets.
pub fn confidence_query(dataset: Dataset) -> DatasetQuery {
    let mut params = Params::new();
    let mut text = pattern(dataset, &mut params);
    text.push_str("\nRETURN term.id, term.name, member.id, r.belief, r.evidence_count");
    DatasetQuery { text, params }
}

/// The query a persisted cache table for `dataset` is built from
pub fn build_query(dataset: Dataset) -> DatasetQuery {
    if dataset.is_weighted() {
        confidence_query(dataset)
    } else {
        gene_set_query(dataset, &Thresholds::default())
    }
}

/// Number of entities of a type known to the graph
pub fn universe_query(entity_type: EntityType) -> DatasetQuery {
    let mut params = Params::new();
    params.insert(
        "prefix".to_string(),
        json!(format!("{}:", entity_type.namespace())),
    );
    DatasetQuery {
        text: "MATCH (n:BioEntity)\nWHERE n.id STARTS WITH $prefix\nRETURN count(n)".to_string(),
        params,
    }
}

/// Child/parent hierarchy edges inside one namespace
pub fn ontology_query(namespace: &Namespace) -> DatasetQuery {
    let mut params = Params::new();
    params.insert("prefix".to_string(), json!(format!("{}:", namespace)));
    DatasetQuery {
        text: r#"MATCH (child:BioEntity)-[:isa|partof]->(parent:BioEntity)
WHERE child.id STARTS WITH $prefix AND parent.id STARTS WITH $prefix
RETURN child.id, parent.id"#
            .to_string(),
        params,
    }
}

/// INDRA statements from the FamPlex families cross-referenced by `ec_code`
/// to ChEBI metabolites. An empty `chebi_ids` matches every metabolite.
pub fn enzyme_statement_query(
    ec_code: &EntityId,
    chebi_ids: &BTreeSet<EntityId>,
    thresholds: &Thresholds,
) -> DatasetQuery {
    let mut params = Params::new();
    params.insert("ec_code".to_string(), json!(ec_code.curie()));
    params.insert("statement_types".to_string(), json!(POSITIVE_STATEMENT_TYPES));
    let mut text = r#"MATCH (enzyme:BioEntity)-[:xref]-(family:BioEntity)-[r:indra_rel]->(chemical:BioEntity)
WHERE enzyme.id = $ec_code
AND family.id STARTS WITH "fplx:"
AND chemical.id STARTS WITH "chebi:"
AND r.stmt_type IN $statement_types"#
        .to_string();
    if !chebi_ids.is_empty() {
        text.push_str("\nAND chemical.id IN $chebi_ids");
        let curies: Vec<String> = chebi_ids.iter().map(EntityId::curie).collect();
        params.insert("chebi_ids".to_string(), json!(curies));
    }
    text.push_str(&threshold_clauses(thresholds, &mut params));
    text.push_str(
        "\nRETURN DISTINCT family.id, chemical.id, r.stmt_type, r.stmt_hash, r.evidence_count, r.belief",
    );
    DatasetQuery { text, params }
}

/// One statement linking an enzyme family to a metabolite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnzymeStatement {
    pub family: EntityId,
    pub metabolite: EntityId,
    pub stmt_type: String,
    pub stmt_hash: i64,
    pub evidence_count: i64,
    pub belief: f64,
}

/// Read rows of [`enzyme_statement_query`], strongest evidence first
pub fn collect_enzyme_statements(records: &[Record], query: &str) -> Result<Vec<EnzymeStatement>> {
    let malformed = |reason: String| EnrichmentError::malformed(query, reason);
    let mut statements = records
        .iter()
        .map(|record| {
            Ok(EnzymeStatement {
                family: record.str_at(0).map_err(malformed)?.parse()?,
                metabolite: record.str_at(1).map_err(malformed)?.parse()?,
                stmt_type: record.str_at(2).map_err(malformed)?.to_string(),
                stmt_hash: record.i64_at(3).map_err(malformed)?,
                evidence_count: record.i64_at(4).map_err(malformed)?,
                belief: record.opt_f64_at(5).map_err(malformed)?.unwrap_or(0.0),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    statements.sort_by(|a, b| {
        b.evidence_count
            .cmp(&a.evidence_count)
            .then_with(|| a.stmt_hash.cmp(&b.stmt_hash))
    });
    Ok(statements)
}

pub(crate) fn parse_term(record: &Record, query: &str) -> Result<Term> {
    let curie = record
        .str_at(0)
        .map_err(|reason| EnrichmentError::malformed(query, reason))?;
    let id: EntityId = curie.parse()?;
    let name = record
        .opt_str_at(1)
        .map_err(|reason| EnrichmentError::malformed(query, reason))?
        .unwrap_or_default();
    Ok(Term::new(id, name))
}

/// Local id of a member curie, or `None` when it is outside the dataset's
/// member namespace or is the term itself
pub(crate) fn member_local_id(curie: &str, dataset: Dataset, term: &EntityId) -> Result<Option<String>> {
    let member: EntityId = curie.parse()?;
    if !member.is_in(&dataset.entity_type().namespace()) || &member == term {
        return Ok(None);
    }
    Ok(Some(member.local_id))
}

/// Fold `term.id, term.name, collect(member.id)` rows into a mapping
pub fn collect_gene_sets(records: &[Record], dataset: Dataset, query: &str) -> Result<GeneSetMapping> {
    let mut mapping = GeneSetMapping::new();
    let mut skipped = 0usize;

    for record in records {
        let term = parse_term(record, query)?;
        let curies = record
            .strings_at(2)
            .map_err(|reason| EnrichmentError::malformed(query, reason))?;

        let mut members = Vec::with_capacity(curies.len());
        for curie in curies {
            match member_local_id(curie, dataset, &term.id)? {
                Some(local_id) => members.push(local_id),
                None => skipped += 1,
            }
        }

        if !members.is_empty() {
            mapping.entry(term).or_default().extend(members);
        }
    }

    if skipped > 0 {
        debug!(dataset = %dataset, skipped, "Dropped self-loop or foreign members");
    }
    Ok(mapping)
}

/// Fold `term.id, term.name, member.id, r.belief, r.evidence_count` rows
pub fn collect_confidence(records: &[Record], dataset: Dataset, query: &str) -> Result<ConfidenceMapping> {
    let mut mapping = ConfidenceMapping::new();

    for record in records {
        let term = parse_term(record, query)?;
        let curie = record
            .str_at(2)
            .map_err(|reason| EnrichmentError::malformed(query, reason))?;
        let Some(member) = member_local_id(curie, dataset, &term.id)? else {
            continue;
        };
        let belief = record
            .opt_f64_at(3)
            .map_err(|reason| EnrichmentError::malformed(query, reason))?
            .unwrap_or(0.0);
        let evidence_count = record
            .i64_at(4)
            .map_err(|reason| EnrichmentError::malformed(query, reason))?;

        mapping.entry(term).or_default().push(TargetEvidence {
            member,
            belief,
            evidence_count,
        });
    }

    Ok(mapping)
}
