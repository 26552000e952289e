//! Reference gene sets
//!
//! A dataset maps reference entities (GO terms, pathways, phenotypes,
//! regulators, enzymes) to the local ids of their member genes or
//! metabolites. Mappings are loaded through [`GeneSetCache`], which keeps
//! one copy per `(dataset, thresholds)` key.

mod cache;
pub mod queries;
pub mod sqlite;

pub use cache::GeneSetCache;
pub use sqlite::{build_sqlite_cache, BuildOptions, BuildReport, CacheEntryStatus, SqliteGeneSetStore};

use crate::error::{EnrichmentError, Result};
use cogex_common::{EntityId, Namespace, Term};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Reference term to member local ids
pub type GeneSetMapping = BTreeMap<Term, BTreeSet<String>>;

/// Reference term to every supporting relationship, before thresholds
pub type ConfidenceMapping = BTreeMap<Term, Vec<TargetEvidence>>;

/// One relationship between a reference entity and a member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEvidence {
    pub member: String,
    pub belief: f64,
    pub evidence_count: i64,
}

/// Named reference datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dataset {
    Go,
    Reactome,
    #[serde(rename = "wikipathways")]
    WikiPathways,
    Phenotypes,
    /// Regulator entity to the genes it acts on
    #[serde(rename = "indra-upstream")]
    EntityToTargets,
    /// Entity to the genes acting on it
    #[serde(rename = "indra-downstream")]
    EntityToRegulators,
    /// Regulator to genes it activates or increases
    PositiveStatements,
    /// Regulator to genes it inhibits or decreases
    NegativeStatements,
    /// Enzyme (EC code) to the metabolites its family produces
    Metabolomics,
}

impl Dataset {
    pub const ALL: [Dataset; 9] = [
        Dataset::Go,
        Dataset::Reactome,
        Dataset::WikiPathways,
        Dataset::Phenotypes,
        Dataset::EntityToTargets,
        Dataset::EntityToRegulators,
        Dataset::PositiveStatements,
        Dataset::NegativeStatements,
        Dataset::Metabolomics,
    ];

    pub const NAMES: &'static [&'static str] = &[
        "go",
        "reactome",
        "wikipathways",
        "phenotypes",
        "indra-upstream",
        "indra-downstream",
        "positive-statements",
        "negative-statements",
        "metabolomics",
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dataset::Go => "go",
            Dataset::Reactome => "reactome",
            Dataset::WikiPathways => "wikipathways",
            Dataset::Phenotypes => "phenotypes",
            Dataset::EntityToTargets => "indra-upstream",
            Dataset::EntityToRegulators => "indra-downstream",
            Dataset::PositiveStatements => "positive-statements",
            Dataset::NegativeStatements => "negative-statements",
            Dataset::Metabolomics => "metabolomics",
        }
    }

    /// Whether membership comes from INDRA statements carrying belief and
    /// evidence counts, so thresholds apply
    pub fn is_weighted(self) -> bool {
        matches!(
            self,
            Dataset::EntityToTargets
                | Dataset::EntityToRegulators
                | Dataset::PositiveStatements
                | Dataset::NegativeStatements
                | Dataset::Metabolomics
        )
    }

    pub fn entity_type(self) -> EntityType {
        match self {
            Dataset::Metabolomics => EntityType::Metabolite,
            _ => EntityType::Gene,
        }
    }

    /// Namespace whose hierarchy can widen this dataset's terms
    pub fn ontology_namespace(self) -> Option<Namespace> {
        match self {
            Dataset::Go => Some(Namespace::Go),
            Dataset::Phenotypes => Some(Namespace::Hp),
            _ => None,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = EnrichmentError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "go" => Ok(Dataset::Go),
            "reactome" => Ok(Dataset::Reactome),
            "wikipathways" => Ok(Dataset::WikiPathways),
            "phenotypes" | "phenotype" => Ok(Dataset::Phenotypes),
            "indra-upstream" | "entity-to-targets" => Ok(Dataset::EntityToTargets),
            "indra-downstream" | "entity-to-regulators" => Ok(Dataset::EntityToRegulators),
            "positive-statements" => Ok(Dataset::PositiveStatements),
            "negative-statements" => Ok(Dataset::NegativeStatements),
            "metabolomics" | "enzyme" => Ok(Dataset::Metabolomics),
            _ => Err(EnrichmentError::UnknownDataset(s.to_string())),
        }
    }
}

/// Kind of member entity; each has its own universe size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Gene,
    Metabolite,
}

impl EntityType {
    pub fn namespace(self) -> Namespace {
        match self {
            EntityType::Gene => Namespace::Hgnc,
            EntityType::Metabolite => Namespace::Chebi,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Gene => f.write_str("gene"),
            EntityType::Metabolite => f.write_str("metabolite"),
        }
    }
}

/// Relationship filters applied when a dataset is weighted
///
/// An evidence minimum of `None`, 0 or 1 and a belief minimum of `None` or
/// 0.0 filter nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub minimum_evidence_count: Option<u32>,
    pub minimum_belief: Option<f64>,
}

impl Thresholds {
    pub fn new(minimum_evidence_count: Option<u32>, minimum_belief: Option<f64>) -> Result<Self> {
        let thresholds = Self {
            minimum_evidence_count,
            minimum_belief,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(belief) = self.minimum_belief {
            if !(0.0..=1.0).contains(&belief) {
                return Err(EnrichmentError::config(format!(
                    "minimum_belief must be within [0, 1], got {}",
                    belief
                )));
            }
        }
        Ok(())
    }

    pub fn evidence_filter(&self) -> Option<u32> {
        self.minimum_evidence_count.filter(|&n| n > 1)
    }

    pub fn belief_filter(&self) -> Option<f64> {
        self.minimum_belief.filter(|&b| b > 0.0)
    }

    pub fn is_noop(&self) -> bool {
        self.evidence_filter().is_none() && self.belief_filter().is_none()
    }

    pub fn admits(&self, evidence: &TargetEvidence) -> bool {
        let evidence_ok = self
            .evidence_filter()
            .map_or(true, |min| evidence.evidence_count >= i64::from(min));
        let belief_ok = self.belief_filter().map_or(true, |min| evidence.belief >= min);
        evidence_ok && belief_ok
    }

    /// Hashable form with no-op filters collapsed
    pub(crate) fn key(&self) -> (Option<u32>, Option<u64>) {
        (self.evidence_filter(), self.belief_filter().map(f64::to_bits))
    }
}

/// Turn relationship rows into gene sets, keeping rows the thresholds admit.
/// Terms left without members are dropped.
pub fn apply_thresholds(mapping: &ConfidenceMapping, thresholds: &Thresholds) -> GeneSetMapping {
    mapping
        .iter()
        .filter_map(|(term, rows)| {
            let members: BTreeSet<String> = rows
                .iter()
                .filter(|row| thresholds.admits(row))
                .map(|row| row.member.clone())
                .collect();
            (!members.is_empty()).then(|| (term.clone(), members))
        })
        .collect()
}

/// Fold terms that share an id under different names into one entry, named
/// after the first (smallest) name, with the union of their members
pub fn merge_by_id(mapping: GeneSetMapping) -> GeneSetMapping {
    let mut first_seen: BTreeMap<EntityId, Term> = BTreeMap::new();
    let mut merged = GeneSetMapping::new();
    for (term, members) in mapping {
        let key = first_seen.entry(term.id.clone()).or_insert(term).clone();
        merged.entry(key).or_default().extend(members);
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_names_round_trip() {
        for dataset in Dataset::ALL {
            assert_eq!(dataset.name().parse::<Dataset>().unwrap(), dataset);
        }
        assert_eq!(Dataset::NAMES.len(), Dataset::ALL.len());
        assert_eq!("INDRA_UPSTREAM".parse::<Dataset>().unwrap(), Dataset::EntityToTargets);
    }

    #[test]
    fn test_unknown_dataset_fails_fast() {
        let err = "kegg".parse::<Dataset>().unwrap_err();
        assert!(matches!(err, EnrichmentError::UnknownDataset(ref name) if name == "kegg"));
    }

    #[test]
    fn test_noop_thresholds_share_a_key() {
        let none = Thresholds::default();
        let trivial = Thresholds::new(Some(1), Some(0.0)).unwrap();
        assert!(trivial.is_noop());
        assert_eq!(none.key(), trivial.key());
        assert_ne!(none.key(), Thresholds::new(None, Some(0.3)).unwrap().key());
    }

    #[test]
    fn test_belief_out_of_range_rejected() {
        assert!(Thresholds::new(None, Some(1.5)).is_err());
        assert!(Thresholds::new(None, Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_apply_thresholds() {
        let regulator = Term::new(EntityId::hgnc("6407"), "KRAS");
        let weak = Term::new(EntityId::hgnc("3236"), "EGFR");
        let mut mapping = ConfidenceMapping::new();
        mapping.insert(
            regulator.clone(),
            vec![
                TargetEvidence { member: "1100".into(), belief: 0.9, evidence_count: 12 },
                TargetEvidence { member: "1101".into(), belief: 0.2, evidence_count: 30 },
                TargetEvidence { member: "1102".into(), belief: 0.95, evidence_count: 1 },
            ],
        );
        mapping.insert(
            weak.clone(),
            vec![TargetEvidence { member: "5".into(), belief: 0.1, evidence_count: 1 }],
        );

        let filtered = apply_thresholds(&mapping, &Thresholds::new(Some(2), Some(0.5)).unwrap());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[&regulator], BTreeSet::from(["1100".to_string()]));

        let everything = apply_thresholds(&mapping, &Thresholds::default());
        assert_eq!(everything[&regulator].len(), 3);
        assert!(everything.contains_key(&weak));
    }

    #[test]
    fn test_merge_by_id_unions_renamed_terms() {
        let mut mapping = GeneSetMapping::new();
        mapping.insert(
            Term::new(EntityId::new(Namespace::Go, "0006915"), "apoptotic process"),
            BTreeSet::from(["1".to_string(), "2".to_string()]),
        );
        mapping.insert(
            Term::new(EntityId::new(Namespace::Go, "0006915"), "apoptosis"),
            BTreeSet::from(["2".to_string(), "3".to_string()]),
        );
        mapping.insert(
            Term::new(EntityId::new(Namespace::Go, "0008219"), "cell death"),
            BTreeSet::from(["4".to_string()]),
        );

        let merged = merge_by_id(mapping);
        assert_eq!(merged.len(), 2);
        let (term, members) = merged.iter().next().unwrap();
        assert_eq!(term.name, "apoptosis");
        assert_eq!(members.len(), 3);
    }
}
