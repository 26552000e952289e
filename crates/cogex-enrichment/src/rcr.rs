//! Reverse causal reasoning
//!
//! Scores every regulator in the graph as an explanation for an observed
//! signature of up- and down-regulated genes. A regulator that activates
//! the up genes and inhibits the down genes makes correct predictions; the
//! opposite is incorrect; overlap or silence is ambiguous.

use crate::error::Result;
use crate::gene_sets::{Dataset, GeneSetCache, GeneSetMapping, Thresholds};
use crate::stats::binomial_test_greater;
use cogex_common::{EntityId, Term};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Null success probability of each prediction
const NULL_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcrOptions {
    /// Regulators with fewer positive plus negative targets are not scored
    pub minimum_size: usize,
    pub alpha: f64,
    pub keep_insignificant: bool,
    pub thresholds: Thresholds,
}

impl Default for RcrOptions {
    fn default() -> Self {
        Self {
            minimum_size: 4,
            alpha: 0.05,
            keep_insignificant: true,
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Correct,
    Incorrect,
    Ambiguous,
}

/// Direction of a gene in the input signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Up,
    Down,
}

/// Classify one signed gene against a regulator's target sets.
///
/// A gene in neither target set counts as ambiguous, which grows the
/// denominator of the ambiguity-penalized p-value for sparsely annotated
/// regulators.
pub fn classify(sign: Sign, in_positive: bool, in_negative: bool) -> Prediction {
    match (sign, in_positive, in_negative) {
        (_, true, true) | (_, false, false) => Prediction::Ambiguous,
        (Sign::Up, true, false) | (Sign::Down, false, true) => Prediction::Correct,
        (Sign::Up, false, true) | (Sign::Down, true, false) => Prediction::Incorrect,
    }
}

/// One scored regulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcrRow {
    pub curie: EntityId,
    pub name: String,
    pub correct: usize,
    pub incorrect: usize,
    pub ambiguous: usize,
    /// Over correct + incorrect trials; `None` when there are none
    pub binom_pvalue: Option<f64>,
    /// Over all trials including ambiguous ones
    pub binom_ambig_pvalue: Option<f64>,
}

/// Score regulators given their positive and negative target mappings
pub fn score_hypotheses(
    positive_ids: &BTreeSet<String>,
    negative_ids: &BTreeSet<String>,
    positive_targets: &GeneSetMapping,
    negative_targets: &GeneSetMapping,
    options: &RcrOptions,
) -> Result<Vec<RcrRow>> {
    let empty = BTreeSet::new();
    let mut candidates: BTreeMap<&EntityId, &Term> = BTreeMap::new();
    for term in positive_targets.keys().chain(negative_targets.keys()) {
        candidates.entry(&term.id).or_insert(term);
    }

    // lookups by id, names may differ between the two mappings
    let positive_by_id: BTreeMap<&EntityId, &BTreeSet<String>> =
        positive_targets.iter().map(|(t, m)| (&t.id, m)).collect();
    let negative_by_id: BTreeMap<&EntityId, &BTreeSet<String>> =
        negative_targets.iter().map(|(t, m)| (&t.id, m)).collect();

    let signature: Vec<(&String, Sign)> = positive_ids
        .iter()
        .map(|g| (g, Sign::Up))
        .chain(negative_ids.iter().map(|g| (g, Sign::Down)))
        .collect();

    let mut rows = Vec::new();
    let mut too_small = 0usize;
    for (id, term) in candidates {
        let positive = positive_by_id.get(id).copied().unwrap_or(&empty);
        let negative = negative_by_id.get(id).copied().unwrap_or(&empty);

        if positive.len() + negative.len() < options.minimum_size {
            too_small += 1;
            continue;
        }

        let (mut correct, mut incorrect, mut ambiguous) = (0usize, 0usize, 0usize);
        for (gene, sign) in &signature {
            match classify(*sign, positive.contains(*gene), negative.contains(*gene)) {
                Prediction::Correct => correct += 1,
                Prediction::Incorrect => incorrect += 1,
                Prediction::Ambiguous => ambiguous += 1,
            }
        }

        let decided = (correct + incorrect) as u64;
        let (binom_pvalue, binom_ambig_pvalue) = if decided == 0 {
            (None, None)
        } else {
            (
                binomial_test_greater(correct as u64, decided, NULL_PROBABILITY)?,
                binomial_test_greater(correct as u64, decided + ambiguous as u64, NULL_PROBABILITY)?,
            )
        };

        rows.push(RcrRow {
            curie: id.clone(),
            name: term.name.clone(),
            correct,
            incorrect,
            ambiguous,
            binom_pvalue,
            binom_ambig_pvalue,
        });
    }

    let scored = rows.len();
    if !options.keep_insignificant {
        rows.retain(|row| row.binom_pvalue.is_some_and(|p| p < options.alpha));
    }
    rows.sort_by(|a, b| compare_optional(a.binom_pvalue, b.binom_pvalue).then_with(|| a.curie.cmp(&b.curie)));

    debug!(scored, too_small, kept = rows.len(), "Scored causal hypotheses");
    Ok(rows)
}

/// Ascending with undefined p-values last
fn compare_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Reverse causal reasoning over regulator target sets from the cache
pub struct RcrEngine {
    cache: Arc<GeneSetCache>,
}

impl RcrEngine {
    pub fn new(cache: Arc<GeneSetCache>) -> Self {
        Self { cache }
    }

    pub async fn reverse_causal_reasoning(
        &self,
        positive_ids: &BTreeSet<String>,
        negative_ids: &BTreeSet<String>,
        options: &RcrOptions,
    ) -> Result<Vec<RcrRow>> {
        let (positive_targets, negative_targets) = futures::try_join!(
            self.cache.get_gene_sets(Dataset::PositiveStatements, options.thresholds),
            self.cache.get_gene_sets(Dataset::NegativeStatements, options.thresholds),
        )?;

        let rows = score_hypotheses(
            positive_ids,
            negative_ids,
            &positive_targets,
            &negative_targets,
            options,
        )?;

        info!(
            up = positive_ids.len(),
            down = negative_ids.len(),
            hypotheses = rows.len(),
            "Reverse causal reasoning finished"
        );
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        use Prediction::*;
        use Sign::*;
        assert_eq!(classify(Up, true, true), Ambiguous);
        assert_eq!(classify(Up, true, false), Correct);
        assert_eq!(classify(Up, false, true), Incorrect);
        assert_eq!(classify(Up, false, false), Ambiguous);
        assert_eq!(classify(Down, true, true), Ambiguous);
        assert_eq!(classify(Down, true, false), Incorrect);
        assert_eq!(classify(Down, false, true), Correct);
        assert_eq!(classify(Down, false, false), Ambiguous);
    }

    #[test]
    fn test_undefined_p_values_sort_last() {
        let mut values = vec![None, Some(0.3), Some(0.01), None];
        values.sort_by(|a, b| compare_optional(*a, *b));
        assert_eq!(values, vec![Some(0.01), Some(0.3), None, None]);
    }
}
