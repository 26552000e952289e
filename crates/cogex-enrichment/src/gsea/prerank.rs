//! Pre-ranked permutation enrichment
//!
//! Running-sum enrichment scores against a fixed ranking, with a null
//! distribution drawn by placing the matched genes at random ranks.

use super::Ranking;
use crate::error::{EnrichmentError, Result};
use cogex_common::Term;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Parameters shared by every set in one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentParams {
    pub permutation_num: usize,
    pub seed: Option<u64>,
    pub min_size: usize,
    pub max_size: usize,
    /// Exponent applied to `|score|` on hits
    pub weight: f64,
}

/// Raw statistics for one reference set
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentRecord {
    pub term: Term,
    pub es: f64,
    pub nes: f64,
    pub pval: f64,
    pub fdr: f64,
    pub geneset_size: usize,
    /// Ranks of the set members present in the ranking, ascending
    pub hits: Vec<usize>,
}

impl EnrichmentRecord {
    pub fn matched_size(&self) -> usize {
        self.hits.len()
    }
}

/// Strategy computing enrichment statistics for a ranking
pub trait PermutationEnrichment: Send + Sync {
    fn run(
        &self,
        ranking: &Ranking,
        gene_sets: &[(Term, BTreeSet<String>)],
        params: &EnrichmentParams,
    ) -> Result<Vec<EnrichmentRecord>>;
}

/// GSEA pre-ranked procedure with gene-tag permutation
#[derive(Debug, Clone, Copy, Default)]
pub struct PrerankEnrichment;

impl PermutationEnrichment for PrerankEnrichment {
    fn run(
        &self,
        ranking: &Ranking,
        gene_sets: &[(Term, BTreeSet<String>)],
        params: &EnrichmentParams,
    ) -> Result<Vec<EnrichmentRecord>> {
        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut tested = Vec::new();
        let mut skipped = 0usize;
        for (term, members) in gene_sets {
            let hits = ranking.positions(members);
            if hits.len() < params.min_size || hits.len() > params.max_size {
                skipped += 1;
                continue;
            }
            tested.push((term, members.len(), hits));
        }

        if tested.is_empty() {
            return Err(EnrichmentError::insufficient_data(format!(
                "no gene set has between {} and {} genes in the ranked list of {}",
                params.min_size,
                params.max_size,
                ranking.len()
            )));
        }

        let scores = ranking.scores();
        let mut observed = Vec::with_capacity(tested.len());
        let mut nulls = Vec::with_capacity(tested.len());
        for (_, _, hits) in &tested {
            observed.push(enrichment_score(scores, hits, params.weight));
            nulls.push(null_distribution(scores, hits.len(), params, &mut rng));
        }

        let significance = significance(&observed, &nulls);
        debug!(tested = tested.len(), skipped, permutations = params.permutation_num, "Scored gene sets");

        Ok(tested
            .into_iter()
            .zip(observed)
            .zip(significance)
            .map(|(((term, geneset_size, hits), es), (nes, pval, fdr))| EnrichmentRecord {
                term: term.clone(),
                es,
                nes,
                pval,
                fdr,
                geneset_size,
                hits,
            })
            .collect())
    }
}

fn step_sizes(scores: &[f64], hits: &[usize], weight: f64) -> (f64, f64) {
    let hit_norm: f64 = hits.iter().map(|&i| scores[i].abs().powf(weight)).sum();
    let misses = scores.len().saturating_sub(hits.len());
    let miss_step = if misses == 0 { 0.0 } else { 1.0 / misses as f64 };
    (hit_norm, miss_step)
}

fn hit_step(score: f64, weight: f64, hit_norm: f64, hit_count: usize) -> f64 {
    if hit_norm > 0.0 {
        score.abs().powf(weight) / hit_norm
    } else {
        1.0 / hit_count as f64
    }
}

/// Running enrichment score at every rank. `hits` must be ascending.
pub fn running_enrichment(scores: &[f64], hits: &[usize], weight: f64) -> Vec<f64> {
    let (hit_norm, miss_step) = step_sizes(scores, hits, weight);
    let mut running = Vec::with_capacity(scores.len());
    let mut next_hit = hits.iter().peekable();
    let mut sum = 0.0;
    for (rank, &score) in scores.iter().enumerate() {
        if next_hit.peek() == Some(&&rank) {
            next_hit.next();
            sum += hit_step(score, weight, hit_norm, hits.len());
        } else {
            sum -= miss_step;
        }
        running.push(sum);
    }
    running
}

/// Signed maximum deviation of the running sum from zero
pub fn enrichment_score(scores: &[f64], hits: &[usize], weight: f64) -> f64 {
    if hits.is_empty() {
        return 0.0;
    }
    let (hit_norm, miss_step) = step_sizes(scores, hits, weight);

    // between hits the sum only falls, so extremes are found at hit boundaries
    let (mut sum, mut max, mut min) = (0.0f64, 0.0f64, 0.0f64);
    let mut previous: Option<usize> = None;
    for &rank in hits {
        let gap = match previous {
            Some(p) => rank - p - 1,
            None => rank,
        };
        sum -= gap as f64 * miss_step;
        min = min.min(sum);
        sum += hit_step(scores[rank], weight, hit_norm, hits.len());
        max = max.max(sum);
        previous = Some(rank);
    }
    let tail = scores.len() - hits[hits.len() - 1] - 1;
    min = min.min(sum - tail as f64 * miss_step);

    if max.abs() >= min.abs() {
        max
    } else {
        min
    }
}

fn null_distribution(scores: &[f64], hit_count: usize, params: &EnrichmentParams, rng: &mut StdRng) -> Vec<f64> {
    (0..params.permutation_num)
        .map(|_| {
            let mut hits = index::sample(rng, scores.len(), hit_count).into_vec();
            hits.sort_unstable();
            enrichment_score(scores, &hits, params.weight)
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Normalize one score by the mean magnitude of same-signed null scores.
/// Falls back to the raw score when the null has no same-signed values.
fn normalize(value: f64, positive_mean: Option<f64>, negative_mean: Option<f64>) -> f64 {
    let scale = if value >= 0.0 { positive_mean } else { negative_mean };
    match scale {
        Some(scale) if scale > 0.0 => value / scale,
        _ => value,
    }
}

/// NES, nominal p and FDR for every observed score
fn significance(observed: &[f64], nulls: &[Vec<f64>]) -> Vec<(f64, f64, f64)> {
    let mut nes = Vec::with_capacity(observed.len());
    let mut pvals = Vec::with_capacity(observed.len());
    let mut null_nes = Vec::new();

    for (&es, null) in observed.iter().zip(nulls) {
        let positive_mean = mean(null.iter().copied().filter(|v| *v >= 0.0));
        let negative_mean = mean(null.iter().filter(|v| **v < 0.0).map(|v| v.abs()));

        nes.push(normalize(es, positive_mean, negative_mean));
        null_nes.extend(null.iter().map(|&v| normalize(v, positive_mean, negative_mean)));

        let (extreme, same_sign) = if es >= 0.0 {
            (null.iter().filter(|v| **v >= es).count(), null.iter().filter(|v| **v >= 0.0).count())
        } else {
            (null.iter().filter(|v| **v <= es).count(), null.iter().filter(|v| **v < 0.0).count())
        };
        pvals.push(fraction(extreme, same_sign));
    }

    let null_positive = null_nes.iter().filter(|v| **v >= 0.0).count();
    let null_negative = null_nes.len() - null_positive;
    let observed_positive = nes.iter().filter(|v| **v >= 0.0).count();
    let observed_negative = nes.len() - observed_positive;

    nes.iter()
        .zip(pvals)
        .map(|(&value, pval)| {
            let fdr = if value >= 0.0 {
                let null_share = fraction(null_nes.iter().filter(|v| **v >= value).count(), null_positive);
                let observed_share = fraction(nes.iter().filter(|v| **v >= value).count(), observed_positive);
                null_share / observed_share
            } else {
                let null_share =
                    fraction(null_nes.iter().filter(|v| **v <= value && **v < 0.0).count(), null_negative);
                let observed_share = fraction(nes.iter().filter(|v| **v <= value).count(), observed_negative);
                null_share / observed_share
            };
            (value, pval, fdr.min(1.0))
        })
        .collect()
}

/// `part / whole`, or 1 when nothing was drawn
fn fraction(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        1.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_running_sum_matches_fast_score() {
        let scores = [3.0, 2.5, 1.0, 0.5, -0.2, -1.0, -2.0, -4.0];
        for hits in [vec![0, 1], vec![6, 7], vec![0, 7], vec![2, 3, 4]] {
            let running = running_enrichment(&scores, &hits, 1.0);
            let max = running.iter().copied().fold(0.0f64, f64::max);
            let min = running.iter().copied().fold(0.0f64, f64::min);
            let expected = if max.abs() >= min.abs() { max } else { min };
            let es = enrichment_score(&scores, &hits, 1.0);
            assert!((es - expected).abs() < 1e-12, "hits {:?}: {} vs {}", hits, es, expected);
        }
    }

    #[test]
    fn test_sign_of_score_follows_rank() {
        let scores = [5.0, 4.0, 3.0, 2.0, 1.0, -1.0, -2.0, -3.0, -4.0, -5.0];
        assert!(enrichment_score(&scores, &[0, 1, 2], 1.0) > 0.0);
        assert!(enrichment_score(&scores, &[7, 8, 9], 1.0) < 0.0);
    }

    #[test]
    fn test_running_sum_ends_at_zero() {
        let scores = [2.0, 1.0, 0.0, -1.0, -2.0];
        let running = running_enrichment(&scores, &[1, 3], 1.0);
        assert!(running.last().unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_scores_use_uniform_hits() {
        let scores = [0.0; 4];
        let es = enrichment_score(&scores, &[0, 1], 1.0);
        assert!((es - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fraction_of_nothing_is_one() {
        assert_eq!(fraction(0, 0), 1.0);
        assert_eq!(fraction(1, 4), 0.25);
    }

    #[test]
    fn test_fdr_capped() {
        let observed = [0.1, 0.9];
        let nulls = vec![vec![0.5, 0.6, 0.7], vec![0.2, 0.3, 0.1]];
        for (_, pval, fdr) in significance(&observed, &nulls) {
            assert!((0.0..=1.0).contains(&pval));
            assert!((0.0..=1.0).contains(&fdr));
        }
    }
}
