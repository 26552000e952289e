use crate::error::{EnrichmentError, Result};
use serde::Serialize;
use statrs::distribution::{Discrete, Hypergeometric};

/// 2x2 table of a query set against one reference set
///
/// ```text
///              in R    not in R
/// in Q          a         b
/// not in Q      c         d
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}

impl ContingencyTable {
    /// Build the table from set sizes. `d` saturates at zero when the
    /// universe is smaller than the union.
    pub fn from_counts(overlap: usize, query_size: usize, reference_size: usize, universe_size: usize) -> Self {
        let a = overlap as u64;
        let b = query_size.saturating_sub(overlap) as u64;
        let c = reference_size.saturating_sub(overlap) as u64;
        let union = a + b + c;
        let d = (universe_size as u64).saturating_sub(union);
        Self { a, b, c, d }
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }
}

/// One-sided Fisher exact test, alternative "greater": `P(X >= a)` for
/// `X ~ Hypergeometric(N = a+b+c+d, K = a+c, n = a+b)`.
///
/// A table with no overlap has p = 1.
pub fn fisher_exact_greater(table: &ContingencyTable) -> Result<f64> {
    if table.a == 0 {
        return Ok(1.0);
    }

    let population = table.total();
    let successes = table.a + table.c;
    let draws = table.a + table.b;
    let dist = Hypergeometric::new(population, successes, draws).map_err(|e| {
        EnrichmentError::config(format!("invalid contingency table {:?}: {}", table, e))
    })?;

    // log-space terms: binomial coefficients overflow f64 at genome scale
    let upper = successes.min(draws);
    let p: f64 = (table.a..=upper).map(|x| dist.ln_pmf(x).exp()).sum();
    Ok(p.clamp(0.0, 1.0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        // universe 20, |R| = 5, |Q| = 5, overlap 3 -> 1126 / 15504
        let table = ContingencyTable::from_counts(3, 5, 5, 20);
        assert_eq!(table, ContingencyTable { a: 3, b: 2, c: 2, d: 13 });
        let p = fisher_exact_greater(&table).unwrap();
        assert!((p - 1126.0 / 15504.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_overlap_is_one() {
        let table = ContingencyTable::from_counts(0, 10, 0, 100);
        assert_eq!(fisher_exact_greater(&table).unwrap(), 1.0);
    }

    #[test]
    fn test_reference_covering_universe() {
        // every query gene must fall in R, so the observation is certain
        let table = ContingencyTable::from_counts(4, 4, 50, 50);
        assert_eq!(table.d, 0);
        let p = fisher_exact_greater(&table).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_genome_scale_universe_is_finite() {
        let table = ContingencyTable::from_counts(40, 200, 300, 20_000);
        let p = fisher_exact_greater(&table).unwrap();
        assert!(p.is_finite());
        assert!(p > 0.0 && p < 1e-20);
    }

    #[test]
    fn test_universe_smaller_than_union_saturates() {
        let table = ContingencyTable::from_counts(2, 10, 10, 5);
        assert_eq!(table.d, 0);
        assert!(fisher_exact_greater(&table).unwrap() <= 1.0);
    }
}
