use crate::error::{EnrichmentError, Result};
use statrs::distribution::{Binomial, Discrete};

/// One-sided binomial test, alternative "greater": `P(X >= successes)` for
/// `X ~ Binomial(trials, p)`. Undefined (`None`) for zero trials.
pub fn binomial_test_greater(successes: u64, trials: u64, p: f64) -> Result<Option<f64>> {
    if trials == 0 {
        return Ok(None);
    }
    if successes > trials {
        return Err(EnrichmentError::config(format!(
            "{} successes out of {} trials",
            successes, trials
        )));
    }

    let dist = Binomial::new(p, trials)
        .map_err(|e| EnrichmentError::config(format!("invalid binomial parameters: {}", e)))?;
    let tail: f64 = (successes..=trials).map(|k| dist.pmf(k)).sum();
    Ok(Some(tail.clamp(0.0, 1.0)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_two_of_two() {
        let p = binomial_test_greater(2, 2, 0.5).unwrap().unwrap();
        assert!((p - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_tail_sum() {
        // P(X >= 3 | n = 4) = 5 / 16
        let p = binomial_test_greater(3, 4, 0.5).unwrap().unwrap();
        assert!((p - 0.3125).abs() < 1e-12);
        assert!((binomial_test_greater(0, 4, 0.5).unwrap().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_trials_undefined() {
        assert_eq!(binomial_test_greater(0, 0, 0.5).unwrap(), None);
    }

    #[test]
    fn test_more_successes_than_trials() {
        assert!(binomial_test_greater(3, 2, 0.5).is_err());
    }
}
