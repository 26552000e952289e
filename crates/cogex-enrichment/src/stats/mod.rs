//! Statistical primitives: exact tail probabilities and multiple-testing
//! correction

mod binomial;
mod correction;
mod hypergeom;

pub use binomial::binomial_test_greater;
pub use correction::{correct, CorrectionMethod};
pub use hypergeom::{fisher_exact_greater, ContingencyTable};

/// `-log10(p)`, finite even for a p-value that underflowed to zero
pub fn minus_log10(p: f64) -> f64 {
    -p.max(f64::MIN_POSITIVE).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minus_log10() {
        assert_eq!(minus_log10(1.0), 0.0);
        assert!((minus_log10(0.001) - 3.0).abs() < 1e-12);
        assert!(minus_log10(0.0).is_finite());
    }
}
