use crate::error::EnrichmentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multiple-testing correction methods
///
/// Adjusted values follow the definitions used by `statsmodels`
/// `multipletests`, including the single-iteration two-stage FDR variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CorrectionMethod {
    #[serde(rename = "bonferroni")]
    Bonferroni,
    #[serde(rename = "sidak")]
    Sidak,
    #[serde(rename = "holm-sidak")]
    HolmSidak,
    #[serde(rename = "holm")]
    Holm,
    #[serde(rename = "simes-hochberg")]
    SimesHochberg,
    #[serde(rename = "hommel")]
    Hommel,
    /// Benjamini-Hochberg
    #[default]
    #[serde(rename = "fdr_bh")]
    FdrBh,
    /// Benjamini-Yekutieli
    #[serde(rename = "fdr_by")]
    FdrBy,
    /// Two-stage Benjamini-Hochberg
    #[serde(rename = "fdr_tsbh")]
    FdrTsbh,
    /// Two-stage Benjamini-Krieger-Yekutieli
    #[serde(rename = "fdr_tsbky")]
    FdrTsbky,
}

impl CorrectionMethod {
    pub const ALL: [CorrectionMethod; 10] = [
        CorrectionMethod::Bonferroni,
        CorrectionMethod::Sidak,
        CorrectionMethod::HolmSidak,
        CorrectionMethod::Holm,
        CorrectionMethod::SimesHochberg,
        CorrectionMethod::Hommel,
        CorrectionMethod::FdrBh,
        CorrectionMethod::FdrBy,
        CorrectionMethod::FdrTsbh,
        CorrectionMethod::FdrTsbky,
    ];

    pub const NAMES: &'static [&'static str] = &[
        "bonferroni",
        "sidak",
        "holm-sidak",
        "holm",
        "simes-hochberg",
        "hommel",
        "fdr_bh",
        "fdr_by",
        "fdr_tsbh",
        "fdr_tsbky",
    ];

    pub fn name(self) -> &'static str {
        match self {
            CorrectionMethod::Bonferroni => "bonferroni",
            CorrectionMethod::Sidak => "sidak",
            CorrectionMethod::HolmSidak => "holm-sidak",
            CorrectionMethod::Holm => "holm",
            CorrectionMethod::SimesHochberg => "simes-hochberg",
            CorrectionMethod::Hommel => "hommel",
            CorrectionMethod::FdrBh => "fdr_bh",
            CorrectionMethod::FdrBy => "fdr_by",
            CorrectionMethod::FdrTsbh => "fdr_tsbh",
            CorrectionMethod::FdrTsbky => "fdr_tsbky",
        }
    }

    /// Two-stage methods estimate the share of true nulls and can adjust a
    /// p-value downwards.
    pub fn is_two_stage(self) -> bool {
        matches!(self, CorrectionMethod::FdrTsbh | CorrectionMethod::FdrTsbky)
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CorrectionMethod {
    type Err = EnrichmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bonferroni" | "b" => Ok(CorrectionMethod::Bonferroni),
            "sidak" | "s" => Ok(CorrectionMethod::Sidak),
            "holm-sidak" | "hs" => Ok(CorrectionMethod::HolmSidak),
            "holm" | "h" => Ok(CorrectionMethod::Holm),
            "simes-hochberg" | "sh" => Ok(CorrectionMethod::SimesHochberg),
            "hommel" | "ho" => Ok(CorrectionMethod::Hommel),
            "fdr_bh" | "fdr_i" | "fdr_p" | "fdri" | "fdrp" => Ok(CorrectionMethod::FdrBh),
            "fdr_by" | "fdr_n" | "fdr_c" | "fdrn" | "fdrcorr" => Ok(CorrectionMethod::FdrBy),
            "fdr_tsbh" | "fdr_2sbh" => Ok(CorrectionMethod::FdrTsbh),
            "fdr_tsbky" | "fdr_2sbky" | "fdr_twostage" => Ok(CorrectionMethod::FdrTsbky),
            _ => Err(EnrichmentError::UnknownCorrectionMethod(s.to_string())),
        }
    }
}

/// Adjust `p_values` for multiple testing. Output is in input order and
/// capped at 1. `alpha` only matters for the two-stage methods.
pub fn correct(p_values: &[f64], method: CorrectionMethod, alpha: f64) -> Vec<f64> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| p_values[i].total_cmp(&p_values[j]));
    let sorted: Vec<f64> = order.iter().map(|&i| p_values[i]).collect();

    let adjusted = match method {
        CorrectionMethod::Bonferroni => sorted.iter().map(|p| p * m as f64).collect(),
        CorrectionMethod::Sidak => sorted.iter().map(|&p| sidak(p, m)).collect(),
        CorrectionMethod::HolmSidak => {
            let mut raw: Vec<f64> = sorted
                .iter()
                .enumerate()
                .map(|(i, &p)| sidak(p, m - i))
                .collect();
            cumulative_max(&mut raw);
            raw
        },
        CorrectionMethod::Holm => {
            let mut raw = step_factors(&sorted);
            cumulative_max(&mut raw);
            raw
        },
        CorrectionMethod::SimesHochberg => {
            let mut raw = step_factors(&sorted);
            reverse_cumulative_min(&mut raw);
            raw
        },
        CorrectionMethod::Hommel => hommel(&sorted),
        CorrectionMethod::FdrBh => benjamini_hochberg(&sorted),
        CorrectionMethod::FdrBy => {
            let harmonic: f64 = (1..=m).map(|k| 1.0 / k as f64).sum();
            let mut raw: Vec<f64> = sorted
                .iter()
                .enumerate()
                .map(|(i, p)| p * m as f64 * harmonic / (i + 1) as f64)
                .collect();
            reverse_cumulative_min(&mut raw);
            raw
        },
        CorrectionMethod::FdrTsbh => two_stage(&sorted, alpha, false),
        CorrectionMethod::FdrTsbky => two_stage(&sorted, alpha, true),
    };

    let mut out = vec![0.0; m];
    for (rank, &index) in order.iter().enumerate() {
        out[index] = adjusted[rank].min(1.0);
    }
    out
}

/// `1 - (1 - p)^n` without cancellation for small p
fn sidak(p: f64, n: usize) -> f64 {
    -((-p).ln_1p() * n as f64).exp_m1()
}

/// `(m - i) * p_i` over ascending p-values
fn step_factors(sorted: &[f64]) -> Vec<f64> {
    let m = sorted.len();
    sorted
        .iter()
        .enumerate()
        .map(|(i, p)| (m - i) as f64 * p)
        .collect()
}

fn cumulative_max(values: &mut [f64]) {
    for i in 1..values.len() {
        if values[i] < values[i - 1] {
            values[i] = values[i - 1];
        }
    }
}

fn reverse_cumulative_min(values: &mut [f64]) {
    for i in (0..values.len().saturating_sub(1)).rev() {
        if values[i] > values[i + 1] {
            values[i] = values[i + 1];
        }
    }
}

fn benjamini_hochberg(sorted: &[f64]) -> Vec<f64> {
    let m = sorted.len() as f64;
    let mut raw: Vec<f64> = sorted
        .iter()
        .enumerate()
        .map(|(i, p)| p * m / (i + 1) as f64)
        .collect();
    reverse_cumulative_min(&mut raw);
    for value in &mut raw {
        *value = value.min(1.0);
    }
    raw
}

fn hommel(sorted: &[f64]) -> Vec<f64> {
    let n = sorted.len();
    let mut adjusted = sorted.to_vec();

    for k in (2..=n).rev() {
        let tail = n - k;
        let cim = (0..k)
            .map(|j| k as f64 * sorted[tail + j] / (j + 1) as f64)
            .fold(f64::INFINITY, f64::min);

        for value in &mut adjusted[tail..] {
            *value = value.max(cim);
        }
        for i in 0..tail {
            adjusted[i] = adjusted[i].max((k as f64 * sorted[i]).min(cim));
        }
    }

    adjusted
}

/// One iteration of the adaptive two-stage procedure: BH at `alpha'`
/// estimates the number of true nulls `m0`, then BH values are scaled by
/// `m0 / m` (and by `1 + alpha` for BKY).
fn two_stage(sorted: &[f64], alpha: f64, bky: bool) -> Vec<f64> {
    let m = sorted.len();
    let (factor, alpha_prime) = if bky {
        (1.0 + alpha, alpha / (1.0 + alpha))
    } else {
        (1.0, alpha)
    };

    let bh = benjamini_hochberg(sorted);
    let rejected = bh.iter().filter(|&&q| q <= alpha_prime).count();

    let scale = if rejected == 0 || rejected == m {
        factor
    } else {
        let null_count = (m - rejected) as f64;
        null_count / m as f64 * factor
    };

    bh.into_iter().map(|q| q * scale).collect()
}
