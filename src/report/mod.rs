//! Reporting utilities: per-age comparisons and the decline diagnostic.

use std::collections::BTreeMap;

use crate::data::truncated_geometric_moments;
use crate::domain::{
    ComparisonRow, DeclineDiagnostic, Individual, LifespanConfig, YearlyObservation,
};
use crate::error::SimError;
use crate::fit::GlmFit;
use crate::models::Covariates;

pub mod format;

pub use format::*;

/// Normal quantile for 95% intervals.
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Population-level statistics for the summary header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationStats {
    pub drawn: usize,
    pub kept: usize,
    pub rows: usize,
    pub mean_longevity: f64,
    /// Truncated-geometric mean for the configured sampler.
    pub expected_longevity: Option<f64>,
    pub max_age: u32,
}

impl PopulationStats {
    pub fn compute(
        config: &LifespanConfig,
        individuals: &[Individual],
        observations: &[YearlyObservation],
    ) -> Self {
        let kept = individuals.len();
        let mean_longevity = if kept == 0 {
            f64::NAN
        } else {
            individuals.iter().map(|i| f64::from(i.longevity)).sum::<f64>() / kept as f64
        };
        let expected_longevity =
            truncated_geometric_moments(1.0 - config.survival, config.min_age, config.max_age)
                .map(|(mean, _)| mean);

        Self {
            drawn: config.population,
            kept,
            rows: observations.len(),
            mean_longevity,
            expected_longevity,
            max_age: observations.iter().map(|o| o.age).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct AgeTally {
    n: usize,
    successes: usize,
    prob_sum: f64,
}

/// Compare observed, true and fitted reproduction at every observed age.
///
/// `cutoff` reproduces the age categories used in the fit; `longevity` is the
/// value held fixed when the model has a longevity term.
pub fn compute_comparison(
    observations: &[YearlyObservation],
    fit: &GlmFit,
    cutoff: Option<u32>,
    longevity: f64,
) -> Result<Vec<ComparisonRow>, SimError> {
    if observations.is_empty() {
        return Err(SimError::EmptyPopulation);
    }

    let mut by_age: BTreeMap<u32, AgeTally> = BTreeMap::new();
    for o in observations {
        let t = by_age.entry(o.age).or_default();
        t.n += 1;
        t.successes += usize::from(o.repro);
        t.prob_sum += o.repro_prob;
    }

    let mut rows = Vec::with_capacity(by_age.len());
    for (age, t) in by_age {
        let (observed_lo, observed_hi) = wilson_interval(t.successes, t.n, Z_95);
        let (fitted, fitted_lo, fitted_hi) =
            fit.predict_interval(&Covariates::at_age(age, cutoff, longevity), Z_95);
        if !(fitted.is_finite() && fitted_lo.is_finite() && fitted_hi.is_finite()) {
            return Err(SimError::FitFailed(format!(
                "non-finite fitted probability at age {age}"
            )));
        }
        rows.push(ComparisonRow {
            age,
            n: t.n,
            observed: t.successes as f64 / t.n as f64,
            observed_lo,
            observed_hi,
            true_prob: t.prob_sum / t.n as f64,
            fitted,
            fitted_lo,
            fitted_hi,
        });
    }
    Ok(rows)
}

/// Wilson score interval for a binomial proportion.
pub fn wilson_interval(successes: usize, n: usize, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 1.0);
    }
    let n = n as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let half = z * ((p * (1.0 - p) + z2 / (4.0 * n)) / n).sqrt() / denom;
    ((center - half).max(0.0), (center + half).min(1.0))
}

/// Measure the late-life drop of the fitted curve.
///
/// No simulated individual ever declines, so any fitted drop larger than
/// `threshold` is flagged as spurious. Returns `None` for an empty table.
pub fn decline_diagnostic(rows: &[ComparisonRow], threshold: f64) -> Option<DeclineDiagnostic> {
    let last = rows.last()?;

    let mut peak = &rows[0];
    for r in &rows[1..] {
        if r.fitted > peak.fitted {
            peak = r;
        }
    }
    let true_peak = rows
        .iter()
        .map(|r| r.true_prob)
        .fold(f64::NEG_INFINITY, f64::max);

    let fitted_drop = peak.fitted - last.fitted;
    Some(DeclineDiagnostic {
        peak_age: peak.age,
        peak_fitted: peak.fitted,
        last_age: last.age,
        last_fitted: last.fitted,
        fitted_drop,
        true_drop: true_peak - last.true_prob,
        spurious: fitted_drop > threshold,
    })
}

/// Row-weighted mean longevity of the observation table.
pub fn mean_observed_longevity(observations: &[YearlyObservation]) -> f64 {
    if observations.is_empty() {
        return 0.0;
    }
    observations.iter().map(|o| f64::from(o.longevity)).sum::<f64>() / observations.len() as f64
}
