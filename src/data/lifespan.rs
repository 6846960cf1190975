//! Lifespan sampling.
//!
//! Lifespans are geometric draws (number of survived years before the first
//! death event, success probability `1 - survival`) kept only when they fall in
//! `[min_age, max_age]`. Rejected draws are not replaced, so the population
//! can come out smaller than requested.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Geometric;
use tracing::debug;

use crate::domain::{Individual, LifespanConfig};
use crate::error::SimError;

pub fn validate_lifespan_config(config: &LifespanConfig) -> Result<(), SimError> {
    if config.population == 0 {
        return Err(SimError::invalid("population must be > 0"));
    }
    if !(config.survival > 0.0 && config.survival < 1.0) {
        return Err(SimError::invalid(format!(
            "survival probability must be in (0, 1), got {}",
            config.survival
        )));
    }
    if config.min_age > config.max_age {
        return Err(SimError::invalid(format!(
            "lifespan bounds are reversed: [{}, {}]",
            config.min_age, config.max_age
        )));
    }
    Ok(())
}

/// Draw lifespans and drop those outside the configured bounds.
pub fn sample_lifespans(
    rng: &mut StdRng,
    config: &LifespanConfig,
) -> Result<Vec<Individual>, SimError> {
    validate_lifespan_config(config)?;

    let geometric = Geometric::new(1.0 - config.survival)
        .map_err(|e| SimError::invalid(format!("geometric distribution: {e}")))?;

    let lo = u64::from(config.min_age);
    let hi = u64::from(config.max_age);

    let individuals: Vec<Individual> = (0..config.population)
        .map(|_| geometric.sample(rng))
        .filter(|draw| (lo..=hi).contains(draw))
        .enumerate()
        .map(|(id, draw)| Individual {
            id,
            // Bounded by `max_age`, which is a u32.
            longevity: draw as u32,
        })
        .collect();

    debug!(
        drawn = config.population,
        kept = individuals.len(),
        "sampled lifespans"
    );

    if individuals.is_empty() {
        return Err(SimError::EmptyPopulation);
    }
    Ok(individuals)
}

/// Ranges up to this width are summed term by term; wider ones use the closed form.
const DIRECT_SUM_MAX_WIDTH: u32 = 10_000;

/// Mean and variance of a geometric(`p`) variable (failures before first
/// success) conditioned on landing in `[lo, hi]`.
///
/// Returns `None` when the interval has no probability mass.
pub fn truncated_geometric_moments(p: f64, lo: u32, hi: u32) -> Option<(f64, f64)> {
    if !(p > 0.0 && p < 1.0) || lo > hi {
        return None;
    }
    let q = 1.0 - p;
    // P(K >= lo); the mass of [lo, hi] is this times P(J <= hi - lo).
    if !(q.powf(f64::from(lo)) > 0.0) {
        return None;
    }

    // K = lo + J given K >= lo, with J geometric again.
    let width = hi - lo;
    let (m1, m2) = if width <= DIRECT_SUM_MAX_WIDTH {
        offset_moments_direct(q, width)
    } else {
        offset_moments_closed(p, width)
    }?;

    let mean = f64::from(lo) + m1;
    let var = (m2 - m1 * m1).max(0.0);
    Some((mean, var))
}

/// `E[J]`, `E[J^2]` for `J` on `0..=width` with weights `q^j`.
fn offset_moments_direct(q: f64, width: u32) -> Option<(f64, f64)> {
    let mut w = 1.0;
    let (mut s0, mut s1, mut s2) = (0.0, 0.0, 0.0);
    for j in 0..=width {
        let jf = f64::from(j);
        s0 += w;
        s1 += jf * w;
        s2 += jf * jf * w;
        w *= q;
        if w == 0.0 {
            break;
        }
    }
    (s0 > 0.0).then(|| (s1 / s0, s2 / s0))
}

/// Same moments without iterating.
///
/// An untruncated geometric `G` is `J` with probability `a = 1 - q^(width+1)`,
/// else `width + 1 + G'`. Solving for the moments of `J`:
///
/// ```text
/// E[J]   = (E[G]   - q^t (t + E[G]))                   / a
/// E[J^2] = (E[G^2] - q^t (t^2 + 2 t E[G] + E[G^2]))    / a,   t = width + 1
/// ```
fn offset_moments_closed(p: f64, width: u32) -> Option<(f64, f64)> {
    let q = 1.0 - p;
    let t = f64::from(width) + 1.0;
    let log_tail = t * q.ln();
    let tail = log_tail.exp();
    let a = -log_tail.exp_m1();
    if !(a > 0.0) {
        return None;
    }

    let g1 = q / p;
    let g2 = q * (1.0 + q) / (p * p);
    let m1 = (g1 - tail * (t + g1)) / a;
    let m2 = (g2 - tail * (t * t + 2.0 * t * g1 + g2)) / a;
    (m1.is_finite() && m2.is_finite()).then_some((m1, m2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(population: usize, survival: f64, min_age: u32, max_age: u32) -> LifespanConfig {
        LifespanConfig {
            population,
            survival,
            min_age,
            max_age,
        }
    }

    #[test]
    fn retained_lifespans_are_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let cfg = config(2000, 0.8, 3, 20);
        let pop = sample_lifespans(&mut rng, &cfg).unwrap();
        assert!(!pop.is_empty());
        assert!(pop.len() <= 2000);
        assert!(pop.iter().all(|i| (3..=20).contains(&i.longevity)));
        // Ids are dense row positions.
        assert!(pop.iter().enumerate().all(|(k, i)| i.id == k));
    }

    #[test]
    fn sample_mean_matches_truncated_geometric() {
        let mut rng = StdRng::seed_from_u64(42);
        let cfg = config(10_000, 0.8, 3, 20);
        let pop = sample_lifespans(&mut rng, &cfg).unwrap();

        let (mean, var) = truncated_geometric_moments(0.2, 3, 20).unwrap();
        let n = pop.len() as f64;
        let sample_mean = pop.iter().map(|i| f64::from(i.longevity)).sum::<f64>() / n;
        let se = (var / n).sqrt();
        assert!(
            (sample_mean - mean).abs() < 3.0 * se,
            "sample mean {sample_mean:.3} vs expected {mean:.3} (se {se:.4})"
        );

        // Standard error of the sample variance: sqrt((m4 - var^2) / n).
        let m4 = (3..=20u32)
            .map(|k| {
                let kf = f64::from(k);
                0.2 * 0.8f64.powf(kf) * (kf - mean).powi(4)
            })
            .sum::<f64>()
            / (0.8f64.powi(3) - 0.8f64.powi(21));
        let sample_var = pop
            .iter()
            .map(|i| (f64::from(i.longevity) - sample_mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        let var_se = ((m4 - var * var) / n).sqrt();
        assert!(
            (sample_var - var).abs() < 3.0 * var_se,
            "sample variance {sample_var:.3} vs expected {var:.3} (se {var_se:.4})"
        );

        // Roughly P(3 <= K <= 20) = 0.8^3 - 0.8^21 of the draws survive the filter.
        let expected_kept = 10_000.0 * (0.8f64.powi(3) - 0.8f64.powi(21));
        assert!((n - expected_kept).abs() < 200.0, "kept {n}, expected ~{expected_kept:.0}");
    }

    #[test]
    fn same_seed_same_population() {
        let cfg = config(500, 0.7, 3, 15);
        let a = sample_lifespans(&mut StdRng::seed_from_u64(1), &cfg).unwrap();
        let b = sample_lifespans(&mut StdRng::seed_from_u64(1), &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_survival_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        for s in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let err = sample_lifespans(&mut rng, &config(10, s, 3, 20)).unwrap_err();
            assert!(matches!(err, SimError::InvalidParameter(_)), "s={s}");
        }
    }

    #[test]
    fn impossible_bounds_give_empty_population() {
        // With survival 0.01 a lifespan above 50 essentially never occurs.
        let mut rng = StdRng::seed_from_u64(3);
        let err = sample_lifespans(&mut rng, &config(100, 0.01, 50, 60)).unwrap_err();
        assert_eq!(err, SimError::EmptyPopulation);
    }

    #[test]
    fn closed_form_moments_match_direct_sums() {
        for (p, width) in [(0.2, 17), (0.2, 60), (0.01, 40), (0.5, 0)] {
            let (d1, d2) = offset_moments_direct(1.0 - p, width).unwrap();
            let (c1, c2) = offset_moments_closed(p, width).unwrap();
            assert!((d1 - c1).abs() < 1e-9 * d1.max(1.0), "p={p} width={width}: {d1} vs {c1}");
            assert!((d2 - c2).abs() < 1e-9 * d2.max(1.0), "p={p} width={width}: {d2} vs {c2}");
        }
    }

    #[test]
    fn huge_upper_bound_is_the_shifted_geometric() {
        // Memoryless: K | K >= 3 is 3 + Geometric(0.2), mean 3 + 4, variance 20.
        let (mean, var) = truncated_geometric_moments(0.2, 3, u32::MAX).unwrap();
        assert!((mean - 7.0).abs() < 1e-9, "{mean}");
        assert!((var - 20.0).abs() < 1e-9, "{var}");
    }

    #[test]
    fn moments_of_degenerate_interval() {
        let (mean, var) = truncated_geometric_moments(0.3, 5, 5).unwrap();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!(var.abs() < 1e-12);
        assert!(truncated_geometric_moments(1.0, 3, 20).is_none());
    }
}
