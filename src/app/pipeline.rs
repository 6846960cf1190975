//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! lifespans -> yearly histories -> GLM fits -> per-age comparison -> decline check
//!
//! The CLI then only decides what to print and export.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::info;

use crate::data::{sample_lifespans, simulate_age_only, simulate_selective};
use crate::domain::{
    AdjustedCurve, ComparisonRow, DeclineDiagnostic, Individual, ModelKind, RunConfig, Scenario,
    YearlyObservation,
};
use crate::error::{AppError, SimError};
use crate::fit::{FitSelection, GlmOptions, fit_models};
use crate::report::{
    PopulationStats, compute_comparison, decline_diagnostic, mean_observed_longevity,
};

/// All computed outputs of a single scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub scenario: Scenario,
    pub individuals: Vec<Individual>,
    pub observations: Vec<YearlyObservation>,
    pub stats: PopulationStats,
    pub selection: FitSelection,
    /// Comparison against the primary model.
    pub comparison: Vec<ComparisonRow>,
    pub diagnostic: Option<DeclineDiagnostic>,
    /// Same comparison for the longevity-adjusted model, when the scenario fits one.
    pub adjusted: Option<AdjustedCurve>,
    /// Age-category cutoff used by the models, if any.
    pub cutoff: Option<u32>,
    /// Longevity held fixed when predicting from a model with a longevity term.
    pub reference_longevity: f64,
}

impl Scenario {
    /// Models fitted for this scenario; the first one is compared to the truth.
    pub fn models(self) -> &'static [ModelKind] {
        match self {
            Scenario::AgeOnly => &[ModelKind::Quadratic],
            Scenario::SelectiveDisappearance => &[ModelKind::Interaction, ModelKind::Longevity],
        }
    }
}

/// Run one scenario with an RNG seeded from `config.seed`.
pub fn run_scenario(scenario: Scenario, config: &RunConfig) -> Result<ScenarioRun, AppError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let run = run_scenario_with_rng(scenario, config, &mut rng)?;

    info!(
        scenario = ?scenario,
        individuals = run.individuals.len(),
        rows = run.observations.len(),
        spurious = run.diagnostic.map(|d| d.spurious).unwrap_or(false),
        "scenario complete"
    );
    Ok(run)
}

/// Run one scenario drawing from the given RNG.
pub fn run_scenario_with_rng(
    scenario: Scenario,
    config: &RunConfig,
    rng: &mut StdRng,
) -> Result<ScenarioRun, SimError> {
    // 1) Lifespans.
    let individuals = sample_lifespans(rng, &config.lifespan)?;

    // 2) Yearly histories.
    let (observations, cutoff) = match scenario {
        Scenario::AgeOnly => (simulate_age_only(rng, &individuals, &config.age_curve)?, None),
        Scenario::SelectiveDisappearance => (
            simulate_selective(rng, &individuals, &config.tradeoff)?,
            Some(config.tradeoff.prime_age_cutoff),
        ),
    };
    if observations.is_empty() {
        return Err(SimError::EmptyPopulation);
    }

    // 3) Fit the scenario's models.
    let selection = fit_models(scenario.models(), &observations, &GlmOptions::default())?;

    // 4) Compare the primary model with the truth.
    let reference_longevity = mean_observed_longevity(&observations);
    let comparison =
        compute_comparison(&observations, selection.primary(), cutoff, reference_longevity)?;
    let diagnostic = decline_diagnostic(&comparison, config.decline_threshold);

    // 5) The longevity term separates selective disappearance from ageing.
    let adjusted = match selection.get(ModelKind::Longevity) {
        Some(fit) => {
            let rows = compute_comparison(&observations, fit, cutoff, reference_longevity)?;
            let decline = decline_diagnostic(&rows, config.decline_threshold);
            Some(AdjustedCurve {
                model: ModelKind::Longevity,
                longevity: reference_longevity,
                rows,
                decline,
            })
        }
        None => None,
    };

    let stats = PopulationStats::compute(&config.lifespan, &individuals, &observations);

    Ok(ScenarioRun {
        scenario,
        individuals,
        observations,
        stats,
        selection,
        comparison,
        diagnostic,
        adjusted,
        cutoff,
        reference_longevity,
    })
}

/// Per-age averages across replicates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicateAge {
    pub age: u32,
    /// Replicates that observed this age.
    pub runs: usize,
    pub mean_true: f64,
    pub mean_fitted: f64,
}

/// Summary of a replicate study.
#[derive(Debug, Clone)]
pub struct ReplicateSummary {
    pub scenario: Scenario,
    pub replicates: usize,
    pub first_seed: u64,
    /// Replicates whose primary fit showed a spurious decline.
    pub spurious: usize,
    /// Replicates whose longevity-adjusted fit still showed one (`None` when not fitted).
    pub adjusted_spurious: Option<usize>,
    pub mean_fitted_drop: f64,
    pub mean_true_drop: f64,
    pub by_age: Vec<ReplicateAge>,
}

impl ReplicateSummary {
    pub fn spurious_rate(&self) -> f64 {
        if self.replicates == 0 {
            0.0
        } else {
            self.spurious as f64 / self.replicates as f64
        }
    }
}

/// Repeat a scenario over `replicates` consecutive seeds starting at `config.seed`.
///
/// Replicates are independent (each owns its RNG) and run on the rayon pool.
pub fn run_replicates(
    scenario: Scenario,
    config: &RunConfig,
    replicates: usize,
) -> Result<ReplicateSummary, AppError> {
    if replicates == 0 {
        return Err(AppError::new(2, "Replicate count must be > 0."));
    }

    let runs: Vec<ReplicateOutcome> = (0..replicates)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(i as u64));
            run_scenario_with_rng(scenario, config, &mut rng).map(|run| ReplicateOutcome {
                comparison: run.comparison,
                diagnostic: run.diagnostic,
                adjusted: run.adjusted.map(|a| a.decline),
            })
        })
        .collect::<Result<Vec<_>, SimError>>()?;

    let summary = summarize_replicates(scenario, config.seed, &runs);
    info!(
        scenario = ?scenario,
        replicates,
        spurious = summary.spurious,
        "replicate study complete"
    );
    Ok(summary)
}

/// What a replicate contributes to the summary.
struct ReplicateOutcome {
    comparison: Vec<ComparisonRow>,
    diagnostic: Option<DeclineDiagnostic>,
    /// Decline check of the longevity-adjusted fit, if one was made.
    adjusted: Option<Option<DeclineDiagnostic>>,
}

fn summarize_replicates(
    scenario: Scenario,
    first_seed: u64,
    runs: &[ReplicateOutcome],
) -> ReplicateSummary {
    let diagnostics: Vec<&DeclineDiagnostic> =
        runs.iter().filter_map(|r| r.diagnostic.as_ref()).collect();
    let spurious = diagnostics.iter().filter(|d| d.spurious).count();
    let adjusted_spurious = if runs.iter().any(|r| r.adjusted.is_some()) {
        Some(
            runs.iter()
                .filter(|r| matches!(r.adjusted, Some(Some(d)) if d.spurious))
                .count(),
        )
    } else {
        None
    };
    let denom = diagnostics.len().max(1) as f64;
    let mean_fitted_drop = diagnostics.iter().map(|d| d.fitted_drop).sum::<f64>() / denom;
    let mean_true_drop = diagnostics.iter().map(|d| d.true_drop).sum::<f64>() / denom;

    let max_age = runs
        .iter()
        .flat_map(|r| r.comparison.iter().map(|c| c.age))
        .max()
        .unwrap_or(0);
    let min_age = runs
        .iter()
        .flat_map(|r| r.comparison.iter().map(|c| c.age))
        .min()
        .unwrap_or(0);

    let mut by_age = Vec::new();
    for age in min_age..=max_age {
        let mut n = 0usize;
        let mut true_sum = 0.0;
        let mut fitted_sum = 0.0;
        for run in runs {
            if let Some(r) = run.comparison.iter().find(|r| r.age == age) {
                n += 1;
                true_sum += r.true_prob;
                fitted_sum += r.fitted;
            }
        }
        if n > 0 {
            by_age.push(ReplicateAge {
                age,
                runs: n,
                mean_true: true_sum / n as f64,
                mean_fitted: fitted_sum / n as f64,
            });
        }
    }

    ReplicateSummary {
        scenario,
        replicates: runs.len(),
        first_seed,
        spurious,
        adjusted_spurious,
        mean_fitted_drop,
        mean_true_drop,
        by_age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_fit_invents_decline_in_age_only_scenario() {
        let config = RunConfig::default();
        let run = run_scenario(Scenario::AgeOnly, &config).unwrap();

        // True curve never declines...
        let d = run.diagnostic.unwrap();
        assert!(d.true_drop.abs() < 1e-12);
        // ...but the symmetric quadratic bends down after its peak.
        assert!(d.peak_age < d.last_age);
        assert!(d.fitted_drop > 0.0);
        assert_eq!(run.selection.fits.len(), 1);
        assert!(run.adjusted.is_none());
        assert!(run.observations.iter().all(|o| o.age_category.is_none()));
    }

    #[test]
    fn selective_scenario_pools_a_declining_truth() {
        let config = RunConfig::default();
        let run = run_scenario(Scenario::SelectiveDisappearance, &config).unwrap();

        assert_eq!(run.cutoff, Some(10));
        assert_eq!(run.selection.fits.len(), 2);
        // Long-lived individuals plateau lower, so the pooled mean drops.
        let d = run.diagnostic.unwrap();
        assert!(d.true_drop > 0.0);
        assert!(run.reference_longevity > 3.0);
    }

    #[test]
    fn longevity_adjustment_shrinks_the_decline() {
        let config = RunConfig::default();
        let run = run_scenario(Scenario::SelectiveDisappearance, &config).unwrap();

        let primary = run.diagnostic.unwrap();
        let adjusted = run.adjusted.as_ref().unwrap();
        assert_eq!(adjusted.model, ModelKind::Longevity);
        assert_eq!(adjusted.longevity, run.reference_longevity);
        assert_eq!(adjusted.rows.len(), run.comparison.len());

        let d = adjusted.decline.unwrap();
        assert!(
            d.fitted_drop < primary.fitted_drop,
            "adjusted drop {} vs primary {}",
            d.fitted_drop,
            primary.fitted_drop
        );
        // Observed and true columns do not depend on the model.
        for (a, p) in adjusted.rows.iter().zip(&run.comparison) {
            assert_eq!(
                (a.age, a.n, a.observed, a.true_prob),
                (p.age, p.n, p.observed, p.true_prob)
            );
        }
    }

    #[test]
    fn same_seed_reproduces_the_run() {
        let config = RunConfig::default();
        let a = run_scenario(Scenario::SelectiveDisappearance, &config).unwrap();
        let b = run_scenario(Scenario::SelectiveDisappearance, &config).unwrap();
        assert_eq!(a.observations, b.observations);
        assert_eq!(a.comparison, b.comparison);
    }

    #[test]
    fn replicates_are_summarized() {
        let mut config = RunConfig::default();
        config.lifespan.population = 300;
        let summary = run_replicates(Scenario::AgeOnly, &config, 4).unwrap();
        assert_eq!(summary.replicates, 4);
        assert!(summary.spurious <= 4);
        assert!(!summary.by_age.is_empty());
        assert_eq!(summary.by_age[0].age, 3);
        assert!(summary.by_age.iter().all(|a| a.runs >= 1 && a.runs <= 4));
        assert!(summary.adjusted_spurious.is_none());

        let selective = run_replicates(Scenario::SelectiveDisappearance, &config, 3).unwrap();
        assert!(selective.adjusted_spurious.is_some_and(|n| n <= 3));
        assert!(run_replicates(Scenario::AgeOnly, &config, 0).is_err());
    }

    #[test]
    fn empty_population_surfaces_as_exit_code_3() {
        let mut config = RunConfig::default();
        config.lifespan.survival = 0.01;
        config.lifespan.min_age = 50;
        config.lifespan.max_age = 60;
        let err = run_scenario(Scenario::AgeOnly, &config).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
