//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between the simulators, the GLM fitter and the reports
//! - exported to CSV/JSON
//! - echoed back in debug bundles

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// First age at which reproduction is observed.
pub const FIRST_BREEDING_AGE: u32 = 3;

/// Lifespan sampler parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifespanConfig {
    /// Number of geometric draws before filtering.
    pub population: usize,
    /// Per-year survival probability, in (0, 1).
    pub survival: f64,
    /// Inclusive lower bound on retained lifespans.
    pub min_age: u32,
    /// Inclusive upper bound on retained lifespans.
    pub max_age: u32,
}

impl Default for LifespanConfig {
    fn default() -> Self {
        Self {
            population: 1000,
            survival: 0.8,
            min_age: 3,
            max_age: 20,
        }
    }
}

/// Scenario A: reproduction depends on age only.
///
/// `repro_prob` rises linearly from `(age_at_min, prob_min)` to
/// `(age_at_plateau, prob_plateau)` and is flat outside that window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeCurve {
    pub age_at_min: f64,
    pub age_at_plateau: f64,
    pub prob_min: f64,
    pub prob_plateau: f64,
}

impl Default for AgeCurve {
    fn default() -> Self {
        Self {
            age_at_min: 3.0,
            age_at_plateau: 7.0,
            prob_min: 0.5,
            prob_plateau: 0.9,
        }
    }
}

/// Scenario B: age effect plus a longevity/reproduction trade-off.
///
/// Each individual's plateau is interpolated over longevity between
/// `(plateau_age1, plateau_long1)` and `(plateau_age2, plateau_long2)`;
/// its age curve then rises from `(3, prob_age3)` to `(plateau_age1, plateau)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeoffCurve {
    pub prob_age3: f64,
    pub plateau_age1: f64,
    pub plateau_long1: f64,
    pub plateau_age2: f64,
    pub plateau_long2: f64,
    /// Ages strictly above this are tagged `Senescent`.
    pub prime_age_cutoff: u32,
}

impl Default for TradeoffCurve {
    fn default() -> Self {
        Self {
            prob_age3: 0.5,
            plateau_age1: 7.0,
            plateau_long1: 0.9,
            plateau_age2: 15.0,
            plateau_long2: 0.7,
            prime_age_cutoff: 10,
        }
    }
}

/// Age class used by the interaction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeCategory {
    #[serde(rename = "Pre-senescent")]
    PreSenescent,
    #[serde(rename = "Senescent")]
    Senescent,
}

impl AgeCategory {
    /// `Senescent` iff `age - cutoff > 0`.
    pub fn classify(age: u32, cutoff: u32) -> Self {
        if age > cutoff {
            AgeCategory::Senescent
        } else {
            AgeCategory::PreSenescent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeCategory::PreSenescent => "Pre-senescent",
            AgeCategory::Senescent => "Senescent",
        }
    }

    pub fn is_senescent(self) -> bool {
        self == AgeCategory::Senescent
    }
}

/// One sampled individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub id: usize,
    pub longevity: u32,
}

/// One (individual, age) record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyObservation {
    pub individual: usize,
    pub age: u32,
    pub longevity: u32,
    /// Only set by the selective-disappearance simulator.
    pub age_category: Option<AgeCategory>,
    pub repro_prob: f64,
    pub repro: bool,
}

/// Which simulation drives a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Scenario A: pure age effect, fitted with a quadratic.
    AgeOnly,
    /// Scenario B: age effect plus selective disappearance.
    SelectiveDisappearance,
}

impl Scenario {
    pub fn display_name(self) -> &'static str {
        match self {
            Scenario::AgeOnly => "Age only (polynomial symmetry bias)",
            Scenario::SelectiveDisappearance => "Selective disappearance",
        }
    }
}

/// Binomial-logit model formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `logit(p) = b0 + b1 age + b2 age²`
    Quadratic,
    /// `logit(p) = b0 + b1 age + b2 senescent + b3 age·senescent`
    Interaction,
    /// Interaction model plus a linear longevity term.
    Longevity,
}

impl ModelKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Quadratic => "repro ~ age + age^2",
            ModelKind::Interaction => "repro ~ age * age_category",
            ModelKind::Longevity => "repro ~ age * age_category + longevity",
        }
    }

    /// Number of coefficients (intercept included).
    pub fn coef_len(self) -> usize {
        match self {
            ModelKind::Quadratic => 3,
            ModelKind::Interaction => 4,
            ModelKind::Longevity => 5,
        }
    }

    pub fn coef_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Quadratic => &["(Intercept)", "age", "age^2"],
            ModelKind::Interaction => &["(Intercept)", "age", "senescent", "age:senescent"],
            ModelKind::Longevity => &[
                "(Intercept)",
                "age",
                "senescent",
                "age:senescent",
                "longevity",
            ],
        }
    }

    /// Whether the design needs an age category on every observation.
    pub fn needs_category(self) -> bool {
        !matches!(self, ModelKind::Quadratic)
    }
}

/// Fitted GLM parameters and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlmSummary {
    pub model: ModelKind,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub aic: f64,
    pub iterations: usize,
    pub converged: bool,
    pub n: usize,
    /// Coefficients whose design column is all zeros; they are reported as 0.
    #[serde(default)]
    pub aliased: Vec<String>,
}

/// Observed vs true vs fitted at one age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub age: u32,
    pub n: usize,
    pub observed: f64,
    pub observed_lo: f64,
    pub observed_hi: f64,
    pub true_prob: f64,
    pub fitted: f64,
    pub fitted_lo: f64,
    pub fitted_hi: f64,
}

/// Late-life drop of a fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeclineDiagnostic {
    pub peak_age: u32,
    pub peak_fitted: f64,
    pub last_age: u32,
    pub last_fitted: f64,
    /// `peak_fitted - last_fitted`.
    pub fitted_drop: f64,
    /// Same measure on the pooled true mean curve. Non-zero only through
    /// selective disappearance; no individual curve ever declines.
    pub true_drop: f64,
    /// Fitted drop exceeds the decline threshold.
    pub spurious: bool,
}

/// Per-age comparison for a model fitted alongside the primary one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedCurve {
    pub model: ModelKind,
    /// Longevity the predictions are held at.
    pub longevity: f64,
    pub rows: Vec<ComparisonRow>,
    pub decline: Option<DeclineDiagnostic>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub lifespan: LifespanConfig,
    pub age_curve: AgeCurve,
    pub tradeoff: TradeoffCurve,
    pub seed: u64,
    /// Minimum fitted drop that counts as "decline".
    pub decline_threshold: f64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_observations: Option<PathBuf>,
    pub export_comparison: Option<PathBuf>,
    pub svg: Option<PathBuf>,
    pub debug_bundle: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lifespan: LifespanConfig::default(),
            age_curve: AgeCurve::default(),
            tradeoff: TradeoffCurve::default(),
            seed: 42,
            decline_threshold: 0.05,
            plot: true,
            plot_width: 72,
            plot_height: 20,
            export_observations: None,
            export_comparison: None,
            svg: None,
            debug_bundle: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_category_threshold_is_strict() {
        assert_eq!(AgeCategory::classify(10, 10), AgeCategory::PreSenescent);
        assert_eq!(AgeCategory::classify(11, 10), AgeCategory::Senescent);
        assert_eq!(AgeCategory::classify(3, 10), AgeCategory::PreSenescent);
    }

    #[test]
    fn coef_names_match_lengths() {
        for kind in [ModelKind::Quadratic, ModelKind::Interaction, ModelKind::Longevity] {
            assert_eq!(kind.coef_names().len(), kind.coef_len());
        }
    }

    #[test]
    fn age_category_serializes_with_labels() {
        let json = serde_json::to_string(&AgeCategory::PreSenescent).unwrap();
        assert_eq!(json, "\"Pre-senescent\"");
    }
}
