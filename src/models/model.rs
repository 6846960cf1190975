//! Design rows and linear predictors for each [`ModelKind`].
//!
//! The fitter relies on two primitive operations:
//! - build a design row for one observation (for IRLS)
//! - evaluate the linear predictor given coefficients (for fitted curves)

use crate::domain::{AgeCategory, ModelKind, YearlyObservation};
use crate::error::SimError;

/// Covariates entering a design row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Covariates {
    pub age: f64,
    pub senescent: bool,
    pub longevity: f64,
}

impl Covariates {
    /// Covariates of a simulated record.
    ///
    /// Fails when the model needs an age category and the record has none
    /// (age-only data fed to the interaction model).
    pub fn from_observation(model: ModelKind, obs: &YearlyObservation) -> Result<Self, SimError> {
        let senescent = match obs.age_category {
            Some(cat) => cat.is_senescent(),
            None if model.needs_category() => {
                return Err(SimError::invalid(format!(
                    "model `{}` needs age categories but observation at age {} has none",
                    model.display_name(),
                    obs.age
                )));
            }
            None => false,
        };
        Ok(Self {
            age: f64::from(obs.age),
            senescent,
            longevity: f64::from(obs.longevity),
        })
    }

    /// Covariates for a prediction at `age`.
    ///
    /// `cutoff` derives the age category; `longevity` is the value held fixed
    /// for the longevity-adjusted model.
    pub fn at_age(age: u32, cutoff: Option<u32>, longevity: f64) -> Self {
        Self {
            age: f64::from(age),
            senescent: cutoff
                .map(|c| AgeCategory::classify(age, c).is_senescent())
                .unwrap_or(false),
            longevity,
        }
    }
}

/// Fill a design row for the given model kind.
///
/// The row includes the constant term first (intercept).
///
/// # Panics
/// Panics if `out` does not have length `model.coef_len()`.
pub fn fill_design_row(model: ModelKind, x: &Covariates, out: &mut [f64]) {
    let sen = if x.senescent { 1.0 } else { 0.0 };
    match model {
        ModelKind::Quadratic => {
            out[0] = 1.0;
            out[1] = x.age;
            out[2] = x.age * x.age;
        }
        ModelKind::Interaction => {
            out[0] = 1.0;
            out[1] = x.age;
            out[2] = sen;
            out[3] = x.age * sen;
        }
        ModelKind::Longevity => {
            out[0] = 1.0;
            out[1] = x.age;
            out[2] = sen;
            out[3] = x.age * sen;
            out[4] = x.longevity;
        }
    }
}

/// Linear predictor `x^T β` (logit scale).
pub fn linear_predictor(model: ModelKind, x: &Covariates, coefs: &[f64]) -> f64 {
    let mut row = vec![0.0; model.coef_len()];
    fill_design_row(model, x, &mut row);
    row.iter().zip(coefs).map(|(a, b)| a * b).sum()
}

/// Numerically stable logistic function.
pub fn inv_logit(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let exp_x = x.exp();
        exp_x / (1.0 + exp_x)
    }
}

pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_row_switches_on_after_cutoff() {
        let mut row = [0.0; 4];
        fill_design_row(ModelKind::Interaction, &Covariates::at_age(12, Some(10), 0.0), &mut row);
        assert_eq!(row, [1.0, 12.0, 1.0, 12.0]);
        fill_design_row(ModelKind::Interaction, &Covariates::at_age(10, Some(10), 0.0), &mut row);
        assert_eq!(row, [1.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn quadratic_predictor() {
        let x = Covariates::at_age(4, None, 0.0);
        let eta = linear_predictor(ModelKind::Quadratic, &x, &[1.0, 0.5, -0.25]);
        assert!((eta - (1.0 + 2.0 - 4.0)).abs() < 1e-12);
    }

    #[test]
    fn logistic_helpers_round_trip() {
        for p in [0.01, 0.3, 0.5, 0.9] {
            assert!((inv_logit(logit(p)) - p).abs() < 1e-12);
        }
        assert!(inv_logit(-800.0) >= 0.0);
        assert!(inv_logit(800.0) <= 1.0);
    }

    #[test]
    fn category_required_for_interaction() {
        let obs = YearlyObservation {
            individual: 0,
            age: 5,
            longevity: 9,
            age_category: None,
            repro_prob: 0.5,
            repro: true,
        };
        assert!(Covariates::from_observation(ModelKind::Interaction, &obs).is_err());
        let x = Covariates::from_observation(ModelKind::Quadratic, &obs).unwrap();
        assert_eq!(x.age, 5.0);
    }
}
