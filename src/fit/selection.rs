//! Fitting a scenario's candidate models.
//!
//! The first model in the list is the *primary* one: the mis-specified model
//! the scenario is about, whose fitted curve is compared against the truth.
//! Additional models are fitted alongside for diagnostics and the lowest-AIC
//! fit is flagged.

use crate::domain::{ModelKind, YearlyObservation};
use crate::error::SimError;
use crate::fit::glm::{GlmFit, GlmOptions, fit_logistic};

/// Output of fitting all candidate models.
#[derive(Debug, Clone)]
pub struct FitSelection {
    /// Fits in the order they were requested; `fits[0]` is the primary model.
    pub fits: Vec<GlmFit>,
    /// Index into `fits` of the lowest AIC.
    pub best_aic: usize,
}

impl FitSelection {
    pub fn primary(&self) -> &GlmFit {
        &self.fits[0]
    }

    pub fn get(&self, model: ModelKind) -> Option<&GlmFit> {
        self.fits.iter().find(|f| f.model() == model)
    }
}

/// Fit every model in `models` to the same observations.
pub fn fit_models(
    models: &[ModelKind],
    observations: &[YearlyObservation],
    opts: &GlmOptions,
) -> Result<FitSelection, SimError> {
    if models.is_empty() {
        return Err(SimError::invalid("no models requested"));
    }

    let fits = models
        .iter()
        .map(|&m| fit_logistic(m, observations, opts))
        .collect::<Result<Vec<_>, _>>()?;

    // Deterministic: minimum AIC, ties go to the earlier model.
    let mut best_aic = 0;
    for (i, f) in fits.iter().enumerate().skip(1) {
        if f.summary.aic < fits[best_aic].summary.aic {
            best_aic = i;
        }
    }

    Ok(FitSelection { fits, best_aic })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_lifespans, simulate_selective};
    use crate::domain::{LifespanConfig, TradeoffCurve};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn longevity_term_improves_selective_fit() {
        let mut rng = StdRng::seed_from_u64(42);
        let pop = sample_lifespans(&mut rng, &LifespanConfig::default()).unwrap();
        let obs = simulate_selective(&mut rng, &pop, &TradeoffCurve::default()).unwrap();

        let sel = fit_models(
            &[ModelKind::Interaction, ModelKind::Longevity],
            &obs,
            &GlmOptions::default(),
        )
        .unwrap();
        assert_eq!(sel.primary().model(), ModelKind::Interaction);
        assert!(sel.get(ModelKind::Longevity).is_some());

        // Nested models: adding a covariate never increases deviance.
        let d0 = sel.fits[0].summary.deviance;
        let d1 = sel.fits[1].summary.deviance;
        assert!(d1 <= d0 + 1e-6);
    }

    #[test]
    fn no_models_is_an_error() {
        assert!(fit_models(&[], &[], &GlmOptions::default()).is_err());
    }
}
