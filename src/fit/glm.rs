//! Binomial-logit GLM fitted by iteratively reweighted least squares.
//!
//! Each IRLS step solves
//!
//! ```text
//! minimize Σ w_i (z_i - x_i^T β)^2,   w_i = μ_i (1 - μ_i),   z_i = η_i + (y_i - μ_i) / w_i
//! ```
//!
//! with the SVD least-squares solver from `math::ols`. Convergence follows the
//! usual GLM rule: relative deviance change below `tol`, at most `max_iter`
//! steps. Standard errors come from `(Xᵀ W X)⁻¹` at the final iterate.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::domain::{GlmSummary, ModelKind, YearlyObservation};
use crate::error::SimError;
use crate::math::solve_weighted_least_squares;
use crate::models::{Covariates, fill_design_row, inv_logit, linear_predictor, logit};

/// Fitted means are kept this far away from 0 and 1.
const MU_EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
pub struct GlmOptions {
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for GlmOptions {
    fn default() -> Self {
        Self {
            max_iter: 25,
            tol: 1e-8,
        }
    }
}

/// A fitted model: summary plus the coefficient covariance.
#[derive(Debug, Clone)]
pub struct GlmFit {
    pub summary: GlmSummary,
    pub covariance: DMatrix<f64>,
}

impl GlmFit {
    pub fn model(&self) -> ModelKind {
        self.summary.model
    }

    /// Fitted probability.
    pub fn predict(&self, x: &Covariates) -> f64 {
        inv_logit(linear_predictor(self.summary.model, x, &self.summary.coefficients))
    }

    /// Fitted probability with a Wald band built on the logit scale.
    ///
    /// Returns `(fit, lo, hi)`; `z` is the normal quantile (1.96 for 95%).
    pub fn predict_interval(&self, x: &Covariates, z: f64) -> (f64, f64, f64) {
        let model = self.summary.model;
        let mut row = vec![0.0; model.coef_len()];
        fill_design_row(model, x, &mut row);
        let r = DVector::from_vec(row);

        let eta = r.dot(&DVector::from_column_slice(&self.summary.coefficients));
        let var = (r.transpose() * &self.covariance * &r)[(0, 0)].max(0.0);
        let half = z * var.sqrt();

        (inv_logit(eta), inv_logit(eta - half), inv_logit(eta + half))
    }
}

/// Fit a binomial-logit model to the simulated records.
pub fn fit_logistic(
    model: ModelKind,
    observations: &[YearlyObservation],
    opts: &GlmOptions,
) -> Result<GlmFit, SimError> {
    if observations.is_empty() {
        return Err(SimError::EmptyPopulation);
    }

    let n = observations.len();
    let p = model.coef_len();
    if n <= p {
        return Err(SimError::FitFailed(format!(
            "{n} observations are not enough for {p} coefficients"
        )));
    }

    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];
    for (i, obs) in observations.iter().enumerate() {
        let cov = Covariates::from_observation(model, obs)?;
        fill_design_row(model, &cov, &mut row);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
    }
    let y = DVector::from_iterator(
        n,
        observations.iter().map(|o| if o.repro { 1.0 } else { 0.0 }),
    );

    // e.g. no age above the cutoff: the senescent terms cannot be estimated.
    let aliased: Vec<String> = (0..p)
        .filter(|&j| x.column(j).iter().all(|v| *v == 0.0))
        .map(|j| model.coef_names()[j].to_string())
        .collect();
    if !aliased.is_empty() {
        warn!(
            model = model.display_name(),
            aliased = ?aliased,
            "design columns are all zero; their coefficients are fixed at 0"
        );
    }

    // Standard binomial start: μ = (y + 0.5) / 2.
    let mut mu = y.map(|v| (v + 0.5) / 2.0);
    let mut eta = mu.map(logit);
    let mut dev = deviance(&y, &mu);
    let mut beta = DVector::<f64>::zeros(p);
    let mut converged = false;
    let mut iterations = 0;

    for iter in 1..=opts.max_iter {
        iterations = iter;

        let w = mu.map(|m| m * (1.0 - m));
        let z = DVector::from_iterator(n, (0..n).map(|i| eta[i] + (y[i] - mu[i]) / w[i]));

        beta = solve_weighted_least_squares(&x, &z, &w).ok_or_else(|| {
            SimError::FitFailed(format!(
                "weighted least squares step {iter} is singular for `{}`",
                model.display_name()
            ))
        })?;

        eta = &x * &beta;
        mu = eta.map(|e| inv_logit(e).clamp(MU_EPS, 1.0 - MU_EPS));

        let dev_new = deviance(&y, &mu);
        if !dev_new.is_finite() {
            return Err(SimError::FitFailed("deviance became non-finite".to_string()));
        }
        let change = (dev_new - dev).abs() / (dev_new.abs() + 0.1);
        dev = dev_new;
        if change < opts.tol {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            model = model.display_name(),
            iterations, "IRLS did not converge; estimates may be unreliable"
        );
    }

    let w = mu.map(|m| m * (1.0 - m));
    let mut xtwx = DMatrix::<f64>::zeros(p, p);
    for i in 0..n {
        let xi = x.row(i);
        xtwx += w[i] * xi.transpose() * xi;
    }
    let covariance = xtwx
        .pseudo_inverse(1e-12)
        .map_err(|e| SimError::FitFailed(format!("information matrix: {e}")))?;

    let std_errors: Vec<f64> = (0..p).map(|j| covariance[(j, j)].max(0.0).sqrt()).collect();
    let coefficients: Vec<f64> = beta.iter().copied().collect();
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(SimError::FitFailed("non-finite coefficients".to_string()));
    }

    let y_bar = y.mean();
    let null_mu = DVector::from_element(n, y_bar.clamp(MU_EPS, 1.0 - MU_EPS));
    let null_deviance = deviance(&y, &null_mu);

    debug!(
        model = model.display_name(),
        n,
        iterations,
        converged,
        deviance = dev,
        "fitted logistic model"
    );

    Ok(GlmFit {
        summary: GlmSummary {
            model,
            coefficients,
            std_errors,
            deviance: dev,
            null_deviance,
            aic: dev + 2.0 * p as f64,
            iterations,
            converged,
            n,
            aliased,
        },
        covariance,
    })
}

/// Binomial deviance for 0/1 outcomes: `-2 Σ [y ln μ + (1 - y) ln(1 - μ)]`.
fn deviance(y: &DVector<f64>, mu: &DVector<f64>) -> f64 {
    let ll: f64 = y
        .iter()
        .zip(mu.iter())
        .map(|(&yi, &mi)| if yi > 0.5 { mi.ln() } else { (1.0 - mi).ln() })
        .sum();
    -2.0 * ll
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AgeCategory;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn obs(age: u32, repro: bool, category: Option<AgeCategory>) -> YearlyObservation {
        YearlyObservation {
            individual: 0,
            age,
            longevity: 20,
            age_category: category,
            repro_prob: 0.5,
            repro,
        }
    }

    /// `successes` out of `total` records at `age`.
    fn group(
        age: u32,
        successes: usize,
        total: usize,
        cutoff: Option<u32>,
    ) -> Vec<YearlyObservation> {
        let cat = cutoff.map(|c| AgeCategory::classify(age, c));
        (0..total).map(|k| obs(age, k < successes, cat)).collect()
    }

    #[test]
    fn saturated_quadratic_reproduces_group_proportions() {
        // Three ages and three coefficients: fitted values equal observed shares.
        let mut data = group(3, 2, 10, None);
        data.extend(group(4, 5, 10, None));
        data.extend(group(5, 6, 10, None));

        let fit = fit_logistic(ModelKind::Quadratic, &data, &GlmOptions::default()).unwrap();
        assert!(fit.summary.converged);
        for (age, share) in [(3, 0.2), (4, 0.5), (5, 0.6)] {
            let p = fit.predict(&Covariates::at_age(age, None, 0.0));
            assert!((p - share).abs() < 1e-6, "age {age}: {p} vs {share}");
        }
    }

    #[test]
    fn saturated_interaction_reproduces_group_proportions() {
        let cutoff = Some(4);
        let mut data = group(3, 3, 10, cutoff);
        data.extend(group(4, 7, 10, cutoff));
        data.extend(group(5, 8, 10, cutoff));
        data.extend(group(6, 4, 10, cutoff));

        let fit = fit_logistic(ModelKind::Interaction, &data, &GlmOptions::default()).unwrap();
        for (age, share) in [(3, 0.3), (4, 0.7), (5, 0.8), (6, 0.4)] {
            let p = fit.predict(&Covariates::at_age(age, cutoff, 0.0));
            assert!((p - share).abs() < 1e-6, "age {age}: {p} vs {share}");
        }
        assert!(fit.summary.deviance < fit.summary.null_deviance);
    }

    #[test]
    fn recovers_known_coefficients() {
        let truth = [-2.0, 0.5, -0.02];
        let mut rng = StdRng::seed_from_u64(2024);
        let mut data = Vec::new();
        for age in 3..=20u32 {
            let x = Covariates::at_age(age, None, 0.0);
            let p = inv_logit(linear_predictor(ModelKind::Quadratic, &x, &truth));
            for _ in 0..3000 {
                data.push(obs(age, rng.gen_bool(p), None));
            }
        }

        let fit = fit_logistic(ModelKind::Quadratic, &data, &GlmOptions::default()).unwrap();
        assert!(fit.summary.converged);
        for j in 0..3 {
            let est = fit.summary.coefficients[j];
            let se = fit.summary.std_errors[j];
            assert!(
                (est - truth[j]).abs() < 5.0 * se,
                "coef {j}: {est} vs {} (se {se})",
                truth[j]
            );
        }
    }

    #[test]
    fn interval_brackets_the_fit() {
        let mut data = group(3, 2, 10, None);
        data.extend(group(4, 5, 10, None));
        data.extend(group(5, 6, 10, None));
        data.extend(group(6, 8, 10, None));
        let fit = fit_logistic(ModelKind::Quadratic, &data, &GlmOptions::default()).unwrap();
        let (p, lo, hi) = fit.predict_interval(&Covariates::at_age(5, None, 0.0), 1.96);
        assert!(lo < p && p < hi);
        assert!(lo > 0.0 && hi < 1.0);
    }

    #[test]
    fn senescent_terms_are_aliased_without_old_ages() {
        // Every age is at or below the cutoff, so the senescent columns are empty.
        let cutoff = Some(10);
        let mut data = group(3, 3, 10, cutoff);
        data.extend(group(5, 6, 10, cutoff));
        data.extend(group(8, 8, 10, cutoff));

        let fit = fit_logistic(ModelKind::Interaction, &data, &GlmOptions::default()).unwrap();
        assert_eq!(fit.summary.aliased, vec!["senescent", "age:senescent"]);
        assert!(fit.summary.coefficients[2].abs() < 1e-8);
        assert!(fit.summary.coefficients[3].abs() < 1e-8);
        // The remaining terms still reproduce the data.
        let p = fit.predict(&Covariates::at_age(5, cutoff, 0.0));
        assert!((p - 0.6).abs() < 0.1, "{p}");

        let full = fit_logistic(ModelKind::Quadratic, &data, &GlmOptions::default()).unwrap();
        assert!(full.summary.aliased.is_empty());
    }

    #[test]
    fn empty_and_underdetermined_inputs_fail() {
        let err = fit_logistic(ModelKind::Quadratic, &[], &GlmOptions::default()).unwrap_err();
        assert_eq!(err, SimError::EmptyPopulation);

        let data = group(3, 1, 2, None);
        let err = fit_logistic(ModelKind::Quadratic, &data, &GlmOptions::default()).unwrap_err();
        assert!(matches!(err, SimError::FitFailed(_)));
    }
}
