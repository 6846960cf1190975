//! Reproductive-history simulators.
//!
//! Both variants emit one [`YearlyObservation`] per age in `[3, longevity]`
//! for every individual, in individual order then age order. Each individual's
//! history is a lazy per-year sequence; the population table is their
//! concatenation.
//!
//! - [`simulate_age_only`]: `repro_prob` depends on age alone.
//! - [`simulate_selective`]: the plateau depends on longevity, so long-lived
//!   individuals settle lower. No individual ever declines, yet the pooled
//!   table does at old ages.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Bernoulli;
use tracing::debug;

use crate::domain::{
    AgeCategory, AgeCurve, FIRST_BREEDING_AGE, Individual, TradeoffCurve, YearlyObservation,
};
use crate::error::SimError;
use crate::math::PiecewiseLinear;

fn check_probability(name: &str, p: f64) -> Result<(), SimError> {
    if p > 0.0 && p < 1.0 {
        Ok(())
    } else {
        Err(SimError::invalid(format!("{name} must be in (0, 1), got {p}")))
    }
}

impl AgeCurve {
    pub fn validate(&self) -> Result<(), SimError> {
        check_probability("prob_min", self.prob_min)?;
        check_probability("prob_plateau", self.prob_plateau)?;
        if !(self.age_at_min <= self.age_at_plateau) {
            return Err(SimError::invalid(format!(
                "age_at_min ({}) must not exceed age_at_plateau ({})",
                self.age_at_min, self.age_at_plateau
            )));
        }
        Ok(())
    }

    /// The clamped curve through `(age_at_min, prob_min)` and
    /// `(age_at_plateau, prob_plateau)`.
    pub fn curve(&self) -> Result<PiecewiseLinear, SimError> {
        self.validate()?;
        PiecewiseLinear::between(
            (self.age_at_min, self.prob_min),
            (self.age_at_plateau, self.prob_plateau),
        )
    }
}

impl TradeoffCurve {
    pub fn validate(&self) -> Result<(), SimError> {
        check_probability("prob_age3", self.prob_age3)?;
        check_probability("plateau_long1", self.plateau_long1)?;
        check_probability("plateau_long2", self.plateau_long2)?;
        if !(self.plateau_age1 >= f64::from(FIRST_BREEDING_AGE)) {
            return Err(SimError::invalid(format!(
                "plateau_age1 ({}) must be at least {FIRST_BREEDING_AGE}",
                self.plateau_age1
            )));
        }
        if !(self.plateau_age1 <= self.plateau_age2) {
            return Err(SimError::invalid(format!(
                "plateau_age1 ({}) must not exceed plateau_age2 ({})",
                self.plateau_age1, self.plateau_age2
            )));
        }
        Ok(())
    }

    /// Longevity-to-plateau curve.
    pub fn plateau_curve(&self) -> Result<PiecewiseLinear, SimError> {
        self.validate()?;
        PiecewiseLinear::between(
            (self.plateau_age1, self.plateau_long1),
            (self.plateau_age2, self.plateau_long2),
        )
    }

    /// Age curve for one individual, given its plateau.
    fn individual_curve(&self, plateau: f64) -> Result<PiecewiseLinear, SimError> {
        PiecewiseLinear::between(
            (f64::from(FIRST_BREEDING_AGE), self.prob_age3),
            (self.plateau_age1, plateau),
        )
    }

    /// Plateau probability for an individual of the given longevity.
    pub fn plateau(&self, longevity: u32) -> Result<f64, SimError> {
        Ok(self.plateau_curve()?.eval(f64::from(longevity)))
    }

    /// `repro_prob` at `age` for an individual of the given longevity.
    pub fn repro_prob(&self, age: u32, longevity: u32) -> Result<f64, SimError> {
        let plateau = self.plateau(longevity)?;
        Ok(self.individual_curve(plateau)?.eval(f64::from(age)))
    }
}

/// Lazy yearly history of one individual.
fn yearly_history<'a>(
    rng: &'a mut StdRng,
    individual: Individual,
    curve: &'a PiecewiseLinear,
    prime_age_cutoff: Option<u32>,
) -> impl Iterator<Item = Result<YearlyObservation, SimError>> + 'a {
    (FIRST_BREEDING_AGE..=individual.longevity).map(move |age| {
        let repro_prob = curve.eval(f64::from(age));
        let draw = Bernoulli::new(repro_prob)
            .map_err(|e| SimError::invalid(format!("repro_prob {repro_prob} at age {age}: {e}")))?;
        Ok(YearlyObservation {
            individual: individual.id,
            age,
            longevity: individual.longevity,
            age_category: prime_age_cutoff.map(|cutoff| AgeCategory::classify(age, cutoff)),
            repro_prob,
            repro: draw.sample(&mut *rng),
        })
    })
}

/// Scenario A: reproduction depends on age only.
pub fn simulate_age_only(
    rng: &mut StdRng,
    individuals: &[Individual],
    curve: &AgeCurve,
) -> Result<Vec<YearlyObservation>, SimError> {
    let curve = curve.curve()?;

    let mut out = Vec::with_capacity(expected_rows(individuals));
    for &ind in individuals {
        for obs in yearly_history(rng, ind, &curve, None) {
            out.push(obs?);
        }
    }

    debug!(individuals = individuals.len(), rows = out.len(), "simulated age-only histories");
    Ok(out)
}

/// Scenario B: age effect plus a longevity/reproduction trade-off.
pub fn simulate_selective(
    rng: &mut StdRng,
    individuals: &[Individual],
    curve: &TradeoffCurve,
) -> Result<Vec<YearlyObservation>, SimError> {
    let plateau_curve = curve.plateau_curve()?;

    let mut out = Vec::with_capacity(expected_rows(individuals));
    for &ind in individuals {
        let plateau = plateau_curve.eval(f64::from(ind.longevity));
        let own_curve = curve.individual_curve(plateau)?;
        for obs in yearly_history(rng, ind, &own_curve, Some(curve.prime_age_cutoff)) {
            out.push(obs?);
        }
    }

    debug!(
        individuals = individuals.len(),
        rows = out.len(),
        "simulated selective-disappearance histories"
    );
    Ok(out)
}

fn expected_rows(individuals: &[Individual]) -> usize {
    individuals
        .iter()
        .map(|i| i.longevity.saturating_sub(FIRST_BREEDING_AGE - 1) as usize)
        .sum()
}
