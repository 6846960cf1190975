//! Model fitting.
//!
//! Responsibilities:
//!
//! - fit binomial-logit GLMs by IRLS (`glm`)
//! - fit a scenario's candidate models and mark the best by AIC (`selection`)

pub mod glm;
pub mod selection;

pub use glm::*;
pub use selection::*;
