//! Binomial-logit model definitions.
//!
//! Models are implemented as small, pure functions so that the IRLS fitter
//! can stay generic.

pub mod model;

pub use model::*;
