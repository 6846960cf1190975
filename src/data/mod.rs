//! Synthetic population generation.
//!
//! - `lifespan`: truncated geometric lifespans
//! - `simulate`: per-year reproduction histories (age-only and trade-off variants)

pub mod lifespan;
pub mod simulate;

pub use lifespan::*;
pub use simulate::*;
