//! Numerical building blocks: clamped piecewise-linear curves and weighted
//! least squares.

pub mod interp;
pub mod ols;

pub use interp::*;
pub use ols::*;
