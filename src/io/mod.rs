//! Input/output helpers.
//!
//! - observation table CSV export (`export`)
//! - comparison JSON write/read (`comparison`)

pub mod comparison;
pub mod export;

pub use comparison::*;
pub use export::*;
