//! Charts of observed vs true vs fitted reproduction.
//!
//! - `ascii`: fixed-size terminal chart
//! - `svg`: standalone SVG file via Plotters

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
