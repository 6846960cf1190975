//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - simulation parameters (`LifespanConfig`, `AgeCurve`, `TradeoffCurve`)
//! - simulated records (`Individual`, `YearlyObservation`)
//! - fit outputs (`GlmSummary`, `ComparisonRow`, `DeclineDiagnostic`)

pub mod types;

pub use types::*;
