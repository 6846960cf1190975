//! `senescence-sim` library crate.
//!
//! The binary (`senesce`) is a thin wrapper around this library so that:
//!
//! - the simulators and the GLM fitter are testable without spawning processes
//! - replicate studies can drive the pipeline directly
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
