//! Read/write comparison JSON files.
//!
//! A comparison file is the portable record of one scenario run:
//! - the scenario and the parameters that produced it
//! - every fitted model's coefficients and diagnostics
//! - the per-age observed/true/fitted table and the decline verdict
//! - the longevity-adjusted table, when the scenario fits that model
//!
//! `senesce show` re-renders a saved file without re-running the simulation.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::pipeline::ScenarioRun;
use crate::domain::{
    AdjustedCurve, AgeCurve, ComparisonRow, DeclineDiagnostic, GlmSummary, LifespanConfig,
    RunConfig, Scenario, TradeoffCurve,
};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonFile {
    pub tool: String,
    pub scenario: Scenario,
    pub seed: u64,
    pub lifespan: LifespanConfig,
    /// Present for the age-only scenario.
    pub age_curve: Option<AgeCurve>,
    /// Present for the selective-disappearance scenario.
    pub tradeoff: Option<TradeoffCurve>,
    pub individuals: usize,
    pub observations: usize,
    pub reference_longevity: f64,
    pub decline_threshold: f64,
    pub models: Vec<GlmSummary>,
    pub rows: Vec<ComparisonRow>,
    pub decline: Option<DeclineDiagnostic>,
    #[serde(default)]
    pub adjusted: Option<AdjustedCurve>,
}

impl ComparisonFile {
    pub fn from_run(run: &ScenarioRun, config: &RunConfig) -> Self {
        let (age_curve, tradeoff) = match run.scenario {
            Scenario::AgeOnly => (Some(config.age_curve), None),
            Scenario::SelectiveDisappearance => (None, Some(config.tradeoff)),
        };
        Self {
            tool: "senesce".to_string(),
            scenario: run.scenario,
            seed: config.seed,
            lifespan: config.lifespan,
            age_curve,
            tradeoff,
            individuals: run.individuals.len(),
            observations: run.observations.len(),
            reference_longevity: run.reference_longevity,
            decline_threshold: config.decline_threshold,
            models: run.selection.fits.iter().map(|f| f.summary.clone()).collect(),
            rows: run.comparison.clone(),
            decline: run.diagnostic,
            adjusted: run.adjusted.clone(),
        }
    }
}

/// Write a comparison JSON file.
pub fn write_comparison_json(
    path: &Path,
    run: &ScenarioRun,
    config: &RunConfig,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create comparison JSON '{}': {e}", path.display()),
        )
    })?;

    serde_json::to_writer_pretty(file, &ComparisonFile::from_run(run, config))
        .map_err(|e| AppError::new(2, format!("Failed to write comparison JSON: {e}")))?;

    info!(path = %path.display(), "wrote comparison JSON");
    Ok(())
}

/// Read a comparison JSON file.
pub fn read_comparison_json(path: &Path) -> Result<ComparisonFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open comparison JSON '{}': {e}", path.display()),
        )
    })?;
    let parsed: ComparisonFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid comparison JSON: {e}")))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_scenario;

    #[test]
    fn written_file_reads_back() {
        let mut config = RunConfig::default();
        config.lifespan.population = 400;
        let run = run_scenario(Scenario::SelectiveDisappearance, &config).unwrap();

        let path = std::env::temp_dir().join(format!("senesce_cmp_{}.json", std::process::id()));
        write_comparison_json(&path, &run, &config).unwrap();
        let back = read_comparison_json(&path).unwrap();

        assert_eq!(back.scenario, Scenario::SelectiveDisappearance);
        assert_eq!(back.seed, 42);
        assert!(back.age_curve.is_none());
        assert_eq!(back.tradeoff, Some(config.tradeoff));
        assert_eq!(back.models.len(), 2);
        assert_eq!(back.rows.len(), run.comparison.len());
        assert_eq!(back.observations, run.observations.len());
        let (saved, live) = (back.adjusted.unwrap(), run.adjusted.clone().unwrap());
        assert_eq!(saved.model, live.model);
        assert_eq!(saved.rows.len(), live.rows.len());
        assert_eq!(
            saved.decline.map(|d| d.spurious),
            live.decline.map(|d| d.spurious)
        );
        assert_eq!(back.decline_threshold, 0.05);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn garbage_is_rejected() {
        let path = std::env::temp_dir().join(format!("senesce_bad_{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_comparison_json(&path).unwrap_err().exit_code(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
