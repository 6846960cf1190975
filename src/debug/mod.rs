//! Debug bundle writer for inspecting a scenario run end to end.
//!
//! The bundle is a markdown file under `debug/` holding the parameters, every
//! model's coefficients, the per-age table and the first individuals' histories.

use std::fmt::Write as _;
use std::fs::create_dir_all;
use std::path::PathBuf;

use chrono::Local;
use tracing::info;

use crate::app::pipeline::ScenarioRun;
use crate::domain::{RunConfig, Scenario};
use crate::error::AppError;

/// Individuals whose yearly histories are echoed in full.
const HISTORY_PREVIEW: usize = 5;

pub fn write_debug_bundle(run: &ScenarioRun, config: &RunConfig) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir).map_err(|e| AppError::new(2, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let tag = match run.scenario {
        Scenario::AgeOnly => "age",
        Scenario::SelectiveDisappearance => "selective",
    };
    let path = dir.join(format!("senesce_debug_{tag}_seed{}_{ts}.md", config.seed));

    let body = render_bundle(run, config)
        .map_err(|e| AppError::new(2, format!("Failed to render debug bundle: {e}")))?;
    std::fs::write(&path, body).map_err(|e| {
        AppError::new(2, format!("Failed to write debug file '{}': {e}", path.display()))
    })?;

    info!(path = %path.display(), "wrote debug bundle");
    Ok(path)
}

fn render_bundle(run: &ScenarioRun, config: &RunConfig) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let lifespan = &config.lifespan;

    writeln!(out, "# senesce debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;
    writeln!(out, "- scenario: {}", run.scenario.display_name())?;
    writeln!(out, "- seed: {}", config.seed)?;
    writeln!(
        out,
        "- lifespan: n={} survival={:.3} range=[{}, {}]",
        lifespan.population, lifespan.survival, lifespan.min_age, lifespan.max_age
    )?;
    match run.scenario {
        Scenario::AgeOnly => {
            let c = &config.age_curve;
            writeln!(
                out,
                "- age curve: ({:.2}, {:.3}) -> ({:.2}, {:.3})",
                c.age_at_min, c.prob_min, c.age_at_plateau, c.prob_plateau
            )?;
        }
        Scenario::SelectiveDisappearance => {
            let t = &config.tradeoff;
            writeln!(
                out,
                "- trade-off: prob_age3={:.3} plateau ({:.2}, {:.3}) -> ({:.2}, {:.3}) cutoff={}",
                t.prob_age3,
                t.plateau_age1,
                t.plateau_long1,
                t.plateau_age2,
                t.plateau_long2,
                t.prime_age_cutoff
            )?;
        }
    }
    writeln!(out, "- decline threshold: {:.3}", config.decline_threshold)?;
    writeln!(
        out,
        "- population: kept={} of {} rows={} mean longevity={:.3} reference longevity={:.3}",
        run.stats.kept,
        run.stats.drawn,
        run.stats.rows,
        run.stats.mean_longevity,
        run.reference_longevity
    )?;

    writeln!(out, "\n## Fits")?;
    writeln!(
        out,
        "| model | deviance | null | aic | iter | converged | coefficients | std errors | aliased |"
    )?;
    writeln!(out, "| - | - | - | - | - | - | - | - | - |")?;
    for fit in &run.selection.fits {
        let s = &fit.summary;
        writeln!(
            out,
            "| {} | {:.4} | {:.4} | {:.4} | {} | {} | {} | {} | {} |",
            s.model.display_name(),
            s.deviance,
            s.null_deviance,
            s.aic,
            s.iterations,
            s.converged,
            fmt_vec(&s.coefficients),
            fmt_vec(&s.std_errors),
            if s.aliased.is_empty() { "-".to_string() } else { s.aliased.join(", ") }
        )?;
    }

    writeln!(out, "\n## Per-age comparison")?;
    writeln!(out, "| age | n | observed | obs lo | obs hi | true | fitted | fit lo | fit hi |")?;
    writeln!(out, "| - | - | - | - | - | - | - | - | - |")?;
    for r in &run.comparison {
        writeln!(
            out,
            "| {} | {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} |",
            r.age,
            r.n,
            r.observed,
            r.observed_lo,
            r.observed_hi,
            r.true_prob,
            r.fitted,
            r.fitted_lo,
            r.fitted_hi
        )?;
    }

    if let Some(adjusted) = &run.adjusted {
        writeln!(
            out,
            "\n## Longevity-adjusted fit (longevity {:.3})",
            adjusted.longevity
        )?;
        writeln!(out, "| age | fitted | fit lo | fit hi |")?;
        writeln!(out, "| - | - | - | - |")?;
        for r in &adjusted.rows {
            writeln!(
                out,
                "| {} | {:.4} | {:.4} | {:.4} |",
                r.age, r.fitted, r.fitted_lo, r.fitted_hi
            )?;
        }
    }

    let declines = [
        ("primary", run.diagnostic.as_ref()),
        (
            "longevity-adjusted",
            run.adjusted.as_ref().and_then(|a| a.decline.as_ref()),
        ),
    ];
    if declines.iter().any(|(_, d)| d.is_some()) {
        writeln!(out, "\n## Decline")?;
    }
    for (label, d) in declines {
        let Some(d) = d else { continue };
        writeln!(
            out,
            "{label}: peak {:.4} at {} -> {:.4} at {} | fitted drop {:.4} \
             | true drop {:.4} | spurious={}",
            d.peak_fitted,
            d.peak_age,
            d.last_fitted,
            d.last_age,
            d.fitted_drop,
            d.true_drop,
            d.spurious
        )?;
    }

    writeln!(out, "\n## Histories (first {HISTORY_PREVIEW} individuals)")?;
    writeln!(out, "| individual | age | longevity | category | repro_prob | repro |")?;
    writeln!(out, "| - | - | - | - | - | - |")?;
    for o in run
        .observations
        .iter()
        .filter(|o| o.individual < HISTORY_PREVIEW)
    {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.4} | {} |",
            o.individual,
            o.age,
            o.longevity,
            o.age_category.map(|c| c.label()).unwrap_or("-"),
            o.repro_prob,
            u8::from(o.repro)
        )?;
    }

    Ok(out)
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
