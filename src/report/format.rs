//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the simulation/fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::{ReplicateSummary, ScenarioRun};
use crate::domain::{AdjustedCurve, ComparisonRow, DeclineDiagnostic, GlmSummary, RunConfig};
use crate::fit::FitSelection;
use crate::io::ComparisonFile;

/// Format the run summary (population stats + model diagnostics + decline check).
pub fn format_run_summary(run: &ScenarioRun, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== senesce - {} ===\n", run.scenario.display_name()));
    out.push_str(&format!("Seed: {}\n", config.seed));
    out.push_str(&format!(
        "Sampler: n={} | survival={:.3} | lifespan=[{}, {}]\n",
        config.lifespan.population,
        config.lifespan.survival,
        config.lifespan.min_age,
        config.lifespan.max_age,
    ));

    let expected = run
        .stats
        .expected_longevity
        .map(|m| format!("{m:.2}"))
        .unwrap_or_else(|| "n/a".to_string());
    out.push_str(&format!(
        "Population: kept={} of {} | mean longevity={:.2} (expected {expected}) \
         | rows={} | max age={}\n",
        run.stats.kept,
        run.stats.drawn,
        run.stats.mean_longevity,
        run.stats.rows,
        run.stats.max_age,
    ));

    out.push_str("\nModel diagnostics:\n");
    out.push_str(&format_selection(&run.selection));

    out.push_str(&format_declines(
        run.diagnostic.as_ref(),
        run.adjusted.as_ref(),
        config.decline_threshold,
    ));
    out.push('\n');

    out
}

fn format_selection(selection: &FitSelection) -> String {
    let summaries: Vec<&GlmSummary> = selection.fits.iter().map(|f| &f.summary).collect();
    format_models(&summaries, selection.best_aic)
}

fn format_models(summaries: &[&GlmSummary], best_aic: usize) -> String {
    let mut out = String::new();
    for (i, s) in summaries.iter().enumerate() {
        let chosen = if i == best_aic { "*" } else { " " };
        let role = if i == 0 { "primary" } else { "check" };
        out.push_str(&format!(
            "{chosen} {:<40} [{role}] deviance={:.3} null={:.3} AIC={:.3} iter={}{}\n",
            s.model.display_name(),
            s.deviance,
            s.null_deviance,
            s.aic,
            s.iterations,
            if s.converged { "" } else { " (not converged)" },
        ));
        for ((name, coef), se) in s
            .model
            .coef_names()
            .iter()
            .zip(&s.coefficients)
            .zip(&s.std_errors)
        {
            out.push_str(&format!("    {name:<14} {coef:>10.4}  (se {se:.4})\n"));
        }
        if !s.aliased.is_empty() {
            out.push_str(&format!(
                "    not estimable (all-zero column): {}\n",
                s.aliased.join(", ")
            ));
        }
    }
    out
}

fn format_declines(
    primary: Option<&DeclineDiagnostic>,
    adjusted: Option<&AdjustedCurve>,
    threshold: f64,
) -> String {
    let mut out = String::new();
    if let Some(d) = primary {
        out.push('\n');
        out.push_str(&format_decline("Decline", d, threshold));
    }
    if let Some(d) = adjusted.and_then(|a| a.decline.as_ref()) {
        out.push_str(&format_decline("Longevity-adjusted", d, threshold));
    }
    out
}

fn format_decline(label: &str, d: &DeclineDiagnostic, threshold: f64) -> String {
    let verdict = if d.spurious {
        format!("SPURIOUS DECLINE (drop > {threshold:.3}; no individual declines)")
    } else {
        "no decline beyond threshold".to_string()
    };
    format!(
        "{label}: fitted peak {:.3} at age {} -> {:.3} at age {} (drop {:.3}) \
         | pooled true drop {:.3}\n=> {verdict}\n",
        d.peak_fitted, d.peak_age, d.last_fitted, d.last_age, d.fitted_drop, d.true_drop,
    )
}

/// Format the per-age comparison table.
pub fn format_comparison(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>4} {:>6} {:>9} {:>15} {:>7} {:>8} {:>15}\n",
            "age", "n", "observed", "95% CI", "true", "fitted", "95% CI"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<4} {:-<6} {:-<9} {:-<15} {:-<7} {:-<8} {:-<15}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(&format!(
            "{:>4} {:>6} {:>9.3} {:>15} {:>7.3} {:>8.3} {:>15}\n",
            r.age,
            r.n,
            r.observed,
            fmt_interval(r.observed_lo, r.observed_hi),
            r.true_prob,
            r.fitted,
            fmt_interval(r.fitted_lo, r.fitted_hi),
        ));
    }

    out
}

/// Primary vs longevity-adjusted fitted curves, side by side.
pub fn format_adjusted_comparison(primary: &[ComparisonRow], adjusted: &AdjustedCurve) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} at longevity {:.2}:\n",
        adjusted.model.display_name(),
        adjusted.longevity
    ));
    out.push_str(
        format!(
            "{:>4} {:>7} {:>8} {:>9} {:>15}\n",
            "age", "true", "primary", "adjusted", "95% CI"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<4} {:-<7} {:-<8} {:-<9} {:-<15}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for (p, a) in primary.iter().zip(&adjusted.rows) {
        out.push_str(&format!(
            "{:>4} {:>7.3} {:>8.3} {:>9.3} {:>15}\n",
            a.age,
            a.true_prob,
            p.fitted,
            a.fitted,
            fmt_interval(a.fitted_lo, a.fitted_hi),
        ));
    }
    out
}

/// Format a saved comparison file (models, decline checks and tables).
pub fn format_saved_comparison(file: &ComparisonFile) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} - {} ===\n",
        file.tool,
        file.scenario.display_name()
    ));
    out.push_str(&format!(
        "Seed: {} | individuals={} | rows={} | reference longevity={:.2}\n",
        file.seed, file.individuals, file.observations, file.reference_longevity
    ));

    out.push_str("\nModel diagnostics:\n");
    let summaries: Vec<&GlmSummary> = file.models.iter().collect();
    let best_aic = summaries
        .iter()
        .enumerate()
        .fold(0, |best, (i, s)| if s.aic < summaries[best].aic { i } else { best });
    out.push_str(&format_models(&summaries, best_aic));

    out.push_str(&format_declines(
        file.decline.as_ref(),
        file.adjusted.as_ref(),
        file.decline_threshold,
    ));
    out.push('\n');
    out.push_str(&format_comparison(&file.rows));
    if let Some(adjusted) = &file.adjusted {
        out.push('\n');
        out.push_str(&format_adjusted_comparison(&file.rows, adjusted));
    }
    out
}

/// Format the replicate study summary.
pub fn format_replicate_summary(summary: &ReplicateSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== senesce replicate - {} ===\n",
        summary.scenario.display_name()
    ));
    out.push_str(&format!(
        "Replicates: {} (seeds {}..{})\n",
        summary.replicates,
        summary.first_seed,
        summary.first_seed.wrapping_add(summary.replicates as u64).wrapping_sub(1),
    ));
    out.push_str(&format!(
        "Spurious decline detected: {} / {} ({:.1}%)\n",
        summary.spurious,
        summary.replicates,
        100.0 * summary.spurious_rate(),
    ));
    if let Some(adjusted) = summary.adjusted_spurious {
        out.push_str(&format!(
            "After longevity adjustment: {} / {}\n",
            adjusted, summary.replicates
        ));
    }
    out.push_str(&format!(
        "Mean fitted drop: {:.3} | mean pooled true drop: {:.3}\n\n",
        summary.mean_fitted_drop, summary.mean_true_drop
    ));

    out.push_str(format!("{:>4} {:>6} {:>7} {:>8}\n", "age", "runs", "true", "fitted").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<4} {:-<6} {:-<7} {:-<8}\n", "", "", "", "").trim_end());
    out.push('\n');
    for a in &summary.by_age {
        out.push_str(&format!(
            "{:>4} {:>6} {:>7.3} {:>8.3}\n",
            a.age, a.runs, a.mean_true, a.mean_fitted
        ));
    }
    out
}

fn fmt_interval(lo: f64, hi: f64) -> String {
    format!("[{lo:.3}, {hi:.3}]")
}
