//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the scenario pipeline(s)
//! - prints reports/plots
//! - writes optional exports
//! - re-renders saved comparison files

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Command, ReplicateArgs, RunArgs, ScenarioArg, ShowArgs};
use crate::domain::{AgeCurve, LifespanConfig, RunConfig, Scenario, TradeoffCurve};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `senesce` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Age(args) => handle_scenarios(&args, &[Scenario::AgeOnly]),
        Command::Selective(args) => handle_scenarios(&args, &[Scenario::SelectiveDisappearance]),
        Command::Run(args) => handle_scenarios(
            &args,
            &[Scenario::AgeOnly, Scenario::SelectiveDisappearance],
        ),
        Command::Replicate(args) => handle_replicate(&args),
        Command::Show(args) => handle_show(&args),
    }
}

/// Logs go to stderr so stdout stays the report.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn handle_scenarios(args: &RunArgs, scenarios: &[Scenario]) -> Result<(), AppError> {
    let base = run_config_from_args(args);
    let multi = scenarios.len() > 1;

    for &scenario in scenarios {
        // Several scenarios share one invocation, so each gets its own output files.
        let config = if multi {
            with_scenario_outputs(&base, scenario)
        } else {
            base.clone()
        };
        handle_one(scenario, &config)?;
    }
    Ok(())
}

fn handle_one(scenario: Scenario, config: &RunConfig) -> Result<(), AppError> {
    let run = pipeline::run_scenario(scenario, config)?;

    println!("{}", crate::report::format_run_summary(&run, config));
    println!("{}", crate::report::format_comparison(&run.comparison));
    if let Some(adjusted) = &run.adjusted {
        println!(
            "{}",
            crate::report::format_adjusted_comparison(&run.comparison, adjusted)
        );
    }

    let adjusted_rows = run.adjusted.as_ref().map(|a| a.rows.as_slice());
    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.comparison,
            adjusted_rows,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_observations {
        crate::io::write_observations_csv(path, &run.observations)?;
    }
    if let Some(path) = &config.export_comparison {
        crate::io::write_comparison_json(path, &run, config)?;
    }
    if let Some(path) = &config.svg {
        crate::plot::write_svg_chart(
            path,
            &run.comparison,
            adjusted_rows,
            scenario.display_name(),
        )?;
    }
    if config.debug_bundle {
        let path = crate::debug::write_debug_bundle(&run, config)?;
        println!("Debug bundle: {}", path.display());
    }

    Ok(())
}

fn handle_replicate(args: &ReplicateArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.run);
    let scenario = match args.scenario {
        ScenarioArg::Age => Scenario::AgeOnly,
        ScenarioArg::Selective => Scenario::SelectiveDisappearance,
    };

    let summary = pipeline::run_replicates(scenario, &config, args.replicates)?;
    println!("{}", crate::report::format_replicate_summary(&summary));
    Ok(())
}

fn handle_show(args: &ShowArgs) -> Result<(), AppError> {
    let file = crate::io::read_comparison_json(&args.comparison)?;

    println!("{}", crate::report::format_saved_comparison(&file));
    if !args.no_plot {
        let adjusted_rows = file.adjusted.as_ref().map(|a| a.rows.as_slice());
        let plot =
            crate::plot::render_ascii_plot(&file.rows, adjusted_rows, args.width, args.height);
        println!("{plot}");
    }
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        lifespan: LifespanConfig {
            population: args.population,
            survival: args.survival,
            min_age: args.min_age,
            max_age: args.max_age,
        },
        age_curve: AgeCurve {
            age_at_min: args.age_at_min,
            age_at_plateau: args.age_at_plateau,
            prob_min: args.prob_min,
            prob_plateau: args.prob_plateau,
        },
        tradeoff: TradeoffCurve {
            prob_age3: args.prob_age3,
            plateau_age1: args.plateau_age1,
            plateau_long1: args.plateau_long1,
            plateau_age2: args.plateau_age2,
            plateau_long2: args.plateau_long2,
            prime_age_cutoff: args.prime_age_cutoff,
        },
        seed: args.seed,
        decline_threshold: args.threshold,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_observations: args.export_observations.clone(),
        export_comparison: args.export_comparison.clone(),
        svg: args.svg.clone(),
        debug_bundle: args.debug_bundle,
    }
}

fn with_scenario_outputs(base: &RunConfig, scenario: Scenario) -> RunConfig {
    let tag = match scenario {
        Scenario::AgeOnly => "age",
        Scenario::SelectiveDisappearance => "selective",
    };
    let mut config = base.clone();
    config.export_observations = base.export_observations.as_deref().map(|p| suffixed(p, tag));
    config.export_comparison = base.export_comparison.as_deref().map(|p| suffixed(p, tag));
    config.svg = base.svg.as_deref().map(|p| suffixed(p, tag));
    config
}

/// `out/obs.csv` + `age` -> `out/obs_age.csv`.
fn suffixed(path: &Path, tag: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{tag}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{tag}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(suffixed(Path::new("out/obs.csv"), "age"), PathBuf::from("out/obs_age.csv"));
        assert_eq!(suffixed(Path::new("chart"), "selective"), PathBuf::from("chart_selective"));
    }

    #[test]
    fn args_map_onto_run_config() {
        let cli = crate::cli::Cli::try_parse_from([
            "senesce",
            "run",
            "--seed",
            "7",
            "--no-plot",
            "--prime-age-cutoff",
            "12",
            "--svg",
            "c.svg",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        let config = run_config_from_args(&args);
        assert_eq!(config.seed, 7);
        assert!(!config.plot);
        assert_eq!(config.tradeoff.prime_age_cutoff, 12);
        assert_eq!(config.age_curve, AgeCurve::default());
        assert_eq!(config.lifespan, LifespanConfig::default());

        let age = with_scenario_outputs(&config, Scenario::AgeOnly);
        assert_eq!(age.svg, Some(PathBuf::from("c_age.svg")));
        assert!(age.export_observations.is_none());
    }
}
