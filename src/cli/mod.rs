//! Command-line parsing for the senescence simulator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the simulation/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "senesce",
    version,
    about = "Simulate reproduction histories and show how senescence illusions arise"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Age-only scenario: a quadratic logit fit bends down after a plateau.
    Age(RunArgs),
    /// Selective-disappearance scenario: pooled data decline though no individual does.
    Selective(RunArgs),
    /// Run both scenarios back to back with the same seed.
    Run(RunArgs),
    /// Repeat a scenario over consecutive seeds and count spurious declines.
    Replicate(ReplicateArgs),
    /// Re-render a comparison JSON written by `--export-comparison`.
    Show(ShowArgs),
}

/// Common options for every scenario run.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Number of geometric lifespan draws before filtering.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub population: usize,

    /// Per-year survival probability.
    #[arg(short = 's', long, default_value_t = 0.8)]
    pub survival: f64,

    /// Shortest retained lifespan (inclusive).
    #[arg(long, default_value_t = 3)]
    pub min_age: u32,

    /// Longest retained lifespan (inclusive).
    #[arg(long, default_value_t = 20)]
    pub max_age: u32,

    /// Random seed.
    #[arg(long, env = "SENESCE_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Fitted peak-to-last drop that counts as a decline.
    #[arg(long, default_value_t = 0.05)]
    pub threshold: f64,

    /// Age at which the age-only curve starts rising.
    #[arg(long, default_value_t = 3.0)]
    pub age_at_min: f64,

    /// Age at which the age-only curve reaches its plateau.
    #[arg(long, default_value_t = 7.0)]
    pub age_at_plateau: f64,

    /// Reproduction probability at `age_at_min`.
    #[arg(long, default_value_t = 0.5)]
    pub prob_min: f64,

    /// Reproduction probability on the plateau.
    #[arg(long, default_value_t = 0.9)]
    pub prob_plateau: f64,

    /// Reproduction probability at age 3 in the selective scenario.
    #[arg(long, default_value_t = 0.5)]
    pub prob_age3: f64,

    /// Shorter longevity anchor of the plateau trade-off (also the plateau age).
    #[arg(long, default_value_t = 7.0)]
    pub plateau_age1: f64,

    /// Plateau reached by individuals living `plateau_age1` years.
    #[arg(long, default_value_t = 0.9)]
    pub plateau_long1: f64,

    /// Longer longevity anchor of the plateau trade-off.
    #[arg(long, default_value_t = 15.0)]
    pub plateau_age2: f64,

    /// Plateau reached by individuals living `plateau_age2` years.
    #[arg(long, default_value_t = 0.7)]
    pub plateau_long2: f64,

    /// Ages above this are tagged senescent.
    #[arg(long, default_value_t = 10)]
    pub prime_age_cutoff: u32,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the observation table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_observations: Option<PathBuf>,

    /// Export the fitted models and per-age comparison to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_comparison: Option<PathBuf>,

    /// Write an SVG chart of observed, true and fitted curves.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Write a markdown debug bundle under `debug/`.
    #[arg(long)]
    pub debug_bundle: bool,
}

/// Which scenario a replicate study repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioArg {
    Age,
    Selective,
}

/// Options for a replicate study.
#[derive(Debug, Args, Clone)]
pub struct ReplicateArgs {
    /// Number of replicates (seeds `seed..seed+K`).
    #[arg(short = 'k', long, default_value_t = 100)]
    pub replicates: usize,

    /// Scenario to repeat.
    #[arg(long, value_enum, default_value_t = ScenarioArg::Age)]
    pub scenario: ScenarioArg,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Options for showing a saved comparison.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Comparison JSON file.
    #[arg(value_name = "JSON")]
    pub comparison: PathBuf,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::try_parse_from(["senesce", "age"]).unwrap();
        let Command::Age(args) = cli.command else {
            panic!("expected age subcommand");
        };
        assert_eq!(args.population, 1000);
        assert_eq!(args.min_age, 3);
        assert_eq!(args.max_age, 20);
        assert_eq!(args.prime_age_cutoff, 10);
        assert!(!args.no_plot);
    }

    #[test]
    fn replicate_flags_parse() {
        let cli = Cli::try_parse_from([
            "senesce",
            "replicate",
            "--replicates",
            "7",
            "--scenario",
            "selective",
            "--population",
            "200",
        ])
        .unwrap();
        let Command::Replicate(args) = cli.command else {
            panic!("expected replicate subcommand");
        };
        assert_eq!(args.replicates, 7);
        assert_eq!(args.scenario, ScenarioArg::Selective);
        assert_eq!(args.run.population, 200);
    }

    #[test]
    fn show_takes_a_path() {
        let cli = Cli::try_parse_from(["senesce", "show", "out/cmp.json", "--no-plot"]).unwrap();
        let Command::Show(args) = cli.command else {
            panic!("expected show subcommand");
        };
        assert_eq!(args.comparison, PathBuf::from("out/cmp.json"));
        assert!(args.no_plot);
        assert!(Cli::try_parse_from(["senesce", "show"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
