//! Command-line parsing for the `binfit` binary.
//!
//! Argument parsing and command dispatch stay separate from the histogram and
//! fitting code; [`crate::app`] turns these structs into plain config types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::Distribution;
use crate::domain::ModelSpec;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "binfit", version, about = "Binned histograms and chi-square curve fits")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Draw seeded samples from a distribution mixture and write them one record per line.
    Generate(GenerateArgs),
    /// Histogram a sample file and fit one or more models.
    Fit(FitArgs),
    /// Fill a 2D histogram from `x y` pairs and print its projections.
    Hist2d(Hist2dArgs),
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Output file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of records to draw.
    #[arg(short = 'n', long, default_value_t = 100_000)]
    pub events: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Mixture component as `FRACTION:DIST` or `DIST`, e.g. `0.1:bw(0.77,0.15)`.
    /// Repeat for several components; fractions are normalized.
    #[arg(short, long = "component", value_parser = parse_component, default_value = "gaus(0.5,0.2)")]
    pub components: Vec<(f64, Distribution)>,

    /// Values per record (each drawn independently).
    #[arg(long, default_value_t = 1)]
    pub columns: usize,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Sample file (one value per line, or several columns).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Column to histogram in a multi-column file (0-based).
    #[arg(long, conflicts_with = "all_columns")]
    pub column: Option<usize>,

    /// Fit every column of a multi-column file (needs a single-model `--model`).
    #[arg(long)]
    pub all_columns: bool,

    #[arg(long, default_value_t = 100)]
    pub bins: usize,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub lo: f64,

    #[arg(long, default_value_t = 2.0, allow_hyphen_values = true)]
    pub hi: f64,

    /// Restrict the fit to bin centers in `[LO, HI]`.
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], allow_hyphen_values = true)]
    pub fit_range: Option<Vec<f64>>,

    /// Which model(s) to fit.
    #[arg(long, value_enum, default_value_t = ModelSpec::Auto)]
    pub model: ModelSpec,

    /// Initial parameter guess, comma separated (single-model fits only).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub guess: Option<Vec<f64>>,

    /// Parameter names, comma separated (single-model fits only).
    #[arg(long, value_delimiter = ',')]
    pub param_names: Option<Vec<String>>,

    /// Fractional systematic added in quadrature to every bin error.
    #[arg(long, default_value_t = 0.0)]
    pub syst: f64,

    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    #[arg(long, default_value_t = 1e-8)]
    pub tolerance: f64,

    /// Write histogram, fit and curve to a JSON archive.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct Hist2dArgs {
    /// File of `x y` pairs.
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(long, default_value_t = 200)]
    pub bins_x: usize,

    #[arg(long, default_value_t = -3.0, allow_hyphen_values = true)]
    pub x_lo: f64,

    #[arg(long, default_value_t = 3.0, allow_hyphen_values = true)]
    pub x_hi: f64,

    #[arg(long, default_value_t = 200)]
    pub bins_y: usize,

    #[arg(long, default_value_t = -3.0, allow_hyphen_values = true)]
    pub y_lo: f64,

    #[arg(long, default_value_t = 3.0, allow_hyphen_values = true)]
    pub y_hi: f64,

    /// Write the 2D histogram to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// `FRACTION:DIST` or a bare `DIST` (fraction 1).
pub fn parse_component(s: &str) -> Result<(f64, Distribution), String> {
    let (frac, dist) = match s.split_once(':') {
        Some((f, d)) => {
            let f: f64 = f
                .trim()
                .parse()
                .map_err(|e| format!("bad fraction `{}`: {e}", f.trim()))?;
            (f, d)
        }
        None => (1.0, s),
    };
    let dist: Distribution = dist.parse().map_err(|e: crate::error::FitError| e.to_string())?;
    Ok((frac, dist))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn component_with_and_without_fraction() {
        assert_eq!(
            parse_component("0.1:bw(0.77,0.15)").unwrap(),
            (0.1, Distribution::BreitWigner { mean: 0.77, width: 0.15 })
        );
        assert_eq!(
            parse_component("gaus(0.5,0.2)").unwrap(),
            (1.0, Distribution::Gaussian { mean: 0.5, sigma: 0.2 })
        );
        assert!(parse_component("x:gaus(0,1)").is_err());
        assert!(parse_component("gaus(0,-1)").is_err());
    }

    #[test]
    fn fit_args_parse_range_and_guess() {
        let cli = Cli::parse_from([
            "binfit", "fit", "-i", "m.txt", "--model", "expo-gaus", "--lo", "2", "--hi", "4",
            "--fit-range", "2.5", "3.8", "--guess", "50,-1.2,60,3.1,0.05", "--log-level", "debug",
        ]);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        assert_eq!(args.model, ModelSpec::ExpoGaus);
        assert_eq!(args.fit_range, Some(vec![2.5, 3.8]));
        assert_eq!(args.guess, Some(vec![50.0, -1.2, 60.0, 3.1, 0.05]));
    }

    #[test]
    fn generate_collects_repeated_components() {
        let cli = Cli::parse_from([
            "binfit", "generate", "-o", "out.txt", "-c", "0.1:bw(0.77,0.15)", "-c", "0.9:gaus(0.5,0.2)",
        ]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate subcommand");
        };
        assert_eq!(args.components.len(), 2);
        assert_eq!(args.events, 100_000);
    }
}
