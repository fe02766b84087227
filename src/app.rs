//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the log subscriber
//! - runs the generate / fit / hist2d workflows
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, FitArgs, GenerateArgs, Hist2dArgs};
use crate::data::{Mixture, Sampler};
use crate::domain::{FitRange, GenerateConfig, Hist2dConfig, RunConfig};
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::io::ingest::IngestReport;
use crate::io::{FitArchive, write_json, write_rows, write_values};
use crate::report::{format_comparison, format_fit_report, format_histogram_summary};

pub mod pipeline;

/// Entry point for the `binfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    match cli.command {
        Command::Generate(args) => handle_generate(&generate_config_from_args(&args)?),
        Command::Fit(args) => handle_fit(&fit_config_from_args(&args)?),
        Command::Hist2d(args) => handle_hist2d(&hist2d_config_from_args(&args)),
    }
}

fn handle_generate(config: &GenerateConfig) -> Result<(), AppError> {
    let mut sampler = Sampler::new(config.seed);
    let mut rows = Vec::with_capacity(config.events);
    for _ in 0..config.events {
        let row = (0..config.columns)
            .map(|_| sampler.draw_mixture(&config.mixture))
            .collect::<crate::error::Result<Vec<f64>>>()?;
        rows.push(row);
    }

    if config.columns == 1 {
        let values: Vec<f64> = rows.into_iter().flatten().collect();
        write_values(&config.output, &values)?;
    } else {
        write_rows(&config.output, &rows)?;
    }
    info!(events = config.events, seed = config.seed, "samples written");
    println!(
        "Wrote {} records x {} column(s) to {}",
        config.events,
        config.columns,
        config.output.display()
    );
    Ok(())
}

fn handle_fit(config: &RunConfig) -> Result<(), AppError> {
    if config.all_columns {
        let (ingest, fits) = pipeline::run_fit_columns(config)?;
        print_ingest(&ingest);
        let mut first_err = None;
        for col in fits {
            println!("=== column {} ===", col.column);
            print!("{}", format_histogram_summary(&col.histogram));
            match col.result {
                Ok(fit) => println!("{}", format_fit_report(&fit)),
                Err(e) => {
                    println!("fit failed: {e}\n");
                    first_err.get_or_insert(e);
                }
            }
        }
        return match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        };
    }

    let run = pipeline::run_fit(config)?;
    print_ingest(&run.ingest);
    println!("{}", format_histogram_summary(&run.histogram));
    if run.selection.fits.len() + run.selection.skipped.len() > 1 {
        println!("{}", format_comparison(&run.selection));
    }
    println!("{}", format_fit_report(&run.selection.best));

    if let Some(path) = &config.export {
        let archive = FitArchive::new(run.histogram.clone(), run.selection.best.clone());
        write_json(path, &archive)?;
        println!("Wrote fit archive to {}", path.display());
    }
    Ok(())
}

fn handle_hist2d(config: &Hist2dConfig) -> Result<(), AppError> {
    let run = pipeline::run_hist2d(config)?;
    print_ingest(&run.ingest);

    let h = &run.histogram;
    println!(
        "{}: entries={} | integral={:.1} | dropped={} | correlation={:.4}",
        if h.name().is_empty() { "hist2d" } else { h.name() },
        h.entries(),
        h.integral(),
        h.dropped(),
        h.correlation()
    );
    println!();
    println!("{}", format_histogram_summary(&run.projection_x));
    println!("{}", format_histogram_summary(&run.projection_y));

    if let Some(path) = &config.export {
        write_json(path, &run.histogram)?;
        println!("Wrote 2D histogram to {}", path.display());
    }
    Ok(())
}

fn print_ingest(report: &IngestReport) {
    if report.skipped == 0 {
        println!("Read {} records", report.records);
        return;
    }
    let lines: Vec<String> = report.skipped_lines.iter().map(|l| l.to_string()).collect();
    let more = if report.skipped > report.skipped_lines.len() { ", ..." } else { "" };
    println!(
        "Read {} records, skipped {} malformed line(s): {}{more}",
        report.records,
        report.skipped,
        lines.join(", ")
    );
}

pub fn generate_config_from_args(args: &GenerateArgs) -> Result<GenerateConfig, AppError> {
    if args.columns == 0 {
        return Err(AppError::new(2, "--columns must be >= 1."));
    }
    Ok(GenerateConfig {
        output: args.output.clone(),
        events: args.events,
        seed: args.seed,
        mixture: Mixture::new(args.components.clone())?,
        columns: args.columns,
    })
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    let range = match args.fit_range.as_deref() {
        None => None,
        Some([lo, hi]) => Some(FitRange::new(*lo, *hi)?),
        Some(_) => return Err(AppError::new(2, "--fit-range takes exactly two values.")),
    };
    let options = FitOptions {
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
        ..FitOptions::default()
    };
    options.validate()?;

    Ok(RunConfig {
        input: args.input.clone(),
        column: args.column,
        all_columns: args.all_columns,
        n_bins: args.bins,
        lo: args.lo,
        hi: args.hi,
        range,
        model_spec: args.model,
        guess: args.guess.clone(),
        param_names: args.param_names.clone(),
        frac_syst: args.syst,
        options,
        export: args.export.clone(),
    })
}

pub fn hist2d_config_from_args(args: &Hist2dArgs) -> Hist2dConfig {
    Hist2dConfig {
        input: args.input.clone(),
        n_bins_x: args.bins_x,
        x_lo: args.x_lo,
        x_hi: args.x_hi,
        n_bins_y: args.bins_y,
        y_lo: args.y_lo,
        y_hi: args.y_hi,
        export: args.export.clone(),
    }
}
