//! The `fit` and `hist2d` workflows, free of any printing.
//!
//! ingest -> histogram -> candidate fits -> selection
//!
//! The CLI layer only formats what these functions return.

use std::path::Path;

use tracing::info;

use crate::domain::{FitResult, Hist2dConfig, RunConfig};
use crate::error::AppError;
use crate::fit::{FitJob, FitSelection, fit_batch, fit_candidates, initial_guess};
use crate::hist::{Histogram1D, Histogram2D};
use crate::io::ingest::{IngestReport, read_column, read_columns, read_pairs, read_values};
use crate::models::Model;

/// All computed outputs of a single `binfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestReport,
    pub histogram: Histogram1D,
    pub selection: FitSelection,
}

/// One column's outcome in an all-columns run.
#[derive(Debug)]
pub struct ColumnFit {
    pub column: usize,
    pub histogram: Histogram1D,
    pub result: crate::error::Result<FitResult>,
}

/// Outputs of a `binfit hist2d` run.
#[derive(Debug, Clone)]
pub struct Hist2dOutput {
    pub ingest: IngestReport,
    pub histogram: Histogram2D,
    pub projection_x: Histogram1D,
    pub projection_y: Histogram1D,
}

/// Ingest one column, histogram it and fit every candidate model.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let ingested = match config.column {
        Some(c) => read_column(&config.input, c)?,
        None => read_values(&config.input)?,
    };
    if ingested.records.is_empty() {
        return Err(no_records(&config.input));
    }

    let mut histogram = empty_histogram(config, &stem(&config.input))?;
    histogram.fill_all(ingested.records.iter().copied());
    info!(
        entries = histogram.entries(),
        dropped = histogram.dropped(),
        skipped = ingested.report.skipped,
        "histogram filled"
    );

    let models = candidate_models(config)?;
    let selection = fit_candidates(&histogram, &models, config.range, &config.options)?;

    Ok(RunOutput {
        ingest: ingested.report,
        histogram,
        selection,
    })
}

/// Histogram every column of a multi-column file and fit them in parallel with
/// one model. Multi-model specs (auto/all) are rejected before any input is read.
pub fn run_fit_columns(config: &RunConfig) -> Result<(IngestReport, Vec<ColumnFit>), AppError> {
    let mut models = candidate_models(config)?;
    if models.len() != 1 {
        return Err(AppError::new(
            2,
            "--all-columns needs a single-model --model (not auto/all).",
        ));
    }
    let model = models.remove(0);

    let rows = read_columns(&config.input)?;
    let Some(width) = rows.records.first().map(Vec::len) else {
        return Err(no_records(&config.input));
    };

    let name = stem(&config.input);
    let mut histograms = Vec::with_capacity(width);
    for c in 0..width {
        let mut h = empty_histogram(config, &format!("{name}_c{c}"))?;
        h.fill_all(rows.records.iter().map(|r| r[c]));
        histograms.push(h);
    }

    let jobs: Vec<FitJob<'_>> = histograms
        .iter()
        .map(|h| FitJob {
            histogram: h,
            model: &model,
            guess: initial_guess(h, &model, config.range),
            range: config.range,
        })
        .collect();
    let results = fit_batch(&jobs, &config.options);

    let fits = histograms
        .into_iter()
        .zip(results)
        .enumerate()
        .map(|(column, (histogram, result))| ColumnFit {
            column,
            histogram,
            result,
        })
        .collect();
    Ok((rows.report, fits))
}

/// Fill a 2D histogram from `x y` pairs and project it on both axes.
pub fn run_hist2d(config: &Hist2dConfig) -> Result<Hist2dOutput, AppError> {
    let ingested = read_pairs(&config.input)?;
    if ingested.records.is_empty() {
        return Err(no_records(&config.input));
    }

    let mut histogram = Histogram2D::new(
        config.n_bins_x,
        config.x_lo,
        config.x_hi,
        config.n_bins_y,
        config.y_lo,
        config.y_hi,
    )?
    .named(stem(&config.input));
    for (x, y) in &ingested.records {
        histogram.fill(*x, *y);
    }
    info!(entries = histogram.entries(), dropped = histogram.dropped(), "2D histogram filled");

    let projection_x = histogram.projection_x();
    let projection_y = histogram.projection_y();
    Ok(Hist2dOutput {
        ingest: ingested.report,
        histogram,
        projection_x,
        projection_y,
    })
}

/// Models for the configured `--model`, with the explicit guess / names applied.
pub fn candidate_models(config: &RunConfig) -> Result<Vec<Model>, AppError> {
    let mut models = config.model_spec.models();
    let customized = config.guess.is_some() || config.param_names.is_some();
    if customized && models.len() != 1 {
        return Err(AppError::new(
            2,
            "--guess and --param-names need a single-model --model (not auto/all).",
        ));
    }
    if let Some(model) = models.first_mut() {
        if let Some(names) = &config.param_names {
            *model = model.clone().with_param_names(names.as_slice())?;
        }
        if let Some(guess) = &config.guess {
            *model = model.clone().with_guess(guess.clone())?;
        }
    }
    Ok(models)
}

fn empty_histogram(config: &RunConfig, name: &str) -> Result<Histogram1D, AppError> {
    let mut h = Histogram1D::new(config.n_bins, config.lo, config.hi)?.named(name);
    h.set_fractional_systematic(config.frac_syst)?;
    Ok(h)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn no_records(path: &Path) -> AppError {
    AppError::new(3, format!("No valid records in '{}'.", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelSpec;
    use crate::fit::FitOptions;
    use std::path::PathBuf;

    fn config(spec: ModelSpec) -> RunConfig {
        RunConfig {
            input: PathBuf::from("unused.txt"),
            column: None,
            all_columns: false,
            n_bins: 100,
            lo: 0.0,
            hi: 2.0,
            range: None,
            model_spec: spec,
            guess: None,
            param_names: None,
            frac_syst: 0.0,
            options: FitOptions::default(),
            export: None,
        }
    }

    #[test]
    fn guess_requires_single_model() {
        let mut cfg = config(ModelSpec::Auto);
        cfg.guess = Some(vec![1.0, 0.5, 0.2]);
        assert_eq!(candidate_models(&cfg).unwrap_err().exit_code(), 2);

        cfg.model_spec = ModelSpec::Gaus;
        let models = candidate_models(&cfg).unwrap();
        assert_eq!(models[0].guess(), Some(&[1.0, 0.5, 0.2][..]));
    }

    #[test]
    fn custom_names_are_applied() {
        let mut cfg = config(ModelSpec::ExpoGaus);
        cfg.param_names = Some(
            ["BkgNorm", "BkgSlope", "SigNorm", "SigMean", "SigSigma"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        let models = candidate_models(&cfg).unwrap();
        assert_eq!(models[0].param_names()[3], "SigMean");
    }

    #[test]
    fn all_columns_rejects_multi_model_specs() {
        let mut cfg = config(ModelSpec::Auto);
        cfg.all_columns = true;
        let err = run_fit_columns(&cfg).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("--all-columns"));

        cfg.model_spec = ModelSpec::All;
        assert_eq!(run_fit_columns(&cfg).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn missing_input_maps_to_input_exit_code() {
        let err = run_fit(&config(ModelSpec::Gaus)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
