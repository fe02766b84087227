//! Independent fits in parallel.
//!
//! Each job owns nothing shared with the others, so jobs run on the rayon pool
//! without synchronization. Results come back in job order.

use rayon::prelude::*;

use crate::domain::{FitRange, FitResult};
use crate::error::Result;
use crate::fit::fitter::{FitOptions, fit};
use crate::hist::Histogram1D;
use crate::models::Model;

#[derive(Debug, Clone)]
pub struct FitJob<'a> {
    pub histogram: &'a Histogram1D,
    pub model: &'a Model,
    pub guess: Vec<f64>,
    pub range: Option<FitRange>,
}

pub fn fit_batch(jobs: &[FitJob<'_>], options: &FitOptions) -> Vec<Result<FitResult>> {
    jobs.par_iter()
        .map(|job| fit(job.histogram, job.model, &job.guess, job.range, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Distribution, Sampler};
    use crate::error::FitError;

    #[test]
    fn batch_matches_sequential_fits_in_order() {
        let means = [0.0, 0.5, -0.5, 1.0, -1.0, 0.0];
        let sigmas = [1.0, 0.8, 1.2, 0.6, 1.5, 2.0];
        let mut sampler = Sampler::new(0);
        let mut hists = Vec::new();
        for (m, s) in means.iter().zip(sigmas) {
            let mut h = Histogram1D::new(100, -5.0, 5.0).unwrap();
            for _ in 0..10_000 {
                h.fill(sampler.draw(Distribution::Gaussian { mean: *m, sigma: s }).unwrap());
            }
            hists.push(h);
        }
        let model = Model::gaussian();
        let jobs: Vec<FitJob<'_>> = hists
            .iter()
            .zip(means.iter().zip(sigmas))
            .map(|(h, (m, s))| FitJob {
                histogram: h,
                model: &model,
                guess: vec![100.0, *m, s],
                range: None,
            })
            .collect();

        let opts = FitOptions::default();
        let results = fit_batch(&jobs, &opts);
        assert_eq!(results.len(), jobs.len());
        for (job, res) in jobs.iter().zip(&results) {
            let batch = res.as_ref().unwrap();
            let single = fit(job.histogram, job.model, &job.guess, job.range, &opts).unwrap();
            assert_eq!(batch.values(), single.values());
        }
        let fitted_mean = results[3].as_ref().unwrap().values()[1];
        assert!((fitted_mean - 1.0).abs() < 0.05);
    }

    #[test]
    fn failures_stay_in_their_slot() {
        let good = {
            let mut h = Histogram1D::new(50, -3.0, 3.0).unwrap();
            let mut s = Sampler::new(1);
            for _ in 0..5_000 {
                h.fill(s.draw(Distribution::Gaussian { mean: 0.0, sigma: 1.0 }).unwrap());
            }
            h
        };
        let empty = Histogram1D::new(50, -3.0, 3.0).unwrap();
        let model = Model::gaussian();
        let jobs = vec![
            FitJob { histogram: &empty, model: &model, guess: vec![1.0, 0.0, 1.0], range: None },
            FitJob { histogram: &good, model: &model, guess: vec![100.0, 0.0, 1.0], range: None },
        ];
        let results = fit_batch(&jobs, &FitOptions::default());
        assert!(matches!(results[0], Err(FitError::InsufficientData { bins: 0, .. })));
        assert!(results[1].is_ok());
    }
}
