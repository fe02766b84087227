//! Seeded sampling from the distributions used to build mass spectra.
//!
//! A [`Sampler`] owns its generator; there is no process-wide random state.
//! Two samplers built from the same seed and driven by the same call sequence
//! produce bit-identical values.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution as _;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// A named distribution with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Gaussian { mean: f64, sigma: f64 },
    Exponential { rate: f64 },
    /// Exponential tail starting at `origin` (threshold background).
    ShiftedExponential { origin: f64, rate: f64 },
    BreitWigner { mean: f64, width: f64 },
    Uniform { lo: f64, hi: f64 },
}

impl Distribution {
    /// Check the parameters without drawing.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Distribution::Gaussian { mean, sigma } => {
                require_finite("gaussian mean", mean)?;
                require_positive("gaussian sigma", sigma)
            }
            Distribution::Exponential { rate } => require_positive("exponential rate", rate),
            Distribution::ShiftedExponential { origin, rate } => {
                require_finite("exponential origin", origin)?;
                require_positive("exponential rate", rate)
            }
            Distribution::BreitWigner { mean, width } => {
                require_finite("breit-wigner mean", mean)?;
                require_positive("breit-wigner width", width)
            }
            Distribution::Uniform { lo, hi } => {
                require_finite("uniform lo", lo)?;
                require_finite("uniform hi", hi)?;
                if lo >= hi {
                    return Err(FitError::invalid(format!(
                        "uniform requires lo < hi, got [{lo}, {hi})"
                    )));
                }
                if !(hi - lo).is_finite() {
                    return Err(FitError::invalid(format!(
                        "uniform range [{lo}, {hi}) is too wide to sample"
                    )));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Gaussian { mean, sigma } => write!(f, "gaus({mean},{sigma})"),
            Distribution::Exponential { rate } => write!(f, "expo({rate})"),
            Distribution::ShiftedExponential { origin, rate } => write!(f, "expo({rate},{origin})"),
            Distribution::BreitWigner { mean, width } => write!(f, "bw({mean},{width})"),
            Distribution::Uniform { lo, hi } => write!(f, "uniform({lo},{hi})"),
        }
    }
}

/// Parses `gaus(mean,sigma)`, `expo(rate)`, `expo(rate,origin)`, `bw(mean,width)`
/// and `uniform(lo,hi)`. Parameters are validated.
impl FromStr for Distribution {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, rest) = s
            .split_once('(')
            .ok_or_else(|| FitError::invalid(format!("expected `name(params)`, got `{s}`")))?;
        let inner = rest
            .strip_suffix(')')
            .ok_or_else(|| FitError::invalid(format!("missing `)` in `{s}`")))?;
        let args: Vec<f64> = inner
            .split(',')
            .map(|a| {
                a.trim()
                    .parse::<f64>()
                    .map_err(|e| FitError::invalid(format!("bad number `{}` in `{s}`: {e}", a.trim())))
            })
            .collect::<Result<_>>()?;

        let dist = match (name.trim().to_ascii_lowercase().as_str(), args.as_slice()) {
            ("gaus" | "gaussian", [mean, sigma]) => Distribution::Gaussian { mean: *mean, sigma: *sigma },
            ("expo" | "exponential", [rate]) => Distribution::Exponential { rate: *rate },
            ("expo" | "exponential", [rate, origin]) => Distribution::ShiftedExponential {
                origin: *origin,
                rate: *rate,
            },
            ("bw" | "breitwigner", [mean, width]) => Distribution::BreitWigner { mean: *mean, width: *width },
            ("uniform", [lo, hi]) => Distribution::Uniform { lo: *lo, hi: *hi },
            (other, args) => {
                return Err(FitError::invalid(format!(
                    "unknown distribution `{other}` with {} parameter(s)",
                    args.len()
                )));
            }
        };
        dist.validate()?;
        Ok(dist)
    }
}

/// A weighted mix of distributions (e.g. 10% signal over 90% background).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mixture {
    /// `(normalized fraction, distribution)` pairs.
    components: Vec<(f64, Distribution)>,
}

impl Mixture {
    /// Build a mixture; fractions must be positive and are normalized to sum to 1.
    pub fn new(components: Vec<(f64, Distribution)>) -> Result<Self> {
        if components.is_empty() {
            return Err(FitError::invalid("mixture needs at least one component"));
        }
        let mut total = 0.0;
        for (frac, dist) in &components {
            require_positive("mixture fraction", *frac)?;
            dist.validate()?;
            total += frac;
        }
        let components = components
            .into_iter()
            .map(|(frac, dist)| (frac / total, dist))
            .collect();
        Ok(Self { components })
    }

    pub fn single(dist: Distribution) -> Result<Self> {
        Self::new(vec![(1.0, dist)])
    }

    pub fn components(&self) -> &[(f64, Distribution)] {
        &self.components
    }
}

/// Seeded generator for scalar and paired samples.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
    seed: u64,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw one value. Parameters are validated before the generator advances.
    pub fn draw(&mut self, dist: Distribution) -> Result<f64> {
        dist.validate()?;
        let value = match dist {
            Distribution::Gaussian { mean, sigma } => {
                let normal = Normal::new(mean, sigma)
                    .map_err(|e| FitError::invalid(format!("gaussian: {e}")))?;
                normal.sample(&mut self.rng)
            }
            Distribution::Exponential { rate } => self.inverse_exponential(rate),
            Distribution::ShiftedExponential { origin, rate } => origin + self.inverse_exponential(rate),
            Distribution::BreitWigner { mean, width } => {
                let u: f64 = self.rng.r#gen();
                mean + 0.5 * width * (PI * (u - 0.5)).tan()
            }
            Distribution::Uniform { lo, hi } => self.rng.gen_range(lo..hi),
        };
        Ok(value)
    }

    /// Draw an `(x, y)` pair, x first.
    pub fn draw_pair(&mut self, x: Distribution, y: Distribution) -> Result<(f64, f64)> {
        x.validate()?;
        y.validate()?;
        Ok((self.draw(x)?, self.draw(y)?))
    }

    pub fn draw_n(&mut self, dist: Distribution, n: usize) -> Result<Vec<f64>> {
        dist.validate()?;
        (0..n).map(|_| self.draw(dist)).collect()
    }

    /// Pick a component with one uniform draw, then draw from it.
    pub fn draw_mixture(&mut self, mixture: &Mixture) -> Result<f64> {
        let roll: f64 = self.rng.r#gen();
        let mut cumulative = 0.0;
        let mut chosen = None;
        for (frac, dist) in mixture.components() {
            cumulative += frac;
            if roll < cumulative {
                chosen = Some(*dist);
                break;
            }
        }
        // Rounding can leave `cumulative` a hair below 1.
        let dist = match chosen.or_else(|| mixture.components().last().map(|(_, d)| *d)) {
            Some(d) => d,
            None => return Err(FitError::invalid("mixture has no components")),
        };
        self.draw(dist)
    }

    fn inverse_exponential(&mut self, rate: f64) -> f64 {
        // u in [0, 1) so 1 - u is never zero.
        let u: f64 = self.rng.r#gen();
        -(-u).ln_1p() / rate
    }
}

fn require_finite(what: &str, v: f64) -> Result<()> {
    if !v.is_finite() {
        return Err(FitError::invalid(format!("{what} must be finite, got {v}")));
    }
    Ok(())
}

fn require_positive(what: &str, v: f64) -> Result<()> {
    if !(v.is_finite() && v > 0.0) {
        return Err(FitError::invalid(format!("{what} must be > 0, got {v}")));
    }
    Ok(())
}
