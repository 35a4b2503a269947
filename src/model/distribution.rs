//! Intensity distributions behind the class models.
//!
//! The energy builder only relies on the [`Distribution`] capability
//! (density, cumulative, survival, mean, spread). [`Gaussian`] is the single
//! family used by the estimator; it delegates to `statrs` and adds a tail-safe
//! log-CDF so far-left intensities never produce `ln(0)`.

use crate::error::{Result, SegmentationError};
use serde::Serialize;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use std::f64::consts::PI;

/// Standard score below which `ln Φ(z)` switches to its asymptotic expansion.
const LOG_CDF_TAIL_Z: f64 = -30.0;

/// Probability model over a scalar intensity.
pub trait Distribution {
    fn density(&self, x: f64) -> f64;
    fn cumulative(&self, x: f64) -> f64;
    fn mean(&self) -> f64;
    fn spread(&self) -> f64;

    fn survival(&self, x: f64) -> f64 {
        1.0 - self.cumulative(x)
    }

    fn log_density(&self, x: f64) -> f64 {
        self.density(x).ln()
    }

    fn log_cumulative(&self, x: f64) -> f64 {
        self.cumulative(x).ln()
    }
}

/// Normal distribution parameterised by location (`mean`) and scale (`spread`).
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Gaussian {
    mean: f64,
    spread: f64,
    #[serde(skip)]
    inner: Normal,
}

impl PartialEq for Gaussian {
    fn eq(&self, other: &Self) -> bool {
        self.mean == other.mean && self.spread == other.spread
    }
}

impl Gaussian {
    pub fn new(mean: f64, spread: f64) -> Result<Self> {
        if !mean.is_finite() || !spread.is_finite() || spread <= 0.0 {
            return Err(SegmentationError::InvalidModel { mean, spread });
        }
        let inner =
            Normal::new(mean, spread).map_err(|_| SegmentationError::InvalidModel { mean, spread })?;
        Ok(Self {
            mean,
            spread,
            inner,
        })
    }

    /// Normal fit of `values` (population std) with the spread floored at
    /// `min_spread`. `None` for empty or non-finite samples.
    pub fn fit(values: &[f64], min_spread: f64) -> Option<Self> {
        let (mean, std) = mean_std(values)?;
        Self::new(mean, std.max(min_spread)).ok()
    }

    /// Same spread, mean moved by `offset`.
    pub fn shifted(&self, offset: f64) -> Result<Self> {
        Self::new(self.mean + offset, self.spread)
    }

    #[inline]
    fn z(&self, x: f64) -> f64 {
        (x - self.mean) / self.spread
    }
}

impl Distribution for Gaussian {
    #[inline]
    fn density(&self, x: f64) -> f64 {
        self.inner.pdf(x)
    }

    #[inline]
    fn cumulative(&self, x: f64) -> f64 {
        self.inner.cdf(x)
    }

    #[inline]
    fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    fn spread(&self) -> f64 {
        self.spread
    }

    #[inline]
    fn survival(&self, x: f64) -> f64 {
        self.inner.sf(x)
    }

    #[inline]
    fn log_density(&self, x: f64) -> f64 {
        self.inner.ln_pdf(x)
    }

    fn log_cumulative(&self, x: f64) -> f64 {
        let z = self.z(x);
        if z >= LOG_CDF_TAIL_Z || z.is_nan() {
            return self.cumulative(x).ln();
        }
        // Mills-ratio expansion: Φ(z) ≈ φ(z)/(-z) · (1 - 1/z² + 3/z⁴ - 15/z⁶)
        let z2 = z * z;
        let series = 1.0 - 1.0 / z2 + 3.0 / (z2 * z2) - 15.0 / (z2 * z2 * z2);
        -0.5 * z2 - 0.5 * (2.0 * PI).ln() - (-z).ln() + series.ln()
    }
}

/// Population statistics `(mean, std)` of `values` (zero degrees of freedom).
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}
