//! Per-class intensity models and their unsupervised or seeded estimation.
//!
//! Overview
//! - [`distribution`] – the [`Distribution`] capability and the [`Gaussian`] family.
//! - [`histogram`] – 256-bin intensity histogram and the dominant-band search.
//! - [`estimator`] – [`IntensityModelEstimator`], producing one model per class.
//!
//! Two estimation modes exist. *Seeds* fits one Gaussian per seed label.
//! *Hydohy* (hypo / dominant / hyper) assumes one majority population: it
//! finds the histogram peak, widens a band around it until a share of the
//! masked voxels is covered, fits the dominant model, and then fits one
//! outlier model on each side from voxels the dominant model considers
//! improbable. The outlier models act through their tail curves (survival for
//! hypo, cumulative for hyper) rather than their densities.

pub mod distribution;
pub mod estimator;
pub mod histogram;

pub use distribution::{Distribution, Gaussian};
pub use estimator::{EstimatorOptions, IntensityModelEstimator, ModelEstimate};
pub use histogram::{DominantBand, IntensityHistogram};

use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How class models are obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EstimationMode {
    /// One model per seed label `1..=K`.
    Seeds,
    /// Unsupervised hypo / dominant / hyper triple.
    Hydohy,
}

impl EstimationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationMode::Seeds => "seeds",
            EstimationMode::Hydohy => "hydohy",
        }
    }
}

impl FromStr for EstimationMode {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seeds" => Ok(EstimationMode::Seeds),
            "hydohy" => Ok(EstimationMode::Hydohy),
            _ => Err(SegmentationError::UnknownModelMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for EstimationMode {
    type Error = SegmentationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EstimationMode> for String {
    fn from(mode: EstimationMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for EstimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the dominant model an outlier population lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutlierSide {
    Hypo,
    Hyper,
}

impl fmt::Display for OutlierSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutlierSide::Hypo => "hypo",
            OutlierSide::Hyper => "hyper",
        })
    }
}

/// Curve through which a model scores an intensity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseCurve {
    Density,
    /// `1 - CDF`, used by the hypo outlier model.
    Survival,
    /// `CDF`, used by the hyper outlier model.
    Cumulative,
}

/// Immutable class model: a distribution plus its operative response curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntensityModel {
    distribution: Gaussian,
    curve: ResponseCurve,
}

impl IntensityModel {
    pub fn new(distribution: Gaussian, curve: ResponseCurve) -> Self {
        Self {
            distribution,
            curve,
        }
    }

    /// Density-scored model with the given parameters.
    pub fn gaussian(mean: f64, spread: f64) -> Result<Self> {
        Ok(Self::new(Gaussian::new(mean, spread)?, ResponseCurve::Density))
    }

    pub fn distribution(&self) -> &Gaussian {
        &self.distribution
    }

    pub fn curve(&self) -> ResponseCurve {
        self.curve
    }

    /// Value of the operative curve at `x`.
    pub fn response(&self, x: f64) -> f64 {
        match self.curve {
            ResponseCurve::Density => self.density(x),
            ResponseCurve::Survival => self.survival(x),
            ResponseCurve::Cumulative => self.cumulative(x),
        }
    }

    /// New model with the mean moved by `offset`; spread and curve unchanged.
    pub fn recentered(&self, offset: f64) -> Result<Self> {
        Ok(Self::new(self.distribution.shifted(offset)?, self.curve))
    }
}

impl Distribution for IntensityModel {
    fn density(&self, x: f64) -> f64 {
        self.distribution.density(x)
    }

    fn cumulative(&self, x: f64) -> f64 {
        self.distribution.cumulative(x)
    }

    fn mean(&self) -> f64 {
        self.distribution.mean()
    }

    fn spread(&self) -> f64 {
        self.distribution.spread()
    }

    fn survival(&self, x: f64) -> f64 {
        self.distribution.survival(x)
    }

    fn log_density(&self, x: f64) -> f64 {
        self.distribution.log_density(x)
    }

    fn log_cumulative(&self, x: f64) -> f64 {
        self.distribution.log_cumulative(x)
    }
}

/// Re-centre every model by `offset`, returning a new list.
pub fn recenter_models(models: &[IntensityModel], offset: f64) -> Result<Vec<IntensityModel>> {
    models.iter().map(|m| m.recentered(offset)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_accepts_known_names_only() {
        assert_eq!("seeds".parse::<EstimationMode>(), Ok(EstimationMode::Seeds));
        assert_eq!(" HyDoHy ".parse::<EstimationMode>(), Ok(EstimationMode::Hydohy));
        let err = "n_objects".parse::<EstimationMode>().unwrap_err();
        assert_eq!(err, SegmentationError::UnknownModelMode("n_objects".into()));
    }

    #[test]
    fn mode_deserializes_through_from_str() {
        let mode: EstimationMode = serde_json::from_str("\"hydohy\"").expect("known mode");
        assert_eq!(mode, EstimationMode::Hydohy);
        let err = serde_json::from_str::<EstimationMode>("\"kmeans\"").unwrap_err();
        assert!(err.to_string().contains("unknown model estimation mode"));
    }

    #[test]
    fn response_follows_curve() {
        let g = Gaussian::new(0.0, 1.0).expect("valid");
        let hypo = IntensityModel::new(g, ResponseCurve::Survival);
        let hyper = IntensityModel::new(g, ResponseCurve::Cumulative);
        assert!(hypo.response(-3.0) > 0.99);
        assert!(hyper.response(-3.0) < 0.01);
        assert_eq!(hypo.response(1.0), hypo.survival(1.0));
    }

    #[test]
    fn recentering_builds_new_models() {
        let models = vec![
            IntensityModel::new(Gaussian::new(40.0, 3.0).expect("valid"), ResponseCurve::Survival),
            IntensityModel::gaussian(100.0, 5.0).expect("valid"),
        ];
        let shifted = recenter_models(&models, 2.0).expect("valid");
        assert_eq!(models[0].mean(), 40.0);
        assert_eq!(shifted[0].mean(), 42.0);
        assert_eq!(shifted[0].curve(), ResponseCurve::Survival);
        assert_eq!(shifted[1].spread(), 5.0);
    }
}
