//! Estimation of per-class intensity models from a [`VolumeContext`].
//!
//! Fitted location/scale parameters of the seeded and dominant models are
//! rounded to whole intensity units (inputs are pixel-quantized). Every fitted
//! spread is floored at [`MIN_SPREAD`] so a near-constant population never
//! yields a zero-width model.

use super::distribution::{mean_std, Distribution, Gaussian};
use super::histogram::{DominantBand, IntensityHistogram, INTENSITY_BINS};
use super::{EstimationMode, IntensityModel, OutlierSide, ResponseCurve};
use crate::error::{Result, SegmentationError};
use crate::volume::VolumeContext;
use log::debug;
use serde::{Deserialize, Serialize};

/// Smallest spread any fitted model may have (one intensity unit).
pub const MIN_SPREAD: f64 = 1.0;

/// Knobs of the unsupervised hypo / dominant / hyper estimation.
///
/// - `perc`: share (percent) of masked voxels the dominant band must hold.
/// - `k_std_h`: multiplier applied to the in-band standard deviation.
/// - `simple_estim`: fit the dominant model to all masked voxels instead.
/// - `prob_w`: outlier threshold as a fraction of the dominant peak density.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorOptions {
    pub perc: f64,
    pub k_std_h: f64,
    pub simple_estim: bool,
    pub prob_w: f64,
    pub bins: usize,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            perc: 30.0,
            k_std_h: 3.0,
            simple_estim: false,
            prob_w: 1e-4,
            bins: INTENSITY_BINS,
        }
    }
}

/// Models plus the intermediate results worth reporting.
#[derive(Clone, Debug)]
pub struct ModelEstimate {
    pub mode: EstimationMode,
    /// Ordered by class: ascending seed label, or `[hypo, dominant, hyper]`.
    pub models: Vec<IntensityModel>,
    pub dominant_band: Option<DominantBand>,
}

#[derive(Clone, Debug, Default)]
pub struct IntensityModelEstimator {
    options: EstimatorOptions,
}

impl IntensityModelEstimator {
    pub fn new(options: EstimatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    /// One model per class, in class order.
    pub fn estimate(
        &self,
        ctx: &VolumeContext,
        mode: EstimationMode,
    ) -> Result<Vec<IntensityModel>> {
        self.estimate_detailed(ctx, mode).map(|e| e.models)
    }

    pub fn estimate_detailed(
        &self,
        ctx: &VolumeContext,
        mode: EstimationMode,
    ) -> Result<ModelEstimate> {
        match mode {
            EstimationMode::Seeds => Ok(ModelEstimate {
                mode,
                models: self.seeded(ctx)?,
                dominant_band: None,
            }),
            EstimationMode::Hydohy => {
                let (dominant, band) = self.dominant(ctx)?;
                let hypo = self.outlier(ctx, &dominant, OutlierSide::Hypo)?;
                let hyper = self.outlier(ctx, &dominant, OutlierSide::Hyper)?;
                Ok(ModelEstimate {
                    mode,
                    models: vec![hypo, dominant, hyper],
                    dominant_band: band,
                })
            }
        }
    }

    /// Fit one model per seed label `1..=K`, `K` being the largest label.
    pub fn seeded(&self, ctx: &VolumeContext) -> Result<Vec<IntensityModel>> {
        let seeds = ctx.seeds().ok_or(SegmentationError::MissingSeeds)?;
        let classes = ctx.seed_classes().ok_or(SegmentationError::MissingSeeds)?;

        let mut samples = vec![Vec::new(); classes as usize];
        for (&label, &value) in seeds.iter().zip(ctx.image().iter()) {
            if label > 0 {
                samples[label as usize - 1].push(value);
            }
        }

        samples
            .iter()
            .enumerate()
            .map(|(i, values)| {
                let label = i as u32 + 1;
                let (mean, std) = mean_std(values)
                    .ok_or(SegmentationError::InsufficientSeeds { label, classes })?;
                let model = rounded_model(mean, std)?;
                debug!(
                    "IntensityModelEstimator seeds label={} n={} mean={} spread={}",
                    label,
                    values.len(),
                    model.mean(),
                    model.spread()
                );
                Ok(model)
            })
            .collect()
    }

    /// Fit the dominant (majority) model over masked voxels.
    pub fn dominant(&self, ctx: &VolumeContext) -> Result<(IntensityModel, Option<DominantBand>)> {
        let ints = ctx.masked_intensities();
        if self.options.simple_estim {
            let (mean, std) = mean_std(&ints).ok_or(SegmentationError::EmptyMask)?;
            let model = rounded_model(mean, std)?;
            debug!(
                "IntensityModelEstimator dominant (simple) mean={} spread={}",
                model.mean(),
                model.spread()
            );
            return Ok((model, None));
        }

        if self.options.bins == 0 {
            return Err(SegmentationError::InvalidParameter {
                name: "bins",
                value: "0".into(),
            });
        }
        let hist = IntensityHistogram::build(&ints, self.options.bins)
            .ok_or(SegmentationError::EmptyMask)?;
        let band = hist.dominant_band(self.options.perc)?;
        let inners: Vec<f64> = ints
            .iter()
            .copied()
            .filter(|&v| band.contains_strictly(v))
            .collect();
        let inner_std = mean_std(&inners).map_or(0.0, |(_, s)| s);
        let model = rounded_model(band.peak_value, self.options.k_std_h * inner_std)?;
        debug!(
            "IntensityModelEstimator dominant band=[{:.2}, {:.2}] half_width={} inside={}/{:.1} inners={} mean={} spread={}",
            band.lower_value,
            band.upper_value,
            band.half_width,
            band.inside,
            band.target,
            inners.len(),
            model.mean(),
            model.spread()
        );
        Ok((model, Some(band)))
    }

    /// Fit the outlier model on `side` of `dominant`.
    ///
    /// Outliers are masked voxels whose dominant density falls below
    /// `prob_w` times the dominant peak density and that lie strictly on the
    /// requested side of the dominant mean.
    pub fn outlier(
        &self,
        ctx: &VolumeContext,
        dominant: &IntensityModel,
        side: OutlierSide,
    ) -> Result<IntensityModel> {
        let center = dominant.mean();
        let threshold = self.options.prob_w * dominant.density(center);
        let on_side = |v: f64| match side {
            OutlierSide::Hypo => v < center,
            OutlierSide::Hyper => v > center,
        };
        let values: Vec<f64> = ctx
            .image()
            .iter()
            .zip(ctx.mask().iter())
            .filter_map(|(&v, &m)| m.then_some(v))
            .filter(|&v| dominant.density(v) < threshold && on_side(v))
            .collect();

        let fitted = Gaussian::fit(&values, MIN_SPREAD).ok_or(
            SegmentationError::DegenerateOutlierFit {
                side,
                dominant_mean: center,
                threshold,
            },
        )?;
        let curve = match side {
            OutlierSide::Hypo => ResponseCurve::Survival,
            OutlierSide::Hyper => ResponseCurve::Cumulative,
        };
        let model = IntensityModel::new(fitted, curve);
        debug!(
            "IntensityModelEstimator {} outliers n={} mean={:.2} spread={:.2}",
            side,
            values.len(),
            model.mean(),
            model.spread()
        );
        Ok(model)
    }
}

fn rounded_model(mean: f64, spread: f64) -> Result<IntensityModel> {
    IntensityModel::gaussian(mean.round(), spread.round().max(MIN_SPREAD))
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
