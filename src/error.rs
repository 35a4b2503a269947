//! Error taxonomy shared by every stage of the segmentation pipeline.
//!
//! All variants describe structurally invalid input (shape disagreement,
//! degenerate statistics). Nothing here is transient, so callers should not
//! retry: fix the input or the parameters instead.

use crate::model::OutlierSide;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, SegmentationError>;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SegmentationError {
    /// Volume/mask/seed shapes disagree, or an override table does not match
    /// the working voxel grid.
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        found: String,
    },
    /// A seed label in `1..=K` has no voxels.
    #[error("seed label {label} has no voxels (labels 1..={classes} must all be present)")]
    InsufficientSeeds { label: u32, classes: u32 },
    /// Seeded estimation was requested without a seed volume.
    #[error("seeded model estimation requires a seed volume")]
    MissingSeeds,
    /// No voxel qualified as an outlier on the requested side of the dominant model.
    #[error("no {side} outlier voxels found (dominant mean {dominant_mean}, threshold {threshold:.3e})")]
    DegenerateOutlierFit {
        side: OutlierSide,
        dominant_mean: f64,
        threshold: f64,
    },
    /// The dominant-band widening loop covered the whole histogram without
    /// reaching the requested share of masked voxels.
    #[error("dominant band search exhausted {bins} bins at {reached} of {target:.1} voxels (perc={perc})")]
    UnboundedDominantSearch {
        perc: f64,
        bins: usize,
        reached: usize,
        target: f64,
    },
    /// Unrecognised estimation mode string.
    #[error("unknown model estimation mode '{0}' (expected 'seeds' or 'hydohy')")]
    UnknownModelMode(String),
    /// The mask selects no voxel, so no statistic can be estimated.
    #[error("mask selects no voxels")]
    EmptyMask,
    /// A numeric option is outside its valid range.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },
    /// A distribution was requested with a non-finite mean or non-positive spread.
    #[error("invalid model parameters: mean={mean}, spread={spread}")]
    InvalidModel { mean: f64, spread: f64 },
    /// An energy description handed to a solver violates its invariants.
    #[error("invalid energy description: {0}")]
    InvalidEnergy(String),
}

impl SegmentationError {
    pub(crate) fn shape_mismatch(
        what: &'static str,
        expected: impl std::fmt::Display,
        found: impl std::fmt::Display,
    ) -> Self {
        SegmentationError::ShapeMismatch {
            what,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
