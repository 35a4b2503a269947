//! End-to-end segmentation pipeline.
//!
//! Overview
//! - Optionally resamples image, mask and seeds to a working resolution.
//! - Estimates one intensity model per class (seeded or hypo/dominant/hyper).
//! - Converts the models into fixed-point unaries and a Potts pairwise matrix.
//! - Builds the masked grid graph and hands everything to an
//!   [`EnergySolver`](crate::solver::EnergySolver).
//! - Maps solver classes to labels `1..=K` and restores the input resolution.
//!
//! Modules
//! - `segmentation` – the [`SegmentationPipeline`] state machine.
//! - `scaling` – working-resolution copies and label restoration.
//!
//! Stages are cached: models, unaries or the pairwise matrix supplied through
//! the `set_*` overrides are used as-is and only the missing stages are
//! computed.

mod scaling;
mod segmentation;

pub use segmentation::SegmentationPipeline;

use serde::Serialize;

/// Progress of a [`SegmentationPipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStage {
    Uninitialized,
    /// Class models or unaries are available.
    ModelsReady,
    /// The solver input is assembled.
    EnergyReady,
    /// Labels exist at the working resolution.
    Solved,
    /// Labels were resampled back to the input resolution.
    Rescaled,
}
