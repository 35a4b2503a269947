#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod volume;

// Stage modules, usable on their own by callers that drive the steps manually.
pub mod energy;
pub mod graph;
pub mod model;
pub mod solver;

// --- High-level re-exports -------------------------------------------------

pub use crate::config::SegmentationParams;
pub use crate::error::{Result, SegmentationError};
pub use crate::pipeline::{PipelineStage, SegmentationPipeline};
pub use crate::volume::{LabelVolume, Shape, Volume, VolumeContext};

pub use crate::diagnostics::{PipelineTrace, SegmentationReport};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use mrf_segmentation::prelude::*;
///
/// # fn main() -> mrf_segmentation::Result<()> {
/// let (rows, cols) = (64usize, 64usize);
/// let data = (0..rows * cols)
///     .map(|i| if i % cols < cols / 2 { 100.0 } else { 200.0 })
///     .collect();
/// let image = Volume::from_2d(rows, cols, data)?;
///
/// let mut pipeline = SegmentationPipeline::new(
///     VolumeContext::from_image(image),
///     SegmentationParams::default(),
/// )?;
/// pipeline.set_models(vec![
///     IntensityModel::gaussian(100.0, 10.0)?,
///     IntensityModel::gaussian(200.0, 10.0)?,
/// ])?;
/// let labels = pipeline.run(&IteratedConditionalModes::default())?;
/// println!("labels shape={}", labels.shape());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::model::{Distribution, EstimationMode, IntensityModel};
    pub use crate::solver::{EnergySolver, IteratedConditionalModes, WinnerTakesAll};
    pub use crate::{SegmentationParams, SegmentationPipeline, Shape, Volume, VolumeContext};
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    pub use crate::energy::{
        potts_pairwise, sample_curves, unary_costs, EnergyBuilder, EnergyDescription,
        EnergyOptions, PairwiseConvention, UnaryPolicy, UnaryTable,
    };
    pub use crate::graph::{build_edges, grid_edges, prune_edges, Edge, GraphTopology};
    pub use crate::model::{EstimatorOptions, IntensityHistogram, IntensityModelEstimator};

    pub use crate::diagnostics::{
        EnergyStage, InputDescriptor, LabelCount, ModelStage, ModelSummary, SolverStage,
        StageTiming, TimingBreakdown,
    };
}
