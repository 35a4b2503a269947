//! Serializable reports describing a segmentation run.
//!
//! `SegmentationReport` is returned by
//! [`SegmentationPipeline::run_with_diagnostics`](crate::SegmentationPipeline):
//! the label volume plus a `PipelineTrace` covering inputs, estimated models,
//! energy terms, graph topology, solver output and per-stage timings.

pub mod models;
pub mod pipeline;
pub mod timing;

pub use models::{EnergyStage, ModelSource, ModelStage, ModelSummary};
pub use pipeline::{InputDescriptor, LabelCount, PipelineTrace, SegmentationReport, SolverStage};
pub use timing::{StageTiming, TimingBreakdown};
