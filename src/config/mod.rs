//! Configuration surface: segmentation parameters and the demo tool config.

pub mod params;
pub mod runtime;

pub use params::SegmentationParams;
pub use runtime::{load_config, load_params, InputConfig, OutputConfig, RuntimeConfig, SolverConfig};
