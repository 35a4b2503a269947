use crate::diagnostics::{EnergyStage, ModelStage, TimingBreakdown};
use crate::graph::TopologyStats;
use crate::volume::{LabelVolume, Shape};
use serde::Serialize;

/// Result of [`SegmentationPipeline::run_with_diagnostics`](crate::SegmentationPipeline).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationReport {
    #[serde(skip)]
    pub labels: LabelVolume,
    pub trace: PipelineTrace,
}

/// What the pipeline did to produce the labels.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub input: InputDescriptor,
    pub timings: TimingBreakdown,
    /// Absent when the caller supplied unaries directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelStage>,
    pub energy: EnergyStage,
    pub graph: TopologyStats,
    pub solver: SolverStage,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub original_shape: Shape,
    pub working_shape: Shape,
    pub masked_voxels: usize,
    pub seed_voxels: usize,
    pub scale: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverStage {
    pub name: String,
    /// Voxel count per output label, in label order.
    pub label_counts: Vec<LabelCount>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelCount {
    pub label: u32,
    pub voxels: usize,
}

impl LabelCount {
    /// Histogram of labels `1..=classes` (other values ignored).
    pub fn tally(labels: &LabelVolume, classes: usize) -> Vec<LabelCount> {
        let mut counts = vec![0usize; classes];
        for &l in labels.iter() {
            if l >= 1 && (l as usize) <= classes {
                counts[l as usize - 1] += 1;
            }
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, voxels)| LabelCount {
                label: i as u32 + 1,
                voxels,
            })
            .collect()
    }
}
