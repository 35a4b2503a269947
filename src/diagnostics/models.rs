use crate::energy::{PairwiseConvention, UnaryPolicy, UnaryTable};
use crate::model::{Distribution, DominantBand, EstimationMode, IntensityModel, ResponseCurve};
use serde::Serialize;

/// Parameters of one class model.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    /// Label the class receives in the output volume.
    pub label: u32,
    pub mean: f64,
    pub spread: f64,
    pub curve: ResponseCurve,
}

impl ModelSummary {
    pub fn from_models(models: &[IntensityModel]) -> Vec<Self> {
        models
            .iter()
            .enumerate()
            .map(|(i, m)| ModelSummary {
                label: i as u32 + 1,
                mean: m.mean(),
                spread: m.spread(),
                curve: m.curve(),
            })
            .collect()
    }
}

/// Where the class models came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelSource {
    Estimated,
    Provided,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStage {
    pub source: ModelSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<EstimationMode>,
    pub mean_shift: f64,
    pub models: Vec<ModelSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_band: Option<DominantBand>,
}

/// Summary of the energy terms handed to the solver.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyStage {
    pub classes: usize,
    /// `false` when the unaries were supplied by the caller.
    pub computed_unaries: bool,
    pub policy: UnaryPolicy,
    pub convention: PairwiseConvention,
    pub alpha: f64,
    pub beta: f64,
    pub unary_min: i32,
    pub unary_max: i32,
}

impl EnergyStage {
    /// Range of the fixed-point unaries, `(0, 0)` for an empty table.
    pub fn unary_range(unaries: &UnaryTable) -> (i32, i32) {
        let mut it = unaries.as_slice().iter().copied();
        match it.next() {
            Some(first) => it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))),
            None => (0, 0),
        }
    }
}
