use serde::Serialize;
use std::time::Instant;

/// Milliseconds one pipeline stage took. A stage that runs more than once
/// (e.g. a re-solve after an override) appears once per run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: f64,
}

/// Stage timings of one segmentation run in execution order.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    /// Sum of every recorded stage.
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, stage: impl Into<String>, elapsed_ms: f64) {
        self.total_ms += elapsed_ms;
        self.stages.push(StageTiming {
            stage: stage.into(),
            elapsed_ms,
        });
    }

    /// Record the wall-clock time since `start` under `stage`.
    pub fn record_since(&mut self, stage: impl Into<String>, start: Instant) {
        self.push(stage, start.elapsed().as_secs_f64() * 1000.0);
    }

    /// Summed time of every entry named `stage`.
    pub fn stage_ms(&self, stage: &str) -> Option<f64> {
        self.stages
            .iter()
            .filter(|s| s.stage == stage)
            .map(|s| s.elapsed_ms)
            .reduce(|a, b| a + b)
    }
}
