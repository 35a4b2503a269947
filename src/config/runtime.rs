use super::SegmentationParams;
use crate::solver::{EnergySolver, SolverKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of the `mrf_demo` tool.
#[derive(Debug, Deserialize)]
pub struct RuntimeConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub params: SegmentationParams,
    #[serde(default)]
    pub solver: SolverConfig,
    pub output: OutputConfig,
}

/// Slice images in stack order; mask and seed stacks must match in length.
#[derive(Debug, Deserialize)]
pub struct InputConfig {
    pub slices: Vec<PathBuf>,
    #[serde(default)]
    pub mask: Vec<PathBuf>,
    #[serde(default)]
    pub seeds: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub kind: SolverKind,
    /// Sweep limit for iterated conditional modes.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverKind::Icm,
            max_iterations: 10,
        }
    }
}

impl SolverConfig {
    pub fn build(&self) -> Box<dyn EnergySolver> {
        self.kind.build(self.max_iterations.max(1))
    }
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    pub labels_dir: PathBuf,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub report_json: Option<PathBuf>,
    /// Sampled model curves, for external plotting.
    pub curves_json: Option<PathBuf>,
}

fn default_prefix() -> String {
    "labels".to_string()
}

/// Read [`SegmentationParams`] from a JSON object.
pub fn load_params(path: &Path) -> Result<SegmentationParams, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read params {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse params {}: {e}", path.display()))
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_runtime_config_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str(
            r#"{"input": {"slices": ["a.png", "b.png"]},
                "output": {"labels_dir": "out"}}"#,
        )
        .expect("valid");
        assert_eq!(cfg.input.slices.len(), 2);
        assert!(cfg.input.mask.is_empty());
        assert_eq!(cfg.solver.kind, SolverKind::Icm);
        assert_eq!(cfg.output.prefix, "labels");
        assert_eq!(cfg.params, SegmentationParams::default());
        assert_eq!(cfg.solver.build().name(), "icm");
    }

    #[test]
    fn params_file_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("mrf_params_{}.json", std::process::id()));
        fs::write(&path, r#"{"beta": 2.5, "scale": 0.5}"#).expect("write");
        let params = load_params(&path).expect("valid");
        assert_eq!(params.beta, 2.5);
        assert!(params.needs_rescale());
        let _ = fs::remove_file(&path);

        assert!(load_params(Path::new("/nonexistent/params.json"))
            .unwrap_err()
            .starts_with("Failed to read params"));
    }
}
