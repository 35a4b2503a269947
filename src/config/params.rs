//! Segmentation parameters as read from a key/value configuration.
//!
//! Every key is optional; missing keys take the defaults below and unknown
//! keys are ignored.
//!
//! | key | default | meaning |
//! |---|---|---|
//! | `alpha` | 1.0 | pairwise smoothness weight |
//! | `beta` | 1.0 | unary weight |
//! | `scale` | 1.0 | working resolution factor (`<= 0` or `1` keeps the input size) |
//! | `perc` | 30 | percent of masked voxels the dominant band must hold |
//! | `k_std_h` | 3 | dominant spread multiplier |
//! | `domin_simple_estim` | false | plain normal fit for the dominant class |
//! | `prob_w` | 1e-4 | outlier threshold relative to the dominant peak density |
//! | `unaries_as_cdf` | false | cumulative unary policy for the hypo/dominant/hyper triple |
//! | `mean_shift` | 0 | offset added to every model mean before costing |
//! | `models_estim` | auto | `"seeds"` or `"hydohy"`; seeds when a seed volume exists |
//! | `pairwise_convention` | `same_label_bonus` | sign convention of the Potts matrix |
//! | `ret_prob` | false | keep the per-voxel class probability table |

use crate::energy::{EnergyOptions, PairwiseConvention, UnaryPolicy};
use crate::model::{EstimationMode, EstimatorOptions};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    pub alpha: f64,
    pub beta: f64,
    pub scale: f64,
    pub perc: f64,
    pub k_std_h: f64,
    pub domin_simple_estim: bool,
    pub prob_w: f64,
    pub unaries_as_cdf: bool,
    pub mean_shift: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_estim: Option<EstimationMode>,
    pub pairwise_convention: PairwiseConvention,
    pub ret_prob: bool,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            scale: 1.0,
            perc: 30.0,
            k_std_h: 3.0,
            domin_simple_estim: false,
            prob_w: 1e-4,
            unaries_as_cdf: false,
            mean_shift: 0.0,
            models_estim: None,
            pairwise_convention: PairwiseConvention::SameLabelBonus,
            ret_prob: false,
        }
    }
}

impl SegmentationParams {
    pub fn to_estimator_options(&self) -> EstimatorOptions {
        EstimatorOptions {
            perc: self.perc,
            k_std_h: self.k_std_h,
            simple_estim: self.domin_simple_estim,
            prob_w: self.prob_w,
            ..EstimatorOptions::default()
        }
    }

    /// Energy options for models estimated in `mode`. The cumulative policy
    /// only applies to the hypo/dominant/hyper triple; seeded classes are
    /// always costed through their densities.
    pub fn to_energy_options(&self, mode: EstimationMode) -> EnergyOptions {
        EnergyOptions {
            alpha: self.alpha,
            beta: self.beta,
            policy: if self.unaries_as_cdf && mode == EstimationMode::Hydohy {
                UnaryPolicy::Cumulative
            } else {
                UnaryPolicy::Density
            },
            convention: self.pairwise_convention,
            probabilities: self.ret_prob,
        }
    }

    /// `true` when the pipeline should work on a resized copy of the inputs.
    pub fn needs_rescale(&self) -> bool {
        self.scale.is_finite() && self.scale > 0.0 && self.scale != 1.0
    }

    /// Explicit mode, else seeds when seeds are available, else hydohy.
    pub fn resolve_mode(&self, has_seeds: bool) -> EstimationMode {
        self.models_estim.unwrap_or(if has_seeds {
            EstimationMode::Seeds
        } else {
            EstimationMode::Hydohy
        })
    }
}
