//! The [`SegmentationPipeline`] state machine.
//!
//! Typical usage:
//! ```no_run
//! use mrf_segmentation::{SegmentationParams, SegmentationPipeline, VolumeContext};
//! use mrf_segmentation::solver::IteratedConditionalModes;
//! use mrf_segmentation::volume::Volume;
//!
//! # fn example(image: Volume<f64>) -> mrf_segmentation::Result<()> {
//! let ctx = VolumeContext::from_image(image);
//! let mut pipeline = SegmentationPipeline::new(ctx, SegmentationParams::default())?;
//! let report = pipeline.run_with_diagnostics(&IteratedConditionalModes::default())?;
//! println!("labels shape {}", report.labels.shape());
//! # Ok(())
//! # }
//! ```
use super::scaling::{restore_labels, working_context};
use super::PipelineStage;
use crate::config::SegmentationParams;
use crate::diagnostics::{
    EnergyStage, InputDescriptor, LabelCount, ModelSource, ModelStage, ModelSummary, PipelineTrace,
    SegmentationReport, SolverStage, TimingBreakdown,
};
use crate::energy::{
    EnergyBuilder, EnergyDescription, EnergyOptions, ProbabilityTable, UnaryTable,
};
use crate::error::{Result, SegmentationError};
use crate::graph::{GraphTopology, TopologyStats};
use crate::model::{
    recenter_models, DominantBand, EstimationMode, IntensityModel, IntensityModelEstimator,
};
use crate::solver::EnergySolver;
use crate::volume::{LabelVolume, Shape, Volume, VolumeContext};
use log::debug;
use nalgebra::DMatrix;
use std::time::Instant;

/// Segmentation of one volume, from intensity models to a label volume.
pub struct SegmentationPipeline {
    params: SegmentationParams,
    original_shape: Shape,
    working: VolumeContext,
    mode: EstimationMode,
    estimator: IntensityModelEstimator,
    builder: EnergyBuilder,
    models: Option<Vec<IntensityModel>>,
    model_source: ModelSource,
    dominant_band: Option<DominantBand>,
    unaries: Option<UnaryTable>,
    unaries_computed: bool,
    probabilities: Option<ProbabilityTable>,
    pairwise: Option<DMatrix<i32>>,
    pairwise_provided: bool,
    topology: Option<TopologyStats>,
    energy: Option<EnergyDescription>,
    solved: Option<LabelVolume>,
    output: Option<LabelVolume>,
    solver_name: Option<String>,
    timings: TimingBreakdown,
}

impl SegmentationPipeline {
    /// Bind `context` and `params`; resamples the inputs when `params.scale`
    /// asks for a different working resolution.
    pub fn new(context: VolumeContext, params: SegmentationParams) -> Result<Self> {
        let original_shape = context.shape();
        let mode = params.resolve_mode(context.seeds().is_some());
        let mut timings = TimingBreakdown::default();
        let working = if params.needs_rescale() {
            let start = Instant::now();
            let working = working_context(&context, params.scale)?;
            timings.record_since("resize_inputs", start);
            working
        } else {
            context
        };
        debug!(
            "SegmentationPipeline::new original={} working={} masked={} seeds={} mode={}",
            original_shape,
            working.shape(),
            working.masked_count(),
            working.seed_count(),
            mode
        );
        Ok(Self {
            estimator: IntensityModelEstimator::new(params.to_estimator_options()),
            builder: EnergyBuilder::new(params.to_energy_options(mode)),
            params,
            original_shape,
            working,
            mode,
            models: None,
            model_source: ModelSource::Estimated,
            dominant_band: None,
            unaries: None,
            unaries_computed: false,
            probabilities: None,
            pairwise: None,
            pairwise_provided: false,
            topology: None,
            energy: None,
            solved: None,
            output: None,
            solver_name: None,
            timings,
        })
    }

    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    pub fn mode(&self) -> EstimationMode {
        self.mode
    }

    /// Weights and cost policy the energy is built with.
    pub fn energy_options(&self) -> &EnergyOptions {
        self.builder.options()
    }

    /// Inputs at the working resolution.
    pub fn working_context(&self) -> &VolumeContext {
        &self.working
    }

    pub fn stage(&self) -> PipelineStage {
        if self.output.is_some() && self.params.needs_rescale() {
            PipelineStage::Rescaled
        } else if self.solved.is_some() {
            PipelineStage::Solved
        } else if self.energy.is_some() {
            PipelineStage::EnergyReady
        } else if self.models.is_some() || self.unaries.is_some() {
            PipelineStage::ModelsReady
        } else {
            PipelineStage::Uninitialized
        }
    }

    pub fn models(&self) -> Option<&[IntensityModel]> {
        self.models.as_deref()
    }

    pub fn unaries(&self) -> Option<&UnaryTable> {
        self.energy
            .as_ref()
            .map(EnergyDescription::unaries)
            .or(self.unaries.as_ref())
    }

    /// Class probabilities, when `ret_prob` is set and unaries were computed.
    pub fn probabilities(&self) -> Option<&ProbabilityTable> {
        self.probabilities.as_ref()
    }

    pub fn energy(&self) -> Option<&EnergyDescription> {
        self.energy.as_ref()
    }

    /// Use `models` instead of estimating them.
    pub fn set_models(&mut self, models: Vec<IntensityModel>) -> Result<()> {
        if models.is_empty() {
            return Err(SegmentationError::InvalidEnergy("no class models".into()));
        }
        self.invalidate(true);
        self.models = Some(models);
        self.model_source = ModelSource::Provided;
        self.dominant_band = None;
        Ok(())
    }

    /// Use `unaries` instead of costing models; one row per working voxel.
    pub fn set_unaries(&mut self, unaries: UnaryTable) -> Result<()> {
        let voxels = self.working.voxel_count();
        if unaries.rows() != voxels {
            return Err(SegmentationError::shape_mismatch(
                "unaries",
                voxels,
                unaries.rows(),
            ));
        }
        if unaries.classes() == 0 {
            return Err(SegmentationError::InvalidEnergy(
                "unary table has no classes".into(),
            ));
        }
        self.invalidate(true);
        self.unaries = Some(unaries);
        self.unaries_computed = false;
        Ok(())
    }

    /// Use `pairwise` instead of the Potts matrix derived from `alpha`.
    pub fn set_pairwise(&mut self, pairwise: DMatrix<i32>) -> Result<()> {
        if pairwise.nrows() != pairwise.ncols() || pairwise.nrows() == 0 {
            return Err(SegmentationError::shape_mismatch(
                "pairwise matrix",
                "KxK",
                format!("{}x{}", pairwise.nrows(), pairwise.ncols()),
            ));
        }
        self.invalidate(false);
        self.pairwise = Some(pairwise);
        self.pairwise_provided = true;
        Ok(())
    }

    /// Drop cached results downstream of an override. Unaries survive unless
    /// `drop_unaries` is set.
    fn invalidate(&mut self, drop_unaries: bool) {
        if let Some(energy) = self.energy.take() {
            let (_, unaries, _, _) = energy.into_parts();
            self.unaries = Some(unaries);
        }
        if drop_unaries {
            self.unaries = None;
            self.probabilities = None;
        }
        if !self.pairwise_provided {
            self.pairwise = None;
        }
        self.topology = None;
        self.solved = None;
        self.output = None;
        self.solver_name = None;
    }

    /// Estimate the class models unless they are already known.
    pub fn prepare_models(&mut self) -> Result<&[IntensityModel]> {
        self.ensure_models()?;
        Ok(self.models.as_deref().unwrap_or(&[]))
    }

    fn ensure_models(&mut self) -> Result<()> {
        if self.models.is_some() {
            return Ok(());
        }
        let start = Instant::now();
        let estimate = self.estimator.estimate_detailed(&self.working, self.mode)?;
        self.timings.record_since("estimate_models", start);
        debug!(
            "SegmentationPipeline::prepare_models mode={} classes={}",
            estimate.mode,
            estimate.models.len()
        );
        self.models = Some(estimate.models);
        self.model_source = ModelSource::Estimated;
        self.dominant_band = estimate.dominant_band;
        Ok(())
    }

    fn compute_unaries(&mut self) -> Result<UnaryTable> {
        self.ensure_models()?;
        let models = self.models.as_deref().unwrap_or(&[]);
        let start = Instant::now();
        let shift = self.params.mean_shift;
        let costed = if shift != 0.0 {
            recenter_models(models, shift)?
        } else {
            models.to_vec()
        };
        let terms = self
            .builder
            .build(&costed, self.working.image(), self.working.mask())?;
        self.timings.record_since("build_unaries", start);
        if self.pairwise.is_none() {
            self.pairwise = Some(terms.pairwise);
        }
        self.probabilities = terms.probabilities;
        self.unaries_computed = true;
        Ok(terms.unaries)
    }

    /// Assemble the solver input, computing whatever is not cached yet.
    pub fn prepare_energy(&mut self) -> Result<&EnergyDescription> {
        if self.energy.is_none() {
            let unaries = match self.unaries.take() {
                Some(unaries) => unaries,
                None => self.compute_unaries()?,
            };
            let k = unaries.classes();
            let pairwise = match self.pairwise.clone() {
                Some(p) => p,
                None => {
                    let p = self.builder.pairwise(k);
                    self.pairwise = Some(p.clone());
                    p
                }
            };
            if pairwise.nrows() != k || pairwise.ncols() != k {
                let found = format!("{}x{}", pairwise.nrows(), pairwise.ncols());
                self.unaries = Some(unaries);
                return Err(SegmentationError::shape_mismatch(
                    "pairwise matrix",
                    format!("{k}x{k}"),
                    found,
                ));
            }

            let start = Instant::now();
            let topology = GraphTopology::build(self.working.shape(), self.working.mask())?;
            self.timings.record_since("build_graph", start);
            self.topology = Some(topology.stats());

            let energy =
                EnergyDescription::new(self.working.shape(), unaries, pairwise, topology.into_edges())?;
            debug!(
                "SegmentationPipeline::prepare_energy voxels={} classes={} edges={}",
                energy.n_voxels(),
                energy.n_classes(),
                energy.edges().len()
            );
            self.energy = Some(energy);
        }
        self.energy
            .as_ref()
            .ok_or_else(|| SegmentationError::InvalidEnergy("energy was not assembled".into()))
    }

    /// Solve and return labels `1..=K` at the input resolution.
    pub fn run(&mut self, solver: &dyn EnergySolver) -> Result<LabelVolume> {
        if let Some(output) = &self.output {
            return Ok(output.clone());
        }
        self.prepare_energy()?;
        let energy = self
            .energy
            .as_ref()
            .ok_or_else(|| SegmentationError::InvalidEnergy("energy was not assembled".into()))?;

        let start = Instant::now();
        let raw = solver.solve(energy)?;
        if raw.len() != energy.n_voxels() {
            return Err(SegmentationError::shape_mismatch(
                "solver labels",
                energy.n_voxels(),
                raw.len(),
            ));
        }
        let k = energy.n_classes();
        if let Some(bad) = raw.iter().find(|&&l| l as usize >= k) {
            return Err(SegmentationError::InvalidEnergy(format!(
                "solver {} returned class {bad} for {k} classes",
                solver.name()
            )));
        }
        let labels = Volume::new(self.working.shape(), raw.into_iter().map(|l| l + 1).collect())?;
        self.timings.record_since("solve", start);

        let output = if self.params.needs_rescale() {
            let start = Instant::now();
            let restored = restore_labels(&labels, self.original_shape)?;
            self.timings.record_since("restore_shape", start);
            restored
        } else {
            labels.clone()
        };
        debug!(
            "SegmentationPipeline::run solver={} classes={} output={}",
            solver.name(),
            k,
            output.shape()
        );
        self.solver_name = Some(solver.name().to_string());
        self.solved = Some(labels);
        self.output = Some(output.clone());
        Ok(output)
    }

    /// [`run`](Self::run) plus a trace of every stage.
    pub fn run_with_diagnostics(&mut self, solver: &dyn EnergySolver) -> Result<SegmentationReport> {
        let labels = self.run(solver)?;
        let trace = self.trace(&labels)?;
        Ok(SegmentationReport { labels, trace })
    }

    fn trace(&self, labels: &LabelVolume) -> Result<PipelineTrace> {
        let energy = self
            .energy
            .as_ref()
            .ok_or_else(|| SegmentationError::InvalidEnergy("energy was not assembled".into()))?;
        let options = self.builder.options();
        let (unary_min, unary_max) = EnergyStage::unary_range(energy.unaries());
        let models = match (&self.models, self.unaries_computed) {
            (Some(models), true) => Some(ModelStage {
                source: self.model_source,
                mode: (self.model_source == ModelSource::Estimated).then_some(self.mode),
                mean_shift: self.params.mean_shift,
                models: ModelSummary::from_models(models),
                dominant_band: self.dominant_band.clone(),
            }),
            _ => None,
        };
        Ok(PipelineTrace {
            input: InputDescriptor {
                original_shape: self.original_shape,
                working_shape: self.working.shape(),
                masked_voxels: self.working.masked_count(),
                seed_voxels: self.working.seed_count(),
                scale: if self.params.needs_rescale() {
                    self.params.scale
                } else {
                    1.0
                },
            },
            timings: self.timings.clone(),
            models,
            energy: EnergyStage {
                classes: energy.n_classes(),
                computed_unaries: self.unaries_computed,
                policy: options.policy,
                convention: options.convention,
                alpha: options.alpha,
                beta: options.beta,
                unary_min,
                unary_max,
            },
            graph: self.topology.clone().ok_or_else(|| {
                SegmentationError::InvalidEnergy("graph topology was not built".into())
            })?,
            solver: SolverStage {
                name: self.solver_name.clone().unwrap_or_default(),
                label_counts: LabelCount::tally(labels, energy.n_classes()),
            },
        })
    }
}
