use super::pairwise::potts_pairwise;
use super::unary::{probability_table, to_fixed_point, unary_costs};
use super::{EnergyOptions, ProbabilityTable, UnaryTable};
use crate::error::Result;
use crate::model::IntensityModel;
use crate::volume::Volume;
use log::debug;
use nalgebra::DMatrix;

/// Unary and pairwise terms for one set of class models.
#[derive(Clone, Debug)]
pub struct EnergyTerms {
    pub unaries: UnaryTable,
    pub pairwise: DMatrix<i32>,
    pub probabilities: Option<ProbabilityTable>,
}

/// Turns class models into solver-ready energy terms.
#[derive(Clone, Debug, Default)]
pub struct EnergyBuilder {
    options: EnergyOptions,
}

impl EnergyBuilder {
    pub fn new(options: EnergyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EnergyOptions {
        &self.options
    }

    /// Unaries weighted by `beta` in fixed point, plus the Potts matrix for
    /// `models.len()` classes weighted by `alpha`.
    pub fn build(
        &self,
        models: &[IntensityModel],
        image: &Volume<f64>,
        mask: &Volume<bool>,
    ) -> Result<EnergyTerms> {
        let costs = unary_costs(models, image, mask, self.options.policy)?;
        let unaries = to_fixed_point(&costs, self.options.beta);
        let pairwise = self.pairwise(models.len());
        let probabilities = if self.options.probabilities {
            Some(probability_table(models, image, mask, self.options.policy)?)
        } else {
            None
        };
        debug!(
            "EnergyBuilder::build voxels={} classes={} policy={:?} alpha={} beta={}",
            unaries.rows(),
            unaries.classes(),
            self.options.policy,
            self.options.alpha,
            self.options.beta
        );
        Ok(EnergyTerms {
            unaries,
            pairwise,
            probabilities,
        })
    }

    pub fn pairwise(&self, classes: usize) -> DMatrix<i32> {
        potts_pairwise(classes, self.options.alpha, self.options.convention)
    }
}
