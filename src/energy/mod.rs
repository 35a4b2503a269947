//! Energy terms handed to the label solver.
//!
//! Overview
//! - [`unary`] – per-voxel per-class costs under the density or cumulative
//!   policy, the fixed-point conversion and the optional probability table.
//! - [`pairwise`] – the Potts class-pair matrix.
//! - [`builder`] – [`EnergyBuilder`], combining both under [`EnergyOptions`].
//!
//! Costs are computed in `f64` and converted to the solver's `i32` encoding
//! exactly once, after the `beta` weight is applied. The unary table keeps one
//! row per voxel of the full grid (masked-out rows are zero) so the flat
//! indices used by graph edges address it directly.

pub mod builder;
pub mod pairwise;
pub mod unary;

pub use builder::{EnergyBuilder, EnergyTerms};
pub use pairwise::potts_pairwise;
pub use unary::{
    probability_table, sample_curves, to_fixed_point, unary_costs, ModelCurves, COST_CEILING,
};

use crate::error::{Result, SegmentationError};
use crate::graph::Edge;
use crate::volume::Shape;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// How model curves are turned into unary costs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryPolicy {
    /// `-ln density_c(x)` for every class.
    #[default]
    Density,
    /// Hypo / dominant / hyper triple costed through survival, density and CDF.
    Cumulative,
}

/// Sign convention of the Potts matrix handed to the solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairwiseConvention {
    /// `-alpha` on the diagonal, zero elsewhere.
    #[default]
    SameLabelBonus,
    /// Zero on the diagonal, `alpha` elsewhere.
    DifferentLabelPenalty,
}

/// Weights and policies of the energy construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyOptions {
    /// Pairwise smoothness weight.
    pub alpha: f64,
    /// Unary weight applied before fixed-point conversion.
    pub beta: f64,
    pub policy: UnaryPolicy,
    pub convention: PairwiseConvention,
    /// Also produce the per-voxel class probability table.
    pub probabilities: bool,
}

impl Default for EnergyOptions {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            policy: UnaryPolicy::Density,
            convention: PairwiseConvention::SameLabelBonus,
            probabilities: false,
        }
    }
}

/// Dense `[rows × classes]` table stored row-major (one row per voxel).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTable<T> {
    rows: usize,
    classes: usize,
    data: Vec<T>,
}

/// Floating-point unary costs, before weighting.
pub type UnaryCosts = ClassTable<f64>;
/// Fixed-point unary costs in the solver encoding.
pub type UnaryTable = ClassTable<i32>;
/// Per-voxel class probabilities.
pub type ProbabilityTable = ClassTable<f64>;

impl<T> ClassTable<T> {
    pub fn new(rows: usize, classes: usize, data: Vec<T>) -> Result<Self> {
        let expected = rows * classes;
        if data.len() != expected {
            return Err(SegmentationError::shape_mismatch(
                "class table length",
                format!("{rows}x{classes}={expected}"),
                data.len(),
            ));
        }
        Ok(Self {
            rows,
            classes,
            data,
        })
    }

    pub(crate) fn from_raw(rows: usize, classes: usize, data: Vec<T>) -> Self {
        debug_assert_eq!(rows * classes, data.len());
        Self {
            rows,
            classes,
            data,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn classes(&self) -> usize {
        self.classes
    }

    #[inline]
    pub fn row(&self, index: usize) -> &[T] {
        &self.data[index * self.classes..(index + 1) * self.classes]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> ClassTable<U> {
        ClassTable {
            rows: self.rows,
            classes: self.classes,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Copy> ClassTable<T> {
    #[inline]
    pub fn get(&self, row: usize, class: usize) -> T {
        self.data[row * self.classes + class]
    }
}

/// Everything the solver receives: grid shape, unaries, pairwise matrix and
/// the pruned edge list.
#[derive(Clone, Debug)]
pub struct EnergyDescription {
    shape: Shape,
    unaries: UnaryTable,
    pairwise: DMatrix<i32>,
    edges: Vec<Edge>,
}

impl EnergyDescription {
    /// Assemble and validate a description.
    ///
    /// Fails with `ShapeMismatch` when the unary row count differs from the
    /// voxel count or the pairwise matrix is not `K×K`, and with
    /// `InvalidEnergy` for an edge that is out of range or a self-loop.
    pub fn new(
        shape: Shape,
        unaries: UnaryTable,
        pairwise: DMatrix<i32>,
        edges: Vec<Edge>,
    ) -> Result<Self> {
        let desc = Self {
            shape,
            unaries,
            pairwise,
            edges,
        };
        desc.validate()?;
        Ok(desc)
    }

    pub fn validate(&self) -> Result<()> {
        if self.unaries.rows() != self.shape.len() {
            return Err(SegmentationError::shape_mismatch(
                "unary rows",
                self.shape.len(),
                self.unaries.rows(),
            ));
        }
        let k = self.unaries.classes();
        if k == 0 {
            return Err(SegmentationError::InvalidEnergy(
                "unary table has no classes".into(),
            ));
        }
        if self.pairwise.nrows() != k || self.pairwise.ncols() != k {
            return Err(SegmentationError::shape_mismatch(
                "pairwise matrix",
                format!("{k}x{k}"),
                format!("{}x{}", self.pairwise.nrows(), self.pairwise.ncols()),
            ));
        }
        let n = self.shape.len();
        if let Some([a, b]) = self
            .edges
            .iter()
            .find(|[a, b]| *a >= n || *b >= n || a == b)
        {
            return Err(SegmentationError::InvalidEnergy(format!(
                "edge ({a}, {b}) invalid for {n} voxels"
            )));
        }
        Ok(())
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn unaries(&self) -> &UnaryTable {
        &self.unaries
    }

    pub fn pairwise(&self) -> &DMatrix<i32> {
        &self.pairwise
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn n_classes(&self) -> usize {
        self.unaries.classes()
    }

    pub fn n_voxels(&self) -> usize {
        self.unaries.rows()
    }

    pub fn into_parts(self) -> (Shape, UnaryTable, DMatrix<i32>, Vec<Edge>) {
        (self.shape, self.unaries, self.pairwise, self.edges)
    }
}
