//! Potts class-pair matrix.

use super::PairwiseConvention;
use nalgebra::DMatrix;

/// `K×K` Potts matrix scaled by `alpha`, in the solver's integer encoding.
///
/// Both conventions differ by a constant per edge, so a Potts minimizer
/// returns the same labeling for either.
pub fn potts_pairwise(classes: usize, alpha: f64, convention: PairwiseConvention) -> DMatrix<i32> {
    let weight = super::unary::fixed_point(alpha);
    match convention {
        PairwiseConvention::SameLabelBonus => {
            DMatrix::from_fn(classes, classes, |i, j| if i == j { -weight } else { 0 })
        }
        PairwiseConvention::DifferentLabelPenalty => {
            DMatrix::from_fn(classes, classes, |i, j| if i == j { 0 } else { weight })
        }
    }
}
