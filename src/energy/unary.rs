//! Unary costs, probability tables and the fixed-point conversion.
//!
//! Density policy: `cost_c(x) = -ln density_c(x)` for every class.
//!
//! Cumulative policy, for the ordered `[hypo, dominant, hyper]` triple:
//! - hypo: `-ln(sf_hypo(x) * density_dom(mean_dom))`; zero survival values are
//!   replaced by the smallest positive survival seen over masked voxels,
//! - dominant: `-ln density_dom(x)`,
//! - hyper: `-ln cdf_hyper(x)`,
//!
//! and any remaining NaN cost becomes zero. Voxels outside the mask get zero
//! cost under both policies.

use super::{ClassTable, ProbabilityTable, UnaryCosts, UnaryPolicy, UnaryTable};
use crate::error::{Result, SegmentationError};
use crate::model::{Distribution, IntensityModel};
use crate::volume::{Shape, Volume};
use log::debug;
use serde::Serialize;

/// Magnitude at which fixed-point costs saturate.
pub const COST_CEILING: f64 = 1e6;

/// Models of the cumulative policy, in class order.
const CUMULATIVE_CLASSES: usize = 3;

/// Round to the solver encoding: NaN maps to zero, everything else saturates
/// at `±COST_CEILING`.
pub(crate) fn fixed_point(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(-COST_CEILING, COST_CEILING) as i32
}

/// Apply `beta` and convert every cost to the solver encoding.
pub fn to_fixed_point(costs: &UnaryCosts, beta: f64) -> UnaryTable {
    costs.map(|&c| fixed_point(beta * c))
}

/// Per-voxel per-class costs in `f64`, one row per voxel of `image`.
pub fn unary_costs(
    models: &[IntensityModel],
    image: &Volume<f64>,
    mask: &Volume<bool>,
    policy: UnaryPolicy,
) -> Result<UnaryCosts> {
    check_inputs(models, image, mask, policy)?;
    let table = match policy {
        UnaryPolicy::Density => fill(models.len(), image, mask, |x, row| {
            for (cost, model) in row.iter_mut().zip(models) {
                *cost = -model.log_density(x);
            }
        }),
        UnaryPolicy::Cumulative => cumulative_costs(models, image, mask),
    };
    Ok(table)
}

fn cumulative_costs(models: &[IntensityModel], image: &Volume<f64>, mask: &Volume<bool>) -> UnaryCosts {
    let (hypo, dominant, hyper) = (&models[0], &models[1], &models[2]);
    let scale = dominant.density(dominant.mean());

    let mut zeros = 0usize;
    let mut floor = f64::INFINITY;
    for (&x, &m) in image.iter().zip(mask.iter()) {
        if !m {
            continue;
        }
        let sf = hypo.survival(x);
        if sf == 0.0 {
            zeros += 1;
        } else if sf > 0.0 && sf < floor {
            floor = sf;
        }
    }
    if !floor.is_finite() {
        floor = f64::MIN_POSITIVE;
    }
    if zeros > 0 {
        debug!(
            "unary_costs cumulative: replaced {} zero survival values with {:e}",
            zeros, floor
        );
    }

    let mut nans = 0usize;
    let table = fill(CUMULATIVE_CLASSES, image, mask, |x, row| {
        let sf = hypo.survival(x);
        let sf = if sf == 0.0 { floor } else { sf };
        row[0] = -(sf * scale).ln();
        row[1] = -dominant.log_density(x);
        row[2] = -hyper.log_cumulative(x);
        for cost in row.iter_mut().filter(|c| c.is_nan()) {
            *cost = 0.0;
            nans += 1;
        }
    });
    if nans > 0 {
        debug!("unary_costs cumulative: {} NaN costs set to 0", nans);
    }
    table
}

/// Class probabilities per voxel.
///
/// Under the cumulative policy the hypo survival and hyper CDF columns are
/// rescaled so that their maximum over masked voxels equals the dominant
/// density maximum.
pub fn probability_table(
    models: &[IntensityModel],
    image: &Volume<f64>,
    mask: &Volume<bool>,
    policy: UnaryPolicy,
) -> Result<ProbabilityTable> {
    check_inputs(models, image, mask, policy)?;
    let table = match policy {
        UnaryPolicy::Density => fill(models.len(), image, mask, |x, row| {
            for (p, model) in row.iter_mut().zip(models) {
                *p = model.density(x);
            }
        }),
        UnaryPolicy::Cumulative => {
            let (hypo, dominant, hyper) = (&models[0], &models[1], &models[2]);
            let mut table = fill(CUMULATIVE_CLASSES, image, mask, |x, row| {
                row[0] = hypo.survival(x);
                row[1] = dominant.density(x);
                row[2] = hyper.cumulative(x);
            });
            let reference = column_max(&table, 1);
            for class in [0, 2] {
                let max = column_max(&table, class);
                if max > 0.0 && reference > 0.0 {
                    let factor = reference / max;
                    for row in table.data.chunks_mut(CUMULATIVE_CLASSES) {
                        row[class] *= factor;
                    }
                }
            }
            table
        }
    };
    Ok(table)
}

/// Probability and cost curves of `models` sampled over an intensity axis.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCurves {
    pub intensities: Vec<f64>,
    pub probabilities: ProbabilityTable,
    pub unaries: UnaryCosts,
}

/// Sample `n` evenly spaced intensities in `[lo, hi]` and evaluate both tables.
pub fn sample_curves(
    models: &[IntensityModel],
    policy: UnaryPolicy,
    lo: f64,
    hi: f64,
    n: usize,
) -> Result<ModelCurves> {
    let step = if n > 1 { (hi - lo) / (n - 1) as f64 } else { 0.0 };
    let intensities: Vec<f64> = (0..n).map(|i| lo + step * i as f64).collect();
    let axis = Volume::new(Shape::planar(1, n), intensities.clone())?;
    let mask = Volume::filled(axis.shape(), true);
    Ok(ModelCurves {
        probabilities: probability_table(models, &axis, &mask, policy)?,
        unaries: unary_costs(models, &axis, &mask, policy)?,
        intensities,
    })
}

fn check_inputs(
    models: &[IntensityModel],
    image: &Volume<f64>,
    mask: &Volume<bool>,
    policy: UnaryPolicy,
) -> Result<()> {
    if image.shape() != mask.shape() {
        return Err(SegmentationError::shape_mismatch(
            "mask",
            image.shape(),
            mask.shape(),
        ));
    }
    if models.is_empty() {
        return Err(SegmentationError::InvalidEnergy("no class models".into()));
    }
    if policy == UnaryPolicy::Cumulative && models.len() != CUMULATIVE_CLASSES {
        return Err(SegmentationError::shape_mismatch(
            "cumulative unary models",
            CUMULATIVE_CLASSES,
            models.len(),
        ));
    }
    Ok(())
}

/// Table with `classes` columns; `f` fills the rows of masked voxels.
fn fill(
    classes: usize,
    image: &Volume<f64>,
    mask: &Volume<bool>,
    mut f: impl FnMut(f64, &mut [f64]),
) -> ClassTable<f64> {
    let mut data = vec![0.0; image.len() * classes];
    for ((&x, &m), row) in image
        .iter()
        .zip(mask.iter())
        .zip(data.chunks_mut(classes))
    {
        if m {
            f(x, row);
        }
    }
    ClassTable::from_raw(image.len(), classes, data)
}

fn column_max(table: &ClassTable<f64>, class: usize) -> f64 {
    (0..table.rows())
        .map(|r| table.get(r, class))
        .filter(|p| p.is_finite())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gaussian, ResponseCurve};

    fn triple() -> Vec<IntensityModel> {
        vec![
            IntensityModel::new(Gaussian::new(0.0, 1.0).expect("valid"), ResponseCurve::Survival),
            IntensityModel::gaussian(100.0, 5.0).expect("valid"),
            IntensityModel::new(
                Gaussian::new(200.0, 5.0).expect("valid"),
                ResponseCurve::Cumulative,
            ),
        ]
    }

    fn line(values: Vec<f64>) -> (Volume<f64>, Volume<bool>) {
        let image = Volume::new(Shape::planar(1, values.len()), values).expect("valid");
        let mask = Volume::filled(image.shape(), true);
        (image, mask)
    }

    #[test]
    fn density_costs_are_negative_log_densities() {
        let models = vec![
            IntensityModel::gaussian(100.0, 5.0).expect("valid"),
            IntensityModel::gaussian(200.0, 5.0).expect("valid"),
        ];
        let (image, _) = line(vec![100.0, 200.0, 150.0]);
        let mask = Volume::new(image.shape(), vec![true, true, false]).expect("valid");
        let costs = unary_costs(&models, &image, &mask, UnaryPolicy::Density).expect("valid");
        assert_eq!(costs.rows(), 3);
        assert_eq!(costs.classes(), 2);
        let expected = -models[0].density(100.0).ln();
        assert!((costs.get(0, 0) - expected).abs() < 1e-9);
        assert!(costs.get(0, 0) < costs.get(0, 1));
        assert!(costs.get(1, 1) < costs.get(1, 0));
        assert_eq!(costs.row(2), &[0.0, 0.0], "masked-out voxels cost nothing");
    }

    #[test]
    fn zero_survival_is_replaced_before_the_logarithm() {
        // sf of N(0, 1) underflows to exactly zero at x = 100
        let models = triple();
        assert_eq!(models[0].survival(100.0), 0.0);
        let (image, mask) = line(vec![0.0, 100.0]);
        let costs = unary_costs(&models, &image, &mask, UnaryPolicy::Cumulative).expect("valid");
        assert!(costs.as_slice().iter().all(|c| c.is_finite()));
        // the zero survival at voxel 1 takes the smallest observed value (0.5)
        assert!((costs.get(1, 0) - costs.get(0, 0)).abs() < 1e-12);

        let table = to_fixed_point(&costs, 1.0);
        assert!(table
            .as_slice()
            .iter()
            .all(|&c| (c as f64).abs() < COST_CEILING));
    }

    #[test]
    fn all_zero_survival_falls_back_to_min_positive() {
        let (image, mask) = line(vec![100.0, 120.0]);
        let costs = unary_costs(&triple(), &image, &mask, UnaryPolicy::Cumulative).expect("valid");
        let scale = triple()[1].density(100.0);
        let expected = -(f64::MIN_POSITIVE * scale).ln();
        assert!((costs.get(0, 0) - expected).abs() < 1e-9);
        assert!(costs.get(1, 0).is_finite());
    }

    #[test]
    fn nan_intensities_cost_zero_under_cumulative_policy() {
        let (image, mask) = line(vec![f64::NAN, 100.0]);
        let costs = unary_costs(&triple(), &image, &mask, UnaryPolicy::Cumulative).expect("valid");
        assert_eq!(costs.row(0), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn cumulative_policy_needs_exactly_three_models() {
        let (image, mask) = line(vec![1.0]);
        let models = &triple()[..2];
        let err = unary_costs(models, &image, &mask, UnaryPolicy::Cumulative).unwrap_err();
        assert!(matches!(
            err,
            SegmentationError::ShapeMismatch {
                what: "cumulative unary models",
                ..
            }
        ));
    }

    #[test]
    fn fixed_point_rounds_once_and_saturates() {
        assert_eq!(fixed_point(2.5), 3);
        assert_eq!(fixed_point(-2.4), -2);
        assert_eq!(fixed_point(f64::NAN), 0);
        assert_eq!(fixed_point(f64::INFINITY), COST_CEILING as i32);
        assert_eq!(fixed_point(-1e12), -(COST_CEILING as i32));

        let costs = ClassTable::new(1, 2, vec![0.4, 0.4]).expect("valid");
        // beta applied before rounding: 0.4 * 3 = 1.2 -> 1, not 0 * 3
        assert_eq!(to_fixed_point(&costs, 3.0).row(0), &[1, 1]);
    }

    #[test]
    fn cumulative_probabilities_share_the_dominant_maximum() {
        let (image, mask) = line(vec![0.0, 50.0, 100.0, 150.0, 200.0]);
        let models = triple();
        let p = probability_table(&models, &image, &mask, UnaryPolicy::Cumulative).expect("valid");
        let dominant_max = models[1].density(100.0);
        let col_max = |c: usize| (0..p.rows()).map(|r| p.get(r, c)).fold(0.0, f64::max);
        assert!((col_max(0) - dominant_max).abs() < 1e-15);
        assert!((col_max(2) - dominant_max).abs() < 1e-15);
        assert!((col_max(1) - dominant_max).abs() < 1e-15);
    }

    #[test]
    fn sampled_curves_cover_the_axis() {
        let curves = sample_curves(&triple(), UnaryPolicy::Density, 0.0, 250.0, 11).expect("valid");
        assert_eq!(curves.intensities.len(), 11);
        assert_eq!(curves.intensities[10], 250.0);
        assert_eq!(curves.probabilities.rows(), 11);
        assert_eq!(curves.unaries.classes(), 3);
    }
}
