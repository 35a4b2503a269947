//! Input bundle for one segmentation run: intensities, active-region mask and
//! optional seed labels, validated to share one shape.

use super::{Shape, Volume};
use crate::error::{Result, SegmentationError};

/// Read-only inputs of a pipeline run.
///
/// The mask defaults to all-true. Seeds use `0` for unlabeled voxels and
/// `1..=K` for class labels.
#[derive(Clone, Debug)]
pub struct VolumeContext {
    image: Volume<f64>,
    mask: Volume<bool>,
    seeds: Option<Volume<u32>>,
}

impl VolumeContext {
    pub fn new(
        image: Volume<f64>,
        mask: Option<Volume<bool>>,
        seeds: Option<Volume<u32>>,
    ) -> Result<Self> {
        let shape = image.shape();
        let mask = match mask {
            Some(mask) => {
                check_shape("mask", shape, mask.shape())?;
                mask
            }
            None => Volume::filled(shape, true),
        };
        if let Some(seeds) = &seeds {
            check_shape("seeds", shape, seeds.shape())?;
        }
        Ok(Self { image, mask, seeds })
    }

    /// Context without mask or seeds.
    pub fn from_image(image: Volume<f64>) -> Self {
        let mask = Volume::filled(image.shape(), true);
        Self {
            image,
            mask,
            seeds: None,
        }
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.image.shape()
    }

    pub fn image(&self) -> &Volume<f64> {
        &self.image
    }

    pub fn mask(&self) -> &Volume<bool> {
        &self.mask
    }

    pub fn seeds(&self) -> Option<&Volume<u32>> {
        self.seeds.as_ref()
    }

    pub fn voxel_count(&self) -> usize {
        self.shape().len()
    }

    pub fn masked_count(&self) -> usize {
        self.mask.count_true()
    }

    /// Number of labeled seed voxels (0 without seeds).
    pub fn seed_count(&self) -> usize {
        self.seeds
            .as_ref()
            .map_or(0, |s| s.iter().filter(|&&l| l > 0).count())
    }

    /// Highest seed label, i.e. the class count implied by the seeds.
    pub fn seed_classes(&self) -> Option<u32> {
        self.seeds
            .as_ref()
            .and_then(|s| s.iter().copied().max())
            .filter(|&k| k > 0)
    }

    /// Intensities of voxels selected by the mask, in flat-index order.
    pub fn masked_intensities(&self) -> Vec<f64> {
        self.image
            .iter()
            .zip(self.mask.iter())
            .filter_map(|(&v, &m)| m.then_some(v))
            .collect()
    }
}

fn check_shape(what: &'static str, expected: Shape, found: Shape) -> Result<()> {
    if expected != found {
        return Err(SegmentationError::shape_mismatch(what, expected, found));
    }
    Ok(())
}
