//! Working-resolution copies of the inputs and restoration of the labels.
//!
//! Only rows and columns are resampled; the slice axis keeps its extent.
//! Intensities are interpolated linearly, masks, seeds and labels use nearest
//! neighbour so no fractional label appears.

use crate::error::Result;
use crate::volume::{rescale, resize_to_shape, Axis, LabelVolume, ResizeMode, Shape, VolumeContext};

const PRESERVED_AXIS: Axis = Axis::Slice;

/// New context with every input resampled by `scale`; `ctx` is left untouched.
pub(crate) fn working_context(ctx: &VolumeContext, scale: f64) -> Result<VolumeContext> {
    let image = rescale(ctx.image(), scale, PRESERVED_AXIS, ResizeMode::Linear);
    let mask = rescale(ctx.mask(), scale, PRESERVED_AXIS, ResizeMode::Nearest);
    let seeds = ctx
        .seeds()
        .map(|s| rescale(s, scale, PRESERVED_AXIS, ResizeMode::Nearest));
    VolumeContext::new(image, Some(mask), seeds)
}

/// Labels resampled back to `original`.
pub(crate) fn restore_labels(labels: &LabelVolume, original: Shape) -> Result<LabelVolume> {
    resize_to_shape(labels, original, ResizeMode::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Volume;

    #[test]
    fn working_copy_keeps_slices_and_label_values() {
        let shape = Shape::new(2, 4, 6);
        let image = Volume::filled(shape, 50.0);
        let seeds = Volume::new(
            shape,
            (0..shape.len()).map(|i| (i % 3) as u32).collect(),
        )
        .expect("valid");
        let ctx = VolumeContext::new(image, None, Some(seeds)).expect("valid");

        let working = working_context(&ctx, 0.5).expect("valid");
        assert_eq!(working.shape(), Shape::new(2, 2, 3));
        assert!(working.mask().iter().all(|&m| m));
        let seeds = working.seeds().expect("seeds kept");
        assert!(seeds.iter().all(|&l| l <= 2));
        assert_eq!(ctx.shape(), shape, "original untouched");

        let labels = Volume::filled(working.shape(), 2u32);
        let restored = restore_labels(&labels, shape).expect("non-empty");
        assert_eq!(restored.shape(), shape);
        assert!(restored.iter().all(|&l| l == 2));
    }
}
