use mrf_segmentation::volume::{Shape, Volume};
use statrs::distribution::{ContinuousCDF, Normal};

/// `n` deterministic draws of `N(mean, std)`: the quantiles at `(i + 0.5) / n`,
/// rounded to whole intensities like a quantized image.
pub fn stratified_normal(mean: f64, std: f64, n: usize) -> Vec<f64> {
    let normal = Normal::new(mean, std).expect("valid normal parameters");
    (0..n)
        .map(|i| normal.inverse_cdf((i as f64 + 0.5) / n as f64).round())
        .collect()
}

/// Single-slice 40×50 volume of three row bands: 400 voxels around 50,
/// 1200 around 150 and 400 around 220, all with std 5.
///
/// Rows `0..8` hold the low band, `8..32` the middle one and `32..40` the
/// high one.
pub fn three_band_volume() -> Volume<f64> {
    let mut values = stratified_normal(50.0, 5.0, 400);
    values.extend(stratified_normal(150.0, 5.0, 1200));
    values.extend(stratified_normal(220.0, 5.0, 400));
    Volume::new(Shape::planar(40, 50), values).expect("band sizes match the shape")
}

/// Expected label of a voxel row in [`three_band_volume`].
pub fn three_band_label(row: usize) -> u32 {
    match row {
        0..=7 => 1,
        8..=31 => 2,
        _ => 3,
    }
}

/// 4×4 image of intensity 100 with a 2×2 corner block of 200.
pub fn corner_block_4x4() -> Volume<f64> {
    let mut vol = Volume::filled(Shape::planar(4, 4), 100.0);
    for r in 0..2 {
        for c in 0..2 {
            vol.set(0, r, c, 200.0);
        }
    }
    vol
}

/// Two intensity halves along columns: `lo` left of `split`, `hi` from it on.
pub fn split_volume(shape: Shape, split: usize, lo: f64, hi: f64) -> Volume<f64> {
    let data = (0..shape.len())
        .map(|i| if shape.coords_of(i).2 < split { lo } else { hi })
        .collect();
    Volume::new(shape, data).expect("generated to shape")
}

/// Mask that is false on column `col` of every row and slice.
pub fn column_gap_mask(shape: Shape, col: usize) -> Volume<bool> {
    let data = (0..shape.len()).map(|i| shape.coords_of(i).2 != col).collect();
    Volume::new(shape, data).expect("generated to shape")
}
