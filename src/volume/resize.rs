//! Volume resampling used to run the pipeline at a reduced resolution.
//!
//! Resampling is separable: each resized axis is processed in its own pass.
//! Sample positions use pixel-centre alignment, `src = (dst + 0.5) * n_src / n_dst - 0.5`.
//! Label-like element types (`bool`, `u32`) never interpolate, so masks,
//! seeds and label volumes keep nearest-neighbour semantics regardless of the
//! requested mode.

use super::{Shape, Volume};
use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};

/// Volume axis in `(slice, row, col)` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Slice,
    Row,
    Col,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Slice, Axis::Row, Axis::Col];
}

/// Interpolation used when resampling intensities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    #[default]
    Nearest,
    Linear,
}

/// Element types that can be resampled.
pub trait Resample: Copy {
    /// Blend `a` and `b` at fraction `t ∈ [0, 1]`.
    fn lerp(a: Self, b: Self, t: f64) -> Self;
}

impl Resample for f64 {
    #[inline]
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

macro_rules! nearest_only {
    ($($ty:ty),*) => {$(
        impl Resample for $ty {
            #[inline]
            fn lerp(a: Self, b: Self, t: f64) -> Self {
                if t < 0.5 { a } else { b }
            }
        }
    )*};
}

nearest_only!(bool, u32);

/// Shape after scaling every axis except `preserve` by `scale`.
///
/// Non-empty axes keep at least one voxel; empty axes stay empty.
pub fn scaled_shape(shape: Shape, scale: f64, preserve: Axis) -> Shape {
    let scaled = |axis: Axis| {
        let n = shape.extent(axis);
        if axis == preserve || n == 0 {
            n
        } else {
            ((n as f64 * scale).round() as usize).max(1)
        }
    };
    Shape::new(scaled(Axis::Slice), scaled(Axis::Row), scaled(Axis::Col))
}

/// Scale `volume` by `scale` along the two axes other than `preserve`.
pub fn rescale<T: Resample>(
    volume: &Volume<T>,
    scale: f64,
    preserve: Axis,
    mode: ResizeMode,
) -> Volume<T> {
    let target = scaled_shape(volume.shape(), scale, preserve);
    resample(volume, target, mode)
}

/// Resample `volume` to exactly `target`.
///
/// Used to restore the original resolution after a scaled run, where
/// `1 / scale` alone would not reproduce odd extents. An empty volume can
/// only be resized to an empty shape.
pub fn resize_to_shape<T: Resample>(
    volume: &Volume<T>,
    target: Shape,
    mode: ResizeMode,
) -> Result<Volume<T>> {
    if volume.is_empty() && !target.is_empty() {
        return Err(SegmentationError::shape_mismatch(
            "resample target of an empty volume",
            Shape::new(0, 0, 0),
            target,
        ));
    }
    Ok(resample(volume, target, mode))
}

/// Callers guarantee that an empty source only meets an empty target.
fn resample<T: Resample>(volume: &Volume<T>, target: Shape, mode: ResizeMode) -> Volume<T> {
    let mut out = volume.clone();
    for axis in Axis::ALL {
        let n = target.extent(axis);
        if out.shape().extent(axis) != n {
            out = resize_axis(&out, axis, n, mode);
        }
    }
    out
}

fn resize_axis<T: Resample>(src: &Volume<T>, axis: Axis, target: usize, mode: ResizeMode) -> Volume<T> {
    let src_shape = src.shape();
    let n_src = src_shape.extent(axis);
    let stride = src_shape.stride(axis);
    let dst_shape = with_extent(src_shape, axis, target);
    if dst_shape.is_empty() || n_src == 0 {
        return Volume::from_raw(dst_shape, Vec::new());
    }
    let ratio = n_src as f64 / target as f64;
    let data = src.as_slice();

    let mut out = Vec::with_capacity(dst_shape.len());
    for idx in 0..dst_shape.len() {
        let (s, r, c) = dst_shape.coords_of(idx);
        let (pos, base) = match axis {
            Axis::Slice => (s, src_shape.index_of(0, r, c)),
            Axis::Row => (r, src_shape.index_of(s, 0, c)),
            Axis::Col => (c, src_shape.index_of(s, r, 0)),
        };
        let value = match mode {
            ResizeMode::Nearest => {
                let i = (((pos as f64 + 0.5) * ratio).floor() as usize).min(n_src - 1);
                data[base + i * stride]
            }
            ResizeMode::Linear => {
                let x = ((pos as f64 + 0.5) * ratio - 0.5).clamp(0.0, (n_src - 1) as f64);
                let i0 = x.floor() as usize;
                let i1 = (i0 + 1).min(n_src - 1);
                T::lerp(data[base + i0 * stride], data[base + i1 * stride], x - i0 as f64)
            }
        };
        out.push(value);
    }
    Volume::from_raw(dst_shape, out)
}

fn with_extent(shape: Shape, axis: Axis, n: usize) -> Shape {
    match axis {
        Axis::Slice => Shape::new(n, shape.rows, shape.cols),
        Axis::Row => Shape::new(shape.slices, n, shape.cols),
        Axis::Col => Shape::new(shape.slices, shape.rows, n),
    }
}
