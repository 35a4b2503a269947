//! Dense 3-D voxel containers in row-major `(slice, row, col)` layout.
//!
//! Every volume in the crate shares one linearization,
//! `index = (slice * rows + row) * cols + col`, so flat indices produced by the
//! graph builder, rows of the unary table and positions in the solver's label
//! vector all refer to the same voxel. 2-D inputs are promoted to a single
//! slice.

pub mod context;
pub mod io;
pub mod resize;

pub use context::VolumeContext;
pub use resize::{rescale, resize_to_shape, Axis, ResizeMode};

use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extent of a volume along `(slice, row, col)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub slices: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub const fn new(slices: usize, rows: usize, cols: usize) -> Self {
        Self { slices, rows, cols }
    }

    /// Single-slice shape for 2-D inputs.
    pub const fn planar(rows: usize, cols: usize) -> Self {
        Self::new(1, rows, cols)
    }

    /// Total voxel count.
    #[inline]
    pub fn len(&self) -> usize {
        self.slices * self.rows * self.cols
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of spatial axes that carry neighbours (2 for a single slice).
    pub fn ndim(&self) -> usize {
        if self.slices > 1 {
            3
        } else {
            2
        }
    }

    /// Flat row-major index of `(slice, row, col)`.
    #[inline]
    pub fn index_of(&self, slice: usize, row: usize, col: usize) -> usize {
        (slice * self.rows + row) * self.cols + col
    }

    /// Inverse of [`Shape::index_of`].
    #[inline]
    pub fn coords_of(&self, index: usize) -> (usize, usize, usize) {
        let plane = self.rows * self.cols;
        let slice = index / plane;
        let rem = index % plane;
        (slice, rem / self.cols, rem % self.cols)
    }

    pub fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::Slice => self.slices,
            Axis::Row => self.rows,
            Axis::Col => self.cols,
        }
    }

    /// Distance in flat indices between neighbours along `axis`.
    pub fn stride(&self, axis: Axis) -> usize {
        match axis {
            Axis::Slice => self.rows * self.cols,
            Axis::Row => self.cols,
            Axis::Col => 1,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.slices, self.rows, self.cols)
    }
}

/// Owned voxel buffer with a fixed shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Volume<T> {
    shape: Shape,
    data: Vec<T>,
}

/// Integer class labels produced by the pipeline (`1..=K`).
pub type LabelVolume = Volume<u32>;

impl<T> Volume<T> {
    /// Wrap `data` (row-major) as a volume of `shape`.
    pub fn new(shape: Shape, data: Vec<T>) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(SegmentationError::shape_mismatch(
                "volume data length",
                shape.len(),
                data.len(),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Construct without validation; callers guarantee `data.len() == shape.len()`.
    pub(crate) fn from_raw(shape: Shape, data: Vec<T>) -> Self {
        debug_assert_eq!(shape.len(), data.len());
        Self { shape, data }
    }

    /// Promote a row-major 2-D buffer to a single-slice volume.
    pub fn from_2d(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        Self::new(Shape::planar(rows, cols), data)
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Row-major view of one slice.
    pub fn slice(&self, slice: usize) -> &[T] {
        let plane = self.shape.rows * self.shape.cols;
        &self.data[slice * plane..(slice + 1) * plane]
    }

    /// Element-wise conversion into a new volume of the same shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Volume<U> {
        Volume {
            shape: self.shape,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Copy> Volume<T> {
    pub fn filled(shape: Shape, value: T) -> Self {
        Self {
            shape,
            data: vec![value; shape.len()],
        }
    }

    #[inline]
    pub fn get(&self, slice: usize, row: usize, col: usize) -> T {
        self.data[self.shape.index_of(slice, row, col)]
    }

    #[inline]
    pub fn set(&mut self, slice: usize, row: usize, col: usize, value: T) {
        let idx = self.shape.index_of(slice, row, col);
        self.data[idx] = value;
    }
}

impl Volume<bool> {
    /// Number of `true` voxels.
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&m| m).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_through_coords() {
        let shape = Shape::new(3, 4, 5);
        for idx in 0..shape.len() {
            let (s, r, c) = shape.coords_of(idx);
            assert_eq!(shape.index_of(s, r, c), idx);
        }
        assert_eq!(shape.index_of(1, 2, 3), 20 + 10 + 3);
    }

    #[test]
    fn planar_inputs_become_single_slice() {
        let vol = Volume::from_2d(2, 3, vec![1, 2, 3, 4, 5, 6]).expect("valid");
        assert_eq!(vol.shape(), Shape::new(1, 2, 3));
        assert_eq!(vol.shape().ndim(), 2);
        assert_eq!(vol.get(0, 1, 2), 6);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = Volume::new(Shape::new(2, 2, 2), vec![0u8; 7]).unwrap_err();
        assert!(matches!(err, SegmentationError::ShapeMismatch { .. }));
    }

    #[test]
    fn strides_follow_row_major_layout() {
        let shape = Shape::new(2, 3, 4);
        assert_eq!(shape.stride(Axis::Col), 1);
        assert_eq!(shape.stride(Axis::Row), 4);
        assert_eq!(shape.stride(Axis::Slice), 12);
        assert_eq!(shape.extent(Axis::Row), 3);
        assert_eq!(shape.to_string(), "(2, 3, 4)");
    }
}
