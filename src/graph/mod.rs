//! Grid-graph topology over the voxel lattice.
//!
//! Nodes are flat voxel indices (see [`crate::volume`]). Edges join immediate
//! neighbours along one axis: 4-connectivity for a single slice,
//! 6-connectivity for a stack. Pairs are never repeated and never wrap around
//! a boundary. Edges are emitted axis by axis (columns, rows, slices), each in
//! ascending index order, so the list is deterministic for a given shape and
//! mask.

use crate::error::{Result, SegmentationError};
use crate::volume::{Axis, Shape, Volume};
use log::debug;
use serde::Serialize;

/// Pair of flat voxel indices, lower index first.
pub type Edge = [usize; 2];

const AXIS_ORDER: [Axis; 3] = [Axis::Col, Axis::Row, Axis::Slice];

/// All neighbour pairs of the full lattice.
pub fn grid_edges(shape: Shape) -> Vec<Edge> {
    let capacity: usize = AXIS_ORDER.iter().map(|&a| axis_edge_count(shape, a)).sum();
    let mut edges = Vec::with_capacity(capacity);
    for axis in AXIS_ORDER {
        let stride = shape.stride(axis);
        for idx in 0..shape.len() {
            let (s, r, c) = shape.coords_of(idx);
            let pos = match axis {
                Axis::Slice => s,
                Axis::Row => r,
                Axis::Col => c,
            };
            if pos + 1 < shape.extent(axis) {
                edges.push([idx, idx + stride]);
            }
        }
    }
    edges
}

fn axis_edge_count(shape: Shape, axis: Axis) -> usize {
    let extent = shape.extent(axis);
    if extent == 0 {
        0
    } else {
        shape.len() / extent * (extent - 1)
    }
}

/// Keep only edges whose endpoints are both active in `mask`. Endpoints
/// outside the mask's voxel range count as inactive.
pub fn prune_edges(edges: Vec<Edge>, mask: &Volume<bool>) -> Vec<Edge> {
    let active = mask.as_slice();
    edges
        .into_iter()
        .filter(|&[a, b]| matches!((active.get(a), active.get(b)), (Some(true), Some(true))))
        .collect()
}

/// Neighbour pairs of `shape` restricted to the active region of `mask`.
pub fn build_edges(shape: Shape, mask: &Volume<bool>) -> Result<Vec<Edge>> {
    GraphTopology::build(shape, mask).map(GraphTopology::into_edges)
}

/// Pruned edge list together with its construction statistics.
#[derive(Clone, Debug)]
pub struct GraphTopology {
    shape: Shape,
    edges: Vec<Edge>,
    candidates: usize,
    active_nodes: usize,
}

/// Serializable summary of a [`GraphTopology`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyStats {
    pub dimensions: usize,
    pub candidate_edges: usize,
    pub kept_edges: usize,
    pub active_nodes: usize,
}

impl GraphTopology {
    pub fn build(shape: Shape, mask: &Volume<bool>) -> Result<Self> {
        if mask.shape() != shape {
            return Err(SegmentationError::shape_mismatch("mask", shape, mask.shape()));
        }
        let all = grid_edges(shape);
        let candidates = all.len();
        let edges = prune_edges(all, mask);
        let active_nodes = mask.count_true();
        debug!(
            "GraphTopology::build shape={} candidates={} kept={} active_nodes={}",
            shape,
            candidates,
            edges.len(),
            active_nodes
        );
        Ok(Self {
            shape,
            edges,
            candidates,
            active_nodes,
        })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }

    pub fn stats(&self) -> TopologyStats {
        TopologyStats {
            dimensions: self.shape.ndim(),
            candidate_edges: self.candidates,
            kept_edges: self.edges.len(),
            active_nodes: self.active_nodes,
        }
    }
}
