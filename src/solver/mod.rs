//! Label solvers consuming an [`EnergyDescription`].
//!
//! [`EnergySolver`] is the seam for an external min-cut / alpha-expansion
//! minimizer: it receives the fixed-point unaries, the pairwise matrix and the
//! pruned edge list, and returns one 0-based class index per voxel in flat
//! index order. Two small reference solvers are provided:
//! - [`WinnerTakesAll`] ignores the pairwise term and picks the cheapest class,
//! - [`IteratedConditionalModes`] starts from that labeling and greedily
//!   lowers the full energy one voxel at a time.

use crate::energy::EnergyDescription;
use crate::error::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// Minimizer of a pairwise MRF energy.
pub trait EnergySolver {
    fn name(&self) -> &'static str;

    /// 0-based class index per voxel, `energy.n_voxels()` entries.
    fn solve(&self, energy: &EnergyDescription) -> Result<Vec<u32>>;
}

/// Per-voxel arg-min of the unary costs; ties go to the lower class.
#[derive(Clone, Copy, Debug, Default)]
pub struct WinnerTakesAll;

impl EnergySolver for WinnerTakesAll {
    fn name(&self) -> &'static str {
        "winner_takes_all"
    }

    fn solve(&self, energy: &EnergyDescription) -> Result<Vec<u32>> {
        energy.validate()?;
        Ok(unary_argmin(energy))
    }
}

fn unary_argmin(energy: &EnergyDescription) -> Vec<u32> {
    let unaries = energy.unaries();
    (0..unaries.rows())
        .map(|v| {
            let row = unaries.row(v);
            let mut best = 0;
            for (k, &cost) in row.iter().enumerate() {
                if cost < row[best] {
                    best = k;
                }
            }
            best as u32
        })
        .collect()
}

/// Greedy coordinate descent on the full energy (ICM).
#[derive(Clone, Copy, Debug)]
pub struct IteratedConditionalModes {
    /// Upper bound on full sweeps over the voxels.
    pub max_iterations: usize,
}

impl Default for IteratedConditionalModes {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// Neighbour lists in compressed form. `first` marks whether the voxel is the
/// first endpoint of the edge, which selects the pairwise matrix orientation.
struct Adjacency {
    offsets: Vec<usize>,
    neighbours: Vec<(usize, bool)>,
}

impl Adjacency {
    fn new(n: usize, edges: &[[usize; 2]]) -> Self {
        let mut degree = vec![0usize; n + 1];
        for &[a, b] in edges {
            degree[a + 1] += 1;
            degree[b + 1] += 1;
        }
        for i in 0..n {
            degree[i + 1] += degree[i];
        }
        let offsets = degree;
        let mut cursor = offsets.clone();
        let mut neighbours = vec![(0usize, false); offsets[n]];
        for &[a, b] in edges {
            neighbours[cursor[a]] = (b, true);
            cursor[a] += 1;
            neighbours[cursor[b]] = (a, false);
            cursor[b] += 1;
        }
        Self {
            offsets,
            neighbours,
        }
    }

    fn of(&self, v: usize) -> &[(usize, bool)] {
        &self.neighbours[self.offsets[v]..self.offsets[v + 1]]
    }
}

impl EnergySolver for IteratedConditionalModes {
    fn name(&self) -> &'static str {
        "icm"
    }

    fn solve(&self, energy: &EnergyDescription) -> Result<Vec<u32>> {
        energy.validate()?;
        let n = energy.n_voxels();
        let k = energy.n_classes();
        let unaries = energy.unaries();
        let pairwise = energy.pairwise();
        let adjacency = Adjacency::new(n, energy.edges());
        let mut labels = unary_argmin(energy);

        let mut sweeps = 0;
        while sweeps < self.max_iterations {
            sweeps += 1;
            let mut changed = 0usize;
            for v in 0..n {
                let neighbours = adjacency.of(v);
                if neighbours.is_empty() {
                    continue;
                }
                let local = |class: usize| -> i64 {
                    let mut e = unaries.get(v, class) as i64;
                    for &(u, first) in neighbours {
                        let other = labels[u] as usize;
                        let term = if first {
                            pairwise[(class, other)]
                        } else {
                            pairwise[(other, class)]
                        };
                        e += term as i64;
                    }
                    e
                };
                let current = labels[v] as usize;
                let mut best = current;
                let mut best_energy = local(current);
                for class in 0..k {
                    let e = local(class);
                    if e < best_energy {
                        best = class;
                        best_energy = e;
                    }
                }
                if best != current {
                    labels[v] = best as u32;
                    changed += 1;
                }
            }
            debug!("IteratedConditionalModes sweep={} changed={}", sweeps, changed);
            if changed == 0 {
                break;
            }
        }
        Ok(labels)
    }
}

/// Total energy of `labels`: unaries of every voxel plus pairwise terms of
/// every edge.
pub fn total_energy(energy: &EnergyDescription, labels: &[u32]) -> i64 {
    let unaries = energy.unaries();
    let pairwise = energy.pairwise();
    let unary: i64 = labels
        .iter()
        .enumerate()
        .map(|(v, &l)| unaries.get(v, l as usize) as i64)
        .sum();
    let smooth: i64 = energy
        .edges()
        .iter()
        .map(|&[a, b]| pairwise[(labels[a] as usize, labels[b] as usize)] as i64)
        .sum();
    unary + smooth
}

/// Solver selection for configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    WinnerTakesAll,
    #[default]
    Icm,
}

impl SolverKind {
    pub fn build(self, max_iterations: usize) -> Box<dyn EnergySolver> {
        match self {
            SolverKind::WinnerTakesAll => Box::new(WinnerTakesAll),
            SolverKind::Icm => Box::new(IteratedConditionalModes { max_iterations }),
        }
    }
}
