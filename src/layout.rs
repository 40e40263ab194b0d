// src/layout.rs

//! Fruchterman–Reingold spring layout.
//!
//! Steps:
//!  1) Place every node uniformly at random in the unit square, using a
//!     generator seeded per call.
//!  2) Each iteration, push every pair of nodes apart with strength `k²/d`
//!     and pull connected pairs together with strength `d²/k`.
//!  3) Move each node along its net force by at most the current
//!     temperature, which falls linearly to zero over the run.
//!  4) Center the result on the origin and scale it to `[-scale, scale]`.

use std::collections::HashMap;

use nalgebra::{Point2, Vector2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::graph::{GraphModel, NodeId};

/// Distances are clamped to this floor before dividing by them.
const MIN_DISTANCE: f64 = 0.01;

/// Net forces shorter than `MIN_FORCE` are treated as having length
/// `SMALL_FORCE_LENGTH` so that near-zero forces do not get blown up to a full
/// temperature step when normalized.
const MIN_FORCE: f64 = 0.01;
const SMALL_FORCE_LENGTH: f64 = 0.1;

/// Initial temperature as a fraction of the initial layout extent.
const INITIAL_TEMPERATURE_FRACTION: f64 = 0.1;

pub type Position = Point2<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Seed for the initial random placement.
    pub seed: u64,
    /// Optimal distance between connected nodes. Larger values spread the
    /// layout out; smaller values cluster it.
    pub spring_constant: f64,
    /// Upper bound on simulation steps.
    pub iterations: usize,
    /// Half-width of the square the final layout is scaled into.
    pub scale: f64,
    /// Stop early once the mean per-node displacement drops below this.
    pub threshold: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            seed: 42,
            spring_constant: 0.5,
            iterations: 50,
            scale: 1.0,
            threshold: 1e-4,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !(self.spring_constant.is_finite() && self.spring_constant > 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "spring constant must be a positive number, got {}",
                self.spring_constant
            )));
        }
        if self.iterations == 0 {
            return Err(LayoutError::InvalidConfig(
                "iteration count must be at least 1".to_string(),
            ));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),
    #[error("edge {edge} references node '{node}' which is not in the graph")]
    DanglingEdge { edge: usize, node: NodeId },
}

/// Progress report for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationStats {
    /// Zero-based step number.
    pub iteration: usize,
    /// Maximum step length allowed during this iteration.
    pub temperature: f64,
    /// Norm of all displacements divided by the node count.
    pub mean_displacement: f64,
}

/// One position per node, in the graph's node order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    nodes: Vec<NodeId>,
    positions: Vec<Position>,
    index: HashMap<NodeId, usize>,
}

impl Layout {
    /// Builds a layout from explicit positions. A repeated node keeps its
    /// last position.
    pub fn from_positions<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, Position)>,
    {
        let mut layout = Layout::default();
        for (node, pos) in entries {
            match layout.index.get(&node) {
                Some(&i) => layout.positions[i] = pos,
                None => {
                    layout.index.insert(node.clone(), layout.nodes.len());
                    layout.nodes.push(node);
                    layout.positions.push(pos);
                }
            }
        }
        layout
    }

    pub fn get(&self, node: &NodeId) -> Option<Position> {
        self.index.get(node).map(|&i| self.positions[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Position)> + '_ {
        self.nodes.iter().zip(self.positions.iter().copied())
    }

    /// Smallest box containing every position, as `(min, max)`.
    pub fn bounds(&self) -> Option<(Position, Position)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }
}

/// Computes a force-directed layout of `graph`.
pub fn compute_layout(graph: &GraphModel, config: &LayoutConfig) -> Result<Layout, LayoutError> {
    compute_layout_with_observer(graph, config, |_| {})
}

/// Same as [`compute_layout`], calling `observer` after every iteration.
pub fn compute_layout_with_observer<F>(
    graph: &GraphModel,
    config: &LayoutConfig,
    mut observer: F,
) -> Result<Layout, LayoutError>
where
    F: FnMut(&IterationStats),
{
    config.validate()?;
    let adjacency = adjacency_matrix(graph)?;
    let n = graph.node_count();

    if n <= 1 {
        debug!("[layout] trivial graph with {} nodes", n);
        return Ok(Layout::from_positions(
            graph.nodes().iter().cloned().map(|id| (id, Point2::origin())),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut positions: Vec<Vector2<f64>> = (0..n)
        .map(|_| Vector2::new(rng.gen::<f64>(), rng.gen::<f64>()))
        .collect();

    let k = config.spring_constant;
    let mut temperature = INITIAL_TEMPERATURE_FRACTION * extent(&positions);
    let cooling = temperature / (config.iterations as f64 + 1.0);

    let mut steps = 0;
    for iteration in 0..config.iterations {
        let mut displacement: Vec<Vector2<f64>> = vec![Vector2::zeros(); n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let delta = positions[i] - positions[j];
                let distance = delta.norm().max(MIN_DISTANCE);
                let attraction = if adjacency[i * n + j] { distance / k } else { 0.0 };
                displacement[i] += delta * (k * k / (distance * distance) - attraction);
            }
        }

        let mut total_sq = 0.0;
        for (pos, disp) in positions.iter_mut().zip(&displacement) {
            let mut length = disp.norm();
            if length < MIN_FORCE {
                length = SMALL_FORCE_LENGTH;
            }
            let step = *disp * (temperature / length);
            total_sq += step.norm_squared();
            *pos += step;
        }

        let stats = IterationStats {
            iteration,
            temperature,
            mean_displacement: total_sq.sqrt() / n as f64,
        };
        observer(&stats);
        steps = iteration + 1;

        temperature -= cooling;
        if stats.mean_displacement < config.threshold {
            debug!("[layout] converged after {} iterations", steps);
            break;
        }
    }

    rescale(&mut positions, config.scale);
    info!(
        "[layout] placed {} nodes, {} edges in {} iterations",
        n,
        graph.edge_count(),
        steps
    );

    Ok(Layout::from_positions(
        graph
            .nodes()
            .iter()
            .cloned()
            .zip(positions.into_iter().map(Point2::from)),
    ))
}

/// Dense `n × n` connectivity. Parallel edges count once; self-loops are
/// ignored because they exert no force.
fn adjacency_matrix(graph: &GraphModel) -> Result<Vec<bool>, LayoutError> {
    let n = graph.node_count();
    let mut adjacency = vec![false; n * n];
    for (e, edge) in graph.edges().iter().enumerate() {
        let lookup = |node: &NodeId| {
            graph.node_index(node).ok_or_else(|| LayoutError::DanglingEdge {
                edge: e,
                node: node.clone(),
            })
        };
        let i = lookup(&edge.a)?;
        let j = lookup(&edge.b)?;
        if i != j {
            adjacency[i * n + j] = true;
            adjacency[j * n + i] = true;
        }
    }
    Ok(adjacency)
}

/// Larger of the x and y ranges.
fn extent(positions: &[Vector2<f64>]) -> f64 {
    let mut lo = Vector2::repeat(f64::MAX);
    let mut hi = Vector2::repeat(f64::MIN);
    for p in positions {
        lo = lo.inf(p);
        hi = hi.sup(p);
    }
    (hi - lo).max()
}

fn rescale(positions: &mut [Vector2<f64>], scale: f64) {
    let n = positions.len() as f64;
    let center = positions.iter().sum::<Vector2<f64>>() / n;
    let mut lim: f64 = 0.0;
    for p in positions.iter_mut() {
        *p -= center;
        lim = lim.max(p.x.abs()).max(p.y.abs());
    }
    if lim > 0.0 {
        for p in positions.iter_mut() {
            *p *= scale / lim;
        }
    }
}
