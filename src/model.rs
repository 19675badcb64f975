//! Sparse directed graph handed to the constraint solver.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Inclusive velocity bounds in km/h restricting which legs may be used.
///
/// `min <= max` is expected; planning rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityWindow {
    pub min: i64,
    pub max: i64,
}

impl VelocityWindow {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Typical passenger aircraft.
    pub fn commercial() -> Self {
        Self::new(500, 900)
    }

    /// Supersonic airliner.
    pub fn concorde() -> Self {
        Self::new(500, 2500)
    }

    pub fn extreme() -> Self {
        Self::new(13, 7200)
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    pub fn contains(&self, velocity: i64) -> bool {
        self.min <= velocity && velocity <= self.max
    }

    /// Rounded midpoint, assumed for legs the solver did not choose.
    pub fn average(&self) -> i64 {
        ((self.min + self.max) as f64 / 2.0).round() as i64
    }

    /// Position of `velocity` inside the window, clamped to `[0, 1]`.
    /// A zero-width window maps everything to the middle.
    pub fn normalize(&self, velocity: i64) -> f64 {
        if self.max == self.min {
            return 0.5;
        }
        let position = (velocity - self.min) as f64 / (self.max - self.min) as f64;
        position.clamp(0.0, 1.0)
    }
}

/// A directed leg the solver may select, with 1-based node numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge(pub usize, pub usize);

impl Edge {
    /// 0-based source node.
    pub fn from_index(&self) -> usize {
        self.0 - 1
    }

    /// 0-based destination node.
    pub fn to_index(&self) -> usize {
        self.1 - 1
    }
}

/// Everything the solver is told about one problem.
///
/// Serializes to the data file layout the problem template declares:
/// `n`, `num_edges`, `E` and `c`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInstance {
    pub n: usize,
    pub num_edges: usize,
    #[serde(rename = "E")]
    pub edges: Vec<Edge>,
    /// Minutes per edge, parallel to `edges`.
    #[serde(rename = "c")]
    pub costs: Vec<i32>,
}

impl ModelInstance {
    /// Keeps every off-diagonal leg whose velocity lies in `window`.
    ///
    /// The result may be asymmetric, and may leave a node without outgoing
    /// legs; whether a tour exists is for the solver to decide.
    pub fn build(velocity: &[Vec<i64>], duration: &[Vec<i32>], window: VelocityWindow) -> Self {
        let n = velocity.len();
        let mut edges = Vec::new();
        let mut costs = Vec::new();

        for (i, row) in velocity.iter().enumerate() {
            for (j, &speed) in row.iter().enumerate() {
                if i == j || !window.contains(speed) {
                    continue;
                }
                edges.push(Edge(i + 1, j + 1));
                costs.push(if speed > 0 { duration[i][j] } else { 0 });
            }
        }

        let instance = Self {
            n,
            num_edges: edges.len(),
            edges,
            costs,
        };

        let stranded = instance.nodes_without_outgoing();
        if !stranded.is_empty() {
            warn!(?stranded, ?window, "some nodes have no eligible outgoing leg");
        }
        debug!(n, num_edges = instance.num_edges, "built model instance");

        instance
    }

    /// Indices of edges leaving `node` (0-based), in edge-list order.
    pub fn outgoing(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, edge)| edge.from_index() == node)
            .map(|(k, _)| k)
    }

    /// 0-based nodes no edge leaves from.
    pub fn nodes_without_outgoing(&self) -> Vec<usize> {
        let mut has_outgoing = vec![false; self.n];
        for edge in &self.edges {
            has_outgoing[edge.from_index()] = true;
        }
        (0..self.n).filter(|&node| !has_outgoing[node]).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
