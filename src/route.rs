//! Turning a solver's edge selection back into an ordered trip.
//!
//! The walk always starts at node 0, the first selected location, and
//! follows the first selected outgoing edge of each node in edge-list order.

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::location::Location;
use crate::matrix::TravelMatrices;
use crate::model::{ModelInstance, VelocityWindow};

/// Node every route starts from and returns to.
pub const START_NODE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegSource {
    /// An edge the solver selected.
    Solver,
    /// The closing leg added when the solver's path did not return to the
    /// start. Its velocity is assumed, not checked against the model.
    Synthesized,
}

/// One directed hop of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    pub from: String,
    pub to: String,
    #[serde(skip)]
    pub from_index: usize,
    #[serde(skip)]
    pub to_index: usize,
    #[serde(rename = "duration", serialize_with = "serialize_hhmm")]
    pub duration_minutes: i32,
    /// km/h.
    pub velocity: i64,
    pub source: LegSource,
}

impl Leg {
    /// Zero-padded `HH:MM`.
    pub fn duration(&self) -> String {
        format_hhmm(self.duration_minutes)
    }
}

/// Why a walk stopped before forming a complete tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteBreak {
    /// No selected edge leaves `at`, and some nodes were never reached.
    MissingEdge { at: usize },
    /// The walk came back to the start after `legs` legs, short of a full tour.
    EarlyReturn { legs: usize },
    /// The walk entered `at` a second time.
    Revisit { at: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClosure {
    /// Every node visited once and the solver's last edge returns to the start.
    Closed,
    /// Every node visited once; the last leg was synthesized.
    Synthesized,
    /// The selection is inconsistent; legs stop where the walk broke.
    Broken(RouteBreak),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub legs: Vec<Leg>,
    pub closure: RouteClosure,
}

impl Route {
    pub fn is_complete(&self) -> bool {
        !matches!(self.closure, RouteClosure::Broken(_))
    }

    pub fn total_duration_minutes(&self) -> i32 {
        self.legs.iter().map(|leg| leg.duration_minutes).sum()
    }

    pub fn total_duration(&self) -> String {
        format_hhmm(self.total_duration_minutes())
    }

    /// Node indices in the order they are visited, start first, each once.
    pub fn visit_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = self.legs.iter().map(|leg| leg.from_index).collect();
        if let Some(last) = self.legs.last() {
            if last.to_index != START_NODE && !order.contains(&last.to_index) {
                order.push(last.to_index);
            }
        }
        if order.is_empty() {
            order.push(START_NODE);
        }
        order
    }

    /// Locations in visiting order, for numbering markers.
    pub fn visitation_order<'a>(&self, locations: &'a [Location]) -> Vec<&'a Location> {
        self.visit_order()
            .into_iter()
            .filter_map(|i| locations.get(i))
            .collect()
    }

    /// Each leg's velocity as a position in `window`, in leg order.
    pub fn normalized_velocities(&self, window: VelocityWindow) -> Vec<f64> {
        self.legs.iter().map(|leg| window.normalize(leg.velocity)).collect()
    }
}

/// Rebuilds the route described by `selection`.
///
/// `selection` holds one indicator per edge of `instance`; only the value
/// `1` counts as selected. When the walk has reached every node but has no
/// way back, a closing leg is synthesized at the window's average velocity.
/// Any other gap is reported as [`RouteClosure::Broken`] and left unpatched.
pub fn reconstruct(
    instance: &ModelInstance,
    selection: &[u8],
    locations: &[Location],
    matrices: &TravelMatrices,
    window: VelocityWindow,
) -> Route {
    let n = instance.n;
    if n == 0 {
        return Route {
            legs: Vec::new(),
            closure: RouteClosure::Closed,
        };
    }

    let mut legs = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    visited[START_NODE] = true;
    let mut reached = 1;
    let mut current = START_NODE;

    let closure = loop {
        let chosen = instance
            .outgoing(current)
            .find(|&k| selection.get(k).copied() == Some(1));

        let Some(k) = chosen else {
            if reached < n {
                break RouteClosure::Broken(RouteBreak::MissingEdge { at: current });
            }
            if current == START_NODE {
                break RouteClosure::Closed;
            }
            legs.push(closing_leg(current, locations, matrices, window));
            break RouteClosure::Synthesized;
        };

        let next = instance.edges[k].to_index();
        legs.push(Leg {
            from: name_of(locations, current),
            to: name_of(locations, next),
            from_index: current,
            to_index: next,
            duration_minutes: instance.costs[k],
            velocity: matrices.velocity[current][next],
            source: LegSource::Solver,
        });

        if next == START_NODE {
            if reached == n {
                break RouteClosure::Closed;
            }
            break RouteClosure::Broken(RouteBreak::EarlyReturn { legs: legs.len() });
        }
        if visited[next] {
            break RouteClosure::Broken(RouteBreak::Revisit { at: next });
        }
        visited[next] = true;
        reached += 1;
        current = next;
    };

    match closure {
        RouteClosure::Broken(reason) => {
            warn!(?reason, legs = legs.len(), n, "solver selection does not form a tour")
        }
        RouteClosure::Synthesized => debug!(from = current, "synthesized closing leg"),
        RouteClosure::Closed => {}
    }

    Route { legs, closure }
}

fn closing_leg(
    from: usize,
    locations: &[Location],
    matrices: &TravelMatrices,
    window: VelocityWindow,
) -> Leg {
    let velocity = window.average();
    let km = matrices.distance[from][START_NODE] / 1000.0;
    let duration_minutes = if velocity > 0 {
        (km / velocity as f64 * 60.0).round() as i32
    } else {
        0
    };

    Leg {
        from: name_of(locations, from),
        to: name_of(locations, START_NODE),
        from_index: from,
        to_index: START_NODE,
        duration_minutes,
        velocity,
        source: LegSource::Synthesized,
    }
}

fn name_of(locations: &[Location], index: usize) -> String {
    locations
        .get(index)
        .map(|l| l.name.clone())
        .unwrap_or_else(|| format!("#{}", index + 1))
}

/// Zero-padded `HH:MM`; hours may exceed 23.
pub fn format_hhmm(minutes: i32) -> String {
    let minutes = minutes.max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn serialize_hhmm<S: Serializer>(minutes: &i32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hhmm(*minutes))
}
