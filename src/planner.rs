//! Orchestration of one solve: matrices, model, solver, reconstruction.
//!
//! The planner holds no trip data of its own. A [`PlanRequest`] is an owned
//! snapshot of the user's settings, so edits made while a solve is in
//! flight cannot leak into it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, info_span};

use crate::clock::{ClockTime, default_clocks, time_delta};
use crate::error::{PlanError, SolverError};
use crate::location::{Location, Selection};
use crate::matrix::TravelMatrices;
use crate::model::{ModelInstance, VelocityWindow};
use crate::route::{Route, reconstruct};
use crate::stream::{SolverEvent, SolverStatus};
use crate::template::{ModelTemplate, TemplateSource};
use crate::traits::ConstraintSolver;

/// Fewest locations a route can be planned for.
pub const MIN_LOCATIONS: usize = 2;

/// Everything the user has set up for a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripSettings {
    pub selection: Selection,
    pub window: VelocityWindow,
    pub left_clock: ClockTime,
    pub right_clock: ClockTime,
}

impl Default for TripSettings {
    fn default() -> Self {
        let (left_clock, right_clock) = default_clocks();
        Self {
            selection: Selection::new(),
            window: VelocityWindow::commercial(),
            left_clock,
            right_clock,
        }
    }
}

impl TripSettings {
    /// Shift between the two clocks, in minutes.
    pub fn time_delta(&self) -> i32 {
        time_delta(self.left_clock, self.right_clock)
    }

    /// Snapshot for submission, evaluated now.
    pub fn request(&self) -> PlanRequest {
        PlanRequest::new(self.selection.snapshot(), self.window, self.time_delta())
    }
}

/// Owned inputs of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    /// Node 0 is the first entry.
    pub locations: Vec<Location>,
    pub window: VelocityWindow,
    pub time_delta: i32,
    /// Instant at which timezone offsets are read.
    pub evaluated_at: DateTime<Utc>,
}

impl PlanRequest {
    /// Repeated locations are dropped, keeping the first occurrence.
    pub fn new(locations: Vec<Location>, window: VelocityWindow, time_delta: i32) -> Self {
        let locations: Selection = locations.into_iter().collect();
        Self {
            locations: locations.snapshot(),
            window,
            time_delta,
            evaluated_at: Utc::now(),
        }
    }

    pub fn evaluated_at(mut self, instant: DateTime<Utc>) -> Self {
        self.evaluated_at = instant;
        self
    }
}

/// Result of a solve that reached the solver and heard back.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub status: SolverStatus,
    /// Route from the most recent solution, if any arrived.
    pub route: Option<Route>,
    /// Number of solutions received.
    pub solutions: usize,
    pub matrices: TravelMatrices,
    pub instance: ModelInstance,
}

impl PlanOutcome {
    /// False when the solver proved or suspected there is no tour.
    pub fn found_route(&self) -> bool {
        self.route.is_some() && self.status.has_solution()
    }
}

pub struct TripPlanner<S> {
    solver: S,
    template_source: TemplateSource,
    template_timeout: Duration,
    solving: AtomicBool,
}

impl<S: ConstraintSolver> TripPlanner<S> {
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            template_source: TemplateSource::default(),
            template_timeout: Duration::from_secs(10),
            solving: AtomicBool::new(false),
        }
    }

    pub fn with_template(mut self, source: TemplateSource) -> Self {
        self.template_source = source;
        self
    }

    pub fn with_template_timeout(mut self, timeout: Duration) -> Self {
        self.template_timeout = timeout;
        self
    }

    pub fn is_solving(&self) -> bool {
        self.solving.load(Ordering::Acquire)
    }

    /// Runs one solve to completion.
    ///
    /// `on_update` sees the route rebuilt from every solution as it
    /// arrives; each one replaces the previous. Only one solve runs at a
    /// time per planner: a concurrent call fails with
    /// [`PlanError::AlreadySolving`]. Fewer than two distinct locations or
    /// a window with `min > max` are rejected before anything is built.
    pub fn plan(
        &self,
        request: &PlanRequest,
        mut on_update: impl FnMut(&Route),
    ) -> Result<PlanOutcome, PlanError> {
        // repeats count once, as in a `Selection`
        let distinct: Selection = request.locations.iter().cloned().collect();
        if distinct.len() < MIN_LOCATIONS {
            return Err(PlanError::InsufficientSelection {
                selected: distinct.len(),
            });
        }
        if !request.window.is_valid() {
            return Err(PlanError::InvalidWindow {
                min: request.window.min,
                max: request.window.max,
            });
        }
        let locations = distinct.locations();
        let _guard = SolveGuard::acquire(&self.solving).ok_or(PlanError::AlreadySolving)?;

        let span = info_span!("plan", n = locations.len(), time_delta = request.time_delta);
        let _enter = span.enter();

        let matrices = TravelMatrices::build(locations, request.time_delta, request.evaluated_at);
        let instance = ModelInstance::build(&matrices.velocity, &matrices.duration, request.window);
        let template = ModelTemplate::load(&self.template_source, self.template_timeout)?;

        let stream = self.solver.submit(&template, &instance)?;

        let mut latest = None;
        let mut solutions = 0;
        for event in stream {
            match event? {
                SolverEvent::Solution(selection) => {
                    if selection.len() != instance.num_edges {
                        return Err(SolverError::MalformedResponse(format!(
                            "selection has {} entries for {} edges",
                            selection.len(),
                            instance.num_edges
                        ))
                        .into());
                    }
                    let route = reconstruct(
                        &instance,
                        &selection,
                        locations,
                        &matrices,
                        request.window,
                    );
                    solutions += 1;
                    on_update(&route);
                    latest = Some(route);
                }
                SolverEvent::Completed(status) => {
                    info!(?status, solutions, "plan finished");
                    return Ok(PlanOutcome {
                        status,
                        route: latest,
                        solutions,
                        matrices,
                        instance,
                    });
                }
            }
        }

        Err(SolverError::Disconnected.into())
    }
}

/// Marks a planner busy for as long as it lives.
struct SolveGuard<'a>(&'a AtomicBool);

impl<'a> SolveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SolveGuard(flag))
    }
}

impl Drop for SolveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
