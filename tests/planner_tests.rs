//! Planner tests against scripted solvers.
//!
//! No MiniZinc needed: each mock decides what the stream carries.

mod fixtures;

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use fixtures::*;
use trip_planner::error::{PlanError, SolverError};
use trip_planner::logging::init_test_logging;
use trip_planner::model::{ModelInstance, VelocityWindow};
use trip_planner::planner::{PlanRequest, TripPlanner, TripSettings};
use trip_planner::route::{LegSource, Route, RouteClosure};
use trip_planner::stream::{SolutionStream, SolverEvent, SolverStatus};
use trip_planner::template::{ModelTemplate, TemplateSource};
use trip_planner::traits::ConstraintSolver;

// ============================================================================
// Mock Solvers
// ============================================================================

/// Replays a fixed list of events.
struct ScriptedSolver {
    events: Vec<SolverEvent>,
}

impl ScriptedSolver {
    fn completed(status: SolverStatus) -> Self {
        Self {
            events: vec![SolverEvent::Completed(status)],
        }
    }
}

impl ConstraintSolver for ScriptedSolver {
    fn submit(&self, _: &ModelTemplate, _: &ModelInstance) -> Result<SolutionStream, SolverError> {
        Ok(SolutionStream::from_events(self.events.iter().cloned().map(Ok)))
    }
}

/// Finds the cheapest Hamiltonian cycle by trying every order. Streams
/// each improvement, the way an optimizing solver does.
struct ExhaustiveSolver;

impl ConstraintSolver for ExhaustiveSolver {
    fn submit(&self, template: &ModelTemplate, instance: &ModelInstance) -> Result<SolutionStream, SolverError> {
        assert!(template.text.contains("num_edges"));

        let mut events = Vec::new();
        let mut best = i32::MAX;
        let mut rest: Vec<usize> = (1..instance.n).collect();
        for_each_order(&mut rest, 0, &mut |order| {
            let Some(tour) = tour_edges(instance, order) else {
                return;
            };
            let cost: i32 = tour.iter().map(|&k| instance.costs[k]).sum();
            if cost < best {
                best = cost;
                let mut selection = vec![0; instance.num_edges];
                for k in tour {
                    selection[k] = 1;
                }
                events.push(Ok(SolverEvent::Solution(selection)));
            }
        });

        let status = if events.is_empty() {
            SolverStatus::Unsatisfiable
        } else {
            SolverStatus::Optimal
        };
        events.push(Ok(SolverEvent::Completed(status)));
        Ok(SolutionStream::from_events(events))
    }
}

fn for_each_order(items: &mut [usize], start: usize, visit: &mut impl FnMut(&[usize])) {
    if start == items.len() {
        visit(items);
        return;
    }
    for i in start..items.len() {
        items.swap(start, i);
        for_each_order(items, start + 1, visit);
        items.swap(start, i);
    }
}

/// Edge indices of the cycle 0 → order... → 0, if every hop is an edge.
fn tour_edges(instance: &ModelInstance, order: &[usize]) -> Option<Vec<usize>> {
    let mut nodes = vec![0];
    nodes.extend_from_slice(order);
    nodes.push(0);
    nodes
        .windows(2)
        .map(|hop| {
            instance
                .edges
                .iter()
                .position(|edge| edge.from_index() == hop[0] && edge.to_index() == hop[1])
        })
        .collect()
}

/// Refuses to start.
struct UnreachableSolver;

impl ConstraintSolver for UnreachableSolver {
    fn submit(&self, _: &ModelTemplate, _: &ModelInstance) -> Result<SolutionStream, SolverError> {
        Err(SolverError::Spawn {
            program: "minizinc".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
        })
    }
}

/// Accepts the job and never answers, keeping the channel open.
struct SilentSolver {
    timeout: Duration,
    keep_alive: Mutex<Vec<Sender<Result<SolverEvent, SolverError>>>>,
}

impl ConstraintSolver for SilentSolver {
    fn submit(&self, _: &ModelTemplate, _: &ModelInstance) -> Result<SolutionStream, SolverError> {
        let (tx, stream) = SolutionStream::channel(Some(self.timeout));
        self.keep_alive.lock().unwrap().push(tx);
        Ok(stream)
    }
}

/// Blocks in `submit` until released, then reports no solution.
struct GatedSolver {
    release: Mutex<Receiver<()>>,
}

impl ConstraintSolver for GatedSolver {
    fn submit(&self, _: &ModelTemplate, _: &ModelInstance) -> Result<SolutionStream, SolverError> {
        self.release.lock().unwrap().recv().ok();
        Ok(SolutionStream::from_events(vec![Ok(SolverEvent::Completed(
            SolverStatus::Unknown,
        ))]))
    }
}

fn equator_request(window: VelocityWindow) -> PlanRequest {
    PlanRequest::new(locations(EQUATOR_TRIO), window, EQUATOR_SHIFT).evaluated_at(winter_instant())
}

fn assert_hamiltonian(route: &Route, n: usize) {
    assert_eq!(route.legs.len(), n);
    for pair in route.legs.windows(2) {
        assert_eq!(pair[0].to, pair[1].from);
    }
    assert_eq!(route.legs[n - 1].to, route.legs[0].from);
    let mut visited = route.visit_order();
    visited.sort_unstable();
    assert_eq!(visited, (0..n).collect::<Vec<_>>());
}

// ============================================================================
// Successful Solves
// ============================================================================

#[test]
fn test_optimal_tour() {
    init_test_logging();
    let planner = TripPlanner::new(ExhaustiveSolver);
    let mut updates = Vec::new();
    let outcome = planner
        .plan(&equator_request(VelocityWindow::new(0, 1000)), |route| {
            updates.push(route.total_duration_minutes())
        })
        .unwrap();

    assert_eq!(outcome.status, SolverStatus::Optimal);
    assert!(outcome.found_route());
    assert_eq!(outcome.instance.num_edges, 6);

    let route = outcome.route.unwrap();
    assert_eq!(route.closure, RouteClosure::Closed);
    assert_hamiltonian(&route, 3);
    assert_eq!(route.legs[0].from, "Alpha");
    // both directions round the triangle take 12 hours
    assert_eq!(route.total_duration(), "12:00");
    assert_eq!(updates.len(), outcome.solutions);
    assert!(!planner.is_solving());
}

#[test]
fn test_world_tour_is_hamiltonian() {
    let request = PlanRequest::new(locations(WORLD_TOUR), VelocityWindow::new(0, 100_000), 90)
        .evaluated_at(winter_instant());
    let outcome = TripPlanner::new(ExhaustiveSolver).plan(&request, |_| {}).unwrap();

    assert_eq!(outcome.status, SolverStatus::Optimal);
    let route = outcome.route.unwrap();
    assert_hamiltonian(&route, WORLD_TOUR.len());
    assert_eq!(route.legs[0].from, "London");
    assert!(route.legs.iter().all(|leg| leg.source == LegSource::Solver));
}

#[test]
fn test_latest_solution_wins() {
    // Edge order: A→B, A→C, B→A, B→C, C→A, C→B
    let first = vec![1, 0, 0, 1, 1, 0];
    let second = vec![0, 1, 1, 0, 0, 1];
    let solver = ScriptedSolver {
        events: vec![
            SolverEvent::Solution(first),
            SolverEvent::Solution(second),
            SolverEvent::Completed(SolverStatus::Satisfied),
        ],
    };

    let mut seen = Vec::new();
    let outcome = TripPlanner::new(solver)
        .plan(&equator_request(VelocityWindow::new(0, 1000)), |route| {
            seen.push(route.legs[0].to.clone())
        })
        .unwrap();

    assert_eq!(seen, vec!["Bravo", "Charlie"]);
    assert_eq!(outcome.solutions, 2);
    let route = outcome.route.unwrap();
    let rows: Vec<(&str, String, i64)> = route
        .legs
        .iter()
        .map(|leg| (leg.to.as_str(), leg.duration(), leg.velocity))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Charlie", "01:00".to_string(), 557),
            ("Bravo", "05:00".to_string(), 111),
            ("Alpha", "06:00".to_string(), 186),
        ]
    );
}

#[test]
fn test_settings_snapshot_plans() {
    let mut settings = TripSettings {
        window: VelocityWindow::new(0, 100_000),
        ..TripSettings::default()
    };
    for city in [LONDON, PARIS, NEW_YORK] {
        settings.selection.add(city.location());
    }
    let request = settings.request();
    settings.selection.clear();

    let outcome = TripPlanner::new(ExhaustiveSolver).plan(&request, |_| {}).unwrap();
    assert_eq!(outcome.matrices.len(), 3);
    assert_eq!(request.time_delta, -120);
}

// ============================================================================
// No Route
// ============================================================================

#[test]
fn test_stranded_start_reports_solver_status() {
    let request = equator_request(VelocityWindow::new(0, 400));
    let planner = TripPlanner::new(ScriptedSolver::completed(SolverStatus::Unsatisfiable));
    let mut updates = 0;
    let outcome = planner.plan(&request, |_| updates += 1).unwrap();

    assert_eq!(outcome.instance.nodes_without_outgoing(), vec![0]);
    assert_eq!(outcome.status, SolverStatus::Unsatisfiable);
    assert!(outcome.route.is_none());
    assert!(!outcome.found_route());
    assert_eq!(updates, 0);
}

#[test]
fn test_unknown_status_is_passed_through() {
    let planner = TripPlanner::new(ScriptedSolver::completed(SolverStatus::Unknown));
    let outcome = planner
        .plan(&equator_request(VelocityWindow::new(0, 400)), |_| {})
        .unwrap();
    assert_eq!(outcome.status, SolverStatus::Unknown);
}

#[test]
fn test_exhaustive_solver_agrees_no_tour_exists() {
    let outcome = TripPlanner::new(ExhaustiveSolver)
        .plan(&equator_request(VelocityWindow::new(0, 400)), |_| {})
        .unwrap();
    assert_eq!(outcome.status, SolverStatus::Unsatisfiable);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_too_few_locations() {
    let planner = TripPlanner::new(ScriptedSolver::completed(SolverStatus::Optimal));
    for cities in [&[][..], &[LONDON][..]] {
        let request = PlanRequest::new(locations(cities), VelocityWindow::commercial(), 0);
        let err = planner.plan(&request, |_| {}).unwrap_err();
        assert!(matches!(err, PlanError::InsufficientSelection { selected } if selected == cities.len()));
        assert!(!err.is_transport());
    }
    assert!(!planner.is_solving());
}

#[test]
fn test_repeated_location_counts_once() {
    // UnreachableSolver fails with a transport error if it is ever reached
    let planner = TripPlanner::new(UnreachableSolver);
    let request = PlanRequest::new(locations(&[LONDON, LONDON]), VelocityWindow::new(0, 1000), 60);
    assert_eq!(request.locations.len(), 1);
    let err = planner.plan(&request, |_| {}).unwrap_err();
    assert!(matches!(err, PlanError::InsufficientSelection { selected: 1 }));

    let assembled = PlanRequest {
        locations: locations(&[LONDON, LONDON]),
        ..request
    };
    let err = planner.plan(&assembled, |_| {}).unwrap_err();
    assert!(matches!(err, PlanError::InsufficientSelection { selected: 1 }));
    assert!(!planner.is_solving());
}

#[test]
fn test_repeats_are_dropped_before_solving() {
    let assembled = PlanRequest {
        locations: locations(&[LONDON, PARIS, LONDON]),
        ..PlanRequest::new(Vec::new(), VelocityWindow::new(0, 100_000), 90).evaluated_at(winter_instant())
    };
    let outcome = TripPlanner::new(ExhaustiveSolver).plan(&assembled, |_| {}).unwrap();
    assert_eq!(outcome.instance.n, 2);
    assert_eq!(outcome.matrices.len(), 2);

    let request = PlanRequest::new(locations(&[LONDON, PARIS, LONDON]), VelocityWindow::commercial(), 0);
    let names: Vec<&str> = request.locations.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["London", "Paris"]);
}

#[test]
fn test_inverted_window_is_rejected() {
    let planner = TripPlanner::new(UnreachableSolver);
    let err = planner
        .plan(&equator_request(VelocityWindow::new(1000, 0)), |_| {})
        .unwrap_err();
    assert!(matches!(err, PlanError::InvalidWindow { min: 1000, max: 0 }));
    assert!(!err.is_transport());
    assert!(!planner.is_solving());
}

#[test]
fn test_unreachable_solver_is_transport_error() {
    let planner = TripPlanner::new(UnreachableSolver);
    let err = planner
        .plan(&equator_request(VelocityWindow::commercial()), |_| {})
        .unwrap_err();
    assert!(matches!(err, PlanError::Transport(SolverError::Spawn { .. })));
    assert!(err.is_transport());
    assert!(!planner.is_solving());
}

#[test]
fn test_wrong_selection_length_is_malformed() {
    let solver = ScriptedSolver {
        events: vec![
            SolverEvent::Solution(vec![1, 0]),
            SolverEvent::Completed(SolverStatus::Optimal),
        ],
    };
    let err = TripPlanner::new(solver)
        .plan(&equator_request(VelocityWindow::new(0, 1000)), |_| {})
        .unwrap_err();
    assert!(matches!(err, PlanError::Transport(SolverError::MalformedResponse(_))));
}

#[test]
fn test_stream_without_status_is_disconnected() {
    let solver = ScriptedSolver {
        events: vec![SolverEvent::Solution(vec![1, 0, 0, 1, 1, 0])],
    };
    let mut updates = 0;
    let err = TripPlanner::new(solver)
        .plan(&equator_request(VelocityWindow::new(0, 1000)), |_| updates += 1)
        .unwrap_err();
    assert!(matches!(err, PlanError::Transport(SolverError::Disconnected)));
    assert_eq!(updates, 1);
}

#[test]
fn test_silent_solver_times_out() {
    let solver = SilentSolver {
        timeout: Duration::from_millis(50),
        keep_alive: Mutex::new(Vec::new()),
    };
    let started = Instant::now();
    let err = TripPlanner::new(solver)
        .plan(&equator_request(VelocityWindow::commercial()), |_| {})
        .unwrap_err();
    assert!(matches!(err, PlanError::Transport(SolverError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_missing_template_is_load_error() {
    let planner = TripPlanner::new(ScriptedSolver::completed(SolverStatus::Optimal))
        .with_template(TemplateSource::File("/definitely/not/here.mzn".into()));
    let err = planner
        .plan(&equator_request(VelocityWindow::commercial()), |_| {})
        .unwrap_err();
    assert!(matches!(err, PlanError::TemplateLoad(_)));
    assert!(!planner.is_solving());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_second_plan_while_solving_is_rejected() {
    let (release, gate) = mpsc::channel();
    let planner = TripPlanner::new(GatedSolver {
        release: Mutex::new(gate),
    });
    let request = equator_request(VelocityWindow::commercial());

    thread::scope(|scope| {
        let first = scope.spawn(|| planner.plan(&request, |_| {}));

        let waited = Instant::now();
        while !planner.is_solving() {
            assert!(waited.elapsed() < Duration::from_secs(5), "first solve never started");
            thread::sleep(Duration::from_millis(5));
        }

        let err = planner.plan(&request, |_| {}).unwrap_err();
        assert!(matches!(err, PlanError::AlreadySolving));

        release.send(()).unwrap();
        let outcome = first.join().unwrap().unwrap();
        assert_eq!(outcome.status, SolverStatus::Unknown);
    });

    assert!(!planner.is_solving());
}
