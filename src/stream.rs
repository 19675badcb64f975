//! What a solver reports back while it works.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SolverError;

/// Final outcome of a solve attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    Optimal,
    Satisfied,
    Unsatisfiable,
    Unknown,
    Error,
    Unbounded,
}

impl SolverStatus {
    /// Maps a MiniZinc status keyword.
    pub fn from_minizinc(keyword: &str) -> Option<Self> {
        match keyword {
            "OPTIMAL_SOLUTION" => Some(SolverStatus::Optimal),
            "ALL_SOLUTIONS" | "SATISFIED" => Some(SolverStatus::Satisfied),
            "UNSATISFIABLE" => Some(SolverStatus::Unsatisfiable),
            "UNBOUNDED" | "UNSAT_OR_UNBOUNDED" => Some(SolverStatus::Unbounded),
            "UNKNOWN" => Some(SolverStatus::Unknown),
            "ERROR" => Some(SolverStatus::Error),
            _ => None,
        }
    }

    /// Whether a route can be shown for this status.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Satisfied)
    }
}

/// One 0/1 indicator per edge of the submitted model instance.
pub type EdgeSelection = Vec<u8>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverEvent {
    /// A (possibly improved) assignment. Supersedes earlier ones.
    Solution(EdgeSelection),
    /// Always the last event of a successful stream.
    Completed(SolverStatus),
}

type StreamItem = Result<SolverEvent, SolverError>;

/// Blocking iterator over the events of one solve.
///
/// Yields any number of `Solution`s followed by exactly one `Completed`, or
/// stops at the first error. When a deadline is set and passes first, the
/// stream cancels the solver and yields [`SolverError::Timeout`]. Dropping
/// an unfinished stream also cancels the solver.
pub struct SolutionStream {
    events: Receiver<StreamItem>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
    finished: bool,
}

impl SolutionStream {
    /// A stream fed through the returned sender. The timeout clock starts now.
    pub fn channel(timeout: Option<Duration>) -> (Sender<StreamItem>, Self) {
        let (tx, rx) = mpsc::channel();
        let stream = Self {
            events: rx,
            timeout,
            deadline: timeout.map(|t| Instant::now() + t),
            cancel: None,
            finished: false,
        };
        (tx, stream)
    }

    /// A stream replaying a fixed list of events.
    pub fn from_events(events: impl IntoIterator<Item = StreamItem>) -> Self {
        let (tx, stream) = Self::channel(None);
        for event in events {
            // receiver is alive, send cannot fail
            let _ = tx.send(event);
        }
        stream
    }

    /// Registers how to stop the solver on timeout or early drop.
    pub fn with_cancel(mut self, cancel: impl FnOnce() + Send + 'static) -> Self {
        self.cancel = Some(Box::new(cancel));
        self
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    fn receive(&mut self) -> StreamItem {
        let (Some(deadline), Some(timeout)) = (self.deadline, self.timeout) else {
            return self.events.recv().unwrap_or(Err(SolverError::Disconnected));
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.events.recv_timeout(remaining) {
            Ok(item) => item,
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "solver timed out, cancelling");
                self.cancel();
                Err(SolverError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SolverError::Disconnected),
        }
    }
}

impl Iterator for SolutionStream {
    type Item = StreamItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.receive();
        if !matches!(item, Ok(SolverEvent::Solution(_))) {
            self.finished = true;
        }
        Some(item)
    }
}

impl Drop for SolutionStream {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for SolutionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolutionStream")
            .field("timeout", &self.timeout)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
