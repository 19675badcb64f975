//! Error kinds surfaced by the planner.
//!
//! The matrix and model builders are pure and never fail once their
//! `Location`s exist, so malformed geographic input is rejected when a
//! location is constructed. Everything that can go wrong while asking the
//! solver is a [`PlanError`]; a legitimate "no route" answer is not an error
//! at all but a [`crate::stream::SolverStatus`].

use std::io;

use thiserror::Error;

/// Rejected geographic input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
    #[error("unknown IANA timezone `{0}`")]
    UnknownTimezone(String),
}

/// The iterative ellipsoidal solution gave up.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GeodesicError {
    #[error("vincenty iteration did not converge after {0} steps")]
    NotConverged(usize),
    #[error("points are antipodal or otherwise degenerate")]
    Degenerate,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// The problem template could not be fetched.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to fetch template: {0}")]
    Http(#[from] reqwest::Error),
    #[error("template `{0}` is empty")]
    Empty(String),
}

/// The solver could not be asked, or did not answer intelligibly.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to start solver `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("solver i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed solver response: {0}")]
    MalformedResponse(String),
    #[error("solver exited with {code:?}: {stderr}")]
    Process { code: Option<i32>, stderr: String },
    #[error("solver did not finish within {0:?}")]
    Timeout(std::time::Duration),
    #[error("solver stream closed without a final status")]
    Disconnected,
}

/// Failure of a plan request as a whole.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("select at least two locations (have {selected})")]
    InsufficientSelection { selected: usize },
    #[error("velocity window {min}..={max} km/h is empty")]
    InvalidWindow { min: i64, max: i64 },
    #[error("a solve is already in progress")]
    AlreadySolving,
    #[error(transparent)]
    TemplateLoad(#[from] TemplateError),
    #[error(transparent)]
    Transport(#[from] SolverError),
}

impl PlanError {
    /// True when the failure came from the solver collaborator rather than
    /// from the request itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, PlanError::Transport(_) | PlanError::TemplateLoad(_))
    }
}
