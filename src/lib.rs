//! trip-planner core
//!
//! Plans a round trip through user-selected locations under a velocity
//! window, where each leg's duration is its timezone offset plus a clock
//! shift. The tour itself is chosen by an external constraint solver.

pub mod error;
pub mod location;
pub mod catalog;
pub mod geodesic;
pub mod timezone;
pub mod matrix;
pub mod clock;
pub mod model;
pub mod template;
pub mod traits;
pub mod stream;
pub mod minizinc;
pub mod route;
pub mod planner;
pub mod logging;
