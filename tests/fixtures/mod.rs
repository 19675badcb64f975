//! Test fixtures for trip-planner.
//!
//! Provides:
//! - Real world cities with their IANA timezones
//! - Synthetic equator cities with fixed-offset zones for exact arithmetic
//! - A pinned evaluation instant so DST never moves the numbers

#![allow(dead_code)]

pub mod world_cities;

pub use world_cities::*;
