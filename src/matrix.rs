//! Distance, offset, duration and velocity matrices for a selection.
//!
//! Duration here is a game rule, not flight physics: the time a leg i→j
//! takes is the timezone offset between the two places plus the user's
//! clock shift, folded into one day.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::debug;

use crate::geodesic::surface_distance_m;
use crate::location::Location;
use crate::timezone::offset_matrix;

/// Minutes in a day; durations are folded into `[0, MINUTES_PER_DAY)`.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// All matrices for one selection, indexed by selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelMatrices {
    /// Meters.
    pub distance: Vec<Vec<f64>>,
    /// Minutes, row zone minus column zone.
    pub offset: Vec<Vec<i32>>,
    /// Minutes in `[0, 1440)`.
    pub duration: Vec<Vec<i32>>,
    /// km/h, rounded.
    pub velocity: Vec<Vec<i64>>,
}

impl TravelMatrices {
    /// Builds every matrix in dependency order. Timezone offsets are read at
    /// `instant`, so the result is reproducible for a fixed instant.
    pub fn build(locations: &[Location], time_delta: i32, instant: DateTime<Utc>) -> Self {
        let distance = distance_matrix(locations);
        let offset = offset_matrix(locations, instant);
        let duration = duration_matrix(&offset, time_delta);
        let velocity = velocity_matrix(&distance, &duration);

        debug!(n = locations.len(), time_delta, %instant, "built travel matrices");

        Self {
            distance,
            offset,
            duration,
            velocity,
        }
    }

    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }
}

/// Symmetric surface-distance matrix in meters.
///
/// Only the upper triangle is computed; the lower one mirrors it.
pub fn distance_matrix(locations: &[Location]) -> Vec<Vec<f64>> {
    let n = locations.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect();

    let distances: Vec<f64> = pairs
        .par_iter()
        .map(|&(i, j)| surface_distance_m(locations[i].coords(), locations[j].coords()))
        .collect();

    let mut matrix = vec![vec![0.0; n]; n];
    for (&(i, j), meters) in pairs.iter().zip(distances) {
        matrix[i][j] = meters;
        matrix[j][i] = meters;
    }
    matrix
}

/// `(offset + time_delta) mod 1440`, always non-negative.
pub fn fold_duration(offset_minutes: i32, time_delta: i32) -> i32 {
    (offset_minutes + time_delta).rem_euclid(MINUTES_PER_DAY)
}

pub fn duration_matrix(offset: &[Vec<i32>], time_delta: i32) -> Vec<Vec<i32>> {
    offset
        .iter()
        .map(|row| row.iter().map(|&value| fold_duration(value, time_delta)).collect())
        .collect()
}

/// Rounded km/h for each leg. Zero on the diagonal and wherever the leg
/// takes no time.
pub fn velocity_matrix(distance: &[Vec<f64>], duration: &[Vec<i32>]) -> Vec<Vec<i64>> {
    distance
        .iter()
        .zip(duration)
        .enumerate()
        .map(|(i, (dist_row, dur_row))| {
            dist_row
                .iter()
                .zip(dur_row)
                .enumerate()
                .map(|(j, (&meters, &minutes))| {
                    if i == j || minutes == 0 {
                        0
                    } else {
                        velocity_kmh(meters, minutes)
                    }
                })
                .collect()
        })
        .collect()
}

/// Rounded km/h for covering `meters` in `minutes` (> 0).
pub fn velocity_kmh(meters: f64, minutes: i32) -> i64 {
    ((meters / 1000.0) / (f64::from(minutes) / 60.0)).round() as i64
}
