//! UTC offsets of the selected locations at one evaluation instant.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::location::Location;

/// Offset from UTC in minutes that `tz` observes at `instant`, daylight
/// saving included.
pub fn utc_offset_minutes(tz: Tz, instant: DateTime<Utc>) -> i32 {
    tz.offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc()
        / 60
}

/// `offset[i][j]` = offset of `i`'s zone minus offset of `j`'s zone, in minutes.
///
/// Every zone is evaluated once at `instant`, so the matrix is exactly
/// antisymmetric.
pub fn offset_matrix(locations: &[Location], instant: DateTime<Utc>) -> Vec<Vec<i32>> {
    let offsets: Vec<i32> = locations
        .iter()
        .map(|location| utc_offset_minutes(location.timezone(), instant))
        .collect();

    offsets
        .iter()
        .map(|from| offsets.iter().map(|to| from - to).collect())
        .collect()
}
