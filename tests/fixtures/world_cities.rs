//! City fixtures.
//!
//! Coordinates rounded to four decimals; population figures only matter for
//! search ranking.

use chrono::{DateTime, TimeZone, Utc};
use trip_planner::location::Location;

/// A city record that can be turned into a validated `Location`.
#[derive(Debug, Clone, Copy)]
pub struct City {
    pub name: &'static str,
    pub country_code: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub timezone: &'static str,
    pub population: u64,
}

impl City {
    pub const fn new(
        name: &'static str,
        country_code: &'static str,
        lat: f64,
        lng: f64,
        timezone: &'static str,
        population: u64,
    ) -> Self {
        Self {
            name,
            country_code,
            lat,
            lng,
            timezone,
            population,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.name, self.country_code, self.lat, self.lng, self.timezone)
            .expect("fixture city is valid")
            .with_population(self.population)
    }
}

pub fn locations(cities: &[City]) -> Vec<Location> {
    cities.iter().map(City::location).collect()
}

/// Mid-January, northern-hemisphere winter time.
pub fn winter_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Mid-July, northern-hemisphere summer time.
pub fn summer_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
}

// ============================================================================
// Real cities
// ============================================================================

pub const LONDON: City = City::new("London", "GB", 51.5074, -0.1278, "Europe/London", 8_961_989);
pub const PARIS: City = City::new("Paris", "FR", 48.8566, 2.3522, "Europe/Paris", 2_138_551);
pub const NEW_YORK: City = City::new("New York", "US", 40.7128, -74.0060, "America/New_York", 8_804_190);
pub const TOKYO: City = City::new("Tokyo", "JP", 35.6895, 139.6917, "Asia/Tokyo", 8_336_599);
pub const SYDNEY: City = City::new("Sydney", "AU", -33.8688, 151.2093, "Australia/Sydney", 4_627_345);
pub const KATHMANDU: City = City::new("Kathmandu", "NP", 27.7172, 85.3240, "Asia/Kathmandu", 1_442_271);
pub const SAO_PAULO: City = City::new("São Paulo", "BR", -23.5505, -46.6333, "America/Sao_Paulo", 12_325_232);
pub const HONOLULU: City = City::new("Honolulu", "US", 21.3069, -157.8583, "Pacific/Honolulu", 345_064);

pub const WORLD_TOUR: &[City] = &[LONDON, NEW_YORK, TOKYO, SYDNEY, KATHMANDU, SAO_PAULO, HONOLULU];

// ============================================================================
// Synthetic equator cities
// ============================================================================
//
// All on the equator, so distances are exact arcs of the WGS-84 equator:
// 5 degrees = 556.597 km, 10 degrees = 1113.195 km. `Etc/GMT-N` is UTC+N.

pub const ALPHA: City = City::new("Alpha", "ZZ", 0.0, 0.0, "UTC", 3);
pub const BRAVO: City = City::new("Bravo", "ZZ", 0.0, 10.0, "Etc/GMT-2", 2);
pub const CHARLIE: City = City::new("Charlie", "ZZ", 0.0, 5.0, "Etc/GMT-3", 1);

/// With a +240 minute shift the legs take:
///
/// | from \ to | Alpha | Bravo | Charlie |
/// |---|---|---|---|
/// | Alpha   | -     | 120   | 60  |
/// | Bravo   | 360   | -     | 180 |
/// | Charlie | 420   | 300   | -   |
///
/// so every leg out of Alpha is faster than 550 km/h and every other leg
/// slower than 200 km/h.
pub const EQUATOR_TRIO: &[City] = &[ALPHA, BRAVO, CHARLIE];
pub const EQUATOR_SHIFT: i32 = 240;
