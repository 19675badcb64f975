//! Locations and the user's selection of them.

use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::LocationError;

/// A named point on the globe with the timezone its clocks follow.
///
/// `(name, country_code)` identifies a location. Coordinates are validated
/// on construction, so every `Location` is usable by the geodesic and
/// timezone calculators without further checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    pub name: String,
    pub country_code: String,
    latitude: f64,
    longitude: f64,
    timezone: Tz,
    /// Only used to rank search results.
    pub population: u64,
}

#[derive(Deserialize)]
struct RawLocation {
    name: String,
    #[serde(default)]
    country_code: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    #[serde(default)]
    population: u64,
}

impl TryFrom<RawLocation> for Location {
    type Error = LocationError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        let mut location = Location::new(
            raw.name,
            raw.country_code,
            raw.latitude,
            raw.longitude,
            &raw.timezone,
        )?;
        location.population = raw.population;
        Ok(location)
    }
}

impl Location {
    pub fn new(
        name: impl Into<String>,
        country_code: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<Self, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::InvalidLatitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidLongitude(longitude));
        }
        let timezone = Tz::from_str(timezone)
            .map_err(|_| LocationError::UnknownTimezone(timezone.to_string()))?;

        Ok(Self {
            name: name.into(),
            country_code: country_code.into(),
            latitude,
            longitude,
            timezone,
            population: 0,
        })
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = population;
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// (lat, lng) in degrees.
    pub fn coords(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// True when both records name the same place.
    pub fn same_place(&self, other: &Location) -> bool {
        self.name == other.name && self.country_code == other.country_code
    }
}

/// The ordered list of locations chosen for a trip.
///
/// Order does not constrain the visiting sequence, except that the first
/// entry is always node 0 of the model: every route starts and ends there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    locations: Vec<Location>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `location` unless a location with the same name and country
    /// is already selected. Returns whether it was added.
    pub fn add(&mut self, location: Location) -> bool {
        if self.contains(&location) {
            return false;
        }
        self.locations.push(location);
        true
    }

    /// Removes the location with the given identity. Returns whether one was
    /// removed.
    pub fn remove(&mut self, name: &str, country_code: &str) -> bool {
        let before = self.locations.len();
        self.locations
            .retain(|l| !(l.name == name && l.country_code == country_code));
        self.locations.len() != before
    }

    pub fn clear(&mut self) {
        self.locations.clear();
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.locations.iter().any(|l| l.same_place(location))
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// The location every route starts from.
    pub fn start(&self) -> Option<&Location> {
        self.locations.first()
    }

    /// Owned copy taken when a solve is submitted, so later edits to the
    /// selection cannot affect a solve in flight.
    pub fn snapshot(&self) -> Vec<Location> {
        self.locations.clone()
    }
}

impl FromIterator<Location> for Selection {
    fn from_iter<I: IntoIterator<Item = Location>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for location in iter {
            selection.add(location);
        }
        selection
    }
}
