//! Process-wide catalog of known locations.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::info;

use crate::error::CatalogError;
use crate::location::Location;

/// Results returned by [`LocationCatalog::search`] unless a smaller limit is given.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Immutable set of locations, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct LocationCatalog {
    locations: Vec<Location>,
    index: HashMap<(String, String), usize>,
}

impl LocationCatalog {
    pub fn new(locations: Vec<Location>) -> Self {
        let mut index = HashMap::with_capacity(locations.len());
        for (i, location) in locations.iter().enumerate() {
            // first entry wins on duplicate identities
            index
                .entry((location.name.clone(), location.country_code.clone()))
                .or_insert(i);
        }
        Self { locations, index }
    }

    /// Reads a JSON array of location records.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let locations: Vec<Location> = serde_json::from_reader(reader)?;
        Ok(Self::new(locations))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = File::open(path.as_ref())?;
        let catalog = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.as_ref().display(),
            count = catalog.len(),
            "loaded location catalog"
        );
        Ok(catalog)
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

    pub fn find(&self, name: &str, country_code: &str) -> Option<&Location> {
        self.index
            .get(&(name.to_string(), country_code.to_string()))
            .map(|&i| &self.locations[i])
    }

    /// Case-insensitive name search, most populous first.
    ///
    /// Blank queries return nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Location> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(bool, &Location)> = self
            .locations
            .iter()
            .filter_map(|location| {
                let name = location.name.to_lowercase();
                name.contains(&needle)
                    .then(|| (name.starts_with(&needle), location))
            })
            .collect();

        // prefix matches before infix matches, then by population
        hits.sort_by(|(a_prefix, a), (b_prefix, b)| {
            b_prefix
                .cmp(a_prefix)
                .then_with(|| b.population.cmp(&a.population))
        });

        hits.into_iter().take(limit).map(|(_, l)| l).collect()
    }
}
