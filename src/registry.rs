//! The fixed set of coastal locations an ingestion pass covers.

use serde::{Deserialize, Serialize};

use crate::models::SourceSlugs;
use crate::validation;

/// One registry entry: a (country, city) key plus per-source slugs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub country: String,
    pub city: String,
    pub tide_slug: String,
    pub weather_slug: String,
}

impl LocationEntry {
    pub fn new(country: &str, city: &str, tide_slug: &str, weather_slug: &str) -> Self {
        Self {
            country: country.to_string(),
            city: city.to_string(),
            tide_slug: tide_slug.to_string(),
            weather_slug: weather_slug.to_string(),
        }
    }

    pub fn slugs(&self) -> SourceSlugs {
        SourceSlugs {
            tide: self.tide_slug.clone(),
            weather: self.weather_slug.clone(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_location(&self.country, &self.city)?;
        if self.tide_slug.trim().is_empty() || self.weather_slug.trim().is_empty() {
            anyhow::bail!("Location {}/{} has an empty source slug", self.country, self.city);
        }
        Ok(())
    }
}

const DEFAULT_LOCATIONS: &[(&str, &str, &str, &str)] = &[
    ("France", "Brest", "brest", "fr/brest"),
    ("France", "Saint-Malo", "saint-malo", "fr/saint-malo"),
    ("France", "La Rochelle", "la-rochelle", "fr/la-rochelle"),
    ("France", "Arcachon", "arcachon", "fr/arcachon"),
    ("France", "Biarritz", "biarritz", "fr/biarritz"),
    ("France", "Cherbourg", "cherbourg", "fr/cherbourg"),
    ("Spain", "San Sebastian", "san-sebastian", "es/san-sebastian"),
    ("United Kingdom", "Plymouth", "plymouth", "gb/plymouth"),
];

/// Built-in registry used when the configuration lists no locations
pub fn default_registry() -> Vec<LocationEntry> {
    DEFAULT_LOCATIONS
        .iter()
        .map(|(country, city, tide, weather)| LocationEntry::new(country, city, tide, weather))
        .collect()
}
