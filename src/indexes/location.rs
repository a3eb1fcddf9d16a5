use indexmap::IndexMap;
use std::collections::HashMap;

use super::{append_unique, normalize_key, take_limited};
use crate::models::TrainingResource;

/// Course instances keyed by country and by (country, city).
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    country_map: HashMap<String, Vec<String>>,
    country_city_map: HashMap<(String, String), Vec<String>>,
}

impl LocationIndex {
    pub fn from_resources(resources: &IndexMap<String, TrainingResource>) -> Self {
        let mut index = Self::default();
        for (uri, resource) in resources {
            for instance in &resource.course_instances {
                let Some(country) = instance.country.as_deref().map(normalize_key) else {
                    continue;
                };
                if country.is_empty() {
                    continue;
                }

                append_unique(index.country_map.entry(country.clone()).or_default(), uri);

                let city = instance.locality.as_deref().map(normalize_key);
                if let Some(city) = city.filter(|c| !c.is_empty()) {
                    append_unique(index.country_city_map.entry((country, city)).or_default(), uri);
                }
            }
        }
        index
    }

    /// With a city only the exact (country, city) pair matches.
    pub fn lookup(&self, country: &str, city: Option<&str>, limit: Option<usize>) -> Vec<String> {
        let country_key = normalize_key(country);
        let city_key = city.map(normalize_key).filter(|c| !c.is_empty());
        match city_key {
            Some(city_key) => take_limited(self.country_city_map.get(&(country_key, city_key)), limit),
            None => take_limited(self.country_map.get(&country_key), limit),
        }
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.country_map.keys().map(String::as_str)
    }
}
