use indexmap::IndexMap;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use super::append_unique;
use crate::models::TrainingResource;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-z0-9]+").expect("token pattern is valid"))
}

/// Lowercased runs of ASCII letters and digits, in text order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Token → resources whose indexed text contains it, in resource order.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    token_to_resources: HashMap<String, Vec<String>>,
}

impl KeywordIndex {
    pub fn from_resources(resources: &IndexMap<String, TrainingResource>) -> Self {
        let mut token_to_resources: HashMap<String, Vec<String>> = HashMap::new();
        for (uri, resource) in resources {
            for token in collect_tokens(resource) {
                append_unique(token_to_resources.entry(token).or_default(), uri);
            }
        }
        Self { token_to_resources }
    }

    /// Union of matches for each query token, first-seen order across
    /// tokens taken in query order.
    pub fn lookup(&self, query: &str, limit: Option<usize>) -> Vec<String> {
        let mut results = Vec::new();
        if limit == Some(0) {
            return results;
        }

        let mut seen = HashSet::new();
        for token in tokenize(query) {
            let Some(uris) = self.token_to_resources.get(&token) else {
                continue;
            };
            for uri in uris {
                if seen.insert(uri.as_str()) {
                    results.push(uri.clone());
                    if limit.is_some_and(|max| results.len() >= max) {
                        return results;
                    }
                }
            }
        }
        results
    }

    pub fn token_count(&self) -> usize {
        self.token_to_resources.len()
    }
}

fn collect_tokens(resource: &TrainingResource) -> HashSet<String> {
    let scalars = [
        &resource.name,
        &resource.description,
        &resource.abstract_text,
        &resource.headline,
        &resource.interactivity_type,
        &resource.language,
    ];

    let texts = scalars
        .into_iter()
        .flatten()
        .chain(&resource.keywords)
        .chain(&resource.learning_resource_types)
        .chain(&resource.educational_levels)
        .chain(&resource.prerequisites)
        .chain(&resource.teaches);

    texts.flat_map(|text| tokenize(text)).collect()
}
