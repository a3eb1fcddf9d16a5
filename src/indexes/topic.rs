use indexmap::IndexMap;
use std::collections::HashMap;

use super::{append_unique, normalize_key, take_limited};
use crate::models::TrainingResource;

/// Exact match on a topic, or on the last path segment of a topic IRI.
#[derive(Debug, Clone, Default)]
pub struct TopicIndex {
    topic_to_resources: HashMap<String, Vec<String>>,
}

impl TopicIndex {
    pub fn from_resources(resources: &IndexMap<String, TrainingResource>) -> Self {
        let mut topic_to_resources: HashMap<String, Vec<String>> = HashMap::new();
        for (uri, resource) in resources {
            for topic in &resource.topics {
                append_unique(topic_to_resources.entry(normalize_key(topic)).or_default(), uri);
                if let Some(short) = short_name(topic) {
                    append_unique(topic_to_resources.entry(short).or_default(), uri);
                }
            }
        }
        Self { topic_to_resources }
    }

    pub fn lookup(&self, topic: &str, limit: Option<usize>) -> Vec<String> {
        take_limited(self.topic_to_resources.get(&normalize_key(topic)), limit)
    }
}

/// `http://edamontology.org/topic_3391` → `topic_3391`.
fn short_name(topic: &str) -> Option<String> {
    let (_, last) = topic.trim().rsplit_once('/')?;
    let short = normalize_key(last);
    (!short.is_empty()).then_some(short)
}
