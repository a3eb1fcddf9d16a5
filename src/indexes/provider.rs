use indexmap::IndexMap;
use std::collections::HashMap;

use super::{append_unique, normalize_key, take_limited};
use crate::models::TrainingResource;

/// Case-insensitive exact match on provider name.
#[derive(Debug, Clone, Default)]
pub struct ProviderIndex {
    provider_to_resources: HashMap<String, Vec<String>>,
}

impl ProviderIndex {
    pub fn from_resources(resources: &IndexMap<String, TrainingResource>) -> Self {
        let mut provider_to_resources: HashMap<String, Vec<String>> = HashMap::new();
        for (uri, resource) in resources {
            if let Some(provider) = &resource.provider {
                let key = normalize_key(&provider.name);
                if !key.is_empty() {
                    append_unique(provider_to_resources.entry(key).or_default(), uri);
                }
            }
        }
        Self { provider_to_resources }
    }

    pub fn lookup(&self, provider_name: &str, limit: Option<usize>) -> Vec<String> {
        take_limited(self.provider_to_resources.get(&normalize_key(provider_name)), limit)
    }

    pub fn provider_count(&self) -> usize {
        self.provider_to_resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexes::test_support::resources;
    use crate::models::Organization;

    fn provided(uri: &str, provider: &str) -> TrainingResource {
        let mut r = TrainingResource::new(uri, "tess");
        r.provider = Organization::new(provider, None);
        r
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let index = ProviderIndex::from_resources(&resources(vec![
            provided("a", "Bioinformatics.ca"),
            provided("b", "ELIXIR"),
            provided("c", " bioinformatics.CA"),
        ]));

        let expected = vec!["a".to_string(), "c".to_string()];
        assert_eq!(index.lookup("Bioinformatics.ca", None), expected);
        assert_eq!(index.lookup("bioinformatics.ca", None), expected);
        assert_eq!(index.lookup("BIOINFORMATICS.CA", None), expected);
        assert_eq!(index.lookup("BIOINFORMATICS.CA", Some(1)), vec!["a"]);
        assert_eq!(index.provider_count(), 2);
    }

    #[test]
    fn test_no_tokenization() {
        let index = ProviderIndex::from_resources(&resources(vec![provided("a", "Bioinformatics.ca")]));
        assert!(index.lookup("bioinformatics", None).is_empty());
        assert!(index.lookup("unknown", None).is_empty());
    }
}
