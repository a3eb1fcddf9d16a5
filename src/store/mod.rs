use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

use crate::core::dedupe::merge_candidates;
use crate::core::extractor::extract_resources_from_graph;
use crate::error::{CatalogError, CatalogResult};
use crate::indexes::{DateBound, DateIndex, KeywordIndex, LocationIndex, ProviderIndex, TopicIndex};
use crate::knowledge_graph::{load_source_graph, RawGraph};
use crate::models::TrainingResource;

/// Summary figures computed once at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub loaded_at: DateTime<Utc>,
    pub total_resources: usize,
    pub per_source: IndexMap<String, usize>,
    pub type_distribution: BTreeMap<String, usize>,
    pub access_modes: BTreeMap<String, usize>,
    pub audience_roles: BTreeMap<String, usize>,
    /// One resource per distinct topic, the first one carrying it.
    pub sample_topic_examples: BTreeMap<String, String>,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Training Catalog Statistics:")?;
        writeln!(f, "Loaded At: {}", self.loaded_at.to_rfc3339())?;
        writeln!(f, "Total Resources: {}", self.total_resources)?;
        for (source, count) in &self.per_source {
            writeln!(f, "  {}: {}", source, count)?;
        }
        writeln!(f, "Resource Types: {}", self.type_distribution.len())?;
        writeln!(f, "Access Modes: {}", self.access_modes.len())?;
        writeln!(f, "Audience Roles: {}", self.audience_roles.len())?;
        write!(f, "Distinct Topics: {}", self.sample_topic_examples.len())
    }
}

/// Immutable snapshot of deduplicated resources and their indexes.
///
/// A store is only ever handed out fully built. Refreshing means loading a
/// new one and swapping the reference.
#[derive(Debug)]
pub struct TrainingDataStore {
    resources_by_uri: IndexMap<String, TrainingResource>,
    per_source_counts: IndexMap<String, usize>,
    load_timestamp: DateTime<Utc>,
    keyword_index: KeywordIndex,
    provider_index: ProviderIndex,
    location_index: LocationIndex,
    date_index: DateIndex,
    topic_index: TopicIndex,
    stats: StoreStats,
}

impl TrainingDataStore {
    /// Build a store from already-parsed source graphs, in source order.
    pub fn from_graphs<'a, I>(graphs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a RawGraph)>,
    {
        let mut per_source_counts = IndexMap::new();
        let mut candidates = Vec::new();

        for (source, graph) in graphs {
            let resources = extract_resources_from_graph(graph, source);
            per_source_counts.insert(source.to_string(), resources.len());
            candidates.extend(resources.into_values());
        }

        let resources_by_uri = merge_candidates(candidates);
        Self::from_resources(resources_by_uri, per_source_counts)
    }

    fn from_resources(
        resources_by_uri: IndexMap<String, TrainingResource>,
        per_source_counts: IndexMap<String, usize>,
    ) -> Self {
        let load_timestamp = Utc::now();
        let started = Instant::now();

        let resources = &resources_by_uri;
        let ((keyword_index, provider_index), (location_index, (date_index, topic_index))) = rayon::join(
            || {
                rayon::join(
                    || KeywordIndex::from_resources(resources),
                    || ProviderIndex::from_resources(resources),
                )
            },
            || {
                rayon::join(
                    || LocationIndex::from_resources(resources),
                    || {
                        rayon::join(
                            || DateIndex::from_resources(resources),
                            || TopicIndex::from_resources(resources),
                        )
                    },
                )
            },
        );
        debug!(
            "Built indexes in {:.3}s ({} tokens, {} providers, {} schedules)",
            started.elapsed().as_secs_f64(),
            keyword_index.token_count(),
            provider_index.provider_count(),
            date_index.schedules().len()
        );

        let stats = build_stats(&resources_by_uri, &per_source_counts, load_timestamp);

        Self {
            resources_by_uri,
            per_source_counts,
            load_timestamp,
            keyword_index,
            provider_index,
            location_index,
            date_index,
            topic_index,
            stats,
        }
    }

    pub fn resource_count(&self) -> usize {
        self.resources_by_uri.len()
    }

    pub fn resource_by_uri(&self, uri: &str) -> Option<&TrainingResource> {
        self.resources_by_uri.get(uri)
    }

    /// Resources in the order they were first seen.
    pub fn resources(&self) -> impl Iterator<Item = &TrainingResource> {
        self.resources_by_uri.values()
    }

    pub fn resources_by_uri(&self) -> &IndexMap<String, TrainingResource> {
        &self.resources_by_uri
    }

    pub fn per_source_counts(&self) -> &IndexMap<String, usize> {
        &self.per_source_counts
    }

    pub fn load_timestamp(&self) -> DateTime<Utc> {
        self.load_timestamp
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn lookup_keyword(&self, query: &str, limit: Option<usize>) -> Vec<String> {
        self.keyword_index.lookup(query, limit)
    }

    pub fn lookup_provider(&self, name: &str, limit: Option<usize>) -> Vec<String> {
        self.provider_index.lookup(name, limit)
    }

    pub fn lookup_location(&self, country: &str, city: Option<&str>, limit: Option<usize>) -> Vec<String> {
        self.location_index.lookup(country, city, limit)
    }

    pub fn lookup_date(
        &self,
        start: Option<DateBound>,
        end: Option<DateBound>,
        limit: Option<usize>,
    ) -> Vec<String> {
        self.date_index.lookup(start, end, limit)
    }

    pub fn lookup_topic(&self, topic: &str, limit: Option<usize>) -> Vec<String> {
        self.topic_index.lookup(topic, limit)
    }

    pub fn keyword_index(&self) -> &KeywordIndex {
        &self.keyword_index
    }

    pub fn provider_index(&self) -> &ProviderIndex {
        &self.provider_index
    }

    pub fn location_index(&self) -> &LocationIndex {
        &self.location_index
    }

    pub fn date_index(&self) -> &DateIndex {
        &self.date_index
    }

    pub fn topic_index(&self) -> &TopicIndex {
        &self.topic_index
    }
}

/// Load, extract, deduplicate and index every source.
///
/// All inputs are checked before any is parsed: a single missing source
/// fails the whole call and no store is produced.
pub fn load_training_data<I, S, P>(sources: I) -> CatalogResult<TrainingDataStore>
where
    I: IntoIterator<Item = (S, P)>,
    S: Into<String>,
    P: Into<PathBuf>,
{
    let sources: Vec<(String, PathBuf)> = sources
        .into_iter()
        .map(|(tag, path)| (tag.into(), path.into()))
        .collect();

    if let Some((tag, path)) = sources.iter().find(|(_, path)| !path.exists()) {
        return Err(CatalogError::SourceNotFound {
            source_tag: tag.clone(),
            path: path.clone(),
        });
    }

    let started = Instant::now();
    let mut graphs = Vec::with_capacity(sources.len());
    for (tag, path) in &sources {
        graphs.push((tag.as_str(), load_source_graph(tag, path)?));
    }

    let store = TrainingDataStore::from_graphs(graphs.iter().map(|(tag, graph)| (*tag, graph)));
    info!(
        "Loaded {} resources from {} sources in {:.2}s",
        store.resource_count(),
        sources.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(store)
}

fn build_stats(
    resources: &IndexMap<String, TrainingResource>,
    per_source_counts: &IndexMap<String, usize>,
    loaded_at: DateTime<Utc>,
) -> StoreStats {
    let mut type_distribution = BTreeMap::new();
    let mut access_modes = BTreeMap::new();
    let mut audience_roles = BTreeMap::new();
    let mut sample_topic_examples = BTreeMap::new();

    for (uri, resource) in resources {
        for resource_type in &resource.types {
            *type_distribution.entry(resource_type.clone()).or_insert(0) += 1;
        }
        for mode in &resource.access_modes {
            *access_modes.entry(mode.clone()).or_insert(0) += 1;
        }
        for role in &resource.audience_roles {
            *audience_roles.entry(role.clone()).or_insert(0) += 1;
        }
        for topic in &resource.topics {
            sample_topic_examples
                .entry(topic.clone())
                .or_insert_with(|| uri.clone());
        }
    }

    StoreStats {
        loaded_at,
        total_resources: resources.len(),
        per_source: per_source_counts.clone(),
        type_distribution,
        access_modes,
        audience_roles,
        sample_topic_examples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::Path;

    const TESS: &str = "https://tess.example.org/courses/python-fair-data";
    const WINTER: &str = "https://tess.example.org/courses/winter-metagenomics";
    const SPRING: &str = "https://tess.example.org/courses/spring-genomics";
    const GTN: &str = "https://training.galaxyproject.org/training-material/topics/fair/tutorials/metadata-basics";

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
    }

    fn sample_sources() -> Vec<(&'static str, PathBuf)> {
        vec![
            ("tess", fixtures().join("tess_sample.ttl")),
            ("gtn", fixtures().join("gtn_sample.ttl")),
        ]
    }

    fn load() -> TrainingDataStore {
        load_training_data(sample_sources()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<DateBound> {
        NaiveDate::from_ymd_opt(y, m, d).map(DateBound::from)
    }

    #[test]
    fn test_loader_parses_sample_resources() {
        let store = load();

        assert_eq!(store.resource_count(), 4);
        assert_eq!(store.per_source_counts()["tess"], 3);
        assert_eq!(store.per_source_counts()["gtn"], 1);

        let tess = store.resource_by_uri(TESS).unwrap();
        assert_eq!(tess.source, "tess");
        assert_eq!(tess.provider.as_ref().unwrap().name, "Bioinformatics.ca");
        assert!(tess.topics.contains("http://edamontology.org/topic_3391"));
        assert_eq!(tess.prerequisites, vec!["Basic Python programming"]);
        let instance = &tess.course_instances[0];
        assert_eq!(instance.country.as_deref(), Some("Canada"));
        assert_eq!(instance.mode.as_deref(), Some("online"));
        assert_eq!(instance.capacity, Some(40));
        assert_eq!(instance.funders[0].name, "ELIXIR");

        let winter = &store.resource_by_uri(WINTER).unwrap().course_instances[0];
        assert!(winter.start().is_some() && winter.end().is_some());
        assert!(store.resource_by_uri(SPRING).unwrap().course_instances[0].start().is_some());

        let gtn = store.resource_by_uri(GTN).unwrap();
        assert_eq!(gtn.source, "gtn");
        assert!(gtn.learning_resource_types.contains("tutorial"));
        assert!(gtn.keywords.contains("FAIR"));
        assert!(gtn.abstract_text.is_some());
        assert_eq!(gtn.authors, vec!["https://orcid.org/0000-0001-2345-6789"]);
        assert_eq!(gtn.contributors, vec!["https://training.galaxyproject.org/hall-of-fame/hexylena/"]);
        assert_eq!(gtn.license_url.as_deref(), Some("https://spdx.org/licenses/CC-BY-4.0.html"));
        let published = gtn.date_published.as_ref().unwrap();
        assert!(published.parsed.is_some());
        assert_eq!(published.raw, "2023-04-17 15:35:37 +0000");
        assert_eq!(gtn.interactivity_type.as_deref(), Some("mixed"));
        assert_eq!(gtn.language.as_deref(), Some("English"));
    }

    #[test]
    fn test_missing_source_fails_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = sample_sources();
        sources.push(("missing", dir.path().join("missing.ttl")));

        let err = load_training_data(sources).unwrap_err();
        match err {
            CatalogError::SourceNotFound { source_tag, .. } => assert_eq!(source_tag, "missing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_source_fails_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.ttl");
        std::fs::write(&broken, "<https://example.org/x> <https://schema.org/name> ").unwrap();
        let mut sources = sample_sources();
        sources.push(("broken", broken));

        assert!(matches!(
            load_training_data(sources),
            Err(CatalogError::Parse { .. })
        ));
    }

    #[test]
    fn test_keyword_lookup() {
        let store = load();
        let results = store.lookup_keyword("FAIR metadata", None);
        assert!(results.iter().any(|u| u == TESS));
        assert!(results.iter().any(|u| u == GTN));
        assert_eq!(store.lookup_keyword("FAIR metadata", Some(1)), vec![TESS]);
    }

    #[test]
    fn test_provider_location_topic_and_date_lookups() {
        let store = load();

        let expected = vec![TESS.to_string()];
        assert_eq!(store.lookup_provider("Bioinformatics.ca", None), expected);
        assert_eq!(store.lookup_provider("bioinformatics.ca", None), expected);
        assert_eq!(store.lookup_provider("BIOINFORMATICS.CA", None), expected);

        assert_eq!(store.lookup_location("Canada", Some("Toronto"), None), vec![TESS]);
        let montreal = store.lookup_location("canada", Some("montreal"), None);
        assert_eq!(montreal, vec![WINTER]);
        let mut country = store.lookup_location("Canada", None, None);
        country.sort();
        let mut expected_country = vec![TESS.to_string(), WINTER.to_string(), SPRING.to_string()];
        expected_country.sort();
        assert_eq!(country, expected_country);

        assert_eq!(store.lookup_topic("topic_3391", None), vec![TESS]);
        assert_eq!(store.lookup_topic("http://edamontology.org/topic_3391", None), vec![TESS]);

        assert_eq!(
            store.lookup_date(date(2025, 1, 1), date(2025, 1, 31), None),
            vec![WINTER, TESS]
        );
        assert_eq!(store.lookup_date(date(2025, 1, 15), date(2025, 1, 16), None), vec![WINTER]);
        assert!(store.lookup_date(date(2025, 1, 26), date(2025, 1, 27), None).is_empty());
    }

    #[test]
    fn test_loading_twice_is_idempotent() {
        let first = load();
        let second = load();
        assert_eq!(first.resources_by_uri(), second.resources_by_uri());
        let firsts: Vec<_> = first.resources().map(|r| r.uri.clone()).collect();
        let seconds: Vec<_> = second.resources().map(|r| r.uri.clone()).collect();
        assert_eq!(firsts, seconds);
        assert_eq!(
            first.lookup_keyword("genomics data", None),
            second.lookup_keyword("genomics data", None)
        );
        assert_eq!(first.lookup_date(None, None, None), second.lookup_date(None, None, None));
    }

    #[test]
    fn test_cross_source_duplicate_keeps_richest() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = dir.path().join("mirror.ttl");
        std::fs::write(
            &mirror,
            format!(
                "@prefix schema: <https://schema.org/> .\n<{TESS}> a schema:Course ; schema:name \"Mirror copy\" .\n"
            ),
        )
        .unwrap();

        let mut sources = sample_sources();
        sources.push(("mirror", mirror));
        let store = load_training_data(sources).unwrap();

        assert_eq!(store.resource_count(), 4);
        assert_eq!(store.per_source_counts()["mirror"], 1);
        assert_eq!(store.resource_by_uri(TESS).unwrap().source, "tess");
    }

    #[test]
    fn test_stats() {
        let store = load();
        let stats = store.stats();
        assert_eq!(stats.total_resources, 4);
        assert_eq!(stats.per_source["tess"], 3);
        assert_eq!(stats.type_distribution["Course"], 3);
        assert_eq!(stats.type_distribution["LearningResource"], 1);
        assert_eq!(stats.access_modes["textual"], 2);
        assert_eq!(stats.audience_roles["Researchers"], 1);
        assert_eq!(stats.sample_topic_examples["http://edamontology.org/topic_3391"], TESS);
        assert_eq!(stats.loaded_at, store.load_timestamp());
        assert!(stats.to_string().contains("Total Resources: 4"));
    }

    #[test]
    fn test_unknown_keys_are_empty() {
        let store = load();
        assert!(store.lookup_keyword("zzz", None).is_empty());
        assert!(store.lookup_provider("nobody", None).is_empty());
        assert!(store.lookup_location("Atlantis", None, None).is_empty());
        assert!(store.lookup_topic("topic_0000", None).is_empty());
        assert!(store.resource_by_uri("https://example.org/none").is_none());
    }
}
