use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::debug;

use crate::models::TrainingResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Inserted,
    Replaced,
    KeptExisting,
}

/// Count of populated fields; each field contributes at most one point.
pub fn richness_score(resource: &TrainingResource) -> usize {
    let scalars = [
        resource.name.is_some(),
        resource.description.is_some(),
        resource.abstract_text.is_some(),
        resource.headline.is_some(),
        resource.url.is_some(),
        resource.language.is_some(),
        resource.interactivity_type.is_some(),
        resource.license_url.is_some(),
        resource.accessibility_summary.is_some(),
        resource.creative_work_status.is_some(),
        resource.version.is_some(),
        resource.provider.is_some(),
        resource.is_accessible_for_free.is_some(),
        resource.is_family_friendly.is_some(),
        resource.date_published.is_some(),
        resource.date_modified.is_some(),
    ];

    let collections = [
        !resource.keywords.is_empty(),
        !resource.topics.is_empty(),
        !resource.identifiers.is_empty(),
        !resource.learning_resource_types.is_empty(),
        !resource.educational_levels.is_empty(),
        !resource.access_modes.is_empty(),
        !resource.access_mode_sufficient.is_empty(),
        !resource.accessibility_controls.is_empty(),
        !resource.accessibility_features.is_empty(),
        !resource.audience_roles.is_empty(),
        !resource.authors.is_empty(),
        !resource.contributors.is_empty(),
        !resource.prerequisites.is_empty(),
        !resource.teaches.is_empty(),
        !resource.course_instances.is_empty(),
    ];

    scalars.iter().chain(collections.iter()).filter(|&&set| set).count()
}

/// Keep whichever of the stored and candidate entity scores higher.
/// Ties keep the one already stored.
pub fn select_richest(
    resources: &mut IndexMap<String, TrainingResource>,
    candidate: TrainingResource,
) -> MergeDecision {
    match resources.get_mut(&candidate.uri) {
        None => {
            resources.insert(candidate.uri.clone(), candidate);
            MergeDecision::Inserted
        }
        Some(existing) => {
            let existing_score = richness_score(existing);
            let candidate_score = richness_score(&candidate);
            if candidate_score > existing_score {
                debug!(
                    "Replacing {} from '{}' (score {}) with '{}' (score {})",
                    candidate.uri, existing.source, existing_score, candidate.source, candidate_score
                );
                *existing = candidate;
                MergeDecision::Replaced
            } else {
                MergeDecision::KeptExisting
            }
        }
    }
}

/// Resolve every identifier to a single winner.
///
/// Candidates are grouped by uri in first-seen order and each group is
/// settled independently, so the outcome matches applying
/// [`select_richest`] to the candidates one by one.
pub fn merge_candidates<I>(candidates: I) -> IndexMap<String, TrainingResource>
where
    I: IntoIterator<Item = TrainingResource>,
{
    let mut groups: IndexMap<String, Vec<TrainingResource>> = IndexMap::new();
    for candidate in candidates {
        groups.entry(candidate.uri.clone()).or_default().push(candidate);
    }

    let winners: Vec<TrainingResource> = groups
        .into_values()
        .collect::<Vec<_>>()
        .into_par_iter()
        .filter_map(richest_of)
        .collect();

    winners
        .into_iter()
        .map(|resource| (resource.uri.clone(), resource))
        .collect()
}

fn richest_of(group: Vec<TrainingResource>) -> Option<TrainingResource> {
    group
        .into_iter()
        .map(|resource| (richness_score(&resource), resource))
        .reduce(|best, candidate| if candidate.0 > best.0 { candidate } else { best })
        .map(|(_, resource)| resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseInstance, Organization};

    fn resource(uri: &str, source: &str) -> TrainingResource {
        TrainingResource::new(uri, source)
    }

    #[test]
    fn test_score_counts_fields_not_elements() {
        let mut r = resource("u", "tess");
        r.name = Some("Intro".into());
        r.keywords = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        r.course_instances = vec![CourseInstance::default(), CourseInstance::default()];
        assert_eq!(richness_score(&r), 3);
    }

    #[test]
    fn test_description_beats_larger_collections() {
        let mut base = resource("u", "tess");
        base.keywords.insert("fair".into());
        base.topics.insert("topic_3391".into());

        let mut richer = base.clone();
        richer.description = Some("A course".into());

        let mut padded = base.clone();
        padded.keywords.extend(["x", "y", "z"].iter().map(|s| s.to_string()));

        assert!(richness_score(&richer) > richness_score(&base));
        assert!(richness_score(&richer) > richness_score(&padded));
    }

    #[test]
    fn test_select_richest_prefers_higher_score() {
        let mut map = IndexMap::new();
        let sparse = resource("u", "tess");
        let mut rich = resource("u", "gtn");
        rich.provider = Organization::new("ELIXIR", None);

        assert_eq!(select_richest(&mut map, sparse), MergeDecision::Inserted);
        assert_eq!(select_richest(&mut map, rich), MergeDecision::Replaced);
        assert_eq!(map["u"].source, "gtn");
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let mut map = IndexMap::new();
        let mut first = resource("u", "tess");
        first.name = Some("First".into());
        let mut second = resource("u", "gtn");
        second.headline = Some("Second".into());

        select_richest(&mut map, first);
        assert_eq!(select_richest(&mut map, second), MergeDecision::KeptExisting);
        assert_eq!(map["u"].source, "tess");
    }

    #[test]
    fn test_outcome_independent_of_arrival_order() {
        let sparse = resource("u", "tess");
        let mut rich = resource("u", "gtn");
        rich.name = Some("Named".into());

        let forward = merge_candidates(vec![sparse.clone(), rich.clone()]);
        let backward = merge_candidates(vec![rich, sparse]);
        assert_eq!(forward["u"].source, "gtn");
        assert_eq!(backward["u"].source, "gtn");
    }

    #[test]
    fn test_merge_candidates_matches_sequential_selection() {
        let mut candidates = Vec::new();
        for (uri, source, named) in [
            ("b", "tess", false),
            ("a", "tess", true),
            ("b", "gtn", true),
            ("a", "gtn", false),
            ("c", "gtn", false),
        ] {
            let mut r = resource(uri, source);
            if named {
                r.name = Some(format!("{uri} from {source}"));
            }
            candidates.push(r);
        }

        let mut sequential = IndexMap::new();
        for candidate in candidates.clone() {
            select_richest(&mut sequential, candidate);
        }
        let parallel = merge_candidates(candidates);

        assert_eq!(parallel, sequential);
        let order: Vec<_> = parallel.keys().cloned().collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_eq!(parallel["b"].source, "gtn");
        assert_eq!(parallel["a"].source, "tess");
    }
}
