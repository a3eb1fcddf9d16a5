pub mod dedupe;
pub mod extractor;

pub use dedupe::{merge_candidates, richness_score, select_richest, MergeDecision};
pub use extractor::{extract_resources_from_graph, ResourceExtractor};
