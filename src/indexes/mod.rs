//! Lookup structures built once over the deduplicated resource map.
//!
//! Every index stores resource identifiers only and normalizes its query
//! input the same way it normalized its keys. A `limit` stops the scan as
//! soon as enough identifiers have been produced.

pub mod date;
pub mod keyword;
pub mod location;
pub mod provider;
pub mod topic;

pub use date::{CourseSchedule, DateBound, DateIndex};
pub use keyword::{tokenize, KeywordIndex};
pub use location::LocationIndex;
pub use provider::ProviderIndex;
pub use topic::TopicIndex;

/// Trim and case-fold a key or query.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Append `uri` unless it is already the bucket's latest entry.
///
/// Builders visit resources one at a time, so a resource can only repeat
/// directly after itself.
fn append_unique(bucket: &mut Vec<String>, uri: &str) {
    if bucket.last().map(String::as_str) != Some(uri) {
        bucket.push(uri.to_string());
    }
}

fn take_limited(uris: Option<&Vec<String>>, limit: Option<usize>) -> Vec<String> {
    let Some(uris) = uris else {
        return Vec::new();
    };
    uris.iter()
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}
