use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::dates::parse_datetime;

pub mod parser;

pub use parser::{load_source_graph, parse_ntriples_str, parse_turtle_str};

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Namespaces whose terms are stored by local name.
const COMPACTED_NAMESPACES: &[&str] = &["https://schema.org/", "http://schema.org/"];

/// Strip the schema.org namespace, leaving any other IRI untouched.
pub fn compact_iri(iri: &str) -> &str {
    for namespace in COMPACTED_NAMESPACES {
        if let Some(local) = iri.strip_prefix(namespace) {
            if !local.is_empty() {
                return local;
            }
        }
    }
    iri
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLiteral {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl RawLiteral {
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn to_int(&self) -> Option<i64> {
        let text = self.value.trim();
        text.parse::<i64>().ok().or_else(|| {
            // "40.0" style counts are common in harvested JSON-LD
            text.parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        })
    }

    pub fn to_float(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|f| f.is_finite())
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self.value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.value)
    }
}

/// The object side of a `(predicate, value)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    Literal(RawLiteral),
    /// An IRI reference.
    Reference(String),
    /// A blank node, by its synthetic `_:` id in the same graph.
    Anonymous(String),
}

impl RawValue {
    pub fn as_literal(&self) -> Option<&RawLiteral> {
        match self {
            RawValue::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// Literal text or reference IRI; anonymous nodes have no direct text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Literal(literal) => Some(literal.as_str()),
            RawValue::Reference(iri) => Some(iri),
            RawValue::Anonymous(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub types: Vec<String>,
    pub properties: Vec<(String, RawValue)>,
}

impl RawNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.starts_with("_:")
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| t == type_name)
    }

    /// All values of `predicate`, in document order.
    pub fn values<'a, 'p>(&'a self, predicate: &'p str) -> Values<'a, 'p> {
        Values {
            inner: self.properties.iter(),
            predicate,
        }
    }

    pub fn first(&self, predicate: &str) -> Option<&RawValue> {
        self.values(predicate).next()
    }

    /// First non-blank literal text of `predicate`.
    pub fn first_literal(&self, predicate: &str) -> Option<&RawLiteral> {
        self.values(predicate)
            .filter_map(RawValue::as_literal)
            .find(|literal| !literal.value.trim().is_empty())
    }
}

pub struct Values<'a, 'p> {
    inner: std::slice::Iter<'a, (String, RawValue)>,
    predicate: &'p str,
}

impl<'a, 'p> Iterator for Values<'a, 'p> {
    type Item = &'a RawValue;

    fn next(&mut self) -> Option<Self::Item> {
        let predicate = self.predicate;
        self.inner
            .find(|(p, _)| p == predicate)
            .map(|(_, value)| value)
    }
}

/// One source's harvested triples, grouped by subject.
#[derive(Debug, Clone, Default)]
pub struct RawGraph {
    nodes: IndexMap<String, RawNode>,
    triple_count: usize,
}

impl RawGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, subject: &str, type_iri: &str) {
        let type_name = compact_iri(type_iri).to_string();
        let node = self.node_entry(subject);
        if !node.types.contains(&type_name) {
            node.types.push(type_name);
        }
        self.triple_count += 1;
    }

    pub fn add_property(&mut self, subject: &str, predicate_iri: &str, value: RawValue) {
        if predicate_iri == RDF_TYPE {
            if let RawValue::Reference(type_iri) = &value {
                let type_iri = type_iri.clone();
                self.add_type(subject, &type_iri);
                return;
            }
        }
        let predicate = compact_iri(predicate_iri).to_string();
        self.node_entry(subject).properties.push((predicate, value));
        self.triple_count += 1;
    }

    fn node_entry(&mut self, subject: &str) -> &mut RawNode {
        self.nodes
            .entry(subject.to_string())
            .or_insert_with(|| RawNode::new(subject))
    }

    pub fn node(&self, id: &str) -> Option<&RawNode> {
        self.nodes.get(id)
    }

    /// Resolve a reference or anonymous value to its node, if described here.
    pub fn resolve(&self, value: &RawValue) -> Option<&RawNode> {
        match value {
            RawValue::Reference(id) | RawValue::Anonymous(id) => self.nodes.get(id),
            RawValue::Literal(_) => None,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RawNode> {
        self.nodes.values()
    }

    pub fn nodes_with_any_type<'a>(
        &'a self,
        type_names: &'a [&'a str],
    ) -> impl Iterator<Item = &'a RawNode> + 'a {
        self.nodes
            .values()
            .filter(move |node| type_names.iter().any(|t| node.has_type(t)))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn triple_count(&self) -> usize {
        self.triple_count
    }

    /// Fold another graph into this one, keeping document order.
    pub fn merge(&mut self, other: RawGraph) {
        self.triple_count += other.triple_count;
        for (id, node) in other.nodes {
            match self.nodes.get_mut(&id) {
                Some(existing) => {
                    for type_name in node.types {
                        if !existing.types.contains(&type_name) {
                            existing.types.push(type_name);
                        }
                    }
                    existing.properties.extend(node.properties);
                }
                None => {
                    self.nodes.insert(id, node);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_iri() {
        assert_eq!(compact_iri("https://schema.org/name"), "name");
        assert_eq!(compact_iri("http://schema.org/Course"), "Course");
        assert_eq!(
            compact_iri("http://purl.org/dc/terms/conformsTo"),
            "http://purl.org/dc/terms/conformsTo"
        );
    }

    #[test]
    fn test_rdf_type_becomes_node_type() {
        let mut graph = RawGraph::new();
        graph.add_property(
            "https://example.org/c1",
            RDF_TYPE,
            RawValue::Reference("https://schema.org/Course".to_string()),
        );
        graph.add_property(
            "https://example.org/c1",
            "https://schema.org/name",
            RawValue::Literal(RawLiteral::simple("Intro")),
        );

        let node = graph.node("https://example.org/c1").unwrap();
        assert!(node.has_type("Course"));
        assert_eq!(node.first_literal("name").unwrap().as_str(), "Intro");
        assert!(node.first("rdf:type").is_none());
        assert_eq!(graph.triple_count(), 2);
    }

    #[test]
    fn test_literal_conversions() {
        assert_eq!(RawLiteral::simple(" 40 ").to_int(), Some(40));
        assert_eq!(RawLiteral::simple("40.0").to_int(), Some(40));
        assert_eq!(RawLiteral::simple("forty").to_int(), None);
        assert_eq!(RawLiteral::simple("43.65").to_float(), Some(43.65));
        assert_eq!(RawLiteral::simple("TRUE").to_bool(), Some(true));
        assert_eq!(RawLiteral::simple("maybe").to_bool(), None);
    }

    #[test]
    fn test_merge_keeps_first_seen_node_order() {
        let mut left = RawGraph::new();
        left.add_property("a", "https://schema.org/name", RawValue::Literal(RawLiteral::simple("A")));
        let mut right = RawGraph::new();
        right.add_property("b", "https://schema.org/name", RawValue::Literal(RawLiteral::simple("B")));
        right.add_property("a", "https://schema.org/url", RawValue::Reference("https://a".into()));

        left.merge(right);
        let ids: Vec<_> = left.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(left.node("a").unwrap().first("url").is_some());
        assert_eq!(left.triple_count(), 3);
    }
}
