use indexmap::IndexMap;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::core::dedupe::{select_richest, MergeDecision};
use crate::knowledge_graph::{RawGraph, RawNode, RawValue};
use crate::models::{insert_trimmed, push_unique, CourseInstance, DateValue, Organization, TrainingResource};

/// Node types that make a raw node a training resource candidate.
pub const RESOURCE_TYPES: &[&str] = &[
    "Course",
    "LearningResource",
    "Event",
    "EducationEvent",
    "CreativeWork",
    "TrainingMaterial",
];

const EVENT_TYPES: &[&str] = &["Event", "EducationEvent"];

/// Predicates tried, in order, to name an anonymous node.
const LABEL_PREDICATES: &[&str] = &["alternateName", "name", "url"];

/// Turns one source's raw graph into canonical resources.
pub struct ResourceExtractor<'g> {
    graph: &'g RawGraph,
    source: String,
}

impl<'g> ResourceExtractor<'g> {
    pub fn new(graph: &'g RawGraph, source: impl Into<String>) -> Self {
        Self {
            graph,
            source: source.into(),
        }
    }

    /// Extract every candidate, collapsing nodes that resolve to one identifier.
    pub fn extract_all(&self) -> IndexMap<String, TrainingResource> {
        let mut resources = IndexMap::new();
        let mut candidates = 0usize;
        let mut collapsed = 0usize;

        for node in self.graph.nodes_with_any_type(RESOURCE_TYPES) {
            let Some(uri) = self.resolve_identifier(node) else {
                debug!("Skipping node {} without a usable identifier", node.id);
                continue;
            };
            candidates += 1;
            let resource = self.extract_resource(node, uri);
            if select_richest(&mut resources, resource) != MergeDecision::Inserted {
                collapsed += 1;
            }
        }

        info!(
            "Extracted {} resources from '{}' ({} candidates, {} collapsed)",
            resources.len(),
            self.source,
            candidates,
            collapsed
        );
        resources
    }

    /// Canonical `url` if present, else the node's own identifier.
    pub fn resolve_identifier(&self, node: &RawNode) -> Option<String> {
        node_text(node, "url")
            .or_else(|| Some(node.id.trim()).filter(|id| !id.is_empty()))
            .map(str::to_string)
    }

    pub fn extract_resource(&self, node: &RawNode, uri: String) -> TrainingResource {
        let mut resource = TrainingResource::new(uri, self.source.clone());
        resource.types = node.types.iter().cloned().collect();

        resource.name = owned_text(node, "name");
        resource.description = owned_text(node, "description");
        resource.abstract_text = owned_text(node, "abstract");
        resource.headline = owned_text(node, "headline");
        resource.url = owned_text(node, "url");
        resource.version = owned_text(node, "version");
        resource.language = self.first_label(node, "inLanguage");
        resource.interactivity_type = self.first_label(node, "interactivityType");
        resource.license_url = self.first_label(node, "license");
        resource.accessibility_summary = owned_text(node, "accessibilitySummary");
        resource.creative_work_status = self.first_label(node, "creativeWorkStatus");

        resource.provider = node.values("provider").find_map(|v| self.organization(v));

        for value in node.values("keywords") {
            match value {
                RawValue::Literal(literal) => {
                    for keyword in literal.value.split(',') {
                        insert_trimmed(&mut resource.keywords, keyword);
                    }
                }
                other => self.insert_label(&mut resource.keywords, other),
            }
        }

        self.collect_labels(node, "about", &mut resource.topics);
        self.collect_labels(node, "identifier", &mut resource.identifiers);
        self.collect_labels(node, "learningResourceType", &mut resource.learning_resource_types);
        self.collect_labels(node, "educationalLevel", &mut resource.educational_levels);
        self.collect_labels(node, "accessMode", &mut resource.access_modes);
        self.collect_labels(node, "accessModeSufficient", &mut resource.access_mode_sufficient);
        self.collect_labels(node, "accessibilityControl", &mut resource.accessibility_controls);
        self.collect_labels(node, "accessibilityFeature", &mut resource.accessibility_features);

        for value in node.values("audience") {
            if let Some(role) = self.audience_label(value) {
                insert_trimmed(&mut resource.audience_roles, &role);
            }
        }

        self.collect_ordered(node, &["author"], &mut resource.authors);
        self.collect_ordered(node, &["contributor"], &mut resource.contributors);
        self.collect_ordered(
            node,
            &["coursePrerequisites", "competencyRequired"],
            &mut resource.prerequisites,
        );
        self.collect_ordered(node, &["teaches"], &mut resource.teaches);

        resource.is_accessible_for_free = node
            .first_literal("isAccessibleForFree")
            .and_then(|l| l.to_bool());
        resource.is_family_friendly = node
            .first_literal("isFamilyFriendly")
            .and_then(|l| l.to_bool());

        resource.date_published = date_value(node, "datePublished");
        resource.date_modified = date_value(node, "dateModified");

        resource.course_instances = node
            .values("hasCourseInstance")
            .filter_map(|v| self.graph.resolve(v))
            .filter_map(|instance| self.course_instance(instance))
            .collect();

        // Events carry their own schedule and venue.
        let is_event = EVENT_TYPES.iter().any(|t| node.has_type(t));
        if is_event && (node.first("startDate").is_some() || node.first("location").is_some()) {
            if let Some(instance) = self.course_instance(node) {
                resource.course_instances.push(instance);
            }
        }

        resource
    }

    /// Reduce a value to display text: literal text, reference IRI, or for
    /// an anonymous node its alternate name, name or url, else its id.
    pub fn label(&self, value: &RawValue) -> Option<String> {
        let text = match value {
            RawValue::Literal(literal) => literal.value.trim().to_string(),
            RawValue::Reference(iri) => iri.trim().to_string(),
            RawValue::Anonymous(id) => self
                .graph
                .node(id)
                .and_then(|node| LABEL_PREDICATES.iter().find_map(|p| node_text(node, p)))
                .unwrap_or(id.as_str())
                .to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    fn first_label(&self, node: &RawNode, predicate: &str) -> Option<String> {
        node.values(predicate).find_map(|v| self.label(v))
    }

    fn insert_label(&self, target: &mut BTreeSet<String>, value: &RawValue) {
        if let Some(label) = self.label(value) {
            insert_trimmed(target, &label);
        }
    }

    fn collect_labels(&self, node: &RawNode, predicate: &str, target: &mut BTreeSet<String>) {
        for value in node.values(predicate) {
            self.insert_label(target, value);
        }
    }

    fn collect_ordered(&self, node: &RawNode, predicates: &[&str], target: &mut Vec<String>) {
        for predicate in predicates {
            for value in node.values(predicate) {
                if let Some(label) = self.label(value) {
                    push_unique(target, &label);
                }
            }
        }
    }

    fn audience_label(&self, value: &RawValue) -> Option<String> {
        if let RawValue::Anonymous(id) = value {
            if let Some(audience_type) = self.graph.node(id).and_then(|n| node_text(n, "audienceType")) {
                return Some(audience_type.to_string());
            }
        }
        self.label(value)
    }

    /// `legalName` wins over `name`. A bare reference names itself; an
    /// anonymous node with neither yields nothing.
    pub fn organization(&self, value: &RawValue) -> Option<Organization> {
        match value {
            RawValue::Literal(literal) => Organization::new(&literal.value, None),
            RawValue::Reference(iri) => match self.graph.node(iri) {
                Some(node) => {
                    let name = node_text(node, "legalName")
                        .or_else(|| node_text(node, "name"))
                        .unwrap_or(iri.as_str());
                    let url = node_text(node, "url").unwrap_or(iri.as_str());
                    Organization::new(name, Some(url.to_string()))
                }
                None => Organization::new(iri, Some(iri.clone())),
            },
            RawValue::Anonymous(id) => {
                let node = self.graph.node(id)?;
                let name = node_text(node, "legalName").or_else(|| node_text(node, "name"))?;
                Organization::new(name, node_text(node, "url").map(str::to_string))
            }
        }
    }

    fn course_instance(&self, node: &RawNode) -> Option<CourseInstance> {
        let mut instance = CourseInstance {
            start_date: date_value(node, "startDate"),
            end_date: date_value(node, "endDate"),
            mode: self
                .first_label(node, "courseMode")
                .or_else(|| self.first_label(node, "eventAttendanceMode")),
            capacity: node
                .first_literal("maximumAttendeeCapacity")
                .and_then(|l| l.to_int())
                .and_then(|n| u32::try_from(n).ok()),
            funders: node.values("funder").filter_map(|v| self.organization(v)).collect(),
            organizers: node.values("organizer").filter_map(|v| self.organization(v)).collect(),
            ..Default::default()
        };

        if let Some(place) = node.values("location").find_map(|v| self.graph.resolve(v)) {
            self.apply_place(&mut instance, place);
        }

        instance.into_informative()
    }

    fn apply_place(&self, instance: &mut CourseInstance, place: &RawNode) {
        let mut address = None;
        for value in place.values("address") {
            match value {
                RawValue::Literal(literal) => {
                    if instance.street_address.is_none() && !literal.value.trim().is_empty() {
                        instance.street_address = Some(literal.value.trim().to_string());
                    }
                }
                other => {
                    if let Some(node) = self.graph.resolve(other) {
                        address = Some(node);
                        break;
                    }
                }
            }
        }
        // Address parts may sit on the place itself.
        let address = address.unwrap_or(place);

        instance.country = self.first_country(address);
        instance.locality = owned_text(address, "addressLocality");
        instance.postal_code = owned_text(address, "postalCode");
        if let Some(street) = owned_text(address, "streetAddress") {
            instance.street_address = Some(street);
        }

        let geo = place
            .values("geo")
            .find_map(|v| self.graph.resolve(v))
            .unwrap_or(place);
        instance.latitude = geo.first_literal("latitude").and_then(|l| l.to_float());
        instance.longitude = geo.first_literal("longitude").and_then(|l| l.to_float());
    }

    fn first_country(&self, address: &RawNode) -> Option<String> {
        address.values("addressCountry").find_map(|value| match value {
            // Country nodes are named rather than labelled by code.
            RawValue::Reference(iri) => match self.graph.node(iri) {
                Some(country) => node_text(country, "name")
                    .map(str::to_string)
                    .or_else(|| self.label(value)),
                None => self.label(value),
            },
            _ => self.label(value),
        })
    }
}

/// Extract all resources a source's graph describes, keyed by identifier.
pub fn extract_resources_from_graph(graph: &RawGraph, source: &str) -> IndexMap<String, TrainingResource> {
    ResourceExtractor::new(graph, source).extract_all()
}

/// First non-blank literal or reference text of `predicate`.
fn node_text<'a>(node: &'a RawNode, predicate: &str) -> Option<&'a str> {
    node.values(predicate)
        .filter_map(RawValue::as_text)
        .map(str::trim)
        .find(|text| !text.is_empty())
}

fn owned_text(node: &RawNode, predicate: &str) -> Option<String> {
    node_text(node, predicate).map(str::to_string)
}

fn date_value(node: &RawNode, predicate: &str) -> Option<DateValue> {
    node.first_literal(predicate)
        .map(|literal| DateValue::from_raw(literal.value.trim()))
}
