use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::utils::dates::parse_datetime;

/// A harvested date: the text as published plus its UTC reading, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<DateTime<Utc>>,
}

impl DateValue {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = parse_datetime(&raw);
        Self { raw, parsed }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Organization {
    /// Returns `None` when the trimmed name is empty.
    pub fn new(name: &str, url: Option<String>) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            url,
        })
    }
}

/// One scheduled offering of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseInstance {
    pub start_date: Option<DateValue>,
    pub end_date: Option<DateValue>,
    pub mode: Option<String>,
    pub capacity: Option<u32>,
    pub country: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub street_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub funders: Vec<Organization>,
    #[serde(default)]
    pub organizers: Vec<Organization>,
}

impl CourseInstance {
    /// Keeps the instance only if it carries something a query can match on.
    pub fn into_informative(self) -> Option<Self> {
        let informative = self.start_date.is_some()
            || self.end_date.is_some()
            || self.mode.is_some()
            || self.capacity.is_some()
            || self.country.is_some()
            || self.locality.is_some();
        informative.then_some(self)
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start_date.as_ref().and_then(|d| d.parsed)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end_date.as_ref().and_then(|d| d.parsed)
    }
}

/// Canonical description of one course, tutorial or event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingResource {
    pub uri: String,
    pub source: String,
    pub types: BTreeSet<String>,

    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub headline: Option<String>,
    pub url: Option<String>,
    pub language: Option<String>,
    pub interactivity_type: Option<String>,
    pub license_url: Option<String>,
    pub accessibility_summary: Option<String>,
    pub creative_work_status: Option<String>,
    pub version: Option<String>,

    pub provider: Option<Organization>,

    pub keywords: BTreeSet<String>,
    pub topics: BTreeSet<String>,
    pub identifiers: BTreeSet<String>,
    pub learning_resource_types: BTreeSet<String>,
    pub educational_levels: BTreeSet<String>,
    pub access_modes: BTreeSet<String>,
    pub access_mode_sufficient: BTreeSet<String>,
    pub accessibility_controls: BTreeSet<String>,
    pub accessibility_features: BTreeSet<String>,
    pub audience_roles: BTreeSet<String>,

    pub authors: Vec<String>,
    pub contributors: Vec<String>,
    pub prerequisites: Vec<String>,
    pub teaches: Vec<String>,

    pub is_accessible_for_free: Option<bool>,
    pub is_family_friendly: Option<bool>,

    pub date_published: Option<DateValue>,
    pub date_modified: Option<DateValue>,

    pub course_instances: Vec<CourseInstance>,
}

impl TrainingResource {
    pub fn new(uri: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    /// Display label used in listings; falls back to the uri.
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uri)
    }
}

/// Appends `value` unless it is blank or already present.
pub fn push_unique(values: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if value.is_empty() || values.iter().any(|v| v == value) {
        return;
    }
    values.push(value.to_string());
}

/// Inserts a trimmed, non-blank value into a set field.
pub fn insert_trimmed(values: &mut BTreeSet<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        values.insert(value.to_string());
    }
}
