use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::TrainingResource;
use crate::utils::dates::{midnight_utc, parse_datetime};

/// One dated course instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSchedule {
    pub resource_uri: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl CourseSchedule {
    /// The instance's end, or its start when it has no end.
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.end.unwrap_or(self.start)
    }

    fn overlaps(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
        if start.is_some_and(|s| self.effective_end() < s) {
            return false;
        }
        if end.is_some_and(|e| self.start > e) {
            return false;
        }
        true
    }
}

/// A query bound: a date (midnight UTC) or a timestamp (converted to UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBound(DateTime<Utc>);

impl DateBound {
    /// Accepts a date-only value or any timestamp shape harvested dates use.
    pub fn parse(text: &str) -> Option<Self> {
        parse_datetime(text).map(Self)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<NaiveDate> for DateBound {
    fn from(date: NaiveDate) -> Self {
        Self(midnight_utc(date))
    }
}

/// Timestamps without an offset are taken as UTC.
impl From<NaiveDateTime> for DateBound {
    fn from(naive: NaiveDateTime) -> Self {
        Self(naive.and_utc())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DateBound {
    fn from(dt: DateTime<Tz>) -> Self {
        Self(dt.with_timezone(&Utc))
    }
}

/// Dated instances sorted by start time.
#[derive(Debug, Clone, Default)]
pub struct DateIndex {
    schedules: Vec<CourseSchedule>,
}

impl DateIndex {
    pub fn from_resources(resources: &IndexMap<String, TrainingResource>) -> Self {
        let mut schedules: Vec<CourseSchedule> = resources
            .iter()
            .flat_map(|(uri, resource)| {
                resource.course_instances.iter().filter_map(move |instance| {
                    Some(CourseSchedule {
                        resource_uri: uri.clone(),
                        start: instance.start()?,
                        end: instance.end(),
                    })
                })
            })
            .collect();
        // stable: equal starts stay in resource order
        schedules.sort_by_key(|schedule| schedule.start);
        Self { schedules }
    }

    /// Resources with an instance overlapping `[start, end]`, in schedule order.
    pub fn lookup(
        &self,
        start: Option<DateBound>,
        end: Option<DateBound>,
        limit: Option<usize>,
    ) -> Vec<String> {
        let mut results = Vec::new();
        if limit == Some(0) {
            return results;
        }

        let start = start.map(|b| b.instant());
        let end = end.map(|b| b.instant());
        let mut seen = HashSet::new();
        for schedule in &self.schedules {
            if !schedule.overlaps(start, end) {
                continue;
            }
            if seen.insert(schedule.resource_uri.as_str()) {
                results.push(schedule.resource_uri.clone());
                if limit.is_some_and(|max| results.len() >= max) {
                    break;
                }
            }
        }
        results
    }

    pub fn schedules(&self) -> &[CourseSchedule] {
        &self.schedules
    }
}
