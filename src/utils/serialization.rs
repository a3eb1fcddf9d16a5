use anyhow::{Context, Result};
use colored::*;
use serde::{Deserialize, Serialize};

use crate::models::TrainingResource;
use crate::service::ResourceSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    Table,
    Json,
    Csv,
}

const CSV_HEADER: &[&str] = &["uri", "name", "source", "provider", "topics", "next_start", "location"];

/// Renders search results for the terminal.
pub struct SummaryRenderer {
    colorize: bool,
}

impl SummaryRenderer {
    pub fn new(colorize: bool) -> Self {
        Self { colorize }
    }

    pub fn render(&self, summaries: &[ResourceSummary], format: ResultFormat) -> Result<String> {
        match format {
            ResultFormat::Table => Ok(self.render_table(summaries)),
            ResultFormat::Json => {
                serde_json::to_string_pretty(summaries).context("Failed to serialize results to JSON")
            }
            ResultFormat::Csv => Ok(render_csv(summaries)),
        }
    }

    fn render_table(&self, summaries: &[ResourceSummary]) -> String {
        if summaries.is_empty() {
            return "No matching resources".to_string();
        }

        let mut output = String::new();
        for (i, summary) in summaries.iter().enumerate() {
            let name = if self.colorize {
                summary.name.bright_yellow().to_string()
            } else {
                summary.name.clone()
            };
            let source = if self.colorize {
                summary.source.bright_cyan().to_string()
            } else {
                summary.source.clone()
            };
            output.push_str(&format!("{:>3}. {} [{}]\n", i + 1, name, source));
            output.push_str(&format!("     {}\n", summary.uri));
            if let Some(provider) = &summary.provider {
                output.push_str(&format!("     Provider: {}\n", provider));
            }
            if !summary.topics.is_empty() {
                output.push_str(&format!("     Topics: {}\n", summary.topics.join(", ")));
            }
            for slot in &summary.schedule {
                let start = slot.start.map(|d| d.format("%Y-%m-%d").to_string());
                let end = slot.end.map(|d| d.format("%Y-%m-%d").to_string());
                let when = match (start, end) {
                    (Some(s), Some(e)) if s != e => format!("{} to {}", s, e),
                    (Some(s), _) => s,
                    (None, Some(e)) => format!("until {}", e),
                    (None, None) => "undated".to_string(),
                };
                let mut line = format!("     When: {}", when);
                if let Some(location) = &slot.location {
                    line.push_str(&format!(" @ {}", location));
                }
                if let Some(mode) = &slot.mode {
                    line.push_str(&format!(" ({})", mode));
                }
                output.push_str(&line);
                output.push('\n');
            }
        }
        output.truncate(output.trim_end().len());
        output
    }
}

fn render_csv(summaries: &[ResourceSummary]) -> String {
    let mut lines = vec![CSV_HEADER.join(",")];
    for summary in summaries {
        let first_slot = summary.schedule.iter().find(|slot| slot.start.is_some());
        let fields = [
            summary.uri.clone(),
            summary.name.clone(),
            summary.source.clone(),
            summary.provider.clone().unwrap_or_default(),
            summary.topics.join(" "),
            first_slot
                .and_then(|slot| slot.start)
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            first_slot.and_then(|slot| slot.location.clone()).unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        lines.push(row.join(","));
    }
    lines.join("\n")
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Data-quality notes for resources that loaded but look incomplete.
pub fn audit_resources<'a, I>(resources: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a TrainingResource>,
{
    let mut issues = Vec::new();

    for resource in resources {
        if resource.name.is_none() {
            issues.push(format!("{}: no name", resource.uri));
        }
        if !resource.uri.starts_with("http://") && !resource.uri.starts_with("https://") {
            issues.push(format!("{}: identifier is not an http(s) URL", resource.uri));
        }
        for instance in &resource.course_instances {
            for (label, date) in [("start", &instance.start_date), ("end", &instance.end_date)] {
                if let Some(date) = date {
                    if date.parsed.is_none() {
                        issues.push(format!("{}: unparseable {} date '{}'", resource.uri, label, date.raw));
                    }
                }
            }
            if let (Some(start), Some(end)) = (instance.start(), instance.end()) {
                if end < start {
                    issues.push(format!("{}: course instance ends before it starts", resource.uri));
                }
            }
        }
    }

    issues
}
