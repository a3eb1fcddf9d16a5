use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Configuration;
use crate::indexes::DateBound;
use crate::models::{CourseInstance, TrainingResource};
use crate::store::{load_training_data, StoreStats, TrainingDataStore};

/// Compact view of a resource returned by searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub uri: String,
    pub name: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<ScheduleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl From<&CourseInstance> for ScheduleSummary {
    fn from(instance: &CourseInstance) -> Self {
        let location = match (&instance.locality, &instance.country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(place), None) | (None, Some(place)) => Some(place.clone()),
            (None, None) => None,
        };
        Self {
            start: instance.start(),
            end: instance.end(),
            mode: instance.mode.clone(),
            location,
        }
    }
}

impl From<&TrainingResource> for ResourceSummary {
    fn from(resource: &TrainingResource) -> Self {
        Self {
            uri: resource.uri.clone(),
            name: resource.title().to_string(),
            source: resource.source.clone(),
            provider: resource.provider.as_ref().map(|p| p.name.clone()),
            url: resource.url.clone(),
            topics: resource.topics.iter().cloned().collect(),
            schedule: resource.course_instances.iter().map(ScheduleSummary::from).collect(),
        }
    }
}

/// Shared access to the current store.
///
/// Readers take a cheap `Arc` snapshot; [`reload`](Self::reload) builds a
/// fresh store off the async runtime and swaps it in only on success.
pub struct TrainingDataService {
    store: RwLock<Arc<TrainingDataStore>>,
    sources: IndexMap<String, PathBuf>,
    default_limit: Option<usize>,
}

impl TrainingDataService {
    pub fn new(store: TrainingDataStore, sources: IndexMap<String, PathBuf>, default_limit: Option<usize>) -> Self {
        Self {
            store: RwLock::new(Arc::new(store)),
            sources,
            default_limit,
        }
    }

    /// Load every configured source and wrap the result.
    pub async fn from_config(config: &Configuration) -> Result<Self> {
        let store = build_store(config.sources.clone()).await?;
        Ok(Self::new(store, config.sources.clone(), config.default_limit))
    }

    pub async fn snapshot(&self) -> Arc<TrainingDataStore> {
        self.store.read().await.clone()
    }

    /// Rebuild from the configured sources. A failed rebuild leaves the
    /// current store in place.
    pub async fn reload(&self) -> Result<Arc<TrainingDataStore>> {
        let fresh = match build_store(self.sources.clone()).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("Reload failed, keeping current store: {:#}", e);
                return Err(e);
            }
        };
        *self.store.write().await = fresh.clone();
        info!("Store reloaded with {} resources", fresh.resource_count());
        Ok(fresh)
    }

    fn effective_limit(&self, limit: Option<usize>) -> Option<usize> {
        limit.or(self.default_limit)
    }

    fn summarize(store: &TrainingDataStore, uris: Vec<String>) -> Vec<ResourceSummary> {
        uris.iter()
            .filter_map(|uri| store.resource_by_uri(uri))
            .map(ResourceSummary::from)
            .collect()
    }

    pub async fn search_by_keyword(&self, query: &str, limit: Option<usize>) -> Vec<ResourceSummary> {
        let store = self.snapshot().await;
        let uris = store.lookup_keyword(query, self.effective_limit(limit));
        Self::summarize(&store, uris)
    }

    pub async fn search_by_provider(&self, provider: &str, limit: Option<usize>) -> Vec<ResourceSummary> {
        let store = self.snapshot().await;
        let uris = store.lookup_provider(provider, self.effective_limit(limit));
        Self::summarize(&store, uris)
    }

    pub async fn search_by_location(
        &self,
        country: &str,
        city: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<ResourceSummary> {
        let store = self.snapshot().await;
        let uris = store.lookup_location(country, city, self.effective_limit(limit));
        Self::summarize(&store, uris)
    }

    pub async fn search_by_date_range(
        &self,
        start: Option<DateBound>,
        end: Option<DateBound>,
        limit: Option<usize>,
    ) -> Vec<ResourceSummary> {
        let store = self.snapshot().await;
        let uris = store.lookup_date(start, end, self.effective_limit(limit));
        Self::summarize(&store, uris)
    }

    pub async fn search_by_topic(&self, topic: &str, limit: Option<usize>) -> Vec<ResourceSummary> {
        let store = self.snapshot().await;
        let uris = store.lookup_topic(topic, self.effective_limit(limit));
        Self::summarize(&store, uris)
    }

    pub async fn resource(&self, uri: &str) -> Option<TrainingResource> {
        self.snapshot().await.resource_by_uri(uri).cloned()
    }

    pub async fn stats(&self) -> StoreStats {
        self.snapshot().await.stats().clone()
    }
}

async fn build_store(sources: IndexMap<String, PathBuf>) -> Result<TrainingDataStore> {
    tokio::task::spawn_blocking(move || load_training_data(sources))
        .await
        .context("Store build task panicked")?
        .context("Failed to load training data")
}
