pub mod config;
pub mod core;
pub mod error;
pub mod indexes;
pub mod knowledge_graph;
pub mod models;
pub mod service;
pub mod store;
pub mod utils;

pub use config::Configuration;
pub use core::{extract_resources_from_graph, merge_candidates, select_richest};
pub use error::{CatalogError, CatalogResult};
pub use indexes::DateBound;
pub use knowledge_graph::RawGraph;
pub use models::{CourseInstance, Organization, TrainingResource};
pub use service::{ResourceSummary, TrainingDataService};
pub use store::{load_training_data, StoreStats, TrainingDataStore};
