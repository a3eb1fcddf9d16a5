use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Source tag → harvested Turtle/N-Triples file or directory, in load order.
    pub sources: IndexMap<String, PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<usize>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Configuration {
    /// Load configuration from a YAML or JSON file.
    ///
    /// Relative source paths are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Configuration = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON config: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML config: {}", path.display()))?
        };

        if let Some(base) = path.parent() {
            config.resolve_sources(base);
        }

        Ok(config)
    }

    fn resolve_sources(&mut self, base: &Path) {
        for source_path in self.sources.values_mut() {
            if source_path.is_relative() {
                *source_path = base.join(&*source_path);
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("No sources defined");
        }

        for (tag, path) in &self.sources {
            if tag.trim().is_empty() {
                anyhow::bail!("Source with empty tag: {}", path.display());
            }
            if path.as_os_str().is_empty() {
                anyhow::bail!("Source '{}' has no path", tag);
            }
        }

        if self.default_limit == Some(0) {
            anyhow::bail!("default_limit must be positive");
        }

        Ok(())
    }

    /// Create an example configuration
    pub fn example() -> Self {
        let mut sources = IndexMap::new();
        sources.insert("tess".to_string(), PathBuf::from("data/tess_harvest.ttl"));
        sources.insert("gtn".to_string(), PathBuf::from("data/gtn_harvest.ttl"));

        Configuration {
            name: "ELIXIR training catalog".to_string(),
            description: "Courses and tutorials harvested from TeSS and the Galaxy Training Network".to_string(),
            sources,
            default_limit: Some(25),
            log_level: default_log_level(),
        }
    }
}
