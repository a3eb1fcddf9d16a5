use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning harvested sources into a store.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("source '{source_tag}' has no backing input at {}", path.display())]
    SourceNotFound { source_tag: String, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::SourceNotFound { .. })
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
