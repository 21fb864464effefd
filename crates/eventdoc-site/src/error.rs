use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while generating site data.
#[derive(Debug, Error)]
pub enum SiteError {
    /// Resolving an input document failed.
    #[error(transparent)]
    Resolve(#[from] eventdoc_resolver::ResolveError),

    /// E3001: An output file or directory could not be written.
    #[error("E3001: cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
