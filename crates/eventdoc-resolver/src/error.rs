use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while splitting and locating a `$ref` (E2001–E2003).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// E2001: The reference string is empty.
    #[error("E2001: empty $ref")]
    Empty,

    /// E2002: The reference is not `<path>#<pointer>` shaped.
    #[error("E2002: malformed $ref '{0}'")]
    Malformed(String),

    /// E2003: No resolution strategy found an existing target file.
    #[error("E2003: unresolved $ref '{0}'")]
    Unresolved(String),
}

/// Errors produced while resolving a single service, channel or event (E2010–E2013).
///
/// None of these abort a batch run: callers iterating over many documents log
/// and skip the failing item.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// E2010: A required document is absent.
    #[error("E2010: {what} not found: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// E2011: The YAML parsed but lacks the expected keys.
    #[error("E2011: malformed {what} {}: {reason}", .path.display())]
    Malformed {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// E2012: The file is not valid YAML.
    #[error("E2012: YAML parse error in {}: {message}", .path.display())]
    Yaml { path: PathBuf, message: String },

    /// E2013: The layout configuration is invalid.
    #[error("E2013: invalid layout configuration: {0}")]
    Config(String),

    /// The `$ref` itself could not be resolved.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// I/O error reading a document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    pub(crate) fn malformed(
        what: &'static str,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        ResolveError::Malformed {
            what,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code, used by the CLI's machine-readable reports.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::NotFound { .. } => "E2010",
            ResolveError::Malformed { .. } => "E2011",
            ResolveError::Yaml { .. } => "E2012",
            ResolveError::Config(_) => "E2013",
            ResolveError::Reference(ReferenceError::Empty) => "E2001",
            ResolveError::Reference(ReferenceError::Malformed(_)) => "E2002",
            ResolveError::Reference(ReferenceError::Unresolved(_)) => "E2003",
            ResolveError::Io(_) => "E2000",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}
