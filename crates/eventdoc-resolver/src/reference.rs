//! `$ref` splitting and target lookup.
//!
//! A reference has the shape `<relative-path>#<json-pointer>`. The data seen
//! in practice uses three spellings of the path part:
//!
//! - relative to the referencing document: `../channels/order/order.created.yaml#/channels/orderCreated`
//! - relative to the input root: `channels/order/order.created.yaml#/channels/orderCreated`
//! - pointer-only, targeting the referencing document: `#/channels/orderCreated/messages/Created`
//! - relative to the home directory of the target kind, e.g. the configured
//!   channels directory: `order/order.created.yaml#/channels/orderCreated`
//!
//! Each spelling is handled by one strategy in [`STRATEGIES`], tried in order.

use std::path::{Component, Path, PathBuf};

use crate::document::pointer_tail;
use crate::error::ReferenceError;

/// A syntactically valid `$ref`, split at `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRef<'a> {
    pub raw: &'a str,
    pub path: &'a str,
    /// Pointer without the leading `#`; empty when the reference has none.
    pub pointer: &'a str,
}

impl<'a> RawRef<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, ReferenceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let (path, pointer) = match trimmed.split_once('#') {
            Some((path, pointer)) => (path, pointer),
            None => (trimmed, ""),
        };

        if pointer.contains('#') {
            return Err(ReferenceError::Malformed(raw.to_string()));
        }
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(ReferenceError::Malformed(raw.to_string()));
        }
        if path.is_empty() && pointer.is_empty() {
            return Err(ReferenceError::Malformed(raw.to_string()));
        }

        Ok(RawRef {
            raw: trimmed,
            path,
            pointer,
        })
    }

    /// Number of `/` separators in the path part.
    pub fn separators(&self) -> usize {
        self.path.matches('/').count()
    }
}

/// What a reference is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct RefContext<'a> {
    /// Input root.
    pub root: &'a Path,
    /// The document containing the reference, if known.
    pub document: Option<&'a Path>,
    /// Directory the target kind lives in, tried last.
    pub base: Option<&'a Path>,
}

impl<'a> RefContext<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self {
            root,
            document: None,
            base: None,
        }
    }

    pub fn with_document(mut self, document: Option<&'a Path>) -> Self {
        self.document = document;
        self
    }

    pub fn with_base(mut self, base: &'a Path) -> Self {
        self.base = Some(base);
        self
    }
}

/// An existing target file and the pointer into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    pub path: PathBuf,
    pub pointer: String,
}

impl ResolvedRef {
    /// The key the pointer ends in; the container identifier for message refs.
    pub fn container_id(&self) -> Option<String> {
        pointer_tail(&self.pointer)
    }
}

/// A single resolution strategy.
pub type Strategy = fn(&RawRef<'_>, &RefContext<'_>) -> Option<ResolvedRef>;

/// Strategies in priority order. The first one returning `Some` wins.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("pointer_only", pointer_only),
    ("relative_to_document", relative_to_document),
    ("relative_to_root", relative_to_root),
    ("relative_to_base", relative_to_base),
];

/// Resolve `raw` against `ctx`.
pub fn resolve(raw: &str, ctx: &RefContext<'_>) -> Result<ResolvedRef, ReferenceError> {
    let parsed = RawRef::parse(raw)?;

    for (name, strategy) in STRATEGIES {
        if let Some(resolved) = strategy(&parsed, ctx) {
            tracing::trace!(
                reference = parsed.raw,
                strategy = *name,
                target = %resolved.path.display(),
                "resolved $ref"
            );
            return Ok(resolved);
        }
    }

    Err(ReferenceError::Unresolved(parsed.raw.to_string()))
}

/// `#/...`: the referencing document itself.
pub fn pointer_only(raw: &RawRef<'_>, ctx: &RefContext<'_>) -> Option<ResolvedRef> {
    if !raw.path.is_empty() {
        return None;
    }
    let document = ctx.document?;
    Some(ResolvedRef {
        path: document.to_path_buf(),
        pointer: raw.pointer.to_string(),
    })
}

/// Path resolved from the referencing document's directory.
pub fn relative_to_document(raw: &RawRef<'_>, ctx: &RefContext<'_>) -> Option<ResolvedRef> {
    if raw.path.is_empty() || Path::new(raw.path).is_absolute() {
        return None;
    }
    let base = ctx.document?.parent()?;
    existing(normalize(&base.join(raw.path)), raw)
}

/// Path resolved from the input root, ignoring leading `./` and `../` segments.
pub fn relative_to_root(raw: &RawRef<'_>, ctx: &RefContext<'_>) -> Option<ResolvedRef> {
    // A bare file name with a document context was already tried relative to it.
    if raw.separators() == 0 && ctx.document.is_some() {
        return None;
    }
    let stripped = strip_leading_parents(raw.path);
    if stripped.is_empty() {
        return None;
    }
    existing(ctx.root.join(stripped), raw)
}

/// Path resolved from the context's base directory.
pub fn relative_to_base(raw: &RawRef<'_>, ctx: &RefContext<'_>) -> Option<ResolvedRef> {
    let base = ctx.base?;
    let stripped = strip_leading_parents(raw.path);
    if stripped.is_empty() {
        return None;
    }
    existing(base.join(stripped), raw)
}

fn existing(path: PathBuf, raw: &RawRef<'_>) -> Option<ResolvedRef> {
    path.is_file().then(|| ResolvedRef {
        path,
        pointer: raw.pointer.to_string(),
    })
}

fn strip_leading_parents(path: &str) -> &str {
    let mut rest = path;
    loop {
        if let Some(r) = rest.strip_prefix("../") {
            rest = r;
        } else if let Some(r) = rest.strip_prefix("./") {
            rest = r;
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
        } else {
            return rest;
        }
    }
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
