//! Message, request and command documents.
//!
//! Events are reached two ways: directly, through the `$ref` a channel holds,
//! or by searching the `messages/<type>/` subtree for a title. A search that
//! finds nothing is a soft miss and still yields a (placeholder) event.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::Layout;
use crate::document::{declared_messages, load_document, string_field, yaml_files};
use crate::error::{ReferenceError, ResolveError};
use crate::model::{Event, EventId, EventKey, EventType, DEFAULT_VERSION};
use crate::reference::{self, RawRef, RefContext};

const WHAT: &str = "message document";

/// How closely a search matched the requested title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    /// Case-sensitive equality.
    Exact,
    /// Case-insensitive equality.
    CaseInsensitive,
    /// Case-insensitive equality with all whitespace removed.
    WhitespaceInsensitive,
}

impl MatchTier {
    /// Tiers in the order they are tried.
    pub const ALL: [MatchTier; 3] = [
        MatchTier::Exact,
        MatchTier::CaseInsensitive,
        MatchTier::WhitespaceInsensitive,
    ];

    pub fn matches(&self, declared: &str, requested: &str) -> bool {
        match self {
            MatchTier::Exact => declared == requested,
            MatchTier::CaseInsensitive => declared.to_lowercase() == requested.to_lowercase(),
            MatchTier::WhitespaceInsensitive => squash(declared) == squash(requested),
        }
    }
}

/// Lowercase `s` and drop all whitespace.
pub(crate) fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Outcome of a title search.
#[derive(Debug, Clone)]
pub enum EventLookup {
    Found {
        event: Event,
        path: PathBuf,
        tier: MatchTier,
    },
    /// Nothing matched; the event is a placeholder.
    SoftMiss(Event),
}

impl EventLookup {
    pub fn event(&self) -> &Event {
        match self {
            EventLookup::Found { event, .. } | EventLookup::SoftMiss(event) => event,
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            EventLookup::Found { event, .. } | EventLookup::SoftMiss(event) => event,
        }
    }

    pub fn is_soft_miss(&self) -> bool {
        matches!(self, EventLookup::SoftMiss(_))
    }
}

/// One titled message container found while walking the type subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub key: EventKey,
    pub container_id: String,
    pub path: PathBuf,
}

/// Resolve an event from a fully qualified `$ref` found in `referrer`.
pub fn resolve_direct(
    layout: &Layout,
    raw_ref: &str,
    referrer: Option<&Path>,
) -> Result<Event, ResolveError> {
    let ctx = RefContext::new(layout.root()).with_document(referrer);
    let resolved = match reference::resolve(raw_ref, &ctx) {
        Ok(resolved) => resolved,
        Err(ReferenceError::Unresolved(_)) => {
            let path = RawRef::parse(raw_ref)
                .map(|r| r.path.to_string())
                .unwrap_or_default();
            return Err(ResolveError::NotFound {
                what: "message file",
                path: path.into(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let doc = load_document(&resolved.path, "message file")?;

    let (container_id, message) = if resolved.pointer.is_empty() {
        declared_messages(&doc)
            .next()
            .map(|(key, msg)| (key.clone(), msg))
            .ok_or_else(|| {
                ResolveError::malformed(WHAT, &resolved.path, "no 'components.messages' entry")
            })?
    } else {
        let message = crate::document::resolve_pointer(&doc, &resolved.pointer)
            .and_then(|v| v.as_object())
            .ok_or_else(|| {
                ResolveError::malformed(
                    WHAT,
                    &resolved.path,
                    format!("pointer '{}' does not select a message", resolved.pointer),
                )
            })?;
        let container_id = resolved
            .container_id()
            .unwrap_or_else(|| resolved.pointer.clone());
        (container_id, message)
    };

    let event_type = infer_type(layout, &resolved.path);
    let event = event_from_message(&container_id, message, event_type);
    tracing::debug!(
        event = %event.id,
        event_type = %event.event_type,
        path = %resolved.path.display(),
        "resolved event"
    );
    Ok(event)
}

/// Search the type's subtree for a message titled `title`.
///
/// Never fails: an unknown type, a missing subtree or no match all produce
/// [`EventLookup::SoftMiss`]. Walks and parses the subtree on every call; use
/// a [`MessageCatalog`] for repeated lookups.
pub fn search(layout: &Layout, event_type: EventType, title: &str) -> EventLookup {
    if !event_type.is_known() || !layout.has_subtree(event_type) {
        return unsupported(event_type, title);
    }
    search_documents(&load_type_documents(layout, event_type), event_type, title)
}

/// Every titled message container under every configured type subtree.
pub fn catalog(layout: &Layout) -> Vec<CatalogEntry> {
    MessageCatalog::load(layout).entries()
}

/// Every distinct `(type, title)` declared, in catalog order.
pub fn enumerate(layout: &Layout) -> Vec<EventKey> {
    MessageCatalog::load(layout).enumerate()
}

/// The parsed documents of every configured type subtree.
///
/// Each subtree is walked and parsed once, on [`MessageCatalog::load`];
/// searches and listings then run against the parsed documents.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    subtrees: Vec<(EventType, Vec<(PathBuf, Value)>)>,
}

impl MessageCatalog {
    pub fn load(layout: &Layout) -> Self {
        let subtrees = layout
            .event_types()
            .iter()
            .map(|&event_type| (event_type, load_type_documents(layout, event_type)))
            .collect();
        Self { subtrees }
    }

    fn documents(&self, event_type: EventType) -> Option<&[(PathBuf, Value)]> {
        self.subtrees
            .iter()
            .find(|(t, _)| *t == event_type)
            .map(|(_, docs)| docs.as_slice())
    }

    /// Number of parsed documents across all subtrees.
    pub fn document_count(&self) -> usize {
        self.subtrees.iter().map(|(_, docs)| docs.len()).sum()
    }

    /// Same contract as [`search`].
    pub fn search(&self, event_type: EventType, title: &str) -> EventLookup {
        match self.documents(event_type) {
            Some(documents) => search_documents(documents, event_type, title),
            None => unsupported(event_type, title),
        }
    }

    /// Every titled message container, in layout type order then path order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();
        for (event_type, documents) in &self.subtrees {
            for (path, doc) in documents {
                for (container_id, message) in declared_messages(doc) {
                    let Some(title) = string_field(message, "title") else {
                        tracing::debug!(
                            container = %container_id,
                            path = %path.display(),
                            "message has no title, not listed"
                        );
                        continue;
                    };
                    entries.push(CatalogEntry {
                        key: EventKey::new(*event_type, title),
                        container_id: container_id.clone(),
                        path: path.clone(),
                    });
                }
            }
        }
        entries
    }

    /// Every distinct `(type, title)` declared, in catalog order.
    pub fn enumerate(&self) -> Vec<EventKey> {
        let mut seen = HashSet::new();
        self.entries()
            .into_iter()
            .filter_map(|entry| seen.insert(entry.key.clone()).then_some(entry.key))
            .collect()
    }
}

fn unsupported(event_type: EventType, title: &str) -> EventLookup {
    tracing::warn!(event_type = %event_type, title, "unsupported event type");
    EventLookup::SoftMiss(Event::placeholder(event_type, title))
}

fn search_documents(
    documents: &[(PathBuf, Value)],
    event_type: EventType,
    title: &str,
) -> EventLookup {
    for tier in MatchTier::ALL {
        for (path, doc) in documents {
            for (container_id, message) in declared_messages(doc) {
                let Some(declared) = string_field(message, "title") else {
                    continue;
                };
                if tier.matches(&declared, title) {
                    tracing::debug!(
                        title,
                        ?tier,
                        path = %path.display(),
                        "event found by title"
                    );
                    return EventLookup::Found {
                        event: event_from_message(container_id, message, event_type),
                        path: path.clone(),
                        tier,
                    };
                }
            }
        }
    }

    tracing::warn!(event_type = %event_type, title, "no document declares this event");
    EventLookup::SoftMiss(Event::placeholder(event_type, title))
}

/// Infer the event type of a document from its location.
///
/// `messages/<type>/...` under the root decides first, then a
/// `message.`/`request.`/`command.` file name prefix.
pub fn infer_type(layout: &Layout, path: &Path) -> EventType {
    let path = reference::normalize(path);
    let messages_dir = reference::normalize(&layout.messages_dir());
    if let Ok(relative) = path.strip_prefix(&messages_dir) {
        if let Some(first) = relative.components().next() {
            let event_type = EventType::from_name(&first.as_os_str().to_string_lossy());
            if event_type.is_known() {
                return event_type;
            }
        }
    }

    path.file_name()
        .and_then(|n| n.to_str())
        .map(type_from_file_name)
        .unwrap_or(EventType::Unknown)
}

/// Infer the type of an event from the text of a `$ref`, without touching the filesystem.
pub fn infer_type_from_ref(raw_ref: &str) -> EventType {
    let path = raw_ref.split('#').next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').collect();

    if let Some(pos) = segments.iter().position(|s| *s == "messages") {
        if let Some(next) = segments.get(pos + 1) {
            let event_type = EventType::from_name(next);
            if event_type.is_known() {
                return event_type;
            }
        }
    }

    segments
        .last()
        .map(|name| type_from_file_name(name))
        .unwrap_or(EventType::Unknown)
}

fn type_from_file_name(name: &str) -> EventType {
    EventType::KNOWN
        .into_iter()
        .find(|t| {
            name.strip_prefix(t.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
        })
        .unwrap_or(EventType::Unknown)
}

fn event_from_message(container_id: &str, message: &Map<String, Value>, event_type: EventType) -> Event {
    let title = string_field(message, "title");
    let id = match &title {
        Some(title) => EventId::Canonical(title.clone()),
        None => EventId::Raw(container_id.to_string()),
    };
    Event {
        name: title.unwrap_or_else(|| container_id.to_string()),
        id,
        event_type,
        description: string_field(message, "description").unwrap_or_default(),
        version: string_field(message, "version").unwrap_or_else(|| DEFAULT_VERSION.to_string()),
    }
}

/// Parse every document of a type subtree, skipping those that fail.
fn load_type_documents(layout: &Layout, event_type: EventType) -> Vec<(PathBuf, Value)> {
    let dir = layout.type_dir(event_type);
    if !dir.is_dir() {
        tracing::warn!(
            event_type = %event_type,
            dir = %dir.display(),
            "event type directory not found"
        );
        return Vec::new();
    }

    yaml_files(&dir)
        .into_iter()
        .filter_map(|path| match load_document(&path, WHAT) {
            Ok(doc) => Some((path, doc)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document");
                None
            }
        })
        .collect()
}
