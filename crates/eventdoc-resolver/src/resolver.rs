//! Facade over an input tree.

use std::path::{Path, PathBuf};

use crate::channel::resolve_channel;
use crate::config::{Layout, LayoutConfig};
use crate::error::ResolveError;
use crate::event::{self, CatalogEntry, EventLookup, MessageCatalog};
use crate::model::{Channel, Event, EventKey, EventType, Service};
use crate::reference::{self, RefContext, ResolvedRef};
use crate::relations::RelationIndex;
use crate::service::{list_services, resolve_service};

/// Entry point for resolving documents under one input root.
///
/// # Example
///
/// ```no_run
/// use eventdoc_resolver::{EventType, Resolver};
///
/// let resolver = Resolver::open("./catalog", None)?;
/// for name in resolver.list_services() {
///     let service = resolver.service(&name)?;
///     println!("{}: {} sent", service.title, service.sent_events.len());
/// }
/// let lookup = resolver.search_event(EventType::Message, "OrderDirectory:Created");
/// println!("{}", lookup.event().description);
/// # Ok::<(), eventdoc_resolver::ResolveError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Resolver {
    layout: Layout,
}

impl Resolver {
    /// A resolver with the default layout.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, LayoutConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: LayoutConfig) -> Self {
        Self {
            layout: Layout::new(root, config),
        }
    }

    /// Open `root`, loading its layout config (explicit path, `eventdoc.yaml`, or defaults).
    pub fn open(root: impl Into<PathBuf>, config: Option<&Path>) -> Result<Self, ResolveError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ResolveError::NotFound {
                what: "input root",
                path: root,
            });
        }
        let config = LayoutConfig::load(&root, config)?;
        Ok(Self::with_config(root, config))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Resolve a raw `$ref` to an existing file and pointer.
    pub fn resolve_reference(
        &self,
        raw_ref: &str,
        document: Option<&Path>,
    ) -> Result<ResolvedRef, ResolveError> {
        let ctx = RefContext::new(self.layout.root()).with_document(document);
        Ok(reference::resolve(raw_ref, &ctx)?)
    }

    pub fn channel(&self, raw_ref: &str, referrer: Option<&Path>) -> Result<Channel, ResolveError> {
        resolve_channel(&self.layout, raw_ref, referrer)
    }

    /// Direct mode: the event a fully qualified `$ref` points at.
    pub fn event(&self, raw_ref: &str, referrer: Option<&Path>) -> Result<Event, ResolveError> {
        event::resolve_direct(&self.layout, raw_ref, referrer)
    }

    /// Search mode: look a title up in the `messages/<type>/` subtree.
    pub fn search_event(&self, event_type: EventType, title: &str) -> EventLookup {
        event::search(&self.layout, event_type, title)
    }

    /// Every distinct `(type, title)` declared under the message subtrees.
    pub fn list_events(&self) -> Vec<EventKey> {
        event::enumerate(&self.layout)
    }

    pub fn event_catalog(&self) -> Vec<CatalogEntry> {
        event::catalog(&self.layout)
    }

    /// Parse every message subtree once, for repeated searches.
    pub fn load_messages(&self) -> MessageCatalog {
        MessageCatalog::load(&self.layout)
    }

    pub fn service(&self, name: &str) -> Result<Service, ResolveError> {
        resolve_service(&self.layout, name)
    }

    pub fn list_services(&self) -> Vec<String> {
        list_services(&self.layout)
    }

    /// Build a fresh relation index over every service.
    pub fn build_relations(&self) -> RelationIndex {
        RelationIndex::build(&self.layout, &self.list_services())
    }

    /// [`Resolver::build_relations`] over an already loaded message catalog.
    pub fn build_relations_with(&self, messages: &MessageCatalog) -> RelationIndex {
        RelationIndex::build_with(&self.layout, messages, &self.list_services())
    }
}
