//! Reverse index: which services publish and consume each event.
//!
//! Built in two passes. Pass 1 walks the message subtrees and records the
//! canonical `(type, title)` key of every message container, so that
//! services referring to the same event through a container id or through
//! a differently spelled title collapse onto one key. Pass 2 resolves every
//! service and files it under the canonical key of each of its events.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::config::Layout;
use crate::event::{squash, CatalogEntry, MessageCatalog};
use crate::model::{Event, EventId, EventKey, EventType, Service};
use crate::service::resolve_service;

/// A service as listed in a relation set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ServiceRef {
    pub id: String,
    pub title: String,
}

impl From<&Service> for ServiceRef {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.clone(),
            title: service.title.clone(),
        }
    }
}

/// Publishers and consumers of one event, keyed by service identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRelations {
    publishers: BTreeMap<String, ServiceRef>,
    consumers: BTreeMap<String, ServiceRef>,
}

impl EventRelations {
    /// Returns `false` if the service was already listed.
    pub fn add_publisher(&mut self, service: &Service) -> bool {
        insert_once(&mut self.publishers, service)
    }

    /// Returns `false` if the service was already listed.
    pub fn add_consumer(&mut self, service: &Service) -> bool {
        insert_once(&mut self.consumers, service)
    }

    /// Publishing services, ordered by identifier.
    pub fn publishers(&self) -> impl Iterator<Item = &ServiceRef> {
        self.publishers.values()
    }

    /// Consuming services, ordered by identifier.
    pub fn consumers(&self) -> impl Iterator<Item = &ServiceRef> {
        self.consumers.values()
    }

    pub fn is_published_by(&self, service_id: &str) -> bool {
        self.publishers.contains_key(service_id)
    }

    pub fn is_consumed_by(&self, service_id: &str) -> bool {
        self.consumers.contains_key(service_id)
    }
}

fn insert_once(set: &mut BTreeMap<String, ServiceRef>, service: &Service) -> bool {
    if set.contains_key(&service.id) {
        return false;
    }
    set.insert(service.id.clone(), ServiceRef::from(service));
    true
}

/// Pass-1 lookup from identifier spellings to canonical keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CanonicalMap {
    by_container: HashMap<(EventType, String), EventKey>,
    by_title: HashMap<(EventType, String), EventKey>,
    by_loose_title: HashMap<(EventType, String), EventKey>,
}

impl CanonicalMap {
    fn from_catalog(entries: &[CatalogEntry]) -> Self {
        let mut map = CanonicalMap::default();
        for entry in entries {
            let ty = entry.key.event_type;
            // First declaration wins; the walk order is deterministic.
            map.by_container
                .entry((ty, entry.container_id.clone()))
                .or_insert_with(|| entry.key.clone());
            map.by_title
                .entry((ty, entry.key.title.clone()))
                .or_insert_with(|| entry.key.clone());
            map.by_loose_title
                .entry((ty, squash(&entry.key.title)))
                .or_insert_with(|| entry.key.clone());
        }
        map
    }

    fn canonicalize(&self, event_type: EventType, id: &EventId) -> Option<EventKey> {
        match id {
            EventId::Raw(container_id) => lookup(&self.by_container, event_type, container_id),
            EventId::Canonical(title) => lookup(&self.by_title, event_type, title)
                .or_else(|| lookup(&self.by_loose_title, event_type, &squash(title))),
        }
    }
}

/// Look `name` up under `event_type`; for `Unknown`, accept a unique match in any type.
fn lookup(
    map: &HashMap<(EventType, String), EventKey>,
    event_type: EventType,
    name: &str,
) -> Option<EventKey> {
    if event_type.is_known() {
        return map.get(&(event_type, name.to_string())).cloned();
    }

    let mut matches = EventType::KNOWN
        .iter()
        .filter_map(|ty| map.get(&(*ty, name.to_string())));
    match (matches.next(), matches.next()) {
        (Some(key), None) => Some(key.clone()),
        _ => None,
    }
}

/// The publisher/consumer sets of every referenced event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationIndex {
    relations: BTreeMap<EventKey, EventRelations>,
    canonical: CanonicalMap,
}

impl RelationIndex {
    /// Build the index over `service_names`.
    ///
    /// Unreadable message documents and unresolvable services are logged and skipped.
    pub fn build(layout: &Layout, service_names: &[String]) -> Self {
        Self::build_with(layout, &MessageCatalog::load(layout), service_names)
    }

    /// Build the index with Pass 1 running over an already loaded catalog.
    pub fn build_with(layout: &Layout, messages: &MessageCatalog, service_names: &[String]) -> Self {
        let services: Vec<Service> = service_names
            .iter()
            .filter_map(|name| match resolve_service(layout, name) {
                Ok(service) => Some(service),
                Err(e) => {
                    tracing::warn!(service = %name, error = %e, "service skipped while indexing");
                    None
                }
            })
            .collect();
        Self::from_services(messages, &services)
    }

    /// Build the index from services that are already resolved.
    pub fn from_services<'s>(
        messages: &MessageCatalog,
        services: impl IntoIterator<Item = &'s Service>,
    ) -> Self {
        let entries = messages.entries();
        let mut index = RelationIndex {
            relations: BTreeMap::new(),
            canonical: CanonicalMap::from_catalog(&entries),
        };
        for service in services {
            index.add_service(service);
        }

        tracing::debug!(
            catalog_entries = entries.len(),
            keys = index.relations.len(),
            "relation index built"
        );
        index
    }

    /// File `service` under the canonical key of each of its events.
    pub fn add_service(&mut self, service: &Service) {
        for event in &service.sent_events {
            let key = self.canonical_key(event);
            self.relations.entry(key).or_default().add_publisher(service);
        }
        for event in &service.received_events {
            let key = self.canonical_key(event);
            self.relations.entry(key).or_default().add_consumer(service);
        }
    }

    /// Canonical `(type, title)` of an event, falling back to its own `(type, id)`.
    pub fn canonical_key(&self, event: &Event) -> EventKey {
        self.canonical
            .canonicalize(event.event_type, &event.id)
            .unwrap_or_else(|| event.raw_key())
    }

    pub fn get(&self, key: &EventKey) -> Option<&EventRelations> {
        self.relations.get(key)
    }

    /// Relations of an event, after canonicalizing its identifier.
    pub fn relations_for(&self, event: &Event) -> Option<&EventRelations> {
        self.get(&self.canonical_key(event))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &EventRelations)> {
        self.relations.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &EventKey> {
        self.relations.keys()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

/// Build-once holder for the relation index of a generation run.
///
/// Owned by the orchestrator and passed by reference to whatever needs the
/// index. Once frozen the index is read-only until [`RelationCache::invalidate`].
#[derive(Debug, Default)]
pub struct RelationCache {
    frozen: Option<RelationIndex>,
}

impl RelationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frozen index, building and freezing it first if needed.
    pub fn get_or_build(&mut self, layout: &Layout, service_names: &[String]) -> &RelationIndex {
        self.get_or_freeze_with(|| {
            tracing::debug!(services = service_names.len(), "building relation index");
            RelationIndex::build(layout, service_names)
        })
    }

    /// The frozen index, freezing the result of `build` first if needed.
    ///
    /// `build` only runs when nothing is frozen.
    pub fn get_or_freeze_with(&mut self, build: impl FnOnce() -> RelationIndex) -> &RelationIndex {
        self.frozen.get_or_insert_with(build)
    }

    /// Install `index` as the frozen index, replacing any previous one.
    pub fn freeze(&mut self, index: RelationIndex) {
        self.frozen = Some(index);
    }

    /// Drop the frozen index; the next [`RelationCache::get_or_build`] rebuilds it.
    pub fn invalidate(&mut self) {
        self.frozen = None;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn get(&self) -> Option<&RelationIndex> {
        self.frozen.as_ref()
    }
}
