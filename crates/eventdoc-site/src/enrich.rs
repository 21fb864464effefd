//! Filling event stubs with the details of their source documents.

use std::collections::{BTreeSet, HashMap};

use eventdoc_resolver::{Event, EventKey, EventLookup, MessageCatalog, RelationIndex, Service};
use eventdoc_telemetry::log_event_soft_miss;

/// Looks events up by canonical key, once per key per run.
///
/// Searches run against an already loaded [`MessageCatalog`].
pub struct Enricher<'a> {
    messages: &'a MessageCatalog,
    index: &'a RelationIndex,
    resolved: HashMap<EventKey, Event>,
    soft_misses: BTreeSet<EventKey>,
}

impl<'a> Enricher<'a> {
    pub fn new(messages: &'a MessageCatalog, index: &'a RelationIndex) -> Self {
        Self {
            messages,
            index,
            resolved: HashMap::new(),
            soft_misses: BTreeSet::new(),
        }
    }

    /// The full event for a canonical key. Soft misses yield the placeholder event.
    pub fn details(&mut self, key: &EventKey) -> &Event {
        if !self.resolved.contains_key(key) {
            let event = match self.messages.search(key.event_type, &key.title) {
                EventLookup::Found { event, .. } => event,
                EventLookup::SoftMiss(placeholder) => {
                    log_event_soft_miss!(event_type = %key.event_type, title = %key.title);
                    self.soft_misses.insert(key.clone());
                    placeholder
                }
            };
            self.resolved.insert(key.clone(), event);
        }
        &self.resolved[key]
    }

    /// Overwrite the stub's name, description and version. Identifier and type are kept.
    ///
    /// Returns `false` when the lookup was a soft miss.
    pub fn enrich_event(&mut self, event: &mut Event) -> bool {
        let key = self.index.canonical_key(event);
        let details = self.details(&key).clone();
        event.enrich(&details);
        !self.soft_misses.contains(&key)
    }

    /// Enrich every event of a service; returns the keys that were soft misses.
    pub fn enrich_service(&mut self, service: &mut Service) -> Vec<EventKey> {
        let mut missed = Vec::new();
        for event in service.events_mut() {
            if !self.enrich_event(event) {
                let key = self.index.canonical_key(event);
                if !missed.contains(&key) {
                    missed.push(key);
                }
            }
        }
        missed
    }

    pub fn soft_misses(&self) -> &BTreeSet<EventKey> {
        &self.soft_misses
    }
}
