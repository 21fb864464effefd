//! Catalog check: resolve everything, write nothing.

use std::collections::{BTreeSet, HashMap};

use eventdoc_resolver::{EventKey, Resolver};
use serde::Serialize;

/// A coded problem found while checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIssue {
    pub code: String,
    pub message: String,
}

/// Result of resolving one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCheck {
    pub service: String,
    pub valid: bool,
    pub sent: usize,
    pub received: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CheckIssue>,
    /// Referenced events no document declares.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub soft_misses: Vec<EventKey>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub services: Vec<ServiceCheck>,
    /// Number of declared events.
    pub events: usize,
    pub soft_misses: BTreeSet<EventKey>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.services.iter().any(|s| !s.valid)
    }

    pub fn valid_count(&self) -> usize {
        self.services.iter().filter(|s| s.valid).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.services.len() - self.valid_count()
    }
}

/// Resolve every service and search every event they or the message subtrees name.
pub fn check_catalog(resolver: &Resolver) -> CheckReport {
    let messages = resolver.load_messages();
    let index = resolver.build_relations_with(&messages);
    let mut found: HashMap<EventKey, bool> = HashMap::new();
    let mut is_found = |key: &EventKey| {
        *found
            .entry(key.clone())
            .or_insert_with(|| !messages.search(key.event_type, &key.title).is_soft_miss())
    };

    let mut report = CheckReport::default();

    for name in resolver.list_services() {
        let check = match resolver.service(&name) {
            Ok(service) => {
                let mut soft_misses = Vec::new();
                for event in service.received_events.iter().chain(&service.sent_events) {
                    let key = index.canonical_key(event);
                    if !is_found(&key) && !soft_misses.contains(&key) {
                        soft_misses.push(key);
                    }
                }
                ServiceCheck {
                    service: name,
                    valid: true,
                    sent: service.sent_events.len(),
                    received: service.received_events.len(),
                    error: None,
                    soft_misses,
                }
            }
            Err(e) => ServiceCheck {
                service: name,
                valid: false,
                sent: 0,
                received: 0,
                error: Some(CheckIssue {
                    code: e.code().to_string(),
                    message: e.to_string(),
                }),
                soft_misses: Vec::new(),
            },
        };
        report.soft_misses.extend(check.soft_misses.iter().cloned());
        report.services.push(check);
    }

    let declared = messages.enumerate();
    report.events = declared.len();
    for key in declared {
        if !is_found(&key) {
            report.soft_misses.insert(key);
        }
    }

    tracing::debug!(
        services = report.services.len(),
        events = report.events,
        soft_misses = report.soft_misses.len(),
        "catalog checked"
    );
    report
}
