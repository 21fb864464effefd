//! Service documents.
//!
//! ```yaml
//! info:
//!   title: Order Service
//!   version: 1.4.0
//! operations:
//!   publishOrderCreated:
//!     action: send
//!     channel:
//!       $ref: '../channels/order/message.created.yaml#/channels/orderCreated'
//! ```

use std::path::Path;

use serde_json::{Map, Value};

use crate::channel::resolve_channel;
use crate::config::Layout;
use crate::document::{load_document, pointer_tail, string_field};
use crate::error::ResolveError;
use crate::event::{infer_type_from_ref, resolve_direct};
use crate::model::{Action, Channel, Event, EventId, Service, DEFAULT_VERSION};
use crate::reference::RawRef;

const WHAT: &str = "service document";

/// Names of all services (`services/*.yaml` file stems), sorted.
pub fn list_services(layout: &Layout) -> Vec<String> {
    let dir = layout.services_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "services directory not readable");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("yaml"))
        .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Resolve `services/<name>.yaml` into a service with identity-only event stubs.
///
/// Operations that cannot be resolved are skipped with a warning; only a
/// missing or unparsable service document is an error.
pub fn resolve_service(layout: &Layout, name: &str) -> Result<Service, ResolveError> {
    let path = layout.service_path(name);
    let doc = load_document(&path, "service file")?;
    let root = match &doc {
        Value::Object(root) => root,
        Value::Null => {
            return Err(ResolveError::malformed(WHAT, &path, "document is empty"));
        }
        _ => {
            return Err(ResolveError::malformed(
                WHAT,
                &path,
                "document root must be a mapping",
            ));
        }
    };

    let info = root.get("info").and_then(|v| v.as_object());
    let mut service = Service::new(
        name,
        info.and_then(|i| string_field(i, "title"))
            .unwrap_or_else(|| name.to_string()),
    );
    if let Some(info) = info {
        service.description = string_field(info, "description").unwrap_or_default();
        service.version =
            string_field(info, "version").unwrap_or_else(|| DEFAULT_VERSION.to_string());
    }

    let operations = match root.get("operations") {
        None | Some(Value::Null) => None,
        Some(Value::Object(ops)) => Some(ops),
        Some(_) => {
            tracing::warn!(service = name, "'operations' is not a mapping, ignoring it");
            None
        }
    };

    for (op_name, op) in operations.into_iter().flatten() {
        match resolve_operation(layout, &path, op_name, op) {
            Ok((action, event)) => {
                let event_id = event.id.clone();
                if !service.add_event(action, event) {
                    tracing::debug!(
                        service = name,
                        operation = %op_name,
                        event = %event_id,
                        "event already listed"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    service = name,
                    operation = %op_name,
                    error = %e,
                    "skipping operation"
                );
            }
        }
    }

    tracing::debug!(
        service = name,
        sent = service.sent_events.len(),
        received = service.received_events.len(),
        "resolved service"
    );
    Ok(service)
}

fn resolve_operation(
    layout: &Layout,
    path: &Path,
    op_name: &str,
    op: &Value,
) -> Result<(Action, Event), ResolveError> {
    let op = op.as_object().ok_or_else(|| {
        ResolveError::malformed(WHAT, path, format!("operation '{}' must be a mapping", op_name))
    })?;

    let action = op
        .get("action")
        .and_then(|v| v.as_str())
        .and_then(Action::parse)
        .ok_or_else(|| {
            ResolveError::malformed(
                WHAT,
                path,
                format!("operation '{}' needs action 'send' or 'receive'", op_name),
            )
        })?;

    let channel_ref = channel_ref(op).ok_or_else(|| {
        ResolveError::malformed(WHAT, path, format!("operation '{}' has no channel $ref", op_name))
    })?;

    let channel = resolve_channel(layout, channel_ref, Some(path))?;
    Ok((action, event_stub(layout, &channel)))
}

fn channel_ref(op: &Map<String, Value>) -> Option<&str> {
    op.get("channel")?.get("$ref")?.as_str()
}

/// Identity of the channel's event.
///
/// The message document is read for its title; when it cannot be read the
/// stub falls back to the raw container identifier, typed from the reference text.
fn event_stub(layout: &Layout, channel: &Channel) -> Event {
    match resolve_direct(layout, &channel.event_ref, Some(&channel.document)) {
        Ok(event) => Event::stub(event.id, event.event_type),
        Err(e) => {
            tracing::debug!(
                channel = %channel.id,
                event_ref = %channel.event_ref,
                error = %e,
                "message not readable, using container id"
            );
            let container_id = RawRef::parse(&channel.event_ref)
                .ok()
                .and_then(|r| pointer_tail(r.pointer))
                .unwrap_or_else(|| channel.id.clone());
            Event::stub(
                EventId::Raw(container_id),
                infer_type_from_ref(&channel.event_ref),
            )
        }
    }
}
