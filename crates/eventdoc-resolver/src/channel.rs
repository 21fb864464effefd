//! Channel documents.
//!
//! ```yaml
//! channels:
//!   orderCreated:
//!     address: order.created
//!     messages:
//!       OrderCreated:
//!         $ref: '../../messages/message/order/message.created.yaml#/components/messages/messageorderdirectorycreated'
//! ```

use std::path::Path;

use serde_json::{Map, Value};

use crate::config::Layout;
use crate::document::{escape_segment, load_document, resolve_pointer, string_field};
use crate::error::{ReferenceError, ResolveError};
use crate::model::Channel;
use crate::reference::{self, RawRef, RefContext};

const WHAT: &str = "channel document";

/// Resolve a channel `$ref` found in `referrer` (usually a service document).
pub fn resolve_channel(
    layout: &Layout,
    raw_ref: &str,
    referrer: Option<&Path>,
) -> Result<Channel, ResolveError> {
    let channels_dir = layout.channels_dir();
    let ctx = RefContext::new(layout.root())
        .with_document(referrer)
        .with_base(&channels_dir);
    let resolved = match reference::resolve(raw_ref, &ctx) {
        Ok(resolved) => resolved,
        Err(ReferenceError::Unresolved(_)) => {
            let path = RawRef::parse(raw_ref)
                .map(|r| r.path.to_string())
                .unwrap_or_default();
            return Err(ResolveError::NotFound {
                what: "channel file",
                path: path.into(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let doc = load_document(&resolved.path, "channel file")?;
    let channels = doc
        .get("channels")
        .and_then(|v| v.as_object())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            ResolveError::malformed(WHAT, &resolved.path, "missing 'channels' map")
        })?;

    let (key, channel) = select_channel(&doc, channels, &resolved.pointer).ok_or_else(|| {
        ResolveError::malformed(WHAT, &resolved.path, "channel entry must be a mapping")
    })?;

    let address = string_field(channel, "address").unwrap_or_else(|| key.clone());

    let (message_key, message) = channel
        .get("messages")
        .and_then(|v| v.as_object())
        .and_then(|m| m.iter().next())
        .ok_or_else(|| {
            ResolveError::malformed(
                WHAT,
                &resolved.path,
                format!("channel '{}' has no 'messages' entry", key),
            )
        })?;

    let event_ref = match message.get("$ref").and_then(|v| v.as_str()) {
        Some(r) => r.to_string(),
        // Inline message: point back into this document.
        None if message.is_object() => format!(
            "#/channels/{}/messages/{}",
            escape_segment(&key),
            escape_segment(message_key)
        ),
        None => {
            return Err(ResolveError::malformed(
                WHAT,
                &resolved.path,
                format!("message '{}' must be a $ref or a mapping", message_key),
            ))
        }
    };

    tracing::debug!(
        channel = %key,
        address = %address,
        event_ref = %event_ref,
        "resolved channel"
    );

    Ok(Channel {
        id: key,
        address,
        event_ref,
        document: resolved.path,
    })
}

/// The channel the pointer names, or the document's first channel.
fn select_channel<'a>(
    doc: &'a Value,
    channels: &'a Map<String, Value>,
    pointer: &str,
) -> Option<(String, &'a Map<String, Value>)> {
    if let Some(name) = pointer
        .strip_prefix("/channels/")
        .filter(|rest| !rest.contains('/'))
    {
        if let Some(channel) = resolve_pointer(doc, pointer).and_then(|v| v.as_object()) {
            return Some((crate::document::unescape_segment(name), channel));
        }
        tracing::debug!(pointer, "channel pointer does not match, using first entry");
    }

    let (key, value) = channels.iter().next()?;
    Some((key.clone(), value.as_object()?))
}
