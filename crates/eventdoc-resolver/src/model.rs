use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};

/// Version assumed for services and events that do not declare one.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Kind of event, taken from the `messages/<type>/` subtree a document lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Message,
    Request,
    Command,
    /// Fallback when neither the document location nor the file name reveal a type.
    Unknown,
}

impl EventType {
    /// The types that have a subtree of their own.
    pub const KNOWN: [EventType; 3] = [EventType::Message, EventType::Request, EventType::Command];

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "message" => Some(Self::Message),
            "request" => Some(Self::Request),
            "command" => Some(Self::Command),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Like [`EventType::parse`], but maps anything unrecognized to `Unknown`.
    pub fn from_name(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::Request => "request",
            EventType::Command => "command",
            EventType::Unknown => "unknown",
        }
    }

    /// `"Command"` for `command`; used in placeholder descriptions.
    pub fn capitalized(&self) -> &'static str {
        match self {
            EventType::Message => "Message",
            EventType::Request => "Request",
            EventType::Command => "Command",
            EventType::Unknown => "Unknown",
        }
    }

    /// Node type used by the graph visualizer (`messages`, `requests`, ...).
    pub fn plural(&self) -> &'static str {
        match self {
            EventType::Message => "messages",
            EventType::Request => "requests",
            EventType::Command => "commands",
            EventType::Unknown => "unknowns",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Unknown)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an event as produced by a particular resolution path.
///
/// Depending on how an event was reached, its identifier is either the
/// human title declared in the message document or the raw key of the
/// message container. The two must be canonicalized (see
/// [`crate::RelationIndex::canonical_key`]) before being used as set or map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventId {
    /// The `title` declared on the message.
    Canonical(String),
    /// The key under `components.messages` (or a channel's `messages` map).
    Raw(String),
}

impl EventId {
    pub fn as_str(&self) -> &str {
        match self {
            EventId::Canonical(s) | EventId::Raw(s) => s,
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, EventId::Canonical(_))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Canonical `(type, title)` pair identifying one logical event across documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EventKey {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
}

impl EventKey {
    pub fn new(event_type: EventType, title: impl Into<String>) -> Self {
        Self {
            event_type,
            title: title.into(),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.event_type, self.title)
    }
}

/// A message, request or command.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: EventId,
    /// Display name; the declared title once resolved or enriched.
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub description: String,
    pub version: String,
}

impl Event {
    /// An identity-only event, as attached to a service before enrichment.
    pub fn stub(id: EventId, event_type: EventType) -> Self {
        Self {
            name: id.as_str().to_string(),
            id,
            event_type,
            description: String::new(),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// The degraded event returned when a title search finds nothing.
    pub fn placeholder(event_type: EventType, title: &str) -> Self {
        Self {
            id: EventId::Canonical(title.to_string()),
            name: title.to_string(),
            event_type,
            description: format!("{} {}", event_type.capitalized(), title),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Copy display details from a resolved event. Identifier and type are kept.
    pub fn enrich(&mut self, details: &Event) {
        self.name.clone_from(&details.name);
        self.description.clone_from(&details.description);
        self.version.clone_from(&details.version);
    }

    /// The `(type, id)` pair as-is, without canonicalization.
    pub fn raw_key(&self) -> EventKey {
        EventKey::new(self.event_type, self.id.as_str())
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

/// Operation action on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Send,
    Receive,
}

impl Action {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "send" => Some(Self::Send),
            "receive" => Some(Self::Receive),
            _ => None,
        }
    }
}

/// A service and the events it sends and receives.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    /// File stem of `services/<id>.yaml`.
    pub id: String,
    pub title: String,
    pub description: String,
    pub version: String,
    pub received_events: Vec<Event>,
    pub sent_events: Vec<Event>,
}

impl Service {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            version: DEFAULT_VERSION.to_string(),
            received_events: Vec::new(),
            sent_events: Vec::new(),
        }
    }

    /// Returns `false` if an event with the same identifier is already listed.
    pub fn add_received_event(&mut self, event: Event) -> bool {
        push_unique(&mut self.received_events, event)
    }

    /// Returns `false` if an event with the same identifier is already listed.
    pub fn add_sent_event(&mut self, event: Event) -> bool {
        push_unique(&mut self.sent_events, event)
    }

    pub fn add_event(&mut self, action: Action, event: Event) -> bool {
        match action {
            Action::Send => self.add_sent_event(event),
            Action::Receive => self.add_received_event(event),
        }
    }

    /// All event stubs, received first.
    pub fn events_mut(&mut self) -> impl Iterator<Item = &mut Event> {
        self.received_events
            .iter_mut()
            .chain(self.sent_events.iter_mut())
    }
}

fn push_unique(events: &mut Vec<Event>, event: Event) -> bool {
    if events.contains(&event) {
        return false;
    }
    events.push(event);
    true
}

/// A channel document's single channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Key under the document's `channels` map.
    pub id: String,
    /// Topic string; defaults to the key.
    pub address: String,
    /// `$ref` of the channel's message, relative to `document`.
    pub event_ref: String,
    /// The channel document the reference was read from.
    pub document: PathBuf,
}
