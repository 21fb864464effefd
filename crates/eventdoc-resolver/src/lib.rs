//! Reference resolution for AsyncAPI documentation trees.
//!
//! Reads `services/`, `channels/` and `messages/<type>/` YAML documents,
//! follows their `$ref` links and rebuilds the Service ↔ Channel ↔ Event
//! graph, including the reverse "who publishes / who consumes" index.

pub mod channel;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod model;
pub mod reference;
pub mod relations;
pub mod resolver;
pub mod service;

#[cfg(test)]
mod test_support;

pub use channel::resolve_channel;
pub use config::{Layout, LayoutConfig, CONFIG_FILE_NAME};
pub use error::{ReferenceError, ResolveError};
pub use event::{CatalogEntry, EventLookup, MatchTier, MessageCatalog};
pub use model::{Action, Channel, Event, EventId, EventKey, EventType, Service, DEFAULT_VERSION};
pub use reference::{RefContext, ResolvedRef};
pub use relations::{EventRelations, RelationCache, RelationIndex, ServiceRef};
pub use resolver::Resolver;
