//! Turns resolved services and events into the data set of a documentation site.
//!
//! Writes graph-data files for the front-end visualizer plus JSON snapshots
//! of services and the event table that the page templates consume.

pub mod enrich;
pub mod error;
pub mod generator;
pub mod graph;

pub use enrich::Enricher;
pub use error::SiteError;
pub use generator::{
    safe_id, EventRow, EventTable, GenerationReport, ServiceFailure, ServiceSummary,
    SiteGenerator, PAGE_SIZE,
};
pub use graph::{display_name, event_graph, service_graph, Edge, GraphData, Node, Position};
