//! Node/edge documents read by the front-end graph visualizer.
//!
//! The layout is three columns: inputs on the left, the subject of the page
//! in the center, outputs on the right, one row per neighbour.

use eventdoc_resolver::{Event, EventRelations, EventType, Service, ServiceRef};
use serde::Serialize;

const LEFT_X: i64 = 75;
const CENTER_X: i64 = 525;
const RIGHT_X: i64 = 975;
const CENTER_Y: i64 = 125;
const FIRST_ROW_Y: i64 = 50;
const ROW_STEP: i64 = 100;

const SERVICE_NODE_TYPE: &str = "services";
const LABEL_ACCEPTS: &str = "accepts";
const LABEL_PUBLISHES: &str = "publishes";
const LABEL_CONSUMED_BY: &str = "consumed by";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    fn center() -> Self {
        Position {
            x: CENTER_X,
            y: CENTER_Y,
        }
    }

    fn row(x: i64, index: usize) -> Self {
        Position {
            x,
            y: FIRST_ROW_Y + ROW_STEP * index as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub data: NodeData,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeData {
    Service { service: EntityRef },
    Event { mode: String, message: EntityRef },
}

/// `{id, data: {id, name}}` as nested under nodes and edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRef {
    pub id: String,
    pub data: EntityData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityData {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub animated: bool,
    pub data: EdgeData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeData {
    pub message: EntityRef,
}

/// Label shown for an event node: its name, or, when the name is just the
/// identifier, the identifier without its `message`/`request`/`command` prefix.
pub fn display_name(event: &Event) -> String {
    let id = event.id.as_str();
    if event.name != id {
        return event.name.clone();
    }
    EventType::KNOWN
        .iter()
        .map(EventType::as_str)
        .find_map(|prefix| strip_prefix_ignore_case(id, prefix))
        .unwrap_or(id)
        .to_string()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Graph of one service: received events on the left, sent events on the right.
pub fn service_graph(service: &Service) -> GraphData {
    let mut nodes = vec![service_node(&service.id, &service.title, Position::center())];
    let mut edges = Vec::new();

    for (i, event) in service.received_events.iter().enumerate() {
        let node = event_node(event, Position::row(LEFT_X, i), true);
        edges.push(Edge {
            id: format!("{}-{}", node.id, service.id),
            source: node.id.clone(),
            target: service.id.clone(),
            label: LABEL_ACCEPTS.to_string(),
            animated: false,
            data: edge_data(event),
        });
        nodes.push(node);
    }

    for (i, event) in service.sent_events.iter().enumerate() {
        let node = event_node(event, Position::row(RIGHT_X, i), true);
        edges.push(Edge {
            id: format!("{}-{}", service.id, node.id),
            source: service.id.clone(),
            target: node.id.clone(),
            label: LABEL_PUBLISHES.to_string(),
            animated: false,
            data: edge_data(event),
        });
        nodes.push(node);
    }

    GraphData { nodes, edges }
}

/// Graph of one event: publishers on the left, consumers on the right.
///
/// A service that both publishes and consumes the event keeps its left-hand node.
pub fn event_graph(event: &Event, relations: Option<&EventRelations>) -> GraphData {
    let center = event_node(event, Position::center(), false);
    let center_id = center.id.clone();
    let mut nodes = vec![center];
    let mut edges = Vec::new();

    let Some(relations) = relations else {
        return GraphData { nodes, edges };
    };

    for (i, service) in relations.publishers().enumerate() {
        nodes.push(service_ref_node(service, Position::row(LEFT_X, i)));
        edges.push(Edge {
            id: format!("{}-{}", service.id, center_id),
            source: service.id.clone(),
            target: center_id.clone(),
            label: LABEL_PUBLISHES.to_string(),
            animated: false,
            data: edge_data(event),
        });
    }

    for (i, service) in relations.consumers().enumerate() {
        if !nodes.iter().any(|node| node.id == service.id) {
            nodes.push(service_ref_node(service, Position::row(RIGHT_X, i)));
        }
        edges.push(Edge {
            id: format!("{}-{}", center_id, service.id),
            source: center_id.clone(),
            target: service.id.clone(),
            label: LABEL_CONSUMED_BY.to_string(),
            animated: false,
            data: edge_data(event),
        });
    }

    GraphData { nodes, edges }
}

fn node_id(event: &Event) -> String {
    format!("{}-{}", event.id, event.event_type)
}

fn service_ref_node(service: &ServiceRef, position: Position) -> Node {
    service_node(&service.id, &service.title, position)
}

fn service_node(id: &str, title: &str, position: Position) -> Node {
    Node {
        id: id.to_string(),
        node_type: SERVICE_NODE_TYPE.to_string(),
        data: NodeData::Service {
            service: EntityRef {
                id: id.to_string(),
                data: EntityData {
                    id: id.to_string(),
                    name: title.to_string(),
                    display_name: None,
                },
            },
        },
        position,
    }
}

fn event_node(event: &Event, position: Position, with_display_name: bool) -> Node {
    let mut message = entity(event);
    if with_display_name {
        message.data.display_name = Some(display_name(event));
    }
    Node {
        id: node_id(event),
        node_type: event.event_type.plural().to_string(),
        data: NodeData::Event {
            mode: "full".to_string(),
            message,
        },
        position,
    }
}

fn entity(event: &Event) -> EntityRef {
    EntityRef {
        id: event.id.to_string(),
        data: EntityData {
            id: event.id.to_string(),
            name: event.name.clone(),
            display_name: None,
        },
    }
}

fn edge_data(event: &Event) -> EdgeData {
    EdgeData {
        message: entity(event),
    }
}
