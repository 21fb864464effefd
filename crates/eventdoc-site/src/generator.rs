//! Site generation runs.
//!
//! Output layout under the output directory:
//!
//! ```text
//! static/js/graph-data/<service>.json
//! static/js/graph-data/events/<type>_<safe id>.json
//! data/services.json
//! data/services/<service>.json
//! data/events.json
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use eventdoc_resolver::service::{list_services, resolve_service};
use eventdoc_resolver::{
    Event, EventKey, EventType, Layout, MessageCatalog, RelationCache, RelationIndex,
    ResolveError, Service, ServiceRef,
};
use eventdoc_telemetry::{log_index_built, log_service_resolved, log_service_skipped};
use serde::Serialize;

use crate::enrich::Enricher;
use crate::error::SiteError;
use crate::graph::{event_graph, service_graph};

/// Rows per page of the event table.
pub const PAGE_SIZE: usize = 10;

/// File-name-safe form of an event title (`:` and `.` become `_`).
pub fn safe_id(title: &str) -> String {
    title.replace([':', '.'], "_")
}

/// What was generated for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub id: String,
    pub received: usize,
    pub sent: usize,
    /// Events of this service that no document declares.
    pub soft_misses: Vec<EventKey>,
}

/// A service that could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFailure {
    pub service: String,
    pub code: &'static str,
    pub message: String,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub services: Vec<ServiceSummary>,
    pub failures: Vec<ServiceFailure>,
    pub events: usize,
    pub soft_misses: BTreeSet<EventKey>,
    pub files_written: usize,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One row of `data/events.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub description: String,
    pub publishing_services: Vec<ServiceRef>,
    pub consuming_services: Vec<ServiceRef>,
}

/// `data/events.json`: every known event with its publishers and consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTable {
    pub events: Vec<EventRow>,
    pub total_events: usize,
    pub message_count: usize,
    pub request_count: usize,
    pub command_count: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl EventTable {
    /// Sort rows by name and compute the counters.
    pub fn new(mut events: Vec<EventRow>) -> Self {
        events.sort_by(|a, b| a.name.cmp(&b.name));
        let count = |t: EventType| events.iter().filter(|row| row.event_type == t).count();
        let total_events = events.len();
        Self {
            message_count: count(EventType::Message),
            request_count: count(EventType::Request),
            command_count: count(EventType::Command),
            total_events,
            page_size: PAGE_SIZE,
            total_pages: total_events.div_ceil(PAGE_SIZE),
            events,
        }
    }
}

/// Orchestrates a run over one input tree.
///
/// Owns the parsed message documents and the relation cache: both are built
/// on first use and stay frozen for the lifetime of the generator unless
/// [`SiteGenerator::invalidate`] is called.
pub struct SiteGenerator {
    layout: Layout,
    output: PathBuf,
    messages: Option<MessageCatalog>,
    cache: RelationCache,
    files_written: usize,
}

impl SiteGenerator {
    pub fn new(layout: Layout, output: impl Into<PathBuf>) -> Self {
        Self {
            layout,
            output: output.into(),
            messages: None,
            cache: RelationCache::new(),
            files_written: 0,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The frozen relation index, built over every service on first call.
    pub fn relation_index(&mut self) -> &RelationIndex {
        let messages = loaded_messages(&mut self.messages, &self.layout);
        frozen_index(&mut self.cache, &self.layout, messages)
    }

    /// Drop the frozen index and parsed documents so the next run sees changed documents.
    pub fn invalidate(&mut self) {
        self.messages = None;
        self.cache.invalidate();
    }

    /// Generate the graph data and snapshot of a single service.
    pub fn generate_service(&mut self, name: &str) -> Result<ServiceSummary, SiteError> {
        let service = resolve_service(&self.layout, name)?;
        let messages = loaded_messages(&mut self.messages, &self.layout);
        let index = frozen_index(&mut self.cache, &self.layout, messages);

        let mut enricher = Enricher::new(messages, index);
        let summary = write_service(&self.output, &mut enricher, service)?;
        self.files_written += SERVICE_FILES;
        Ok(summary)
    }

    /// Generate every service, every event graph and the event table.
    ///
    /// Every document is read once per run. A service that fails to resolve
    /// is logged, recorded in the report and skipped; only output errors
    /// abort the run.
    pub fn generate_all(&mut self) -> Result<GenerationReport, SiteError> {
        let start = self.files_written;
        let mut report = GenerationReport::default();
        let names = list_services(&self.layout);

        write_json(&self.output.join("data").join("services.json"), &names)?;
        self.files_written += 1;

        let resolved: Vec<(&String, Result<Service, ResolveError>)> = names
            .iter()
            .map(|name| (name, resolve_service(&self.layout, name)))
            .collect();

        let messages = loaded_messages(&mut self.messages, &self.layout);
        let index = self.cache.get_or_freeze_with(|| {
            let services: Vec<&Service> = resolved
                .iter()
                .filter_map(|(_, result)| result.as_ref().ok())
                .collect();
            let index = RelationIndex::from_services(messages, services);
            log_index_built!(services = names.len(), keys = index.len());
            index
        });
        let mut enricher = Enricher::new(messages, index);

        for (name, result) in resolved {
            match result {
                Ok(service) => {
                    let summary = write_service(&self.output, &mut enricher, service)?;
                    self.files_written += SERVICE_FILES;
                    report.soft_misses.extend(summary.soft_misses.iter().cloned());
                    report.services.push(summary);
                }
                Err(e) => {
                    log_service_skipped!(service = %name, code = e.code(), error = %e);
                    report.failures.push(ServiceFailure {
                        service: name.clone(),
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let rows = write_events(&self.output, messages, index, &mut enricher)?;
        self.files_written += rows.len();
        report.events = rows.len();
        report.soft_misses.extend(enricher.soft_misses().iter().cloned());

        write_json(
            &self.output.join("data").join("events.json"),
            &EventTable::new(rows),
        )?;
        self.files_written += 1;

        report.files_written = self.files_written - start;
        Ok(report)
    }
}

/// Files written per generated service: its graph and its snapshot.
const SERVICE_FILES: usize = 2;

/// Enrich `service` and write its graph data and snapshot.
fn write_service(
    output: &Path,
    enricher: &mut Enricher<'_>,
    mut service: Service,
) -> Result<ServiceSummary, SiteError> {
    let soft_misses = enricher.enrich_service(&mut service);

    write_json(
        &graph_dir(output).join(format!("{}.json", service.id)),
        &service_graph(&service),
    )?;
    write_json(
        &output.join("data").join("services").join(format!("{}.json", service.id)),
        &service,
    )?;

    log_service_resolved!(
        service = %service.id,
        received = service.received_events.len(),
        sent = service.sent_events.len()
    );

    Ok(ServiceSummary {
        received: service.received_events.len(),
        sent: service.sent_events.len(),
        id: service.id,
        soft_misses,
    })
}

/// Write an event graph per known event; returns the table rows.
///
/// Known events are the declared ones plus those only referenced by services.
fn write_events(
    output: &Path,
    messages: &MessageCatalog,
    index: &RelationIndex,
    enricher: &mut Enricher<'_>,
) -> Result<Vec<EventRow>, SiteError> {
    let mut keys: BTreeSet<EventKey> = messages.enumerate().into_iter().collect();
    keys.extend(index.keys().cloned());

    let events_dir = graph_dir(output).join("events");
    let mut file_ids = FileIds::default();
    let mut rows = Vec::with_capacity(keys.len());

    for key in &keys {
        let details: Event = enricher.details(key).clone();
        let relations = index.get(key);
        let id = file_ids.allocate(key);
        write_json(
            &events_dir.join(format!("{}_{}.json", key.event_type, id)),
            &event_graph(&details, relations),
        )?;

        rows.push(EventRow {
            id,
            name: details.name.clone(),
            event_type: key.event_type,
            description: details.description.clone(),
            publishing_services: relations
                .map(|r| r.publishers().cloned().collect())
                .unwrap_or_default(),
            consuming_services: relations
                .map(|r| r.consumers().cloned().collect())
                .unwrap_or_default(),
        });
    }

    tracing::debug!(events = rows.len(), "event graphs written");
    Ok(rows)
}

/// Hands out file-name-safe event ids, unique per event type.
///
/// Titles that only differ in `:` versus `.` share a [`safe_id`]; the later
/// ones get a numeric suffix (`_2`, `_3`, ...).
#[derive(Debug, Default)]
struct FileIds {
    used: HashMap<(EventType, String), usize>,
}

impl FileIds {
    fn allocate(&mut self, key: &EventKey) -> String {
        let base = safe_id(&key.title);
        let count = self.used.entry((key.event_type, base.clone())).or_insert(0);
        *count += 1;
        if *count == 1 {
            return base;
        }
        let id = format!("{}_{}", base, count);
        tracing::warn!(
            event_type = %key.event_type,
            title = %key.title,
            file_id = %id,
            "event file name already taken, suffix added"
        );
        id
    }
}

fn loaded_messages<'m>(
    messages: &'m mut Option<MessageCatalog>,
    layout: &Layout,
) -> &'m MessageCatalog {
    messages.get_or_insert_with(|| MessageCatalog::load(layout))
}

fn frozen_index<'c>(
    cache: &'c mut RelationCache,
    layout: &Layout,
    messages: &MessageCatalog,
) -> &'c RelationIndex {
    cache.get_or_freeze_with(|| {
        let names = list_services(layout);
        let index = RelationIndex::build_with(layout, messages, &names);
        log_index_built!(services = names.len(), keys = index.len());
        index
    })
}

fn graph_dir(output: &Path) -> PathBuf {
    output.join("static").join("js").join("graph-data")
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SiteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SiteError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|source| SiteError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::trace!(path = %path.display(), "wrote");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventdoc_resolver::LayoutConfig;
    use serde_json::Value;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(path: PathBuf) -> Value {
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap()
    }

    /// Order and billing services around two messages; billing also sends
    /// a command nobody declares.
    fn catalog(temp: &TempDir) -> Layout {
        let root = temp.path().join("catalog");
        write(
            &root,
            "messages/message/order/message.created.yaml",
            r#"
components:
  messages:
    messageorderdirectorycreated:
      title: "OrderDirectory:Created"
      description: An order was placed
"#,
        );
        write(
            &root,
            "messages/message/billing/message.paid.yaml",
            r#"
components:
  messages:
    messagebillingdirectorypaid:
      title: "BillingDirectory:Paid"
      description: An invoice was paid
"#,
        );
        write(
            &root,
            "channels/order/message.created.yaml",
            r#"
channels:
  orderCreated:
    address: order.created
    messages:
      OrderCreated:
        $ref: '../../messages/message/order/message.created.yaml#/components/messages/messageorderdirectorycreated'
"#,
        );
        write(
            &root,
            "channels/billing/message.paid.yaml",
            r#"
channels:
  billingPaid:
    address: billing.paid
    messages:
      BillingPaid:
        $ref: '../../messages/message/billing/message.paid.yaml#/components/messages/messagebillingdirectorypaid'
"#,
        );
        write(
            &root,
            "channels/maintenance/command.cleanup.yaml",
            r#"
channels:
  cleanup:
    address: maintenance.cleanup
    messages:
      Cleanup:
        $ref: '../../messages/command/maintenance/command.cleanup.yaml#/components/messages/commandmaintenancecleanup'
"#,
        );
        write(
            &root,
            "services/order-service.yaml",
            r#"
info:
  title: Order Service
operations:
  publishOrderCreated:
    action: send
    channel:
      $ref: '../channels/order/message.created.yaml#/channels/orderCreated'
  onInvoicePaid:
    action: receive
    channel:
      $ref: '../channels/billing/message.paid.yaml#/channels/billingPaid'
"#,
        );
        write(
            &root,
            "services/billing-service.yaml",
            r#"
info:
  title: Billing Service
operations:
  onOrderCreated:
    action: receive
    channel:
      $ref: '../channels/order/message.created.yaml#/channels/orderCreated'
  publishInvoicePaid:
    action: send
    channel:
      $ref: '../channels/billing/message.paid.yaml#/channels/billingPaid'
  cleanup:
    action: send
    channel:
      $ref: '../channels/maintenance/command.cleanup.yaml#/channels/cleanup'
"#,
        );
        Layout::new(root, LayoutConfig::default())
    }

    #[test]
    fn safe_id_replaces_colons_and_dots() {
        assert_eq!(safe_id("OrderDirectory:Created"), "OrderDirectory_Created");
        assert_eq!(safe_id("v1.order:created"), "v1_order_created");
    }

    #[test]
    fn event_table_sorting_and_pagination() {
        let row = |name: &str, event_type| EventRow {
            id: safe_id(name),
            name: name.to_string(),
            event_type,
            description: String::new(),
            publishing_services: Vec::new(),
            consuming_services: Vec::new(),
        };
        let mut rows: Vec<EventRow> = (0..11)
            .map(|i| row(&format!("Zeta:{:02}", i), EventType::Message))
            .collect();
        rows.push(row("Alpha:Quote", EventType::Request));

        let table = EventTable::new(rows);
        assert_eq!(table.events[0].name, "Alpha:Quote");
        assert_eq!(table.total_events, 12);
        assert_eq!(table.message_count, 11);
        assert_eq!(table.request_count, 1);
        assert_eq!(table.command_count, 0);
        assert_eq!(table.page_size, 10);
        assert_eq!(table.total_pages, 2);

        let empty = EventTable::new(Vec::new());
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn generate_all_writes_output_layout() {
        let temp = TempDir::new().unwrap();
        let layout = catalog(&temp);
        let out = temp.path().join("out");

        let mut generator = SiteGenerator::new(layout, &out);
        let report = generator.generate_all().unwrap();

        assert!(report.is_success());
        assert_eq!(report.services.len(), 2);
        // Two declared messages plus the referenced, undeclared command.
        assert_eq!(report.events, 3);
        // 1 sidebar + 2 x (graph + snapshot) + 3 event graphs + 1 table.
        assert_eq!(report.files_written, 9);

        let services = read(out.join("data/services.json"));
        assert_eq!(services, serde_json::json!(["billing-service", "order-service"]));

        let graph = read(out.join("static/js/graph-data/order-service.json"));
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(graph["edges"][0]["label"], "accepts");
        assert_eq!(graph["edges"][1]["label"], "publishes");
        assert_eq!(graph["nodes"][2]["data"]["message"]["data"]["name"], "OrderDirectory:Created");

        let snapshot = read(out.join("data/services/order-service.json"));
        assert_eq!(snapshot["title"], "Order Service");
        assert_eq!(snapshot["sent_events"][0]["description"], "An order was placed");
        assert_eq!(snapshot["sent_events"][0]["type"], "message");

        let event = read(out.join(
            "static/js/graph-data/events/message_OrderDirectory_Created.json",
        ));
        assert_eq!(event["nodes"][1]["id"], "order-service");
        assert_eq!(event["nodes"][2]["id"], "billing-service");
        assert_eq!(event["edges"][1]["label"], "consumed by");

        let table = read(out.join("data/events.json"));
        assert_eq!(table["total_events"], 3);
        assert_eq!(table["message_count"], 2);
        assert_eq!(table["command_count"], 1);
        assert_eq!(table["events"][0]["name"], "BillingDirectory:Paid");
        assert_eq!(table["events"][0]["id"], "BillingDirectory_Paid");
        assert_eq!(
            table["events"][0]["publishing_services"][0]["id"],
            "billing-service"
        );
    }

    #[test]
    fn titles_sharing_a_safe_id_get_distinct_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("catalog");
        write(
            &root,
            "messages/message/order/message.created.yaml",
            r#"
components:
  messages:
    colon:
      title: "Order:Created"
    dot:
      title: "Order.Created"
"#,
        );
        let out = temp.path().join("out");
        let mut generator = SiteGenerator::new(Layout::new(root, LayoutConfig::default()), &out);
        let report = generator.generate_all().unwrap();
        assert_eq!(report.events, 2);

        let events = out.join("static/js/graph-data/events");
        let first = read(events.join("message_Order_Created.json"));
        let second = read(events.join("message_Order_Created_2.json"));
        assert_eq!(first["nodes"][0]["data"]["message"]["data"]["name"], "Order.Created");
        assert_eq!(second["nodes"][0]["data"]["message"]["data"]["name"], "Order:Created");

        let table = read(out.join("data/events.json"));
        let ids: Vec<&str> = table["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["Order_Created", "Order_Created_2"]);
    }

    #[test]
    fn message_documents_are_read_once_per_run() {
        let temp = TempDir::new().unwrap();
        let layout = catalog(&temp);
        let messages_dir = layout.messages_dir();
        let out = temp.path().join("out");
        let mut generator = SiteGenerator::new(layout, &out);
        assert_eq!(generator.relation_index().len(), 3);

        // Everything below is answered from the documents parsed above.
        fs::remove_dir_all(&messages_dir).unwrap();
        let report = generator.generate_all().unwrap();
        assert_eq!(report.events, 3);
        assert_eq!(report.soft_misses.len(), 1);
        let snapshot = read(out.join("data/services/order-service.json"));
        assert_eq!(snapshot["sent_events"][0]["description"], "An order was placed");

        generator.invalidate();
        let report = generator.generate_all().unwrap();
        assert_eq!(report.events, 3);
        assert_eq!(report.soft_misses.len(), 3);
    }

    #[test]
    fn undeclared_command_is_a_soft_miss_not_a_failure() {
        let temp = TempDir::new().unwrap();
        let layout = catalog(&temp);
        let mut generator = SiteGenerator::new(layout, temp.path().join("out"));

        let summary = generator.generate_service("billing-service").unwrap();
        assert_eq!(summary.sent, 2);
        assert_eq!(
            summary.soft_misses,
            vec![EventKey::new(EventType::Command, "commandmaintenancecleanup")]
        );

        let snapshot = read(temp.path().join("out/data/services/billing-service.json"));
        assert_eq!(
            snapshot["sent_events"][1]["description"],
            "Command commandmaintenancecleanup"
        );
    }

    #[test]
    fn broken_service_is_reported_and_skipped() {
        let temp = TempDir::new().unwrap();
        let layout = catalog(&temp);
        write(layout.root(), "services/broken.yaml", "info: [unclosed\n");

        let mut generator = SiteGenerator::new(layout, temp.path().join("out"));
        let report = generator.generate_all().unwrap();

        assert!(!report.is_success());
        assert_eq!(report.services.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].service, "broken");
        assert_eq!(report.failures[0].code, "E2012");
    }

    #[test]
    fn missing_single_service_is_an_error() {
        let temp = TempDir::new().unwrap();
        let layout = catalog(&temp);
        let mut generator = SiteGenerator::new(layout, temp.path().join("out"));

        let err = generator.generate_service("ghost").unwrap_err();
        assert!(matches!(err, SiteError::Resolve(ref e) if e.is_not_found()));
    }

    #[test]
    fn index_stays_frozen_until_invalidated() {
        let temp = TempDir::new().unwrap();
        let layout = catalog(&temp);
        let root = layout.root().to_path_buf();
        let mut generator = SiteGenerator::new(layout, temp.path().join("out"));

        assert_eq!(generator.relation_index().len(), 3);

        write(
            &root,
            "services/audit-service.yaml",
            r#"
info:
  title: Audit Service
operations:
  onPaid:
    action: receive
    channel:
      $ref: '../channels/billing/message.paid.yaml#/channels/billingPaid'
"#,
        );
        let paid = EventKey::new(EventType::Message, "BillingDirectory:Paid");
        let consumers = |index: &RelationIndex| index.get(&paid).unwrap().consumers().count();

        assert_eq!(consumers(generator.relation_index()), 1);
        generator.invalidate();
        assert_eq!(consumers(generator.relation_index()), 2);
    }
}
