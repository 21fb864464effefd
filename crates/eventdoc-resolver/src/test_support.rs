//! Shared fixtures for the resolver tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};

use crate::config::{Layout, LayoutConfig};

/// A temporary input tree.
///
/// Documents are written under a non-hidden `catalog/` subdirectory of the
/// temp dir; the handle must be kept alive for the duration of the test.
pub struct Fixture {
    _temp: TempDir,
    root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp directory");
        let root = temp.path().join("catalog");
        fs::create_dir(&root).expect("failed to create catalog directory");
        Self { _temp: temp, root }
    }

    /// A tree under the current directory whose root is spelled `./<temp>/catalog`.
    pub fn in_current_dir() -> Self {
        let temp = Builder::new()
            .prefix("eventdoc-fixture-")
            .tempdir_in(".")
            .expect("failed to create temp directory");
        let name = temp.path().file_name().expect("temp directory has a name");
        let root = Path::new(".").join(name).join("catalog");
        fs::create_dir(&root).expect("failed to create catalog directory");
        Self { _temp: temp, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture directory");
        }
        fs::write(&path, content).expect("failed to write fixture");
        path
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.root, LayoutConfig::default())
    }

    /// A service document with one operation per `(name, action, channel ref)`.
    pub fn service(&self, name: &str, title: &str, operations: &[(&str, &str, &str)]) -> PathBuf {
        let mut yaml = format!(
            "asyncapi: 3.0.0\ninfo:\n  title: {title}\n  description: The {title}\n  version: 2.0.0\n"
        );
        if !operations.is_empty() {
            yaml.push_str("operations:\n");
            for (op, action, channel) in operations {
                yaml.push_str(&format!(
                    "  {op}:\n    action: {action}\n    channel:\n      $ref: '{channel}'\n"
                ));
            }
        }
        self.write(&format!("services/{}.yaml", name), &yaml)
    }

    /// A channel document whose single message references `message_ref`.
    pub fn channel(&self, relative: &str, key: &str, address: &str, message_ref: &str) -> PathBuf {
        let yaml = format!(
            "asyncapi: 3.0.0\nchannels:\n  {key}:\n    address: {address}\n    messages:\n      {key}Message:\n        $ref: '{message_ref}'\n"
        );
        self.write(relative, &yaml)
    }

    /// A message document declaring one container.
    pub fn message(
        &self,
        relative: &str,
        container: &str,
        title: &str,
        description: &str,
    ) -> PathBuf {
        let yaml = format!(
            "asyncapi: 3.0.0\ncomponents:\n  messages:\n    {container}:\n      title: \"{title}\"\n      description: {description}\n      version: 1.2.0\n"
        );
        self.write(relative, &yaml)
    }

    /// The order/billing tree used across modules.
    ///
    /// - `order-service` sends `OrderDirectory:Created` (twice, through two
    ///   operations) and receives `BillingDirectory:Paid`.
    /// - `billing-service` receives `OrderDirectory:Created`, sends
    ///   `BillingDirectory:Paid` and sends the `ScheduleCleanup` command.
    pub fn order_catalog() -> Self {
        let fixture = Fixture::new();

        fixture.message(
            "messages/message/order/message.created.yaml",
            "messageorderdirectorycreated",
            "OrderDirectory:Created",
            "An order was placed",
        );
        fixture.message(
            "messages/message/billing/message.paid.yaml",
            "messagebillingdirectorypaid",
            "BillingDirectory:Paid",
            "An invoice was paid",
        );
        fixture.message(
            "messages/command/maintenance/command.schedulecleanup.yaml",
            "commandmaintenanceschedulecleanup",
            "Maintenance:ScheduleCleanup",
            "Purge stale carts",
        );

        fixture.channel(
            "channels/order/message.created.yaml",
            "orderCreated",
            "order.created",
            "../../messages/message/order/message.created.yaml#/components/messages/messageorderdirectorycreated",
        );
        fixture.channel(
            "channels/billing/message.paid.yaml",
            "billingPaid",
            "billing.paid",
            "../../messages/message/billing/message.paid.yaml#/components/messages/messagebillingdirectorypaid",
        );
        fixture.channel(
            "channels/maintenance/command.schedulecleanup.yaml",
            "scheduleCleanup",
            "maintenance.cleanup",
            "../../messages/command/maintenance/command.schedulecleanup.yaml#/components/messages/commandmaintenanceschedulecleanup",
        );

        fixture.service(
            "order-service",
            "Order Service",
            &[
                (
                    "publishOrderCreated",
                    "send",
                    "../channels/order/message.created.yaml#/channels/orderCreated",
                ),
                (
                    "republishOrderCreated",
                    "send",
                    "channels/order/message.created.yaml#/channels/orderCreated",
                ),
                (
                    "onInvoicePaid",
                    "receive",
                    "../channels/billing/message.paid.yaml#/channels/billingPaid",
                ),
            ],
        );
        fixture.service(
            "billing-service",
            "Billing Service",
            &[
                (
                    "onOrderCreated",
                    "receive",
                    "../channels/order/message.created.yaml#/channels/orderCreated",
                ),
                (
                    "publishInvoicePaid",
                    "send",
                    "../channels/billing/message.paid.yaml#/channels/billingPaid",
                ),
                (
                    "scheduleCleanup",
                    "send",
                    "../channels/maintenance/command.schedulecleanup.yaml#/channels/scheduleCleanup",
                ),
            ],
        );

        fixture
    }
}
