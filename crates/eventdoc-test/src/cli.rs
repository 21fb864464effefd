//! CLI regression tests for the `eventdoc` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes, output layout and output formats.
//!
//! Run with: `cargo test -p eventdoc-test`
//! Requires the `eventdoc` binary to be built first (`cargo build -p eventdoc`).

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `eventdoc` binary.
fn eventdoc() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("eventdoc")
        .expect("eventdoc binary not found, run `cargo build -p eventdoc` first");
    cmd.env_remove("RUST_LOG")
        .env_remove("EVENTDOC_LOG_LEVEL")
        .env_remove("EVENTDOC_LOG_FORMAT");
    cmd
}

/// Absolute path to the shared test fixtures directory.
fn fixtures() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/eventdoc-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates/")
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
}

fn read_json(path: &Path) -> Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content).expect("output is not valid JSON")
}

// ---------------------------------------------------------------------------
// eventdoc generate
// ---------------------------------------------------------------------------

#[test]
fn generate_all_writes_site_data() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--input"])
        .arg(fixtures().join("catalog"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stderr(contains("generated 3 service(s) and 4 event(s)"))
        .stderr(contains(
            "command commandmaintenanceschedulecleanup is not declared by any document",
        ));

    let graph_data = out.path().join("static/js/graph-data");
    for service in ["billing-service", "order-service", "pricing-service"] {
        assert!(graph_data.join(format!("{}.json", service)).is_file());
        assert!(out
            .path()
            .join(format!("data/services/{}.json", service))
            .is_file());
    }
    for event in [
        "message_OrderDirectory_Created",
        "message_BillingDirectory_Paid",
        "request_Pricing_Quote",
        "command_commandmaintenanceschedulecleanup",
    ] {
        assert!(
            graph_data.join(format!("events/{}.json", event)).is_file(),
            "missing event graph {}",
            event
        );
    }

    let services = read_json(&out.path().join("data/services.json"));
    assert_eq!(
        services,
        serde_json::json!(["billing-service", "order-service", "pricing-service"])
    );
}

#[test]
fn generate_service_graph_layout() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--input"])
        .arg(fixtures().join("catalog"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .success();

    let graph = read_json(&out.path().join("static/js/graph-data/order-service.json"));
    let nodes = graph["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 4);

    assert_eq!(nodes[0]["id"], "order-service");
    assert_eq!(nodes[0]["type"], "services");
    assert_eq!(nodes[0]["position"], serde_json::json!({"x": 525, "y": 125}));

    assert_eq!(nodes[1]["id"], "BillingDirectory:Paid-message");
    assert_eq!(nodes[1]["position"], serde_json::json!({"x": 75, "y": 50}));

    assert_eq!(nodes[2]["id"], "OrderDirectory:Created-message");
    assert_eq!(nodes[2]["position"], serde_json::json!({"x": 975, "y": 50}));
    assert_eq!(nodes[3]["id"], "Pricing:Quote-request");
    assert_eq!(nodes[3]["type"], "requests");
    assert_eq!(nodes[3]["position"], serde_json::json!({"x": 975, "y": 150}));

    let labels: Vec<&str> = graph["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["accepts", "publishes", "publishes"]);

    let snapshot = read_json(&out.path().join("data/services/order-service.json"));
    assert_eq!(snapshot["version"], "3.1.0");
    assert_eq!(
        snapshot["sent_events"][0]["description"],
        "A customer order was placed and accepted."
    );
}

#[test]
fn generate_event_table() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--input"])
        .arg(fixtures().join("catalog"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .success();

    let table = read_json(&out.path().join("data/events.json"));
    assert_eq!(table["total_events"], 4);
    assert_eq!(table["message_count"], 2);
    assert_eq!(table["request_count"], 1);
    assert_eq!(table["command_count"], 1);
    assert_eq!(table["page_size"], 10);
    assert_eq!(table["total_pages"], 1);

    let created = table["events"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["name"] == "OrderDirectory:Created")
        .expect("OrderDirectory:Created row");
    assert_eq!(created["id"], "OrderDirectory_Created");
    assert_eq!(created["publishing_services"][0]["id"], "order-service");
    assert_eq!(created["consuming_services"][0]["id"], "billing-service");

    let event_graph = read_json(
        &out.path()
            .join("static/js/graph-data/events/request_Pricing_Quote.json"),
    );
    assert_eq!(event_graph["nodes"][1]["id"], "order-service");
    assert_eq!(event_graph["nodes"][2]["id"], "pricing-service");
    assert_eq!(event_graph["edges"][1]["label"], "consumed by");
}

#[test]
fn generate_single_service() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--service", "billing-service", "--input"])
        .arg(fixtures().join("catalog"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stderr(contains("generated billing-service (1 received, 2 sent)"));

    assert!(out
        .path()
        .join("static/js/graph-data/billing-service.json")
        .is_file());
    assert!(!out
        .path()
        .join("static/js/graph-data/order-service.json")
        .exists());
    assert!(!out.path().join("data/events.json").exists());
}

#[test]
fn generate_unknown_service_exits_one() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--service", "ghost-service", "--input"])
        .arg(fixtures().join("catalog"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2010"));
}

#[test]
fn generate_missing_input_exits_one() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--input", "this-directory-does-not-exist"])
        .arg("--output")
        .arg(out.path())
        .assert()
        .failure()
        .code(1)
        .stderr(contains("input root not found"));
}

#[test]
fn generate_skips_broken_services() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--input"])
        .arg(fixtures().join("broken-catalog"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stderr(contains("✗ broken-service"))
        .stderr(contains("1 skipped"));

    assert!(out
        .path()
        .join("data/services/empty-service.json")
        .is_file());
}

#[test]
fn generate_custom_layout() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--input"])
        .arg(fixtures().join("custom-layout"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stderr(contains("generated 1 service(s) and 1 event(s)"));

    let snapshot = read_json(&out.path().join("data/services/shipping-service.json"));
    assert_eq!(snapshot["sent_events"][0]["name"], "Shipping:Shipped");
}

#[test]
fn generate_missing_config_exits_one() {
    let out = TempDir::new().unwrap();

    eventdoc()
        .args(["generate", "--input"])
        .arg(fixtures().join("catalog"))
        .arg("--config")
        .arg(fixtures().join("no-such-config.yaml"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .failure()
        .code(1)
        .stderr(contains("layout config not found"));
}

// ---------------------------------------------------------------------------
// eventdoc check
// ---------------------------------------------------------------------------

#[test]
fn check_valid_catalog_exits_zero() {
    eventdoc()
        .args(["check", "--input"])
        .arg(fixtures().join("catalog"))
        .assert()
        .success()
        .stderr(contains("✓ order-service is valid"))
        .stderr(contains("✓ billing-service is valid (with 1 soft miss(es))"))
        .stderr(contains("checked 3 service(s): 3 valid, 0 invalid"));
}

#[test]
fn check_broken_catalog_exits_one() {
    eventdoc()
        .args(["check", "--input"])
        .arg(fixtures().join("broken-catalog"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E2012"))
        .stderr(contains("✓ empty-service is valid"));
}

#[test]
fn check_json_format() {
    let output = eventdoc()
        .args(["check", "--format", "json", "--input"])
        .arg(fixtures().join("catalog"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["summary"]["total"], 3);
    assert_eq!(report["summary"]["valid"], 3);
    assert_eq!(report["summary"]["events"], 3);
    assert_eq!(
        report["soft_misses"],
        serde_json::json!([{"type": "command", "title": "commandmaintenanceschedulecleanup"}])
    );
}

#[test]
fn check_json_format_reports_error_codes() {
    let output = eventdoc()
        .args(["check", "--format", "json", "--input"])
        .arg(fixtures().join("broken-catalog"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["summary"]["invalid"], 1);
    assert_eq!(report["results"][0]["service"], "broken-service");
    assert_eq!(report["results"][0]["error"]["code"], "E2012");
}

// ---------------------------------------------------------------------------
// eventdoc events
// ---------------------------------------------------------------------------

#[test]
fn events_lists_declared_keys() {
    eventdoc()
        .args(["events", "--input"])
        .arg(fixtures().join("catalog"))
        .assert()
        .success()
        .stdout(
            "message BillingDirectory:Paid\nmessage OrderDirectory:Created\nrequest Pricing:Quote\n",
        );
}

#[test]
fn events_respects_layout_config() {
    eventdoc()
        .args(["events", "--input"])
        .arg(fixtures().join("custom-layout"))
        .assert()
        .success()
        .stdout(contains("message Shipping:Shipped"));
}

// ---------------------------------------------------------------------------
// logging flags
// ---------------------------------------------------------------------------

#[test]
fn json_log_format_from_env() {
    eventdoc()
        .env("EVENTDOC_LOG_FORMAT", "json")
        .env("EVENTDOC_LOG_LEVEL", "warn")
        .args(["events", "--input"])
        .arg(fixtures().join("catalog"))
        .assert()
        .success()
        .stderr(contains("\"event_type\":\"command\"").and(contains("\"level\":\"WARN\"")));
}

#[test]
fn pretty_log_format_shows_source_locations() {
    eventdoc()
        .env("NO_COLOR", "1")
        .args(["--log-format", "pretty", "--log-level", "warn", "events", "--input"])
        .arg(fixtures().join("catalog"))
        .assert()
        .success()
        .stderr(contains("WARN").and(contains("    at ")).and(contains("event.rs:")));
}

#[test]
fn unknown_log_format_exits_one() {
    eventdoc()
        .args(["--log-format", "xml", "events", "--input"])
        .arg(fixtures().join("catalog"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("unknown log format 'xml'"));
}

#[test]
fn quiet_log_level_keeps_stderr_clean() {
    eventdoc()
        .args(["--log-level", "error", "events", "--input"])
        .arg(fixtures().join("catalog"))
        .assert()
        .success()
        .stderr(predicates::str::is_empty());
}
