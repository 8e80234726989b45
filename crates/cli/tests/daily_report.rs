//! End-to-end: configured events through stub fetchers to rendered report.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Days;
use showtally_cli::pipeline::{collect_sections, SourceMap};
use showtally_core::classify::{TypeCount, TypeRow};
use showtally_core::config::{AppConfig, EventConfig, EventSource, LoadOptions};
use showtally_core::report::render;
use showtally_core::snapshot::SnapshotStore;
use showtally_core::DeltaEngine;
use showtally_sources::{RawLines, SourceError, TicketSource, VendorTickets};
use tempfile::TempDir;

struct StubCounts;

#[async_trait]
impl TicketSource for StubCounts {
    fn vendor(&self) -> &'static str {
        "stub-plankton"
    }

    async fn fetch_tickets(&self, _event: &EventConfig) -> Result<VendorTickets, SourceError> {
        Ok(VendorTickets {
            lines: RawLines::Counts(vec![
                TypeCount { name: "GA".to_string(), count: 80 },
                TypeCount { name: "Kids".to_string(), count: 15 },
                TypeCount { name: "Comp".to_string(), count: 5 },
                TypeCount { name: "Unknown".to_string(), count: 3 },
            ]),
            event_date: None,
        })
    }
}

struct StubRows;

#[async_trait]
impl TicketSource for StubRows {
    fn vendor(&self) -> &'static str {
        "stub-quicket"
    }

    async fn fetch_tickets(&self, _event: &EventConfig) -> Result<VendorTickets, SourceError> {
        let mut rows: Vec<TypeRow> = Vec::new();
        rows.extend((0..40).map(|_| TypeRow { name: "Early Bird".to_string(), valid: true }));
        rows.extend((0..9).map(|_| TypeRow { name: "Kids Under 13".to_string(), valid: true }));
        rows.extend((0..2).map(|_| TypeRow { name: "Mystery Tier".to_string(), valid: true }));
        rows.push(TypeRow { name: "Early Bird".to_string(), valid: false });
        Ok(VendorTickets { lines: RawLines::Rows(rows), event_date: None })
    }
}

fn config(snapshot_dir: &std::path::Path) -> AppConfig {
    let body = format!(
        r#"
timezone = "Africa/Johannesburg"
snapshot_dir = "{}"

[plankton]
auth = "token"

[quicket]
api_key = "key"
user_token = "tok"

[[event]]
source = "plankton"
id = "guid-1"
name = "Loftus Park"
capacity = 2000
exclude = ["Comp"]

[[event.group]]
name = "GA (Adults)"
members = ["GA"]

[[event.group]]
name = "Kids"
members = ["Kids"]

[[event]]
source = "quicket"
id = "349783"
name = "Snowflake Potch"
capacity = 100

[[event.group]]
name = "Adults"
members = ["Early Bird"]

[[event.group]]
name = "Kids"
members = ["Kids Under 13"]
"#,
        snapshot_dir.display()
    );
    let file = snapshot_dir.join("config.toml");
    std::fs::write(&file, body).unwrap();
    AppConfig::load(LoadOptions {
        config_path: Some(file),
        require_file: true,
        ..LoadOptions::default()
    })
    .unwrap()
}

fn stub_sources() -> SourceMap {
    let mut sources: SourceMap = HashMap::new();
    sources.insert(EventSource::Plankton, Arc::new(StubCounts));
    sources.insert(EventSource::Quicket, Arc::new(StubRows));
    sources
}

#[tokio::test]
async fn full_run_renders_both_sections_and_records_snapshots() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = SnapshotStore::new(&config.snapshot_dir);

    let sections = collect_sections(&config, &stub_sources(), &store).await;
    let body = render(&sections, None);

    // Plankton event: Comp excluded, Unknown dropped (summary default).
    assert!(body.contains("Loftus Park"));
    assert!(body.contains("GA (Adults): 80"));
    assert!(body.contains("Total sold: 95"));
    assert!(body.contains("Sold out % (of 2,000): 5%"));

    // Quicket event: invalid row dropped, unknown tier folded into Adults.
    assert!(body.contains("Snowflake Potch"));
    assert!(body.contains("Adults: 42"));
    assert!(body.contains("Kids: 9"));
    assert!(body.contains("Total sold: 51"));
    assert!(body.contains("Sold out % (of 100): 51%"));

    // First run ever: no history yet.
    assert!(body.contains("Sold yesterday: N/A"));

    let today = DeltaEngine::new(store.clone(), config.timezone).today();
    assert_eq!(store.load("guid-1").get(&today), Some(&95));
    assert_eq!(store.load("quicket:349783").get(&today), Some(&51));
}

#[tokio::test]
async fn second_day_report_shows_the_delta() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = SnapshotStore::new(&config.snapshot_dir);

    let today = DeltaEngine::new(store.clone(), config.timezone).today();
    store.record("guid-1", today.checked_sub_days(Days::new(2)).unwrap(), 60).unwrap();
    store.record("guid-1", today.checked_sub_days(Days::new(1)).unwrap(), 90).unwrap();

    let sections = collect_sections(&config, &stub_sources(), &store).await;
    let body = render(&sections, None);
    assert!(body.contains("Loftus Park\nSold yesterday: 30"));
}
