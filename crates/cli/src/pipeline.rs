//! Per-event orchestration: fetch, classify, snapshot, delta.
//!
//! Each event is processed independently. A fetch failure degrades that one
//! event to a placeholder block and never blocks the others, so a vendor
//! outage still produces a report for everything else.

use std::collections::HashMap;
use std::sync::Arc;

use chrono_tz::Tz;
use showtally_core::classify::{classify_counts, classify_rows};
use showtally_core::config::{AppConfig, EventConfig, EventSource};
use showtally_core::dates::days_until;
use showtally_core::report::{EventBlock, ReportSection};
use showtally_core::snapshot::SnapshotStore;
use showtally_core::DeltaEngine;
use showtally_sources::plankton::PlanktonSource;
use showtally_sources::quicket::QuicketSource;
use showtally_sources::shopify::ShopifySource;
use showtally_sources::{http, RawLines, SourceError, TicketSource};
use tracing::{info, warn};

pub type SourceMap = HashMap<EventSource, Arc<dyn TicketSource>>;

/// Build one fetcher per configured vendor section.
pub fn build_sources(config: &AppConfig) -> Result<SourceMap, SourceError> {
    let client = http::client(&config.http)?;
    let mut sources: SourceMap = HashMap::new();

    if let Some(plankton) = &config.plankton {
        sources.insert(
            EventSource::Plankton,
            Arc::new(PlanktonSource::new(client.clone(), plankton.clone(), &config.http)),
        );
    }
    if let Some(quicket) = &config.quicket {
        sources.insert(
            EventSource::Quicket,
            Arc::new(QuicketSource::new(
                client.clone(),
                quicket.clone(),
                &config.http,
                config.timezone,
            )),
        );
    }
    Ok(sources)
}

pub fn build_shopify(config: &AppConfig) -> Result<Option<ShopifySource>, SourceError> {
    match &config.shopify {
        Some(section) => Ok(Some(ShopifySource::new(
            http::client(&config.http)?,
            section.clone(),
            &config.http,
            config.timezone,
        ))),
        None => Ok(None),
    }
}

/// Run one event through fetch → classify → snapshot → delta. Never fails:
/// a fetch error yields a zeroed placeholder block.
pub async fn process_event(
    event: &EventConfig,
    source: &dyn TicketSource,
    store: &SnapshotStore,
    tz: Tz,
) -> EventBlock {
    let key = event.snapshot_key();

    let fetched = match source.fetch_tickets(event).await {
        Ok(fetched) => fetched,
        Err(error) => {
            warn!(
                event_name = "pipeline.fetch.failed",
                event = %event.name,
                vendor = source.vendor(),
                error = %error,
                "fetch failed; reporting a placeholder block"
            );
            return EventBlock::placeholder(&event.name, event.capacity, &bucket_names(event));
        }
    };

    let totals = match &fetched.lines {
        RawLines::Counts(lines) => classify_counts(lines, &event.groups),
        RawLines::Rows(rows) => classify_rows(rows, &event.groups),
    };

    let engine = DeltaEngine::new(store.clone(), tz);
    let today = engine.today();
    match store.record(&key, today, totals.total_included as i64) {
        Ok(changed) => info!(
            event_name = "pipeline.snapshot.recorded",
            event = %event.name,
            key = %key,
            date = %today,
            total = totals.total_included,
            changed,
            "today's snapshot {}",
            if changed { "saved" } else { "unchanged" }
        ),
        Err(error) => warn!(
            event_name = "pipeline.snapshot.write_failed",
            event = %event.name,
            key = %key,
            error = %error,
            "could not persist today's snapshot; report continues"
        ),
    }

    let yesterday = engine.yesterday_delta(&key);
    let event_date = event.event_date.or(fetched.event_date);

    EventBlock {
        name: event.name.clone(),
        capacity: event.capacity,
        buckets: totals.buckets,
        total: totals.total_included,
        yesterday,
        days_to_event: event_date.map(|date| days_until(date, tz)),
    }
}

/// Process every configured event, grouped into one report section per
/// vendor. Sections keep configuration order; empty sections are dropped.
pub async fn collect_sections(
    config: &AppConfig,
    sources: &SourceMap,
    store: &SnapshotStore,
) -> Vec<ReportSection> {
    let mut grouped: Vec<(EventSource, &str, Vec<EventBlock>)> = vec![
        (EventSource::Plankton, "Own shows", Vec::new()),
        (EventSource::Quicket, "Quicket shows", Vec::new()),
    ];

    for event in &config.events {
        // Config validation guarantees a source exists for every event.
        let Some(source) = sources.get(&event.source) else {
            warn!(
                event_name = "pipeline.source.missing",
                event = %event.name,
                "no fetcher for event's source; skipping"
            );
            continue;
        };
        let block = process_event(event, source.as_ref(), store, config.timezone).await;
        if let Some((_, _, blocks)) = grouped.iter_mut().find(|(kind, _, _)| *kind == event.source)
        {
            blocks.push(block);
        }
    }

    grouped
        .into_iter()
        .filter(|(_, _, blocks)| !blocks.is_empty())
        .map(|(_, heading, blocks)| ReportSection { heading: heading.to_string(), blocks })
        .collect()
}

fn bucket_names(event: &EventConfig) -> Vec<String> {
    event.groups.buckets.iter().map(|bucket| bucket.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Days;
    use chrono_tz::Africa::Johannesburg;
    use showtally_core::classify::{Bucket, GroupConfig, TypeCount, UnmatchedPolicy};
    use showtally_core::config::{EventConfig, EventSource};
    use showtally_sources::{SourceError, VendorTickets};
    use tempfile::TempDir;

    use super::*;

    struct FixedSource(Vec<TypeCount>);

    #[async_trait]
    impl TicketSource for FixedSource {
        fn vendor(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_tickets(&self, _event: &EventConfig) -> Result<VendorTickets, SourceError> {
            Ok(VendorTickets { lines: RawLines::Counts(self.0.clone()), event_date: None })
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl TicketSource for BrokenSource {
        fn vendor(&self) -> &'static str {
            "broken"
        }

        async fn fetch_tickets(&self, event: &EventConfig) -> Result<VendorTickets, SourceError> {
            Err(SourceError::Payload {
                vendor: "broken",
                subject: event.id.clone(),
                detail: "boom".to_string(),
            })
        }
    }

    fn event() -> EventConfig {
        EventConfig {
            source: EventSource::Plankton,
            id: "guid-1".to_string(),
            name: "Loftus Park".to_string(),
            capacity: 2000,
            groups: GroupConfig::new(
                vec![
                    Bucket { name: "Adults".into(), members: vec!["GA".into()] },
                    Bucket { name: "Kids".into(), members: vec!["Kids".into()] },
                ],
                vec!["Comp".into()],
                UnmatchedPolicy::Drop,
            ),
            event_date: None,
        }
    }

    fn lines() -> Vec<TypeCount> {
        vec![
            TypeCount { name: "GA".into(), count: 80 },
            TypeCount { name: "Kids".into(), count: 15 },
            TypeCount { name: "Comp".into(), count: 5 },
        ]
    }

    #[tokio::test]
    async fn successful_fetch_classifies_and_records() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let source = FixedSource(lines());

        let block = process_event(&event(), &source, &store, Johannesburg).await;
        assert_eq!(block.total, 95);
        assert_eq!(block.buckets[0], ("Adults".to_string(), 80));
        // First ever run: no prior history, so yesterday is unknown.
        assert_eq!(block.yesterday, None);

        let today = DeltaEngine::new(store.clone(), Johannesburg).today();
        assert_eq!(store.load("guid-1").get(&today), Some(&95));
    }

    #[tokio::test]
    async fn delta_appears_once_history_exists() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let today = DeltaEngine::new(store.clone(), Johannesburg).today();
        store.record("guid-1", today.checked_sub_days(Days::new(2)).unwrap(), 40).unwrap();
        store.record("guid-1", today.checked_sub_days(Days::new(1)).unwrap(), 70).unwrap();

        let block = process_event(&event(), &FixedSource(lines()), &store, Johannesburg).await;
        assert_eq!(block.yesterday, Some(30));
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_a_placeholder() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());

        let block = process_event(&event(), &BrokenSource, &store, Johannesburg).await;
        assert_eq!(block.total, 0);
        assert_eq!(block.yesterday, None);
        assert_eq!(block.buckets, vec![("Adults".to_string(), 0), ("Kids".to_string(), 0)]);
        // Nothing gets recorded for a failed fetch.
        assert!(store.load("guid-1").is_empty());
    }

    #[tokio::test]
    async fn repeat_runs_are_idempotent_for_the_day() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let source = FixedSource(lines());

        process_event(&event(), &source, &store, Johannesburg).await;
        process_event(&event(), &source, &store, Johannesburg).await;

        assert_eq!(store.load("guid-1").len(), 1);
    }
}
