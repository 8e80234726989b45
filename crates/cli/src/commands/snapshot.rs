use showtally_core::config::AppConfig;
use showtally_core::snapshot::SnapshotStore;
use tracing::warn;

use crate::pipeline;

/// Nightly entry point: record today's totals for every event without
/// assembling or sending a report.
pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let sources = pipeline::build_sources(config)?;
    let store = SnapshotStore::new(&config.snapshot_dir);

    for event in &config.events {
        match sources.get(&event.source) {
            Some(source) => {
                // Recording happens inside; the block itself is discarded.
                pipeline::process_event(event, source.as_ref(), &store, config.timezone).await;
            }
            None => warn!(
                event_name = "snapshot.source.missing",
                event = %event.name,
                "no fetcher for event's source; skipping"
            ),
        }
    }
    Ok(())
}
