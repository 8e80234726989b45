use anyhow::Context;
use showtally_core::config::AppConfig;
use showtally_core::report::{render, subject_line};
use showtally_core::snapshot::SnapshotStore;
use showtally_mailer::Mailer;
use tracing::warn;

use crate::pipeline;

/// Full daily run: fetch every source, snapshot, assemble, deliver.
pub async fn run(config: &AppConfig, no_email: bool) -> anyhow::Result<()> {
    let sources = pipeline::build_sources(config)?;
    let store = SnapshotStore::new(&config.snapshot_dir);
    let sections = pipeline::collect_sections(config, &sources, &store).await;

    let store_summary = match pipeline::build_shopify(config)? {
        Some(shopify) => match shopify.week_summary().await {
            Ok(summary) => Some(summary),
            Err(error) => {
                // Non-fatal: the ticketing sections still go out.
                warn!(
                    event_name = "report.store_summary.failed",
                    error = %error,
                    "store summary failed; omitting its section"
                );
                None
            }
        },
        None => None,
    };

    let body = render(&sections, store_summary.as_ref());

    if no_email {
        println!("{body}");
        return Ok(());
    }

    let email = config.email.as_ref().context(
        "email is not configured; add an [email] section (or run with --no-email)",
    )?;
    let mailer = Mailer::new(email)?;
    let subject = subject_line(&email.subject_prefix, config.timezone);
    mailer.send(&subject, &body).await?;
    Ok(())
}
