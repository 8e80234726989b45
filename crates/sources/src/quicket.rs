//! Quicket: paginated guest list. Every guest row is one ticket
//! (row-counted lines) with a validity flag; void or cancelled tickets
//! arrive with `Valid = false`. The first page doubles as a cheap probe for
//! the event date via each row's `TicketInformation.EventDate`.

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use showtally_core::classify::TypeRow;
use showtally_core::config::{EventConfig, HttpConfig, QuicketConfig};
use showtally_core::dates::{local_today, parse_vendor_date};

use crate::{http, RawLines, SourceError, TicketSource, VendorTickets};

const VENDOR: &str = "quicket";

pub struct QuicketSource {
    client: Client,
    config: QuicketConfig,
    retries: u32,
    tz: Tz,
}

impl QuicketSource {
    pub fn new(client: Client, config: QuicketConfig, http: &HttpConfig, tz: Tz) -> Self {
        Self { client, config, retries: http.retries, tz }
    }

    async fn fetch_page(&self, event_id: &str, page: u32) -> Result<GuestPage, SourceError> {
        let url = format!(
            "{}/api/events/{}/guests?page={}&pagesize={}",
            self.config.base_url.trim_end_matches('/'),
            event_id,
            page,
            self.config.page_size
        );

        let response = http::get_with_retry(VENDOR, event_id, self.retries, || {
            self.client
                .get(&url)
                .header("Accept", "application/json")
                .header("api_key", self.config.api_key.expose_secret())
                .header("usertoken", self.config.user_token.expose_secret())
        })
        .await?;

        response.json().await.map_err(|error| SourceError::Payload {
            vendor: VENDOR,
            subject: event_id.to_string(),
            detail: error.to_string(),
        })
    }
}

#[async_trait]
impl TicketSource for QuicketSource {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    async fn fetch_tickets(&self, event: &EventConfig) -> Result<VendorTickets, SourceError> {
        let mut rows: Vec<TypeRow> = Vec::new();
        let mut event_date = None;
        let mut page = 1u32;

        loop {
            let envelope = self.fetch_page(&event.id, page).await?;
            if page == 1 {
                event_date = pick_event_date(page_dates(&envelope), local_today(self.tz));
            }
            if envelope.results.is_empty() {
                break;
            }
            rows.extend(envelope.results.iter().map(|guest| TypeRow {
                name: guest.ticket_type.clone(),
                valid: guest.valid,
            }));

            if page >= envelope.pages.max(1) {
                break;
            }
            page += 1;
        }

        Ok(VendorTickets { lines: RawLines::Rows(rows), event_date })
    }
}

#[derive(Debug, Deserialize)]
struct GuestPage {
    #[serde(default)]
    results: Vec<GuestRow>,
    #[serde(default)]
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct GuestRow {
    #[serde(default, rename = "TicketType")]
    ticket_type: String,
    // Absent flag means the ticket counts.
    #[serde(default = "default_valid", rename = "Valid")]
    valid: bool,
    #[serde(default, rename = "TicketInformation")]
    ticket_information: Option<TicketInformation>,
}

#[derive(Debug, Deserialize)]
struct TicketInformation {
    #[serde(default, rename = "EventDate")]
    event_date: Option<String>,
}

fn default_valid() -> bool {
    true
}

fn page_dates(envelope: &GuestPage) -> Vec<NaiveDate> {
    envelope
        .results
        .iter()
        .filter_map(|guest| guest.ticket_information.as_ref())
        .filter_map(|info| info.event_date.as_deref())
        .filter_map(parse_vendor_date)
        .collect()
}

/// The earliest upcoming date, falling back to the earliest seen when the
/// event is already in the past.
fn pick_event_date(dates: Vec<NaiveDate>, today: NaiveDate) -> Option<NaiveDate> {
    let upcoming = dates.iter().filter(|date| **date >= today).min().copied();
    upcoming.or_else(|| dates.into_iter().min())
}
