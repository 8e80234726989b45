//! Vendor integrations.
//!
//! Each ticketing vendor is reduced to one capability: fetch the raw ticket
//! lines (and whatever event date it knows) for a configured event. All
//! pagination, auth and retry detail stays behind [`TicketSource`]; the
//! pipeline never sees transport concerns. The online store is a separate,
//! single-capability client ([`shopify::ShopifySource`]).

pub mod http;
pub mod plankton;
pub mod quicket;
pub mod shopify;

use async_trait::async_trait;
use chrono::NaiveDate;
use showtally_core::classify::{TypeCount, TypeRow};
use showtally_core::config::EventConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{vendor} returned HTTP {status} for `{subject}`: {body_excerpt}")]
    Status { vendor: &'static str, status: u16, subject: String, body_excerpt: String },
    #[error("{vendor} request for `{subject}` failed after {attempts} attempts: {source}")]
    Transport {
        vendor: &'static str,
        subject: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("{vendor} returned an unexpected payload for `{subject}`: {detail}")]
    Payload { vendor: &'static str, subject: String, detail: String },
}

/// Raw ticket lines in whichever of the two shapes the vendor speaks.
/// Count-weighted lines come from summary endpoints; row-counted lines are
/// individual guest records.
#[derive(Clone, Debug)]
pub enum RawLines {
    Counts(Vec<TypeCount>),
    Rows(Vec<TypeRow>),
}

/// Everything one fetch learns about one event.
#[derive(Clone, Debug)]
pub struct VendorTickets {
    pub lines: RawLines,
    pub event_date: Option<NaiveDate>,
}

/// The single capability a ticketing vendor exposes to the pipeline.
#[async_trait]
pub trait TicketSource: Send + Sync {
    fn vendor(&self) -> &'static str;

    async fn fetch_tickets(&self, event: &EventConfig) -> Result<VendorTickets, SourceError>;
}
