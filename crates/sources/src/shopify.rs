//! Shopify REST Admin: order summary for the trailing seven days.
//!
//! Gross sales exclude shipping (preferring the modern
//! `total_shipping_price_set.shop_money.amount`, falling back to summing
//! `shipping_lines[].price`) and do not subtract refunds. Pagination follows
//! the `Link: rel="next"` header; 429 responses back off and retry.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use showtally_core::config::{HttpConfig, ShopifyConfig};
use showtally_core::dates::local_today;
use showtally_core::report::{StoreSummary, TopItem};

use crate::{http, SourceError};

const VENDOR: &str = "shopify";

pub struct ShopifySource {
    client: Client,
    config: ShopifyConfig,
    retries: u32,
    tz: Tz,
}

impl ShopifySource {
    pub fn new(client: Client, config: ShopifyConfig, http: &HttpConfig, tz: Tz) -> Self {
        Self { client, config, retries: http.retries, tz }
    }

    /// Orders created in the last seven days, reduced to the store section
    /// of the report.
    pub async fn week_summary(&self) -> Result<StoreSummary, SourceError> {
        let start = (Utc::now() - Duration::days(7)).format("%Y-%m-%dT%H:%M:%SZ");
        let first_url = format!(
            "{}/orders.json?status=any&limit=250&created_at_min={start}",
            self.config.base_url.trim_end_matches('/')
        );
        let yesterday = local_today(self.tz).checked_sub_days(Days::new(1));

        let mut tally = OrderTally::default();
        let mut next_url = Some(first_url);

        while let Some(url) = next_url {
            let response = http::get_with_retry(VENDOR, "orders", self.retries, || {
                self.client
                    .get(&url)
                    .header("Accept", "application/json")
                    .header("X-Shopify-Access-Token", self.config.access_token.expose_secret())
            })
            .await?;

            next_url = response
                .headers()
                .get("Link")
                .and_then(|value| value.to_str().ok())
                .and_then(parse_next_link);

            let page: OrdersPage = response.json().await.map_err(|error| {
                SourceError::Payload {
                    vendor: VENDOR,
                    subject: "orders".to_string(),
                    detail: error.to_string(),
                }
            })?;
            tally.absorb(&page.orders, yesterday, self.tz);
        }

        Ok(tally.into_summary(self.config.currency.clone()))
    }
}

/// Extract the `rel="next"` URL from Shopify's Link header.
fn parse_next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let part = part.trim();
        if !part.contains("rel=\"next\"") {
            continue;
        }
        let start = part.find('<')? + 1;
        let end = part.find('>')?;
        if start < end {
            return Some(part[start..end].to_string());
        }
    }
    None
}

#[derive(Debug, Default, Deserialize)]
struct OrdersPage {
    #[serde(default)]
    orders: Vec<Order>,
}

#[derive(Debug, Default, Deserialize)]
struct Order {
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    total_price: Option<String>,
    #[serde(default)]
    total_shipping_price_set: Option<PriceSet>,
    #[serde(default)]
    shipping_lines: Vec<ShippingLine>,
    #[serde(default)]
    line_items: Vec<LineItem>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceSet {
    #[serde(default)]
    shop_money: Option<Money>,
}

#[derive(Debug, Default, Deserialize)]
struct Money {
    #[serde(default)]
    amount: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ShippingLine {
    #[serde(default)]
    price: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LineItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    quantity: Option<i64>,
}

#[derive(Debug, Default)]
struct OrderTally {
    orders: u64,
    gross: Decimal,
    yesterday_gross: Decimal,
    items: HashMap<String, u64>,
}

impl OrderTally {
    fn absorb(&mut self, orders: &[Order], yesterday: Option<NaiveDate>, tz: Tz) {
        for order in orders {
            self.orders += 1;
            let net = net_total_excl_shipping(order);
            self.gross += net;
            if let (Some(created), Some(target)) = (order_local_date(order, tz), yesterday) {
                if created == target {
                    self.yesterday_gross += net;
                }
            }
            for item in &order.line_items {
                let quantity = item.quantity.unwrap_or(0);
                if quantity > 0 {
                    let title = item
                        .title
                        .as_deref()
                        .map(str::trim)
                        .filter(|title| !title.is_empty())
                        .unwrap_or("Unknown item");
                    *self.items.entry(title.to_string()).or_insert(0) += quantity as u64;
                }
            }
        }
    }

    fn into_summary(self, currency: String) -> StoreSummary {
        // Ties break on title so the report is stable run over run.
        let top_item = self
            .items
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(title, quantity)| TopItem { title, quantity });

        StoreSummary {
            currency,
            yesterday_sales: self.yesterday_gross,
            week_sales: self.gross,
            orders: self.orders,
            top_item,
        }
    }
}

fn order_local_date(order: &Order, tz: Tz) -> Option<NaiveDate> {
    let raw = order.created_at.as_deref()?;
    let stamp = DateTime::parse_from_rfc3339(raw.trim()).ok()?;
    Some(stamp.with_timezone(&tz).date_naive())
}

/// Gross order value minus shipping, floored at zero.
fn net_total_excl_shipping(order: &Order) -> Decimal {
    let total = parse_money(order.total_price.as_deref());
    let net = total - shipping_amount(order);
    net.max(Decimal::ZERO)
}

fn shipping_amount(order: &Order) -> Decimal {
    let preferred = order
        .total_shipping_price_set
        .as_ref()
        .and_then(|set| set.shop_money.as_ref())
        .map(|money| parse_money(money.amount.as_deref()))
        .unwrap_or(Decimal::ZERO);
    if preferred > Decimal::ZERO {
        return preferred;
    }
    // Older API responses only carry shipping_lines.
    order
        .shipping_lines
        .iter()
        .map(|line| parse_money(line.price.as_deref()))
        .sum::<Decimal>()
        .max(Decimal::ZERO)
}

fn parse_money(raw: Option<&str>) -> Decimal {
    raw.and_then(|value| Decimal::from_str(value.trim()).ok()).unwrap_or(Decimal::ZERO)
}
