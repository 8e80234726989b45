//! Report assembly.
//!
//! Consumes per-event aggregates and the optional online-store summary and
//! renders the fixed-structure plain-text report the email carries. One
//! section per data source, blank-line-delimited sub-blocks per event.

use chrono::Utc;
use chrono_tz::Tz;
use rust_decimal::Decimal;

/// Aggregate block for one event, ready to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventBlock {
    pub name: String,
    pub capacity: u64,
    /// Bucket label/count pairs in configured declaration order.
    pub buckets: Vec<(String, u64)>,
    pub total: u64,
    /// Units sold yesterday; `None` renders as "N/A".
    pub yesterday: Option<i64>,
    /// Days until the event; the line is omitted when unknown.
    pub days_to_event: Option<i64>,
}

impl EventBlock {
    /// Placeholder for an event whose fetch failed: zeroed buckets, unknown
    /// delta, so the rest of the report still goes out.
    pub fn placeholder(name: &str, capacity: u64, bucket_names: &[String]) -> Self {
        Self {
            name: name.to_string(),
            capacity,
            buckets: bucket_names.iter().map(|label| (label.clone(), 0)).collect(),
            total: 0,
            yesterday: None,
            days_to_event: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopItem {
    pub title: String,
    pub quantity: u64,
}

/// Online-store section data (trailing seven days).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSummary {
    pub currency: String,
    pub yesterday_sales: Decimal,
    pub week_sales: Decimal,
    pub orders: u64,
    pub top_item: Option<TopItem>,
}

/// One ticketing source's worth of event blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportSection {
    pub heading: String,
    pub blocks: Vec<EventBlock>,
}

/// Percentage of capacity sold, rounded to the nearest whole percent with
/// ties going to the even value. Zero when no capacity target is
/// configured; never a division error.
pub fn capacity_percent(total: u64, capacity: u64) -> u64 {
    if capacity == 0 {
        return 0;
    }
    let scaled = 100u128 * u128::from(total);
    let capacity = u128::from(capacity);
    let (quotient, remainder) = (scaled / capacity, scaled % capacity);
    let round_up = match (2 * remainder).cmp(&capacity) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => 0,
        std::cmp::Ordering::Equal => quotient % 2,
    };
    (quotient + round_up) as u64
}

/// Subject line: fixed prefix plus the timezone-local long-form date.
pub fn subject_line(prefix: &str, tz: Tz) -> String {
    let now = Utc::now().with_timezone(&tz);
    format!("{prefix} - {}", now.format("%A, %d %B %Y"))
}

/// Render the full report body. Store section first when present, then each
/// ticketing section in the order given.
pub fn render(sections: &[ReportSection], store: Option<&StoreSummary>) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(summary) = store {
        lines.push("Online store".to_string());
        lines.push(format!(
            "Yesterday's sales: {}{}",
            summary.currency,
            summary.yesterday_sales.round_dp(2)
        ));
        lines.push(format!(
            "Sales this week: {}{}",
            summary.currency,
            summary.week_sales.round_dp(2)
        ));
        lines.push(format!("Orders this week: {}", summary.orders));
        if let Some(top) = &summary.top_item {
            lines.push(format!("Top seller: {} (x{})", top.title, top.quantity));
        }
        lines.push(String::new());
    }

    for section in sections {
        lines.push(section.heading.clone());
        lines.push(String::new());
        for block in &section.blocks {
            render_block(block, &mut lines);
        }
    }

    let mut body = lines.join("\n");
    while body.ends_with('\n') {
        body.pop();
    }
    body
}

fn render_block(block: &EventBlock, lines: &mut Vec<String>) {
    lines.push(block.name.clone());
    match block.yesterday {
        Some(delta) => lines.push(format!("Sold yesterday: {delta}")),
        None => lines.push("Sold yesterday: N/A".to_string()),
    }
    if let Some(days) = block.days_to_event {
        lines.push(format!("Days to show: {days}"));
    }
    for (index, (label, count)) in block.buckets.iter().enumerate() {
        // Minor buckets (VIP tiers and the like) only appear once they have
        // sales; the two primary buckets always render.
        if index < 2 || *count > 0 {
            lines.push(format!("{label}: {count}"));
        }
    }
    lines.push(format!("Total sold: {}", block.total));
    lines.push(format!(
        "Sold out % (of {}): {}%",
        group_thousands(block.capacity),
        capacity_percent(block.total, block.capacity)
    ));
    lines.push(String::new());
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (offset, ch) in digits.chars().enumerate() {
        if offset > 0 && (digits.len() - offset) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
