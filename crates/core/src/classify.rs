//! Ticket-type classification.
//!
//! Both ticketing vendors describe a sale with a free-form ticket-type name
//! ("Early Bird", "Kids Under 13", "Goue Kraal (VIP)"). Each event configures
//! named buckets as sets of those names; classification maps raw lines onto
//! the buckets. Matching is exact after normalization (trim + lowercase) —
//! no fuzzy matching.
//!
//! Two input shapes exist and must not be conflated:
//! - **count-weighted** ([`classify_counts`]): each line carries an already
//!   aggregated issued count (summary-endpoint vendors).
//! - **row-counted** ([`classify_rows`]): each line is one guest record and
//!   contributes exactly 1; rows flagged invalid are dropped first
//!   (guest-list vendors).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Normalized form used for every name comparison.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// What to do with a ticket-type name that matches no bucket and is not
/// excluded. Pinned per event in configuration; the two variants reproduce
/// the two behaviors the report has historically needed (guest-list events
/// folded unknown types into the first bucket, summary events ignored them).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmatchedPolicy {
    /// Unmatched names contribute to no bucket and not to `total_included`.
    Drop,
    /// Unmatched names are counted into the named bucket. The bucket must be
    /// one of the declared buckets; configuration validation enforces this.
    AssignTo(String),
}

/// One declared bucket: display name plus the raw ticket-type names that
/// belong to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub members: Vec<String>,
}

/// Per-event grouping configuration. Buckets are matched in declaration
/// order and the first bucket containing a name wins, so overlapping member
/// sets resolve deterministically (keeping them disjoint is the operator's
/// job). The exclude set is checked before any bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupConfig {
    pub buckets: Vec<Bucket>,
    pub exclude: Vec<String>,
    pub unmatched: UnmatchedPolicy,
}

impl GroupConfig {
    pub fn new(buckets: Vec<Bucket>, exclude: Vec<String>, unmatched: UnmatchedPolicy) -> Self {
        Self { buckets, exclude, unmatched }
    }

    /// Index of the bucket the unmatched policy assigns to, if any.
    fn unmatched_bucket(&self) -> Option<usize> {
        match &self.unmatched {
            UnmatchedPolicy::Drop => None,
            UnmatchedPolicy::AssignTo(name) => {
                let wanted = normalize(name);
                self.buckets.iter().position(|bucket| normalize(&bucket.name) == wanted)
            }
        }
    }
}

/// Count-weighted input line: a ticket-type name with a pre-aggregated
/// issued count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeCount {
    pub name: String,
    pub count: u64,
}

/// Row-counted input line: one guest record with its validity flag. Void or
/// cancelled rows arrive with `valid = false` and are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRow {
    pub name: String,
    pub valid: bool,
}

/// Classification result. `buckets` holds every declared bucket in
/// declaration order, zero counts included, so the report renders a stable
/// shape run over run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketTotals {
    pub buckets: Vec<(String, u64)>,
    pub excluded: u64,
    /// Lines seen before the validity filter (row-counted) or the sum of all
    /// raw counts (count-weighted). Excluded and dropped lines are in here.
    pub raw_total: u64,
    /// Sum of all bucket counts. Never includes the exclude set.
    pub total_included: u64,
}

/// Classify pre-aggregated `(name, count)` lines.
pub fn classify_counts<'a, I>(lines: I, groups: &GroupConfig) -> BucketTotals
where
    I: IntoIterator<Item = &'a TypeCount>,
{
    tally(lines.into_iter().map(|line| (line.name.as_str(), line.count)), groups)
}

/// Classify individual guest rows; each valid row contributes exactly 1.
pub fn classify_rows<'a, I>(rows: I, groups: &GroupConfig) -> BucketTotals
where
    I: IntoIterator<Item = &'a TypeRow>,
{
    let mut invalid = 0u64;
    let mut totals = tally(
        rows.into_iter().inspect(|row| invalid += u64::from(!row.valid)).filter(|row| row.valid).map(|row| (row.name.as_str(), 1)),
        groups,
    );
    totals.raw_total += invalid;
    totals
}

fn tally<'a, I>(lines: I, groups: &GroupConfig) -> BucketTotals
where
    I: Iterator<Item = (&'a str, u64)>,
{
    let member_sets: Vec<HashSet<String>> = groups
        .buckets
        .iter()
        .map(|bucket| bucket.members.iter().map(|name| normalize(name)).collect())
        .collect();
    let exclude: HashSet<String> = groups.exclude.iter().map(|name| normalize(name)).collect();
    let fallback = groups.unmatched_bucket();

    let mut counts = vec![0u64; groups.buckets.len()];
    let mut excluded = 0u64;
    let mut raw_total = 0u64;

    for (name, weight) in lines {
        raw_total += weight;
        let key = normalize(name);
        if exclude.contains(&key) {
            excluded += weight;
            continue;
        }
        let slot = member_sets.iter().position(|set| set.contains(&key)).or(fallback);
        if let Some(index) = slot {
            counts[index] += weight;
        }
    }

    let total_included = counts.iter().sum();
    let buckets = groups
        .buckets
        .iter()
        .zip(counts)
        .map(|(bucket, count)| (bucket.name.clone(), count))
        .collect();

    BucketTotals { buckets, excluded, raw_total, total_included }
}
