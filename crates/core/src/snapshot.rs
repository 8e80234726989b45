//! Durable day-keyed sales snapshots.
//!
//! One JSON file per entity key under the snapshot directory, holding a flat
//! `{"YYYY-MM-DD": total}` map with sorted keys. The files are deliberately
//! human-inspectable; the `backfill` command edits them through the same
//! merge-and-save path the nightly job uses, so the two can never drift in
//! format.
//!
//! Reads never fail: a missing or corrupt file degrades to an empty history
//! and the day's delta simply comes out unknown.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("could not create snapshot directory `{path}`: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("could not write snapshot file `{path}`: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },
}

/// File-backed store of cumulative daily totals, one history per entity key.
///
/// Single-writer: the job runs as one scheduled invocation, so there is no
/// locking. If two invocations ever overlap, the last writer wins and the
/// backfill path can repair the loser's date.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full history for `key`, oldest date first. Empty map when the entity
    /// has no file yet or the file does not parse.
    pub fn load(&self, key: &str) -> BTreeMap<NaiveDate, i64> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return BTreeMap::new(),
        };
        let parsed: BTreeMap<String, i64> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(
                    event_name = "snapshot.load.corrupt",
                    entity_key = key,
                    path = %path.display(),
                    %error,
                    "snapshot file did not parse; treating history as empty"
                );
                return BTreeMap::new();
            }
        };

        let mut history = BTreeMap::new();
        for (date_str, total) in parsed {
            match NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") {
                Ok(date) => {
                    history.insert(date, total);
                }
                Err(_) => warn!(
                    event_name = "snapshot.load.bad_date",
                    entity_key = key,
                    date = %date_str,
                    "skipping snapshot entry with unparsable date"
                ),
            }
        }
        history
    }

    /// Write `total` under `date` for `key`, overwriting any previous value
    /// for that date. Returns whether the stored history changed; repeating
    /// the same write is a no-op.
    pub fn record(&self, key: &str, date: NaiveDate, total: i64) -> Result<bool, SnapshotError> {
        let mut history = self.load(key);
        if history.get(&date) == Some(&total) {
            return Ok(false);
        }
        history.insert(date, total);
        self.save(key, &history)?;
        Ok(true)
    }

    /// Units sold on the day before `reference`: the value recorded for
    /// `reference - 1 day` minus the value for `reference - 2 days`. `None`
    /// when either snapshot is missing — distinct from a zero delta.
    pub fn delta(&self, key: &str, reference: NaiveDate) -> Option<i64> {
        let yesterday = reference.checked_sub_days(Days::new(1))?;
        let day_before = reference.checked_sub_days(Days::new(2))?;
        let history = self.load(key);
        match (history.get(&yesterday), history.get(&day_before)) {
            (Some(late), Some(early)) => Some(late - early),
            _ => None,
        }
    }

    /// Administrative backfill: merge only the given dates into `key`'s
    /// history, leaving every other date untouched. Returns how many entries
    /// actually changed; nothing is written when none did.
    pub fn merge_patch(
        &self,
        key: &str,
        entries: &BTreeMap<NaiveDate, i64>,
    ) -> Result<usize, SnapshotError> {
        let mut history = self.load(key);
        let mut changed = 0;
        for (date, total) in entries {
            if history.get(date) != Some(total) {
                history.insert(*date, *total);
                changed += 1;
            }
        }
        if changed > 0 {
            self.save(key, &history)?;
        }
        Ok(changed)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn save(&self, key: &str, history: &BTreeMap<NaiveDate, i64>) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| SnapshotError::CreateDir { path: self.dir.clone(), source })?;

        // BTreeMap keeps the dates sorted, matching what backfill edits expect.
        let serializable: BTreeMap<String, i64> =
            history.iter().map(|(date, total)| (date.format("%Y-%m-%d").to_string(), *total)).collect();
        let body = serde_json::to_string_pretty(&serializable)
            .unwrap_or_else(|_| "{}".to_string());

        let path = self.path_for(key);
        fs::write(&path, body).map_err(|source| SnapshotError::WriteFile { path, source })
    }
}
