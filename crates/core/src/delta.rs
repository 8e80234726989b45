use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::dates::local_today;
use crate::snapshot::SnapshotStore;

/// Day-over-day movement for one entity, computed against the report
/// timezone's calendar rather than the host clock or UTC.
#[derive(Clone, Debug)]
pub struct DeltaEngine {
    store: SnapshotStore,
    tz: Tz,
}

impl DeltaEngine {
    pub fn new(store: SnapshotStore, tz: Tz) -> Self {
        Self { store, tz }
    }

    /// The timezone-local date this invocation is running on. Looked up
    /// fresh per call; the job is often scheduled near local midnight.
    pub fn today(&self) -> NaiveDate {
        local_today(self.tz)
    }

    /// Units sold yesterday, or `None` when the history is too short.
    pub fn yesterday_delta(&self, key: &str) -> Option<i64> {
        self.store.delta(key, self.today())
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }
}
