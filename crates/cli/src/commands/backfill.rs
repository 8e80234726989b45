use std::collections::BTreeMap;

use chrono::NaiveDate;
use showtally_core::config::AppConfig;
use showtally_core::snapshot::SnapshotStore;

/// Administrative merge-patch write: set one date's total for one entity,
/// leaving every other date in its history untouched.
pub fn run(config: &AppConfig, key: &str, date: NaiveDate, total: i64) -> anyhow::Result<()> {
    let store = SnapshotStore::new(&config.snapshot_dir);

    let mut patch = BTreeMap::new();
    patch.insert(date, total);

    let changed = store.merge_patch(key, &patch)?;
    if changed > 0 {
        println!("wrote {key} {date} = {total}");
    } else {
        println!("skip: {key} already has {date} = {total}");
    }
    Ok(())
}
