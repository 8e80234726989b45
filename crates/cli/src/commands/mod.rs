pub mod backfill;
pub mod report;
pub mod snapshot;
