pub mod classify;
pub mod config;
pub mod dates;
pub mod delta;
pub mod report;
pub mod snapshot;

pub use classify::{
    classify_counts, classify_rows, Bucket, BucketTotals, GroupConfig, TypeCount, TypeRow,
    UnmatchedPolicy,
};
pub use config::{
    AppConfig, ConfigError, ConfigOverrides, EmailConfig, EventConfig, EventSource, LoadOptions,
};
pub use delta::DeltaEngine;
pub use report::{capacity_percent, subject_line, EventBlock, ReportSection, StoreSummary, TopItem};
pub use snapshot::{SnapshotError, SnapshotStore};
