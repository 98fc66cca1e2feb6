mod alert;
mod analysis;
mod reading;

pub use alert::{AlertRecord, AlertTable};
pub use analysis::{AnalysisRecord, AnalysisTable};
pub use reading::{ReadingRecord, ReadingTable};

use time::OffsetDateTime;

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}

/// Timestamps are stored as unix milliseconds so ordering is numeric.
pub fn to_millis(time: OffsetDateTime) -> i64 {
    (time.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_millis(millis: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Drops sub-millisecond precision so a value survives a store round trip unchanged.
pub fn truncate_to_millis(time: OffsetDateTime) -> OffsetDateTime {
    from_millis(to_millis(time))
}
