mod enrollment;
mod prospect;
mod sequence;
mod session;

pub use enrollment::*;
pub use prospect::*;
pub use sequence::*;
pub use session::*;

use chrono::{DateTime, TimeZone, Utc};

pub(crate) fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).unwrap()
}

pub(crate) fn datetime_to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}
