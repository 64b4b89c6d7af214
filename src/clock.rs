//! Wall-clock helpers. Every persisted timestamp is milliseconds since the Unix epoch.

use chrono::Utc;

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
