//! TTL policy for cached insights, kept free of I/O and real clocks so it is
//! trivially unit-testable.

use chrono::{DateTime, Duration, Utc};

/// Validity window for a stored insight. A record written at `t` is served
/// from cache until `t + INSIGHT_TTL_DAYS` days.
pub const INSIGHT_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// A record is fresh iff `now` is strictly before its `next_update` boundary.
pub fn classify(next_update: DateTime<Utc>, now: DateTime<Utc>) -> Freshness {
    if now < next_update {
        Freshness::Fresh
    } else {
        Freshness::Stale
    }
}

/// The `next_update` boundary for a record written at `now`.
pub fn next_update_after(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(INSIGHT_TTL_DAYS)
}
