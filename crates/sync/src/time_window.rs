//! Recency lower bound for price rule listings.

use chrono::{DateTime, TimeDelta, Utc};

/// Extra look-back added to every window so rules created while the previous
/// run was in flight are not missed.
pub const SAFETY_MARGIN_MINUTES: i64 = 10;

/// Wire format of `created_at_min`. The offset is always written as `-00:00`.
const LOWER_BOUND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S-00:00";

/// The span of creation times considered "recent" by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    interval: TimeDelta,
}

impl TimeWindow {
    /// Window matching a run interval of `hours`.
    #[must_use]
    pub fn from_hours(hours: u32) -> Self {
        Self {
            interval: TimeDelta::hours(i64::from(hours)),
        }
    }

    /// Total look-back, including the safety margin.
    #[must_use]
    pub fn look_back(&self) -> TimeDelta {
        self.interval + TimeDelta::minutes(SAFETY_MARGIN_MINUTES)
    }

    /// Lower bound relative to the current time.
    #[must_use]
    pub fn lower_bound(&self) -> String {
        self.lower_bound_at(Utc::now())
    }

    /// Lower bound relative to `now`.
    ///
    /// A look-back reaching past the representable date range clamps to the
    /// Unix epoch.
    #[must_use]
    pub fn lower_bound_at(&self, now: DateTime<Utc>) -> String {
        now.checked_sub_signed(self.look_back())
            .unwrap_or(DateTime::UNIX_EPOCH)
            .format(LOWER_BOUND_FORMAT)
            .to_string()
    }
}
