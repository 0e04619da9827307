use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Offset of the reporting clock, west of UTC.
pub const CLOCK_OFFSET_WEST_SECS: i32 = 6 * 3600;

/// Wire format of [`crate::record::TraceLog::timestamp`]: millisecond
/// precision with a literal `Z` suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Source of "now" for trace timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time rendered on the fixed UTC-6 wall clock.
    fn timestamp(&self) -> String {
        format_fixed_offset(self.now())
    }
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn reporting_offset() -> FixedOffset {
    FixedOffset::west_opt(CLOCK_OFFSET_WEST_SECS).unwrap_or_else(|| Utc.fix())
}

/// Render `instant` as UTC-6 wall-clock time.
///
/// The trailing `Z` is part of the established wire format even though
/// the digits are not UTC; the host's local zone is never consulted.
pub fn format_fixed_offset(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&reporting_offset())
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Shorthand for `SystemClock.timestamp()`.
pub fn now_fixed_offset() -> String {
    SystemClock.timestamp()
}
