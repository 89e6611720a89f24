//! Service-local timestamps.
//!
//! All times are reported in a fixed UTC+3 offset (no DST). Submission rows
//! carry a human-readable display timestamp; the activity log stores RFC3339
//! plus a day bucket for filtering.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

const UTC_OFFSET_SECS: i32 = 3 * 3600;

fn now_local() -> DateTime<FixedOffset> {
    let tz = FixedOffset::east_opt(UTC_OFFSET_SECS).expect("valid fixed offset");
    Utc::now().with_timezone(&tz)
}

/// Display timestamp for submission rows, e.g. "07.03.2026, 14:02:11".
pub fn now_display() -> String {
    now_local().format("%d.%m.%Y, %H:%M:%S").to_string()
}

/// RFC3339 timestamp for activity log entries.
pub fn now_iso() -> String {
    now_local().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Day bucket key for activity filtering, e.g. "2026-03-07".
pub fn today_key() -> String {
    now_local().format("%Y-%m-%d").to_string()
}
