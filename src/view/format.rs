//! Display formatting for sizes and timestamps.

use chrono::{DateTime, Utc};

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Human-readable size in binary units (1 KB = 1024 B).
///
/// At most one decimal is shown and a trailing `.0` is dropped, so
/// `format_size(1024) == "1 KB"` and `format_size(1536) == "1.5 KB"`.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    // Rounding up to 1024.0 would print "1024 KB"; carry into the next unit.
    let mut rounded = (value * 10.0).round() / 10.0;
    if rounded >= 1024.0 && unit < UNITS.len() - 1 {
        rounded = 1.0;
        unit += 1;
    }

    if rounded.fract() == 0.0 {
        format!("{:.0} {}", rounded, UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, UNITS[unit])
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC, or an en dash when unknown.
pub fn format_last_modified(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "\u{2013}".to_string(),
    }
}
