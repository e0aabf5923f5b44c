use crate::diff::DiffKind;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;

/// Single-character marker for a change kind.
#[must_use]
pub const fn change_char(kind: DiffKind) -> char {
    match kind {
        DiffKind::Added => 'A',
        DiffKind::Deleted => 'D',
        DiffKind::Modified => 'M',
    }
}

/// Formats a changed path with its colored marker, e.g. `M src/lib.rs`.
#[must_use]
pub fn format_change(kind: DiffKind, path: &str) -> String {
    let marker = change_char(kind).to_string();
    let marker = match kind {
        DiffKind::Added => marker.green(),
        DiffKind::Deleted => marker.red(),
        DiffKind::Modified => marker.yellow(),
    };
    format!("{marker} {path}")
}

/// Formats bytes into human-readable size
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{bytes} {}", UNITS[unit_index])
    } else {
        format!("{size:.2} {}", UNITS[unit_index])
    }
}

/// Formats a UTC time in the local timezone.
#[must_use]
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Formats how long ago `time` was relative to `now`.
#[must_use]
pub fn format_relative_time(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - time).num_seconds();

    if diff < 0 {
        return "in the future".to_string();
    }

    let (value, unit) = if diff < 60 {
        (diff, "second")
    } else if diff < 3600 {
        (diff / 60, "minute")
    } else if diff < 86400 {
        (diff / 3600, "hour")
    } else if diff < 2_592_000 {
        (diff / 86400, "day")
    } else if diff < 31_536_000 {
        (diff / 2_592_000, "month")
    } else {
        (diff / 31_536_000, "year")
    };

    if value == 1 {
        format!("{value} {unit} ago")
    } else {
        format!("{value} {unit}s ago")
    }
}
