//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use wa_core::{DateRange, MatterId};
use wa_db::Database;

use crate::Config;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").expect("valid relative time regex")
});

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either RFC 3339 or relative time.
///
/// Supports:
/// - RFC 3339: "2025-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
/// - "now"
pub fn parse_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    parse_datetime_at(s, Utc::now())
}

fn parse_datetime_at(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try relative time: "N hours/minutes/days/weeks ago"
    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2025-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    let duration = Duration::minutes(n * minutes_per_unit);
    Ok(now - duration)
}

/// Parse a calendar day as `YYYY-MM-DD`, "today", or any [`parse_datetime`] form.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    parse_date_at(s, Utc::now())
}

fn parse_date_at(s: &str, now: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("today") {
        return Ok(now.date_naive());
    }
    if let Ok(date) = s.parse::<NaiveDate>() {
        return Ok(date);
    }
    parse_datetime_at(s, now)
        .map(|dt| dt.date_naive())
        .with_context(|| format!("Invalid date: {s}. Use YYYY-MM-DD or relative (e.g., '7 days ago')"))
}

/// Builds an inclusive day range; a missing end means today.
pub fn date_range(start: &str, end: Option<&str>) -> anyhow::Result<DateRange> {
    let start = parse_date(start)?;
    let end = end.map_or_else(|| Ok(Utc::now().date_naive()), parse_date)?;
    DateRange::new(start, end).context("invalid date range")
}

pub fn parse_matter(matter: Option<&str>) -> anyhow::Result<Option<MatterId>> {
    matter
        .map(MatterId::new)
        .transpose()
        .context("invalid matter ID")
}

/// Opens the configured database, creating its parent directory.
pub fn open_database(config: &Config) -> anyhow::Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}
