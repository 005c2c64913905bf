//! Gap detection against a per-day baseline.
//!
//! Compares recorded time for each calendar day with the minimum the
//! baseline expects:
//! - no entries at all → `missing`, confidence high
//! - entries totalling less than the baseline → `under_recorded`, confidence medium
//! - off-days and zero-hour baselines never produce a gap

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::{
    Confidence, DateRange, MatterId, UserId, ValidationError, round_hours, validate_hours,
};

/// Time already recorded for a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEntry {
    pub date: NaiveDate,
    pub hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matter_id: Option<MatterId>,
    #[serde(default)]
    pub description: String,
}

/// Source of already-recorded time entries.
pub trait TimeEntryStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists recorded entries dated inside `range`, optionally for one matter.
    fn list_recorded(
        &self,
        range: &DateRange,
        matter_id: Option<&MatterId>,
    ) -> Result<Vec<RecordedEntry>, Self::Error>;
}

/// Expected working hours per day.
pub trait BaselineConfig {
    /// Minimum billable hours expected on a given weekday.
    fn minimum_hours_for_day(&self, user_id: Option<&UserId>, weekday: Weekday) -> f64;

    /// Whether the whole day is registered as off (holiday, leave).
    fn is_off_day(&self, user_id: Option<&UserId>, date: NaiveDate) -> bool;
}

/// The same minimum every day, with optional explicit off-days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedBaseline {
    hours: f64,
    off_days: BTreeSet<NaiveDate>,
}

impl FixedBaseline {
    pub fn new(hours: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            hours: validate_hours("minimum hours per day", hours)?,
            off_days: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn with_off_days(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.off_days.extend(days);
        self
    }
}

impl BaselineConfig for FixedBaseline {
    fn minimum_hours_for_day(&self, _user_id: Option<&UserId>, _weekday: Weekday) -> f64 {
        self.hours
    }

    fn is_off_day(&self, _user_id: Option<&UserId>, date: NaiveDate) -> bool {
        self.off_days.contains(&date)
    }
}

/// Per-weekday minimums (e.g. 8h on weekdays, 0h at weekends) plus off-days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyBaseline {
    /// Minimum hours on working weekdays.
    pub hours_per_day: f64,
    /// Weekdays that expect no time.
    pub off_weekdays: Vec<Weekday>,
    /// Registered whole off-days.
    pub off_days: Vec<NaiveDate>,
}

impl Default for WeeklyBaseline {
    fn default() -> Self {
        Self {
            hours_per_day: 0.0,
            off_weekdays: vec![Weekday::Sat, Weekday::Sun],
            off_days: Vec::new(),
        }
    }
}

impl WeeklyBaseline {
    /// Rejects negative or non-finite hours.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_hours("hours per day", self.hours_per_day).map(|_| ())
    }
}

impl BaselineConfig for WeeklyBaseline {
    fn minimum_hours_for_day(&self, _user_id: Option<&UserId>, weekday: Weekday) -> f64 {
        if self.off_weekdays.contains(&weekday) {
            0.0
        } else {
            self.hours_per_day
        }
    }

    fn is_off_day(&self, _user_id: Option<&UserId>, date: NaiveDate) -> bool {
        self.off_days.contains(&date)
    }
}

/// Why a day was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// No time recorded at all.
    Missing,
    /// Some time recorded, below the baseline.
    UnderRecorded,
}

/// A day with missing or under-recorded time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub date: NaiveDate,
    pub kind: GapKind,
    pub recorded_hours: f64,
    pub expected_hours: f64,
    pub gap_hours: f64,
    pub confidence: Confidence,
    /// Number of recorded entries found for the day.
    #[serde(default)]
    pub entries: usize,
}

/// Options for gap detection.
#[derive(Debug, Clone, Default)]
pub struct GapOptions {
    /// User whose baseline applies.
    pub user_id: Option<UserId>,
    /// Only count time recorded against this matter.
    pub matter_id: Option<MatterId>,
}

/// Totals across the analysed range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapSummary {
    pub total_days: u32,
    pub days_with_gaps: usize,
    pub total_gap_hours: f64,
    pub total_recorded_hours: f64,
}

/// Result of gap detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapReport {
    pub range: DateRange,
    pub gaps: Vec<Gap>,
    pub summary: GapSummary,
}

/// Finds days in `range` with missing or under-recorded time.
///
/// `recorded` is the caller-fetched list of entries; entries outside the
/// range, or for another matter when `options.matter_id` is set, are ignored.
pub fn identify_gaps<B: BaselineConfig + ?Sized>(
    range: &DateRange,
    options: &GapOptions,
    recorded: &[RecordedEntry],
    baseline: &B,
) -> Result<GapReport, ValidationError> {
    let mut by_day: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for entry in recorded {
        if !range.contains(entry.date) {
            continue;
        }
        if let Some(matter) = &options.matter_id {
            if entry.matter_id.as_ref() != Some(matter) {
                continue;
            }
        }
        let hours = validate_hours("recorded hours", entry.hours)?;
        let (total, count) = by_day.entry(entry.date).or_insert((0.0, 0));
        *total += hours;
        *count += 1;
    }

    let user = options.user_id.as_ref();
    let mut gaps = Vec::new();
    for day in range.days() {
        if baseline.is_off_day(user, day) {
            continue;
        }
        let expected = validate_hours(
            "minimum hours per day",
            baseline.minimum_hours_for_day(user, day.weekday()),
        )?;
        if expected <= 0.0 {
            continue;
        }

        let (recorded_hours, entries) = by_day.get(&day).copied().unwrap_or((0.0, 0));
        let gap = if entries == 0 {
            Some(Gap {
                date: day,
                kind: GapKind::Missing,
                recorded_hours: 0.0,
                expected_hours: expected,
                gap_hours: round_hours(expected),
                confidence: Confidence::High,
                entries,
            })
        } else if recorded_hours < expected {
            Some(Gap {
                date: day,
                kind: GapKind::UnderRecorded,
                recorded_hours: round_hours(recorded_hours),
                expected_hours: expected,
                gap_hours: round_hours(expected - recorded_hours),
                confidence: Confidence::Medium,
                entries,
            })
        } else {
            None
        };
        if let Some(gap) = gap {
            gaps.push(gap);
        }
    }

    let summary = GapSummary {
        total_days: range.num_days(),
        days_with_gaps: gaps.len(),
        total_gap_hours: round_hours(gaps.iter().map(|gap| gap.gap_hours).sum()),
        total_recorded_hours: round_hours(by_day.values().map(|(hours, _)| hours).sum()),
    };
    tracing::debug!(
        range = %range,
        gaps = summary.days_with_gaps,
        gap_hours = summary.total_gap_hours,
        "identified gaps"
    );

    Ok(GapReport {
        range: *range,
        gaps,
        summary,
    })
}

/// Fetches recorded entries from `store` and runs [`identify_gaps`].
pub fn identify_gaps_from_store<S, B>(
    store: &S,
    range: &DateRange,
    options: &GapOptions,
    baseline: &B,
) -> Result<GapReport, GapStoreError<S::Error>>
where
    S: TimeEntryStore + ?Sized,
    B: BaselineConfig + ?Sized,
{
    let recorded = store
        .list_recorded(range, options.matter_id.as_ref())
        .map_err(GapStoreError::Store)?;
    identify_gaps(range, options, &recorded, baseline).map_err(GapStoreError::Validation)
}

/// Failure while detecting gaps from a store.
#[derive(Debug, thiserror::Error)]
pub enum GapStoreError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Validation(ValidationError),
    #[error("failed to list recorded entries: {0}")]
    Store(#[source] E),
}
