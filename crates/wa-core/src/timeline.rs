//! Timeline reconstruction from collected artifacts.
//!
//! Merges heterogeneous evidence into chronological, confidence-scored events.
//!
//! # Algorithm Summary
//!
//! 1. Infer granularity from the window span (hour / day / week)
//! 2. Stable-sort artifacts by timestamp
//! 3. Coalesce adjacent same-type artifacts within a granularity-scaled tolerance
//! 4. Score each event from its evidence, capped at the best evidence's ceiling
//! 5. Clamp per-day minutes at 24h
//! 6. Aggregate confidence is the weakest event's confidence
//!
//! The result is a pure function of the request: no clock reads, no random
//! identifiers, ordered maps only.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::artifact::{Artifact, ArtifactType};
use crate::policy::DurationPolicy;
use crate::types::{Confidence, EvidenceKind, MatterId, ValidationError};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Longest description detail taken from an artifact, in characters.
const DETAIL_MAX_CHARS: usize = 120;

const LOW_CONFIDENCE_NOTE: &str = "Aggregate confidence is low: at least one event rests on sparse \
     metadata only. Collect more evidence (sent items, filed documents, calendar entries) before \
     relying on this reconstruction.";

/// Reconstruction failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconstructError {
    /// The request was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No artifacts were supplied.
    #[error("no evidence supplied for {start} to {end}: reconstruction needs at least one artifact")]
    NoEvidence {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Resolution inferred from the window span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Week,
}

impl Granularity {
    /// ≤2h is an hour, ≤36h a day, anything longer a week.
    #[must_use]
    pub fn from_span(span: Duration) -> Self {
        if span <= Duration::hours(2) {
            Self::Hour
        } else if span <= Duration::hours(36) {
            Self::Day
        } else {
            Self::Week
        }
    }

    const fn tolerance_multiplier(self) -> i64 {
        match self {
            Self::Hour => 1,
            Self::Day => 2,
            Self::Week => 4,
        }
    }

    /// Minimum stretch without events reported as a quiet period.
    #[must_use]
    pub fn quiet_threshold(self) -> Duration {
        match self {
            Self::Hour => Duration::hours(1),
            Self::Day => Duration::hours(8),
            Self::Week => Duration::hours(24),
        }
    }
}

/// Caller-supplied context, echoed into the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionContext {
    /// Explicit matter binding. Makes every event billable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matter_id: Option<MatterId>,
    /// Any other caller fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ReconstructionContext {
    #[must_use]
    pub fn for_matter(matter_id: MatterId) -> Self {
        Self {
            matter_id: Some(matter_id),
            extra: BTreeMap::new(),
        }
    }
}

/// Input to [`reconstruct_timeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub context: ReconstructionContext,
    pub artifacts: Vec<Artifact>,
}

/// Where an event's duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    /// At least one member stated its own duration.
    Explicit,
    /// Taken from the policy table.
    Policy,
}

/// A coalesced run of same-type artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Timestamp of the earliest member.
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub duration_minutes: u32,
    pub duration_source: DurationSource,
    /// Set when the duration was clamped to keep the day within 24h.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub capped: bool,
    pub description: String,
    /// Member artifacts, in timestamp order.
    pub artifacts: Vec<Artifact>,
    pub confidence: Confidence,
}

impl TimelineEvent {
    /// UTC day the event is attributed to.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.timestamp + Duration::minutes(i64::from(self.duration_minutes))
    }

    #[must_use]
    pub fn hours(&self) -> f64 {
        f64::from(self.duration_minutes) / 60.0
    }

    /// Strongest evidence among the members.
    #[must_use]
    pub fn best_evidence(&self) -> EvidenceKind {
        self.artifacts
            .iter()
            .map(|artifact| artifact.evidence_kind)
            .max()
            .unwrap_or(EvidenceKind::Pattern)
    }
}

/// Counts backing the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub total_artifacts: usize,
    pub by_type: BTreeMap<ArtifactType, usize>,
    /// Share of the window covered by events, 0-100, one decimal.
    pub coverage_percentage: f64,
}

/// A stretch of the window with no events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub minutes: i64,
}

/// Output of [`reconstruct_timeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionResult {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub granularity: Granularity,
    pub timeline: Vec<TimelineEvent>,
    pub aggregate_confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub evidence: EvidenceSummary,
    pub quiet_periods: Vec<QuietPeriod>,
    pub context: ReconstructionContext,
}

/// Reconstructs a chronological timeline from the request's artifacts.
///
/// # Errors
///
/// - [`ReconstructError::Validation`] if `end` is before `start`
/// - [`ReconstructError::NoEvidence`] if no artifacts were supplied
pub fn reconstruct_timeline(
    request: &ReconstructionRequest,
    policy: &DurationPolicy,
) -> Result<ReconstructionResult, ReconstructError> {
    let (start, end) = (request.start, request.end);
    if end < start {
        return Err(ValidationError::InvalidRange {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        }
        .into());
    }
    if request.artifacts.is_empty() {
        return Err(ReconstructError::NoEvidence { start, end });
    }

    let granularity = Granularity::from_span(end - start);
    let tolerance = Duration::minutes(
        i64::from(policy.coalesce_tolerance_minutes) * granularity.tolerance_multiplier(),
    );

    // `sort_by_key` is stable, so equal timestamps keep their input order.
    let mut sorted: Vec<&Artifact> = request.artifacts.iter().collect();
    sorted.sort_by_key(|artifact| artifact.timestamp);

    let mut timeline: Vec<TimelineEvent> = coalesce(&sorted, tolerance)
        .into_iter()
        .filter_map(|members| build_event(&members, policy))
        .collect();
    apply_daily_cap(&mut timeline);

    let aggregate_confidence = timeline
        .iter()
        .map(|event| event.confidence)
        .min()
        .unwrap_or(Confidence::Low);
    let note = (aggregate_confidence == Confidence::Low).then(|| LOW_CONFIDENCE_NOTE.to_string());

    let mut by_type = BTreeMap::new();
    for artifact in &request.artifacts {
        *by_type.entry(artifact.artifact_type).or_insert(0) += 1;
    }
    let evidence = EvidenceSummary {
        total_artifacts: request.artifacts.len(),
        by_type,
        coverage_percentage: coverage_percentage(&timeline, start, end),
    };
    let quiet_periods = quiet_periods(&timeline, granularity.quiet_threshold());

    tracing::debug!(
        events = timeline.len(),
        artifacts = evidence.total_artifacts,
        ?granularity,
        confidence = %aggregate_confidence,
        "reconstructed timeline"
    );

    Ok(ReconstructionResult {
        period_start: start,
        period_end: end,
        granularity,
        timeline,
        aggregate_confidence,
        note,
        evidence,
        quiet_periods,
        context: request.context.clone(),
    })
}

/// Reconstructs independent windows in parallel, preserving input order.
pub fn reconstruct_windows(
    requests: &[ReconstructionRequest],
    policy: &DurationPolicy,
) -> Vec<Result<ReconstructionResult, ReconstructError>> {
    requests
        .par_iter()
        .map(|request| reconstruct_timeline(request, policy))
        .collect()
}

/// Splits sorted artifacts into runs of the same type with no gap above `tolerance`.
fn coalesce<'a>(sorted: &[&'a Artifact], tolerance: Duration) -> Vec<Vec<&'a Artifact>> {
    let mut groups: Vec<Vec<&'a Artifact>> = Vec::new();

    for &artifact in sorted {
        let joins_current = groups
            .last()
            .and_then(|group| group.last())
            .is_some_and(|previous| {
                previous.artifact_type == artifact.artifact_type
                    && artifact.timestamp - previous.timestamp <= tolerance
            });

        match groups.last_mut() {
            Some(group) if joins_current => group.push(artifact),
            _ => groups.push(vec![artifact]),
        }
    }

    groups
}

fn build_event(members: &[&Artifact], policy: &DurationPolicy) -> Option<TimelineEvent> {
    let first = members.first()?;
    let artifact_type = first.artifact_type;

    let explicit: Vec<u32> = members
        .iter()
        .filter_map(|artifact| artifact.explicit_duration_minutes())
        .collect();
    let (duration_minutes, duration_source) = if explicit.is_empty() {
        (
            policy.default_minutes(artifact_type, members.len()),
            DurationSource::Policy,
        )
    } else {
        (
            explicit.iter().fold(0_u32, |acc, m| acc.saturating_add(*m)),
            DurationSource::Explicit,
        )
    };

    Some(TimelineEvent {
        timestamp: first.timestamp,
        artifact_type,
        duration_minutes,
        duration_source,
        capped: false,
        description: describe(artifact_type, members),
        artifacts: members.iter().map(|&artifact| artifact.clone()).collect(),
        confidence: evidence_confidence(members),
    })
}

/// Scores a set of artifacts.
///
/// High iff some direct artifact has content; medium if any artifact is direct
/// or has substance; low for bare metadata. Never above the best evidence's ceiling.
pub(crate) fn evidence_confidence(members: &[&Artifact]) -> Confidence {
    let best = members
        .iter()
        .map(|artifact| artifact.evidence_kind)
        .max()
        .unwrap_or(EvidenceKind::Pattern);

    let raw = if members
        .iter()
        .any(|a| a.evidence_kind == EvidenceKind::Direct && a.content_text().is_some())
    {
        Confidence::High
    } else if members
        .iter()
        .any(|a| a.evidence_kind == EvidenceKind::Direct || a.has_substance())
    {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    raw.min(best.ceiling())
}

const fn type_label(artifact_type: ArtifactType) -> (&'static str, &'static str) {
    match artifact_type {
        ArtifactType::Email => ("Email", "emails"),
        ArtifactType::Calendar => ("Calendar event", "calendar events"),
        ArtifactType::Document => ("Document", "documents"),
        ArtifactType::Call => ("Call", "calls"),
        ArtifactType::Task => ("Task", "tasks"),
        ArtifactType::Other => ("Activity", "activities"),
    }
}

/// Describes an event from its most content-rich member.
fn describe(artifact_type: ArtifactType, members: &[&Artifact]) -> String {
    let (singular, plural) = type_label(artifact_type);
    let label = match members.len() {
        1 => singular.to_string(),
        n => format!("{n} {plural}"),
    };

    let richness = |artifact: &Artifact| {
        (
            artifact.content_text().map_or(0, |c| c.chars().count()),
            artifact.title().map_or(0, |t| t.chars().count()),
        )
    };
    // Strictly greater keeps the earliest member on ties.
    let mut richest: Option<(&Artifact, (usize, usize))> = None;
    for &artifact in members {
        let score = richness(artifact);
        if richest.is_none_or(|(_, best)| score > best) {
            richest = Some((artifact, score));
        }
    }

    let detail = richest
        .filter(|(_, score)| *score != (0, 0))
        .and_then(|(artifact, _)| artifact.title().or_else(|| artifact.content_text()))
        .map(snippet);

    match detail {
        Some(detail) => format!("{label}: {detail}"),
        None => label,
    }
}

fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= DETAIL_MAX_CHARS {
        line.to_string()
    } else {
        let truncated: String = line.chars().take(DETAIL_MAX_CHARS).collect();
        format!("{}...", truncated.trim_end())
    }
}

/// Clamps event durations so no UTC day exceeds 24 hours.
///
/// An event's minutes are charged to each UTC day it overlaps. The event is
/// truncated at the first day whose budget runs out.
fn apply_daily_cap(timeline: &mut [TimelineEvent]) {
    let mut used: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for event in timeline {
        let requested = event.duration_minutes;
        let mut cursor = event.timestamp;
        let mut to_place = requested;
        let mut allowed = 0;

        while to_place > 0 {
            let day = cursor.date_naive();
            let segment = next_midnight(cursor)
                .and_then(|midnight| u32::try_from((midnight - cursor).num_minutes()).ok())
                .map_or(to_place, |until_midnight| to_place.min(until_midnight));
            let day_used = used.entry(day).or_insert(0);
            let take = segment.min(MINUTES_PER_DAY.saturating_sub(*day_used));
            *day_used += take;
            allowed += take;

            if take < segment {
                tracing::warn!(
                    date = %day,
                    requested,
                    allowed,
                    "clamping event to keep day within 24 hours"
                );
                event.duration_minutes = allowed;
                event.capped = true;
                break;
            }
            to_place -= segment;
            match next_midnight(cursor) {
                Some(midnight) => cursor = midnight,
                None => break,
            }
        }
    }
}

fn next_midnight(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    at.date_naive()
        .succ_opt()
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
}

/// A half-open activity interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Minutes of the window covered by the union of event intervals.
fn covered_minutes(timeline: &[TimelineEvent], start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let mut intervals: Vec<Interval> = timeline
        .iter()
        .map(|event| Interval {
            start: event.timestamp.max(start),
            end: event.end().min(end),
        })
        .filter(|interval| interval.end > interval.start)
        .collect();
    intervals.sort_by_key(|interval| interval.start);

    let mut merged: Vec<Interval> = Vec::new();
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => last.end = last.end.max(interval.end),
            _ => merged.push(interval),
        }
    }

    merged
        .iter()
        .map(|interval| (interval.end - interval.start).num_minutes())
        .sum()
}

#[expect(
    clippy::cast_precision_loss,
    reason = "minute counts within a reconstruction window are far below 2^52"
)]
fn coverage_percentage(timeline: &[TimelineEvent], start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let total = (end - start).num_minutes();
    if total <= 0 {
        return 0.0;
    }
    let covered = covered_minutes(timeline, start, end) as f64;
    let percentage = (covered / total as f64 * 100.0).min(100.0);
    (percentage * 10.0).round() / 10.0
}

fn quiet_periods(timeline: &[TimelineEvent], threshold: Duration) -> Vec<QuietPeriod> {
    let mut periods = Vec::new();
    let mut busy_until: Option<DateTime<Utc>> = None;

    for event in timeline {
        if let Some(previous_end) = busy_until {
            let gap = event.timestamp - previous_end;
            if gap >= threshold {
                periods.push(QuietPeriod {
                    start: previous_end,
                    end: event.timestamp,
                    minutes: gap.num_minutes(),
                });
            }
        }
        let event_end = event.end();
        busy_until = Some(busy_until.map_or(event_end, |until| until.max(event_end)));
    }

    periods
}
