//! Suggested entries for gap days.
//!
//! Same-day artifacts become candidate entries: drafting documents, one
//! aggregated email entry, one entry per calendar event. A gap with no
//! candidates gets exactly one low-confidence fallback entry; a gap is never
//! filled with invented detail. Everything is finalized in estimated mode.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::artifact::{Artifact, ArtifactType};
use crate::compliance::{self, BillingMode, DraftEntry, TimeEntry};
use crate::gaps::Gap;
use crate::policy::PrefillPolicy;
use crate::types::{Confidence, EvidenceKind, MatterId, round_hours};

/// Description of the entry suggested for a gap with no supporting artifacts.
pub const FALLBACK_DESCRIPTION: &str = "General legal work (reconstruction)";

const MAX_HOURS_PER_DAY: f64 = 24.0;

/// Historical work habits, used only to annotate fallback entries.
pub trait WorkPatterns {
    /// A short description of what the user typically does on `date`.
    fn typical_activity(&self, date: NaiveDate) -> Option<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrefillTotals {
    pub total_entries: usize,
    pub total_hours: f64,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefillResult {
    pub entries: Vec<TimeEntry>,
    pub totals: PrefillTotals,
    pub note: String,
}

/// Builds suggested entries for each gap from that day's artifacts.
#[must_use]
pub fn pre_fill_entries(
    gaps: &[Gap],
    artifacts: &[Artifact],
    patterns: Option<&dyn WorkPatterns>,
    policy: &PrefillPolicy,
) -> PrefillResult {
    let mut drafts: Vec<DraftEntry> = Vec::new();

    for gap in gaps {
        let mut day: Vec<&Artifact> = artifacts
            .iter()
            .filter(|artifact| artifact.date() == gap.date)
            .collect();
        day.sort_by_key(|artifact| artifact.timestamp);

        let candidates = day_candidates(gap.date, &day, policy);
        if candidates.is_empty() {
            if gap.gap_hours > 0.0 {
                drafts.push(fallback_entry(gap, patterns));
            }
        } else {
            drafts.extend(candidates);
        }
    }

    let drafts = clamp_daily_hours(drafts);
    let entries = compliance::finalize(drafts, BillingMode::Estimated);
    let totals = totals(&entries);

    tracing::debug!(
        gaps = gaps.len(),
        entries = totals.total_entries,
        hours = totals.total_hours,
        "pre-filled gap entries"
    );

    let mut note = String::from(
        "All entries are estimates reconstructed from evidence and require attorney review \
         before billing.",
    );
    if totals.low > 0 {
        note.push_str(&format!(
            " {} low-confidence entries have no artifact support.",
            totals.low
        ));
    }

    PrefillResult {
        entries,
        totals,
        note,
    }
}

fn day_candidates(date: NaiveDate, day: &[&Artifact], policy: &PrefillPolicy) -> Vec<DraftEntry> {
    let mut drafts = Vec::new();

    for document in day.iter().filter(|a| a.artifact_type == ArtifactType::Document) {
        let Some(kind) = document.document_kind() else {
            continue;
        };
        if !policy.drafting_kinds.contains(&kind) {
            continue;
        }
        let evidence_kind = if document.evidence_kind == EvidenceKind::Direct {
            EvidenceKind::Direct
        } else {
            EvidenceKind::Circumstantial
        };
        let confidence = if evidence_kind == EvidenceKind::Direct {
            Confidence::High
        } else {
            Confidence::Medium
        };
        let description = match document.title() {
            Some(title) => format!("Drafted {kind}: {title}"),
            None => format!("Drafted {kind}"),
        };
        drafts.push(draft(
            date,
            policy.document_hours,
            description,
            &[*document],
            evidence_kind,
            confidence,
        ));
    }

    let emails: Vec<&Artifact> = day
        .iter()
        .copied()
        .filter(|a| a.artifact_type == ArtifactType::Email)
        .collect();
    if !emails.is_empty() {
        #[expect(
            clippy::cast_precision_loss,
            reason = "per-day email counts are far below 2^52"
        )]
        let hours = (policy.email_hours_each * emails.len() as f64).min(policy.email_cap_hours);
        let best = emails
            .iter()
            .map(|a| a.evidence_kind)
            .max()
            .unwrap_or(EvidenceKind::Circumstantial);
        let description = match emails.len() {
            1 => "Email correspondence".to_string(),
            n => format!("Email correspondence ({n} emails)"),
        };
        drafts.push(draft(
            date,
            hours,
            description,
            &emails,
            best,
            Confidence::Medium.min(best.ceiling()),
        ));
    }

    for meeting in day.iter().filter(|a| a.artifact_type == ArtifactType::Calendar) {
        let hours = meeting
            .explicit_duration_minutes()
            .map_or(policy.calendar_default_hours, |minutes| f64::from(minutes) / 60.0);
        let description = match meeting.title() {
            Some(title) => format!("Meeting: {title}"),
            None => "Meeting".to_string(),
        };
        drafts.push(draft(
            date,
            hours,
            description,
            &[*meeting],
            EvidenceKind::Circumstantial,
            Confidence::Medium,
        ));
    }

    drafts
}

fn draft(
    date: NaiveDate,
    hours: f64,
    description: String,
    sources: &[&Artifact],
    evidence_kind: EvidenceKind,
    confidence: Confidence,
) -> DraftEntry {
    let matter_id = sources
        .iter()
        .find_map(|a| a.matter_id())
        .and_then(|id| MatterId::new(id).ok());
    DraftEntry {
        date,
        hours: round_hours(hours),
        description,
        billable: matter_id.is_some(),
        matter_id,
        evidence_kind,
        confidence,
        artifact_ids: sources.iter().map(|a| a.id.clone()).collect(),
        note: None,
    }
}

fn fallback_entry(gap: &Gap, patterns: Option<&dyn WorkPatterns>) -> DraftEntry {
    let mut note = String::from("Unsupported estimate: no artifacts found for this day.");
    if let Some(activity) = patterns.and_then(|p| p.typical_activity(gap.date)) {
        note.push_str(&format!(" Typical activity: {activity}."));
    }
    DraftEntry {
        date: gap.date,
        hours: round_hours(gap.gap_hours),
        description: FALLBACK_DESCRIPTION.to_string(),
        matter_id: None,
        billable: false,
        evidence_kind: EvidenceKind::Pattern,
        confidence: Confidence::Low,
        artifact_ids: Vec::new(),
        note: Some(note),
    }
}

/// Trims entries so no day exceeds 24 hours; entries left with nothing are dropped.
fn clamp_daily_hours(drafts: Vec<DraftEntry>) -> Vec<DraftEntry> {
    let mut used: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut kept = Vec::with_capacity(drafts.len());

    for mut draft in drafts {
        let day_used = used.entry(draft.date).or_insert(0.0);
        let remaining = round_hours((MAX_HOURS_PER_DAY - *day_used).max(0.0));
        if draft.hours > remaining {
            tracing::warn!(
                date = %draft.date,
                requested = draft.hours,
                allowed = remaining,
                "clamping pre-filled entry to keep day within 24 hours"
            );
            if remaining <= 0.0 {
                continue;
            }
            draft.hours = remaining;
            let clamped = "Hours clamped to keep the day within 24 hours.";
            draft.note = Some(match draft.note.take() {
                Some(existing) => format!("{existing} {clamped}"),
                None => clamped.to_string(),
            });
        }
        *day_used += draft.hours;
        kept.push(draft);
    }

    kept
}

fn totals(entries: &[TimeEntry]) -> PrefillTotals {
    let mut totals = PrefillTotals {
        total_entries: entries.len(),
        ..PrefillTotals::default()
    };
    for entry in entries {
        totals.total_hours += entry.hours;
        match entry.confidence {
            Confidence::High => totals.high += 1,
            Confidence::Medium => totals.medium += 1,
            Confidence::Low => totals.low += 1,
        }
    }
    totals.total_hours = round_hours(totals.total_hours);
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ESTIMATE_DISCLAIMER;
    use crate::gaps::GapKind;
    use crate::types::ArtifactId;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap()
    }

    fn gap(hours: f64) -> Gap {
        Gap {
            date: day(),
            kind: GapKind::Missing,
            recorded_hours: 0.0,
            expected_hours: hours,
            gap_hours: hours,
            confidence: Confidence::High,
            entries: 0,
        }
    }

    fn artifact(id: &str, kind: ArtifactType, ts: DateTime<Utc>) -> Artifact {
        Artifact::new(kind, ArtifactId::new(id).unwrap(), ts)
    }

    fn run(gaps: &[Gap], artifacts: &[Artifact]) -> PrefillResult {
        pre_fill_entries(gaps, artifacts, None, &PrefillPolicy::default())
    }

    struct TuesdayHabits;

    impl WorkPatterns for TuesdayHabits {
        fn typical_activity(&self, _date: NaiveDate) -> Option<String> {
            Some("discovery review".to_string())
        }
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "gap hours are copied exactly")]
    fn gap_without_artifacts_gets_single_fallback() {
        let result = run(&[gap(3.0)], &[]);

        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_eq!(entry.description, FALLBACK_DESCRIPTION);
        assert_eq!(entry.hours, 3.0);
        assert_eq!(entry.confidence, Confidence::Low);
        assert_eq!(entry.evidence_kind, EvidenceKind::Pattern);
        assert!(entry.artifact_ids.is_empty());
        assert!(entry.review_required);
        assert_eq!(entry.compliance_warning.as_deref(), Some(ESTIMATE_DISCLAIMER));
        assert!(entry.note.as_deref().unwrap().contains("Unsupported"));
        assert_eq!(result.totals.low, 1);
    }

    #[test]
    fn work_patterns_only_annotate_the_note() {
        let result = pre_fill_entries(
            &[gap(3.0)],
            &[],
            Some(&TuesdayHabits),
            &PrefillPolicy::default(),
        );
        let entry = &result.entries[0];
        assert_eq!(entry.description, FALLBACK_DESCRIPTION);
        assert!(entry.note.as_deref().unwrap().contains("discovery review"));
    }

    #[test]
    fn zero_hour_gap_without_artifacts_gets_nothing() {
        let result = run(&[gap(0.0)], &[]);
        assert!(result.entries.is_empty());
        assert_eq!(result.totals.total_entries, 0);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "policy hours are exact")]
    fn filed_motion_is_high_and_draft_brief_is_medium() {
        let motion = artifact("d1", ArtifactType::Document, at(9))
            .with_metadata(json!({"title": "Motion to Dismiss", "filed": true}))
            .with_evidence(EvidenceKind::Direct);
        let brief = artifact("d2", ArtifactType::Document, at(13))
            .with_metadata(json!({"title": "Appellate brief v3", "draft": true}));

        let result = run(&[gap(8.0)], &[motion, brief]);

        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].hours, 2.0);
        assert_eq!(result.entries[0].confidence, Confidence::High);
        assert_eq!(result.entries[0].evidence_kind, EvidenceKind::Direct);
        assert_eq!(result.entries[0].description, "Drafted motion: Motion to Dismiss");
        assert_eq!(result.entries[1].confidence, Confidence::Medium);
        assert_eq!(result.entries[1].evidence_kind, EvidenceKind::Circumstantial);
        assert_eq!(result.totals.high, 1);
        assert_eq!(result.totals.medium, 1);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "policy hours are exact")]
    fn emails_aggregate_into_one_capped_entry() {
        let emails: Vec<Artifact> = (0..10)
            .map(|i| artifact(&format!("e{i}"), ArtifactType::Email, at(8 + i)))
            .collect();
        let result = run(&[gap(8.0)], &emails);

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].hours, 2.0);
        assert_eq!(result.entries[0].artifact_ids.len(), 10);
        assert_eq!(result.entries[0].confidence, Confidence::Medium);
        assert_eq!(result.entries[0].description, "Email correspondence (10 emails)");
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "durations are exact quarter hours")]
    fn calendar_events_use_their_duration() {
        let meeting = artifact("c1", ArtifactType::Calendar, at(10))
            .with_metadata(json!({"title": "Client meeting", "duration_minutes": 90}));
        let untimed = artifact("c2", ArtifactType::Calendar, at(15));

        let result = run(&[gap(8.0)], &[meeting, untimed]);

        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].hours, 1.5);
        assert_eq!(result.entries[0].description, "Meeting: Client meeting");
        assert_eq!(result.entries[1].hours, 1.0);
        assert_eq!(result.entries[1].evidence_kind, EvidenceKind::Circumstantial);
    }

    #[test]
    fn non_drafting_documents_fall_back() {
        let letter = artifact("d1", ArtifactType::Document, at(9))
            .with_metadata(json!({"title": "Engagement letter"}));
        let result = run(&[gap(2.0)], &[letter]);

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].description, FALLBACK_DESCRIPTION);
    }

    #[test]
    fn artifacts_from_other_days_are_ignored() {
        let other_day = Artifact::new(
            ArtifactType::Email,
            ArtifactId::new("e1").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 16, 9, 0, 0).unwrap(),
        );
        let result = run(&[gap(1.0)], &[other_day]);
        assert_eq!(result.entries[0].description, FALLBACK_DESCRIPTION);
    }

    #[test]
    fn day_never_exceeds_24_hours() {
        let motions: Vec<Artifact> = (0..13)
            .map(|i| {
                artifact(&format!("d{i}"), ArtifactType::Document, at(i))
                    .with_metadata(json!({"title": format!("Motion {i}")}))
            })
            .collect();
        let result = run(&[gap(8.0)], &motions);

        let total: f64 = result.entries.iter().map(|e| e.hours).sum();
        assert!(total <= 24.0 + f64::EPSILON);
        assert_eq!(result.entries.len(), 12);
        assert!((result.totals.total_hours - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn matter_in_metadata_binds_entry() {
        let motion = artifact("d1", ArtifactType::Document, at(9))
            .with_metadata(json!({"title": "Motion in limine", "matter_id": "M-9"}));
        let result = run(&[gap(8.0)], &[motion]);

        assert!(result.entries[0].billable);
        assert_eq!(
            result.entries[0].matter_id.as_ref().map(MatterId::as_str),
            Some("M-9")
        );
    }

    #[test]
    fn every_entry_is_estimated_and_reviewed() {
        let artifacts = vec![
            artifact("e1", ArtifactType::Email, at(9)),
            artifact("c1", ArtifactType::Calendar, at(11)),
        ];
        let result = run(&[gap(8.0), gap(3.0)], &artifacts);
        assert!(!result.entries.is_empty());
        assert!(result.entries.iter().all(|e| e.review_required));
        assert!(result
            .entries
            .iter()
            .all(|e| e.compliance_warning.as_deref() == Some(ESTIMATE_DISCLAIMER)));
    }
}
