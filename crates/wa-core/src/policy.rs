//! Tunable policy tables.
//!
//! Every duration default, keyword list and threshold the pipeline uses lives
//! here. Defaults reproduce the standard behavior; callers may load overrides
//! from configuration. All tables deserialize with per-field defaults so a
//! partial config section only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactType, DocumentKind};

/// Complete policy for reconstruction, classification, pre-fill and duplicate checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub durations: DurationPolicy,
    pub billable: BillablePolicy,
    pub prefill: PrefillPolicy,
    pub duplicates: DuplicatePolicy,
}

/// Default durations for timeline events whose artifacts state none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationPolicy {
    /// Minutes for a coalesced run of documents. Default: 120.
    pub document_minutes: u32,
    /// Minutes per email. Default: 15.
    pub email_minutes_each: u32,
    /// Cap for a coalesced run of emails. Default: 120.
    pub email_cap_minutes: u32,
    /// Minutes for a calendar event with no stated duration. Default: 60.
    pub calendar_minutes: u32,
    /// Minutes per call. Default: 15.
    pub call_minutes_each: u32,
    /// Minutes for a coalesced run of tasks. Default: 30.
    pub task_minutes: u32,
    /// Minutes for any other artifact run. Default: 30.
    pub other_minutes: u32,
    /// Base gap tolerance for coalescing same-type artifacts, scaled by
    /// granularity. Default: 15.
    pub coalesce_tolerance_minutes: u32,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            document_minutes: 120,
            email_minutes_each: 15,
            email_cap_minutes: 120,
            calendar_minutes: 60,
            call_minutes_each: 15,
            task_minutes: 30,
            other_minutes: 30,
            coalesce_tolerance_minutes: 15,
        }
    }
}

impl DurationPolicy {
    /// Policy duration for a run of `count` artifacts of one type.
    #[must_use]
    pub fn default_minutes(&self, artifact_type: ArtifactType, count: usize) -> u32 {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        match artifact_type {
            ArtifactType::Document => self.document_minutes,
            ArtifactType::Email => self
                .email_minutes_each
                .saturating_mul(count)
                .min(self.email_cap_minutes),
            ArtifactType::Calendar => self.calendar_minutes,
            ArtifactType::Call => self.call_minutes_each.saturating_mul(count),
            ArtifactType::Task => self.task_minutes,
            ArtifactType::Other => self.other_minutes,
        }
    }
}

/// Terms that mark work as billable when no matter is bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillablePolicy {
    /// Case-insensitive indicator terms.
    pub keywords: Vec<String>,
}

impl Default for BillablePolicy {
    fn default() -> Self {
        Self {
            keywords: ["client", "matter", "case", "motion", "brief"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Hour values used when turning gaps and artifacts into suggested entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefillPolicy {
    /// Document categories that count as drafting work.
    pub drafting_kinds: Vec<DocumentKind>,
    /// Hours per drafting document. Default: 2.0.
    pub document_hours: f64,
    /// Hours per email. Default: 0.25.
    pub email_hours_each: f64,
    /// Cap for the aggregated email entry. Default: 2.0.
    pub email_cap_hours: f64,
    /// Hours for a calendar event with no stated duration. Default: 1.0.
    pub calendar_default_hours: f64,
}

impl Default for PrefillPolicy {
    fn default() -> Self {
        Self {
            drafting_kinds: vec![DocumentKind::Motion, DocumentKind::Brief],
            document_hours: 2.0,
            email_hours_each: 0.25,
            email_cap_hours: 2.0,
            calendar_default_hours: 1.0,
        }
    }
}

/// Thresholds for duplicate detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatePolicy {
    /// Similarity at or above which a pair is flagged. Default: 0.8.
    pub similarity_threshold: f64,
    /// Downgrade naturally repeating tasks to warnings. Default: true.
    pub allow_repeated_tasks: bool,
    /// Terms that mark a task as naturally repeating.
    pub repeated_task_keywords: Vec<String>,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            allow_repeated_tasks: true,
            repeated_task_keywords: ["call", "phone", "research", "review", "draft", "email"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_duration_scales_then_caps() {
        let policy = DurationPolicy::default();
        assert_eq!(policy.default_minutes(ArtifactType::Email, 1), 15);
        assert_eq!(policy.default_minutes(ArtifactType::Email, 4), 60);
        assert_eq!(policy.default_minutes(ArtifactType::Email, 20), 120);
    }

    #[test]
    fn fixed_type_durations() {
        let policy = DurationPolicy::default();
        assert_eq!(policy.default_minutes(ArtifactType::Document, 3), 120);
        assert_eq!(policy.default_minutes(ArtifactType::Calendar, 1), 60);
        assert_eq!(policy.default_minutes(ArtifactType::Call, 2), 30);
        assert_eq!(policy.default_minutes(ArtifactType::Other, 5), 30);
    }

    #[test]
    fn partial_policy_keeps_defaults() {
        let policy: Policy =
            serde_json::from_str(r#"{"durations": {"document_minutes": 90}}"#).unwrap();
        assert_eq!(policy.durations.document_minutes, 90);
        assert_eq!(policy.durations.email_cap_minutes, 120);
        assert_eq!(policy.billable, BillablePolicy::default());
        assert_eq!(policy.prefill.drafting_kinds.len(), 2);
    }
}
