//! Duplicate detection between suggested and recorded entries.
//!
//! Similarity is a weighted score in \[0, 1\]:
//! - date: same day +0.4, adjacent day +0.2
//! - description: identical +0.6, containment +0.4, else word overlap × 0.3
//! - hours: (1 − relative difference) × 0.1

use chrono::NaiveDate;
use serde::Serialize;

use crate::compliance::TimeEntry;
use crate::gaps::RecordedEntry;
use crate::policy::DuplicatePolicy;
use crate::types::ValidationError;

const HIGH_RISK: f64 = 0.9;
const MEDIUM_RISK: f64 = 0.8;

/// The fields duplicate detection compares.
#[derive(Debug, Clone, Copy)]
pub struct EntrySketch<'a> {
    pub date: NaiveDate,
    pub hours: f64,
    pub description: &'a str,
}

impl<'a> From<&'a TimeEntry> for EntrySketch<'a> {
    fn from(entry: &'a TimeEntry) -> Self {
        Self {
            date: entry.date,
            hours: entry.hours,
            description: &entry.description,
        }
    }
}

impl<'a> From<&'a RecordedEntry> for EntrySketch<'a> {
    fn from(entry: &'a RecordedEntry) -> Self {
        Self {
            date: entry.date,
            hours: entry.hours,
            description: &entry.description,
        }
    }
}

/// What a candidate was compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "against", content = "index", rename_all = "snake_case")]
pub enum DuplicateTarget {
    /// Index into the recorded entries.
    Existing(usize),
    /// Index of another candidate on the same day.
    Candidate(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateMatch {
    pub candidate_index: usize,
    pub other: DuplicateTarget,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateSummary {
    pub total_candidates: usize,
    pub total_existing: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub potential_duplicates: Vec<DuplicateMatch>,
    /// Similar pairs excused as naturally repeating work (calls, research).
    pub warnings: Vec<DuplicateMatch>,
    pub summary: DuplicateSummary,
}

impl DuplicateReport {
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.potential_duplicates.is_empty()
    }
}

/// Similarity between two entries, in \[0, 1\].
#[must_use]
pub fn similarity(a: EntrySketch<'_>, b: EntrySketch<'_>) -> f64 {
    let mut score = 0.0;

    let days_apart = (a.date - b.date).num_days().abs();
    if days_apart == 0 {
        score += 0.4;
    } else if days_apart == 1 {
        score += 0.2;
    }

    let desc_a = a.description.trim().to_lowercase();
    let desc_b = b.description.trim().to_lowercase();
    if !desc_a.is_empty() && !desc_b.is_empty() {
        if desc_a == desc_b {
            score += 0.6;
        } else if desc_a.contains(&desc_b) || desc_b.contains(&desc_a) {
            score += 0.4;
        } else {
            score += word_overlap(&desc_a, &desc_b) * 0.3;
        }
    }

    if a.hours > 0.0 && b.hours > 0.0 {
        let difference = (a.hours - b.hours).abs() / a.hours.max(b.hours);
        score += (1.0 - difference) * 0.1;
    }

    score.min(1.0)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "description word counts are far below 2^52"
)]
fn word_overlap(a: &str, b: &str) -> f64 {
    let words_a: Vec<&str> = a.split_whitespace().collect();
    let words_b: Vec<&str> = b.split_whitespace().collect();
    let longest = words_a.len().max(words_b.len());
    if longest == 0 {
        return 0.0;
    }
    let common = words_a.iter().filter(|word| words_b.contains(word)).count();
    common as f64 / longest as f64
}

fn is_repeated_task(description: &str, policy: &DuplicatePolicy) -> bool {
    let lower = description.to_lowercase();
    policy
        .repeated_task_keywords
        .iter()
        .any(|keyword| lower.contains(&keyword.to_lowercase()))
}

/// Flags candidates that look like recorded entries or like each other.
///
/// # Errors
///
/// Returns [`ValidationError::OutOfUnitRange`] if the policy threshold is
/// outside \[0, 1\].
pub fn check_duplicates(
    candidates: &[TimeEntry],
    existing: &[RecordedEntry],
    policy: &DuplicatePolicy,
) -> Result<DuplicateReport, ValidationError> {
    let threshold = policy.similarity_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ValidationError::OutOfUnitRange {
            field: "similarity threshold",
            value: threshold,
        });
    }

    let mut potential_duplicates = Vec::new();
    let mut warnings = Vec::new();
    let mut consider = |candidate_index: usize,
                        candidate: EntrySketch<'_>,
                        other: DuplicateTarget,
                        other_sketch: EntrySketch<'_>| {
        let score = similarity(candidate, other_sketch);
        if score < threshold {
            return;
        }
        let pair = DuplicateMatch {
            candidate_index,
            other,
            similarity: score,
        };
        let repeated = policy.allow_repeated_tasks
            && (is_repeated_task(candidate.description, policy)
                || is_repeated_task(other_sketch.description, policy));
        if repeated {
            warnings.push(pair);
        } else {
            potential_duplicates.push(pair);
        }
    };

    for (index, candidate) in candidates.iter().enumerate() {
        for (existing_index, recorded) in existing.iter().enumerate() {
            consider(
                index,
                candidate.into(),
                DuplicateTarget::Existing(existing_index),
                recorded.into(),
            );
        }
    }

    for (index, candidate) in candidates.iter().enumerate() {
        for (other_index, other) in candidates.iter().enumerate().skip(index + 1) {
            if other.date == candidate.date {
                consider(
                    index,
                    candidate.into(),
                    DuplicateTarget::Candidate(other_index),
                    other.into(),
                );
            }
        }
    }

    let summary = DuplicateSummary {
        total_candidates: candidates.len(),
        total_existing: existing.len(),
        high_risk: potential_duplicates
            .iter()
            .filter(|pair| pair.similarity >= HIGH_RISK)
            .count(),
        medium_risk: potential_duplicates
            .iter()
            .filter(|pair| (MEDIUM_RISK..HIGH_RISK).contains(&pair.similarity))
            .count(),
    };

    if !potential_duplicates.is_empty() {
        tracing::warn!(
            duplicates = potential_duplicates.len(),
            high_risk = summary.high_risk,
            "potential duplicate entries"
        );
    }

    Ok(DuplicateReport {
        potential_duplicates,
        warnings,
        summary,
    })
}
