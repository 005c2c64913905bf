//! Terminal transform for every suggested time entry.
//!
//! [`TimeEntry`] is `#[non_exhaustive]` and has no public constructor, so
//! [`finalize`] is the only way to obtain one outside this crate. Estimated
//! entries are stamped with [`ESTIMATE_DISCLAIMER`]; all entries require review.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{ArtifactId, Confidence, EvidenceKind, MatterId};

/// Warning stamped on every entry produced in estimated mode.
pub const ESTIMATE_DISCLAIMER: &str = "TIME ESTIMATE: not compliant with governing billing rules \
     unless converted to verified actual time by the attorney";

/// How the hours of a batch of entries were obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingMode {
    /// Hours were contemporaneously recorded.
    Actual,
    /// Hours were reconstructed from evidence or patterns.
    #[default]
    Estimated,
}

impl BillingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Actual => "actual",
            Self::Estimated => "estimated",
        }
    }
}

impl fmt::Display for BillingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry under construction, before the guard has seen it.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftEntry {
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub matter_id: Option<MatterId>,
    pub billable: bool,
    pub evidence_kind: EvidenceKind,
    pub confidence: Confidence,
    pub artifact_ids: Vec<ArtifactId>,
    pub note: Option<String>,
}

/// A reviewer-facing suggested time entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct TimeEntry {
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matter_id: Option<MatterId>,
    pub billable: bool,
    pub evidence_kind: EvidenceKind,
    pub confidence: Confidence,
    pub artifact_ids: Vec<ArtifactId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Always true: nothing is finalized without human sign-off.
    pub review_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_warning: Option<String>,
}

/// Converts drafts into entries, stamping estimates with the disclaimer.
#[must_use]
pub fn finalize(drafts: Vec<DraftEntry>, mode: BillingMode) -> Vec<TimeEntry> {
    let compliance_warning = match mode {
        BillingMode::Estimated => Some(ESTIMATE_DISCLAIMER.to_string()),
        BillingMode::Actual => None,
    };

    drafts
        .into_iter()
        .map(|draft| TimeEntry {
            date: draft.date,
            hours: draft.hours,
            description: draft.description,
            matter_id: draft.matter_id,
            billable: draft.billable,
            evidence_kind: draft.evidence_kind,
            confidence: draft.confidence,
            artifact_ids: draft.artifact_ids,
            note: draft.note,
            review_required: true,
            compliance_warning: compliance_warning.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(hours: f64) -> DraftEntry {
        DraftEntry {
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            hours,
            description: "Draft motion".to_string(),
            matter_id: None,
            billable: true,
            evidence_kind: EvidenceKind::Direct,
            confidence: Confidence::High,
            artifact_ids: vec![ArtifactId::new("doc_1").unwrap()],
            note: None,
        }
    }

    #[test]
    fn estimated_entries_carry_disclaimer() {
        let entries = finalize(vec![draft(2.0), draft(0.5)], BillingMode::Estimated);
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.compliance_warning.as_deref(), Some(ESTIMATE_DISCLAIMER));
            assert!(entry.review_required);
        }
    }

    #[test]
    fn actual_entries_have_no_warning_but_still_need_review() {
        let entries = finalize(vec![draft(1.0)], BillingMode::Actual);
        assert!(entries[0].compliance_warning.is_none());
        assert!(entries[0].review_required);
    }

    #[test]
    fn finalize_preserves_fields() {
        let entries = finalize(vec![draft(2.0)], BillingMode::Estimated);
        let entry = &entries[0];
        assert_eq!(entry.description, "Draft motion");
        assert_eq!(entry.artifact_ids[0].as_str(), "doc_1");
        assert_eq!(entry.evidence_kind, EvidenceKind::Direct);
    }

    #[test]
    fn serialized_entry_omits_absent_optionals() {
        let entries = finalize(vec![draft(1.25)], BillingMode::Actual);
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert!(json.get("compliance_warning").is_none());
        assert!(json.get("matter_id").is_none());
        assert_eq!(json["confidence"], "high");
        assert_eq!(json["review_required"], true);
    }
}
