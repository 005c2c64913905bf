//! Timestamped evidence units collected from connectors.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ArtifactId, EvidenceKind};

/// Metadata keys that may carry a human-readable title, in priority order.
const TITLE_KEYS: &[&str] = &["title", "subject", "name"];

/// Boolean metadata flags that mark an artifact as final.
const FINALITY_FLAGS: &[&str] = &["sent", "filed", "completed"];

/// `status` values that mark an artifact as final.
const FINAL_STATUSES: &[&str] = &["sent", "filed", "completed", "done"];

/// The kind of evidence source an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Email,
    Calendar,
    Document,
    Call,
    Task,
    Other,
}

impl ArtifactType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Calendar => "calendar",
            Self::Document => "document",
            Self::Call => "call",
            Self::Task => "task",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document category inferred from a document's title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Motion,
    Brief,
    Letter,
    Email,
    Filing,
    Other,
}

impl DocumentKind {
    /// Infers the category from a file name or title.
    #[must_use]
    pub fn infer(title: &str) -> Self {
        let lower = title.to_lowercase();
        if lower.contains("motion") {
            Self::Motion
        } else if lower.contains("brief") {
            Self::Brief
        } else if lower.contains("letter") || lower.contains("correspondence") {
            Self::Letter
        } else if lower.contains("email") || lower.contains(".eml") {
            Self::Email
        } else if lower.contains("filing") || lower.contains("filed") {
            Self::Filing
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Motion => "motion",
            Self::Brief => "brief",
            Self::Letter => "letter",
            Self::Email => "email",
            Self::Filing => "filing",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped piece of evidence that work occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Evidence source type.
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    /// Unique identifier across all connectors.
    pub id: ArtifactId,
    /// When the artifact was created, sent, or scheduled to start.
    pub timestamp: DateTime<Utc>,
    /// Body text, snippet, or notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Source-specific fields as a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Strength of the evidence. Reassigned by the collector from finality markers.
    #[serde(default)]
    pub evidence_kind: EvidenceKind,
}

impl Artifact {
    /// Creates an artifact with no content or metadata.
    #[must_use]
    pub fn new(artifact_type: ArtifactType, id: ArtifactId, timestamp: DateTime<Utc>) -> Self {
        Self {
            artifact_type,
            id,
            timestamp,
            content: None,
            metadata: None,
            evidence_kind: EvidenceKind::Circumstantial,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn with_evidence(mut self, evidence_kind: EvidenceKind) -> Self {
        self.evidence_kind = evidence_kind;
        self
    }

    /// The UTC calendar day the artifact belongs to.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Non-blank content, if any.
    #[must_use]
    pub fn content_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Looks up a metadata field.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref()?.get(key)
    }

    /// Looks up a string metadata field.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta(key)?.as_str()
    }

    fn meta_flag(&self, key: &str) -> bool {
        self.meta(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// First non-blank title-like metadata field.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        TITLE_KEYS
            .iter()
            .filter_map(|key| self.meta_str(key))
            .map(str::trim)
            .find(|title| !title.is_empty())
    }

    /// Whether the artifact carries anything beyond bare metadata.
    #[must_use]
    pub fn has_substance(&self) -> bool {
        self.content_text().is_some() || self.title().is_some()
    }

    /// Whether the artifact shows a finality marker (sent, filed, completed).
    #[must_use]
    pub fn is_final(&self) -> bool {
        if FINALITY_FLAGS.iter().any(|flag| self.meta_flag(flag)) {
            return true;
        }
        self.meta_str("status")
            .is_some_and(|status| FINAL_STATUSES.contains(&status.to_ascii_lowercase().as_str()))
    }

    /// Whether the artifact is explicitly a draft.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.meta_flag("draft")
            || self
                .meta_str("status")
                .is_some_and(|status| status.eq_ignore_ascii_case("draft"))
    }

    /// Matter the source system filed this artifact under, if any.
    #[must_use]
    pub fn matter_id(&self) -> Option<&str> {
        self.meta_str("matter_id")
    }

    /// Duration the source system states for this artifact.
    ///
    /// Uses `duration_minutes` when present, otherwise `end - timestamp`
    /// when an `end` instant is given. Zero or negative values are ignored.
    #[must_use]
    pub fn explicit_duration_minutes(&self) -> Option<u32> {
        if let Some(minutes) = self.meta("duration_minutes").and_then(Value::as_f64) {
            return minutes_from_f64(minutes);
        }
        let end = self
            .meta_str("end")
            .and_then(|end| DateTime::parse_from_rfc3339(end).ok())?
            .with_timezone(&Utc);
        let minutes = (end - self.timestamp).num_minutes();
        u32::try_from(minutes).ok().filter(|m| *m > 0)
    }

    /// Document category, for document artifacts.
    #[must_use]
    pub fn document_kind(&self) -> Option<DocumentKind> {
        if self.artifact_type != ArtifactType::Document {
            return None;
        }
        if let Some(kind) = self.meta_str("document_type") {
            return Some(DocumentKind::infer(kind));
        }
        Some(DocumentKind::infer(self.title().unwrap_or_default()))
    }

    /// Visits every string value in content and metadata.
    #[must_use]
    pub fn text_values(&self) -> Vec<&str> {
        let mut values = Vec::new();
        if let Some(content) = &self.content {
            values.push(content.as_str());
        }
        if let Some(metadata) = &self.metadata {
            collect_strings(metadata, &mut values);
        }
        values
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is checked finite, positive and bounded before casting"
)]
fn minutes_from_f64(minutes: f64) -> Option<u32> {
    if minutes.is_finite() && minutes > 0.0 && minutes < f64::from(u32::MAX) {
        Some(minutes.round() as u32).filter(|m| *m > 0)
    } else {
        None
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Classifies evidence strength from finality markers.
///
/// Sent, filed or completed artifacts are direct evidence; everything else
/// (drafts, received mail, scheduled meetings) is circumstantial.
#[must_use]
pub fn classify_evidence(artifact: &Artifact) -> EvidenceKind {
    if artifact.is_final() {
        EvidenceKind::Direct
    } else {
        EvidenceKind::Circumstantial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    fn artifact(kind: ArtifactType) -> Artifact {
        Artifact::new(kind, ArtifactId::new("a-1").unwrap(), ts())
    }

    #[test]
    fn artifact_deserializes_with_type_tag() {
        let json = r#"{
            "type": "email",
            "id": "gmail_42",
            "timestamp": "2025-01-15T09:00:00Z",
            "content": "Re: discovery schedule",
            "metadata": {"sent": true, "subject": "Discovery"}
        }"#;
        let parsed: Artifact = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.artifact_type, ArtifactType::Email);
        assert_eq!(parsed.evidence_kind, EvidenceKind::Circumstantial);
        assert_eq!(parsed.title(), Some("Discovery"));
        assert!(parsed.is_final());
    }

    #[test]
    fn artifact_rejects_empty_id() {
        let json = r#"{"type": "task", "id": "", "timestamp": "2025-01-15T09:00:00Z"}"#;
        let result: Result<Artifact, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn classify_evidence_uses_finality_markers() {
        let sent = artifact(ArtifactType::Email).with_metadata(json!({"sent": true}));
        let filed = artifact(ArtifactType::Document).with_metadata(json!({"status": "Filed"}));
        let received = artifact(ArtifactType::Email).with_metadata(json!({"sent": false}));
        let scheduled = artifact(ArtifactType::Calendar).with_metadata(json!({"status": "confirmed"}));

        assert_eq!(classify_evidence(&sent), EvidenceKind::Direct);
        assert_eq!(classify_evidence(&filed), EvidenceKind::Direct);
        assert_eq!(classify_evidence(&received), EvidenceKind::Circumstantial);
        assert_eq!(classify_evidence(&scheduled), EvidenceKind::Circumstantial);
    }

    #[test]
    fn draft_detection() {
        assert!(artifact(ArtifactType::Document).with_metadata(json!({"draft": true})).is_draft());
        assert!(artifact(ArtifactType::Document).with_metadata(json!({"status": "DRAFT"})).is_draft());
        assert!(!artifact(ArtifactType::Document).is_draft());
    }

    #[test]
    fn explicit_duration_prefers_duration_minutes() {
        let a = artifact(ArtifactType::Calendar)
            .with_metadata(json!({"duration_minutes": 45, "end": "2025-01-15T11:00:00Z"}));
        assert_eq!(a.explicit_duration_minutes(), Some(45));
    }

    #[test]
    fn explicit_duration_from_end_instant() {
        let a = artifact(ArtifactType::Calendar).with_metadata(json!({"end": "2025-01-15T10:30:00Z"}));
        assert_eq!(a.explicit_duration_minutes(), Some(90));
    }

    #[test]
    fn explicit_duration_ignores_nonsense() {
        let zero = artifact(ArtifactType::Call).with_metadata(json!({"duration_minutes": 0}));
        let before = artifact(ArtifactType::Calendar).with_metadata(json!({"end": "2025-01-15T08:00:00Z"}));
        assert_eq!(zero.explicit_duration_minutes(), None);
        assert_eq!(before.explicit_duration_minutes(), None);
        assert_eq!(artifact(ArtifactType::Email).explicit_duration_minutes(), None);
    }

    #[test]
    fn document_kind_inferred_from_title() {
        let motion = artifact(ArtifactType::Document)
            .with_metadata(json!({"title": "Motion to Compel Discovery.docx"}));
        let letter = artifact(ArtifactType::Document)
            .with_metadata(json!({"name": "Client correspondence"}));
        assert_eq!(motion.document_kind(), Some(DocumentKind::Motion));
        assert_eq!(letter.document_kind(), Some(DocumentKind::Letter));
        assert_eq!(artifact(ArtifactType::Email).document_kind(), None);
        assert_eq!(artifact(ArtifactType::Document).document_kind(), Some(DocumentKind::Other));
    }

    #[test]
    fn text_values_walks_nested_metadata() {
        let a = artifact(ArtifactType::Email)
            .with_content("hello")
            .with_metadata(json!({"to": ["opposing counsel"], "meta": {"tag": "Brief"}, "n": 3}));
        let values = a.text_values();
        assert!(values.contains(&"hello"));
        assert!(values.contains(&"opposing counsel"));
        assert!(values.contains(&"Brief"));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn blank_content_is_not_substance() {
        let a = artifact(ArtifactType::Other).with_content("   ");
        assert!(a.content_text().is_none());
        assert!(!a.has_substance());
    }
}
