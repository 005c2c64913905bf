//! Supporting-evidence trail for a suggested entry.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::artifact::{Artifact, ArtifactType};
use crate::compliance::TimeEntry;
use crate::types::{ArtifactId, Confidence, EvidenceKind};

/// One artifact linked to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceLink {
    pub artifact_id: ArtifactId,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl From<&Artifact> for EvidenceLink {
    fn from(artifact: &Artifact) -> Self {
        Self {
            artifact_id: artifact.id.clone(),
            artifact_type: artifact.artifact_type,
            timestamp: artifact.timestamp,
            title: artifact.title().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub date: NaiveDate,
    pub description: String,
    pub direct: Vec<EvidenceLink>,
    pub circumstantial: Vec<EvidenceLink>,
    pub confidence: Confidence,
    /// Distinct artifact types that support the entry.
    pub sources: BTreeSet<ArtifactType>,
}

/// Links same-day artifacts to `entry`, split by evidence strength.
#[must_use]
pub fn trace_provenance(entry: &TimeEntry, artifacts: &[Artifact]) -> Provenance {
    let mut day: Vec<&Artifact> = artifacts
        .iter()
        .filter(|artifact| artifact.date() == entry.date)
        .collect();
    day.sort_by_key(|artifact| artifact.timestamp);

    let (direct, circumstantial): (Vec<&Artifact>, Vec<&Artifact>) = day
        .into_iter()
        .partition(|artifact| artifact.evidence_kind == EvidenceKind::Direct);

    let confidence = if !direct.is_empty() {
        Confidence::High
    } else if !circumstantial.is_empty() {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    let sources = direct
        .iter()
        .chain(&circumstantial)
        .map(|artifact| artifact.artifact_type)
        .collect();

    Provenance {
        date: entry.date,
        description: entry.description.clone(),
        direct: direct.into_iter().map(EvidenceLink::from).collect(),
        circumstantial: circumstantial.into_iter().map(EvidenceLink::from).collect(),
        confidence,
        sources,
    }
}
