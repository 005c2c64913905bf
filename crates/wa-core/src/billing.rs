//! Billability classification of reconstructed events.
//!
//! Priority order:
//! 1. An explicit matter binding in the context makes everything billable
//! 2. An indicator term in any member's content or metadata values
//! 3. Otherwise non-billable
//!
//! The default is deny: absent evidence of client work, time is not billed.

use serde::{Deserialize, Serialize};

use crate::compliance::{self, BillingMode, DraftEntry, TimeEntry};
use crate::policy::BillablePolicy;
use crate::timeline::{ReconstructionContext, TimelineEvent};
use crate::types::round_hours;

/// Why an event was or was not classified billable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum BillableReason {
    /// The caller bound the window to a matter.
    MatterBinding,
    /// A member artifact mentions an indicator term.
    Keyword { term: String },
    /// No evidence of client work.
    DefaultDeny,
}

impl BillableReason {
    #[must_use]
    pub const fn is_billable(&self) -> bool {
        !matches!(self, Self::DefaultDeny)
    }

    fn note(&self) -> String {
        match self {
            Self::MatterBinding => "Billable: window bound to matter".to_string(),
            Self::Keyword { term } => format!("Billable: evidence mentions \"{term}\""),
            Self::DefaultDeny => {
                "Non-billable by default: no matter binding or client indicator found".to_string()
            }
        }
    }
}

/// A timeline event with its billing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillableEvent {
    pub event: TimelineEvent,
    pub billable: bool,
    pub reason: BillableReason,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillableClassification {
    pub events: Vec<BillableEvent>,
    pub billable_hours: f64,
    pub non_billable_hours: f64,
}

/// Classifies each event as billable or not.
#[must_use]
pub fn classify_events(
    events: &[TimelineEvent],
    context: &ReconstructionContext,
    policy: &BillablePolicy,
) -> BillableClassification {
    let keywords: Vec<(String, String)> = policy
        .keywords
        .iter()
        .filter(|term| !term.trim().is_empty())
        .map(|term| (term.clone(), term.to_lowercase()))
        .collect();

    let mut billable_hours = 0.0;
    let mut non_billable_hours = 0.0;

    let events: Vec<BillableEvent> = events
        .iter()
        .map(|event| {
            let reason = if context.matter_id.is_some() {
                BillableReason::MatterBinding
            } else if let Some(term) = matched_keyword(event, &keywords) {
                BillableReason::Keyword { term }
            } else {
                BillableReason::DefaultDeny
            };
            let billable = reason.is_billable();
            let hours = event.hours();
            if billable {
                billable_hours += hours;
            } else {
                non_billable_hours += hours;
            }
            BillableEvent {
                event: event.clone(),
                billable,
                reason,
                hours: round_hours(hours),
            }
        })
        .collect();

    tracing::debug!(
        events = events.len(),
        billable_hours,
        non_billable_hours,
        "classified events"
    );

    BillableClassification {
        events,
        billable_hours: round_hours(billable_hours),
        non_billable_hours: round_hours(non_billable_hours),
    }
}

/// First policy term found in any member's content or metadata string values.
fn matched_keyword(event: &TimelineEvent, keywords: &[(String, String)]) -> Option<String> {
    let haystacks: Vec<String> = event
        .artifacts
        .iter()
        .flat_map(|artifact| artifact.text_values())
        .map(str::to_lowercase)
        .collect();

    keywords
        .iter()
        .find(|(_, lower)| haystacks.iter().any(|text| text.contains(lower.as_str())))
        .map(|(term, _)| term.clone())
}

/// Converts classified events into suggested time entries.
///
/// Reconstructed hours are always estimates, so entries pass through
/// [`compliance::finalize`] in [`BillingMode::Estimated`].
#[must_use]
pub fn time_entries(
    classification: &BillableClassification,
    context: &ReconstructionContext,
) -> Vec<TimeEntry> {
    let drafts = classification
        .events
        .iter()
        .map(|classified| {
            let event = &classified.event;
            DraftEntry {
                date: event.date(),
                hours: classified.hours,
                description: event.description.clone(),
                matter_id: context.matter_id.clone(),
                billable: classified.billable,
                evidence_kind: event.best_evidence(),
                confidence: event.confidence,
                artifact_ids: event.artifacts.iter().map(|a| a.id.clone()).collect(),
                note: Some(classified.reason.note()),
            }
        })
        .collect();

    compliance::finalize(drafts, BillingMode::Estimated)
}
