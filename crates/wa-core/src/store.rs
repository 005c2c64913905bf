//! Audit trail of reconstructions behind an injected store.
//!
//! Nothing here is global: each [`ReconstructionLog`] owns the store it
//! writes to, so tests and concurrent callers never share hidden state.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::policy::DurationPolicy;
use crate::timeline::{ReconstructError, ReconstructionRequest, ReconstructionResult, reconstruct_timeline};
use crate::types::{Confidence, UserId};

/// One audited reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub aggregate_confidence: Confidence,
    pub event_count: usize,
    pub artifact_count: usize,
    /// The full result as JSON.
    pub result: Value,
}

impl ReconstructionRecord {
    pub fn from_result(
        user_id: Option<UserId>,
        result: &ReconstructionResult,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            user_id,
            period_start: result.period_start,
            period_end: result.period_end,
            aggregate_confidence: result.aggregate_confidence,
            event_count: result.timeline.len(),
            artifact_count: result.evidence.total_artifacts,
            result: serde_json::to_value(result)?,
        })
    }
}

/// Persistence for reconstruction audit records.
pub trait ReconstructionStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn record(&self, record: &ReconstructionRecord) -> Result<(), Self::Error>;

    /// Most recent records first.
    fn recent(&self, limit: usize) -> Result<Vec<ReconstructionRecord>, Self::Error>;
}

/// The in-memory store's lock was poisoned by a panicking writer.
#[derive(Debug, Error)]
#[error("in-memory reconstruction store is poisoned")]
pub struct StorePoisoned;

/// Per-instance, mutex-guarded store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<ReconstructionRecord>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReconstructionStore for InMemoryStore {
    type Error = StorePoisoned;

    fn record(&self, record: &ReconstructionRecord) -> Result<(), Self::Error> {
        self.records
            .lock()
            .map_err(|_| StorePoisoned)?
            .push(record.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ReconstructionRecord>, Self::Error> {
        let records = self.records.lock().map_err(|_| StorePoisoned)?;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Debug, Error)]
pub enum LogError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),
    #[error("failed to serialize reconstruction: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to record reconstruction: {0}")]
    Store(#[source] E),
}

/// Runs reconstructions and records each successful one.
#[derive(Debug)]
pub struct ReconstructionLog<S> {
    store: S,
    policy: DurationPolicy,
}

impl<S: ReconstructionStore> ReconstructionLog<S> {
    pub const fn new(store: S, policy: DurationPolicy) -> Self {
        Self { store, policy }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Reconstructs `request` and writes an audit record.
    ///
    /// Failed reconstructions are not recorded.
    pub fn reconstruct(
        &self,
        user_id: Option<&UserId>,
        request: &ReconstructionRequest,
    ) -> Result<ReconstructionResult, LogError<S::Error>> {
        let result = reconstruct_timeline(request, &self.policy)?;
        let record = ReconstructionRecord::from_result(user_id.cloned(), &result)?;
        self.store.record(&record).map_err(LogError::Store)?;
        tracing::debug!(
            events = record.event_count,
            confidence = %record.aggregate_confidence,
            "recorded reconstruction"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, ArtifactType};
    use crate::timeline::ReconstructionContext;
    use crate::types::ArtifactId;
    use chrono::TimeZone;

    fn request(artifacts: Vec<Artifact>) -> ReconstructionRequest {
        ReconstructionRequest {
            start: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 16, 0, 0, 0).unwrap(),
            context: ReconstructionContext::default(),
            artifacts,
        }
    }

    fn email(id: &str) -> Artifact {
        Artifact::new(
            ArtifactType::Email,
            ArtifactId::new(id).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn successful_reconstruction_is_recorded() {
        let log = ReconstructionLog::new(InMemoryStore::new(), DurationPolicy::default());
        let user = UserId::new("jdoe").unwrap();

        let result = log
            .reconstruct(Some(&user), &request(vec![email("e1"), email("e2")]))
            .unwrap();

        let records = log.store().recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id.as_ref(), Some(&user));
        assert_eq!(records[0].event_count, result.timeline.len());
        assert_eq!(records[0].artifact_count, 2);
        assert_eq!(records[0].result["granularity"], "day");
    }

    #[test]
    fn failed_reconstruction_is_not_recorded() {
        let log = ReconstructionLog::new(InMemoryStore::new(), DurationPolicy::default());
        let err = log.reconstruct(None, &request(vec![])).unwrap_err();

        assert!(matches!(err, LogError::Reconstruct(ReconstructError::NoEvidence { .. })));
        assert!(log.store().recent(10).unwrap().is_empty());
    }

    #[test]
    fn stores_are_independent_and_newest_first() {
        let first = ReconstructionLog::new(InMemoryStore::new(), DurationPolicy::default());
        let second = ReconstructionLog::new(InMemoryStore::new(), DurationPolicy::default());

        first.reconstruct(None, &request(vec![email("a")])).unwrap();
        first
            .reconstruct(None, &request(vec![email("b"), email("c")]))
            .unwrap();

        let records = first.store().recent(1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].artifact_count, 2);
        assert!(second.store().recent(10).unwrap().is_empty());
    }
}
