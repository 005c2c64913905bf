//! Concurrent fan-out over registered connectors.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use wa_core::{Artifact, ArtifactId, DateRange, classify_evidence};

use crate::{ArtifactFilters, Connector, ConnectorError};

/// Per-connector deadline when none is configured.
pub const DEFAULT_CONNECTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a collection run found, plus what went wrong.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Collection {
    /// Filtered, classified, de-duplicated artifacts in timestamp order.
    pub artifacts: Vec<Artifact>,
    /// One message per failed connector, prefixed with its name.
    pub errors: Vec<String>,
    /// Names of the connectors queried, in registration order.
    pub connectors_attempted: Vec<String>,
}

/// Queries every registered connector and merges the results.
pub struct ArtifactCollector {
    connectors: Vec<Arc<dyn Connector>>,
    timeout: Duration,
}

impl fmt::Debug for ArtifactCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.connectors.iter().map(|c| c.name()).collect();
        f.debug_struct("ArtifactCollector")
            .field("connectors", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ArtifactCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
            timeout: DEFAULT_CONNECTOR_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.register(Arc::new(connector));
        self
    }

    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.push(connector);
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Runs every connector concurrently and waits for all of them.
    ///
    /// Connector failures, timeouts and panics are reported in
    /// [`Collection::errors`]; they never abort the run.
    pub async fn collect(&self, range: &DateRange, filters: &ArtifactFilters) -> Collection {
        let handles: Vec<(String, JoinHandle<Result<Vec<Artifact>, ConnectorError>>)> = self
            .connectors
            .iter()
            .map(|connector| {
                let connector = Arc::clone(connector);
                let name = connector.name().to_string();
                let range = *range;
                let filters = filters.clone();
                let limit = self.timeout;
                let handle = tokio::spawn(async move {
                    match tokio::time::timeout(limit, connector.list_artifacts(&range, &filters))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ConnectorError::Timeout(limit)),
                    }
                });
                (name, handle)
            })
            .collect();

        let mut found = Vec::new();
        let mut errors = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(artifacts)) => {
                    tracing::debug!(connector = %name, count = artifacts.len(), "connector returned");
                    found.extend(artifacts);
                }
                Ok(Err(err)) => {
                    tracing::warn!(connector = %name, error = %err, "connector failed");
                    errors.push(format!("{name}: {err}"));
                }
                Err(err) => {
                    tracing::warn!(connector = %name, error = %err, "connector task aborted");
                    errors.push(format!("{name}: connector task failed: {err}"));
                }
            }
        }

        let artifacts = post_process(found, range, filters);
        tracing::debug!(
            artifacts = artifacts.len(),
            errors = errors.len(),
            %range,
            "collection complete"
        );

        Collection {
            artifacts,
            errors,
            connectors_attempted: self
                .connectors
                .iter()
                .map(|connector| connector.name().to_string())
                .collect(),
        }
    }
}

/// Range, draft, document-kind and matter filters, then evidence
/// classification, first-wins de-duplication and a stable timestamp sort.
fn post_process(
    artifacts: Vec<Artifact>,
    range: &DateRange,
    filters: &ArtifactFilters,
) -> Vec<Artifact> {
    let mut seen: HashSet<ArtifactId> = HashSet::new();

    let mut kept: Vec<Artifact> = artifacts
        .into_iter()
        .filter(|artifact| range.contains(artifact.date()))
        .filter(|artifact| filters.include_drafts || !artifact.is_draft())
        .filter(|artifact| {
            filters.document_kinds.is_empty()
                || artifact
                    .document_kind()
                    .is_none_or(|kind| filters.document_kinds.contains(&kind))
        })
        .filter(|artifact| match (&filters.matter_id, artifact.matter_id()) {
            (Some(wanted), Some(filed_under)) => wanted.as_str() == filed_under,
            _ => true,
        })
        .map(|mut artifact| {
            artifact.evidence_kind = classify_evidence(&artifact);
            artifact
        })
        .filter(|artifact| {
            let first = seen.insert(artifact.id.clone());
            if !first {
                tracing::warn!(id = %artifact.id, "dropping duplicate artifact id");
            }
            first
        })
        .collect();

    kept.sort_by_key(|artifact| artifact.timestamp);
    kept
}
