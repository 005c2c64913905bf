//! Artifacts exported to a local JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use wa_core::{Artifact, DateRange};

use crate::{ArtifactFilters, Connector, ConnectorError, matches_keywords, parse_artifacts};

/// Reads artifacts from disk on every call.
///
/// Accepts a JSON array of artifacts or a saved collection with an
/// `artifacts` array.
#[derive(Debug, Clone)]
pub struct JsonFileConnector {
    name: String,
    path: PathBuf,
}

impl JsonFileConnector {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Connector for JsonFileConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_artifacts(
        &self,
        range: &DateRange,
        filters: &ArtifactFilters,
    ) -> Result<Vec<Artifact>, ConnectorError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConnectorError::Io {
                path: self.path.clone(),
                source,
            })?;
        let artifacts = parse_artifacts(&raw)
            .map_err(|err| ConnectorError::Parse(format!("{}: {err}", self.path.display())))?;

        Ok(artifacts
            .into_iter()
            .filter(|artifact| range.contains(artifact.date()))
            .filter(|artifact| matches_keywords(artifact, &filters.keywords))
            .collect())
    }
}
