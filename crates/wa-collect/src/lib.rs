//! Artifact collection from evidence sources.
//!
//! Connectors fetch artifacts concurrently; a failing or hanging source is
//! reported in [`Collection::errors`] and never blocks the others. Two
//! generic connectors are provided:
//! - [`JsonFileConnector`]: a JSON array of artifacts on disk
//! - [`HttpConnector`]: a JSON endpoint queried by date range

mod collector;
mod file;
mod http;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use wa_core::{Artifact, DateRange, DocumentKind, MatterId};

pub use collector::{ArtifactCollector, Collection, DEFAULT_CONNECTOR_TIMEOUT};
pub use file::JsonFileConnector;
pub use http::HttpConnector;

/// Connector errors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The source answered with an error status.
    #[error("API error: {message}")]
    Api { message: String },
    /// The endpoint URL could not be parsed.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Failed to read a local source.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The source returned something that is not a list of artifacts.
    #[error("invalid artifact data: {0}")]
    Parse(String),
    /// The connector did not answer within its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Narrowing applied to a collection run.
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilters {
    /// Drop artifacts filed under a different matter.
    pub matter_id: Option<MatterId>,
    /// Only keep documents of these kinds. Empty keeps all.
    pub document_kinds: Vec<DocumentKind>,
    pub include_drafts: bool,
    /// Terms a connector may use to narrow its search. Empty matches everything.
    pub keywords: Vec<String>,
}

/// An evidence source.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Lists artifacts dated inside `range`.
    async fn list_artifacts(
        &self,
        range: &DateRange,
        filters: &ArtifactFilters,
    ) -> Result<Vec<Artifact>, ConnectorError>;
}

/// Whether any keyword appears in the artifact's content or metadata values.
pub fn matches_keywords(artifact: &Artifact, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let values: Vec<String> = artifact
        .text_values()
        .into_iter()
        .map(str::to_lowercase)
        .collect();
    keywords.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        values.iter().any(|value| value.contains(&keyword))
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactPayload {
    List(Vec<Artifact>),
    Wrapped { artifacts: Vec<Artifact> },
}

/// Parses a bare artifact array or an object carrying an `artifacts` array.
fn parse_artifacts(body: &str) -> Result<Vec<Artifact>, serde_json::Error> {
    let (ArtifactPayload::List(artifacts) | ArtifactPayload::Wrapped { artifacts }) =
        serde_json::from_str(body)?;
    Ok(artifacts)
}
