//! Artifacts served by a JSON HTTP endpoint.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use wa_core::{Artifact, DateRange};

use crate::{ArtifactFilters, Connector, ConnectorError, parse_artifacts};

/// GETs `url?start=..&end=..&include_drafts=..[&matter_id=..][&keywords=..]`.
///
/// The endpoint answers with a JSON array of artifacts, or an object with an
/// `artifacts` array (the shape `wa collect --json` prints).
pub struct HttpConnector {
    name: String,
    url: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl fmt::Debug for HttpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnector")
            .field("name", &self.name)
            .field("url", &self.url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpConnector {
    /// Creates a connector with a client-level request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client fails to build.
    pub fn new(
        name: impl Into<String>,
        url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let url = Url::parse(url).map_err(|err| ConnectorError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConnectorError::ClientBuild)?;

        Ok(Self::with_client(name, url, token, http))
    }

    /// Creates a connector around a preconfigured client.
    pub fn with_client(
        name: impl Into<String>,
        url: Url,
        token: Option<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            url,
            token: token.filter(|token| !token.trim().is_empty()),
            http,
        }
    }

    fn request_url(&self, range: &DateRange, filters: &ArtifactFilters) -> Url {
        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("start", &range.start().to_string())
                .append_pair("end", &range.end().to_string())
                .append_pair("include_drafts", &filters.include_drafts.to_string());
            if let Some(matter_id) = &filters.matter_id {
                query.append_pair("matter_id", matter_id.as_str());
            }
            if !filters.keywords.is_empty() {
                query.append_pair("keywords", &filters.keywords.join(","));
            }
        }
        url
    }
}

#[async_trait]
impl Connector for HttpConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_artifacts(
        &self,
        range: &DateRange,
        filters: &ArtifactFilters,
    ) -> Result<Vec<Artifact>, ConnectorError> {
        let mut request = self.http.get(self.request_url(range, filters));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ConnectorError::Api {
                message: format!("status {status}: {body}"),
            });
        }

        parse_artifacts(&body).map_err(|err| ConnectorError::Parse(err.to_string()))
    }
}
