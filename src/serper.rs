//! Google search through the serper.dev proxy API.

use std::time::Duration;

use agent_core::external_search::HITS_PER_QUERY;
use agent_core::{AgentError, SearchBackend, SearchHit};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::SearchSettings;

pub struct SerperBackend {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl SerperBackend {
    pub fn new(endpoint: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, AgentError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::invalid_request("missing search API key"));
        }
        let endpoint = Url::parse(endpoint).map_err(|err| {
            AgentError::invalid_request(format!("invalid search endpoint {endpoint}: {err}"))
        })?;
        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            AgentError::invalid_request(format!("failed to build HTTP client: {err}"))
        })?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// `None` when no API key is configured; external search then reports
    /// itself unavailable per call.
    pub fn from_settings(settings: &SearchSettings) -> Result<Option<Self>, AgentError> {
        match settings.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Self::new(
                &settings.endpoint,
                key,
                Duration::from_millis(settings.timeout_ms),
            )
            .map(Some),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl From<OrganicResult> for SearchHit {
    fn from(result: OrganicResult) -> Self {
        SearchHit {
            title: result.title.unwrap_or_else(|| "N/A".to_string()),
            link: result.link.unwrap_or_else(|| "N/A".to_string()),
            snippet: result.snippet.unwrap_or_default(),
        }
    }
}

fn parse_hits(body: &str) -> Result<Vec<SearchHit>, AgentError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|err| AgentError::upstream(format!("search response invalid: {err}")))?;
    Ok(response
        .organic
        .into_iter()
        .take(HITS_PER_QUERY)
        .map(SearchHit::from)
        .collect())
}

#[async_trait]
impl SearchBackend for SerperBackend {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AgentError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest { q: query })
            .send()
            .await
            .map_err(|err| AgentError::upstream(format!("search request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AgentError::upstream(format!("search response unreadable: {err}")))?;
        if !status.is_success() {
            return Err(AgentError::upstream(format!("search returned {status}: {body}")));
        }
        let hits = parse_hits(&body)?;
        debug!(query = %query, hits = hits.len(), "search API answered");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_results_are_capped_and_defaulted() {
        let body = r#"{"organic":[
            {"title":"A","link":"https://a.test","snippet":"sa"},
            {"link":"https://b.test"},
            {"title":"C","link":"https://c.test"},
            {"title":"D","link":"https://d.test"},
            {"title":"E","link":"https://e.test"}
        ]}"#;
        let hits = parse_hits(body).unwrap();
        assert_eq!(hits.len(), HITS_PER_QUERY);
        assert_eq!(hits[1].title, "N/A");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn missing_organic_block_is_no_results() {
        assert!(parse_hits(r#"{"searchParameters":{"q":"x"}}"#).unwrap().is_empty());
        assert!(matches!(parse_hits("nope"), Err(AgentError::Upstream(_))));
    }

    #[test]
    fn settings_without_key_disable_the_backend() {
        let settings = SearchSettings::default();
        assert!(SerperBackend::from_settings(&settings).unwrap().is_none());

        let settings = SearchSettings {
            endpoint: "not a url".into(),
            api_key: Some("k".into()),
            ..SearchSettings::default()
        };
        assert!(SerperBackend::from_settings(&settings).is_err());
    }
}
