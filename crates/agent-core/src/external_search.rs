//! Parallel fan-out of independent web-search queries.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::AgentError;

/// Organic results shown per query in the report.
pub const HITS_PER_QUERY: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// An outbound web-search API. Each call is an independent network request.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AgentError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub query: String,
    pub hits: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Reads `query` (split on `;`) or a `queries` array. Blank entries are
/// dropped and at most `max` queries are kept.
pub fn split_queries(args: &serde_json::Map<String, Value>, max: usize) -> Vec<String> {
    let mut queries: Vec<String> = match (args.get("queries"), args.get("query")) {
        (Some(Value::Array(items)), _) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|q| q.trim().to_string())
            .collect(),
        (_, Some(Value::String(joined))) => {
            joined.split(';').map(|q| q.trim().to_string()).collect()
        }
        _ => Vec::new(),
    };
    queries.retain(|q| !q.is_empty());
    if queries.len() > max {
        warn!(requested = queries.len(), max, "too many external queries; extra ones dropped");
        queries.truncate(max);
    }
    queries
}

/// Runs every query concurrently. Output order matches `queries`, and a
/// failed query is reported in its slot without affecting the others.
pub async fn fan_out(backend: &dyn SearchBackend, queries: &[String]) -> Vec<QueryOutcome> {
    let calls = queries.iter().map(|query| async move {
        match backend.search(query).await {
            Ok(hits) => {
                debug!(query = %query, hits = hits.len(), "external query finished");
                QueryOutcome {
                    query: query.clone(),
                    hits,
                    error: None,
                }
            }
            Err(err) => {
                warn!(query = %query, error = %err, "external query failed");
                QueryOutcome {
                    query: query.clone(),
                    hits: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    });
    join_all(calls).await
}

pub fn render_report(outcomes: &[QueryOutcome]) -> String {
    let mut report = String::from("=== WEB SEARCH RESULTS ===\n");
    for outcome in outcomes {
        report.push_str(&format!("\nQuery: \"{}\"\n{}\n", outcome.query, "-".repeat(30)));
        if let Some(error) = &outcome.error {
            report.push_str(&format!("Error: {error}\n"));
            continue;
        }
        if outcome.hits.is_empty() {
            report.push_str("No results.\n");
            continue;
        }
        for (idx, hit) in outcome.hits.iter().take(HITS_PER_QUERY).enumerate() {
            report.push_str(&format!(
                "{}. {}\n   URL: {}\n   {}\n\n",
                idx + 1,
                hit.title,
                hit.link,
                hit.snippet
            ));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn semicolon_separated_queries_are_split_and_trimmed() {
        let queries = split_queries(&args(json!({"query": " a ; ;b;c "})), 5);
        assert_eq!(queries, vec!["a", "b", "c"]);
    }

    #[test]
    fn query_list_is_capped() {
        let queries = split_queries(&args(json!({"queries": ["1", "2", "3"]})), 2);
        assert_eq!(queries, vec!["1", "2"]);
    }

    #[test]
    fn report_shows_top_hits_and_errors_per_query() {
        let hit = |n: usize| SearchHit {
            title: format!("t{n}"),
            link: format!("https://r/{n}"),
            snippet: String::new(),
        };
        let outcomes = vec![
            QueryOutcome {
                query: "first".into(),
                hits: (1..=6).map(hit).collect(),
                error: None,
            },
            QueryOutcome {
                query: "second".into(),
                hits: Vec::new(),
                error: Some("HTTP 500".into()),
            },
        ];
        let report = render_report(&outcomes);
        assert!(report.contains("4. t4"));
        assert!(!report.contains("5. t5"));
        assert!(report.contains("Error: HTTP 500"));
        assert!(report.find("first").unwrap() < report.find("second").unwrap());
    }
}
