//! Tool call and result types shared by the dispatcher, the loop and the guardrail.

use std::fmt;

use page_agent::PageError;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// A `{name, args}` instruction, either structured or decoded from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    /// Builds a call; non-object `args` become an empty map.
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn kind(&self) -> Option<ToolKind> {
        ToolKind::from_name(&self.name)
    }

    /// Non-empty trimmed string argument.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, Value::Object(self.args.clone()))
    }
}

/// The fixed set of registered tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Search,
    ListExtract,
    DeepExtractBatch,
    ExternalSearch,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Search,
        ToolKind::ListExtract,
        ToolKind::DeepExtractBatch,
        ToolKind::ExternalSearch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Search => "search",
            ToolKind::ListExtract => "list_extract",
            ToolKind::DeepExtractBatch => "deep_extract_batch",
            ToolKind::ExternalSearch => "external_search",
        }
    }

    /// Resolves canonical names and the legacy extension names
    /// (`search_shopee`, `scrape_listings`, `deep_scrape_urls`, `serper_search`).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "search" | "search_shopee" => Some(ToolKind::Search),
            "list_extract" | "scrape_listings" => Some(ToolKind::ListExtract),
            "deep_extract_batch" | "deep_scrape_urls" => Some(ToolKind::DeepExtractBatch),
            "external_search" | "serper_search" => Some(ToolKind::ExternalSearch),
            _ => None,
        }
    }

    /// Whether the tool drives the shared browsing surface.
    pub fn needs_page(self) -> bool {
        !matches!(self, ToolKind::ExternalSearch)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArguments,
    UnknownTool,
    AgentUnresponsive,
    NavigationTimeout,
    EmptyResult,
    ContentNotFoundSoft,
    PerTargetFailure,
    ExtractionFailed,
    PageUnavailable,
    Upstream,
    LimitReached,
    ParseFailure,
    MaxTurnsExceeded,
    Cancelled,
}

impl ErrorKind {
    /// Classifies a page failure reported for one tool call or one target.
    pub fn for_page_error(err: &PageError) -> Self {
        match err {
            PageError::AgentUnresponsive { .. } => ErrorKind::AgentUnresponsive,
            PageError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            PageError::Unavailable(_) => ErrorKind::PageUnavailable,
            PageError::Extraction(_) => ErrorKind::ExtractionFailed,
            PageError::NotYetLoaded | PageError::Channel(_) | PageError::ContextClosed(_) => {
                ErrorKind::PerTargetFailure
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Successful tool output: a report for the model plus structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolData {
    pub report: String,
    #[serde(default)]
    pub payload: Value,
}

impl ToolData {
    pub fn new(report: impl Into<String>, payload: Value) -> Self {
        Self {
            report: report.into(),
            payload,
        }
    }
}

/// Outcome of one tool call. Always renderable back into a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Ok {
        data: ToolData,
    },
    Err {
        error: ErrorKind,
        detail: String,
    },
    /// Synthetic, success-shaped result substituted by the guardrail.
    LimitReached {
        detail: String,
        last_good: Option<ToolData>,
    },
}

impl ToolResult {
    pub fn ok(report: impl Into<String>, payload: Value) -> Self {
        ToolResult::Ok {
            data: ToolData::new(report, payload),
        }
    }

    pub fn err(error: ErrorKind, detail: impl Into<String>) -> Self {
        ToolResult::Err {
            error,
            detail: detail.into(),
        }
    }

    /// `Ok` and `LimitReached` both let the model keep reasoning.
    pub fn is_success_shaped(&self) -> bool {
        !matches!(self, ToolResult::Err { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ToolResult::Ok { .. } => None,
            ToolResult::Err { error, .. } => Some(*error),
            ToolResult::LimitReached { .. } => Some(ErrorKind::LimitReached),
        }
    }

    pub fn data(&self) -> Option<&ToolData> {
        match self {
            ToolResult::Ok { data } => Some(data),
            ToolResult::LimitReached { last_good, .. } => last_good.as_ref(),
            ToolResult::Err { .. } => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ToolResult::Ok { data } => json!({ "ok": true, "data": data }),
            ToolResult::Err { error, detail } => {
                json!({ "ok": false, "error": error, "detail": detail })
            }
            ToolResult::LimitReached { detail, last_good } => json!({
                "ok": true,
                "limitReached": true,
                "detail": detail,
                "data": last_good,
            }),
        }
    }

    /// Text form injected into the next prompt.
    pub fn render(&self) -> String {
        match self {
            ToolResult::Ok { data } => render_data(data),
            ToolResult::Err { error, detail } => format!("Error [{error}]: {detail}"),
            ToolResult::LimitReached { detail, last_good } => match last_good {
                Some(data) => format!(
                    "Tool limit reached: {detail}\nUse the data gathered earlier:\n\n{}",
                    render_data(data)
                ),
                None => format!(
                    "Tool limit reached: {detail}\nNo earlier data is available for this tool."
                ),
            },
        }
    }
}

impl Serialize for ToolResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn render_data(data: &ToolData) -> String {
    if !data.report.trim().is_empty() {
        return data.report.clone();
    }
    serde_json::to_string_pretty(&data.payload).unwrap_or_else(|_| data.payload.to_string())
}

/// One model round trip inside the loop's turn log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub prompt_text: String,
    pub response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_tool_call: Option<ToolCall>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_names_resolve_to_registered_tools() {
        assert_eq!(ToolKind::from_name("search_shopee"), Some(ToolKind::Search));
        assert_eq!(ToolKind::from_name("deep-scrape-urls"), Some(ToolKind::DeepExtractBatch));
        assert_eq!(ToolKind::from_name(" Serper_Search "), Some(ToolKind::ExternalSearch));
        assert_eq!(ToolKind::from_name("checkout"), None);
    }

    #[test]
    fn results_serialize_as_tagged_union() {
        let ok = ToolResult::ok("found 3", json!({"count": 3}));
        assert_eq!(serde_json::to_value(&ok).unwrap()["ok"], true);

        let err = ToolResult::err(ErrorKind::EmptyResult, "no listings");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"], "EmptyResult");
        assert_eq!(err.render(), "Error [EmptyResult]: no listings");
    }

    #[test]
    fn limit_reached_is_success_shaped_and_carries_data() {
        let limited = ToolResult::LimitReached {
            detail: "search used 2/2 times".into(),
            last_good: Some(ToolData::new("earlier results", Value::Null)),
        };
        assert!(limited.is_success_shaped());
        assert_eq!(limited.error_kind(), Some(ErrorKind::LimitReached));
        assert!(limited.render().contains("earlier results"));
    }

    #[test]
    fn str_arg_ignores_blank_values() {
        let call = ToolCall::new("search", json!({"keyword": "  ", "other": "x"}));
        assert_eq!(call.str_arg("keyword"), None);
        assert_eq!(call.str_arg("other"), Some("x"));
    }
}
