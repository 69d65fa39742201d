use agent_core::EngineConfig;
use serde::{Deserialize, Serialize};

const REDACTED: &str = "***";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Buffered status events per subscriber before it starts lagging.
    pub status_capacity: usize,
    pub engine: EngineConfig,
    pub llm: LlmSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub api_base: String,
    pub model: String,
    /// Tried in order; a 429 moves on to the next key.
    pub api_keys: Vec<String>,
    pub temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Per-query HTTP timeout.
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            status_capacity: 256,
            engine: EngineConfig::default(),
            llm: LlmSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_keys: Vec::new(),
            temperature: 0.7,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://google.serper.dev/search".to_string(),
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Applies `MARKETSCOUT_*` and provider key variables on top of the file.
    ///
    /// `lookup` is `std::env::var` in production; empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let key = ["MARKETSCOUT_LLM_API_KEY", "GEMINI_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|name| read(name));
        if let Some(key) = key {
            self.llm.api_keys.retain(|existing| existing != &key);
            self.llm.api_keys.insert(0, key);
        }
        if let Some(base) = read("MARKETSCOUT_LLM_BASE") {
            self.llm.api_base = base;
        }
        if let Some(model) = read("MARKETSCOUT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = read("SERPER_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(level) = read("MARKETSCOUT_LOG") {
            self.log_level = level;
        }
    }

    /// Copy safe to print: every secret replaced with `***`.
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        copy.llm.api_keys = copy.llm.api_keys.iter().map(|_| REDACTED.to_string()).collect();
        if copy.search.api_key.is_some() {
            copy.search.api_key = Some(REDACTED.to_string());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("engine:\n  max_turns: 4\nlog_format: json\n").unwrap();
        assert_eq!(config.engine.max_turns, 4);
        assert_eq!(config.engine.max_listing_items, 1000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.search.endpoint, "https://google.serper.dev/search");
    }

    #[test]
    fn first_non_empty_key_wins() {
        let mut config = Config::default();
        config.llm.api_keys = vec!["file-key".to_string()];
        config.apply_env_overrides(env(&[
            ("MARKETSCOUT_LLM_API_KEY", "  "),
            ("GEMINI_API_KEY", "gem"),
            ("OPENAI_API_KEY", "oai"),
            ("SERPER_API_KEY", "serp"),
        ]));
        assert_eq!(config.llm.api_keys, vec!["gem".to_string(), "file-key".to_string()]);
        assert_eq!(config.search.api_key.as_deref(), Some("serp"));
    }

    #[test]
    fn redacted_hides_every_secret() {
        let mut config = Config::default();
        config.llm.api_keys = vec!["a".into(), "b".into()];
        config.search.api_key = Some("s".into());
        let shown = serde_yaml::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("- a"));
        assert!(shown.contains("***"));
        assert_eq!(config.llm.api_keys.len(), 2);
    }
}
