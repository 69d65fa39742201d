use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::model::{ToolCall, ToolResult};

/// Canonical identity of a tool call: resolved tool name plus arguments with
/// sorted keys and trimmed strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn for_call(call: &ToolCall) -> Self {
        let name = call
            .kind()
            .map(|kind| kind.name().to_string())
            .unwrap_or_else(|| call.name.trim().to_ascii_lowercase());
        let args = canonical(&Value::Object(call.args.clone()));
        DedupKey(format!("{name}:{args}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        Value::String(text) => Value::String(text.trim().to_string()),
        other => other.clone(),
    }
}

/// Results already produced within one loop invocation.
#[derive(Debug, Default)]
pub struct DedupCache {
    seen: HashMap<DedupKey, ToolResult>,
    skipped: u32,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &DedupKey) -> Option<&ToolResult> {
        self.seen.get(key)
    }

    pub fn record(&mut self, key: DedupKey, result: ToolResult) {
        self.seen.insert(key, result);
    }

    pub fn note_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
