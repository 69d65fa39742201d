use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::ToolKind;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub label: String,
    pub description: String,
    pub usage: String,
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    pub output: Option<String>,
    pub example: Option<Value>,
}

impl ToolDescriptor {
    pub fn new(
        kind: ToolKind,
        label: &str,
        description: &str,
        usage: &str,
        required_fields: &[&str],
        optional_fields: &[&str],
        output: Option<&str>,
        example: Option<Value>,
    ) -> Self {
        Self {
            kind,
            label: label.to_string(),
            description: description.to_string(),
            usage: usage.to_string(),
            required_fields: required_fields.iter().map(|s| s.to_string()).collect(),
            optional_fields: optional_fields.iter().map(|s| s.to_string()).collect(),
            output: output.map(|s| s.to_string()),
            example,
        }
    }

    pub fn prompt_block(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "• {} ({}): {}",
            self.kind.name(),
            self.label,
            self.description
        ));
        lines.push(format!("  When to use: {}", self.usage));
        if !self.required_fields.is_empty() {
            lines.push(format!(
                "  Required fields: {}",
                self.required_fields.join(", ")
            ));
        }
        if !self.optional_fields.is_empty() {
            lines.push(format!(
                "  Optional fields: {}",
                self.optional_fields.join(", ")
            ));
        }
        if let Some(output) = &self.output {
            lines.push(format!("  Output: {}", output));
        }
        if let Some(example) = &self.example {
            let call = json!({ "tool": self.kind.name(), "args": example });
            lines.push(format!("  Example: {}", call));
        }
        lines.join("\n")
    }
}

/// The fixed catalog of tools the dispatcher can run.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    entries: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn with_builtin_tools() -> Self {
        Self {
            entries: builtin_descriptors(),
        }
    }

    pub fn get(&self, kind: ToolKind) -> Option<&ToolDescriptor> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    pub fn resolve(&self, name: &str) -> Option<&ToolDescriptor> {
        ToolKind::from_name(name).and_then(|kind| self.get(kind))
    }

    pub fn list(&self) -> &[ToolDescriptor] {
        &self.entries
    }

    pub fn prompt_for_llm(&self) -> String {
        self.entries
            .iter()
            .map(ToolDescriptor::prompt_block)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtin_tools()
    }
}

fn builtin_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            ToolKind::Search,
            "Search",
            "Run a keyword search on the marketplace in the current tab.",
            "Use first, to land on a results page before extracting listings.",
            &["keyword"],
            &[],
            Some("Whether the results page is ready and how many listings were detected."),
            Some(json!({ "keyword": "wireless earbuds" })),
        ),
        ToolDescriptor::new(
            ToolKind::ListExtract,
            "Extract listings",
            "Read the listing cards on the current results page.",
            "Use after a search; call once per results page.",
            &[],
            &["max_items"],
            Some("Up to max_items listings with title, price, rating, sold count and URL."),
            Some(json!({ "max_items": 50 })),
        ),
        ToolDescriptor::new(
            ToolKind::DeepExtractBatch,
            "Deep extract",
            "Open each product URL in its own tab, one at a time, and read the detail page.",
            "Use for a short list of promising products whose details matter.",
            &["urls"],
            &[],
            Some("One report per URL in the given order, plus total and successful counts."),
            Some(json!({ "urls": ["https://shopee.example/item-1", "https://shopee.example/item-2"] })),
        ),
        ToolDescriptor::new(
            ToolKind::ExternalSearch,
            "Web search",
            "Search the open web outside the marketplace.",
            "Use for reviews, specs or price comparisons; separate several queries with ';'.",
            &["query"],
            &[],
            Some("Top results per query: title, URL and snippet."),
            Some(json!({ "query": "earbuds review; earbuds battery life" })),
        ),
    ]
}
