//! Decoding tool calls out of free-text model output.
//!
//! The model is asked to answer with a fenced JSON block
//! `{"tool": "...", "args": {...}}` but nothing enforces it, so every call
//! site goes through [`try_parse_tool_call`], which tries a fenced-block
//! decoder first and then a brace scan over the whole text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::model::ToolCall;

static INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{FEFF}\u{200B}\u{200C}\u{200D}\u{2060}]").unwrap());
static UI_ECHO_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:show thinking|gemini said|copy code|regenerate|edit)[ \t]*:?[ \t]*(?:\n|$)")
        .unwrap()
});
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m) +$").unwrap());
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// One strategy for finding a tool call in raw text.
pub trait ToolCallDecoder {
    fn decode(&self, text: &str) -> Option<ToolCall>;
}

/// Looks inside every ``` fenced block, in order.
pub struct FencedBlockDecoder;

impl ToolCallDecoder for FencedBlockDecoder {
    fn decode(&self, text: &str) -> Option<ToolCall> {
        const FENCE: &str = "```";
        let mut rest = text;
        while let Some(start) = rest.find(FENCE) {
            let after_fence = &rest[start + FENCE.len()..];
            let body = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
            let Some(end) = body.find(FENCE) else {
                return None;
            };
            if let Some(call) = decode_candidate(&body[..end]) {
                return Some(call);
            }
            rest = &body[end + FENCE.len()..];
        }
        None
    }
}

/// Characters the brace scan may visit across all start positions.
const BRACE_SCAN_BUDGET: usize = 1 << 20;

/// Scans for balanced `{...}` spans, ignoring braces inside JSON strings,
/// and returns the first span that decodes as a tool call.
///
/// Only braces followed by a quoted key can open a call, and the total work
/// is capped by [`BRACE_SCAN_BUDGET`], so replies full of stray braces stay
/// linear.
pub struct BraceScanDecoder;

impl ToolCallDecoder for BraceScanDecoder {
    fn decode(&self, text: &str) -> Option<ToolCall> {
        let mut budget = BRACE_SCAN_BUDGET;
        for (start, _) in text.char_indices().filter(|(_, ch)| *ch == '{') {
            let candidate = &text[start..];
            if !opens_keyed_object(candidate) {
                continue;
            }
            match balanced_object(candidate, &mut budget) {
                Scan::Closed(span) => {
                    if let Some(call) = decode_candidate(span) {
                        return Some(call);
                    }
                }
                Scan::Unclosed => {}
                Scan::OutOfBudget => {
                    debug!(len = text.len(), "brace scan budget exhausted");
                    return None;
                }
            }
        }
        None
    }
}

enum Scan<'a> {
    Closed(&'a str),
    Unclosed,
    OutOfBudget,
}

/// `{` followed, after whitespace, by a `"`.
fn opens_keyed_object(text: &str) -> bool {
    text[1..].trim_start().starts_with('"')
}

/// Finds the balanced object starting at the first byte of `text`.
fn balanced_object<'a>(text: &'a str, budget: &mut usize) -> Scan<'a> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if *budget == 0 {
            return Scan::OutOfBudget;
        }
        *budget -= 1;
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                let Some(next) = depth.checked_sub(1) else {
                    return Scan::Unclosed;
                };
                depth = next;
                if depth == 0 {
                    return Scan::Closed(&text[..=idx]);
                }
            }
            _ => {}
        }
    }
    Scan::Unclosed
}

/// A candidate counts only with a non-empty `tool` string and an `args` object.
fn decode_candidate(candidate: &str) -> Option<ToolCall> {
    let value: Value = serde_json::from_str(candidate.trim()).ok()?;
    let object = value.as_object()?;
    let name = object.get("tool")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let args = object.get("args")?.as_object()?.clone();
    Some(ToolCall {
        name: name.to_string(),
        args,
    })
}

/// `None` means the text is a final answer.
pub fn try_parse_tool_call(text: &str) -> Option<ToolCall> {
    let decoders: [&dyn ToolCallDecoder; 2] = [&FencedBlockDecoder, &BraceScanDecoder];
    decoders.iter().find_map(|decoder| decoder.decode(text))
}

/// Removes invisible characters and UI echo lines, collapses runs of
/// spaces and blank lines, and keeps single line breaks.
pub fn clean_response(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\u{00A0}', " ");
    let text = INVISIBLE.replace_all(&text, "");
    let text = UI_ECHO_LINE.replace_all(&text, "");
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = TRAILING_SPACE.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}
