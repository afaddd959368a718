//! Tool-call extraction from model replies
//!
//! A tool call is a JSON object with a `tool` key and an optional `arguments`
//! object, either bare or inside a code fence.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::tools::{ToolArguments, ToolCall};

/// Find a tool call in `content`, if any
pub fn parse_tool_call(content: &str) -> Option<ToolCall> {
    static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"```(?:json|JSON)?\s*\n?([\s\S]*?)\n?```").expect("valid fence regex")
    });

    let fenced = CODE_FENCE_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));

    fenced
        .chain(std::iter::once(content))
        .find_map(|candidate| extract_object(candidate).and_then(|obj| to_tool_call(&obj)))
}

/// First balanced `{...}` in `input` that parses as JSON
fn extract_object(input: &str) -> Option<Value> {
    let mut search_from = 0;
    while let Some(offset) = input[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(&input[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(&input[start..start + end]) {
                if value.get("tool").is_some() {
                    return Some(value);
                }
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced object starting at the first character
fn matching_brace(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in input.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn to_tool_call(value: &Value) -> Option<ToolCall> {
    let tool_name = value.get("tool")?.as_str()?.trim();
    if tool_name.is_empty() {
        return None;
    }

    let mut arguments = ToolArguments::new();
    if let Some(Value::Object(map)) = value.get("arguments") {
        for (key, v) in map {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            arguments.insert(key.clone(), text);
        }
    }

    Some(ToolCall {
        tool_name: tool_name.to_string(),
        arguments,
    })
}
