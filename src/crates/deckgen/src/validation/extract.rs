//! Locate the JSON value inside model output.
//!
//! Accepted inputs are bare JSON, or prose surrounding exactly one fenced
//! code block (```json ... ``` or ``` ... ```).

use super::ValidationFailure;
use serde_json::Value;

const FENCE: &str = "```";

/// Parse the structured value out of `raw`.
pub fn extract_structured(raw: &str) -> Result<Value, ValidationFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::parse("empty response", raw));
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| ValidationFailure::parse(format!("invalid JSON: {e}"), raw));
    }

    let block = single_fenced_block(trimmed).map_err(|reason| ValidationFailure::parse(reason, raw))?;
    serde_json::from_str(block)
        .map_err(|e| ValidationFailure::parse(format!("invalid JSON in fenced block: {e}"), raw))
}

fn single_fenced_block(text: &str) -> Result<&str, String> {
    let parts: Vec<&str> = text.split(FENCE).collect();
    let fences = parts.len() - 1;
    if fences == 0 {
        return Err("no JSON value or fenced block found".to_string());
    }
    if fences % 2 != 0 {
        return Err("unterminated fenced block".to_string());
    }
    let blocks = fences / 2;
    if blocks != 1 {
        return Err(format!("expected exactly one fenced block, found {blocks}"));
    }
    Ok(strip_language_tag(parts[1]))
}

fn strip_language_tag(block: &str) -> &str {
    let block = block.trim_start_matches([' ', '\t']);
    match block.split_once('\n') {
        Some((first, rest)) if !first.trim_start().starts_with(['{', '[']) => rest.trim(),
        _ => block.trim(),
    }
}
