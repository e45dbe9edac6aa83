//! JSON parsing utilities for LLM responses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{ErrorCode, TomeError, TomeResult};

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"));

static THINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

/// Extract JSON from potentially wrapped response (code blocks, etc.).
pub fn extract_json(text: &str) -> String {
    let text = text.trim();

    if let Some(content) = CODE_BLOCK_RE.captures(text).and_then(|c| c.get(1)) {
        return content.as_str().trim().to_string();
    }

    text.to_string()
}

/// Remove `<think>...</think>` reasoning blocks some models emit.
pub fn remove_think_tags(content: &str) -> String {
    THINK_RE.replace_all(content, "").trim().to_string()
}

/// Parse a structured payload out of raw model output.
pub fn parse_payload<T: DeserializeOwned>(response: &str) -> TomeResult<T> {
    let cleaned = remove_think_tags(response);
    let json_str = extract_json(&cleaned);
    if json_str.is_empty() {
        return Err(TomeError::Parse {
            message: "Empty response payload".to_string(),
            code: ErrorCode::ParseMissingField,
        });
    }

    serde_json::from_str(&json_str).map_err(|e| TomeError::Parse {
        message: format!("Failed to parse response JSON: {}", e),
        code: ErrorCode::ParseInvalidJson,
    })
}
