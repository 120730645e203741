//! Decoding helpers for LLM collaborator output.
//!
//! Models frequently wrap JSON in Markdown code fences even when told not
//! to. Fence stripping is response *framing* and always applied; after that
//! the payload must decode strictly against the expected schema — a unit
//! that fails to decode is treated as empty by the caller, never patched up.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

use leadscout_shared::{LeadscoutError, Result};

fn opening_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[a-zA-Z]*\n").expect("valid regex"))
}

fn closing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n```\s*$").expect("valid regex"))
}

/// Strip a surrounding Markdown code fence (```json ... ```), if present.
pub fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = opening_fence().replace(trimmed, "");
    let without_close = closing_fence().replace(&without_open, "");
    without_close.trim().to_string()
}

/// Strip fences and strictly decode the payload into `T`.
pub fn decode_payload<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let cleaned = strip_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| {
        let preview: String = cleaned.chars().take(200).collect();
        LeadscoutError::parse(format!(
            "collaborator payload did not match schema: {e} (first 200 chars: {preview})"
        ))
    })
}
