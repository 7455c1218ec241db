//! Pulls reply text out of a generateContent response body.
//!
//! Works on raw JSON so that partial or unexpected shapes never fail to
//! deserialize; a missing level simply yields no text.

use serde_json::Value;

/// Reply used when the upstream answered without any text.
pub const FALLBACK_REPLY: &str = "Sorry, I was unable to generate a response.";

/// Text of `candidates[0].content.parts[0].text`, if present and not blank.
pub fn first_text(body: &Value) -> Option<String> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Like [`first_text`] but never fails: falls back to [`FALLBACK_REPLY`].
pub fn reply_or_fallback(body: &Value) -> String {
    first_text(body).unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

/// `error.message` of an upstream error body, for diagnostics only.
pub fn upstream_error_message(body: &Value) -> Option<String> {
    body.get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
