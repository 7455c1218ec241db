//! Conversation title generation.
//!
//! Single upstream call through the dispatcher's transport step, no retry.
//! Any failure resolves to [`FALLBACK_TITLE`].

use tracing::{info, warn};

use crate::chat::extract::{first_text, upstream_error_message};
use crate::chat::history::Turn;
use crate::chat::request::GenerateRequest;
use crate::dispatch::Dispatcher;

/// Title used whenever a real one cannot be produced.
pub const FALLBACK_TITLE: &str = "New Conversation";

/// Build the single-turn request asking for a title.
pub fn build_title_request(user_message: &str) -> GenerateRequest {
    let prompt = format!(
        "Create a short title (at most five words) for a conversation that starts with \
         the message below. Answer with the title only.\n\nMessage: {}",
        user_message.trim()
    );
    GenerateRequest {
        contents: vec![Turn::user(prompt)],
    }
}

/// Trim surrounding whitespace and drop literal `"` characters.
///
/// Returns `None` when nothing is left.
pub fn clean_title(raw: &str) -> Option<String> {
    let title: String = raw.chars().filter(|c| *c != '"').collect();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Generate a title for `user_message`, never failing.
pub async fn generate_title(dispatcher: &Dispatcher, user_message: Option<&str>) -> String {
    let Some(user_message) = user_message.filter(|message| !message.trim().is_empty()) else {
        info!("Title requested without a user message, using fallback");
        return FALLBACK_TITLE.to_string();
    };

    let payload = match serde_json::to_value(build_title_request(user_message)) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to serialize title request: {}", e);
            return FALLBACK_TITLE.to_string();
        }
    };

    let response = match dispatcher.send_once(&payload).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Title generation failed: {}", e);
            return FALLBACK_TITLE.to_string();
        }
    };

    if !response.is_success() {
        warn!(
            status = response.status,
            "Title generation failed: {}",
            upstream_error_message(&response.body).unwrap_or_default()
        );
        return FALLBACK_TITLE.to_string();
    }

    match first_text(&response.body).as_deref().and_then(clean_title) {
        Some(title) => title,
        None => {
            warn!("Title generation returned no usable text");
            FALLBACK_TITLE.to_string()
        }
    }
}
