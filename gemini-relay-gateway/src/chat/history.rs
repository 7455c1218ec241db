//! Conversation history in the upstream wire shape.
//!
//! Clients send history already shaped like Gemini `contents`, so the same
//! types are used for the inbound body and the outbound payload.

use serde::{Deserialize, Serialize};

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Inline binary content, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

/// One content unit of a turn.
///
/// Serialized as `{"text": ...}` or `{"inlineData": {...}}`. The snake_case
/// `inline_data` spelling is accepted on input as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    /// Single-text user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// Single-text model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }
}

/// Ordered turns, oldest first.
pub type ConversationHistory = Vec<Turn>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_part_wire_shape() {
        let turn = Turn::user("hello");
        assert_eq!(
            serde_json::to_value(&turn).unwrap(),
            json!({"role": "user", "parts": [{"text": "hello"}]})
        );
    }

    #[test]
    fn test_inline_part_serializes_camel_case() {
        let part = Part::inline("image/png", "AAAA");
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({"inlineData": {"mimeType": "image/png", "data": "AAAA"}})
        );
    }

    #[test]
    fn test_inline_part_accepts_snake_case() {
        let part: Part = serde_json::from_value(json!({
            "inline_data": {"mime_type": "image/jpeg", "data": "BBBB"}
        }))
        .unwrap();
        assert_eq!(part, Part::inline("image/jpeg", "BBBB"));
    }

    #[test]
    fn test_history_from_client_json() {
        let history: ConversationHistory = serde_json::from_value(json!([
            {"role": "user", "parts": [{"text": "How long should I mash?"}]},
            {"role": "model", "parts": [{"text": "About 60 minutes."}]},
            {"role": "user", "parts": [{"text": "And the boil?"}]}
        ]))
        .unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[1], Turn::model("About 60 minutes."));
        assert_eq!(history[2].role, Role::User);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result: Result<Turn, _> =
            serde_json::from_value(json!({"role": "system", "parts": []}));
        assert!(result.is_err());
    }
}
