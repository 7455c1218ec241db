//! Builds the upstream `generateContent` payload from caller input.

use serde::{Deserialize, Serialize};

use crate::chat::history::{ConversationHistory, InlineData, Part};

/// Mime type used when the image prefix does not name one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Request body for the generateContent API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: ConversationHistory,
}

/// Caller input that cannot be turned into an upstream request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Conversation history is required.")]
    EmptyHistory,

    #[error("Invalid base64 image format: expected one ',' separator, found {segments} segments.")]
    MalformedImage { segments: usize },

    #[error("Invalid base64 image format: image data is empty.")]
    EmptyImageData,

    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}

/// Build a transport-ready payload.
///
/// The history is consumed: when `image` is present it is parsed as a
/// `<metadata>,<base64>` data URI and appended as an inline part to the last
/// turn of the returned payload.
pub fn build_generate_request(
    history: ConversationHistory,
    image: Option<&str>,
) -> Result<GenerateRequest, ValidationError> {
    let mut contents = history;

    let Some(last_turn) = contents.last_mut() else {
        return Err(ValidationError::EmptyHistory);
    };

    if let Some(image) = image.filter(|image| !image.is_empty()) {
        let inline_data = parse_image_data_uri(image)?;
        last_turn.parts.push(Part::InlineData { inline_data });
    }

    Ok(GenerateRequest { contents })
}

/// Split a `data:image/png;base64,AAAA`-style string into mime type and data.
pub fn parse_image_data_uri(image: &str) -> Result<InlineData, ValidationError> {
    let segments: Vec<&str> = image.split(',').collect();
    let [metadata, data] = segments.as_slice() else {
        return Err(ValidationError::MalformedImage {
            segments: segments.len(),
        });
    };

    let data = data.trim();
    if data.is_empty() {
        return Err(ValidationError::EmptyImageData);
    }

    Ok(InlineData {
        mime_type: mime_from_metadata(metadata).to_string(),
        data: data.to_string(),
    })
}

fn mime_from_metadata(metadata: &str) -> &str {
    metadata
        .trim()
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .map(str::trim)
        .filter(|mime| mime.contains('/'))
        .unwrap_or(DEFAULT_IMAGE_MIME)
}
