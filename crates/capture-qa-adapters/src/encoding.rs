//! Base64 codec for images carried as text.

use base64::Engine as _;
use capture_qa_core::QaError;

/// Decodes Base64 text into raw bytes.
///
/// Surrounding whitespace and a `data:<mime>;base64,` prefix are tolerated.
///
/// # Errors
///
/// Returns [`QaError::Decode`] for empty or malformed input.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, QaError> {
    let trimmed = text.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, data)| data),
        None => trimmed,
    };
    let payload: String = payload.split_whitespace().collect();
    if payload.is_empty() {
        return Err(QaError::Decode("empty base64 payload".into()));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| QaError::Decode(format!("invalid base64: {e}")))
}

/// Encodes bytes as standard Base64 without a data-URL prefix.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
