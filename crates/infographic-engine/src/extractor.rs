use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use infographic_contracts::gallery::{GeneratedImage, InfographicKind, DEFAULT_IMAGE_MIME};
use serde_json::Value;
use tracing::warn;

/// Finds the first inline image in the first candidate and wraps it as a gallery
/// image. `None` means the response held no usable image; that is not an error.
pub fn extract_image(
    response: &Value,
    kind: InfographicKind,
    description: &str,
) -> Option<GeneratedImage> {
    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)?;

    for part in parts {
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        // Only hand out URLs that decode.
        if BASE64.decode(data.as_bytes()).is_err() {
            warn!(%kind, "skipping inline part with invalid base64 payload");
            continue;
        }
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME);
        return Some(GeneratedImage::from_inline(kind, description, mime_type, data));
    }
    None
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::{inline_image_response, text_only_response};

    #[test]
    fn wraps_first_inline_part_as_data_uri() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your infographic" },
                { "inlineData": { "mimeType": "image/jpeg", "data": "AQID" } },
                { "inlineData": { "mimeType": "image/png", "data": "BAUG" } }
            ] } }]
        });
        let image = extract_image(&response, InfographicKind::Horizontal, "Horizontal Color")
            .expect("image");
        assert_eq!(image.url, "data:image/jpeg;base64,AQID");
        assert_eq!(image.kind, InfographicKind::Horizontal);
        assert_eq!(image.description, "Horizontal Color");
        assert!(!image.id.is_empty());
    }

    #[test]
    fn missing_mime_type_defaults_to_png() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "inline_data": { "data": "AQID" } }
            ] } }]
        });
        let image = extract_image(&response, InfographicKind::Vertical, "v").expect("image");
        assert_eq!(image.url, "data:image/png;base64,AQID");
    }

    #[test]
    fn only_first_candidate_is_read() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "no image" }] } },
                { "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": "AQID" } }] } }
            ]
        });
        assert!(extract_image(&response, InfographicKind::Lineart, "l").is_none());
    }

    #[test]
    fn structural_failures_yield_none() {
        for response in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "" } }] } }] }),
            text_only_response(),
            inline_image_response("image/png", "!!not-base64!!"),
        ] {
            assert!(
                extract_image(&response, InfographicKind::Horizontal, "h").is_none(),
                "expected no image for {response}"
            );
        }
    }

    #[test]
    fn extracted_url_decodes_to_original_payload() {
        let payload = BASE64.encode([0u8, 159, 146, 150, 255]);
        let response = inline_image_response("image/webp", &payload);
        let image = extract_image(&response, InfographicKind::Vertical, "v").expect("image");
        let decoded = image.decode().expect("data uri");
        assert_eq!(decoded.mime_type, "image/webp");
        assert_eq!(decoded.bytes, vec![0u8, 159, 146, 150, 255]);
    }
}
