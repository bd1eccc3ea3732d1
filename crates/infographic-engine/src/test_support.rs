use anyhow::Result;
use infographic_contracts::content::{ContentPart, ImageConfig};
use serde_json::{json, Value};

use crate::providers::{ImageProvider, TextProvider};

pub(crate) struct FnTextProvider<F> {
    handler: F,
}

impl<F> FnTextProvider<F>
where
    F: Fn(&str, &[ContentPart]) -> Result<Option<String>> + Send + Sync,
{
    pub(crate) fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> TextProvider for FnTextProvider<F>
where
    F: Fn(&str, &[ContentPart]) -> Result<Option<String>> + Send + Sync,
{
    fn name(&self) -> &str {
        "fake-text"
    }

    fn generate_text(&self, model: &str, parts: &[ContentPart]) -> Result<Option<String>> {
        (self.handler)(model, parts)
    }
}

pub(crate) struct FnImageProvider<F> {
    handler: F,
}

impl<F> FnImageProvider<F>
where
    F: Fn(&str, &ImageConfig) -> Result<Value> + Send + Sync,
{
    pub(crate) fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> ImageProvider for FnImageProvider<F>
where
    F: Fn(&str, &ImageConfig) -> Result<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        "fake-image"
    }

    fn generate_image(&self, _model: &str, prompt: &str, config: &ImageConfig) -> Result<Value> {
        (self.handler)(prompt, config)
    }
}

/// A single-candidate response whose only part is an inline image.
pub(crate) fn inline_image_response(mime_type: &str, base64_data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "inlineData": { "mimeType": mime_type, "data": base64_data } }]
            }
        }]
    })
}

/// A response where the model answered with text only.
pub(crate) fn text_only_response() -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": "I can't draw that." }] }
        }]
    })
}
