use std::time::Duration;

use anyhow::{Context, Result};
use infographic_contracts::content::{ContentPart, ImageConfig};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use tracing::debug;

use super::{response_json_or_error, ImageProvider, TextProvider};
use crate::credentials::ApiKey;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// `generateContent` client for both the text and the image model.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_base: String,
    api_key: ApiKey,
    http: HttpClient,
}

impl GeminiProvider {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(api_key: ApiKey, api_base: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let api_base = api_base
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base,
            api_key,
            http,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn post(&self, model: &str, payload: &Value) -> Result<Value> {
        let endpoint = self.endpoint_for_model(model);
        debug!(%endpoint, "gemini generateContent");
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.expose())])
            .json(payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error("Gemini", response)
    }
}

pub(crate) fn text_payload(parts: &[ContentPart]) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": parts,
        }],
    })
}

pub(crate) fn image_payload(prompt: &str, config: &ImageConfig) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }],
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": config,
        },
    })
}

/// Concatenated text of the first candidate, skipping thought parts.
pub(crate) fn extract_response_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)?;
    let mut text = String::new();
    let mut found = false;
    for part in parts {
        if part.get("thought").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        if let Some(chunk) = part.get("text").and_then(Value::as_str) {
            text.push_str(chunk);
            found = true;
        }
    }
    found.then_some(text)
}

impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_text(&self, model: &str, parts: &[ContentPart]) -> Result<Option<String>> {
        let response = self.post(model, &text_payload(parts))?;
        Ok(extract_response_text(&response))
    }
}

impl ImageProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_image(&self, model: &str, prompt: &str, config: &ImageConfig) -> Result<Value> {
        self.post(model, &image_payload(prompt, config))
    }
}

#[cfg(test)]
mod tests {
    use infographic_contracts::content::{ContentPart, ImageConfig, InlineData};
    use serde_json::json;

    use super::*;

    fn provider(api_base: Option<&str>) -> GeminiProvider {
        let key = ApiKey::new("test-key").unwrap();
        GeminiProvider::new(key, api_base, None).unwrap()
    }

    #[test]
    fn endpoint_prefixes_models_path_once() {
        let gemini = provider(Some("https://proxy.example/v1beta/"));
        assert_eq!(gemini.api_base(), "https://proxy.example/v1beta");
        assert_eq!(
            gemini.endpoint_for_model("gemini-2.5-flash"),
            "https://proxy.example/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            gemini.endpoint_for_model("models/gemini-3-pro-image-preview"),
            "https://proxy.example/v1beta/models/gemini-3-pro-image-preview:generateContent"
        );
    }

    #[test]
    fn blank_api_base_uses_default() {
        assert_eq!(provider(Some("  ")).api_base(), DEFAULT_GEMINI_API_BASE);
        assert_eq!(provider(None).api_base(), DEFAULT_GEMINI_API_BASE);
    }

    #[test]
    fn text_payload_keeps_part_order() {
        let payload = text_payload(&[
            ContentPart::text("instructions"),
            ContentPart::inline(InlineData {
                mime_type: "image/png".to_string(),
                data: "AA==".to_string(),
            }),
        ]);
        assert_eq!(payload["contents"][0]["role"], json!("user"));
        assert_eq!(
            payload["contents"][0]["parts"],
            json!([
                { "text": "instructions" },
                { "inlineData": { "mimeType": "image/png", "data": "AA==" } }
            ])
        );
        assert!(payload.get("generationConfig").is_none());
    }

    #[test]
    fn image_payload_carries_image_config() {
        let payload = image_payload("draw", &ImageConfig::new("3:4"));
        assert_eq!(
            payload["generationConfig"]["imageConfig"],
            json!({ "aspectRatio": "3:4", "imageSize": "2K" })
        );
        assert_eq!(payload["contents"][0]["parts"][0]["text"], json!("draw"));
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [
                    { "text": "thinking", "thought": true },
                    { "text": "- one\n" },
                    { "text": "- two" }
                ] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(
            extract_response_text(&response).as_deref(),
            Some("- one\n- two")
        );
    }

    #[test]
    fn response_without_text_yields_none() {
        assert_eq!(extract_response_text(&json!({})), None);
        assert_eq!(extract_response_text(&json!({ "candidates": [] })), None);
        let image_only = json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "AA==" } }
            ] } }]
        });
        assert_eq!(extract_response_text(&image_only), None);
    }
}
