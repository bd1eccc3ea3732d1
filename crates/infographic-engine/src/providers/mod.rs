use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use infographic_contracts::content::{ContentPart, ImageConfig};
use reqwest::blocking::Response as HttpResponse;
use serde_json::Value;

mod dryrun;
mod gemini;

pub use dryrun::DryrunProvider;
pub use gemini::{GeminiProvider, DEFAULT_GEMINI_API_BASE};

/// Hosted text-generation capability.
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the model answered without any text.
    fn generate_text(&self, model: &str, parts: &[ContentPart]) -> Result<Option<String>>;
}

/// Hosted image-generation capability. Returns the raw candidate/part response;
/// locating the image inside it is the extractor's job.
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    fn generate_image(&self, model: &str, prompt: &str, config: &ImageConfig) -> Result<Value>;
}

#[derive(Default)]
pub struct ProviderRegistry {
    text: BTreeMap<String, Arc<dyn TextProvider>>,
    image: BTreeMap<String, Arc<dyn ImageProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_text<P: TextProvider + 'static>(&mut self, provider: P) {
        self.text
            .insert(provider.name().to_string(), Arc::new(provider));
    }

    pub fn register_image<P: ImageProvider + 'static>(&mut self, provider: P) {
        self.image
            .insert(provider.name().to_string(), Arc::new(provider));
    }

    pub fn text(&self, name: &str) -> Option<Arc<dyn TextProvider>> {
        self.text.get(name).cloned()
    }

    pub fn image(&self, name: &str) -> Option<Arc<dyn ImageProvider>> {
        self.image.get(name).cloned()
    }
}

pub(crate) fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
