use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use infographic_contracts::models::{ModelSelector, ModelSpec};
use infographic_contracts::request::GenerationRequest;
use tracing::{info, warn};

pub mod analyzer;
pub mod credentials;
pub mod encoder;
pub mod extractor;
pub mod gallery;
pub mod generator;
pub mod pipeline;
pub mod providers;

#[cfg(test)]
pub(crate) mod test_support;

pub use credentials::{has_api_key, ApiKey};
pub use generator::{GenerationOutcome, VariantFailure};
pub use pipeline::{Pipeline, SubmitError};
use providers::{DryrunProvider, GeminiProvider, ImageProvider, ProviderRegistry, TextProvider};

/// Settings resolved from flags and environment before the engine starts.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub api_base: Option<String>,
    /// `None` keeps the transport unbounded.
    pub request_timeout: Option<Duration>,
}

/// The analyze-then-generate service: one text model, one image model and the
/// providers that serve them.
pub struct InfographicEngine {
    text_model: ModelSpec,
    image_model: ModelSpec,
    text_provider: Arc<dyn TextProvider>,
    image_provider: Arc<dyn ImageProvider>,
    fallback_reasons: Vec<String>,
}

impl InfographicEngine {
    pub fn new(config: &EngineConfig, api_key: Option<ApiKey>) -> Result<Self> {
        let selector = ModelSelector::default();
        let text = selector.select(config.text_model.as_deref(), "text")?;
        let image = selector.select(config.image_model.as_deref(), "image")?;
        let fallback_reasons: Vec<String> = [&text.fallback_reason, &image.fallback_reason]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        for reason in &fallback_reasons {
            warn!("{reason}");
        }

        let providers = default_provider_registry(config, api_key)?;
        let text_provider = providers
            .text(&text.model.provider)
            .ok_or_else(|| missing_provider(&text.model))?;
        let image_provider = providers
            .image(&image.model.provider)
            .ok_or_else(|| missing_provider(&image.model))?;
        info!(
            text_model = %text.model.name,
            image_model = %image.model.name,
            "engine ready"
        );

        Ok(Self {
            text_model: text.model,
            image_model: image.model,
            text_provider,
            image_provider,
            fallback_reasons,
        })
    }

    pub fn from_providers(
        text_model: ModelSpec,
        image_model: ModelSpec,
        text_provider: Arc<dyn TextProvider>,
        image_provider: Arc<dyn ImageProvider>,
    ) -> Self {
        Self {
            text_model,
            image_model,
            text_provider,
            image_provider,
            fallback_reasons: Vec::new(),
        }
    }

    pub fn text_model(&self) -> &str {
        &self.text_model.name
    }

    pub fn image_model(&self) -> &str {
        &self.image_model.name
    }

    pub fn fallback_reasons(&self) -> &[String] {
        &self.fallback_reasons
    }

    pub fn analyze_context(&self, request: &GenerationRequest) -> Result<String> {
        analyzer::analyze_context(self.text_provider.as_ref(), &self.text_model.name, request)
    }

    pub fn generate_infographics(
        &self,
        request: &GenerationRequest,
        summary: &str,
    ) -> GenerationOutcome {
        generator::generate_infographics(
            self.image_provider.as_ref(),
            &self.image_model.name,
            request,
            summary,
        )
    }
}

fn default_provider_registry(
    config: &EngineConfig,
    api_key: Option<ApiKey>,
) -> Result<ProviderRegistry> {
    let mut providers = ProviderRegistry::new();
    providers.register_text(DryrunProvider);
    providers.register_image(DryrunProvider);
    if let Some(api_key) = api_key {
        let gemini = GeminiProvider::new(
            api_key,
            config.api_base.as_deref(),
            config.request_timeout,
        )?;
        providers.register_text(gemini.clone());
        providers.register_image(gemini);
    }
    Ok(providers)
}

fn missing_provider(model: &ModelSpec) -> anyhow::Error {
    if model.provider == "gemini" {
        return anyhow!(
            "model '{}' needs an API key: GEMINI_API_KEY or GOOGLE_API_KEY not set",
            model.name
        );
    }
    anyhow!(
        "no provider '{}' registered for model '{}'",
        model.provider,
        model.name
    )
}

/// Flattens an error and its causes into one user-facing line.
pub fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return providers::truncate_text(&err.to_string(), max_chars);
    }
    providers::truncate_text(&parts.join(" | caused by: "), max_chars)
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    fn dryrun_config() -> EngineConfig {
        EngineConfig {
            text_model: Some("dryrun-text-1".to_string()),
            image_model: Some("dryrun-image-1".to_string()),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn dryrun_models_need_no_key() -> anyhow::Result<()> {
        let engine = InfographicEngine::new(&dryrun_config(), None)?;
        assert_eq!(engine.text_model(), "dryrun-text-1");
        assert_eq!(engine.image_model(), "dryrun-image-1");
        assert!(engine.fallback_reasons().is_empty());
        Ok(())
    }

    #[test]
    fn gemini_models_without_key_fail_to_start() {
        let err = InfographicEngine::new(&EngineConfig::default(), None)
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert!(err.contains("GEMINI_API_KEY or GOOGLE_API_KEY not set"), "{err}");
    }

    #[test]
    fn gemini_defaults_with_injected_key() -> anyhow::Result<()> {
        let engine = InfographicEngine::new(&EngineConfig::default(), ApiKey::new("k"))?;
        assert_eq!(engine.text_model(), "gemini-2.5-flash");
        assert_eq!(engine.image_model(), "gemini-3-pro-image-preview");
        Ok(())
    }

    #[test]
    fn unknown_model_falls_back_with_reason() -> anyhow::Result<()> {
        let config = EngineConfig {
            image_model: Some("no-such-model".to_string()),
            ..dryrun_config()
        };
        let engine = InfographicEngine::new(&config, ApiKey::new("k"))?;
        assert_eq!(engine.image_model(), "gemini-3-pro-image-preview");
        assert_eq!(engine.fallback_reasons().len(), 1);
        Ok(())
    }

    #[test]
    fn dryrun_engine_runs_both_stages() -> anyhow::Result<()> {
        let engine = InfographicEngine::new(&dryrun_config(), None)?;
        let request = GenerationRequest::new("Cell Division", "Biology", "Grade 9");
        let summary = engine.analyze_context(&request)?;
        assert!(!summary.is_empty());
        let outcome = engine.generate_infographics(&request, &summary);
        assert_eq!(outcome.images.len(), 3);
        Ok(())
    }

    #[test]
    fn error_chain_text_joins_distinct_causes() {
        let err = Err::<(), _>(anyhow!("connection refused"))
            .context("Gemini request failed")
            .unwrap_err();
        assert_eq!(
            error_chain_text(&err, 200),
            "Gemini request failed | caused by: connection refused"
        );
        assert_eq!(error_chain_text(&err, 6), "Gemini…");
    }
}
