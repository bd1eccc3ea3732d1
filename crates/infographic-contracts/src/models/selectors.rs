use thiserror::Error;

use super::registry::{ModelRegistry, ModelSpec};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no model registered for capability '{0}'")]
    NoModel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    /// Set when a named model was swapped for the capability default.
    pub fallback_reason: Option<String>,
}

/// Maps the `--text-model` / `--image-model` choice onto a registered model.
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    /// A blank or missing name picks the capability default quietly. An
    /// unknown name, or one lacking the capability, picks it with a reason.
    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, SelectionError> {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());
        if let Some(model) = requested.and_then(|name| self.registry.ensure(name, capability)) {
            return Ok(ModelSelection {
                model,
                fallback_reason: None,
            });
        }

        let model = self
            .registry
            .default_for(capability)
            .cloned()
            .ok_or_else(|| SelectionError::NoModel(capability.to_string()))?;
        let fallback_reason = requested.map(|name| {
            format!(
                "{capability} model '{name}' is not available; using '{}'",
                model.name
            )
        });
        Ok(ModelSelection {
            model,
            fallback_reason,
        })
    }
}
