use indexmap::IndexMap;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

/// Known models in preference order; the first model with a capability is its default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim().trim_start_matches("models/"))
    }

    /// First registered model with `capability`.
    pub fn default_for(&self, capability: &str) -> Option<&ModelSpec> {
        self.models.values().find(|model| model.supports(capability))
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        let model = self.get(name)?;
        if model.supports(capability) {
            return Some(model.clone());
        }
        None
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, provider: &str, capabilities: &[&str]| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
            },
        );
    };

    insert(DEFAULT_TEXT_MODEL, "gemini", &["text", "vision"]);
    insert(DEFAULT_IMAGE_MODEL, "gemini", &["image"]);
    insert("gemini-3-pro-preview", "gemini", &["text", "vision"]);
    insert("gemini-2.5-flash-image", "gemini", &["image"]);
    insert("dryrun-text-1", "dryrun", &["text", "vision"]);
    insert("dryrun-image-1", "dryrun", &["image"]);

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_lead_their_capability() {
        let registry = ModelRegistry::new(None);
        let name = |capability: &str| {
            registry
                .default_for(capability)
                .map(|model| model.name.as_str())
        };
        assert_eq!(name("text"), Some(DEFAULT_TEXT_MODEL));
        assert_eq!(name("image"), Some(DEFAULT_IMAGE_MODEL));
        assert_eq!(name("audio"), None);
    }

    #[test]
    fn lookup_accepts_models_prefix() {
        let registry = ModelRegistry::new(None);
        let spec = registry.get("models/gemini-2.5-flash").map(|spec| spec.provider.as_str());
        assert_eq!(spec, Some("gemini"));
    }

    #[test]
    fn ensure_checks_capability() {
        let registry = ModelRegistry::new(None);
        assert!(registry.ensure("dryrun-image-1", "image").is_some());
        assert!(registry.ensure("dryrun-image-1", "text").is_none());
        assert!(registry.ensure("missing", "image").is_none());
    }
}
