use std::env;
use std::fmt;

/// Environment variables checked for a Gemini key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Credential for the hosted models. Supplied at startup and handed to the
/// provider; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        API_KEY_ENV_VARS
            .iter()
            .find_map(|key| lookup(key).and_then(Self::new))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Host-style capability check: is a usable key already configured?
pub fn has_api_key() -> bool {
    ApiKey::from_env().is_some()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::ApiKey;

    #[test]
    fn blank_keys_are_rejected() {
        assert!(ApiKey::new("   ").is_none());
        assert_eq!(ApiKey::new(" abc \n").map(|k| k.expose().to_string()), Some("abc".to_string()));
    }

    #[test]
    fn lookup_prefers_gemini_variable() {
        let vars = HashMap::from([
            ("GEMINI_API_KEY", "gemini-key"),
            ("GOOGLE_API_KEY", "google-key"),
        ]);
        let key = ApiKey::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(key.as_ref().map(ApiKey::expose), Some("gemini-key"));
    }

    #[test]
    fn lookup_skips_empty_values() {
        let vars = HashMap::from([("GEMINI_API_KEY", ""), ("GOOGLE_API_KEY", "google-key")]);
        let key = ApiKey::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(key.as_ref().map(ApiKey::expose), Some("google-key"));
        assert!(ApiKey::from_lookup(|_| None).is_none());
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = ApiKey::new("secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }
}
