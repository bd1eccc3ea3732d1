use std::path::Path;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::gallery::InfographicKind;

/// One downloaded gallery card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InfographicKind,
    pub description: String,
    pub mime_type: String,
    /// Relative to the run directory.
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub title: String,
    pub text_model: String,
    pub image_model: String,
    pub state: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub images: Vec<GalleryEntry>,
}

pub fn write_summary(
    path: &Path,
    summary: &RunSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}

pub fn read_summary(path: &Path) -> anyhow::Result<RunSummary> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid run summary {}", path.display()))
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;

    fn sample() -> RunSummary {
        RunSummary {
            run_id: "run-123".to_string(),
            started_at: "2026-02-19T00:00:00+00:00".to_string(),
            finished_at: "2026-02-19T00:01:00+00:00".to_string(),
            title: "Cell Division, Biology Grade 9".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-3-pro-image-preview".to_string(),
            state: "complete".to_string(),
            error: None,
            images: vec![GalleryEntry {
                id: "img-1".to_string(),
                kind: InfographicKind::Vertical,
                description: "Vertical Color (A4)".to_string(),
                mime_type: "image/png".to_string(),
                file: "infographic-vertical.png".to_string(),
            }],
        }
    }

    #[test]
    fn write_summary_generates_expected_payload() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("summary.json");

        let mut extra = Map::new();
        extra.insert("summary_chars".to_string(), json!(120));
        write_summary(&path, &sample(), Some(&extra))?;

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(parsed["run_id"], json!("run-123"));
        assert_eq!(parsed["state"], json!("complete"));
        assert_eq!(parsed["images"][0]["type"], json!("vertical"));
        assert_eq!(parsed["summary_chars"], json!(120));
        assert!(parsed.get("ts").and_then(Value::as_str).is_some());
        Ok(())
    }

    #[test]
    fn read_summary_ignores_extra_keys() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("summary.json");
        write_summary(&path, &sample(), None)?;

        assert_eq!(read_summary(&path)?, sample());
        assert!(read_summary(&temp.path().join("missing.json")).is_err());
        Ok(())
    }
}
