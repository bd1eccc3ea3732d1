use serde::{Deserialize, Serialize};

/// High-resolution size tier requested for every infographic variant.
pub const IMAGE_SIZE_2K: &str = "2K";

/// Binary payload carried inside a request or response part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// Standard (padded) base64.
    pub data: String,
}

/// One segment of a multimodal prompt, serialized in `generateContent` part shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline(inline_data: InlineData) -> Self {
        Self::InlineData { inline_data }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text.as_str()),
            Self::InlineData { .. } => None,
        }
    }

    pub fn as_inline(&self) -> Option<&InlineData> {
        match self {
            Self::Text { .. } => None,
            Self::InlineData { inline_data } => Some(inline_data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

impl ImageConfig {
    pub fn new(aspect_ratio: impl Into<String>) -> Self {
        Self {
            aspect_ratio: aspect_ratio.into(),
            image_size: IMAGE_SIZE_2K.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ContentPart, ImageConfig, InlineData};

    #[test]
    fn parts_serialize_in_generate_content_shape() -> anyhow::Result<()> {
        let parts = vec![
            ContentPart::text("hello"),
            ContentPart::inline(InlineData {
                mime_type: "image/jpeg".to_string(),
                data: "AAAA".to_string(),
            }),
        ];
        assert_eq!(
            serde_json::to_value(&parts)?,
            json!([
                { "text": "hello" },
                { "inlineData": { "mimeType": "image/jpeg", "data": "AAAA" } }
            ])
        );
        Ok(())
    }

    #[test]
    fn inline_part_accepts_snake_case_keys() -> anyhow::Result<()> {
        let part: ContentPart = serde_json::from_value(json!({
            "inline_data": { "mime_type": "image/webp", "data": "QUJD" }
        }))?;
        let inline = part.as_inline().map(|inline| inline.mime_type.as_str());
        assert_eq!(inline, Some("image/webp"));
        assert!(part.as_text().is_none());
        Ok(())
    }

    #[test]
    fn image_config_defaults_to_2k() -> anyhow::Result<()> {
        let config = ImageConfig::new("16:9");
        assert_eq!(
            serde_json::to_value(&config)?,
            json!({ "aspectRatio": "16:9", "imageSize": "2K" })
        );
        Ok(())
    }
}
