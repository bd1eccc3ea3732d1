use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// The three infographic variants produced per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfographicKind {
    Horizontal,
    Vertical,
    Lineart,
}

impl InfographicKind {
    pub const ALL: [InfographicKind; 3] = [Self::Horizontal, Self::Vertical, Self::Lineart];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::Lineart => "lineart",
        }
    }

    /// File name offered when the image is downloaded.
    pub fn download_file_name(self) -> String {
        format!("infographic-{}.png", self.as_str())
    }
}

impl fmt::Display for InfographicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: String,
    /// Inline `data:` URI.
    pub url: String,
    #[serde(rename = "type")]
    pub kind: InfographicKind,
    pub description: String,
}

impl GeneratedImage {
    /// Wraps an already base64-encoded payload under a fresh id.
    pub fn from_inline(
        kind: InfographicKind,
        description: impl Into<String>,
        mime_type: &str,
        base64_data: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: format_data_uri(mime_type, base64_data),
            kind,
            description: description.into(),
        }
    }

    pub fn decode(&self) -> Result<DataUri, DataUriError> {
        parse_data_uri(&self.url)
    }

    pub fn download_file_name(&self) -> String {
        self.kind.download_file_name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,
    #[error("data URI has no payload separator")]
    MissingPayload,
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("data URI declares no media type")]
    MissingMediaType,
    #[error("data URI payload is not valid base64: {0}")]
    InvalidPayload(String),
}

pub fn format_data_uri(mime_type: &str, base64_data: &str) -> String {
    format!("data:{mime_type};base64,{base64_data}")
}

pub fn parse_data_uri(uri: &str) -> Result<DataUri, DataUriError> {
    let rest = uri.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingPayload)?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or(DataUriError::NotBase64)?
        .trim();
    if mime_type.is_empty() {
        return Err(DataUriError::MissingMediaType);
    }
    let bytes = BASE64
        .decode(payload.as_bytes())
        .map_err(|err| DataUriError::InvalidPayload(err.to_string()))?;
    Ok(DataUri {
        mime_type: mime_type.to_string(),
        bytes,
    })
}
