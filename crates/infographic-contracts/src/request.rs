use std::path::{Path, PathBuf};

use thiserror::Error;

/// The upload control suggests at most this many context images; more are accepted.
pub const SUGGESTED_MAX_CONTEXT_IMAGES: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{name} is not an image ({mime_type})")]
    UnsupportedMediaType { name: String, mime_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobSource {
    /// Read when the image is encoded.
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A user-selected context image. Bytes are only read by the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextImage {
    pub name: String,
    pub mime_type: String,
    pub source: BlobSource,
}

impl ContextImage {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ValidationError> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_string();
        let Some(mime_type) = image_mime_for_path(&path) else {
            return Err(ValidationError::UnsupportedMediaType {
                name,
                mime_type: "unknown".to_string(),
            });
        };
        Ok(Self {
            name,
            mime_type: mime_type.to_string(),
            source: BlobSource::Path(path),
        })
    }

    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let mime_type = mime_type.into();
        if !mime_type.starts_with("image/") {
            return Err(ValidationError::UnsupportedMediaType { name, mime_type });
        }
        Ok(Self {
            name,
            mime_type,
            source: BlobSource::Memory(bytes),
        })
    }
}

pub fn image_mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

/// Everything the form collects. Owned by the pipeline once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationRequest {
    pub topic: String,
    pub subject: String,
    pub grade: String,
    pub context_text: String,
    pub context_images: Vec<ContextImage>,
}

impl GenerationRequest {
    pub fn new(
        topic: impl Into<String>,
        subject: impl Into<String>,
        grade: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into().trim().to_string(),
            subject: subject.into().trim().to_string(),
            grade: grade.into().trim().to_string(),
            ..Self::default()
        }
    }

    pub fn with_context_text(mut self, text: impl Into<String>) -> Self {
        self.context_text = text.into();
        self
    }

    pub fn with_context_image(mut self, image: ContextImage) -> Self {
        self.context_images.push(image);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("topic", &self.topic),
            ("subject", &self.subject),
            ("grade", &self.grade),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }

    /// Headline every infographic variant must render verbatim.
    pub fn title(&self) -> String {
        format!(
            "{}, {} {}",
            self.topic.trim(),
            self.subject.trim(),
            self.grade.trim()
        )
    }

    pub fn exceeds_suggested_image_count(&self) -> bool {
        self.context_images.len() > SUGGESTED_MAX_CONTEXT_IMAGES
    }
}
