use std::fs;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use infographic_contracts::content::InlineData;
use infographic_contracts::request::{BlobSource, ContextImage};

/// Reads a context image and wraps it as an inline request payload.
pub fn encode_context_image(image: &ContextImage) -> Result<InlineData> {
    let bytes = match &image.source {
        BlobSource::Path(path) => {
            fs::read(path).with_context(|| format!("failed reading {}", path.display()))?
        }
        BlobSource::Memory(bytes) => bytes.clone(),
    };
    Ok(encode_bytes(&bytes, &image.mime_type))
}

pub fn encode_context_images(images: &[ContextImage]) -> Result<Vec<InlineData>> {
    images.iter().map(encode_context_image).collect()
}

pub fn encode_bytes(bytes: &[u8], mime_type: &str) -> InlineData {
    InlineData {
        mime_type: mime_type.to_string(),
        data: BASE64.encode(bytes),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use infographic_contracts::request::ContextImage;

    use super::*;

    #[test]
    fn file_blob_is_read_and_encoded() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("cells.png");
        fs::write(&path, [0x89, b'P', b'N', b'G'])?;

        let encoded = encode_context_image(&ContextImage::from_path(&path)?)?;
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(BASE64.decode(encoded.data)?, vec![0x89, b'P', b'N', b'G']);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let image = ContextImage::from_path(temp.path().join("gone.jpg"))?;
        let err = encode_context_image(&image).unwrap_err();
        assert!(err.to_string().contains("failed reading"));
        assert!(err.chain().any(|cause| cause.downcast_ref::<std::io::Error>().is_some()));
        Ok(())
    }

    #[test]
    fn memory_blobs_keep_declared_type_and_order() -> anyhow::Result<()> {
        let images = vec![
            ContextImage::from_bytes("a.webp", "image/webp", vec![1])?,
            ContextImage::from_bytes("b.gif", "image/gif", vec![2])?,
        ];
        let encoded = encode_context_images(&images)?;
        let types: Vec<&str> = encoded.iter().map(|item| item.mime_type.as_str()).collect();
        assert_eq!(types, vec!["image/webp", "image/gif"]);
        assert_eq!(encoded[1].data, "Ag==");
        Ok(())
    }
}
