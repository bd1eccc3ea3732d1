use std::io::Cursor;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use infographic_contracts::content::{ContentPart, ImageConfig};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::{ImageProvider, TextProvider};

const DRYRUN_LONG_EDGE: u32 = 640;
const LINEART_BORDER: u32 = 8;

/// Offline stand-in for both capabilities: canned bullet text and flat-colour
/// PNGs wrapped in a `generateContent`-shaped response.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryrunProvider;

impl TextProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_text(&self, _model: &str, parts: &[ContentPart]) -> Result<Option<String>> {
        let images = parts.iter().filter(|part| part.as_inline().is_some()).count();
        let mut bullets = vec![
            "- Title banner with the topic in large type".to_string(),
            "- Three labelled icons for the core ideas".to_string(),
            "- A simple flow diagram linking the ideas in order".to_string(),
            "- Short captions sized for the grade level".to_string(),
        ];
        if images > 0 {
            bullets.push(format!(
                "- Visual motifs drawn from {images} reference image(s)"
            ));
        }
        Ok(Some(bullets.join("\n")))
    }
}

impl ImageProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_image(&self, model: &str, prompt: &str, config: &ImageConfig) -> Result<Value> {
        let (width, height) = dims_for_aspect_ratio(&config.aspect_ratio);
        let digest = prompt_digest(prompt, &config.aspect_ratio);
        let lineart = prompt.to_ascii_lowercase().contains("line art");
        let png = render_placeholder(width, height, (digest[0], digest[1], digest[2]), lineart)?;
        Ok(json!({
            "responseId": hex::encode(&digest[..8]),
            "modelVersion": model,
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": BASE64.encode(png),
                        }
                    }]
                },
                "finishReason": "STOP",
            }],
        }))
    }
}

fn dims_for_aspect_ratio(aspect_ratio: &str) -> (u32, u32) {
    let parsed = aspect_ratio
        .split_once(':')
        .and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)))
        .filter(|(w, h)| *w > 0 && *h > 0);
    let Some((w, h)) = parsed else {
        return (DRYRUN_LONG_EDGE, DRYRUN_LONG_EDGE);
    };
    if w >= h {
        (DRYRUN_LONG_EDGE, (DRYRUN_LONG_EDGE * h / w).max(1))
    } else {
        ((DRYRUN_LONG_EDGE * w / h).max(1), DRYRUN_LONG_EDGE)
    }
}

fn prompt_digest(prompt: &str, aspect_ratio: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(aspect_ratio.as_bytes());
    hasher.finalize().to_vec()
}

fn render_placeholder(width: u32, height: u32, rgb: (u8, u8, u8), lineart: bool) -> Result<Vec<u8>> {
    let (r, g, b) = rgb;
    let mut image = RgbImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let on_border = x < LINEART_BORDER
            || y < LINEART_BORDER
            || x + LINEART_BORDER >= width
            || y + LINEART_BORDER >= height;
        *pixel = match (lineart, on_border) {
            (true, true) => Rgb([0, 0, 0]),
            (true, false) => Rgb([255, 255, 255]),
            (false, _) => Rgb([r, g, b]),
        };
    }
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .context("failed to encode dryrun PNG")?;
    Ok(out.into_inner())
}
