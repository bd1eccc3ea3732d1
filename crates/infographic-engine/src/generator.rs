use std::thread;

use anyhow::{anyhow, Result};
use infographic_contracts::content::ImageConfig;
use infographic_contracts::gallery::{GeneratedImage, InfographicKind};
use infographic_contracts::request::GenerationRequest;
use tracing::{info, warn};

use crate::error_chain_text;
use crate::extractor::extract_image;
use crate::providers::ImageProvider;

/// Format and style appended to the shared prompt for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSpec {
    pub kind: InfographicKind,
    pub aspect_ratio: &'static str,
    pub directive: &'static str,
    pub description: &'static str,
}

pub static VARIANTS: [VariantSpec; 3] = [
    VariantSpec {
        kind: InfographicKind::Horizontal,
        aspect_ratio: "16:9",
        directive: "Format: Landscape aspect ratio (16:9). Modern, colorful, engaging layout.",
        description: "Horizontal Color",
    },
    VariantSpec {
        kind: InfographicKind::Vertical,
        aspect_ratio: "3:4",
        directive: "Format: Portrait aspect ratio (3:4). Clean vertical poster layout. Rich colors.",
        description: "Vertical Color (A4)",
    },
    VariantSpec {
        kind: InfographicKind::Lineart,
        aspect_ratio: "3:4",
        directive: "Format: Portrait aspect ratio (3:4). STYLE: Black and white line art, \
                    coloring book style, vector outlines, white background, no shading, \
                    high contrast. Ready for printing and coloring.",
        description: "Vertical Line Art (B&W)",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The response held no inline image.
    NoImage,
    /// The request itself failed.
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFailure {
    pub kind: InfographicKind,
    pub failure: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    /// Successful variants, in horizontal, vertical, lineart order.
    pub images: Vec<GeneratedImage>,
    pub failures: Vec<VariantFailure>,
}

impl GenerationOutcome {
    /// The first transport error, when every variant failed that way.
    pub fn total_transport_failure(&self) -> Option<&str> {
        if !self.images.is_empty() || self.failures.is_empty() {
            return None;
        }
        if self
            .failures
            .iter()
            .all(|failure| failure.failure == FailureKind::Transport)
        {
            return self.failures.first().map(|failure| failure.reason.as_str());
        }
        None
    }
}

pub fn base_prompt(title: &str, grade: &str, summary: &str) -> String {
    format!(
        "Create a high-quality, professional educational infographic.\n\
         \n\
         HEADLINE/TITLE MUST BE EXACTLY: \"{title}\"\n\
         \n\
         Content to visualize, based on this summary:\n\
         {summary}\n\
         \n\
         Design requirements:\n\
         - Clear, legible text hierarchy.\n\
         - Educational style suitable for {grade} students.\n\
         - Use icons, diagrams and illustrations to explain the concepts."
    )
}

pub fn variant_prompt(base: &str, variant: &VariantSpec) -> String {
    format!("{base}\n\n{}", variant.directive)
}

/// Stage two: render the three variants concurrently. Each variant settles on
/// its own; a failed request never cancels its siblings.
pub fn generate_infographics(
    provider: &dyn ImageProvider,
    model: &str,
    request: &GenerationRequest,
    summary: &str,
) -> GenerationOutcome {
    let base = base_prompt(&request.title(), request.grade.trim(), summary);
    info!(
        provider = provider.name(),
        model,
        variants = VARIANTS.len(),
        "generating infographics"
    );

    let settled: Vec<(&'static VariantSpec, Result<Option<GeneratedImage>>)> =
        thread::scope(|scope| {
            let handles: Vec<_> = VARIANTS
                .iter()
                .map(|variant| {
                    let prompt = variant_prompt(&base, variant);
                    let handle = scope.spawn(move || {
                        let config = ImageConfig::new(variant.aspect_ratio);
                        provider
                            .generate_image(model, &prompt, &config)
                            .map(|response| {
                                extract_image(&response, variant.kind, variant.description)
                            })
                    });
                    (variant, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(variant, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|_| Err(anyhow!("{} variant worker panicked", variant.kind)));
                    (variant, result)
                })
                .collect()
        });

    let mut outcome = GenerationOutcome::default();
    for (variant, result) in settled {
        match result {
            Ok(Some(image)) => outcome.images.push(image),
            Ok(None) => {
                warn!(kind = %variant.kind, "no inline image in response");
                outcome.failures.push(VariantFailure {
                    kind: variant.kind,
                    failure: FailureKind::NoImage,
                    reason: "response contained no inline image".to_string(),
                });
            }
            Err(err) => {
                let reason = error_chain_text(&err, 512);
                warn!(kind = %variant.kind, error = %reason, "variant request failed");
                outcome.failures.push(VariantFailure {
                    kind: variant.kind,
                    failure: FailureKind::Transport,
                    reason,
                });
            }
        }
    }
    info!(
        images = outcome.images.len(),
        failures = outcome.failures.len(),
        "infographic generation settled"
    );
    outcome
}
