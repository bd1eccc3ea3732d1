use anyhow::Result;
use infographic_contracts::content::ContentPart;
use infographic_contracts::request::GenerationRequest;
use tracing::{info, warn};

use crate::encoder::encode_context_images;
use crate::providers::TextProvider;

/// Substituted when the text model answers without usable text.
pub const SUMMARY_FALLBACK: &str = "Create a general educational infographic about this topic.";

pub fn analysis_instruction(topic: &str, subject: &str, grade: &str) -> String {
    format!(
        "Analyze the provided content (text and/or images).\n\
         The goal is an educational infographic on the topic \"{topic}\" (Subject: {subject}, Grade: {grade}).\n\
         \n\
         Task: pull out the key concepts, facts and visual ideas from the content.\n\
         Condense them into 4-6 short bullet points that can be drawn.\n\
         Focus on what should appear visually: diagrams, icons, short text labels.\n\
         \n\
         If little or no content is provided, write relevant educational content for this grade and topic yourself.\n\
         \n\
         Output format: plain text, bullet points only."
    )
}

/// Instruction first, then the context text (when present), then images in upload order.
pub fn build_analysis_parts(request: &GenerationRequest) -> Result<Vec<ContentPart>> {
    let mut parts = vec![ContentPart::text(analysis_instruction(
        request.topic.trim(),
        request.subject.trim(),
        request.grade.trim(),
    ))];
    if !request.context_text.is_empty() {
        parts.push(ContentPart::text(format!(
            "Context Text: {}",
            request.context_text
        )));
    }
    parts.extend(
        encode_context_images(&request.context_images)?
            .into_iter()
            .map(ContentPart::inline),
    );
    Ok(parts)
}

/// Stage one: turn the request context into a bullet summary for the image prompt.
pub fn analyze_context(
    provider: &dyn TextProvider,
    model: &str,
    request: &GenerationRequest,
) -> Result<String> {
    let parts = build_analysis_parts(request)?;
    info!(
        provider = provider.name(),
        model,
        images = request.context_images.len(),
        has_text = !request.context_text.is_empty(),
        "analyzing context"
    );
    let text = provider.generate_text(model, &parts)?;
    match text {
        Some(summary) if !summary.trim().is_empty() => Ok(summary),
        _ => {
            warn!(model, "text model returned no summary; using fallback");
            Ok(SUMMARY_FALLBACK.to_string())
        }
    }
}
