use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use infographic_contracts::gallery::GeneratedImage;
use infographic_contracts::runs::summary::GalleryEntry;

/// Materializes one image the way a browser download would: the decoded
/// data URI payload written verbatim as `infographic-{type}.png`.
pub fn download_image(image: &GeneratedImage, dir: &Path) -> Result<(PathBuf, GalleryEntry)> {
    let decoded = image
        .decode()
        .with_context(|| format!("{} image has an unreadable data URI", image.kind))?;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let file = image.download_file_name();
    let path = dir.join(&file);
    fs::write(&path, &decoded.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    let entry = GalleryEntry {
        id: image.id.clone(),
        kind: image.kind,
        description: image.description.clone(),
        mime_type: decoded.mime_type,
        file,
    };
    Ok((path, entry))
}

pub fn download_gallery(images: &[GeneratedImage], dir: &Path) -> Result<Vec<GalleryEntry>> {
    images
        .iter()
        .map(|image| download_image(image, dir).map(|(_, entry)| entry))
        .collect()
}

/// `image_root` is prepended to each entry's file name (empty when the page
/// sits next to the images).
pub fn render_gallery_html(title: &str, entries: &[GalleryEntry], image_root: &str) -> String {
    let mut cards = String::new();
    for entry in entries {
        let src = format!("{image_root}{}", entry.file);
        cards.push_str(&format!(
            "<div class='card'><div class='thumb'><img src='{src}' alt='{description}'></div><div class='meta'><div class='kind'>{kind}</div><div class='desc'>{description}</div><div class='links'><a href='{src}' download='{file}'>Download</a></div></div></div>",
            src = escape_html(&src),
            description = escape_html(&entry.description),
            kind = escape_html(entry.kind.as_str()),
            file = escape_html(&entry.kind.download_file_name()),
        ));
    }

    format!(
        "<!doctype html>\n<html>\n<head>\n  <meta charset='utf-8'>\n  <title>{title}</title>\n  <style>\n    body {{ font-family: Arial, sans-serif; background: #f8fafc; margin: 0; padding: 24px; }}\n    .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 20px; }}\n    .card {{ background: white; border-radius: 12px; overflow: hidden; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }}\n    .thumb {{ width: 100%; height: 260px; background: #f1f5f9; display: flex; align-items: center; justify-content: center; }}\n    .thumb img {{ max-width: 100%; max-height: 100%; }}\n    .meta {{ padding: 12px; }}\n    .kind {{ font-weight: bold; font-size: 12px; color: #475569; text-transform: uppercase; }}\n    .desc {{ font-size: 14px; margin: 6px 0; }}\n    .links a {{ font-size: 13px; color: #2563eb; text-decoration: none; }}\n  </style>\n</head>\n<body>\n  <h1>{title}</h1>\n  <div class='grid'>\n    {cards}\n  </div>\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

pub fn write_gallery_html(
    path: &Path,
    title: &str,
    entries: &[GalleryEntry],
    image_root: &str,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_gallery_html(title, entries, image_root))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}
