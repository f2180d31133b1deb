//! Preview page generation.
//!
//! Wraps rendered blocks in a standalone HTML document that also carries the
//! browser switcher, so the output of `render-dir --preview` can be opened
//! directly and resized to watch the images swap.
//!
//! Uses [maud](https://maud.lambda.xyz/) for the page shell. Block HTML is
//! inserted as-is: it is the pipeline's output, already escaped.

use crate::switcher;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CSS: &str = include_str!("../static/preview.css");

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One block shown on the preview page.
#[derive(Debug, Clone)]
pub struct PreviewEntry {
    /// Caption, typically the fragment's relative path.
    pub label: String,
    pub html: String,
}

/// Render the preview document.
pub fn render_preview(title: &str, entries: &[PreviewEntry]) -> Markup {
    let content = html! {
        header.preview-header {
            (title) " · " (entries.len()) " blocks"
        }
        @for entry in entries {
            section.preview-block {
                h2 { (entry.label) }
                (PreEscaped(&entry.html))
            }
        }
    };
    base_document(title, content)
}

/// File name of the preview page inside the output directory.
pub const PREVIEW_FILE: &str = "index.html";

/// Write [`PREVIEW_FILE`] into `output_dir` and return its path.
pub fn write_preview(
    output_dir: &Path,
    title: &str,
    entries: &[PreviewEntry],
) -> Result<PathBuf, PreviewError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(PREVIEW_FILE);
    fs::write(&path, render_preview(title, entries).into_string())?;
    tracing::info!(path = %path.display(), blocks = entries.len(), "wrote preview page");
    Ok(path)
}

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
                script { (PreEscaped(switcher::SCRIPT)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, html: &str) -> PreviewEntry {
        PreviewEntry {
            label: label.to_string(),
            html: html.to_string(),
        }
    }

    #[test]
    fn preview_is_a_full_document() {
        let doc = render_preview("Blocks", &[]).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains(r#"name="viewport""#));
        assert!(doc.contains("<title>Blocks</title>"));
    }

    #[test]
    fn block_html_is_inserted_verbatim() {
        let block = r#"<div class="wp-block-cover" data-mobile-bg="b.png"></div>"#;
        let doc = render_preview("t", &[entry("010-hero.html", block)]).into_string();
        assert!(doc.contains(block));
        assert!(doc.contains("<h2>010-hero.html</h2>"));
    }

    #[test]
    fn labels_are_escaped() {
        let doc = render_preview("t", &[entry("<b>.html", "")]).into_string();
        assert!(doc.contains("&lt;b&gt;.html"));
    }

    #[test]
    fn switcher_script_follows_content() {
        let doc = render_preview("t", &[entry("a", "<p id=\"block\"></p>")]).into_string();
        let block_at = doc.find("id=\"block\"").unwrap();
        let script_at = doc.find("carmoCoverSwitcher").unwrap();
        assert!(script_at > block_at);
    }

    #[test]
    fn write_preview_creates_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let path = write_preview(&out, "t", &[entry("a", "<p></p>")]).unwrap();
        assert_eq!(path, out.join("index.html"));
        assert!(fs::read_to_string(path).unwrap().contains("<p></p>"));
    }
}
