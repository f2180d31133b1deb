//! Directory rendering.
//!
//! Renders a tree of saved block fragments through a [`Pipeline`] and
//! mirrors it into an output directory.
//!
//! ## Input Layout
//!
//! ```text
//! blocks/
//! ├── 010-hero.html      # Rendered block fragment
//! ├── 010-hero.json      # Block descriptor: {"blockName": ..., "attrs": {...}}
//! ├── 020-banner.html
//! ├── 020-banner.json
//! └── landing/
//!     └── 050-plain.html # No sidecar: passes through unchanged
//! ```
//!
//! Each `*.html` file is one block. Its `<stem>.json` sidecar, when present,
//! is the descriptor the host renderer would have passed; without one the
//! block has no name and no attributes, so no filter applies.
//!
//! ## Parallel Rendering
//!
//! Blocks are independent, so they are rendered in parallel on a
//! [rayon](https://docs.rs/rayon) pool. Results are reported in path order
//! regardless of completion order.

use crate::pipeline::{Pipeline, RenderedBlock};
use crate::preview::{self, PreviewEntry, PreviewError};
use crate::types::{BlockDescriptor, SkipReason};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid block descriptor {}: {source}", path.display())]
    Descriptor {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("input is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
    #[error("block {} would be overwritten by the preview page", .0.display())]
    PreviewCollision(PathBuf),
}

/// A fragment found under the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSource {
    /// Path relative to the input root.
    pub relative: PathBuf,
    pub fragment: PathBuf,
    pub sidecar: Option<PathBuf>,
}

/// Outcome for one block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockOutcome {
    pub path: PathBuf,
    pub block_name: String,
    pub changed: bool,
    /// A desktop background was written into the inline style.
    pub desktop: bool,
    pub scope_ids: Vec<String>,
    pub skipped: Vec<SkipReason>,
}

/// Outcome for a whole directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub blocks: Vec<BlockOutcome>,
    pub preview: Option<PathBuf>,
}

impl BatchReport {
    pub fn changed(&self) -> usize {
        self.blocks.iter().filter(|b| b.changed).count()
    }

    pub fn unchanged(&self) -> usize {
        self.blocks.len() - self.changed()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Also write `index.html` with every rendered block and the switcher.
    pub preview: bool,
    /// Worker threads. `None` uses rayon's default (one per core).
    pub jobs: Option<usize>,
}

/// Find every `*.html` fragment below `input`, sorted by path.
pub fn discover(input: &Path) -> Result<Vec<BlockSource>, BatchError> {
    if !input.is_dir() {
        return Err(BatchError::NotADirectory(input.to_path_buf()));
    }
    let mut sources = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "html") {
            continue;
        }
        let sidecar = path.with_extension("json");
        sources.push(BlockSource {
            relative: path.strip_prefix(input).unwrap_or(path).to_path_buf(),
            fragment: path.to_path_buf(),
            sidecar: sidecar.is_file().then_some(sidecar),
        });
    }
    tracing::debug!(input = %input.display(), blocks = sources.len(), "discovered fragments");
    Ok(sources)
}

/// Read a block's descriptor from its sidecar, or an empty one without.
pub fn load_descriptor(source: &BlockSource) -> Result<BlockDescriptor, BatchError> {
    let Some(path) = &source.sidecar else {
        return Ok(BlockDescriptor::default());
    };
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| BatchError::Descriptor {
        path: path.clone(),
        source: e,
    })
}

/// Render every fragment under `input` into `output`.
pub fn render_dir(
    pipeline: &Pipeline,
    input: &Path,
    output: &Path,
    options: &BatchOptions,
) -> Result<BatchReport, BatchError> {
    let sources = discover(input)?;
    if options.preview {
        if let Some(clash) = sources
            .iter()
            .find(|s| s.relative == Path::new(preview::PREVIEW_FILE))
        {
            return Err(BatchError::PreviewCollision(clash.relative.clone()));
        }
    }
    fs::create_dir_all(output)?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = options.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder.build()?;

    let rendered: Vec<(BlockOutcome, String)> = pool.install(|| {
        sources
            .par_iter()
            .map(|source| render_one(pipeline, source, output))
            .collect::<Result<Vec<_>, BatchError>>()
    })?;

    let mut report = BatchReport::default();
    let mut entries = Vec::with_capacity(rendered.len());
    for (outcome, html) in rendered {
        entries.push(PreviewEntry {
            label: outcome.path.display().to_string(),
            html,
        });
        report.blocks.push(outcome);
    }

    if options.preview {
        let title = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blocks".to_string());
        report.preview = Some(preview::write_preview(output, &title, &entries)?);
    }

    tracing::info!(
        blocks = report.blocks.len(),
        changed = report.changed(),
        output = %output.display(),
        "rendered directory"
    );
    Ok(report)
}

fn render_one(
    pipeline: &Pipeline,
    source: &BlockSource,
    output: &Path,
) -> Result<(BlockOutcome, String), BatchError> {
    let fragment = fs::read_to_string(&source.fragment)?;
    let block = load_descriptor(source)?;
    let RenderedBlock {
        html,
        scope_ids,
        skipped,
        desktop,
        ..
    } = pipeline.render_block(&fragment, &block);
    let changed = html != fragment;

    let dest = output.join(&source.relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dest, &html)?;
    tracing::debug!(path = %source.relative.display(), changed, "rendered block");

    Ok((
        BlockOutcome {
            path: source.relative.clone(),
            block_name: block.block_name,
            changed,
            desktop,
            scope_ids,
            skipped,
        },
        html,
    ))
}
