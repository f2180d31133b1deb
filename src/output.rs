//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Render-dir
//!
//! ```text
//! Blocks
//! 001 010-hero.html (core/cover)
//!     Injected: desktop + mobile
//!     Scope: cb-3f2a…
//! 002 020-banner.html (core/cover)
//!     Injected: desktop
//! 003 040-paragraph.html (core/cover)
//!     Skipped: no target element
//! 004 landing/050-plain.html
//!     Unchanged: no filter applies
//!
//! Rendered 4 blocks, 2 changed → out/
//! Preview → out/index.html
//! ```
//!
//! ## Simulate
//!
//! ```text
//! 1280px desktop
//!     001 div: url(https://x/a.png)
//! 500px mobile
//!     001 div: url(https://x/b.png)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchReport, BlockOutcome};
use crate::switcher::{BreakpointState, SimulationStep};
use crate::types::SkipReason;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn skip_reason_text(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NoImages => "no images resolved",
        SkipReason::TargetNotFound => "no target element",
    }
}

fn state_text(state: BreakpointState) -> &'static str {
    match state {
        BreakpointState::Desktop => "desktop",
        BreakpointState::Mobile => "mobile",
    }
}

/// Header plus context lines for one block.
fn block_lines(index: usize, block: &BlockOutcome) -> Vec<String> {
    let path = block.path.display();
    let mut lines = vec![if block.block_name.is_empty() {
        format!("{} {}", format_index(index), path)
    } else {
        format!("{} {} ({})", format_index(index), path, block.block_name)
    }];

    if block.changed {
        let what = match (block.desktop, !block.scope_ids.is_empty()) {
            (true, true) => "Injected: desktop + mobile",
            (true, false) => "Injected: desktop",
            (false, true) => "Injected: mobile",
            (false, false) => "Changed: by filter",
        };
        lines.push(format!("{}{}", indent(1), what));
        for id in &block.scope_ids {
            lines.push(format!("{}Scope: {}", indent(1), id));
        }
    } else if let Some(&reason) = block.skipped.first() {
        lines.push(format!("{}Skipped: {}", indent(1), skip_reason_text(reason)));
    } else {
        lines.push(format!("{}Unchanged: no filter applies", indent(1)));
    }
    lines
}

pub fn format_batch_report(report: &BatchReport, output_dir: &Path) -> Vec<String> {
    let mut lines = vec!["Blocks".to_string()];
    for (i, block) in report.blocks.iter().enumerate() {
        lines.extend(block_lines(i + 1, block));
    }
    lines.push(String::new());
    lines.push(format!(
        "Rendered {} blocks, {} changed → {}",
        report.blocks.len(),
        report.changed(),
        output_dir.display()
    ));
    if let Some(preview) = &report.preview {
        lines.push(format!("Preview → {}", preview.display()));
    }
    lines
}

pub fn print_batch_report(report: &BatchReport, output_dir: &Path) {
    for line in format_batch_report(report, output_dir) {
        println!("{}", line);
    }
}

pub fn format_simulation(steps: &[SimulationStep]) -> Vec<String> {
    let mut lines = Vec::new();
    for step in steps {
        lines.push(format!("{}px {}", step.width, state_text(step.state)));
        if step.backgrounds.is_empty() {
            lines.push(format!("{}(no switchable elements)", indent(1)));
        }
        for (i, (tag, background)) in step.backgrounds.iter().enumerate() {
            let shown = if background.is_empty() {
                "(none)"
            } else {
                background.as_str()
            };
            lines.push(format!("{}{} {}: {}", indent(1), format_index(i + 1), tag, shown));
        }
    }
    lines
}

pub fn print_simulation(steps: &[SimulationStep]) {
    for line in format_simulation(steps) {
        println!("{}", line);
    }
}
