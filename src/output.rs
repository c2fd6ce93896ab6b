//! CLI output formatting for all pipeline stages.
//!
//! Each display has a `format_*` function returning `Vec<String>` and a
//! `print_*` wrapper that writes to stdout. Format functions are pure, so the
//! layout is tested without capturing stdout.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! beach.jpg (2000x1333)
//!     500px, 800px, 1080px, 1400px, 1800px
//! icon.png (64x64)
//!     no variants (narrower than every ladder width)
//! ```
//!
//! ## Measure
//!
//! ```text
//! hero → beach.jpg
//!     480px: 480px
//!     768px: 700px
//!     max 1920px: 1000px
//! ```
//!
//! ## Compile
//!
//! ```text
//! hero → beach.jpg
//!     srcset: variants/beach-500.jpg 500w, variants/beach-800.jpg 800w
//!     sizes: (max-width: 480px) 480px, 1000px
//!
//! Processed 2 masters, wrote 7 variants, compiled 2 images → dist/index.html
//! ```

use crate::pipeline::RunContext;
use crate::process::{PlannedMaster, ProcessEvent};
use crate::types::{BreakpointSet, ElementBinding, MeasurementTable};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `500px, 800px` or the no-variant notice.
fn width_list(widths: &[u32]) -> String {
    if widths.is_empty() {
        return "no variants (narrower than every ladder width)".to_string();
    }
    widths
        .iter()
        .map(|w| format!("{w}px"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Generate
// ============================================================================

/// Format a single generation progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::MasterProcessed {
            filename,
            dimensions: (width, height),
            variants,
        } => vec![
            format!("{filename} ({width}x{height})"),
            format!("{}{}", indent(1), width_list(variants)),
        ],
    }
}

/// Format a dry-run plan: every master with the variant files it would get.
pub fn format_plan(planned: &[PlannedMaster], output_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let mut total = 0;
    for (i, master) in planned.iter().enumerate() {
        let record = &master.record;
        lines.push(format!(
            "{} {} ({}x{})",
            format_index(i + 1),
            record.filename,
            record.width,
            record.height
        ));
        if master.jobs.is_empty() {
            lines.push(format!("{}{}", indent(1), width_list(&[])));
        }
        for job in &master.jobs {
            let shown = job.output.strip_prefix(output_root).unwrap_or(&job.output);
            lines.push(format!(
                "{}{}px \u{2192} {}",
                indent(1),
                job.width,
                shown.display()
            ));
        }
        total += master.jobs.len();
    }
    lines.push(String::new());
    lines.push(format!(
        "Planned {} for {}",
        plural(total, "variant", "variants"),
        plural(planned.len(), "master", "masters")
    ));
    lines
}

pub fn print_plan(planned: &[PlannedMaster], output_root: &Path) {
    for line in format_plan(planned, output_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Bind and measure
// ============================================================================

/// Format the element binding, one image per line in id order.
pub fn format_binding(binding: &ElementBinding) -> Vec<String> {
    binding
        .iter()
        .enumerate()
        .map(|(i, (id, filename))| format!("{} {id} \u{2192} {filename}", format_index(i + 1)))
        .collect()
}

pub fn print_binding(binding: &ElementBinding) {
    for line in format_binding(binding) {
        println!("{}", line);
    }
}

/// Format the measurement table: one block per image, one line per
/// breakpoint. Breakpoints where the image had no layout box are marked.
pub fn format_measurements(
    table: &MeasurementTable,
    binding: &ElementBinding,
    breakpoints: &BreakpointSet,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, filename) in binding {
        lines.push(format!("{id} \u{2192} {filename}"));
        for bp in breakpoints.iter() {
            let label = if bp.is_max() {
                format!("max {}px", bp.value())
            } else {
                format!("{}px", bp.value())
            };
            let width = table.get(id, bp.value()).unwrap_or("not rendered");
            lines.push(format!("{}{label}: {width}", indent(1)));
        }
    }
    lines
}

pub fn print_measurements(
    table: &MeasurementTable,
    binding: &ElementBinding,
    breakpoints: &BreakpointSet,
) {
    for line in format_measurements(table, binding, breakpoints) {
        println!("{}", line);
    }
}

// ============================================================================
// Compile and summary
// ============================================================================

/// Format the compiled attributes of every image followed by the run totals.
pub fn format_run_summary(ctx: &RunContext) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, attributes) in &ctx.compiled {
        let filename = ctx.binding.get(id).map(String::as_str).unwrap_or("?");
        lines.push(format!("{id} \u{2192} {filename}"));
        let srcset = if attributes.srcset.is_empty() {
            "(empty)"
        } else {
            attributes.srcset.as_str()
        };
        lines.push(format!("{}srcset: {srcset}", indent(1)));
        lines.push(format!("{}sizes: {}", indent(1), attributes.sizes));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Processed {}, wrote {}, compiled {} \u{2192} {}",
        plural(ctx.records.len(), "master", "masters"),
        plural(ctx.variants_written, "variant", "variants"),
        plural(ctx.compiled.len(), "image", "images"),
        ctx.document.display()
    ));
    lines
}

pub fn print_run_summary(ctx: &RunContext) {
    for line in format_run_summary(ctx) {
        println!("{}", line);
    }
}
