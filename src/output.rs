//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Optimize
//!
//! ```text
//! 001 holiday.png
//!     holiday_optimized.webp (800x400, 42.5 KB)
//! 002 beach.jpg
//!     beach-480w.webp (480x320, 18.1 KB)
//!     beach-768w.webp (768x512, 39.0 KB)
//!
//! Failures
//! 001 clip.mov
//!     clip.mov: unsupported file format
//!
//! Processed 2 of 3 images (3 outputs) in 0.8s
//! Total: 4.1 MB -> 99.6 KB (saved 4.0 MB, 97.6%)
//! ```
//!
//! ## Presets
//!
//! ```text
//! avatar             200x200        webp q90
//!                    Profile pictures and user avatars
//! banner             1200x400       webp q85
//!                    Website headers and hero sections
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::batch::{BatchReport, ProgressEvent};
use crate::export::{compression_ratio, human_size, ExportSummary};
use crate::settings::ExportPreset;

/// Entity header: zero-padded positional index + name.
fn entity_header(index: usize, name: &str) -> String {
    format!("{:03} {}", index + 1, name)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Batch report
// ============================================================================

pub fn format_report(report: &BatchReport) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, item) in report.processed.iter().enumerate() {
        lines.push(entity_header(i, &file_name(&item.source)));
        for output in &item.outputs {
            lines.push(format!(
                "    {} ({}x{}, {})",
                output.name,
                output.width,
                output.height,
                human_size(output.size())
            ));
        }
    }

    if !report.failures.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Failures".to_string());
        for (i, failed) in report.failures.iter().enumerate() {
            lines.push(entity_header(i, &file_name(&failed.source)));
            lines.push(format!("    {}", failed.error));
        }
    }

    lines.push(String::new());
    let attempted = report.processed.len() + report.failures.len();
    let mut summary = format!(
        "Processed {} of {} images ({} outputs) in {:.1}s",
        report.processed.len(),
        attempted,
        report.output_count(),
        report.elapsed.as_secs_f64()
    );
    if report.cancelled {
        summary.push_str(" [cancelled]");
    }
    lines.push(summary);

    let original = report.total_original_size();
    let processed = report.total_processed_size();
    if original > 0 {
        lines.push(format!(
            "Total: {} -> {} (saved {}, {:.1}%)",
            human_size(original),
            human_size(processed),
            human_size(original.saturating_sub(processed)),
            compression_ratio(original, processed)
        ));
    }

    lines
}

pub fn print_report(report: &BatchReport) {
    for line in format_report(report) {
        println!("{line}");
    }
}

// ============================================================================
// Progress
// ============================================================================

/// One line per completed item; `Started` events render nothing so the
/// stream stays one-line-per-result under parallel workers.
pub fn format_progress(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::Started { .. } => None,
        ProgressEvent::Finished {
            source,
            completed,
            total,
            outputs,
            processed_bytes,
        } => Some(format!(
            "[{completed}/{total}] {} ({} outputs, {})",
            file_name(source),
            outputs,
            human_size(*processed_bytes)
        )),
        ProgressEvent::Failed {
            source,
            completed,
            total,
            reason,
        } => Some(format!(
            "[{completed}/{total}] {} FAILED: {reason}",
            file_name(source)
        )),
    }
}

// ============================================================================
// Export summary
// ============================================================================

pub fn format_export(summary: &ExportSummary, destination: &std::path::Path) -> Vec<String> {
    vec![format!(
        "Exported {} files ({}) to {}",
        summary.files_written,
        human_size(summary.bytes_written),
        destination.display()
    )]
}

pub fn print_export(summary: &ExportSummary, destination: &std::path::Path) {
    for line in format_export(summary, destination) {
        println!("{line}");
    }
}

// ============================================================================
// Presets
// ============================================================================

pub fn format_presets(presets: &[ExportPreset]) -> Vec<String> {
    presets
        .iter()
        .map(|preset| {
            let dims = match (preset.width, preset.height) {
                (Some(w), Some(h)) => format!("{w}x{h}"),
                (Some(w), None) => format!("{w}w"),
                (None, Some(h)) => format!("{h}h"),
                (None, None) => "original size".to_string(),
            };
            format!(
                "{:<18} {:<14} {} q{}\n{:<18} {}",
                preset.id, dims, preset.format, preset.quality, "", preset.description
            )
        })
        .collect()
}

pub fn print_presets(presets: &[ExportPreset]) {
    for line in format_presets(presets) {
        println!("{line}");
    }
}
