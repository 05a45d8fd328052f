//! Export: persist a batch's outputs plus a machine-readable manifest.
//!
//! An export walks every successful item in a [`BatchReport`], streams its
//! encoded outputs into an [`ArchiveSink`], and finishes with an
//! `export_info.json` manifest describing the run. The sink is a trait so
//! callers can target a directory today and an archive container tomorrow
//! without touching the export logic.
//!
//! Export failures are scoped here: a sink error aborts the export but says
//! nothing about the processing results, which the caller still holds.

use crate::batch::BatchReport;
use crate::settings::ProcessingSettings;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Manifest filename, written last so a complete manifest implies a complete
/// export.
pub const MANIFEST_NAME: &str = "export_info.json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export failed: {0}")]
    Io(#[from] io::Error),
    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Destination for exported files. Implementations receive each file exactly
/// once; `finish` is called after the last file (manifest included).
pub trait ArchiveSink {
    fn add_file(&mut self, name: &str, bytes: &[u8]) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
}

/// Sink that lays files out flat in a directory, creating it on first write.
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArchiveSink for DirectorySink {
    fn add_file(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join(name), bytes)
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The manifest written alongside exported files. Field names are camelCase
/// on disk so downstream web tooling can consume the JSON as-is.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub exported_at: String,
    pub preset: String,
    pub settings: SettingsSummary,
    pub stats: ExportStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSummary {
    pub format: String,
    pub quality: u8,
    pub optimization: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStats {
    pub total_images: usize,
    pub original_size: String,
    pub processed_size: String,
    pub savings: String,
    pub compression_ratio: String,
}

/// What an export wrote, for reporting.
#[derive(Debug)]
pub struct ExportSummary {
    pub files_written: usize,
    pub bytes_written: u64,
}

/// Format a byte count for humans: 1024-based units, one decimal.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    format!("{value:.1} {}", UNITS[exp])
}

/// Size reduction as a percentage of the original, one decimal. Negative when
/// outputs grew. Zero original size yields 0 rather than a division error.
pub fn compression_ratio(original: u64, processed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - processed as f64) / original as f64 * 100.0
}

/// Default export directory name for a given date, e.g.
/// `imgpress_export_2026-08-31`.
pub fn default_export_dir_name(date: NaiveDate) -> String {
    format!("imgpress_export_{}", date.format("%Y-%m-%d"))
}

/// Build the manifest for a finished batch. `preset` is the preset name the
/// run was based on, or `None` for ad-hoc settings.
pub fn build_manifest(
    report: &BatchReport,
    settings: &ProcessingSettings,
    preset: Option<&str>,
    exported_at: DateTime<Utc>,
) -> ExportManifest {
    let original = report.total_original_size();
    let processed = report.total_processed_size();

    ExportManifest {
        exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        preset: preset.unwrap_or("custom").to_string(),
        settings: SettingsSummary {
            format: settings.format.to_string(),
            quality: settings.quality.value(),
            optimization: settings.optimize,
        },
        stats: ExportStats {
            total_images: report.processed.len(),
            original_size: human_size(original),
            processed_size: human_size(processed),
            savings: human_size(original.saturating_sub(processed)),
            compression_ratio: format!("{:.1}%", compression_ratio(original, processed)),
        },
    }
}

/// Write every output of a finished batch into the sink, then the manifest.
pub fn export(
    report: &BatchReport,
    settings: &ProcessingSettings,
    preset: Option<&str>,
    sink: &mut dyn ArchiveSink,
) -> Result<ExportSummary, ExportError> {
    let mut files_written = 0usize;
    let mut bytes_written = 0u64;

    for item in &report.processed {
        for output in &item.outputs {
            sink.add_file(&output.name, &output.bytes)?;
            files_written += 1;
            bytes_written += output.size();
        }
    }

    let manifest = build_manifest(report, settings, preset, Utc::now());
    let json = serde_json::to_vec_pretty(&manifest)?;
    bytes_written += json.len() as u64;
    sink.add_file(MANIFEST_NAME, &json)?;
    files_written += 1;
    sink.finish()?;

    info!(files = files_written, bytes = bytes_written, "export complete");
    Ok(ExportSummary {
        files_written,
        bytes_written,
    })
}
