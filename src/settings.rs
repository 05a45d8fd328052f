//! Processing settings: output format, quality, geometry, srcset sizes.
//!
//! Settings describe *what* to produce, not *how* — they are the declarative
//! input to [`engine::transform`](crate::engine::transform). A settings value
//! is immutable per batch run; the CLI builds one from defaults, an optional
//! settings file, an optional preset, and flags, in that order.
//!
//! ## Settings File
//!
//! Settings can be loaded from a sparse TOML file — override just the values
//! you want:
//!
//! ```toml
//! format = "jpeg"
//! quality = 75
//! width = 1200
//! resize_mode = "fill"
//!
//! [srcset_sizes.medium]
//! width = 800
//! enabled = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

/// Target encoding for produced images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    WebP,
    Avif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    /// Whether the format can carry an alpha channel. Decides the letterbox
    /// background: transparent where possible, opaque white otherwise.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }

    /// Whether the encoder honors the quality setting. PNG is lossless and
    /// the pure-Rust WebP encoder only does lossless, so both ignore it.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::Avif)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
            Self::Avif => "avif",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            "avif" => Ok(Self::Avif),
            other => Err(format!("unknown format '{other}' (png, jpeg, webp, avif)")),
        }
    }
}

/// Geometry strategy when both target dimensions are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Entire source visible, centered, letterboxed onto the full canvas.
    #[default]
    Fit,
    /// Source center-cropped to cover the canvas exactly. No distortion.
    Fill,
    /// Source mapped onto the full canvas ignoring aspect ratio. Distorts.
    Stretch,
}

impl FromStr for ResizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fit" => Ok(Self::Fit),
            "fill" => Ok(Self::Fill),
            "stretch" => Ok(Self::Stretch),
            other => Err(format!("unknown resize mode '{other}' (fit, fill, stretch)")),
        }
    }
}

/// Quality setting for lossy image encoding (1-100). Clamped on construction,
/// so an out-of-range value from a settings file or flag can never reach an
/// encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u32::deserialize(deserializer)?;
        Ok(Self::new(raw.min(u8::MAX as u32) as u8))
    }
}

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// One responsive size slot: target width plus an on/off toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SrcsetEntry {
    pub width: u32,
    pub enabled: bool,
}

/// The four responsive size slots, smallest to largest.
///
/// Labels are fixed — they name breakpoints, not arbitrary sizes — so this is
/// a struct rather than a map. [`SrcsetSizes::enabled`] yields entries in
/// ascending width order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SrcsetSizes {
    pub small: SrcsetEntry,
    pub medium: SrcsetEntry,
    pub large: SrcsetEntry,
    pub extra_large: SrcsetEntry,
}

impl Default for SrcsetSizes {
    fn default() -> Self {
        Self {
            small: SrcsetEntry {
                width: 480,
                enabled: true,
            },
            medium: SrcsetEntry {
                width: 768,
                enabled: false,
            },
            large: SrcsetEntry {
                width: 1280,
                enabled: false,
            },
            extra_large: SrcsetEntry {
                width: 1920,
                enabled: false,
            },
        }
    }
}

impl SrcsetSizes {
    /// All slots with their labels, in declaration order.
    pub fn slots(&self) -> [(&'static str, &SrcsetEntry); 4] {
        [
            ("small", &self.small),
            ("medium", &self.medium),
            ("large", &self.large),
            ("extra_large", &self.extra_large),
        ]
    }

    /// Enabled target widths, ascending. Duplicated widths are collapsed so
    /// two slots configured to the same width produce one derivative.
    pub fn enabled_widths(&self) -> Vec<u32> {
        let mut widths: Vec<u32> = self
            .slots()
            .iter()
            .filter(|(_, e)| e.enabled)
            .map(|(_, e)| e.width)
            .collect();
        widths.sort_unstable();
        widths.dedup();
        widths
    }

    /// Enforce the "at least one size" rule: if no slot is enabled, enable
    /// the one with the smallest width.
    pub fn ensure_one_enabled(&mut self) {
        if self.slots().iter().any(|(_, e)| e.enabled) {
            return;
        }
        let smallest = [
            &mut self.small,
            &mut self.medium,
            &mut self.large,
            &mut self.extra_large,
        ]
        .into_iter()
        .min_by_key(|e| e.width);
        if let Some(entry) = smallest {
            entry.enabled = true;
        }
    }
}

/// Declarative processing settings for one batch run.
///
/// `width`/`height` are optional targets: absent means "derive from the other
/// dimension, or keep the original size". Quality is clamped to 1-100 at the
/// boundary (see [`Quality`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingSettings {
    pub format: OutputFormat,
    pub quality: Quality,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: bool,
    pub resize_mode: ResizeMode,
    /// High-quality resampling (Lanczos3) during the draw step.
    pub optimize: bool,
    pub generate_srcset: bool,
    pub srcset_sizes: SrcsetSizes,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::WebP,
            quality: Quality::default(),
            width: None,
            height: None,
            maintain_aspect_ratio: true,
            resize_mode: ResizeMode::Fit,
            optimize: true,
            generate_srcset: false,
            srcset_sizes: SrcsetSizes::default(),
        }
    }
}

impl ProcessingSettings {
    /// Load settings from a sparse TOML file. Missing keys keep defaults,
    /// unknown keys are rejected.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let mut settings: Self = toml::from_str(&content)?;
        settings.normalize();
        Ok(settings)
    }

    /// Apply invariants that cut across fields: srcset mode always has at
    /// least one enabled size.
    pub fn normalize(&mut self) {
        if self.generate_srcset {
            self.srcset_sizes.ensure_one_enabled();
        }
    }

    /// A documented stock settings file, suitable for `imgpress gen-settings`.
    pub fn stock_toml() -> String {
        let stock = Self::default();
        // to_string_pretty on the defaults, with a usage header
        let body = toml::to_string_pretty(&stock).expect("stock settings serialize");
        format!(
            "# imgpress settings — all keys optional, defaults shown.\n\
             # format: png | jpeg | webp | avif\n\
             # resize_mode: fit | fill | stretch\n\
             # width/height: omit to keep the original dimensions\n\n{body}"
        )
    }
}

/// A named settings bundle for a common use case.
///
/// Presets bind format, quality, and target dimensions; the remaining fields
/// keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub format: OutputFormat,
    pub quality: u8,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ExportPreset {
    pub fn to_settings(&self) -> ProcessingSettings {
        ProcessingSettings {
            format: self.format,
            quality: Quality::new(self.quality),
            width: self.width,
            height: self.height,
            ..ProcessingSettings::default()
        }
    }
}

/// Built-in presets, ordered roughly by how often they get reached for.
pub const PRESETS: &[ExportPreset] = &[
    ExportPreset {
        id: "avatar",
        name: "Avatar",
        description: "Profile pictures and user avatars",
        format: OutputFormat::WebP,
        quality: 90,
        width: Some(200),
        height: Some(200),
    },
    ExportPreset {
        id: "banner",
        name: "Banner",
        description: "Website headers and hero sections",
        format: OutputFormat::WebP,
        quality: 85,
        width: Some(1200),
        height: Some(400),
    },
    ExportPreset {
        id: "social-post",
        name: "Social Post",
        description: "Square format for social media posts",
        format: OutputFormat::Jpeg,
        quality: 90,
        width: Some(1080),
        height: Some(1080),
    },
    ExportPreset {
        id: "email-signature",
        name: "Email Signature",
        description: "Compact size for signatures and newsletters",
        format: OutputFormat::Png,
        quality: 95,
        width: Some(300),
        height: Some(100),
    },
    ExportPreset {
        id: "blog-thumbnail",
        name: "Blog Thumbnail",
        description: "Rectangular format for post thumbnails",
        format: OutputFormat::WebP,
        quality: 85,
        width: Some(600),
        height: Some(400),
    },
    ExportPreset {
        id: "cms-ready",
        name: "CMS Ready",
        description: "High-quality format for content management systems",
        format: OutputFormat::WebP,
        quality: 90,
        width: None,
        height: None,
    },
    ExportPreset {
        id: "favicon",
        name: "Favicon",
        description: "Small icon for browser tabs and bookmarks",
        format: OutputFormat::Png,
        quality: 100,
        width: Some(32),
        height: Some(32),
    },
    ExportPreset {
        id: "email-attachment",
        name: "Email Attachment",
        description: "Balanced quality and size for attachments",
        format: OutputFormat::Jpeg,
        quality: 75,
        width: None,
        height: None,
    },
];

/// Look up a preset by id.
pub fn find_preset(id: &str) -> Result<&'static ExportPreset, SettingsError> {
    PRESETS
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| SettingsError::UnknownPreset(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
    }

    #[test]
    fn format_parsing_accepts_jpg_alias() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn jpeg_is_the_only_opaque_format() {
        assert!(!OutputFormat::Jpeg.supports_alpha());
        assert!(OutputFormat::Png.supports_alpha());
        assert!(OutputFormat::WebP.supports_alpha());
        assert!(OutputFormat::Avif.supports_alpha());
    }

    #[test]
    fn default_settings_match_app_defaults() {
        let s = ProcessingSettings::default();
        assert_eq!(s.format, OutputFormat::WebP);
        assert_eq!(s.quality.value(), 85);
        assert_eq!(s.resize_mode, ResizeMode::Fit);
        assert!(s.maintain_aspect_ratio);
        assert!(s.optimize);
        assert!(!s.generate_srcset);
    }

    #[test]
    fn enabled_widths_sorted_and_deduped() {
        let mut sizes = SrcsetSizes::default();
        sizes.large.enabled = true;
        sizes.medium.enabled = true;
        sizes.medium.width = 480; // duplicate of small
        assert_eq!(sizes.enabled_widths(), vec![480, 1280]);
    }

    #[test]
    fn ensure_one_enabled_picks_smallest_width() {
        let mut sizes = SrcsetSizes::default();
        sizes.small.enabled = false;
        sizes.small.width = 600;
        sizes.medium.width = 320; // now the smallest slot
        sizes.ensure_one_enabled();
        assert!(sizes.medium.enabled);
        assert!(!sizes.small.enabled);
    }

    #[test]
    fn ensure_one_enabled_keeps_existing_selection() {
        let mut sizes = SrcsetSizes::default();
        sizes.large.enabled = true;
        sizes.small.enabled = false;
        sizes.ensure_one_enabled();
        assert!(!sizes.small.enabled);
        assert!(sizes.large.enabled);
    }

    #[test]
    fn normalize_forces_srcset_size_when_toggled_on() {
        let mut s = ProcessingSettings {
            generate_srcset: true,
            ..Default::default()
        };
        s.srcset_sizes.small.enabled = false;
        s.normalize();
        assert_eq!(s.srcset_sizes.enabled_widths(), vec![480]);
    }

    #[test]
    fn load_sparse_toml_overrides_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("settings.toml");
        std::fs::write(
            &path,
            "format = \"jpeg\"\nquality = 200\nwidth = 1200\nresize_mode = \"fill\"\n",
        )
        .unwrap();

        let s = ProcessingSettings::load(&path).unwrap();
        assert_eq!(s.format, OutputFormat::Jpeg);
        assert_eq!(s.quality.value(), 100); // clamped
        assert_eq!(s.width, Some(1200));
        assert_eq!(s.height, None);
        assert_eq!(s.resize_mode, ResizeMode::Fill);
        assert!(s.maintain_aspect_ratio); // untouched default
    }

    #[test]
    fn load_rejects_unknown_keys() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("settings.toml");
        std::fs::write(&path, "fromat = \"jpeg\"\n").unwrap();
        assert!(matches!(
            ProcessingSettings::load(&path),
            Err(SettingsError::Toml(_))
        ));
    }

    #[test]
    fn settings_toml_round_trip() {
        let mut s = ProcessingSettings::default();
        s.width = Some(800);
        s.generate_srcset = true;
        s.srcset_sizes.large.enabled = true;

        let toml = toml::to_string(&s).unwrap();
        let back: ProcessingSettings = toml::from_str(&toml).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn preset_lookup_and_settings() {
        let preset = find_preset("social-post").unwrap();
        let s = preset.to_settings();
        assert_eq!(s.format, OutputFormat::Jpeg);
        assert_eq!(s.quality.value(), 90);
        assert_eq!((s.width, s.height), (Some(1080), Some(1080)));

        assert!(matches!(
            find_preset("nope"),
            Err(SettingsError::UnknownPreset(_))
        ));
    }

    #[test]
    fn preset_ids_are_unique() {
        let mut ids: Vec<&str> = PRESETS.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), PRESETS.len());
    }

    #[test]
    fn stock_toml_parses_back_to_defaults() {
        let text = ProcessingSettings::stock_toml();
        let parsed: ProcessingSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, ProcessingSettings::default());
    }
}
