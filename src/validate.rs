//! Source-file acceptance, ahead of the engine.
//!
//! Two checks, both caller-side: the byte budget (50 MB per file) and the
//! content type. Type detection sniffs magic bytes rather than trusting
//! extensions — a `.png` full of JPEG bytes is a JPEG. SVG is accepted here
//! (it is a supported *source* type) even though the current build cannot
//! rasterize it; rejecting it at decode time keeps the error per-image
//! rather than hiding the file from the batch entirely.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-file source size cap.
pub const MAX_SOURCE_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum SourceValidationError {
    #[error("{path}: unsupported file format")]
    UnsupportedType { path: PathBuf },
    #[error("{path}: file size {size} exceeds the 50MB limit")]
    TooLarge { path: PathBuf, size: u64 },
}

/// Accepted source content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Jpeg,
    Png,
    WebP,
    Svg,
    Avif,
}

impl SourceKind {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Svg => "image/svg+xml",
            Self::Avif => "image/avif",
        }
    }
}

/// Sniff the content type from the first bytes of the file.
fn sniff(bytes: &[u8]) -> Option<SourceKind> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(SourceKind::Jpeg);
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(SourceKind::Png);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(SourceKind::WebP);
    }
    // ISO-BMFF: size + "ftyp" + brand
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && &bytes[8..12] == b"avif" {
        return Some(SourceKind::Avif);
    }
    // SVG is text; look for the root tag in a reasonable prefix, tolerating
    // an XML declaration and leading whitespace/comments.
    let head = &bytes[..bytes.len().min(1024)];
    if let Ok(text) = std::str::from_utf8(head) {
        let trimmed = text.trim_start();
        if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && text.contains("<svg")) {
            return Some(SourceKind::Svg);
        }
    }
    None
}

/// Validate source bytes: size cap, then content sniff.
pub fn validate_source(path: &Path, bytes: &[u8]) -> Result<SourceKind, SourceValidationError> {
    let size = bytes.len() as u64;
    if size > MAX_SOURCE_BYTES {
        return Err(SourceValidationError::TooLarge {
            path: path.to_path_buf(),
            size,
        });
    }
    sniff(bytes).ok_or_else(|| SourceValidationError::UnsupportedType {
        path: path.to_path_buf(),
    })
}

/// Extensions worth picking up when scanning a directory for inputs.
pub const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "svg", "avif"];

/// Whether a path looks like a candidate input by extension. Only a
/// pre-filter for directory scans; real acceptance is [`validate_source`].
pub fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| INPUT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}
