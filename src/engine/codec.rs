//! In-memory decode and encode.
//!
//! Both directions work on byte buffers, never on files — the batch layer
//! owns all I/O. Decode and encode failures are distinct types so the batch
//! report can tell "this file is not a valid image" apart from "the encoder
//! refused to produce output".
//!
//! ## Format support
//!
//! | Format | Decode | Encode | Quality honored |
//! |--------|--------|--------|-----------------|
//! | JPEG   | `image` | `image` (RGB, white-flattened) | yes |
//! | PNG    | `image` | `image` | no (lossless) |
//! | WebP   | `image` | `image` (lossless only) | no |
//! | AVIF   | `avif-parse` + `rav1d` | `image` (rav1e, speed 6) | yes |
//! | SVG    | rejected — no rasterizer in this build | — | — |

use crate::settings::{OutputFormat, Quality};
use crate::validate::SourceKind;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageEncoder, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to decode image: {0}")]
    Malformed(String),
    #[error("SVG sources cannot be rasterized by this build")]
    SvgUnsupported,
    #[error("failed to parse AVIF container: {0}")]
    AvifContainer(String),
    #[error("AV1 decode failed: {0}")]
    Av1(String),
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{format} encode failed: {reason}")]
    EncoderFailed { format: OutputFormat, reason: String },
}

/// Decode source bytes of a validated kind into a raster.
pub fn decode(bytes: &[u8], kind: SourceKind) -> Result<DynamicImage, DecodeError> {
    match kind {
        SourceKind::Svg => Err(DecodeError::SvgUnsupported),
        SourceKind::Avif => super::avif::decode(bytes),
        SourceKind::Jpeg | SourceKind::Png | SourceKind::WebP => {
            image::load_from_memory(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
        }
    }
}

/// Encode a drawn RGBA canvas to the requested format.
///
/// Quality applies to JPEG and AVIF; PNG and the pure-Rust WebP encoder are
/// lossless and ignore it. JPEG cannot carry alpha, so the canvas is
/// flattened to RGB — the draw step has already filled the background white
/// for opaque formats.
pub fn encode(
    canvas: &RgbaImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Cursor::new(Vec::new());
    let (width, height) = canvas.dimensions();
    let failed = |e: image::ImageError| EncodeError::EncoderFailed {
        format,
        reason: e.to_string(),
    };

    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut buf)
                .write_image(canvas.as_raw(), width, height, image::ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality.value())
                .write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
                .map_err(failed)?;
        }
        OutputFormat::WebP => {
            WebPEncoder::new_lossless(&mut buf)
                .write_image(canvas.as_raw(), width, height, image::ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
        OutputFormat::Avif => {
            AvifEncoder::new_with_speed_quality(&mut buf, 6, quality.value())
                .write_image(canvas.as_raw(), width, height, image::ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
    }

    let bytes = buf.into_inner();
    if bytes.is_empty() {
        return Err(EncodeError::EncoderFailed {
            format,
            reason: "encoder produced no output".into(),
        });
    }
    Ok(bytes)
}
