//! The transform: one decoded raster + settings → encoded outputs.
//!
//! This is the public face of the engine. It is a pure function per
//! invocation — no shared state, no I/O, no retries. Single mode produces
//! exactly one output; srcset mode produces one per enabled size. Failure
//! modes are geometry (a target dimension degenerates to zero) and encoding;
//! decode problems belong to the caller, which hands in an already-decoded
//! image.

use super::codec::{self, EncodeError};
use super::draw::{self, Background, Resampling};
use super::geometry::{self, GeometryError};
use crate::settings::{OutputFormat, ProcessingSettings, ResizeMode};
use image::DynamicImage;
use thiserror::Error;

/// Responsive derivatives are always encoded in one modern format, whatever
/// the primary format setting says. Varying format per size would corrupt
/// the srcset contract.
pub const SRCSET_FORMAT: OutputFormat = OutputFormat::WebP;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// One encoded output raster.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// Filename suffix distinguishing a derivative (e.g. `-480w`). `None`
    /// for single-mode output.
    pub name_suffix: Option<String>,
}

impl ProcessedImage {
    /// Encoded byte length.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Transform one decoded image according to the settings.
///
/// Returns one result in single mode, one per enabled srcset size in srcset
/// mode. The settings' at-least-one-size invariant is enforced by
/// [`ProcessingSettings::normalize`]; an empty srcset here would mean the
/// caller skipped normalization, and yields an empty vec rather than a panic.
pub fn transform(
    image: &DynamicImage,
    settings: &ProcessingSettings,
) -> Result<Vec<ProcessedImage>, TransformError> {
    let source = (image.width(), image.height());

    if settings.generate_srcset {
        let mut results = Vec::new();
        for width in settings.srcset_sizes.enabled_widths() {
            results.push(render_derivative(image, source, width, settings)?);
        }
        return Ok(results);
    }

    let canvas = geometry::resolve_dimensions(
        source,
        settings.width,
        settings.height,
        settings.maintain_aspect_ratio,
    )?;
    let plan = geometry::plan_draw(source, canvas, settings.resize_mode)?;
    let background = background_for(settings.format);
    let pixels = draw::render(
        image,
        &plan,
        background,
        Resampling::from_optimize(settings.optimize),
    );
    let bytes = codec::encode(&pixels, settings.format, settings.quality)?;

    Ok(vec![ProcessedImage {
        bytes,
        width: canvas.0,
        height: canvas.1,
        format: settings.format,
        name_suffix: None,
    }])
}

/// Render one responsive derivative at the given width.
///
/// Height always derives from the original image's aspect ratio. The canvas
/// already matches that ratio, so the draw is a full-source mapping — no
/// crop, no letterbox, regardless of the configured resize mode.
fn render_derivative(
    image: &DynamicImage,
    source: (u32, u32),
    width: u32,
    settings: &ProcessingSettings,
) -> Result<ProcessedImage, TransformError> {
    let canvas = geometry::srcset_dimensions(source, width)?;
    let plan = geometry::plan_draw(source, canvas, ResizeMode::Stretch)?;
    let pixels = draw::render(
        image,
        &plan,
        background_for(SRCSET_FORMAT),
        Resampling::from_optimize(settings.optimize),
    );
    let bytes = codec::encode(&pixels, SRCSET_FORMAT, settings.quality)?;

    Ok(ProcessedImage {
        bytes,
        width: canvas.0,
        height: canvas.1,
        format: SRCSET_FORMAT,
        name_suffix: Some(format!("-{width}w")),
    })
}

fn background_for(format: OutputFormat) -> Background {
    if format.supports_alpha() {
        Background::Transparent
    } else {
        Background::White
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Quality;
    use image::{Rgba, RgbaImage};

    fn source(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 251) as u8, (y % 241) as u8, 90, 255])
        }))
    }

    fn settings() -> ProcessingSettings {
        ProcessingSettings {
            quality: Quality::new(85),
            ..ProcessingSettings::default()
        }
    }

    #[test]
    fn single_mode_produces_exactly_one_result() {
        let img = source(100, 80);
        let results = transform(&img, &settings()).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].name_suffix.is_none());
        assert!(results[0].size() > 0);
    }

    #[test]
    fn passthrough_keeps_original_dimensions() {
        let img = source(123, 77);
        let results = transform(&img, &settings()).unwrap();
        assert_eq!((results[0].width, results[0].height), (123, 77));
    }

    #[test]
    fn width_only_fit_derives_height() {
        // 2000x1000, webp q85, width 800, keep ratio, fit → exactly 800x400
        let img = source(2000, 1000);
        let s = ProcessingSettings {
            width: Some(800),
            ..settings()
        };
        let results = transform(&img, &s).unwrap();
        assert_eq!((results[0].width, results[0].height), (800, 400));
        assert_eq!(results[0].format, OutputFormat::WebP);
    }

    #[test]
    fn fill_into_square_canvas() {
        // 2000x1000 into fill 800x800 → exactly 800x800
        let img = source(2000, 1000);
        let s = ProcessingSettings {
            width: Some(800),
            height: Some(800),
            resize_mode: ResizeMode::Fill,
            ..settings()
        };
        let results = transform(&img, &s).unwrap();
        assert_eq!((results[0].width, results[0].height), (800, 800));
    }

    #[test]
    fn stretch_ignores_aspect_ratio() {
        let img = source(500, 500);
        let s = ProcessingSettings {
            width: Some(300),
            height: Some(100),
            resize_mode: ResizeMode::Stretch,
            maintain_aspect_ratio: false,
            ..settings()
        };
        let results = transform(&img, &s).unwrap();
        assert_eq!((results[0].width, results[0].height), (300, 100));
    }

    #[test]
    fn output_decodes_to_recorded_dimensions() {
        let img = source(640, 360);
        let s = ProcessingSettings {
            width: Some(320),
            ..settings()
        };
        let results = transform(&img, &s).unwrap();
        let out = &results[0];
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (out.width, out.height));
    }

    #[test]
    fn jpeg_letterbox_bars_are_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            200,
            100,
            Rgba([10, 10, 10, 255]),
        ));
        let s = ProcessingSettings {
            format: OutputFormat::Jpeg,
            width: Some(100),
            height: Some(100),
            resize_mode: ResizeMode::Fit,
            ..settings()
        };
        let results = transform(&img, &s).unwrap();
        let decoded = image::load_from_memory(&results[0].bytes).unwrap().to_rgb8();
        // Top bar (content occupies the middle 50 rows)
        let bar = decoded.get_pixel(50, 5);
        assert!(bar[0] > 240 && bar[1] > 240 && bar[2] > 240);
        // Content region is dark
        let content = decoded.get_pixel(50, 50);
        assert!(content[0] < 40);
    }

    #[test]
    fn idempotent_for_identical_input() {
        let img = source(300, 200);
        let s = ProcessingSettings {
            width: Some(150),
            ..settings()
        };
        let a = transform(&img, &s).unwrap();
        let b = transform(&img, &s).unwrap();
        assert_eq!(a[0].bytes, b[0].bytes);
        assert_eq!((a[0].width, a[0].height), (b[0].width, b[0].height));
    }

    #[test]
    fn degenerate_geometry_is_an_error() {
        let img = source(4000, 1);
        let s = ProcessingSettings {
            width: Some(100),
            ..settings()
        };
        assert!(matches!(
            transform(&img, &s),
            Err(TransformError::Geometry(_))
        ));
    }

    // =========================================================================
    // srcset mode
    // =========================================================================

    fn srcset_settings(widths: &[(u32, bool)]) -> ProcessingSettings {
        let mut s = ProcessingSettings {
            generate_srcset: true,
            ..settings()
        };
        let slots = [
            &mut s.srcset_sizes.small,
            &mut s.srcset_sizes.medium,
            &mut s.srcset_sizes.large,
            &mut s.srcset_sizes.extra_large,
        ];
        for (slot, &(width, enabled)) in slots.into_iter().zip(widths) {
            slot.width = width;
            slot.enabled = enabled;
        }
        s
    }

    #[test]
    fn srcset_one_result_per_enabled_size() {
        let img = source(2000, 1000);
        let s = srcset_settings(&[(480, true), (768, false), (1280, true), (1920, false)]);
        let results = transform(&img, &s).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name_suffix.as_deref(), Some("-480w"));
        assert_eq!(results[1].name_suffix.as_deref(), Some("-1280w"));
        assert_eq!((results[0].width, results[0].height), (480, 240));
        assert_eq!((results[1].width, results[1].height), (1280, 640));
    }

    #[test]
    fn srcset_always_encodes_webp() {
        let img = source(1000, 800);
        let mut s = srcset_settings(&[(480, true), (768, true), (1280, false), (1920, false)]);
        s.format = OutputFormat::Jpeg; // primary format must not leak through
        let results = transform(&img, &s).unwrap();

        for r in &results {
            assert_eq!(r.format, OutputFormat::WebP);
            let decoded = image::load_from_memory(&r.bytes).unwrap();
            assert_eq!(decoded.width(), r.width);
        }
    }

    #[test]
    fn srcset_heights_derive_from_original_ratio() {
        // Portrait source: every derivative keeps the 1:2 ratio.
        let img = source(500, 1000);
        let s = srcset_settings(&[(100, true), (250, true), (1280, false), (1920, false)]);
        let results = transform(&img, &s).unwrap();

        assert_eq!((results[0].width, results[0].height), (100, 200));
        assert_eq!((results[1].width, results[1].height), (250, 500));
    }
}
