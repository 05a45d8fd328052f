//! Pixel work: execute a [`DrawPlan`] against a decoded source.
//!
//! This is the only place pixels are copied or resampled. The caller hands in
//! the source raster, the plan from [`geometry`](super::geometry), a
//! background, and a resampling filter; out comes a freshly allocated RGBA
//! canvas. No format knowledge lives here — the choice of white vs
//! transparent background belongs to the transform layer, which knows what
//! the output encoder can represent.

use super::geometry::DrawPlan;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

/// Canvas fill behind the drawn content. Letterbox bars and any region the
/// destination rectangle does not cover keep this color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Transparent,
    White,
}

impl Background {
    fn pixel(self) -> Rgba<u8> {
        match self {
            Self::Transparent => Rgba([0, 0, 0, 0]),
            Self::White => Rgba([255, 255, 255, 255]),
        }
    }
}

/// Resampling filter for the resize step. `HighQuality` is Lanczos3 — the
/// "smart optimization" path; `Fast` is a triangle filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    Fast,
    HighQuality,
}

impl Resampling {
    pub fn from_optimize(optimize: bool) -> Self {
        if optimize {
            Self::HighQuality
        } else {
            Self::Fast
        }
    }

    fn filter(self) -> FilterType {
        match self {
            Self::Fast => FilterType::Triangle,
            Self::HighQuality => FilterType::Lanczos3,
        }
    }
}

/// Render the plan: crop the source region, resample it to the destination
/// size, and composite it onto a background-filled canvas.
pub fn render(
    source: &DynamicImage,
    plan: &DrawPlan,
    background: Background,
    resampling: Resampling,
) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(
        plan.canvas_width,
        plan.canvas_height,
        background.pixel(),
    );

    let cropped: RgbaImage = if plan.src.x == 0
        && plan.src.y == 0
        && plan.src.width == source.width()
        && plan.src.height == source.height()
    {
        source.to_rgba8()
    } else {
        imageops::crop_imm(source, plan.src.x, plan.src.y, plan.src.width, plan.src.height)
            .to_image()
    };

    let resized = if cropped.dimensions() == (plan.dest.width, plan.dest.height) {
        cropped
    } else {
        imageops::resize(
            &cropped,
            plan.dest.width,
            plan.dest.height,
            resampling.filter(),
        )
    };

    imageops::overlay(&mut canvas, &resized, plan.dest.x as i64, plan.dest.y as i64);
    canvas
}
