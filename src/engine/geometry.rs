//! Pure dimension math: target resolution and draw planning.
//!
//! Nothing here touches pixels. [`resolve_dimensions`] turns optional target
//! dimensions plus a resize mode into the output canvas size;
//! [`plan_draw`] turns the canvas size plus the source dimensions into a
//! [`DrawPlan`] — which region of the source to read and where on the canvas
//! to place it. The split keeps the crop/fit/stretch math testable without
//! decoding or encoding a single image.
//!
//! Every produced dimension is validated: anything that would round to zero
//! is a [`GeometryError`], never a silent clamp. A 1x10000 source asked to
//! fit a 100-wide box is a configuration mistake the caller should hear
//! about, not a 100x0 file.

use crate::settings::ResizeMode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("source has a zero dimension ({width}x{height})")]
    EmptySource { width: u32, height: u32 },
    #[error("target {axis} of {source_width}x{source_height} at this geometry rounds to zero")]
    DegenerateTarget {
        axis: &'static str,
        source_width: u32,
        source_height: u32,
    },
}

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Where to read from the source and where to write on the canvas.
///
/// - `fill`: `src` is a centered crop matching the canvas aspect ratio,
///   `dest` covers the whole canvas.
/// - `fit`: `src` is the whole source, `dest` is a centered rectangle
///   preserving the source aspect ratio (letterbox bars stay background).
/// - `stretch`: whole source onto the whole canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawPlan {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub src: Rect,
    pub dest: Rect,
}

fn round_dim(value: f64) -> u32 {
    value.round() as u32
}

fn require_nonzero(
    value: u32,
    axis: &'static str,
    source: (u32, u32),
) -> Result<u32, GeometryError> {
    if value == 0 {
        return Err(GeometryError::DegenerateTarget {
            axis,
            source_width: source.0,
            source_height: source.1,
        });
    }
    Ok(value)
}

fn check_source(source: (u32, u32)) -> Result<(), GeometryError> {
    if source.0 == 0 || source.1 == 0 {
        return Err(GeometryError::EmptySource {
            width: source.0,
            height: source.1,
        });
    }
    Ok(())
}

/// Resolve the output canvas size from the requested geometry.
///
/// - Neither dimension given: original size (passthrough re-encode).
/// - One given with `maintain_aspect_ratio`: the other derives from the
///   source aspect ratio, rounded to nearest.
/// - One given without `maintain_aspect_ratio`: original size — there is no
///   coherent single-axis request when the ratio may change.
/// - Both given: exactly the requested box for every mode. `fit` letterboxes
///   and `fill` crops inside that box; only the [`DrawPlan`] differs.
pub fn resolve_dimensions(
    source: (u32, u32),
    target_width: Option<u32>,
    target_height: Option<u32>,
    maintain_aspect_ratio: bool,
) -> Result<(u32, u32), GeometryError> {
    check_source(source)?;
    let (orig_w, orig_h) = source;

    match (target_width, target_height) {
        (None, None) => Ok((orig_w, orig_h)),
        (Some(w), Some(h)) => {
            let w = require_nonzero(w, "width", source)?;
            let h = require_nonzero(h, "height", source)?;
            Ok((w, h))
        }
        (Some(w), None) if maintain_aspect_ratio => {
            let w = require_nonzero(w, "width", source)?;
            let h = round_dim(orig_h as f64 * (w as f64 / orig_w as f64));
            Ok((w, require_nonzero(h, "height", source)?))
        }
        (None, Some(h)) if maintain_aspect_ratio => {
            let h = require_nonzero(h, "height", source)?;
            let w = round_dim(orig_w as f64 * (h as f64 / orig_h as f64));
            Ok((require_nonzero(w, "width", source)?, h))
        }
        // Single-axis request with the ratio unlocked is underspecified;
        // keep the original size, matching the no-target case.
        _ => Ok((orig_w, orig_h)),
    }
}

/// Derive the height of a responsive derivative at `width` from the original
/// aspect ratio.
pub fn srcset_dimensions(source: (u32, u32), width: u32) -> Result<(u32, u32), GeometryError> {
    check_source(source)?;
    let width = require_nonzero(width, "width", source)?;
    let height = round_dim(source.1 as f64 * (width as f64 / source.0 as f64));
    Ok((width, require_nonzero(height, "height", source)?))
}

/// Plan the draw for a resolved canvas: which source region maps to which
/// canvas region under the given mode.
pub fn plan_draw(
    source: (u32, u32),
    canvas: (u32, u32),
    mode: ResizeMode,
) -> Result<DrawPlan, GeometryError> {
    check_source(source)?;
    check_source(canvas).map_err(|_| GeometryError::DegenerateTarget {
        axis: "canvas",
        source_width: source.0,
        source_height: source.1,
    })?;

    let (src_w, src_h) = source;
    let (canvas_w, canvas_h) = canvas;
    let src_aspect = src_w as f64 / src_h as f64;
    let canvas_aspect = canvas_w as f64 / canvas_h as f64;

    let (src, dest) = match mode {
        ResizeMode::Stretch => (Rect::full(src_w, src_h), Rect::full(canvas_w, canvas_h)),
        ResizeMode::Fill => {
            // Centered source crop matching the canvas aspect ratio. Crop the
            // axis with excess: width when the source is relatively wider,
            // height when it is relatively taller.
            let crop = if src_aspect > canvas_aspect {
                let w = require_nonzero(round_dim(src_h as f64 * canvas_aspect), "crop", source)?;
                Rect {
                    x: (src_w - w.min(src_w)) / 2,
                    y: 0,
                    width: w.min(src_w),
                    height: src_h,
                }
            } else {
                let h = require_nonzero(round_dim(src_w as f64 / canvas_aspect), "crop", source)?;
                Rect {
                    x: 0,
                    y: (src_h - h.min(src_h)) / 2,
                    width: src_w,
                    height: h.min(src_h),
                }
            };
            (crop, Rect::full(canvas_w, canvas_h))
        }
        ResizeMode::Fit => {
            // Centered destination preserving the source aspect ratio; the
            // remaining canvas stays background-filled.
            let dest = if src_aspect > canvas_aspect {
                let h = require_nonzero(round_dim(canvas_w as f64 / src_aspect), "fit", source)?;
                Rect {
                    x: 0,
                    y: (canvas_h - h.min(canvas_h)) / 2,
                    width: canvas_w,
                    height: h.min(canvas_h),
                }
            } else {
                let w = require_nonzero(round_dim(canvas_h as f64 * src_aspect), "fit", source)?;
                Rect {
                    x: (canvas_w - w.min(canvas_w)) / 2,
                    y: 0,
                    width: w.min(canvas_w),
                    height: canvas_h,
                }
            };
            (Rect::full(src_w, src_h), dest)
        }
    };

    Ok(DrawPlan {
        canvas_width: canvas_w,
        canvas_height: canvas_h,
        src,
        dest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // resolve_dimensions
    // =========================================================================

    #[test]
    fn no_targets_keeps_original() {
        assert_eq!(
            resolve_dimensions((2000, 1000), None, None, true).unwrap(),
            (2000, 1000)
        );
    }

    #[test]
    fn width_only_derives_height_from_ratio() {
        // 2000x1000, width 800 → 800x400
        assert_eq!(
            resolve_dimensions((2000, 1000), Some(800), None, true).unwrap(),
            (800, 400)
        );
    }

    #[test]
    fn height_only_derives_width_from_ratio() {
        assert_eq!(
            resolve_dimensions((2000, 1000), None, Some(400), true).unwrap(),
            (800, 400)
        );
    }

    #[test]
    fn derived_dimension_rounds_to_nearest() {
        // 3:2 source at width 100 → height 66.67 → 67
        assert_eq!(
            resolve_dimensions((300, 200), Some(100), None, true).unwrap(),
            (100, 67)
        );
    }

    #[test]
    fn single_axis_without_ratio_keeps_original() {
        assert_eq!(
            resolve_dimensions((2000, 1000), Some(800), None, false).unwrap(),
            (2000, 1000)
        );
    }

    #[test]
    fn both_targets_give_exact_box() {
        for maintain in [true, false] {
            assert_eq!(
                resolve_dimensions((2000, 1000), Some(640), Some(480), maintain).unwrap(),
                (640, 480)
            );
        }
    }

    #[test]
    fn derived_zero_height_is_an_error() {
        // 10000:1 ribbon at width 100 → height rounds to 0
        let err = resolve_dimensions((10000, 1), Some(100), None, true).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateTarget { .. }));
    }

    #[test]
    fn zero_source_is_an_error() {
        assert!(matches!(
            resolve_dimensions((0, 100), None, None, true),
            Err(GeometryError::EmptySource { .. })
        ));
    }

    #[test]
    fn explicit_zero_target_is_an_error() {
        assert!(resolve_dimensions((100, 100), Some(0), Some(50), true).is_err());
    }

    #[test]
    fn aspect_ratio_preserved_within_rounding() {
        // |derived/orig_other - requested/orig_given| < 1px of rounding
        for (src, req_w) in [((1237, 841), 640u32), ((841, 1237), 333), ((3, 7), 2)] {
            let (w, h) = resolve_dimensions(src, Some(req_w), None, true).unwrap();
            let expected_h = src.1 as f64 * (req_w as f64 / src.0 as f64);
            assert_eq!(w, req_w);
            assert!((h as f64 - expected_h).abs() <= 0.5, "{src:?} at {req_w}");
        }
    }

    // =========================================================================
    // srcset_dimensions
    // =========================================================================

    #[test]
    fn srcset_height_from_original_ratio() {
        assert_eq!(srcset_dimensions((2000, 1000), 480).unwrap(), (480, 240));
        assert_eq!(srcset_dimensions((1000, 2000), 480).unwrap(), (480, 960));
    }

    #[test]
    fn srcset_degenerate_height_is_an_error() {
        assert!(srcset_dimensions((8000, 1), 100).is_err());
    }

    // =========================================================================
    // plan_draw
    // =========================================================================

    #[test]
    fn stretch_maps_full_source_to_full_canvas() {
        let plan = plan_draw((2000, 1000), (640, 480), ResizeMode::Stretch).unwrap();
        assert_eq!(plan.src, Rect::full(2000, 1000));
        assert_eq!(plan.dest, Rect::full(640, 480));
    }

    #[test]
    fn fill_wider_source_crops_width_centered() {
        // 2000x1000 into 800x800 → crop the middle 1000x1000 of the source.
        let plan = plan_draw((2000, 1000), (800, 800), ResizeMode::Fill).unwrap();
        assert_eq!(
            plan.src,
            Rect {
                x: 500,
                y: 0,
                width: 1000,
                height: 1000
            }
        );
        assert_eq!(plan.dest, Rect::full(800, 800));
    }

    #[test]
    fn fill_taller_source_crops_height_centered() {
        let plan = plan_draw((1000, 2000), (800, 800), ResizeMode::Fill).unwrap();
        assert_eq!(
            plan.src,
            Rect {
                x: 0,
                y: 500,
                width: 1000,
                height: 1000
            }
        );
    }

    #[test]
    fn fill_matching_aspect_needs_no_crop() {
        let plan = plan_draw((1600, 1200), (800, 600), ResizeMode::Fill).unwrap();
        assert_eq!(plan.src, Rect::full(1600, 1200));
    }

    #[test]
    fn fit_wider_source_letterboxes_top_and_bottom() {
        let plan = plan_draw((2000, 1000), (800, 800), ResizeMode::Fit).unwrap();
        assert_eq!(plan.src, Rect::full(2000, 1000));
        assert_eq!(
            plan.dest,
            Rect {
                x: 0,
                y: 200,
                width: 800,
                height: 400
            }
        );
        // Symmetric padding
        assert_eq!(plan.dest.y, plan.canvas_height - plan.dest.height - plan.dest.y);
    }

    #[test]
    fn fit_taller_source_letterboxes_left_and_right() {
        let plan = plan_draw((1000, 2000), (800, 800), ResizeMode::Fit).unwrap();
        assert_eq!(
            plan.dest,
            Rect {
                x: 200,
                y: 0,
                width: 400,
                height: 800
            }
        );
    }

    #[test]
    fn fit_content_preserves_source_aspect() {
        let plan = plan_draw((1237, 841), (640, 480), ResizeMode::Fit).unwrap();
        let content_aspect = plan.dest.width as f64 / plan.dest.height as f64;
        let src_aspect = 1237.0 / 841.0;
        assert!((content_aspect - src_aspect).abs() < 0.01);
    }

    #[test]
    fn extreme_ribbon_fit_is_an_error_not_a_zero_rect() {
        assert!(plan_draw((10000, 1), (100, 100), ResizeMode::Fit).is_err());
    }
}
