//! # imgpress
//!
//! A batch image optimizer: decode, resize, re-encode, and export images for
//! the web. Point it at a set of photos, pick a format/quality/size, and it
//! produces optimized copies — individually named or bundled into an export
//! set with a machine-readable summary.
//!
//! # Architecture: Engine + Callers
//!
//! The heart of the crate is the [`engine`] module — a pure transformation
//! from one decoded raster plus a [`settings::ProcessingSettings`] to one or
//! more encoded outputs. Everything else is a caller:
//!
//! ```text
//! 1. Validate   source bytes  →  accepted kind    (MIME sniff + size cap)
//! 2. Transform  raster        →  encoded outputs  (geometry → draw → encode)
//! 3. Export     outputs       →  named entries    (+ export_info.json)
//! ```
//!
//! This separation exists for three reasons:
//!
//! - **Testability**: geometry planning, pixel work, and encoding are separate
//!   units, so the crop/fit/stretch math is tested without encoding a single
//!   byte.
//! - **Batch resilience**: the engine is a pure function per image; the batch
//!   loop owns all failure handling, so one corrupt file never aborts its
//!   siblings.
//! - **Reuse**: the CLI is a thin caller. Any other front end (a service, a
//!   GUI) drives the same library surface.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`settings`] | Processing settings, output formats, quality clamping, named presets |
//! | [`engine`] | The transform: dimension math, draw plans, pixel work, codecs |
//! | [`validate`] | Source-file acceptance: MIME sniffing and the 50 MB size cap |
//! | [`batch`] | Parallel batch runner with per-item failure isolation and progress events |
//! | [`export`] | Output naming, human-readable stats, `export_info.json`, archive sink |
//! | [`output`] | CLI output formatting — pure `format_*` functions, `print_*` wrappers |
//!
//! # Design Decisions
//!
//! ## Fixed-Canvas Fit
//!
//! When both target dimensions are given, `fit` mode always produces a canvas
//! of exactly the requested size with the scaled image centered inside it
//! (letterboxed). The alternative — shrinking the canvas to the fitted
//! content — makes batch output dimensions depend on each source's aspect
//! ratio, which defeats the point of requesting fixed dimensions. Letterbox
//! bars are white for opaque formats and transparent for alpha-capable ones.
//!
//! ## Srcset Is Always WebP
//!
//! Responsive derivatives are encoded as WebP regardless of the primary
//! format setting. A srcset that silently mixes formats per size is a
//! delivery hazard; one modern format for every derivative keeps the
//! generated `srcset` attribute honest. Derivative heights always come from
//! the *original* image's aspect ratio, never from another derivative.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate, with AVIF input handled by
//! `avif-parse` + `rav1d` (a pure Rust port of dav1d). No ImageMagick, no
//! libvips, no system dependencies: the binary is fully self-contained.
//!
//! ## Per-Item Failure Isolation
//!
//! Validation, decode, and encode failures are all per-image. The batch
//! report carries successes and failures side by side, and the export step
//! only ever sees the successes. There are no retries — a failed image is
//! reported, not re-attempted.

pub mod batch;
pub mod engine;
pub mod export;
pub mod output;
pub mod settings;
pub mod validate;
