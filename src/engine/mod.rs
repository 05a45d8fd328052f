//! The image transform engine.
//!
//! | Stage | Module |
//! |---|---|
//! | **Geometry** | [`geometry`] — pure dimension math, draw planning |
//! | **Pixels** | [`draw`] — crop, resample, composite onto a canvas |
//! | **Codecs** | [`codec`] — in-memory decode/encode; [`avif`] for AV1 input |
//! | **Contract** | [`transform`] — settings in, encoded outputs out |
//!
//! The split mirrors the data flow: callers resolve nothing themselves, they
//! hand a decoded raster and a [`ProcessingSettings`](crate::settings::ProcessingSettings)
//! to [`transform()`] and get back encoded bytes with their dimensions.

mod avif;
pub mod codec;
pub mod draw;
pub mod geometry;
pub mod transform;

pub use codec::{decode, DecodeError, EncodeError};
pub use geometry::GeometryError;
pub use transform::{transform, ProcessedImage, TransformError, SRCSET_FORMAT};
