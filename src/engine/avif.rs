//! AVIF input decoding.
//!
//! The `image` crate's `"avif"` feature only enables the rav1e *encoder*;
//! decoding would require `"avif-native"` and the dav1d C library. Instead
//! the container is parsed with `avif-parse` and the primary AV1 item is
//! decoded with `rav1d`, the pure Rust port of dav1d, keeping the binary
//! free of system dependencies.
//!
//! Only the primary still image is decoded — no animation, no alpha
//! auxiliary item. Output is 8-bit RGB; 10/12-bit sources are scaled down.

use super::codec::DecodeError;
use image::{DynamicImage, RgbImage};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use std::io::Cursor;
use std::ptr::NonNull;

/// Decode AVIF bytes into an 8-bit RGB raster.
pub(super) fn decode(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    let avif = avif_parse::read_avif(&mut Cursor::new(bytes))
        .map_err(|e| DecodeError::AvifContainer(format!("{e:?}")))?;
    let picture = decode_av1(&avif.primary_item)?;
    let rgb = picture.to_rgb();

    RgbImage::from_raw(picture.width, picture.height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| DecodeError::Av1("decoded plane size mismatch".into()))
}

/// A decoded frame's planes, copied out of the rav1d picture so the decoder
/// context can be torn down before conversion.
struct Frame {
    width: u32,
    height: u32,
    bits_per_component: u32,
    y: PlaneBuf,
    // None for monochrome sources
    chroma: Option<Chroma>,
}

struct PlaneBuf {
    data: Vec<u8>,
    stride: usize,
}

struct Chroma {
    u: PlaneBuf,
    v: PlaneBuf,
    subsample_x: bool,
    subsample_y: bool,
}

impl PlaneBuf {
    /// Copy `rows` rows of `row_bytes` each from a raw rav1d plane pointer.
    ///
    /// Safety: `ptr` and `stride` must describe a live plane with at least
    /// `rows` rows of `row_bytes` valid bytes each.
    unsafe fn copy_from(ptr: *const u8, stride: isize, rows: usize, row_bytes: usize) -> Self {
        let stride = stride as usize;
        let mut data = vec![0u8; rows * row_bytes];
        for row in 0..rows {
            let src = unsafe { std::slice::from_raw_parts(ptr.add(row * stride), row_bytes) };
            data[row * row_bytes..(row + 1) * row_bytes].copy_from_slice(src);
        }
        Self {
            data,
            stride: row_bytes,
        }
    }

    /// Sample one component value, handling 8-bit and 16-bit storage.
    fn sample(&self, x: u32, y: u32, bpc: u32) -> f32 {
        if bpc <= 8 {
            self.data[y as usize * self.stride + x as usize] as f32
        } else {
            let off = y as usize * self.stride + x as usize * 2;
            u16::from_le_bytes([self.data[off], self.data[off + 1]]) as f32
        }
    }
}

impl Frame {
    /// Convert to interleaved RGB8 using BT.601 coefficients, scaling high
    /// bit depths down to 8 bits.
    fn to_rgb(&self) -> Vec<u8> {
        let bpc = self.bits_per_component;
        let max_val = ((1u32 << bpc) - 1) as f32;
        let neutral = (1u32 << (bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                let luma = self.y.sample(col, row, bpc);
                let (r, g, b) = match &self.chroma {
                    None => {
                        let v = (luma * scale).clamp(0.0, 255.0);
                        (v, v, v)
                    }
                    Some(chroma) => {
                        let cx = if chroma.subsample_x { col / 2 } else { col };
                        let cy = if chroma.subsample_y { row / 2 } else { row };
                        let cb = chroma.u.sample(cx, cy, bpc) - neutral;
                        let cr = chroma.v.sample(cx, cy, bpc) - neutral;
                        (
                            ((luma + 1.402 * cr) * scale).clamp(0.0, 255.0),
                            ((luma - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                            ((luma + 1.772 * cb) * scale).clamp(0.0, 255.0),
                        )
                    }
                };
                rgb.push(r as u8);
                rgb.push(g as u8);
                rgb.push(b as u8);
            }
        }
        rgb
    }
}

/// Run the rav1d decoder over one AV1 coded item and copy out its planes.
fn decode_av1(av1_bytes: &[u8]) -> Result<Frame, DecodeError> {
    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    unsafe {
        rav1d::src::lib::dav1d_default_settings(NonNull::new(settings.as_mut_ptr()).unwrap())
    };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc =
        unsafe { rav1d::src::lib::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(DecodeError::Av1(format!("open failed ({})", rc.0)));
    }
    // From here on, every early return must close the context.
    let close = |ctx: &mut _| unsafe { rav1d::src::lib::dav1d_close(NonNull::new(ctx)) };

    let mut data = Dav1dData::default();
    let buf_ptr =
        unsafe { rav1d::src::lib::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        close(&mut ctx);
        return Err(DecodeError::Av1("data allocation failed".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    let rc = unsafe { rav1d::src::lib::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe { rav1d::src::lib::dav1d_data_unref(NonNull::new(&mut data)) };
        close(&mut ctx);
        return Err(DecodeError::Av1(format!("send_data failed ({})", rc.0)));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { rav1d::src::lib::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        close(&mut ctx);
        return Err(DecodeError::Av1(format!("get_picture failed ({})", rc.0)));
    }

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;
    let layout = pic.p.layout;
    let bytes_per_sample = if bpc <= 8 { 1 } else { 2 };

    let frame = (|| {
        let y_ptr = pic.data[0]
            .ok_or_else(|| DecodeError::Av1("missing luma plane".into()))?
            .as_ptr() as *const u8;
        let y = unsafe {
            PlaneBuf::copy_from(
                y_ptr,
                pic.stride[0],
                height as usize,
                width as usize * bytes_per_sample,
            )
        };

        let chroma = if layout == DAV1D_PIXEL_LAYOUT_I400 {
            None
        } else {
            let (ss_x, ss_y) = match layout {
                DAV1D_PIXEL_LAYOUT_I420 => (true, true),
                DAV1D_PIXEL_LAYOUT_I422 => (true, false),
                DAV1D_PIXEL_LAYOUT_I444 => (false, false),
                other => {
                    return Err(DecodeError::Av1(format!("unsupported pixel layout {other}")));
                }
            };
            let chroma_w = if ss_x { width.div_ceil(2) } else { width } as usize;
            let chroma_h = if ss_y { height.div_ceil(2) } else { height } as usize;
            let u_ptr = pic.data[1]
                .ok_or_else(|| DecodeError::Av1("missing U plane".into()))?
                .as_ptr() as *const u8;
            let v_ptr = pic.data[2]
                .ok_or_else(|| DecodeError::Av1("missing V plane".into()))?
                .as_ptr() as *const u8;
            let row_bytes = chroma_w * bytes_per_sample;
            Some(Chroma {
                u: unsafe { PlaneBuf::copy_from(u_ptr, pic.stride[1], chroma_h, row_bytes) },
                v: unsafe { PlaneBuf::copy_from(v_ptr, pic.stride[1], chroma_h, row_bytes) },
                subsample_x: ss_x,
                subsample_y: ss_y,
            })
        };

        Ok(Frame {
            width,
            height,
            bits_per_component: bpc,
            y,
            chroma,
        })
    })();

    unsafe { rav1d::src::lib::dav1d_picture_unref(NonNull::new(&mut pic)) };
    close(&mut ctx);
    frame
}
