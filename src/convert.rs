//! Pixel Format Conversion
//!
//! Pure conversion routines between the formats in [`PixelFormat`].
//! Conversions never mutate the source frame and always allocate the
//! destination buffer.
//!
//! RGB/YUV transforms use the BT.601 studio-swing matrix in 8.8 fixed
//! point with a rounding bias; round-trip error for reversible pairs stays
//! within ±2 per 8-bit channel. Chroma is averaged on downsampling (2x2
//! blocks for 4:2:0, horizontal pairs for 4:2:2) and replicated on
//! upsampling. Grayscale sources promoted to a chroma-bearing format get
//! their chroma planes filled with the neutral value 128.

use crate::error::{CameraError, Result};
use crate::frame::{Frame, PixelFormat};

/// Byte layout of a packed RGB-family format
#[derive(Clone, Copy)]
struct PackedLayout {
    bpp: usize,
    r: usize,
    g: usize,
    b: usize,
    a: Option<usize>,
}

fn packed_layout(format: PixelFormat) -> Option<PackedLayout> {
    match format {
        PixelFormat::Rgb => Some(PackedLayout { bpp: 3, r: 0, g: 1, b: 2, a: None }),
        PixelFormat::Bgr => Some(PackedLayout { bpp: 3, r: 2, g: 1, b: 0, a: None }),
        PixelFormat::Rgba => Some(PackedLayout { bpp: 4, r: 0, g: 1, b: 2, a: Some(3) }),
        PixelFormat::Bgra => Some(PackedLayout { bpp: 4, r: 2, g: 1, b: 0, a: Some(3) }),
        _ => None,
    }
}

// BT.601 studio swing, 8.8 fixed point with rounding bias.
#[inline]
fn luma_from_rgb(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8
}

#[inline]
fn chroma_from_rgb(r: u8, g: u8, b: u8) -> (u8, u8) {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let u = (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128) as u8;
    let v = (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128) as u8;
    (u, v)
}

#[inline]
fn rgb_from_yuv(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;
    (clamp_u8(r), clamp_u8(g), clamp_u8(b))
}

// Full-range luma for the single-channel GRAY format.
#[inline]
fn gray_from_rgb(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    ((77 * r + 150 * g + 29 * b + 128) >> 8) as u8
}

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Neutral chroma value used when a source has no chroma channel
pub const NEUTRAL_CHROMA: u8 = 128;

/// Whether a conversion path between two formats is defined
pub fn supported(from: PixelFormat, to: PixelFormat) -> bool {
    use PixelFormat::*;
    if from == to {
        return true;
    }
    let from_packed = packed_layout(from).is_some();
    let to_packed = packed_layout(to).is_some();
    match (from, to) {
        _ if from_packed && to_packed => true,
        (Gray, _) if to_packed => true,
        (_, Gray) if from_packed => true,
        (_, I420 | Nv12 | Yuyv | Uyvy) if from_packed => true,
        (Gray, I420 | Nv12 | Yuyv | Uyvy) => true,
        (I420, Nv12) | (Nv12, I420) => true,
        (Yuyv, Uyvy) | (Uyvy, Yuyv) => true,
        (I420 | Nv12, _) if to_packed => true,
        _ => false,
    }
}

/// Convert a frame to a different pixel format
///
/// Identical formats pass through as a plain copy. Fails with
/// [`CameraError::UnsupportedConversion`] when no path is defined between
/// the two formats and with [`CameraError::ShapeMismatch`] when a
/// chroma-subsampled format is asked for at odd dimensions.
pub fn convert(src: &Frame, target: PixelFormat) -> Result<Frame> {
    use PixelFormat::*;

    let width = src.width();
    let height = src.height();

    if src.format() == target {
        return Frame::from_data(width, height, target, src.data().to_vec());
    }

    check_subsampled_dims(src.format(), width, height)?;
    check_subsampled_dims(target, width, height)?;

    let from_layout = packed_layout(src.format());
    let to_layout = packed_layout(target);

    let data = match (src.format(), target) {
        _ if from_layout.is_some() && to_layout.is_some() => {
            permute_packed(src, from_layout.unwrap(), to_layout.unwrap())
        }
        (Gray, _) if to_layout.is_some() => gray_to_packed(src, to_layout.unwrap()),
        (_, Gray) if from_layout.is_some() => packed_to_gray(src, from_layout.unwrap()),
        (_, I420) if from_layout.is_some() => packed_to_planar(src, from_layout.unwrap(), false),
        (_, Nv12) if from_layout.is_some() => packed_to_planar(src, from_layout.unwrap(), true),
        (_, Yuyv) if from_layout.is_some() => packed_to_422(src, from_layout.unwrap(), false),
        (_, Uyvy) if from_layout.is_some() => packed_to_422(src, from_layout.unwrap(), true),
        // chroma planes are uniform, so the I420 and NV12 layouts coincide
        (Gray, I420) | (Gray, Nv12) => gray_to_planar(src),
        (Gray, Yuyv) => gray_to_422(src, false),
        (Gray, Uyvy) => gray_to_422(src, true),
        (I420, Nv12) => i420_to_nv12(src),
        (Nv12, I420) => nv12_to_i420(src),
        (Yuyv, Uyvy) | (Uyvy, Yuyv) => swap_422(src),
        (I420, _) if to_layout.is_some() => planar_to_packed(src, to_layout.unwrap(), false),
        (Nv12, _) if to_layout.is_some() => planar_to_packed(src, to_layout.unwrap(), true),
        (from, to) => return Err(CameraError::UnsupportedConversion { from, to }),
    };

    Frame::from_data(width, height, target, data)
}

fn check_subsampled_dims(format: PixelFormat, width: u32, height: u32) -> Result<()> {
    if !format.is_chroma_subsampled() {
        return Ok(());
    }
    let needs_even_height = matches!(format, PixelFormat::I420 | PixelFormat::Nv12);
    if width % 2 != 0 || (needs_even_height && height % 2 != 0) {
        return Err(CameraError::shape_mismatch(format!(
            "{} requires even dimensions, got {}x{}",
            format, width, height
        )));
    }
    Ok(())
}

fn permute_packed(src: &Frame, from: PackedLayout, to: PackedLayout) -> Vec<u8> {
    let pixels = src.width() as usize * src.height() as usize;
    let input = src.data();
    let mut out = vec![0u8; pixels * to.bpp];

    for i in 0..pixels {
        let s = i * from.bpp;
        let d = i * to.bpp;
        out[d + to.r] = input[s + from.r];
        out[d + to.g] = input[s + from.g];
        out[d + to.b] = input[s + from.b];
        if let Some(da) = to.a {
            out[d + da] = match from.a {
                Some(sa) => input[s + sa],
                None => 255,
            };
        }
    }
    out
}

fn gray_to_packed(src: &Frame, to: PackedLayout) -> Vec<u8> {
    let pixels = src.width() as usize * src.height() as usize;
    let input = src.data();
    let mut out = vec![0u8; pixels * to.bpp];

    for i in 0..pixels {
        let d = i * to.bpp;
        let v = input[i];
        out[d + to.r] = v;
        out[d + to.g] = v;
        out[d + to.b] = v;
        if let Some(da) = to.a {
            out[d + da] = 255;
        }
    }
    out
}

fn packed_to_gray(src: &Frame, from: PackedLayout) -> Vec<u8> {
    let pixels = src.width() as usize * src.height() as usize;
    let input = src.data();
    let mut out = vec![0u8; pixels];

    for i in 0..pixels {
        let s = i * from.bpp;
        out[i] = gray_from_rgb(input[s + from.r], input[s + from.g], input[s + from.b]);
    }
    out
}

fn packed_to_planar(src: &Frame, from: PackedLayout, semi: bool) -> Vec<u8> {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let input = src.data();
    let mut out = vec![0u8; w * h * 3 / 2];

    // Y plane
    for i in 0..w * h {
        let s = i * from.bpp;
        out[i] = luma_from_rgb(input[s + from.r], input[s + from.g], input[s + from.b]);
    }

    // Chroma from 2x2 block averages
    let half_w = w / 2;
    for by in (0..h).step_by(2) {
        for bx in (0..w).step_by(2) {
            let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
            for dy in 0..2 {
                for dx in 0..2 {
                    let s = ((by + dy) * w + bx + dx) * from.bpp;
                    r += input[s + from.r] as u32;
                    g += input[s + from.g] as u32;
                    b += input[s + from.b] as u32;
                }
            }
            let (u, v) = chroma_from_rgb(
                ((r + 2) / 4) as u8,
                ((g + 2) / 4) as u8,
                ((b + 2) / 4) as u8,
            );
            let cy = by / 2;
            let cx = bx / 2;
            if semi {
                out[w * h + cy * w + 2 * cx] = u;
                out[w * h + cy * w + 2 * cx + 1] = v;
            } else {
                out[w * h + cy * half_w + cx] = u;
                out[w * h + half_w * (h / 2) + cy * half_w + cx] = v;
            }
        }
    }
    out
}

fn packed_to_422(src: &Frame, from: PackedLayout, uyvy: bool) -> Vec<u8> {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let input = src.data();
    let mut out = vec![0u8; w * h * 2];

    for row in 0..h {
        for pair in 0..w / 2 {
            let s0 = (row * w + pair * 2) * from.bpp;
            let s1 = s0 + from.bpp;
            let y0 = luma_from_rgb(input[s0 + from.r], input[s0 + from.g], input[s0 + from.b]);
            let y1 = luma_from_rgb(input[s1 + from.r], input[s1 + from.g], input[s1 + from.b]);

            // Chroma from the horizontal pair average
            let r = (input[s0 + from.r] as u32 + input[s1 + from.r] as u32 + 1) / 2;
            let g = (input[s0 + from.g] as u32 + input[s1 + from.g] as u32 + 1) / 2;
            let b = (input[s0 + from.b] as u32 + input[s1 + from.b] as u32 + 1) / 2;
            let (u, v) = chroma_from_rgb(r as u8, g as u8, b as u8);

            let d = (row * w + pair * 2) * 2;
            if uyvy {
                out[d] = u;
                out[d + 1] = y0;
                out[d + 2] = v;
                out[d + 3] = y1;
            } else {
                out[d] = y0;
                out[d + 1] = u;
                out[d + 2] = y1;
                out[d + 3] = v;
            }
        }
    }
    out
}

fn gray_to_planar(src: &Frame) -> Vec<u8> {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let mut out = vec![NEUTRAL_CHROMA; w * h * 3 / 2];
    out[..w * h].copy_from_slice(src.data());
    out
}

fn gray_to_422(src: &Frame, uyvy: bool) -> Vec<u8> {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let input = src.data();
    let mut out = vec![NEUTRAL_CHROMA; w * h * 2];

    let y_off = if uyvy { 1 } else { 0 };
    for i in 0..w * h {
        out[i * 2 + y_off] = input[i];
    }
    out
}

fn i420_to_nv12(src: &Frame) -> Vec<u8> {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let input = src.data();
    let mut out = vec![0u8; w * h * 3 / 2];

    out[..w * h].copy_from_slice(&input[..w * h]);
    let chroma = w * h / 4;
    for i in 0..chroma {
        out[w * h + 2 * i] = input[w * h + i];
        out[w * h + 2 * i + 1] = input[w * h + chroma + i];
    }
    out
}

fn nv12_to_i420(src: &Frame) -> Vec<u8> {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let input = src.data();
    let mut out = vec![0u8; w * h * 3 / 2];

    out[..w * h].copy_from_slice(&input[..w * h]);
    let chroma = w * h / 4;
    for i in 0..chroma {
        out[w * h + i] = input[w * h + 2 * i];
        out[w * h + chroma + i] = input[w * h + 2 * i + 1];
    }
    out
}

fn swap_422(src: &Frame) -> Vec<u8> {
    let input = src.data();
    let mut out = vec![0u8; input.len()];
    // YUYV <-> UYVY is a byte swap within each 16-bit pair
    for i in 0..input.len() {
        out[i] = input[i ^ 1];
    }
    out
}

fn planar_to_packed(src: &Frame, to: PackedLayout, semi: bool) -> Vec<u8> {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let input = src.data();
    let mut out = vec![0u8; w * h * to.bpp];

    let half_w = w / 2;
    let u_off = w * h;
    let v_off = w * h + half_w * (h / 2);

    for row in 0..h {
        for col in 0..w {
            let y = input[row * w + col];
            let cy = row / 2;
            let cx = col / 2;
            let (u, v) = if semi {
                (
                    input[w * h + cy * w + 2 * cx],
                    input[w * h + cy * w + 2 * cx + 1],
                )
            } else {
                (input[u_off + cy * half_w + cx], input[v_off + cy * half_w + cx])
            };
            let (r, g, b) = rgb_from_yuv(y, u, v);
            let d = (row * w + col) * to.bpp;
            out[d + to.r] = r;
            out[d + to.g] = g;
            out[d + to.b] = b;
            if let Some(da) = to.a {
                out[d + da] = 255;
            }
        }
    }
    out
}
