//! Frame Types
//!
//! Defines the pixel format tags and the shape-checked frame buffer that
//! travels through the delivery pipeline.

use std::fmt;

use crate::error::{CameraError, Result};

/// Pixel format of a video frame
///
/// Identifies the byte layout and channel semantics of a frame buffer.
/// Every format has a fixed, computable byte size for a given geometry,
/// reported by [`PixelFormat::frame_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Packed RGB, 8 bits per channel
    Rgb,
    /// Packed BGR, 8 bits per channel
    Bgr,
    /// Packed RGBA, 8 bits per channel
    Rgba,
    /// Packed BGRA, 8 bits per channel
    Bgra,
    /// Single-channel full-range luma
    Gray,
    /// YUV 4:2:0 planar (Y, then U, then V plane)
    I420,
    /// YUV 4:2:0 semi-planar (Y plane, then interleaved UV plane)
    Nv12,
    /// YUV 4:2:2 packed, Y0 U Y1 V byte order
    Yuyv,
    /// YUV 4:2:2 packed, U Y0 V Y1 byte order
    Uyvy,
}

impl PixelFormat {
    /// Calculate the exact buffer size in bytes for a frame
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => pixels * 3,
            PixelFormat::Rgba | PixelFormat::Bgra => pixels * 4,
            PixelFormat::Gray => pixels,
            PixelFormat::I420 | PixelFormat::Nv12 => pixels * 3 / 2,
            PixelFormat::Yuyv | PixelFormat::Uyvy => pixels * 2,
        }
    }

    /// Average bytes per pixel (exact for packed formats)
    pub fn bytes_per_pixel(&self) -> f64 {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3.0,
            PixelFormat::Rgba | PixelFormat::Bgra => 4.0,
            PixelFormat::Gray => 1.0,
            PixelFormat::I420 | PixelFormat::Nv12 => 1.5,
            PixelFormat::Yuyv | PixelFormat::Uyvy => 2.0,
        }
    }

    /// Canonical four-character code for this format
    pub fn fourcc_bytes(&self) -> [u8; 4] {
        match self {
            PixelFormat::Rgb => *b"RGB3",
            PixelFormat::Bgr => *b"BGR3",
            PixelFormat::Rgba => *b"AB24",
            PixelFormat::Bgra => *b"AR24",
            PixelFormat::Gray => *b"GREY",
            PixelFormat::I420 => *b"I420",
            PixelFormat::Nv12 => *b"NV12",
            PixelFormat::Yuyv => *b"YUYV",
            PixelFormat::Uyvy => *b"UYVY",
        }
    }

    /// Canonical four-character code as a little-endian u32
    pub fn fourcc(&self) -> u32 {
        u32::from_le_bytes(self.fourcc_bytes())
    }

    /// Whether this format stores chroma at half the luma resolution
    ///
    /// Subsampled formats require even width (and even height for the
    /// 4:2:0 variants).
    pub fn is_chroma_subsampled(&self) -> bool {
        matches!(
            self,
            PixelFormat::I420 | PixelFormat::Nv12 | PixelFormat::Yuyv | PixelFormat::Uyvy
        )
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Rgb => write!(f, "RGB"),
            PixelFormat::Bgr => write!(f, "BGR"),
            PixelFormat::Rgba => write!(f, "RGBA"),
            PixelFormat::Bgra => write!(f, "BGRA"),
            PixelFormat::Gray => write!(f, "GRAY"),
            PixelFormat::I420 => write!(f, "I420 (YUV 4:2:0 planar)"),
            PixelFormat::Nv12 => write!(f, "NV12 (YUV 4:2:0 semi-planar)"),
            PixelFormat::Yuyv => write!(f, "YUYV (YUV 4:2:2 packed)"),
            PixelFormat::Uyvy => write!(f, "UYVY (YUV 4:2:2 packed)"),
        }
    }
}

/// A video frame
///
/// Owns its pixel data and guarantees the buffer length matches the
/// declared geometry and format exactly. The library never keeps a
/// reference to a caller's frame beyond the call that received it.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Create a new zero-filled frame
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CameraError::shape_mismatch(format!(
                "frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let size = format.frame_size(width, height);
        Ok(Self {
            width,
            height,
            format,
            data: vec![0u8; size],
        })
    }

    /// Create a frame from existing pixel data
    ///
    /// Fails with [`CameraError::ShapeMismatch`] unless `data.len()` is
    /// exactly the size required by the geometry and format. Oversized
    /// buffers are rejected, never truncated.
    pub fn from_data(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CameraError::shape_mismatch(format!(
                "frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = format.frame_size(width, height);
        if data.len() != expected {
            return Err(CameraError::shape_mismatch(format!(
                "{} bytes for a {}x{} {} frame, expected {}",
                data.len(),
                width,
                height,
                format,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Pixel data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel data
    ///
    /// The length is fixed by the shape invariant; only the contents may
    /// be rewritten, which lets callers reuse one allocation per frame.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the frame, returning the pixel data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Convert this frame to a different pixel format
    ///
    /// See [`crate::convert::convert`] for the supported paths.
    pub fn convert(&self, target: PixelFormat) -> Result<Frame> {
        crate::convert::convert(self, target)
    }

    /// Get the Y plane (for I420 and NV12)
    pub fn y_plane(&self) -> Option<&[u8]> {
        match self.format {
            PixelFormat::I420 | PixelFormat::Nv12 => {
                let y_size = self.width as usize * self.height as usize;
                Some(&self.data[..y_size])
            }
            _ => None,
        }
    }

    /// Get the U plane (for I420)
    pub fn u_plane(&self) -> Option<&[u8]> {
        if self.format != PixelFormat::I420 {
            return None;
        }
        let y_size = self.width as usize * self.height as usize;
        let uv_size = y_size / 4;
        Some(&self.data[y_size..y_size + uv_size])
    }

    /// Get the V plane (for I420)
    pub fn v_plane(&self) -> Option<&[u8]> {
        if self.format != PixelFormat::I420 {
            return None;
        }
        let y_size = self.width as usize * self.height as usize;
        let uv_size = y_size / 4;
        Some(&self.data[y_size + uv_size..])
    }

    /// Get the interleaved UV plane (for NV12)
    pub fn uv_plane(&self) -> Option<&[u8]> {
        if self.format != PixelFormat::Nv12 {
            return None;
        }
        let y_size = self.width as usize * self.height as usize;
        Some(&self.data[y_size..])
    }
}
