//! Camera Orchestrator
//!
//! Owns one open backend and drives the full delivery path for each
//! frame: shape check, format conversion when the backend's native format
//! differs from the source, the device write, and the pacing/throughput
//! bookkeeping.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vcam_core::{Camera, CameraConfig, Frame, PixelFormat};
//!
//! let mut camera = Camera::open(CameraConfig {
//!     width: 1280,
//!     height: 720,
//!     fps: 30.0,
//!     format: PixelFormat::Rgb,
//!     ..Default::default()
//! })?;
//!
//! let frame = Frame::new(1280, 720, PixelFormat::Rgb)?;
//! loop {
//!     camera.send(&frame)?;
//!     camera.sleep_until_next_frame()?;
//! }
//! ```

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::backend::{open_backend, Backend, BackendOptions};
use crate::convert;
use crate::error::{CameraError, Result};
use crate::frame::{Frame, PixelFormat};
use crate::pacing::FpsCounter;

/// Interval between measured-fps log lines
const FPS_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for opening a [`Camera`]
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Target delivery rate in frames per second
    pub fps: f64,
    /// Pixel format of the frames the caller will send
    pub format: PixelFormat,
    /// Backend to use; auto-selected in preference order when absent
    pub backend: Option<String>,
    /// Device hint passed to the backend (e.g. `/dev/video10`)
    pub device: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30.0,
            format: PixelFormat::Rgb,
            backend: None,
            device: None,
        }
    }
}

impl CameraConfig {
    /// Create config for 720p @ 30fps
    pub fn hd_720p() -> Self {
        Self {
            width: 1280,
            height: 720,
            ..Default::default()
        }
    }

    /// Create config for 1080p @ 30fps
    pub fn fhd_1080p() -> Self {
        Self {
            width: 1920,
            height: 1080,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::invalid_config(format!(
                "dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(CameraError::invalid_config(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        if self.format.is_chroma_subsampled() {
            let needs_even_height =
                matches!(self.format, PixelFormat::I420 | PixelFormat::Nv12);
            if self.width % 2 != 0 || (needs_even_height && self.height % 2 != 0) {
                return Err(CameraError::invalid_config(format!(
                    "{} frames require even dimensions, got {}x{}",
                    self.format, self.width, self.height
                )));
            }
        }
        Ok(())
    }
}

/// A virtual camera session
///
/// Opened against one backend device, fed through [`Camera::send`],
/// released by [`Camera::close`] or drop. Closing is terminal: a closed
/// camera cannot be reopened, and `send` / pacing calls on it fail with
/// [`CameraError::NotOpen`].
#[derive(Debug)]
pub struct Camera {
    backend: Option<Box<dyn Backend>>,
    backend_name: String,
    device: String,
    width: u32,
    height: u32,
    fps: f64,
    format: PixelFormat,
    native_format: PixelFormat,
    frames_sent: u64,
    fps_counter: FpsCounter,
    last_frame: Option<Instant>,
    last_fps_log: Option<Instant>,
}

impl Camera {
    /// Open a virtual camera
    ///
    /// Resolves a backend through the process-wide registry (the named one
    /// if `config.backend` is set, otherwise the first that opens in
    /// preference order), negotiates the native format, and verifies a
    /// conversion path exists from the source format. Fails with
    /// [`CameraError::InvalidConfig`] for rejected configuration values,
    /// [`CameraError::NoBackendAvailable`] when every candidate backend
    /// fails, and [`CameraError::UnsupportedConversion`] when the caller's
    /// format cannot be turned into what the device takes.
    pub fn open(config: CameraConfig) -> Result<Self> {
        config.validate()?;

        let options = BackendOptions {
            device: config.device.clone(),
            width: config.width,
            height: config.height,
            fps: config.fps,
            source_format: config.format,
        };
        let (backend_name, backend) = open_backend(config.backend.as_deref(), &options)?;

        let native_format = backend.native_format();
        if native_format != config.format && !convert::supported(config.format, native_format) {
            return Err(CameraError::UnsupportedConversion {
                from: config.format,
                to: native_format,
            });
        }

        let device = backend.device().to_string();
        info!(
            "Camera open: {}x{} @ {}fps, {} -> {} on '{}' ({})",
            config.width, config.height, config.fps, config.format, native_format, backend_name,
            device
        );

        Ok(Self {
            backend: Some(backend),
            backend_name,
            device,
            width: config.width,
            height: config.height,
            fps: config.fps,
            format: config.format,
            native_format,
            frames_sent: 0,
            fps_counter: FpsCounter::new(config.fps),
            last_frame: None,
            last_fps_log: None,
        })
    }

    /// Send one frame to the virtual camera
    ///
    /// The frame must match the configured geometry and source format
    /// exactly; it is converted to the native format when the two differ
    /// and handed to the backend for a single device write. On success the
    /// frame counter, the send timestamp, and the measured-fps estimate
    /// are updated. No reference to `frame` is kept past this call.
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        let backend = self.backend.as_mut().ok_or(CameraError::NotOpen)?;

        if frame.width() != self.width
            || frame.height() != self.height
            || frame.format() != self.format
        {
            return Err(CameraError::shape_mismatch(format!(
                "got {}x{} {}, camera is configured for {}x{} {}",
                frame.width(),
                frame.height(),
                frame.format(),
                self.width,
                self.height,
                self.format
            )));
        }

        if self.native_format == self.format {
            backend.send(frame.data())?;
        } else {
            let converted = convert::convert(frame, self.native_format)?;
            backend.send(converted.data())?;
        }

        self.frames_sent += 1;
        let now = Instant::now();
        self.fps_counter.tick(now);
        self.last_frame = Some(now);
        self.log_fps(now);

        Ok(())
    }

    // At most one measured-fps line per FPS_LOG_INTERVAL.
    fn log_fps(&mut self, now: Instant) {
        match self.last_fps_log {
            None => self.last_fps_log = Some(now),
            Some(last) if now.duration_since(last) >= FPS_LOG_INTERVAL => {
                debug!(
                    "{}: {:.1} fps measured ({} frames sent)",
                    self.device,
                    self.fps_counter.current_fps(),
                    self.frames_sent
                );
                self.last_fps_log = Some(now);
            }
            Some(_) => {}
        }
    }

    /// Block until the next frame is due
    ///
    /// Sleeps for `max(0, 1/fps - elapsed since the last send)` measured
    /// on the monotonic clock; returns immediately when the deadline has
    /// already passed (a caller running behind catches up at full effort)
    /// or when nothing has been sent yet. Advisory only: it never sends a
    /// frame itself.
    pub fn sleep_until_next_frame(&self) -> Result<()> {
        if self.backend.is_none() {
            return Err(CameraError::NotOpen);
        }
        let Some(last) = self.last_frame else {
            return Ok(());
        };

        let interval = Duration::from_secs_f64(1.0 / self.fps);
        let elapsed = last.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
        Ok(())
    }

    /// Close the camera and release its device
    ///
    /// Idempotent. Subsequent `send` and pacing calls fail with
    /// [`CameraError::NotOpen`].
    pub fn close(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            info!(
                "Camera closed on '{}' after {} frames",
                self.backend_name, self.frames_sent
            );
            backend.close();
        }
    }

    /// Whether the camera is open
    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Configured frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Configured frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Configured delivery rate in frames per second
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Pixel format the caller sends
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Pixel format the device is fed
    pub fn native_format(&self) -> PixelFormat {
        self.native_format
    }

    /// Name of the backend in use
    pub fn backend(&self) -> &str {
        &self.backend_name
    }

    /// Human-readable identifier of the claimed device
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Total frames successfully sent
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Measured delivery rate in frames per second
    ///
    /// A decayed average of inter-send intervals; reads as the configured
    /// rate until the first two frames have been sent.
    pub fn current_fps(&self) -> f64 {
        self.fps_counter.current_fps()
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CameraConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.format, PixelFormat::Rgb);
    }

    #[test]
    fn test_config_presets() {
        let config = CameraConfig::fhd_1080p();
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert_eq!(config.fps, 30.0);
    }

    #[test]
    fn test_config_validation() {
        let config = CameraConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CameraError::InvalidConfig(_))
        ));

        let config = CameraConfig {
            fps: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CameraError::InvalidConfig(_))
        ));

        let config = CameraConfig {
            fps: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CameraError::InvalidConfig(_))
        ));

        let config = CameraConfig {
            width: 639,
            format: PixelFormat::I420,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CameraError::InvalidConfig(_))
        ));

        assert!(CameraConfig::default().validate().is_ok());
    }
}
