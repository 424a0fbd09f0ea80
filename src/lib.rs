//! vcam-core
//!
//! Virtual camera output library: delivers application-generated frames
//! to a virtual webcam device that other software (conferencing apps,
//! OBS, browsers) sees as a physical camera.
//!
//! ## Architecture
//!
//! ```text
//! Application frames → Camera → format conversion → Backend → virtual device
//!                         ↓                                        ↓
//!                  pacing / statistics                Any camera application
//!                                                     (Zoom, OBS, browsers)
//! ```
//!
//! ### Modules
//!
//! - `frame`: Pixel format tags and the shape-checked frame buffer
//! - `convert`: Pure pixel-format conversion routines
//! - `backend`: Virtual-device drivers and the backend registry
//! - `camera`: The orchestrator owning one open backend
//! - `pacing`: Measured frame-rate estimation
//!
//! ## Example
//!
//! ```rust,no_run
//! use vcam_core::{Camera, CameraConfig, Frame, PixelFormat};
//!
//! # fn main() -> vcam_core::Result<()> {
//! let mut camera = Camera::open(CameraConfig {
//!     width: 640,
//!     height: 480,
//!     fps: 30.0,
//!     format: PixelFormat::Rgb,
//!     ..Default::default()
//! })?;
//!
//! let frame = Frame::new(640, 480, PixelFormat::Rgb)?;
//! for _ in 0..300 {
//!     camera.send(&frame)?;
//!     camera.sleep_until_next_frame()?;
//! }
//! camera.close();
//! # Ok(())
//! # }
//! ```
//!
//! Frame production, retry on device loss, and driver installation are
//! the application's concern; the library reports every failure
//! synchronously and never retries internally.

// Re-export commonly used types
pub use backend::{backend_names, register_backend, Backend, BackendOptions, BackendRegistry};
pub use camera::{Camera, CameraConfig};
pub use error::{CameraError, Result};
pub use frame::{Frame, PixelFormat};

// Public modules
pub mod backend;
pub mod camera;
pub mod convert;
pub mod error;
pub mod frame;
pub mod pacing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
