//! Virtual Camera Backends
//!
//! A backend presents one platform virtual-camera device to the OS and
//! accepts one frame per write. The [`Backend`] trait is the capability
//! set every driver satisfies; the [`registry`] maps backend names to
//! constructors and picks a platform-appropriate one at open time.
//!
//! Built-in drivers:
//! - `v4l2loopback` (Linux) — writes to a v4l2loopback output device.
//!
//! OBS-style and Unity-Capture-style drivers live outside this crate and
//! hook in through [`register_backend`].

mod registry;
#[cfg(target_os = "linux")]
pub mod v4l2loopback;

pub use registry::{backend_names, register_backend, BackendConstructor, BackendRegistry};
pub(crate) use registry::open_backend;

use crate::error::Result;
use crate::frame::PixelFormat;

/// Options handed to a backend constructor at open time
///
/// `source_format` is what the caller will hand to [`crate::Camera::send`];
/// the constructor decides the native format the device will be fed and
/// reports it through [`Backend::native_format`]. The Camera converts
/// between the two.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// Explicit device to claim (e.g. `/dev/video10`); picked automatically
    /// when absent
    pub device: Option<String>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Declared delivery rate in frames per second
    pub fps: f64,
    /// Pixel format the caller will send
    pub source_format: PixelFormat,
}

/// A platform virtual-camera sink
///
/// Created by a registered constructor at `Camera::open` time and owned
/// exclusively by one Camera until `close`. Implementations must be
/// `Send` so a Camera can move across threads; nothing here is called
/// concurrently.
pub trait Backend: Send + std::fmt::Debug {
    /// Human-readable identifier of the claimed device
    fn device(&self) -> &str;

    /// Pixel format the device must be fed
    ///
    /// Fixed for the life of the handle; queried once at negotiation time.
    fn native_format(&self) -> PixelFormat;

    /// Write exactly one frame already in the native format
    ///
    /// Fails with [`crate::CameraError::DeviceWriteError`] if the OS write
    /// fails or the buffer size does not match the negotiated geometry.
    /// A failed send writes nothing; there is no partial frame.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Release the device handle
    ///
    /// Idempotent and infallible from the caller's view; internal
    /// teardown failures are logged, not surfaced.
    fn close(&mut self);
}
