//! Error types for vcam-core

use crate::frame::PixelFormat;
use thiserror::Error;

/// Result type alias using CameraError
pub type Result<T> = std::result::Result<T, CameraError>;

/// Camera error types
///
/// All errors that can surface from the frame-delivery pipeline. Every
/// failure is synchronous and reported to the caller of the operation that
/// detected it; nothing is retried internally.
#[derive(Debug, Error)]
pub enum CameraError {
    /// Operation requires an open camera
    #[error("camera is not open")]
    NotOpen,

    /// Frame does not match the configured geometry or format
    #[error("frame shape mismatch: {0}")]
    ShapeMismatch(String),

    /// No conversion path between two pixel formats
    #[error("no conversion path from {from} to {to}")]
    UnsupportedConversion {
        /// Source pixel format
        from: PixelFormat,
        /// Requested destination pixel format
        to: PixelFormat,
    },

    /// Backend cannot serve the requested pixel format
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// No compatible virtual device present or claimable
    #[error("virtual camera device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Every candidate backend failed to open
    #[error("no virtual camera backend available:\n{0}")]
    NoBackendAvailable(String),

    /// OS-level frame write failure
    #[error("failed to write frame to device: {0}")]
    DeviceWriteError(String),

    /// Rejected camera configuration
    #[error("invalid camera configuration: {0}")]
    InvalidConfig(String),
}

impl CameraError {
    /// Create a ShapeMismatch error
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create an UnsupportedFormat error
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create a DeviceUnavailable error
    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    /// Create a DeviceWriteError
    pub fn device_write(msg: impl Into<String>) -> Self {
        Self::DeviceWriteError(msg.into())
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
