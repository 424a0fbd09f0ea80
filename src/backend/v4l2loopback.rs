//! v4l2loopback Backend
//!
//! Presents frames to Linux as a virtual webcam by writing into a
//! v4l2loopback output device.
//!
//! ## Prerequisites
//!
//! The `v4l2loopback` kernel module must be loaded:
//!
//! ```bash
//! # Install the module (Debian/Ubuntu)
//! sudo apt install v4l2loopback-dkms
//!
//! # Load with a specific device number
//! sudo modprobe v4l2loopback devices=1 video_nr=10 card_label="Virtual Camera"
//! ```
//!
//! Packed RGB sources are delivered to the device as I420 (the Camera
//! converts before the write); grayscale and YUV sources pass through
//! unchanged.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

use tracing::{debug, info, warn};
use v4l::video::Output;
use v4l::Device;
use v4l::FourCC;

use crate::backend::{Backend, BackendOptions};
use crate::error::{CameraError, Result};
use crate::frame::PixelFormat;

// v4l2loopback allows opening a device multiple times, so the kernel will
// not stop auto-selection from claiming the same device twice. We track
// our own claims; devices opened by other processes stay invisible, and
// an explicit device hint is the way around that.
static CLAIMED_DEVICES: LazyLock<Mutex<HashSet<String>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Backend constructor registered under the name `v4l2loopback`
pub fn open(options: &BackendOptions) -> Result<Box<dyn Backend>> {
    V4l2LoopbackBackend::open(options).map(|backend| Box::new(backend) as Box<dyn Backend>)
}

/// Native format the device will be fed for a given source format
fn native_format_for(source: PixelFormat) -> PixelFormat {
    match source {
        PixelFormat::Rgb | PixelFormat::Bgr | PixelFormat::Rgba | PixelFormat::Bgra => {
            PixelFormat::I420
        }
        passthrough => passthrough,
    }
}

/// V4L2 pixel format code for a native format
///
/// V4L2 labels planar 4:2:0 as `YU12`; the remaining codes match the
/// canonical fourcc.
fn v4l2_fourcc(format: PixelFormat) -> [u8; 4] {
    match format {
        PixelFormat::I420 => *b"YU12",
        other => other.fourcc_bytes(),
    }
}

/// Virtual webcam handle over one v4l2loopback output device
#[derive(Debug)]
pub struct V4l2LoopbackBackend {
    device_path: String,
    file: Option<File>,
    native: PixelFormat,
    frame_size: usize,
    frames_written: u64,
}

impl V4l2LoopbackBackend {
    fn open(options: &BackendOptions) -> Result<Self> {
        let native = native_format_for(options.source_format);

        if native.is_chroma_subsampled()
            && (options.width % 2 != 0 || options.height % 2 != 0)
        {
            return Err(CameraError::unsupported_format(format!(
                "{} output requires even dimensions, got {}x{}",
                native, options.width, options.height
            )));
        }

        let mut claimed = CLAIMED_DEVICES
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (device_path, file) = match &options.device {
            Some(path) => {
                let file = open_device(path, &claimed, options, native)?;
                (path.clone(), file)
            }
            None => {
                let mut found = None;
                for i in 0..100 {
                    let path = format!("/dev/video{}", i);
                    match open_device(&path, &claimed, options, native) {
                        Ok(file) => {
                            found = Some((path, file));
                            break;
                        }
                        Err(e) => {
                            debug!("Skipping {}: {}", path, e);
                        }
                    }
                }
                found.ok_or_else(|| {
                    CameraError::device_unavailable(
                        "no free v4l2 loopback device found at /dev/video[0-99]; \
                         did you run 'modprobe v4l2loopback'?",
                    )
                })?
            }
        };

        claimed.insert(device_path.clone());

        info!(
            "Opened v4l2loopback device {} ({}x{} {} native)",
            device_path, options.width, options.height, native
        );

        Ok(Self {
            device_path,
            file: Some(file),
            native,
            frame_size: native.frame_size(options.width, options.height),
            frames_written: 0,
        })
    }
}

/// Claim and configure one candidate device
fn open_device(
    path: &str,
    claimed: &HashSet<String>,
    options: &BackendOptions,
    native: PixelFormat,
) -> Result<File> {
    if claimed.contains(path) {
        return Err(CameraError::device_unavailable(format!(
            "device {} is already in use by this process",
            path
        )));
    }
    if !Path::new(path).exists() {
        return Err(CameraError::device_unavailable(format!(
            "device {} does not exist",
            path
        )));
    }

    let file = OpenOptions::new().write(true).open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            CameraError::device_unavailable(format!(
                "could not access {} due to missing permissions; add your user \
                 to the 'video' group ('usermod -a -G video <user>') and log in again",
                path
            ))
        } else {
            CameraError::device_unavailable(format!("device {} could not be opened: {}", path, e))
        }
    })?;

    let device = Device::with_path(path)
        .map_err(|e| CameraError::device_unavailable(format!("{}: {}", path, e)))?;
    let caps = device.query_caps().map_err(|e| {
        CameraError::device_unavailable(format!("capabilities of {} could not be queried: {}", path, e))
    })?;
    if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_OUTPUT) {
        return Err(CameraError::device_unavailable(format!(
            "device {} is not a video output device",
            path
        )));
    }
    if !caps.driver.contains("v4l2 loopback") {
        return Err(CameraError::device_unavailable(format!(
            "device {} is not a v4l2 loopback device (driver '{}')",
            path, caps.driver
        )));
    }

    let fmt = v4l::Format::new(options.width, options.height, FourCC::new(&v4l2_fourcc(native)));
    // v4l2loopback fills in bytesperline, sizeimage and colorspace itself.
    device.set_format(&fmt).map_err(|e| {
        CameraError::device_unavailable(format!("device {} could not be configured: {}", path, e))
    })?;

    Ok(file)
}

impl Backend for V4l2LoopbackBackend {
    fn device(&self) -> &str {
        &self.device_path
    }

    fn native_format(&self) -> PixelFormat {
        self.native
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CameraError::device_write("device is closed"))?;

        if data.len() != self.frame_size {
            return Err(CameraError::device_write(format!(
                "buffer is {} bytes, device expects {}",
                data.len(),
                self.frame_size
            )));
        }

        file.write_all(data)
            .map_err(|e| CameraError::device_write(format!("{}: {}", self.device_path, e)))?;

        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            info!(
                "Closed v4l2loopback device {} ({} frames written)",
                self.device_path, self.frames_written
            );
            CLAIMED_DEVICES
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.device_path);
        }
    }
}

impl Drop for V4l2LoopbackBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// Find v4l2 loopback output devices on the system
///
/// Scans `/dev/video*` and returns the paths whose driver reports itself
/// as v4l2 loopback with output capability, sorted.
pub fn find_loopback_devices() -> Vec<PathBuf> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev").into_iter().flatten().flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("video") && is_loopback_device(&path) {
            devices.push(path);
        }
    }

    devices.sort();
    devices
}

fn is_loopback_device(path: &Path) -> bool {
    let Ok(device) = Device::with_path(path) else {
        return false;
    };
    match device.query_caps() {
        Ok(caps) => {
            caps.capabilities.contains(v4l::capability::Flags::VIDEO_OUTPUT)
                && caps.driver.contains("v4l2 loopback")
        }
        Err(e) => {
            warn!("Could not query {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_format_mapping() {
        assert_eq!(native_format_for(PixelFormat::Rgb), PixelFormat::I420);
        assert_eq!(native_format_for(PixelFormat::Bgra), PixelFormat::I420);
        assert_eq!(native_format_for(PixelFormat::Gray), PixelFormat::Gray);
        assert_eq!(native_format_for(PixelFormat::Nv12), PixelFormat::Nv12);
        assert_eq!(native_format_for(PixelFormat::Yuyv), PixelFormat::Yuyv);
    }

    #[test]
    fn test_v4l2_fourcc_uses_yu12_for_i420() {
        assert_eq!(&v4l2_fourcc(PixelFormat::I420), b"YU12");
        assert_eq!(&v4l2_fourcc(PixelFormat::Yuyv), b"YUYV");
        assert_eq!(&v4l2_fourcc(PixelFormat::Gray), b"GREY");
    }

    #[test]
    fn test_missing_device_is_unavailable() {
        let options = BackendOptions {
            device: Some("/dev/video250".to_string()),
            width: 640,
            height: 480,
            fps: 30.0,
            source_format: PixelFormat::Rgb,
        };
        let err = open(&options).unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_odd_dimensions_rejected_for_subsampled_native() {
        let options = BackendOptions {
            device: None,
            width: 641,
            height: 480,
            fps: 30.0,
            source_format: PixelFormat::Rgb,
        };
        let err = open(&options).unwrap_err();
        assert!(matches!(err, CameraError::UnsupportedFormat(_)));
    }
}
