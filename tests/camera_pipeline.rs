//! Camera Pipeline Tests
//!
//! End-to-end tests over mock backends registered through the public
//! registry: format negotiation and conversion on the send path, shape
//! checking, lifecycle state, pacing, and throughput statistics.


use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use mock_backend::{register_mock, register_write_failing_mock};
use vcam_core::{backend_names, Camera, CameraConfig, CameraError, Frame, PixelFormat};

fn config(backend: &str, format: PixelFormat) -> CameraConfig {
    mock_backend::init_logging();
    CameraConfig {
        width: 640,
        height: 480,
        fps: 30.0,
        format,
        backend: Some(backend.to_string()),
        device: None,
    }
}

#[test]
fn test_rgb_to_bgr_native_scenario() {
    let (sent, _) = register_mock("pipeline-bgr", PixelFormat::Bgr);
    let mut camera = Camera::open(config("pipeline-bgr", PixelFormat::Rgb)).unwrap();

    assert_eq!(camera.format(), PixelFormat::Rgb);
    assert_eq!(camera.native_format(), PixelFormat::Bgr);
    assert_eq!(camera.backend(), "pipeline-bgr");
    assert_eq!(camera.frames_sent(), 0);

    // all-zero frame: channel reorder keeps zeros
    let frame = Frame::new(640, 480, PixelFormat::Rgb).unwrap();
    camera.send(&frame).unwrap();
    assert_eq!(camera.frames_sent(), 1);

    {
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), 640 * 480 * 3);
        assert!(sent[0].iter().all(|&b| b == 0));
    }

    // non-zero pixels arrive reordered
    let mut data = Vec::with_capacity(640 * 480 * 3);
    for _ in 0..640 * 480 {
        data.extend_from_slice(&[1, 2, 3]);
    }
    let frame = Frame::from_data(640, 480, PixelFormat::Rgb, data).unwrap();
    camera.send(&frame).unwrap();
    assert_eq!(camera.frames_sent(), 2);

    let sent = sent.lock().unwrap();
    assert_eq!(&sent[1][..3], &[3, 2, 1]);
}

#[test]
fn test_passthrough_forwards_bytes_unchanged() {
    let (sent, _) = register_mock("pipeline-passthrough", PixelFormat::Rgb);
    let mut camera = Camera::open(config("pipeline-passthrough", PixelFormat::Rgb)).unwrap();
    assert_eq!(camera.native_format(), PixelFormat::Rgb);

    let mut frame = Frame::new(640, 480, PixelFormat::Rgb).unwrap();
    frame.data_mut()[0] = 42;
    frame.data_mut()[7] = 99;
    camera.send(&frame).unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(sent[0], frame.data());
}

#[test]
fn test_conversion_to_i420_native() {
    let (sent, _) = register_mock("pipeline-i420", PixelFormat::I420);
    let mut camera = Camera::open(config("pipeline-i420", PixelFormat::Rgb)).unwrap();
    assert_eq!(camera.native_format(), PixelFormat::I420);

    let mut data = Vec::with_capacity(640 * 480 * 3);
    for _ in 0..640 * 480 {
        data.extend_from_slice(&[128, 128, 128]);
    }
    let frame = Frame::from_data(640, 480, PixelFormat::Rgb, data).unwrap();
    camera.send(&frame).unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].len(), 640 * 480 * 3 / 2);
    let y_plane = &sent[0][..640 * 480];
    let chroma = &sent[0][640 * 480..];
    assert!(y_plane.iter().all(|&y| y == 126));
    assert!(chroma.iter().all(|&c| c == 128));
}

#[test]
fn test_shape_mismatch_is_rejected_without_side_effects() {
    let (sent, _) = register_mock("pipeline-shape", PixelFormat::Rgb);
    let mut camera = Camera::open(config("pipeline-shape", PixelFormat::Rgb)).unwrap();

    // RGBA-sized buffer cannot even become a 640x480 RGB frame
    assert!(matches!(
        Frame::from_data(640, 480, PixelFormat::Rgb, vec![0u8; 640 * 480 * 4]),
        Err(CameraError::ShapeMismatch(_))
    ));

    // wrong geometry
    let frame = Frame::new(320, 240, PixelFormat::Rgb).unwrap();
    assert!(matches!(
        camera.send(&frame),
        Err(CameraError::ShapeMismatch(_))
    ));

    // wrong format at matching geometry
    let frame = Frame::new(640, 480, PixelFormat::Bgr).unwrap();
    assert!(matches!(
        camera.send(&frame),
        Err(CameraError::ShapeMismatch(_))
    ));

    assert_eq!(camera.frames_sent(), 0);
    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn test_send_and_pacing_fail_after_close() {
    let (_, closed) = register_mock("pipeline-close", PixelFormat::Rgb);
    let mut camera = Camera::open(config("pipeline-close", PixelFormat::Rgb)).unwrap();
    assert!(camera.is_open());

    camera.close();
    assert!(!camera.is_open());
    assert!(closed.load(Ordering::Relaxed));

    let frame = Frame::new(640, 480, PixelFormat::Rgb).unwrap();
    assert!(matches!(camera.send(&frame), Err(CameraError::NotOpen)));
    assert!(matches!(
        camera.sleep_until_next_frame(),
        Err(CameraError::NotOpen)
    ));
    assert_eq!(camera.frames_sent(), 0);

    // close is idempotent
    camera.close();
    assert!(!camera.is_open());
}

#[test]
fn test_drop_releases_backend() {
    let (_, closed) = register_mock("pipeline-drop", PixelFormat::Rgb);
    {
        let _camera = Camera::open(config("pipeline-drop", PixelFormat::Rgb)).unwrap();
        assert!(!closed.load(Ordering::Relaxed));
    }
    assert!(closed.load(Ordering::Relaxed));
}

#[test]
fn test_write_error_propagates_and_counter_holds() {
    register_write_failing_mock("pipeline-failing", PixelFormat::Rgb);
    let mut camera = Camera::open(config("pipeline-failing", PixelFormat::Rgb)).unwrap();

    let frame = Frame::new(640, 480, PixelFormat::Rgb).unwrap();
    assert!(matches!(
        camera.send(&frame),
        Err(CameraError::DeviceWriteError(_))
    ));
    assert_eq!(camera.frames_sent(), 0);
    // the camera stays open; retry policy is the caller's decision
    assert!(camera.is_open());
}

#[test]
fn test_negotiation_rejects_impossible_conversion() {
    // backend demands I420 but there is no YUYV -> I420 path
    register_mock("pipeline-nopath", PixelFormat::I420);
    let err = Camera::open(config("pipeline-nopath", PixelFormat::Yuyv)).unwrap_err();
    assert!(matches!(
        err,
        CameraError::UnsupportedConversion {
            from: PixelFormat::Yuyv,
            to: PixelFormat::I420,
        }
    ));
}

#[test]
fn test_unknown_backend_name() {
    let err = Camera::open(config("pipeline-never-registered", PixelFormat::Rgb)).unwrap_err();
    assert!(matches!(err, CameraError::NoBackendAvailable(_)));
}

#[test]
fn test_registered_backend_is_listed() {
    register_mock("pipeline-listed", PixelFormat::Rgb);
    assert!(backend_names().contains(&"pipeline-listed".to_string()));
}

#[test]
fn test_sleep_until_next_frame_blocks_one_interval() {
    register_mock("pipeline-pacing", PixelFormat::Rgb);
    let mut camera = Camera::open(CameraConfig {
        fps: 50.0,
        ..config("pipeline-pacing", PixelFormat::Rgb)
    })
    .unwrap();

    // before the first send, pacing has nothing to wait for
    let start = Instant::now();
    camera.sleep_until_next_frame().unwrap();
    assert!(start.elapsed() < Duration::from_millis(10));

    let frame = Frame::new(640, 480, PixelFormat::Rgb).unwrap();
    camera.send(&frame).unwrap();

    // right after a send the wait is about one 20ms interval
    let start = Instant::now();
    camera.sleep_until_next_frame().unwrap();
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(10), "waited {waited:?}");
    assert!(waited < Duration::from_millis(100), "waited {waited:?}");

    // the deadline has now passed, so a second call returns immediately
    let start = Instant::now();
    camera.sleep_until_next_frame().unwrap();
    assert!(start.elapsed() < Duration::from_millis(10));
}

#[test]
fn test_sleep_past_deadline_returns_immediately() {
    register_mock("pipeline-pacing-late", PixelFormat::Rgb);
    let mut camera = Camera::open(CameraConfig {
        fps: 50.0,
        ..config("pipeline-pacing-late", PixelFormat::Rgb)
    })
    .unwrap();

    let frame = Frame::new(640, 480, PixelFormat::Rgb).unwrap();
    camera.send(&frame).unwrap();

    // fall behind by two intervals, then ask for the next slot
    std::thread::sleep(Duration::from_millis(40));
    let start = Instant::now();
    camera.sleep_until_next_frame().unwrap();
    assert!(start.elapsed() < Duration::from_millis(10));
}

#[test]
fn test_measured_fps_tracks_paced_sending() {
    register_mock("pipeline-fps", PixelFormat::Rgb);
    let mut camera = Camera::open(CameraConfig {
        fps: 40.0,
        ..config("pipeline-fps", PixelFormat::Rgb)
    })
    .unwrap();

    // seeded with the configured rate before any frame
    assert!((camera.current_fps() - 40.0).abs() < 1e-9);

    let frame = Frame::new(640, 480, PixelFormat::Rgb).unwrap();
    for _ in 0..40 {
        camera.send(&frame).unwrap();
        camera.sleep_until_next_frame().unwrap();
    }

    // sleep overshoot only slows the loop down, so allow 10% below target
    let measured = camera.current_fps();
    assert!(
        measured > 36.0 && measured < 41.0,
        "measured {measured} fps against a 40 fps target"
    );
    assert_eq!(camera.frames_sent(), 40);
}
