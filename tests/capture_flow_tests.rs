// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the guided capture flow

mod common;

use common::{blurred_frame, mostly_blurred_frames, sharp_frame};
use footscan::app::{Angle, CaptureMode, CaptureSlot, CaptureStep, ImageSource, Side, VideoOutcome};
use footscan::backends::camera::BackendError;
use footscan::backends::virtual_camera::VirtualCamera;
use footscan::errors::CaptureError;
use footscan::{CaptureController, Config};

fn capture_all_photos(controller: &mut CaptureController) {
    controller.begin().unwrap();
    while controller.step().is_capture() {
        controller.capture_photo().unwrap();
    }
}

fn config_needing(min_images: usize) -> Config {
    let mut config = Config::default();
    config.capture.min_images = min_images;
    config
}

#[test]
fn test_full_photo_scan() {
    let camera = VirtualCamera::new();
    let handle = camera.handle();
    let mut controller = CaptureController::new(Box::new(camera), Config::default());

    assert_eq!(controller.step(), CaptureStep::Instructions);
    capture_all_photos(&mut controller);

    assert_eq!(controller.step(), CaptureStep::Review);
    assert_eq!(controller.image_count(), 10);
    assert_eq!(controller.filled_slots().len(), CaptureSlot::count());
    assert!(!controller.has_session());
    assert_eq!(handle.open_sessions(), 0);

    let submission = controller.complete().unwrap();
    assert_eq!(controller.step(), CaptureStep::Complete);
    assert_eq!(submission.left.len(), 5);
    assert_eq!(submission.right.len(), 5);
    assert!(submission.left.iter().all(|i| i.side() == Side::Left));
    assert_eq!(submission.metadata.total_images, 10);
    assert_eq!(submission.metadata.device, "Virtual Camera");
    assert!(submission.should_persist());
}

#[test]
fn test_complete_needs_enough_images() {
    let mut controller = CaptureController::new(Box::new(VirtualCamera::new()), config_needing(12));
    capture_all_photos(&mut controller);

    let err = controller.complete().unwrap_err();
    assert!(matches!(err, CaptureError::InsufficientImages { have: 10, need: 12 }));
    assert_eq!(controller.step(), CaptureStep::Review);
}

#[test]
fn test_simulation_skips_image_minimum() {
    let mut controller = CaptureController::new(Box::new(VirtualCamera::new()), config_needing(12))
        .with_simulation(true);
    capture_all_photos(&mut controller);

    let submission = controller.complete().unwrap();
    assert!(submission.is_simulation());
    assert!(!submission.should_persist());
}

#[test]
fn test_retake_replaces_one_slot() {
    let mut controller = CaptureController::new(Box::new(VirtualCamera::new()), Config::default());
    capture_all_photos(&mut controller);

    let slot = CaptureSlot::new(Side::Right, Angle::Sole);
    let before = controller.images()[&slot][0].id;

    controller.retake(slot).unwrap();
    assert_eq!(controller.step(), CaptureStep::Capture(slot));
    assert!(controller.has_session());

    controller.capture_photo().unwrap();
    assert_eq!(controller.step(), CaptureStep::Review);
    assert_eq!(controller.image_count(), 10);
    assert_ne!(controller.images()[&slot][0].id, before);
}

#[test]
fn test_reset_starts_over() {
    let mut controller = CaptureController::new(Box::new(VirtualCamera::new()), Config::default());
    capture_all_photos(&mut controller);

    controller.reset().unwrap();
    assert_eq!(controller.step(), CaptureStep::Capture(CaptureSlot::first()));
    assert_eq!(controller.image_count(), 0);
}

#[test]
fn test_camera_failure_mid_flow() {
    let camera = VirtualCamera::new();
    let handle = camera.handle();
    let mut controller = CaptureController::new(Box::new(camera), Config::default());
    controller.begin().unwrap();
    controller.capture_photo().unwrap();

    // The swap to the next slot fails to reopen the camera
    handle.fail_next_start(BackendError::Disconnected);
    let kept = controller.capture_photo().unwrap();
    assert_eq!(kept.slot, CaptureSlot::new(Side::Left, Angle::Side));
    assert_eq!(controller.image_count(), 2);
    assert_eq!(
        controller.step(),
        CaptureStep::Capture(CaptureSlot::new(Side::Left, Angle::Sole))
    );
    assert_eq!(controller.session_error(), Some(&BackendError::Disconnected));

    let err = controller.capture_photo().unwrap_err();
    assert!(matches!(err, CaptureError::NoActiveSession));

    controller.retry().unwrap();
    assert!(controller.session_error().is_none());
    controller.capture_photo().unwrap();
    assert_eq!(controller.image_count(), 3);
}

#[tokio::test]
async fn test_video_take_fills_slot() {
    let frames: Vec<_> = (0..20).map(|_| sharp_frame()).collect();
    let camera = VirtualCamera::new().with_take(frames, 4.0);
    let mut controller = CaptureController::new(Box::new(camera), Config::default());
    controller.begin().unwrap();
    controller.set_mode(CaptureMode::Video).unwrap();

    controller.start_recording().unwrap();
    assert!(controller.recording_state().is_recording());
    assert!(matches!(
        controller.set_mode(CaptureMode::Photo),
        Err(CaptureError::AlreadyRecording)
    ));

    let outcome = controller.stop_recording().await.unwrap();
    let VideoOutcome::Frames(images) = outcome else {
        panic!("expected frames");
    };
    assert!(!images.is_empty() && images.len() <= 5);
    assert!(
        images
            .iter()
            .all(|i| matches!(i.source, ImageSource::VideoFrame { .. }) && i.slot == CaptureSlot::first())
    );
    assert_eq!(
        controller.step(),
        CaptureStep::Capture(CaptureSlot::new(Side::Left, Angle::Side))
    );
}

#[tokio::test]
async fn test_video_take_only_keeps_sharp_frames() {
    let camera = VirtualCamera::new().with_take(mostly_blurred_frames(), 4.0);
    let mut controller = CaptureController::new(Box::new(camera), Config::default());
    controller.begin().unwrap();
    controller.set_mode(CaptureMode::Video).unwrap();
    controller.start_recording().unwrap();

    let VideoOutcome::Frames(images) = controller.stop_recording().await.unwrap() else {
        panic!("expected frames");
    };
    assert!(images.iter().all(|i| i.quality.blur_ok));
}

#[tokio::test]
async fn test_blurred_take_needs_retake() {
    let frames: Vec<_> = (0..20).map(|_| blurred_frame()).collect();
    let camera = VirtualCamera::new().with_take(frames, 4.0);
    let mut controller = CaptureController::new(Box::new(camera), Config::default());
    controller.begin().unwrap();
    controller.set_mode(CaptureMode::Video).unwrap();
    controller.start_recording().unwrap();

    let outcome = controller.stop_recording().await.unwrap();
    assert!(matches!(outcome, VideoOutcome::RetakeNeeded));
    assert_eq!(controller.step(), CaptureStep::Capture(CaptureSlot::first()));
    assert_eq!(controller.image_count(), 0);
    assert!(controller.has_session());

    // The operator can record again straight away
    controller.start_recording().unwrap();
}
