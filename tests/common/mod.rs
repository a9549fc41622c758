// SPDX-License-Identifier: GPL-3.0-only

//! Frame and take builders shared by the integration tests

#![allow(dead_code)]

use footscan::backends::camera::{CameraFrame, RecordedTake};
use footscan::media::encoders::MjpegWriter;
use image::{ImageBuffer, Rgba, RgbaImage};
use std::time::Duration;

pub const WIDTH: u32 = 320;
pub const HEIGHT: u32 = 240;

fn checkerboard_image(square: u32) -> RgbaImage {
    ImageBuffer::from_fn(WIDTH, HEIGHT, |x, y| {
        let v = if ((x / square) + (y / square)) % 2 == 0 { 60 } else { 200 };
        Rgba([v, v, v, 255])
    })
}

/// Sharp 60/200 checkerboard
pub fn sharp_frame() -> CameraFrame {
    CameraFrame::from_image(&checkerboard_image(16))
}

/// The same checkerboard under a heavy Gaussian blur
pub fn blurred_frame() -> CameraFrame {
    let blurred = image::imageops::blur(&checkerboard_image(16), 8.0);
    CameraFrame::from_image(&blurred)
}

/// The checkerboard under a Gaussian blur of `sigma` pixels
pub fn blurred_by(sigma: f32) -> CameraFrame {
    let blurred = image::imageops::blur(&checkerboard_image(16), sigma);
    CameraFrame::from_image(&blurred)
}

/// Uniform grey at `luma`
pub fn flat_frame(luma: u8) -> CameraFrame {
    CameraFrame::from_rgba(WIDTH, HEIGHT, [luma, luma, luma, 255].repeat((WIDTH * HEIGHT) as usize))
}

/// MJPEG take of `frames` at `fps`
pub fn mjpeg_take(frames: &[CameraFrame], fps: f64) -> RecordedTake {
    let mut writer = MjpegWriter::new(fps, 90);
    for frame in frames {
        writer.push(frame).expect("encode test frame");
    }
    let length = Duration::from_secs_f64(frames.len() as f64 / fps);
    writer.finish(length, false)
}

/// 20 frames at 4 fps where only frames 8..12 are sharp
pub fn mostly_blurred_frames() -> Vec<CameraFrame> {
    (0..20)
        .map(|i| if (8..12).contains(&i) { sharp_frame() } else { blurred_frame() })
        .collect()
}
