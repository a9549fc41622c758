// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Defaults for every tunable live here. [`crate::config::Config`] starts
//! from these values and lets a site override them.

use std::time::Duration;

/// Image quality thresholds (8-bit luma scale)
pub mod quality {
    /// BT.601 luma weights
    pub const LUMA_R: f32 = 0.299;
    pub const LUMA_G: f32 = 0.587;
    pub const LUMA_B: f32 = 0.114;

    /// Mean luma must lie strictly above this value
    pub const BRIGHTNESS_MIN: f32 = 40.0;
    /// Mean luma must lie strictly below this value
    pub const BRIGHTNESS_MAX: f32 = 220.0;

    /// Full-resolution Laplacian energy needed to pass the blur check
    pub const FULL_BLUR_THRESHOLD: f64 = 100.0;
    /// Laplacian energy needed to pass the quick (centre window) check
    pub const QUICK_BLUR_THRESHOLD: f64 = 80.0;
    /// Side length of the centred window used by the quick check
    pub const QUICK_WINDOW: u32 = 100;

    /// Minimum max-min luma spread
    pub const CONTRAST_MIN: f32 = 80.0;

    /// Brightness is sampled on every Nth pixel
    pub const BRIGHTNESS_PIXEL_STRIDE: usize = 4;
}

/// Live quality monitor cadence and working resolution
pub mod monitor {
    use super::Duration;

    pub const TICK_INTERVAL: Duration = Duration::from_millis(500);
    pub const SAMPLE_WIDTH: u32 = 160;
    pub const SAMPLE_HEIGHT: u32 = 120;
    /// Buffers kept around by the downsample pool
    pub const POOL_CAPACITY: usize = 2;
}

/// Guided capture flow
pub mod capture {
    use super::Duration;

    /// Hard cap on a single video take
    pub const MAX_RECORDING_DURATION: Duration = Duration::from_secs(30);
    /// How often the recording watchdog checks the cap
    pub const RECORDING_WATCHDOG_INTERVAL: Duration = Duration::from_millis(250);
    /// Images needed before a non-simulated scan can be completed
    pub const MIN_IMAGES: usize = 10;
    /// JPEG quality for still photos
    pub const PHOTO_JPEG_QUALITY: u8 = 92;
    /// Requested camera resolution
    pub const TARGET_WIDTH: u32 = 1920;
    pub const TARGET_HEIGHT: u32 = 1080;
    /// How long a still grab waits for the next frame
    pub const FRAME_TIMEOUT: Duration = Duration::from_secs(3);
}

/// Frame extraction from a recorded take
pub mod extraction {
    pub const TARGET_FRAME_COUNT: usize = 8;
    /// Seek points per target frame
    pub const OVERSAMPLE_FACTOR: usize = 2;
    pub const SELECTED_FRAME_COUNT: usize = 5;
    /// Seconds skipped at both ends of a take
    pub const EDGE_MARGIN_SECS: f64 = 0.5;
    pub const SCORE_WIDTH: u32 = 200;
    pub const SCORE_HEIGHT: u32 = 150;
    pub const FRAME_JPEG_QUALITY: u8 = 90;
    /// Frame rate assumed for MJPEG takes without their own timing
    pub const DEFAULT_MJPEG_FPS: f64 = 30.0;
    /// Timeout for a decoder to settle after a seek
    pub const SEEK_TIMEOUT_SECS: u64 = 5;
}

/// Foot model geometry
pub mod geometry {
    /// Scene units per millimetre (1 unit = 10 mm)
    pub const MM_TO_UNITS: f32 = 0.1;
    pub const SEGMENTS_X: u32 = 30;
    pub const SEGMENTS_Z: u32 = 60;
    /// Minimum lateral distance of each foot from the midline, in scene units
    pub const SIDE_OFFSET: f32 = 6.0;

    pub const DEFAULT_LENGTH_MM: f32 = 260.0;
    pub const DEFAULT_WIDTH_MM: f32 = 100.0;
    pub const DEFAULT_ARCH_HEIGHT_MM: f32 = 25.0;

    /// Solid tint used when the pressure overlay is off
    pub const LEFT_TINT: u32 = 0x607d7d;
    pub const RIGHT_TINT: u32 = 0x5dc9c0;

    /// Gap between a foot and its measurement guides, in scene units
    pub const GUIDE_OFFSET: f32 = 1.5;
}

/// Pressure heat scale stops
pub mod pressure {
    pub const LOW: u32 = 0x2563eb;
    pub const MID_LOW: u32 = 0x22c55e;
    pub const MID_HIGH: u32 = 0xeab308;
    pub const HIGH: u32 = 0xef4444;

    pub const FIRST_STOP: f32 = 0.33;
    pub const SECOND_STOP: f32 = 0.66;
}

/// File naming
pub mod file_formats {
    /// Extensions decoded by the GStreamer take decoder
    pub const CONTAINER_EXTENSIONS: &[&str] = &["webm", "mkv", "mp4", "mov"];
    /// Extensions decoded by the built-in MJPEG reader
    pub const MJPEG_EXTENSIONS: &[&str] = &["mjpeg", "mjpg"];

    /// Check if an extension names a container format
    pub fn is_container_extension(ext: &str) -> bool {
        CONTAINER_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }

    /// Check if an extension names a raw MJPEG stream
    pub fn is_mjpeg_extension(ext: &str) -> bool {
        MJPEG_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application metadata
pub mod app_info {
    /// Version string stamped by the build script
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    /// Generator string written into exported files
    pub fn generator() -> String {
        format!("footscan {}", version())
    }
}
