// SPDX-License-Identifier: GPL-3.0-only

//! Still photo pipeline
//!
//! ```text
//! FrameSource ─grab─▶ full-resolution quality ─▶ JPEG ─▶ CapturedImage
//! ```

pub mod capture;
pub mod encoding;

pub use capture::PhotoCapture;
pub use encoding::{EncodedImage, PhotoEncoder};
