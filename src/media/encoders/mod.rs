// SPDX-License-Identifier: GPL-3.0-only

//! Image encoders
//!
//! - [`jpeg`]: single frames to JPEG (stills, extracted frames)
//! - [`mjpeg`]: frame sequences to an MJPEG take (virtual camera recordings)

pub mod jpeg;
pub mod mjpeg;

pub use jpeg::encode_frame_jpeg;
pub use mjpeg::MjpegWriter;
