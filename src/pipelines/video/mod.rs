// SPDX-License-Identifier: GPL-3.0-only

//! Video take pipeline
//!
//! - [`recorder`]: bounded recording session with an auto-stop cap
//! - [`extractor`]: decode, rank and select the sharpest frames of a take

pub mod extractor;
pub mod recorder;

pub use extractor::{ExtractedFrame, ExtractionConfig, FrameExtractor};
pub use recorder::RecordingSession;
