// SPDX-License-Identifier: GPL-3.0-only

//! Media processing utilities
//!
//! Plain pixel and byte handling shared by the capture and extraction paths:
//!
//! - [`buffer_pool`]: reusable byte buffers for per-tick work
//! - [`scaler`]: format-aware area downsampling and luma conversion
//! - [`encoders`]: JPEG stills and MJPEG takes
//! - [`decoders`]: seekable readers for recorded takes

pub mod buffer_pool;
pub mod decoders;
pub mod encoders;
pub mod scaler;

pub use buffer_pool::{BufferPool, PooledBuffer};
pub use decoders::{SeekableVideo, open_take};
