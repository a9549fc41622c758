// SPDX-License-Identifier: GPL-3.0-only

//! Downsampling and luma conversion
//!
//! Works directly on [`CameraFrame`] rows, so frames with padded strides or
//! BGRA/RGB/gray layouts never need an intermediate full-size RGBA copy.

use crate::backends::camera::types::CameraFrame;
use crate::constants::quality::{LUMA_B, LUMA_G, LUMA_R};

/// BT.601 luma of one pixel
#[inline]
pub fn luma(rgb: [u8; 3]) -> f32 {
    LUMA_R * rgb[0] as f32 + LUMA_G * rgb[1] as f32 + LUMA_B * rgb[2] as f32
}

/// Source span covered by destination index `d` out of `dst_len`
#[inline]
fn span(d: u32, dst_len: u32, src_len: u32) -> (u32, u32) {
    let start = (d as u64 * src_len as u64 / dst_len as u64) as u32;
    let end = ((d as u64 + 1) * src_len as u64 / dst_len as u64) as u32;
    (start.min(src_len - 1), end.max(start + 1).min(src_len))
}

/// Area-average `frame` into a packed RGBA buffer of `dst_width × dst_height`
///
/// `dst` must hold `dst_width * dst_height * 4` bytes. Upscaling degrades to
/// nearest-neighbour. Alpha is written as opaque.
pub fn downsample_rgba_into(frame: &CameraFrame, dst_width: u32, dst_height: u32, dst: &mut [u8]) {
    debug_assert_eq!(dst.len(), dst_width as usize * dst_height as usize * 4);
    if frame.width == 0 || frame.height == 0 || dst_width == 0 || dst_height == 0 {
        return;
    }

    for dy in 0..dst_height {
        let (y0, y1) = span(dy, dst_height, frame.height);
        for dx in 0..dst_width {
            let (x0, x1) = span(dx, dst_width, frame.width);

            let mut sum = [0u32; 3];
            for y in y0..y1 {
                for x in x0..x1 {
                    let px = frame.rgb_at(x, y);
                    sum[0] += px[0] as u32;
                    sum[1] += px[1] as u32;
                    sum[2] += px[2] as u32;
                }
            }
            let count = (y1 - y0) * (x1 - x0);

            let o = (dy as usize * dst_width as usize + dx as usize) * 4;
            dst[o] = ((sum[0] + count / 2) / count) as u8;
            dst[o + 1] = ((sum[1] + count / 2) / count) as u8;
            dst[o + 2] = ((sum[2] + count / 2) / count) as u8;
            dst[o + 3] = 255;
        }
    }
}

/// Area-average `frame` into a freshly allocated RGBA buffer
pub fn downsample_rgba(frame: &CameraFrame, dst_width: u32, dst_height: u32) -> Vec<u8> {
    let mut dst = vec![0u8; dst_width as usize * dst_height as usize * 4];
    downsample_rgba_into(frame, dst_width, dst_height, &mut dst);
    dst
}

/// Luma of every pixel in a packed RGBA buffer
pub fn rgba_to_luma(rgba: &[u8]) -> Vec<f32> {
    rgba.chunks_exact(4)
        .map(|px| luma([px[0], px[1], px[2]]))
        .collect()
}

/// Luma of a rectangular window of a frame, row-major
pub fn frame_luma_window(frame: &CameraFrame, x0: u32, y0: u32, width: u32, height: u32) -> Vec<f32> {
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for y in y0..y0 + height {
        for x in x0..x0 + width {
            out.push(luma(frame.rgb_at(x, y)));
        }
    }
    out
}

/// Luma of the whole frame, row-major
pub fn frame_luma(frame: &CameraFrame) -> Vec<f32> {
    frame_luma_window(frame, 0, 0, frame.width, frame.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma([0, 0, 0]), 0.0);
        assert!((luma([255, 255, 255]) - 255.0).abs() < 1e-3);
        assert!((luma([100, 0, 0]) - 29.9).abs() < 1e-3);
    }

    #[test]
    fn test_downsample_averages_blocks() {
        // 4x2 frame: left half black, right half white
        let mut data = Vec::new();
        for _y in 0..2 {
            for x in 0..4 {
                let v = if x < 2 { 0 } else { 255 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let frame = CameraFrame::from_rgba(4, 2, data);

        let out = downsample_rgba(&frame, 2, 1);
        assert_eq!(&out[0..4], &[0, 0, 0, 255]);
        assert_eq!(&out[4..8], &[255, 255, 255, 255]);

        let out = downsample_rgba(&frame, 1, 1);
        assert_eq!(out[0], 128);
    }

    #[test]
    fn test_downsample_uniform_frame_keeps_value() {
        let frame = CameraFrame::from_rgba(1920, 1080, vec![90; 1920 * 1080 * 4]);
        let out = downsample_rgba(&frame, 160, 120);
        assert!(out.chunks_exact(4).all(|px| px[0] == 90 && px[3] == 255));
    }

    #[test]
    fn test_upscale_is_nearest() {
        let frame = CameraFrame::from_rgba(1, 1, vec![10, 20, 30, 255]);
        let out = downsample_rgba(&frame, 3, 2);
        assert!(out.chunks_exact(4).all(|px| px == [10, 20, 30, 255]));
    }

    #[test]
    fn test_luma_window() {
        let frame = CameraFrame::from_rgba(3, 3, (0..9).flat_map(|i| [i * 10, i * 10, i * 10, 255]).collect());
        let window = frame_luma_window(&frame, 1, 1, 2, 2);
        assert_eq!(window.len(), 4);
        assert!((window[0] - 40.0).abs() < 1e-3);
        assert!((window[3] - 80.0).abs() < 1e-3);
    }
}
