// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for frame extraction

mod common;

use common::{blurred_by, blurred_frame, flat_frame, mjpeg_take, mostly_blurred_frames, sharp_frame};
use footscan::FrameExtractor;
use footscan::pipelines::video::ExtractionConfig;
use std::time::Duration;

#[tokio::test]
async fn test_sharp_window_is_selected() {
    let take = mjpeg_take(&mostly_blurred_frames(), 4.0);
    let frames = FrameExtractor::default().extract(take).await.unwrap();

    assert!(!frames.is_empty());
    assert!(frames.len() <= 5);
    for frame in &frames {
        assert!(
            frame.position >= Duration::from_secs(2) && frame.position < Duration::from_secs(3),
            "blurred frame at {:?} selected",
            frame.position
        );
        assert_eq!(&frame.jpeg[0..2], &[0xFF, 0xD8]);
        assert!(frame.quality.blur_ok);
    }
    assert!(frames.windows(2).all(|w| w[0].position < w[1].position));
}

#[tokio::test]
async fn test_least_blurred_frames_win() {
    // 16 frames at 1 fps line up with the 16 seek points; blur rank k gets
    // sigma 0.5 + 0.25k and the ranks are spread out of time order
    let rank_of = |i: usize| (i * 7) % 16;
    let frames: Vec<_> = (0..16)
        .map(|i| blurred_by(0.5 + 0.25 * rank_of(i) as f32))
        .collect();
    let extracted = FrameExtractor::default()
        .extract(mjpeg_take(&frames, 1.0))
        .await
        .unwrap();

    let picked: Vec<u64> = extracted.iter().map(|f| f.position.as_secs()).collect();
    assert_eq!(picked, vec![0, 5, 7, 12, 14]);

    let mut by_score = extracted.clone();
    by_score.sort_by(|a, b| b.score.total_cmp(&a.score));
    let ranks: Vec<usize> = by_score
        .iter()
        .map(|f| rank_of(f.position.as_secs() as usize))
        .collect();
    assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_selection_is_capped() {
    let frames: Vec<_> = (0..40).map(|_| sharp_frame()).collect();
    let take = mjpeg_take(&frames, 4.0);
    let extracted = FrameExtractor::default().extract(take).await.unwrap();
    assert_eq!(extracted.len(), 5);
}

#[tokio::test]
async fn test_custom_selection_size() {
    let config = ExtractionConfig {
        select: 2,
        ..ExtractionConfig::default()
    };
    let frames: Vec<_> = (0..40).map(|_| sharp_frame()).collect();
    let extractor = FrameExtractor::new(config, Default::default());
    let extracted = extractor.extract(mjpeg_take(&frames, 4.0)).await.unwrap();
    assert_eq!(extracted.len(), 2);
}

#[tokio::test]
async fn test_flat_take_yields_nothing() {
    let frames: Vec<_> = (0..20).map(|_| flat_frame(128)).collect();
    let extracted = FrameExtractor::default()
        .extract(mjpeg_take(&frames, 4.0))
        .await
        .unwrap();
    assert!(extracted.is_empty());
}

#[tokio::test]
async fn test_blurred_take_yields_nothing() {
    let frames: Vec<_> = (0..20).map(|_| blurred_frame()).collect();
    let extracted = FrameExtractor::default()
        .extract(mjpeg_take(&frames, 4.0))
        .await
        .unwrap();
    assert!(extracted.is_empty());
}

#[tokio::test]
async fn test_short_take_is_sampled_once() {
    // Two frames at 4 fps: shorter than both edge margins
    let take = mjpeg_take(&[sharp_frame(), sharp_frame()], 4.0);
    let extracted = FrameExtractor::default().extract(take).await.unwrap();
    assert_eq!(extracted.len(), 1);
    assert_eq!(extracted[0].position, Duration::from_millis(250));
}
