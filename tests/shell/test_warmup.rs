// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Lazy model loading and the one-shot warm-up

use anyhow::anyhow;
use caption_speech_node::vision::{
    pipeline::{WARMUP_IMAGE_SIZE, WARMUP_MAX_NEW_TOKENS},
    CaptionPipeline, Captioner, ModelLoader,
};
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records the size and first pixel of every image it sees
#[derive(Default)]
struct RecordingCaptioner {
    seen: Mutex<Vec<(u32, u32, Rgb<u8>, usize)>>,
}

impl Captioner for RecordingCaptioner {
    fn caption(&self, image: &RgbImage, max_new_tokens: usize) -> anyhow::Result<String> {
        self.seen.lock().unwrap().push((
            image.width(),
            image.height(),
            *image.get_pixel(0, 0),
            max_new_tokens,
        ));
        Ok("a gray wall".to_string())
    }
}

fn counting_loader(
    captioner: Arc<RecordingCaptioner>,
    loads: Arc<AtomicUsize>,
    failures_first: usize,
) -> Arc<ModelLoader> {
    Arc::new(ModelLoader::with_factory("recording", move || {
        let captioner = captioner.clone();
        let loads = loads.clone();
        async move {
            let attempt = loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if attempt < failures_first {
                return Err(anyhow!("model files missing"));
            }
            Ok(captioner as Arc<dyn Captioner>)
        }
    }))
}

#[tokio::test]
async fn test_warm_up_uses_gray_image_and_small_budget() {
    let captioner = Arc::new(RecordingCaptioner::default());
    let loads = Arc::new(AtomicUsize::new(0));
    let pipeline = CaptionPipeline::new(counting_loader(captioner.clone(), loads.clone(), 0), 32, 8);

    assert!(!pipeline.loader().is_loaded());
    assert!(pipeline.warm_up().await);
    assert!(pipeline.is_warmed_up());
    assert!(pipeline.loader().is_loaded());

    let seen = captioner.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![(
            WARMUP_IMAGE_SIZE,
            WARMUP_IMAGE_SIZE,
            Rgb([128, 128, 128]),
            WARMUP_MAX_NEW_TOKENS
        )]
    );
}

#[tokio::test]
async fn test_concurrent_warm_up_runs_once() {
    let captioner = Arc::new(RecordingCaptioner::default());
    let loads = Arc::new(AtomicUsize::new(0));
    let pipeline = Arc::new(CaptionPipeline::new(
        counting_loader(captioner.clone(), loads.clone(), 0),
        32,
        8,
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.warm_up().await })
        })
        .collect();

    let mut ran = 0;
    for handle in handles {
        if handle.await.unwrap() {
            ran += 1;
        }
    }

    assert_eq!(ran, 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(captioner.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_load() {
    let captioner = Arc::new(RecordingCaptioner::default());
    let loads = Arc::new(AtomicUsize::new(0));
    let pipeline = Arc::new(CaptionPipeline::new(
        counting_loader(captioner.clone(), loads.clone(), 0),
        32,
        8,
    ));
    let image = RgbImage::from_pixel(10, 10, Rgb([5, 5, 5]));

    let (a, b, c) = tokio::join!(
        pipeline.generate(&image),
        pipeline.generate(&image),
        pipeline.warm_up()
    );
    assert_eq!(a.unwrap(), "a gray wall");
    assert_eq!(b.unwrap(), "a gray wall");
    assert!(c);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_warm_up_lets_requests_retry_load() {
    let captioner = Arc::new(RecordingCaptioner::default());
    let loads = Arc::new(AtomicUsize::new(0));
    let pipeline = CaptionPipeline::new(counting_loader(captioner.clone(), loads.clone(), 1), 32, 8);

    // failure is logged, not surfaced
    assert!(pipeline.warm_up().await);
    assert!(!pipeline.loader().is_loaded());
    assert!(!pipeline.warm_up().await);

    let image = RgbImage::from_pixel(10, 10, Rgb([5, 5, 5]));
    assert_eq!(pipeline.generate(&image).await.unwrap(), "a gray wall");
    assert_eq!(loads.load(Ordering::SeqCst), 2);

    let seen = captioner.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(10, 10, Rgb([5, 5, 5]), 32)]);
}

#[tokio::test]
async fn test_load_failure_is_described_as_caption_error() {
    let captioner = Arc::new(RecordingCaptioner::default());
    let loads = Arc::new(AtomicUsize::new(0));
    let pipeline = CaptionPipeline::new(counting_loader(captioner, loads, usize::MAX), 32, 8);

    let image = RgbImage::from_pixel(10, 10, Rgb([5, 5, 5]));
    let text = pipeline.describe(&image).await;
    assert!(text.starts_with("Error generating caption:"));
    assert!(text.contains("model files missing"));
}
