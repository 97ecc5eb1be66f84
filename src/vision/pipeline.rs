// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption generation and the one-shot warm-up

use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::loader::ModelLoader;
use crate::config::CaptionConfig;

/// Token budget for real caption requests
pub const DEFAULT_MAX_NEW_TOKENS: usize = 32;

/// Token budget for the warm-up dry run
pub const WARMUP_MAX_NEW_TOKENS: usize = 8;

/// Side length of the synthetic warm-up image
pub const WARMUP_IMAGE_SIZE: u32 = 64;

/// Prefix used when an error is rendered in place of a caption
pub const CAPTION_ERROR_PREFIX: &str = "Error generating caption:";

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("model unavailable: {0:#}")]
    ModelUnavailable(anyhow::Error),

    #[error("{0:#}")]
    Inference(anyhow::Error),

    #[error("caption worker failed: {0}")]
    Worker(String),
}

/// Image-to-caption pipeline over a lazily loaded model
#[derive(Debug)]
pub struct CaptionPipeline {
    loader: Arc<ModelLoader>,
    max_new_tokens: usize,
    warmup_max_new_tokens: usize,
    warm_up_started: AtomicBool,
    warm_up_completed: AtomicBool,
}

impl CaptionPipeline {
    pub fn new(loader: Arc<ModelLoader>, max_new_tokens: usize, warmup_max_new_tokens: usize) -> Self {
        Self {
            loader,
            max_new_tokens,
            warmup_max_new_tokens,
            warm_up_started: AtomicBool::new(false),
            warm_up_completed: AtomicBool::new(false),
        }
    }

    pub fn from_config(loader: Arc<ModelLoader>, config: &CaptionConfig) -> Self {
        Self::new(loader, config.max_new_tokens, config.warmup_max_new_tokens)
    }

    /// Caption an image with the configured token budget
    pub async fn generate(&self, image: &RgbImage) -> Result<String, CaptionError> {
        self.run(image.clone(), self.max_new_tokens).await
    }

    /// Caption an image, rendering any failure as displayable text
    pub async fn describe(&self, image: &RgbImage) -> String {
        match self.generate(image).await {
            Ok(caption) => caption,
            Err(e) => format!("{} {}", CAPTION_ERROR_PREFIX, e),
        }
    }

    /// Run one throwaway inference on a small gray image
    ///
    /// At most once per pipeline, however often or concurrently this is
    /// called. Returns whether this call did the work. Failures are logged
    /// and swallowed.
    pub async fn warm_up(&self) -> bool {
        if self.warm_up_started.swap(true, Ordering::SeqCst) {
            return false;
        }

        let start = Instant::now();
        let blank = RgbImage::from_pixel(
            WARMUP_IMAGE_SIZE,
            WARMUP_IMAGE_SIZE,
            Rgb([128, 128, 128]),
        );
        match self.run(blank, self.warmup_max_new_tokens).await {
            Ok(text) => {
                self.warm_up_completed.store(true, Ordering::SeqCst);
                info!("🔥 Warm-up finished in {:?} ('{}')", start.elapsed(), text)
            }
            Err(e) => warn!("Warm-up failed: {}", e),
        }
        true
    }

    /// Whether a warm-up has been claimed (running, finished or failed)
    pub fn is_warm_up_started(&self) -> bool {
        self.warm_up_started.load(Ordering::SeqCst)
    }

    /// Whether the warm-up dry run finished successfully
    pub fn is_warmed_up(&self) -> bool {
        self.warm_up_completed.load(Ordering::SeqCst)
    }

    pub fn loader(&self) -> &Arc<ModelLoader> {
        &self.loader
    }

    pub fn max_new_tokens(&self) -> usize {
        self.max_new_tokens
    }

    async fn run(&self, image: RgbImage, max_new_tokens: usize) -> Result<String, CaptionError> {
        let captioner = self
            .loader
            .get()
            .await
            .map_err(CaptionError::ModelUnavailable)?;

        let start = Instant::now();
        let result =
            tokio::task::spawn_blocking(move || captioner.caption(&image, max_new_tokens)).await;

        match result {
            Ok(Ok(text)) => {
                let caption = text.trim().to_string();
                debug!("Caption generated in {:?}", start.elapsed());
                Ok(caption)
            }
            Ok(Err(e)) => Err(CaptionError::Inference(e)),
            Err(join_error) if join_error.is_panic() => Err(CaptionError::Worker(
                "inference panicked".to_string(),
            )),
            Err(join_error) => Err(CaptionError::Worker(join_error.to_string())),
        }
    }
}
