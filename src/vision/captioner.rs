// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The captioning seam between the pipeline and a concrete model

use anyhow::Result;
use image::RgbImage;

/// Something that turns an RGB image into a caption
///
/// Implementations are synchronous and CPU-bound; callers run them on the
/// blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait Captioner: Send + Sync {
    /// Generate a caption using at most `max_new_tokens` tokens
    fn caption(&self, image: &RgbImage, max_new_tokens: usize) -> Result<String>;
}
