// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision: image acquisition and caption generation
//!
//! - `image_utils` - decode uploads and URL bodies, encode previews
//! - `fetch` - download images from user-supplied URLs
//! - `vitgpt2` - ViT-GPT2 ONNX captioning model
//! - `loader` - lazy process-wide model holder
//! - `pipeline` - caption generation, error rendering, warm-up

pub mod captioner;
pub mod fetch;
pub mod image_utils;
pub mod loader;
pub mod pipeline;
pub mod vitgpt2;

pub use captioner::Captioner;
pub use fetch::{FetchError, ImageFetcher};
pub use image_utils::{decode_image_bytes, ImageError, ImageInfo};
pub use loader::ModelLoader;
pub use pipeline::{CaptionError, CaptionPipeline};
