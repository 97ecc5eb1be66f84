// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the ViT encoder
//!
//! Mirrors the `ViTImageProcessor` settings shipped with the model in
//! `preprocessor_config.json`: stretch-resize, rescale, normalize, NCHW.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use ndarray::Array4;
use serde::Deserialize;
use std::path::Path;

/// Input resolution of the ViT encoder
pub const VIT_INPUT_SIZE: u32 = 224;

/// ViT normalization mean (per channel)
pub const MEAN: [f32; 3] = [0.5, 0.5, 0.5];

/// ViT normalization std (per channel)
pub const STD: [f32; 3] = [0.5, 0.5, 0.5];

/// `size` is either a bare integer or an object, depending on the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    Square(u32),
    HeightWidth { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
}

/// Subset of `preprocessor_config.json` the encoder depends on
#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessorConfig {
    #[serde(default = "default_true")]
    pub do_resize: bool,
    #[serde(default = "default_size")]
    pub size: SizeSpec,
    /// PIL resample id (0 nearest, 1 lanczos, 2 bilinear, 3 bicubic)
    #[serde(default = "default_resample")]
    pub resample: u8,
    #[serde(default = "default_true")]
    pub do_rescale: bool,
    #[serde(default = "default_rescale_factor")]
    pub rescale_factor: f32,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    #[serde(default = "default_mean")]
    pub image_mean: [f32; 3],
    #[serde(default = "default_std")]
    pub image_std: [f32; 3],
}

fn default_true() -> bool {
    true
}

fn default_size() -> SizeSpec {
    SizeSpec::Square(VIT_INPUT_SIZE)
}

fn default_resample() -> u8 {
    2
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

fn default_mean() -> [f32; 3] {
    MEAN
}

fn default_std() -> [f32; 3] {
    STD
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: default_size(),
            resample: default_resample(),
            do_rescale: true,
            rescale_factor: default_rescale_factor(),
            do_normalize: true,
            image_mean: MEAN,
            image_std: STD,
        }
    }
}

impl PreprocessorConfig {
    /// Load `preprocessor_config.json`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Target (width, height) of the resized image
    pub fn target_size(&self) -> (u32, u32) {
        match self.size {
            SizeSpec::Square(side) => (side, side),
            SizeSpec::HeightWidth { height, width } => (width, height),
            SizeSpec::ShortestEdge { shortest_edge } => (shortest_edge, shortest_edge),
        }
    }

    /// Resize filter matching the PIL resample id
    pub fn filter(&self) -> FilterType {
        match self.resample {
            0 => FilterType::Nearest,
            1 => FilterType::Lanczos3,
            3 => FilterType::CatmullRom,
            _ => FilterType::Triangle,
        }
    }

    /// Convert an RGB image to `pixel_values` [1, 3, H, W]
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let (target_w, target_h) = self.target_size();

        let resized = if image.width() == 0 || image.height() == 0 {
            RgbImage::from_pixel(target_w, target_h, Rgb([128, 128, 128]))
        } else if self.do_resize && image.dimensions() != (target_w, target_h) {
            image::imageops::resize(image, target_w, target_h, self.filter())
        } else {
            image.clone()
        };

        let (width, height) = (resized.width() as usize, resized.height() as usize);
        let mut tensor = Array4::zeros((1, 3, height, width));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let mut value = pixel[c] as f32;
                if self.do_rescale {
                    value *= self.rescale_factor;
                }
                if self.do_normalize {
                    value = (value - self.image_mean[c]) / self.image_std[c];
                }
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }

        tensor
    }
}
