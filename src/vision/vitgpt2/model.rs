// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Assembled ViT-GPT2 captioner

use anyhow::Result;
use image::RgbImage;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::decoder::{GenerationTokens, Gpt2Decoder};
use super::encoder::VitEncoder;
use super::preprocessing::PreprocessorConfig;
use crate::models::CaptionArtifacts;
use crate::vision::captioner::Captioner;

/// Image processor, encoder, decoder and tokenizer loaded together
#[derive(Debug, Clone)]
pub struct VitGpt2Model {
    processor: PreprocessorConfig,
    encoder: VitEncoder,
    decoder: Gpt2Decoder,
}

impl VitGpt2Model {
    /// Load every component from resolved artifact paths
    ///
    /// Blocking: ONNX Runtime parses and optimizes both graphs here.
    pub fn load(artifacts: &CaptionArtifacts, intra_threads: usize) -> Result<Self> {
        let start = Instant::now();

        let processor = PreprocessorConfig::from_file(&artifacts.preprocessor_config)?;
        let tokens = match &artifacts.model_config {
            Some(path) => GenerationTokens::from_file(path)?,
            None => {
                warn!("No config.json next to the model, using GPT-2 token defaults");
                GenerationTokens::default()
            }
        };

        let encoder = VitEncoder::new(&artifacts.encoder, intra_threads)?;
        let decoder = Gpt2Decoder::new(
            &artifacts.decoder,
            &artifacts.tokenizer,
            tokens,
            intra_threads,
        )?;

        info!(
            "✅ ViT-GPT2 captioner ready in {:?} (input {:?})",
            start.elapsed(),
            processor.target_size()
        );

        Ok(Self {
            processor,
            encoder,
            decoder,
        })
    }
}

impl Captioner for VitGpt2Model {
    fn caption(&self, image: &RgbImage, max_new_tokens: usize) -> Result<String> {
        let start = Instant::now();

        let pixel_values = self.processor.preprocess(image);
        let hidden = self.encoder.encode(&pixel_values)?;
        let token_ids = self.decoder.generate(&hidden, max_new_tokens)?;
        let text = self.decoder.decode(&token_ids)?;
        let caption = text.trim().to_string();

        debug!(
            "Captioned {}x{} image with {} tokens in {:?}: '{}'",
            image.width(),
            image.height(),
            token_ids.len(),
            start.elapsed(),
            caption
        );

        Ok(caption)
    }
}
