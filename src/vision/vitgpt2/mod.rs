// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ViT-GPT2 image captioning on ONNX Runtime
//!
//! Components:
//! - `preprocessing` - resize/rescale/normalize into `pixel_values`
//! - `encoder` - ViT image encoder
//! - `decoder` - GPT-2 text decoder with greedy generation
//! - `model` - the assembled captioner
//!
//! All sessions run on the CPU execution provider.

pub mod decoder;
pub mod encoder;
pub mod model;
pub mod preprocessing;

pub use decoder::{Gpt2Decoder, GenerationTokens, GPT2_EOS_TOKEN_ID};
pub use encoder::VitEncoder;
pub use model::VitGpt2Model;
pub use preprocessing::{PreprocessorConfig, VIT_INPUT_SIZE};

use anyhow::{bail, Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;
use tracing::info;

/// Build a CPU-only ONNX Runtime session for `model_path`
pub(crate) fn build_cpu_session(
    model_path: &Path,
    intra_threads: usize,
    label: &str,
) -> Result<Session> {
    if !model_path.exists() {
        bail!("{} model not found: {}", label, model_path.display());
    }

    info!("Loading {} from {}", label, model_path.display());

    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load {} from {}", label, model_path.display()))
}
