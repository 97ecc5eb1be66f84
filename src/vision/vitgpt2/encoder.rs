// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ViT image encoder
//!
//! Turns `pixel_values` [1, 3, 224, 224] into the hidden states the GPT-2
//! decoder cross-attends to.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array3, Array4, Ix3};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::build_cpu_session;

/// ViT encoder ONNX session
#[derive(Clone)]
pub struct VitEncoder {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for VitEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VitEncoder")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl VitEncoder {
    /// Load the encoder from `encoder_model.onnx`
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime rejects it
    pub fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();
        let session = build_cpu_session(model_path, intra_threads, "ViT encoder")?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .unwrap_or_else(|| "last_hidden_state".to_string());

        info!(
            "✅ ViT encoder loaded (input: {}, output: {})",
            input_name, output_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
        })
    }

    /// Encode preprocessed pixels into hidden states [1, patches, hidden]
    pub fn encode(&self, pixel_values: &Array4<f32>) -> Result<Array3<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ViT encoder session lock poisoned"))?;

        let input_value = Value::from_array(pixel_values.to_owned())
            .context("Failed to create pixel_values tensor")?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("ViT encoder inference failed")?;

        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract encoder hidden states")?
            .into_dimensionality::<Ix3>()
            .context("Encoder output is not rank 3")?
            .to_owned();

        debug!("Encoder hidden states shape: {:?}", hidden.shape());
        Ok(hidden)
    }
}
