// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! GPT-2 caption decoder
//!
//! Greedy autoregressive generation over `decoder_model.onnx` (the export
//! without past key/values). Each step re-runs the full prefix.

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array2, Array3, Ix3};
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::build_cpu_session;

/// GPT-2 `<|endoftext|>`, used as both start and end marker
pub const GPT2_EOS_TOKEN_ID: u32 = 50256;

/// Token ids driving generation, read from the model's `config.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GenerationTokens {
    #[serde(default = "default_token")]
    pub decoder_start_token_id: u32,
    #[serde(default = "default_token")]
    pub eos_token_id: u32,
    #[serde(default = "default_token")]
    pub pad_token_id: u32,
}

fn default_token() -> u32 {
    GPT2_EOS_TOKEN_ID
}

impl Default for GenerationTokens {
    fn default() -> Self {
        Self {
            decoder_start_token_id: GPT2_EOS_TOKEN_ID,
            eos_token_id: GPT2_EOS_TOKEN_ID,
            pad_token_id: GPT2_EOS_TOKEN_ID,
        }
    }
}

impl GenerationTokens {
    /// Read token ids from `config.json`, falling back to GPT-2 defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// GPT-2 decoder session plus tokenizer
#[derive(Clone)]
pub struct Gpt2Decoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    input_names: Vec<String>,
    tokens: GenerationTokens,
}

impl std::fmt::Debug for Gpt2Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gpt2Decoder")
            .field("input_names", &self.input_names)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl Gpt2Decoder {
    /// Load the decoder model and its tokenizer
    pub fn new<P: AsRef<Path>, T: AsRef<Path>>(
        model_path: P,
        tokenizer_path: T,
        tokens: GenerationTokens,
        intra_threads: usize,
    ) -> Result<Self> {
        let tokenizer_path = tokenizer_path.as_ref();
        if !tokenizer_path.exists() {
            bail!("Tokenizer not found: {}", tokenizer_path.display());
        }

        let session = build_cpu_session(model_path.as_ref(), intra_threads, "GPT-2 decoder")?;
        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();

        if let Some(name) = input_names.iter().find(|n| !is_supported_input(n)) {
            bail!(
                "Decoder input '{}' is not supported; use the export without past key values",
                name
            );
        }

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        info!(
            "✅ GPT-2 decoder loaded (inputs: {:?}, vocab: {})",
            input_names,
            tokenizer.get_vocab_size(true)
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            input_names,
            tokens,
        })
    }

    pub fn tokens(&self) -> GenerationTokens {
        self.tokens
    }

    /// Greedily generate up to `max_new_tokens` token ids
    ///
    /// The start token is not part of the result and generation stops at
    /// (without including) the end-of-text token.
    pub fn generate(
        &self,
        encoder_hidden_states: &Array3<f32>,
        max_new_tokens: usize,
    ) -> Result<Vec<u32>> {
        let mut sequence = vec![self.tokens.decoder_start_token_id];

        for step in 0..max_new_tokens {
            let logits = self.next_token_logits(encoder_hidden_states, &sequence)?;
            let next = argmax(&logits).context("Decoder returned empty logits")?;
            if next == self.tokens.eos_token_id {
                debug!("End of text at step {}", step);
                break;
            }
            sequence.push(next);
        }

        Ok(sequence.split_off(1))
    }

    /// Decode ids into text, dropping special tokens
    pub fn decode(&self, token_ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(token_ids, true)
            .map_err(|e| anyhow!("Failed to decode tokens: {}", e))
    }

    /// Logits for the position after `sequence`
    fn next_token_logits(
        &self,
        encoder_hidden_states: &Array3<f32>,
        sequence: &[u32],
    ) -> Result<Vec<f32>> {
        let seq_len = sequence.len();
        let encoder_len = encoder_hidden_states.shape()[1];

        let input_ids = Array2::from_shape_vec(
            (1, seq_len),
            sequence.iter().map(|&t| t as i64).collect(),
        )?;

        let mut inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(self.input_names.len());
        for name in &self.input_names {
            let value: SessionInputValue<'_> = match name.as_str() {
                "input_ids" => Value::from_array(input_ids.clone())?.into(),
                "encoder_hidden_states" => {
                    Value::from_array(encoder_hidden_states.to_owned())?.into()
                }
                "attention_mask" => Value::from_array(Array2::<i64>::ones((1, seq_len)))?.into(),
                "encoder_attention_mask" => {
                    Value::from_array(Array2::<i64>::ones((1, encoder_len)))?.into()
                }
                other => bail!("Unexpected decoder input '{}'", other),
            };
            inputs.push((Cow::from(name.as_str()), value));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("GPT-2 decoder session lock poisoned"))?;

        let outputs = session
            .run(inputs)
            .context("GPT-2 decoder inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract logits")?
            .into_dimensionality::<Ix3>()
            .context("Decoder logits are not rank 3")?;

        let last = logits.shape()[1]
            .checked_sub(1)
            .context("Decoder returned no positions")?;
        Ok(logits.slice(ndarray::s![0, last, ..]).to_vec())
    }
}

fn is_supported_input(name: &str) -> bool {
    matches!(
        name,
        "input_ids" | "encoder_hidden_states" | "attention_mask" | "encoder_attention_mask"
    )
}

/// Index of the highest logit; NaNs never win
pub fn argmax(logits: &[f32]) -> Option<u32> {
    logits
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx as u32)
}
