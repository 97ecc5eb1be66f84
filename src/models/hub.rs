// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption model artifact resolution
//!
//! Artifacts come either from a local directory or from the Hugging Face hub,
//! where `hf-hub` downloads once into its cache and reuses the cached files
//! on later runs.

use anyhow::{Context, Result};
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::CaptionConfig;

/// Candidate locations of the encoder graph, hub layout first
pub const ENCODER_FILES: &[&str] = &["onnx/encoder_model.onnx", "encoder_model.onnx", "encoder.onnx"];

/// Candidate locations of the decoder graph (the variant without past key values)
pub const DECODER_FILES: &[&str] = &["onnx/decoder_model.onnx", "decoder_model.onnx", "decoder.onnx"];

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor_config.json";
pub const MODEL_CONFIG_FILE: &str = "config.json";

/// On-disk locations of everything the captioner loads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionArtifacts {
    pub encoder: PathBuf,
    pub decoder: PathBuf,
    pub tokenizer: PathBuf,
    pub preprocessor_config: PathBuf,
    /// `config.json`; optional, token ids default to GPT-2's
    pub model_config: Option<PathBuf>,
}

impl CaptionArtifacts {
    /// Locate artifacts in a local model directory
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            anyhow::bail!("Model directory not found: {}", dir.display());
        }

        let model_config = dir.join(MODEL_CONFIG_FILE);
        Ok(Self {
            encoder: find_model_file(dir, ENCODER_FILES)?,
            decoder: find_model_file(dir, DECODER_FILES)?,
            tokenizer: find_model_file(dir, &[TOKENIZER_FILE])?,
            preprocessor_config: find_model_file(dir, &[PREPROCESSOR_FILE])?,
            model_config: model_config.exists().then_some(model_config),
        })
    }
}

/// Where the caption model comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Hub {
        repo_id: String,
        revision: String,
        cache_dir: Option<PathBuf>,
    },
    Local(PathBuf),
}

impl ModelSource {
    /// A configured `model_dir` wins over the hub
    pub fn from_config(config: &CaptionConfig) -> Self {
        match &config.model_dir {
            Some(dir) => Self::Local(dir.clone()),
            None => Self::Hub {
                repo_id: config.model_repo.clone(),
                revision: config.revision.clone(),
                cache_dir: config.cache_dir.clone(),
            },
        }
    }

    /// Human-readable model identifier
    pub fn describe(&self) -> String {
        match self {
            Self::Hub { repo_id, revision, .. } if revision == "main" => repo_id.clone(),
            Self::Hub { repo_id, revision, .. } => format!("{}@{}", repo_id, revision),
            Self::Local(dir) => dir.display().to_string(),
        }
    }

    /// Resolve artifacts to local paths, downloading when needed
    ///
    /// Blocking: hub downloads use the synchronous client.
    pub fn resolve(&self) -> Result<CaptionArtifacts> {
        match self {
            Self::Local(dir) => {
                info!("Using local caption model at {}", dir.display());
                CaptionArtifacts::from_dir(dir)
            }
            Self::Hub {
                repo_id,
                revision,
                cache_dir,
            } => download_from_hub(repo_id, revision, cache_dir.as_deref()),
        }
    }
}

fn download_from_hub(
    repo_id: &str,
    revision: &str,
    cache_dir: Option<&Path>,
) -> Result<CaptionArtifacts> {
    info!("Resolving caption model {}@{} from Hugging Face", repo_id, revision);

    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir.to_path_buf());
    }
    let api = builder
        .build()
        .context("failed to initialise Hugging Face API client")?;
    let repo = api.repo(Repo::with_revision(
        repo_id.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    let fetch_first = |names: &[&str]| -> Result<PathBuf> {
        let mut last_error = None;
        for name in names {
            match repo.get(name) {
                Ok(path) => {
                    debug!("Resolved {} -> {}", name, path.display());
                    return Ok(path);
                }
                Err(e) => last_error = Some(e),
            }
        }
        match last_error {
            Some(e) => Err(e).with_context(|| {
                format!("failed to download any of {:?} from {}", names, repo_id)
            }),
            None => anyhow::bail!("no candidate files given"),
        }
    };

    let encoder = fetch_first(ENCODER_FILES)?;
    let decoder = fetch_first(DECODER_FILES)?;
    let tokenizer = fetch_first(&[TOKENIZER_FILE])?;
    let preprocessor_config = fetch_first(&[PREPROCESSOR_FILE])?;
    let model_config = match repo.get(MODEL_CONFIG_FILE) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("{} unavailable for {}: {}", MODEL_CONFIG_FILE, repo_id, e);
            None
        }
    };

    info!("✅ Caption model artifacts ready for {}", repo_id);

    Ok(CaptionArtifacts {
        encoder,
        decoder,
        tokenizer,
        preprocessor_config,
        model_config,
    })
}

/// Return the first of `names` that exists under `dir`
fn find_model_file(dir: &Path, names: &[&str]) -> Result<PathBuf> {
    for name in names {
        let path = dir.join(name);
        if path.exists() {
            return Ok(path);
        }
    }
    anyhow::bail!(
        "Model file not found in {}. Tried: {:?}",
        dir.display(),
        names
    );
}
