// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Application configuration
//!
//! Values come from three layers, later layers winning:
//! 1. `Default` impls below
//! 2. an optional TOML file (`AppConfig::from_file`)
//! 3. environment variables (`AppConfig::apply_env`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hugging Face repository holding the ONNX export of `nlpconnect/vit-gpt2-image-captioning`
pub const DEFAULT_MODEL_REPO: &str = "Xenova/vit-gpt2-image-captioning";

/// Google Translate TTS endpoint (the one gTTS-style clients talk to)
pub const DEFAULT_TTS_ENDPOINT: &str = "https://translate.google.{tld}/translate_tts";

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    pub listen_addr: String,
    /// Maximum accepted request body (uploads)
    pub upload_limit_bytes: usize,
    /// Idle time after which a browser session is dropped
    pub session_ttl_secs: u64,
    /// Maximum number of concurrent browser sessions
    pub max_sessions: usize,
    /// Load the model and run the warm-up before accepting traffic
    pub warmup_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8501".to_string(),
            upload_limit_bytes: 20 * 1024 * 1024,
            session_ttl_secs: 3600,
            max_sessions: 1000,
            warmup_on_start: false,
        }
    }
}

/// Caption model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Hub repository id
    pub model_repo: String,
    /// Hub revision (branch, tag or commit)
    pub revision: String,
    /// Load from this directory instead of the hub
    pub model_dir: Option<PathBuf>,
    /// Hub cache directory (defaults to the standard HF cache)
    pub cache_dir: Option<PathBuf>,
    /// Token budget for real caption requests
    pub max_new_tokens: usize,
    /// Token budget for the warm-up dry run
    pub warmup_max_new_tokens: usize,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            revision: "main".to_string(),
            model_dir: None,
            cache_dir: None,
            max_new_tokens: 32,
            warmup_max_new_tokens: 8,
            intra_threads: 4,
        }
    }
}

/// Remote image fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Text-to-speech settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// TTS endpoint URL; `{tld}` is replaced with `tld`
    pub endpoint: String,
    /// Spoken language (IETF tag understood by the endpoint)
    pub lang: String,
    /// Top-level domain of the Google host to use
    pub tld: String,
    pub timeout_secs: u64,
    /// Longest text fragment sent in a single TTS call
    pub max_chunk_chars: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
            lang: "en".to_string(),
            tld: "com".to_string(),
            timeout_secs: 30,
            max_chunk_chars: 100,
        }
    }
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Complete node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub caption: CaptionConfig,
    pub fetch: FetchConfig,
    pub speech: SpeechConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and keys fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u64 = |key: &str| lookup(key).and_then(|v| v.parse::<u64>().ok());
        let parse_usize = |key: &str| lookup(key).and_then(|v| v.parse::<usize>().ok());

        if let Some(v) = lookup("API_LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Some(v) = parse_usize("UPLOAD_LIMIT_BYTES") {
            self.server.upload_limit_bytes = v;
        }
        if let Some(v) = parse_u64("SESSION_TTL_SECS") {
            self.server.session_ttl_secs = v;
        }
        if let Some(v) = parse_usize("MAX_SESSIONS") {
            self.server.max_sessions = v;
        }
        if let Some(v) = lookup("WARMUP_ON_START") {
            self.server.warmup_on_start = v.to_lowercase() == "true" || v == "1";
        }

        if let Some(v) = lookup("CAPTION_MODEL_REPO") {
            self.caption.model_repo = v;
        }
        if let Some(v) = lookup("CAPTION_MODEL_REVISION") {
            self.caption.revision = v;
        }
        if let Some(v) = lookup("CAPTION_MODEL_DIR") {
            self.caption.model_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HF_CACHE_DIR") {
            self.caption.cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = parse_usize("CAPTION_MAX_NEW_TOKENS") {
            self.caption.max_new_tokens = v;
        }
        if let Some(v) = parse_usize("CAPTION_INTRA_THREADS") {
            self.caption.intra_threads = v;
        }

        if let Some(v) = parse_u64("IMAGE_FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = v;
        }

        if let Some(v) = lookup("TTS_ENDPOINT") {
            self.speech.endpoint = v;
        }
        if let Some(v) = lookup("TTS_LANG") {
            self.speech.lang = v;
        }
        if let Some(v) = lookup("TTS_TLD") {
            self.speech.tld = v;
        }
        if let Some(v) = parse_u64("TTS_TIMEOUT_SECS") {
            self.speech.timeout_secs = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.caption.max_new_tokens == 0 {
            return Err("caption.max_new_tokens must be greater than 0".to_string());
        }
        if self.caption.warmup_max_new_tokens == 0 {
            return Err("caption.warmup_max_new_tokens must be greater than 0".to_string());
        }
        if self.caption.intra_threads == 0 {
            return Err("caption.intra_threads must be greater than 0".to_string());
        }
        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be greater than 0".to_string());
        }
        if self.speech.timeout_secs == 0 {
            return Err("speech.timeout_secs must be greater than 0".to_string());
        }
        if self.speech.max_chunk_chars == 0 {
            return Err("speech.max_chunk_chars must be greater than 0".to_string());
        }
        if self.server.upload_limit_bytes == 0 {
            return Err("server.upload_limit_bytes must be greater than 0".to_string());
        }
        if self.server.max_sessions == 0 {
            return Err("server.max_sessions must be greater than 0".to_string());
        }
        if self.server.session_ttl_secs == 0 {
            return Err("server.session_ttl_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
