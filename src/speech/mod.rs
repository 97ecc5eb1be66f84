// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text-to-speech
//!
//! The shell only needs "text in, playable audio out"; the Google Translate
//! backend in `google` is the default implementation.

pub mod chunking;
pub mod google;

pub use chunking::split_for_speech;
pub use google::GoogleTranslateTts;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Audio container of a synthesized clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }
}

/// Encoded speech audio, ready for an `<audio>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Bytes,
    pub format: AudioFormat,
}

impl AudioClip {
    pub fn mp3(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            format: AudioFormat::Mp3,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("no text to speak")]
    EmptyText,

    #[error("invalid TTS endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("TTS request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("TTS service returned {status} for chunk {chunk}")]
    Status {
        status: reqwest::StatusCode,
        chunk: usize,
    },

    #[error("TTS service returned no audio")]
    EmptyAudio,
}

/// Text-to-speech backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` in the configured language
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError>;
}
