// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Google Translate text-to-speech client
//!
//! Speaks text through the public `translate_tts` endpoint (the same one
//! gTTS uses). Long text is split into pieces, each piece is fetched as MP3
//! and the MP3 frames are concatenated in order.

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::chunking::split_for_speech;
use super::{AudioClip, SpeechError, SpeechSynthesizer};
use crate::config::SpeechConfig;

/// Client identifier the endpoint expects from non-browser callers
const TTS_CLIENT: &str = "tw-ob";

/// Client for the Google Translate TTS endpoint
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    client: Client,
    endpoint: Url,
    lang: String,
    max_chunk_chars: usize,
}

impl GoogleTranslateTts {
    /// Build a client from configuration
    ///
    /// `{tld}` in the configured endpoint is replaced with `config.tld`.
    pub fn new(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let endpoint_str = config.endpoint.replace("{tld}", &config.tld);
        let endpoint = Url::parse(&endpoint_str)
            .map_err(|_| SpeechError::InvalidEndpoint(endpoint_str.clone()))?;

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint,
            lang: config.lang.clone(),
            max_chunk_chars: config.max_chunk_chars,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    async fn fetch_piece(&self, piece: &str, idx: usize, total: usize) -> Result<bytes::Bytes, SpeechError> {
        let total_str = total.to_string();
        let idx_str = idx.to_string();
        let len_str = piece.chars().count().to_string();
        let query = [
            ("ie", "UTF-8"),
            ("q", piece),
            ("tl", self.lang.as_str()),
            ("total", total_str.as_str()),
            ("idx", idx_str.as_str()),
            ("textlen", len_str.as_str()),
            ("client", TTS_CLIENT),
        ];

        debug!("TTS request {}/{} ({} chars)", idx + 1, total, len_str);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Status { status, chunk: idx });
        }

        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        let pieces = split_for_speech(text, self.max_chunk_chars);
        if pieces.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let total = pieces.len();
        let mut audio = BytesMut::new();
        for (idx, piece) in pieces.iter().enumerate() {
            let bytes = self.fetch_piece(piece, idx, total).await?;
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }

        info!(
            "🔊 Synthesized {} chars into {} bytes of MP3 ({} request(s))",
            text.chars().count(),
            audio.len(),
            total
        );
        Ok(AudioClip::mp3(audio.freeze()))
    }
}
