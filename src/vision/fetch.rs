// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote image fetching
//!
//! A plain GET. The timeout bounds connecting and each wait for data
//! (headers, then every body chunk), not the whole transfer, so a large image
//! on a slow but live link still arrives. No content-type validation and no
//! size cap: the body is streamed into memory and handed to the image decoder.

use futures::StreamExt;
use image::RgbImage;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::image_utils::{decode_image_bytes, ImageError, ImageInfo};

/// Default timeout for remote image requests
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid image URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no data from {url} for {}s", .after.as_secs_f32())]
    Timeout { url: String, after: Duration },

    #[error("{status} for url: {url}")]
    Status { status: reqwest::StatusCode, url: String },

    #[error(transparent)]
    Decode(#[from] ImageError),
}

/// HTTP client for URL-sourced images
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    timeout: Duration,
}

impl ImageFetcher {
    /// Create a fetcher that waits at most `timeout` to connect and for each read
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `image_url` and decode the body into an RGB raster
    pub async fn fetch(&self, image_url: &str) -> Result<(RgbImage, ImageInfo), FetchError> {
        let url = parse_image_url(image_url)?;
        debug!("Fetching image GET {}", url);

        let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| self.timed_out(&url))??;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        loop {
            match tokio::time::timeout(self.timeout, stream.next()).await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk?),
                Ok(None) => break,
                Err(_) => return Err(self.timed_out(&url)),
            }
        }

        let (image, info) = decode_image_bytes(&body)?;
        info!(
            "Fetched {}x{} {} image ({} bytes) from {}",
            info.width, info.height, info.format, info.size_bytes, url
        );
        Ok((image, info))
    }

    fn timed_out(&self, url: &Url) -> FetchError {
        FetchError::Timeout {
            url: url.to_string(),
            after: self.timeout,
        }
    }
}

/// Parse and check an image URL (absolute, http or https)
pub fn parse_image_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| FetchError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
