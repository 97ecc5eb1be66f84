// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request types for the shell endpoints

use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Multipart field carrying the uploaded image
pub const UPLOAD_FIELD: &str = "file";

/// POST /api/image/url body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrlRequest {
    pub url: String,
}

impl ImageUrlRequest {
    /// Only emptiness is checked here; anything else the fetcher reports
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.url.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "url".to_string(),
                message: "url must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
