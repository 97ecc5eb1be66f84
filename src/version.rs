// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the caption + speech node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-caption-speech-2026-10-17";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-10-17";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "image-upload",
    "image-url-fetch",
    "vit-gpt2-captioning",
    "lazy-model-loading",
    "one-shot-warmup",
    "text-to-speech",
    "per-session-state",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Caption Speech Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
