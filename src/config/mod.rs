// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration: defaults, optional TOML file, environment overrides

pub mod app;

pub use app::{AppConfig, CaptionConfig, FetchConfig, ServerConfig, SpeechConfig};
