// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    response::{Html, IntoResponse, Json},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::http_server::AppState;
use crate::version::{get_version_info, get_version_string, VERSION_NUMBER};

/// The single-page UI
pub const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Model the ONNX export was converted from
pub const SOURCE_MODEL_ID: &str = "nlpconnect/vit-gpt2-image-captioning";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    /// "image-to-text" or "text-to-speech"
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Build, date and feature list
    pub build: serde_json::Value,
    pub model: String,
    pub model_loaded: bool,
    pub warmed_up: bool,
    pub active_sessions: usize,
    pub uptime_secs: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// GET / - serve the UI and kick off the background warm-up
pub async fn index_handler(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = match state.resolve_session(jar.clone()).await {
        Ok((jar, _)) => jar,
        Err(e) => {
            warn!("Rendering page without a session: {}", e);
            jar
        }
    };

    let pipeline = state.shell.pipeline().clone();
    if !pipeline.is_warm_up_started() {
        debug!("First page render, scheduling warm-up");
        tokio::spawn(async move {
            pipeline.warm_up().await;
        });
    }

    (jar, Html(INDEX_HTML))
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let pipeline = state.shell.pipeline();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION_NUMBER.to_string(),
        build: get_version_info(),
        model: pipeline.loader().model_name().to_string(),
        model_loaded: pipeline.loader().is_loaded(),
        warmed_up: pipeline.is_warmed_up(),
        active_sessions: state.sessions.session_count().await,
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now(),
    })
}

/// GET /v1/models - contents of the "Model info" panel
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    let pipeline = state.shell.pipeline();
    let speech = &state.config.speech;

    Json(ModelsResponse {
        models: vec![
            ModelInfo {
                id: pipeline.loader().model_name().to_string(),
                name: "ViT-GPT2 image captioning".to_string(),
                task: "image-to-text".to_string(),
                description: Some(format!(
                    "Using `{}` from Hugging Face (ONNX export, greedy decoding, up to {} new tokens). {}",
                    SOURCE_MODEL_ID,
                    pipeline.max_new_tokens(),
                    get_version_string()
                )),
            },
            ModelInfo {
                id: "google-translate-tts".to_string(),
                name: "Google Translate text-to-speech".to_string(),
                task: "text-to-speech".to_string(),
                description: Some(format!("MP3 output, language '{}'", speech.lang)),
            },
        ],
    })
}
