// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::handlers::{health_handler, index_handler, models_handler};
use super::shell::{
    caption_handler, clear_image_handler, image_url_handler, preview_handler,
    session_view_handler, speech_handler, upload_image_handler,
};
use super::ApiError;
use crate::config::AppConfig;
use crate::session::{SessionHandle, SessionStore};
use crate::shell::Shell;
use crate::speech::{GoogleTranslateTts, SpeechSynthesizer};
use crate::vision::{CaptionPipeline, Captioner, ImageFetcher, ModelLoader};

/// Cookie carrying the browser session id
pub const SESSION_COOKIE: &str = "caption_session";

/// Upper bound on how often idle sessions are swept
const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub shell: Arc<Shell>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<AppConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(shell: Arc<Shell>, sessions: Arc<SessionStore>, config: AppConfig) -> Self {
        Self {
            shell,
            sessions,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Production wiring: lazily loaded ViT-GPT2 model and Google TTS
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let loader = Arc::new(ModelLoader::from_config(&config.caption));
        let speech: Arc<dyn SpeechSynthesizer> =
            Arc::new(GoogleTranslateTts::new(&config.speech).context("Failed to build TTS client")?);
        Self::assemble(loader, speech, config)
    }

    /// Wiring around an already-built captioner and speech backend
    pub fn with_components(
        captioner: Arc<dyn Captioner>,
        speech: Arc<dyn SpeechSynthesizer>,
        config: AppConfig,
    ) -> Result<Self> {
        let loader = Arc::new(ModelLoader::preloaded("in-memory", captioner));
        Self::assemble(loader, speech, config)
    }

    /// Wiring around a custom model loader
    pub fn assemble(
        loader: Arc<ModelLoader>,
        speech: Arc<dyn SpeechSynthesizer>,
        config: AppConfig,
    ) -> Result<Self> {
        let pipeline = Arc::new(CaptionPipeline::from_config(loader, &config.caption));
        let fetcher =
            ImageFetcher::new(config.fetch.timeout()).context("Failed to build image fetcher")?;
        let shell = Arc::new(Shell::new(pipeline, speech, fetcher));
        let sessions = Arc::new(SessionStore::new(
            config.server.max_sessions,
            Duration::from_secs(config.server.session_ttl_secs),
        ));
        Ok(Self::new(shell, sessions, config))
    }

    /// Session for this browser, creating one (and its cookie) if needed
    pub async fn resolve_session(
        &self,
        jar: CookieJar,
    ) -> Result<(CookieJar, SessionHandle), ApiError> {
        let existing = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
        let (id, handle) = self.sessions.get_or_create(existing.as_deref()).await?;

        if existing.as_deref() == Some(id.as_str()) {
            return Ok((jar, handle));
        }

        debug!("Issuing session cookie {}", id);
        let cookie = Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        Ok((jar.add(cookie), handle))
    }
}

/// Build the router with all routes and layers
pub fn create_app(state: AppState) -> Router {
    let upload_limit = state.config.server.upload_limit_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/v1/models", get(models_handler))
        .route("/api/session", get(session_view_handler))
        .route("/api/image/upload", post(upload_image_handler))
        .route("/api/image/url", post(image_url_handler))
        .route("/api/image", delete(clear_image_handler))
        .route("/api/image/preview", get(preview_handler))
        .route("/api/caption", post(caption_handler))
        .route("/api/speech", post(speech_handler))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop idle sessions
pub fn spawn_session_cleanup(sessions: Arc<SessionStore>) -> JoinHandle<()> {
    let period = sessions.ttl().min(MAX_CLEANUP_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            sessions.cleanup_expired().await;
        }
    })
}

/// Bind the configured address and serve until the process stops
pub async fn start_server(state: AppState) -> Result<()> {
    let addr: SocketAddr = state
        .config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", state.config.server.listen_addr))?;

    let cleanup = spawn_session_cleanup(state.sessions.clone());
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Caption server listening on http://{}", addr);

    let result = axum::serve(listener, app).await;
    cleanup.abort();
    result.context("HTTP server failed")
}

// Error response wrapper
pub struct ApiErrorResponse(pub ApiError);

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        ApiErrorResponse(err)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_response())).into_response()
    }
}
