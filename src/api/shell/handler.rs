// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shell endpoint handlers
//!
//! Each handler resolves the browser session from its cookie, locks that
//! session for the duration of the action and returns the resulting shell
//! event. Actions within one session are therefore serialized.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::{cookie::CookieJar, multipart::MultipartRejection, Multipart};
use bytes::Bytes;
use tracing::{debug, warn};

use super::request::{ImageUrlRequest, UPLOAD_FIELD};
use super::response::{ModelStatus, SessionViewResponse};
use crate::api::http_server::{ApiErrorResponse, AppState};
use crate::api::ApiError;
use crate::shell::{ImageSource, ListenOutcome, ShellEvent};
use crate::vision::image_utils::encode_png;

type ShellResult<T> = Result<(CookieJar, T), ApiErrorResponse>;

/// GET /api/session - current phase, caption and image
pub async fn session_view_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ShellResult<Json<SessionViewResponse>> {
    let (jar, session) = state.resolve_session(jar).await?;
    let session = session.lock().await;
    let pipeline = state.shell.pipeline();

    let response = SessionViewResponse {
        view: state.shell.view(&session),
        model: ModelStatus {
            name: pipeline.loader().model_name().to_string(),
            loaded: pipeline.loader().is_loaded(),
            warmed_up: pipeline.is_warmed_up(),
        },
    };
    Ok((jar, Json(response)))
}

/// POST /api/image/upload - multipart field `file`
pub async fn upload_image_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Result<Multipart, MultipartRejection>,
) -> ShellResult<Json<ShellEvent>> {
    let limit = state.config.server.upload_limit_bytes;
    let mut multipart =
        multipart.map_err(|e| rejection_error(e.status(), e.body_text(), limit))?;
    let mut upload: Option<(Option<String>, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(rejection_error(e.status(), e.body_text(), limit).into()),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| rejection_error(e.status(), e.body_text(), limit))?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::ValidationError {
            field: UPLOAD_FIELD.to_string(),
            message: "multipart field 'file' is required".to_string(),
        }
        .into());
    };

    let (jar, session) = state.resolve_session(jar).await?;
    let mut session = session.lock().await;
    let event = state
        .shell
        .select_image(&mut session, ImageSource::Upload { file_name, bytes })
        .await;
    Ok((jar, Json(event)))
}

/// POST /api/image/url - `{ "url": "..." }`
pub async fn image_url_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Result<Json<ImageUrlRequest>, JsonRejection>,
) -> ShellResult<Json<ShellEvent>> {
    let Json(request) = request.map_err(|e| {
        rejection_error(e.status(), e.body_text(), state.config.server.upload_limit_bytes)
    })?;
    request.validate()?;

    let (jar, session) = state.resolve_session(jar).await?;
    let mut session = session.lock().await;
    let event = state
        .shell
        .select_image(&mut session, ImageSource::Url(request.url))
        .await;
    Ok((jar, Json(event)))
}

/// DELETE /api/image
pub async fn clear_image_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ShellResult<Json<ShellEvent>> {
    let (jar, session) = state.resolve_session(jar).await?;
    let mut session = session.lock().await;
    Ok((jar, Json(state.shell.clear_image(&mut session))))
}

/// GET /api/image/preview - PNG of the selected image
pub async fn preview_handler(State(state): State<AppState>, jar: CookieJar) -> ShellResult<Response> {
    let (jar, session) = state.resolve_session(jar).await?;
    let session = session.lock().await;

    let selected = session
        .selected_image()
        .ok_or_else(|| ApiError::NotFound("no image selected".to_string()))?;
    let png = encode_png(&selected.image).map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok((jar, ([(header::CONTENT_TYPE, "image/png")], png).into_response()))
}

/// POST /api/caption - "Generate Caption"
pub async fn caption_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ShellResult<Json<ShellEvent>> {
    let (jar, session) = state.resolve_session(jar).await?;
    let mut session = session.lock().await;
    let event = state.shell.generate(&mut session).await;
    Ok((jar, Json(event)))
}

/// POST /api/speech - "Listen to Caption Audio"
///
/// Responds with the audio itself on success and with a JSON shell event
/// otherwise.
pub async fn speech_handler(State(state): State<AppState>, jar: CookieJar) -> ShellResult<Response> {
    let (jar, session) = state.resolve_session(jar).await?;
    let session = session.lock().await;

    let response = match state.shell.listen(&session).await {
        ListenOutcome::Audio(clip) => (
            [(header::CONTENT_TYPE, clip.format.mime_type())],
            clip.data,
        )
            .into_response(),
        ListenOutcome::Event(event) => Json(event).into_response(),
    };
    Ok((jar, response))
}

/// Map an extractor failure onto `ApiError`, keeping its status
fn rejection_error(status: StatusCode, detail: String, limit: usize) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Request rejected: over {} bytes", limit);
        return ApiError::PayloadTooLarge { limit_bytes: limit };
    }
    debug!("Rejected malformed request ({}): {}", status, detail);
    ApiError::MalformedRequest {
        status: status.as_u16(),
        message: detail,
    }
}
