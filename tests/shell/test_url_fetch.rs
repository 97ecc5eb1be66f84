// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Selecting an image by URL against a local HTTP server

use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::get, Router};
use bytes::Bytes;
use caption_speech_node::{
    session::{ImageOrigin, ShellPhase},
    shell::{ImageSource, Shell, ShellEvent},
    vision::{CaptionPipeline, ImageFetcher, ModelLoader},
    SessionState,
};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{png_bytes, FakeCaptioner, FakeSpeech};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Body sent in `pieces` chunks with `gap` between them, optionally stalling
/// for good after the first chunk
fn dripped(data: Bytes, pieces: usize, gap: Duration, stall: bool) -> Body {
    let size = data.len().div_ceil(pieces);
    let chunks: Vec<Bytes> = data.chunks(size).map(Bytes::copy_from_slice).collect();
    let stream = futures::stream::unfold((chunks, 0usize), move |(chunks, i)| async move {
        if i >= chunks.len() {
            return None;
        }
        if i > 0 {
            let wait = if stall { Duration::from_secs(30) } else { gap };
            tokio::time::sleep(wait).await;
        }
        let chunk = chunks[i].clone();
        Some((Ok::<_, std::io::Error>(chunk), (chunks, i + 1)))
    });
    Body::from_stream(stream)
}

fn images() -> Router {
    Router::new()
        .route(
            "/dripping.png",
            get(|| async {
                dripped(
                    png_bytes(40, 30, [90, 60, 30]),
                    6,
                    Duration::from_millis(120),
                    false,
                )
            }),
        )
        .route(
            "/stalled.png",
            get(|| async {
                dripped(png_bytes(40, 30, [90, 60, 30]), 4, Duration::ZERO, true)
            }),
        )
        .route(
            "/cat.png",
            get(|| async {
                (
                    [(axum::http::header::CONTENT_TYPE, "image/png")],
                    png_bytes(40, 30, [90, 60, 30]),
                )
                    .into_response()
            }),
        )
        .route("/garbage.png", get(|| async { "<html>not an image</html>" }))
        .route(
            "/slow.png",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                png_bytes(4, 4, [0, 0, 0])
            }),
        )
        .route(
            "/forbidden.png",
            get(|| async { StatusCode::FORBIDDEN }),
        )
}

fn shell(timeout: Duration) -> Shell {
    let loader = Arc::new(ModelLoader::preloaded(
        "fake",
        Arc::new(FakeCaptioner::new("a brown rectangle")),
    ));
    Shell::new(
        Arc::new(CaptionPipeline::new(loader, 32, 8)),
        Arc::new(FakeSpeech::default()),
        ImageFetcher::new(timeout).unwrap(),
    )
}

fn error_message(event: ShellEvent) -> String {
    match event {
        ShellEvent::Error { message } => message,
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_url_image_is_selected_and_captioned() {
    let base = serve(images()).await;
    let shell = shell(Duration::from_secs(5));
    let mut state = SessionState::new();
    let url = format!("{}/cat.png", base);

    let event = shell
        .select_image(&mut state, ImageSource::Url(format!("  {}  ", url)))
        .await;
    match event {
        ShellEvent::ImageSelected { image, preview } => {
            assert_eq!((image.width, image.height), (40, 30));
            assert_eq!(image.origin, ImageOrigin::Url { url: url.clone() });
            assert!(preview.is_some());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let event = shell.generate(&mut state).await;
    assert_eq!(event, ShellEvent::caption("a brown rectangle"));
}

#[tokio::test]
async fn test_missing_image_reports_status() {
    let base = serve(images()).await;
    let shell = shell(Duration::from_secs(5));
    let mut state = SessionState::new();

    let message = error_message(
        shell
            .select_image(&mut state, ImageSource::Url(format!("{}/missing.png", base)))
            .await,
    );
    assert!(message.starts_with("Could not fetch image from URL:"));
    assert!(message.contains("404"));
    assert_eq!(state.phase(), ShellPhase::NoImage);
}

#[tokio::test]
async fn test_forbidden_image_reports_status() {
    let base = serve(images()).await;
    let shell = shell(Duration::from_secs(5));
    let mut state = SessionState::new();

    let message = error_message(
        shell
            .select_image(&mut state, ImageSource::Url(format!("{}/forbidden.png", base)))
            .await,
    );
    assert!(message.contains("403"));
}

#[tokio::test]
async fn test_non_image_body_is_error() {
    let base = serve(images()).await;
    let shell = shell(Duration::from_secs(5));
    let mut state = SessionState::new();

    let message = error_message(
        shell
            .select_image(&mut state, ImageSource::Url(format!("{}/garbage.png", base)))
            .await,
    );
    assert!(message.starts_with("Could not fetch image from URL:"));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let base = serve(images()).await;
    let shell = shell(Duration::from_millis(200));
    let mut state = SessionState::new();

    let message = error_message(
        shell
            .select_image(&mut state, ImageSource::Url(format!("{}/slow.png", base)))
            .await,
    );
    assert!(message.starts_with("Could not fetch image from URL:"));
}

#[tokio::test]
async fn test_failed_fetch_replaces_previous_image() {
    let base = serve(images()).await;
    let shell = shell(Duration::from_secs(5));
    let mut state = SessionState::new();

    shell
        .select_image(&mut state, ImageSource::Url(format!("{}/cat.png", base)))
        .await;
    assert_eq!(state.phase(), ShellPhase::ImageSelected);

    shell
        .select_image(&mut state, ImageSource::Url(format!("{}/missing.png", base)))
        .await;
    assert!(state.selected_image().is_none());
    assert!(shell.generate(&mut state).await.is_warning());
}

#[tokio::test]
async fn test_non_http_scheme_is_rejected() {
    let shell = shell(Duration::from_secs(5));
    let mut state = SessionState::new();

    let message = error_message(
        shell
            .select_image(&mut state, ImageSource::Url("ftp://example.com/cat.png".to_string()))
            .await,
    );
    assert!(message.starts_with("Could not fetch image from URL:"));
}

#[tokio::test]
async fn test_slow_but_steady_body_is_accepted() {
    let base = serve(images()).await;
    // whole transfer takes about 600ms, each gap stays under the limit
    let shell = shell(Duration::from_millis(400));
    let mut state = SessionState::new();

    let event = shell
        .select_image(&mut state, ImageSource::Url(format!("{}/dripping.png", base)))
        .await;
    match event {
        ShellEvent::ImageSelected { image, .. } => {
            assert_eq!((image.width, image.height), (40, 30))
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_stalled_body_times_out() {
    let base = serve(images()).await;
    let shell = shell(Duration::from_millis(200));
    let mut state = SessionState::new();

    let message = error_message(
        shell
            .select_image(&mut state, ImageSource::Url(format!("{}/stalled.png", base)))
            .await,
    );
    assert!(message.starts_with("Could not fetch image from URL:"));
    assert!(message.contains("no data from"));
}
