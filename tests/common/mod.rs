// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared test doubles and HTTP helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use caption_speech_node::{
    api::{create_app, AppState, SESSION_COOKIE},
    config::AppConfig,
    speech::{AudioClip, SpeechError, SpeechSynthesizer},
    vision::Captioner,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

/// Bytes returned by `FakeSpeech` (an ID3 header is enough for the tests)
pub const FAKE_MP3: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x00fake-mp3-frames";

/// Captioner returning queued replies, then a fixed default
pub struct FakeCaptioner {
    replies: Mutex<VecDeque<anyhow::Result<String>>>,
    default: String,
    calls: AtomicUsize,
    budgets: Mutex<Vec<usize>>,
}

impl FakeCaptioner {
    pub fn new(default: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default: default.to_string(),
            calls: AtomicUsize::new(0),
            budgets: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(default: &str, replies: Vec<anyhow::Result<String>>) -> Self {
        let fake = Self::new(default);
        *fake.replies.lock().unwrap() = replies.into();
        fake
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn budgets(&self) -> Vec<usize> {
        self.budgets.lock().unwrap().clone()
    }
}

impl Captioner for FakeCaptioner {
    fn caption(&self, _image: &RgbImage, max_new_tokens: usize) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.budgets.lock().unwrap().push(max_new_tokens);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(self.default.clone()),
        }
    }
}

/// Speech backend recording what it was asked to say
#[derive(Default)]
pub struct FakeSpeech {
    spoken: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeSpeech {
    pub fn failing() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(AudioClip::mp3(Bytes::from_static(FAKE_MP3)))
    }
}

pub fn test_state(captioner: Arc<FakeCaptioner>, speech: Arc<FakeSpeech>) -> AppState {
    test_state_with_config(captioner, speech, AppConfig::default())
}

pub fn test_state_with_config(
    captioner: Arc<FakeCaptioner>,
    speech: Arc<FakeSpeech>,
    config: AppConfig,
) -> AppState {
    AppState::with_components(captioner, speech, config).unwrap()
}

/// Solid-color PNG
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Bytes {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    Bytes::from(buffer.into_inner())
}

const BOUNDARY: &str = "caption-test-boundary";

pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn content_type(&self) -> String {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

/// Drives the router like a browser: remembers the session cookie
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub fn new(state: AppState) -> Self {
        Self {
            app: create_app(state),
            cookie: None,
        }
    }

    /// Another browser against the same app
    pub fn fresh(&self) -> Self {
        Self {
            app: self.app.clone(),
            cookie: None,
        }
    }

    pub fn session_cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let builder = match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie.as_str()),
            None => builder,
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            if let Some(pair) = value.split(';').next() {
                if pair.starts_with(&format!("{}=", SESSION_COOKIE)) {
                    self.cookie = Some(pair.to_string());
                }
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::builder().method(Method::GET).uri(uri), Body::empty())
            .await
    }

    pub async fn post(&mut self, uri: &str) -> TestResponse {
        self.send(Request::builder().method(Method::POST).uri(uri), Body::empty())
            .await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Request::builder().method(Method::DELETE).uri(uri), Body::empty())
            .await
    }

    pub async fn post_json(&mut self, uri: &str, value: serde_json::Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json"),
            Body::from(value.to_string()),
        )
        .await
    }

    pub async fn upload(&mut self, file_name: &str, data: &[u8]) -> TestResponse {
        self.upload_field("file", file_name, data).await
    }

    pub async fn upload_field(&mut self, field: &str, file_name: &str, data: &[u8]) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/image/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                ),
            Body::from(multipart_body(field, file_name, "image/png", data)),
        )
        .await
    }
}
