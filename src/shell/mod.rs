// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Interactive shell
//!
//! The four user actions (select image, generate caption, listen, clear)
//! applied to one session's state. Every user-facing failure comes back as
//! a `ShellEvent`; nothing here returns a transport error.

pub mod events;

pub use events::{
    ImageSummary, ListenOutcome, ShellEvent, ShellView, AUDIO_ERROR_PREFIX,
    EMPTY_CAPTION_TEXT, FETCH_IMAGE_ERROR_PREFIX, NO_CAPTION_WARNING, NO_IMAGE_WARNING,
    READ_IMAGE_ERROR_PREFIX,
};

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::session::{ImageOrigin, SelectedImage, SessionState};
use crate::speech::SpeechSynthesizer;
use crate::vision::image_utils::{
    check_upload_extension, decode_image_bytes, encode_png_data_url, preview_thumbnail,
};
use crate::vision::pipeline::CAPTION_ERROR_PREFIX;
use crate::vision::{CaptionPipeline, ImageFetcher};

/// Longest side of the inline preview sent with `image_selected`
pub const PREVIEW_MAX_SIDE: u32 = 512;

/// Where a new image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    Upload {
        file_name: Option<String>,
        bytes: Bytes,
    },
    Url(String),
}

pub struct Shell {
    pipeline: Arc<CaptionPipeline>,
    speech: Arc<dyn SpeechSynthesizer>,
    fetcher: ImageFetcher,
}

impl Shell {
    pub fn new(
        pipeline: Arc<CaptionPipeline>,
        speech: Arc<dyn SpeechSynthesizer>,
        fetcher: ImageFetcher,
    ) -> Self {
        Self {
            pipeline,
            speech,
            fetcher,
        }
    }

    pub fn pipeline(&self) -> &Arc<CaptionPipeline> {
        &self.pipeline
    }

    /// Replace the session's image
    ///
    /// On failure the session ends up with no image. The caption is never
    /// touched.
    pub async fn select_image(&self, state: &mut SessionState, source: ImageSource) -> ShellEvent {
        let acquired = match source {
            ImageSource::Upload { file_name, bytes } => {
                let decoded = match &file_name {
                    Some(name) => check_upload_extension(name)
                        .and_then(|_| decode_image_bytes(&bytes)),
                    None => decode_image_bytes(&bytes),
                };
                decoded
                    .map(|(image, info)| (image, info, ImageOrigin::Upload { file_name }))
                    .map_err(|e| format!("{} {}", READ_IMAGE_ERROR_PREFIX, e))
            }
            ImageSource::Url(url) => self
                .fetcher
                .fetch(&url)
                .await
                .map(|(image, info)| (image, info, ImageOrigin::Url { url: url.trim().to_string() }))
                .map_err(|e| format!("{} {}", FETCH_IMAGE_ERROR_PREFIX, e)),
        };

        match acquired {
            Ok((image, info, origin)) => {
                let preview = match encode_png_data_url(&preview_thumbnail(&image, PREVIEW_MAX_SIDE)) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!("Preview encoding failed: {}", e);
                        None
                    }
                };
                let selected = SelectedImage {
                    image,
                    info,
                    origin,
                };
                let summary = ImageSummary::from(&selected);
                debug!(
                    "Selected {}x{} {} image",
                    summary.width, summary.height, summary.format
                );
                state.set_image(selected);
                ShellEvent::ImageSelected {
                    image: summary,
                    preview,
                }
            }
            Err(message) => {
                warn!("{}", message);
                state.clear_image();
                ShellEvent::error(message)
            }
        }
    }

    pub fn clear_image(&self, state: &mut SessionState) -> ShellEvent {
        ShellEvent::ImageCleared {
            had_image: state.clear_image(),
        }
    }

    /// "Generate Caption"
    ///
    /// A successful run overwrites the stored caption; a failed one leaves
    /// it as it was.
    pub async fn generate(&self, state: &mut SessionState) -> ShellEvent {
        let Some(selected) = state.selected_image() else {
            return ShellEvent::warning(NO_IMAGE_WARNING);
        };

        match self.pipeline.generate(&selected.image).await {
            Ok(caption) => {
                info!("📝 Caption: '{}'", caption);
                let event = ShellEvent::caption(&caption);
                state.set_caption(caption);
                event
            }
            Err(e) => {
                warn!("Caption generation failed: {}", e);
                ShellEvent::error(format!("{} {}", CAPTION_ERROR_PREFIX, e))
            }
        }
    }

    /// "Listen to Caption Audio"
    pub async fn listen(&self, state: &SessionState) -> ListenOutcome {
        if !state.has_caption() {
            return ListenOutcome::Event(ShellEvent::warning(NO_CAPTION_WARNING));
        }

        match self.speech.synthesize(state.caption()).await {
            Ok(clip) => ListenOutcome::Audio(clip),
            Err(e) => {
                warn!("Speech synthesis failed: {}", e);
                ListenOutcome::Event(ShellEvent::error(format!("{} {}", AUDIO_ERROR_PREFIX, e)))
            }
        }
    }

    pub fn view(&self, state: &SessionState) -> ShellView {
        ShellView::from(state)
    }

    /// Trigger the pipeline's one-shot warm-up
    pub async fn warm_up(&self) -> bool {
        self.pipeline.warm_up().await
    }
}
