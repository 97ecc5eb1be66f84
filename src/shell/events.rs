// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! What shell actions report back to the page

use serde::{Deserialize, Serialize};

use crate::session::{ImageOrigin, SelectedImage, SessionState, ShellPhase};
use crate::speech::AudioClip;

/// Warning shown when captioning is requested without an image
pub const NO_IMAGE_WARNING: &str = "Please provide an image (upload or URL).";

/// Warning shown when audio is requested before any caption exists
pub const NO_CAPTION_WARNING: &str = "Generate a caption first.";

/// Displayed in place of an empty caption
pub const EMPTY_CAPTION_TEXT: &str = "No caption generated.";

pub const READ_IMAGE_ERROR_PREFIX: &str = "Could not read the image:";
pub const FETCH_IMAGE_ERROR_PREFIX: &str = "Could not fetch image from URL:";
pub const AUDIO_ERROR_PREFIX: &str = "Error generating audio:";

/// Image facts shown next to the preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: usize,
    pub origin: ImageOrigin,
}

impl From<&SelectedImage> for ImageSummary {
    fn from(selected: &SelectedImage) -> Self {
        Self {
            width: selected.info.width,
            height: selected.info.height,
            format: selected.info.format.clone(),
            size_bytes: selected.info.size_bytes,
            origin: selected.origin.clone(),
        }
    }
}

/// Result of one shell action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShellEvent {
    ImageSelected {
        image: ImageSummary,
        /// PNG data URL of a downscaled copy
        #[serde(skip_serializing_if = "Option::is_none")]
        preview: Option<String>,
    },
    ImageCleared {
        had_image: bool,
    },
    Caption {
        text: String,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ShellEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Caption event; an empty caption is shown as a placeholder
    pub fn caption(text: &str) -> Self {
        let text = if text.is_empty() {
            EMPTY_CAPTION_TEXT.to_string()
        } else {
            text.to_string()
        };
        Self::Caption { text }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning { .. })
    }
}

/// Outcome of "listen": either audio to play or an event to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    Audio(AudioClip),
    Event(ShellEvent),
}

/// Snapshot of a session for rendering the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellView {
    pub phase: ShellPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSummary>,
}

impl From<&SessionState> for ShellView {
    fn from(state: &SessionState) -> Self {
        Self {
            phase: state.phase(),
            caption: state.has_caption().then(|| state.caption().to_string()),
            image: state.selected_image().map(ImageSummary::from),
        }
    }
}
