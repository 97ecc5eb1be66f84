// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-browser-session shell state

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::vision::ImageInfo;

/// Where the selected image came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageOrigin {
    Upload { file_name: Option<String> },
    Url { url: String },
}

/// The selected image plus what the UI shows about it
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub image: RgbImage,
    pub info: ImageInfo,
    pub origin: ImageOrigin,
}

/// Which controls are meaningful right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellPhase {
    NoImage,
    ImageSelected,
    CaptionPresent,
}

/// State one browser session keeps between actions
///
/// Replacing or clearing the image leaves the caption alone; only a new
/// successful generation replaces it.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    selected: Option<SelectedImage>,
    caption: String,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_image(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn set_image(&mut self, selected: SelectedImage) {
        self.selected = Some(selected);
    }

    /// Drop the selected image, returning whether there was one
    pub fn clear_image(&mut self) -> bool {
        self.selected.take().is_some()
    }

    /// Last generated caption; empty until the first success
    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = caption.into();
    }

    pub fn has_caption(&self) -> bool {
        !self.caption.is_empty()
    }

    pub fn phase(&self) -> ShellPhase {
        if self.has_caption() {
            ShellPhase::CaptionPresent
        } else if self.selected.is_some() {
            ShellPhase::ImageSelected
        } else {
            ShellPhase::NoImage
        }
    }
}
