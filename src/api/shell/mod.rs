// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shell endpoints: image selection, captioning and speech

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{
    caption_handler, clear_image_handler, image_url_handler, preview_handler,
    session_view_handler, speech_handler, upload_image_handler,
};
pub use request::ImageUrlRequest;
pub use response::{ModelStatus, SessionViewResponse};
