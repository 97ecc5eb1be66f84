// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding and encoding helpers for uploads, URL bodies and previews

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// File extensions accepted from the upload control
pub const SUPPORTED_UPLOAD_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Unsupported file type '{0}' (expected png, jpg, jpeg or webp)")]
    UnsupportedExtension(String),

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Failed to encode image: {0}")]
    EncodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Image information extracted during loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format extension (png, jpg, webp, ...)
    pub format: String,
    /// Size of the encoded input in bytes
    pub size_bytes: usize,
}

/// Decode raw image bytes into an RGB raster
///
/// The format is detected from magic bytes first; anything else the `image`
/// crate can sniff is accepted as well. Alpha and palette images are
/// flattened to RGB.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(RgbImage, ImageInfo), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(bytes).or_else(|_| {
        image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)
    })?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let rgb = img.to_rgb8();
    let info = ImageInfo {
        width: rgb.width(),
        height: rgb.height(),
        format: format_to_extension(format).to_string(),
        size_bytes: bytes.len(),
    };

    Ok((rgb, info))
}

/// Detect image format from magic bytes
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(ImageError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Get the format extension as a string
pub fn format_to_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        _ => "unknown",
    }
}

/// Check an uploaded file name against the accepted extensions
///
/// Uploads without a name (or without an extension) are let through and
/// left to the decoder.
pub fn check_upload_extension(file_name: &str) -> Result<(), ImageError> {
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return Ok(());
    };
    let ext = ext.to_lowercase();
    if SUPPORTED_UPLOAD_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ImageError::UnsupportedExtension(ext))
    }
}

/// Encode an RGB raster as PNG bytes
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Downscale so the longer side is at most `max_side`, keeping aspect ratio
///
/// Images already within bounds are returned unchanged.
pub fn preview_thumbnail(image: &RgbImage, max_side: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return image.clone();
    }
    let scale = max_side as f32 / longest as f32;
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    image::imageops::thumbnail(image, new_w, new_h)
}

/// Encode an RGB raster as a `data:image/png;base64,...` URL for inline previews
pub fn encode_png_data_url(image: &RgbImage) -> Result<String, ImageError> {
    let png = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
