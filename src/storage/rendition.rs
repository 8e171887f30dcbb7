//! Optimized image renditions: bounded width, re-encoded as WebP.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use super::StorageError;

pub const RENDITION_MIME_TYPE: &str = "image/webp";
pub const RENDITION_EXTENSION: &str = "webp";

/// Raster formats that get re-encoded. GIF keeps its animation and SVG is
/// vector data, so both are stored as uploaded.
const REENCODED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/pjpeg",
    "image/png",
    "image/webp",
    "image/bmp",
    "image/tiff",
];

pub fn should_reencode(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    REENCODED_MIME_TYPES.contains(&essence.as_str())
}

/// Target dimensions for a source of `width` x `height`; never upscales.
pub fn bounded_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (u64::from(height) * u64::from(max_width)) / u64::from(width);
    (max_width, scaled.max(1) as u32)
}

/// Decodes `data`, shrinks it to `max_width` and encodes the result as WebP.
pub fn render_webp(data: &[u8], max_width: u32) -> Result<Vec<u8>, StorageError> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| StorageError::UndecodableImage(e.to_string()))?;

    let (width, height) = bounded_dimensions(decoded.width(), decoded.height(), max_width);
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Lanczos3)
    };

    // The WebP encoder only accepts 8-bit RGB(A).
    let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());
    let mut encoded = Cursor::new(Vec::new());
    rgba.write_to(&mut encoded, ImageFormat::WebP)
        .map_err(|e| StorageError::Rendition(e.to_string()))?;

    Ok(encoded.into_inner())
}

/// `photo.JPG` -> `photo.webp`.
pub fn rendition_name(sanitized_name: &str) -> String {
    let stem = std::path::Path::new(sanitized_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{stem}.{RENDITION_EXTENSION}")
}
