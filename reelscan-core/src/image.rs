//! Input image validation.
//!
//! Decoding and previewing are left to the caller; this only sniffs the format
//! so the request carries a correct MIME type.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use crate::error::ImageError;
use crate::types::{ImageMime, SelectedImage};

/// Maximum file size for a submitted image (10MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Detect the format of `data` and check it is one the service accepts.
pub fn validate_image(data: &[u8]) -> Result<ImageMime, ImageError> {
    if data.len() > MAX_FILE_SIZE {
        return Err(ImageError::TooLarge {
            size: data.len(),
            max: MAX_FILE_SIZE,
        });
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::Unreadable(e.to_string()))?;

    let format = reader.format().ok_or(ImageError::UnknownFormat)?;

    match format {
        ImageFormat::Jpeg => Ok(ImageMime::Jpeg),
        ImageFormat::Png => Ok(ImageMime::Png),
        ImageFormat::WebP => Ok(ImageMime::WebP),
        other => Err(ImageError::UnsupportedFormat(format!("{:?}", other))),
    }
}

/// Validate raw bytes and wrap them as a selectable image.
pub fn load_image(data: Vec<u8>, name: Option<String>) -> Result<SelectedImage, ImageError> {
    let mime = validate_image(&data)?;
    let image = SelectedImage::new(data, mime);
    Ok(match name {
        Some(name) => image.with_name(name),
        None => image,
    })
}
