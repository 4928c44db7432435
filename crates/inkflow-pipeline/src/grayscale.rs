//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an RGB
//! [`RgbImage`], then reduces it to a single luma channel with the
//! ITU-R BT.601 weights.
//!
//! [`SourceImage::decode`](crate::SourceImage::decode) wraps [`decode`];
//! the transform then calls [`to_grayscale`] on the held RGB pixels.

use image::{GrayImage, Luma, RgbImage};

use crate::types::StencilError;

/// Decode raw image bytes into 8-bit RGB.
///
/// Supports whatever the `image` crate is built with (PNG, JPEG, BMP,
/// WebP). Alpha is discarded.
///
/// # Errors
///
/// Returns [`StencilError::EmptyInput`] if `bytes` is empty.
/// Returns [`StencilError::InvalidImage`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, StencilError> {
    if bytes.is_empty() {
        return Err(StencilError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// BT.601 luma of one RGB sample, rounded to the nearest integer.
///
/// `Y = 0.299 R + 0.587 G + 0.114 B`, evaluated in fixed point so the
/// result is exact and platform independent.
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    // (255 * 1000 + 500) / 1000 == 255, so this never saturates.
    u8::try_from((weighted + 500) / 1000).unwrap_or(u8::MAX)
}

/// Convert an RGB image to grayscale with [`luma`].
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}
