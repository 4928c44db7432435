//! PNG and data URI encoding of stencil output.
//!
//! Stencils are encoded as 8-bit grayscale PNG (lossless, no quality
//! knob). Browser front-ends display or download them through a
//! `data:image/png;base64,...` URI; the same module parses such URIs
//! back into raw bytes, since in-browser uploads arrive as data URLs.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{GrayImage, ImageEncoder};

use crate::types::StencilError;

/// MIME type of encoded stencils.
pub const PNG_MIME: &str = "image/png";

/// Encode a grayscale image as PNG bytes.
///
/// # Errors
///
/// Returns [`StencilError::Encode`] if the PNG encoder fails.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, StencilError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::L8,
        )
        .map_err(|e| StencilError::Encode(e.to_string()))?;
    Ok(png_bytes)
}

/// Wrap already-encoded bytes in a base64 data URI.
#[must_use]
pub fn to_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Encode a grayscale image as a `data:image/png;base64,...` URI.
///
/// # Errors
///
/// Returns [`StencilError::Encode`] if the PNG encoder fails.
pub fn png_data_uri(image: &GrayImage) -> Result<String, StencilError> {
    encode_png(image).map(|png| to_data_uri(&png, PNG_MIME))
}

/// Extract the payload of a base64 data URI (`data:<mime>;base64,<data>`).
///
/// The media type is not checked; decoding the payload as an image
/// decides whether it is usable.
///
/// # Errors
///
/// Returns [`StencilError::InvalidDataUri`] if the string is not a
/// base64 data URI or the payload is not valid base64.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, StencilError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| StencilError::InvalidDataUri("missing `data:` scheme".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StencilError::InvalidDataUri("missing `,` separator".into()))?;
    if !header.ends_with(";base64") {
        return Err(StencilError::InvalidDataUri(
            "only base64 data URIs are supported".into(),
        ));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| StencilError::InvalidDataUri(e.to_string()))
}
