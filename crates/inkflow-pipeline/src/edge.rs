//! Thresholded edge detection and mask inversion.
//!
//! [`detect_edges`] is the user-facing entry to [`crate::canny`]: it
//! takes thresholds on the 0-255 pixel scale, as they arrive from
//! settings. [`invert_edge_map`] turns the white-on-black mask into the
//! black-on-white form a printed stencil uses.

use image::{GrayImage, Luma};

/// Binary Canny edge mask of a (usually already blurred) grayscale image.
///
/// Edge pixels are [`EDGE`](crate::types::EDGE), the rest
/// [`BACKGROUND`](crate::types::BACKGROUND). A gradient above
/// `high_threshold` starts an edge; one above `low_threshold` continues
/// it. `low_threshold` is clamped to at most `high_threshold`.
#[must_use = "returns the edge mask"]
pub fn detect_edges(blurred: &GrayImage, low_threshold: u8, high_threshold: u8) -> GrayImage {
    crate::canny::canny(blurred, f32::from(low_threshold), f32::from(high_threshold))
}

/// Swap edge and background in a binary mask.
#[must_use = "returns the inverted mask"]
pub fn invert_edge_map(mask: &GrayImage) -> GrayImage {
    let mut inverted = mask.clone();
    for Luma([v]) in inverted.pixels_mut() {
        *v = !*v;
    }
    inverted
}
