//! Gaussian blur for noise reduction before edge detection.
//!
//! The kernel is specified by its side length (the user-facing "blur
//! radius"), not by sigma. Sigma is derived from the size with the
//! usual rule for kernel-size-driven Gaussians:
//!
//! ```text
//! sigma = 0.3 * ((size - 1) / 2 - 1) + 0.8
//! ```
//!
//! The 2D kernel is separable, so the image is filtered with the same
//! normalized 1D kernel horizontally then vertically through
//! [`imageproc::filter::separable_filter_equal`], which replicates edge
//! pixels at the borders. The filter truncates its f32 sums, so a flat
//! region can come out one level darker, but it stays flat and never
//! produces a gradient downstream.

use image::GrayImage;

/// Sigma of the Gaussian used for a kernel of `size` pixels.
///
/// `size` is expected to be odd and at least 1.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel_size(size: u32) -> f32 {
    let half_span = (size.saturating_sub(1) as f32) * 0.5;
    0.3f32.mul_add(half_span - 1.0, 0.8)
}

/// Normalized 1D Gaussian kernel with `size` taps.
///
/// Returns `[1.0]` for sizes 0 and 1.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0];
    }

    let sigma = f64::from(sigma_for_kernel_size(size));
    let denom = 2.0 * sigma * sigma;
    let half = (size / 2) as i32;

    let weights: Vec<f64> = (-half..=half)
        .map(|d| {
            let d = f64::from(d);
            (-(d * d) / denom).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / total) as f32).collect()
}

/// Apply a `kernel_size` × `kernel_size` Gaussian blur to a grayscale image.
///
/// A kernel size of 1 (or 0) returns the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    imageproc::filter::separable_filter_equal(image, &gaussian_kernel(kernel_size))
}
