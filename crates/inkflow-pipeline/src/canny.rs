//! Canny edge detection on an already-blurred grayscale image.
//!
//! Unlike `imageproc::edges::canny`, this does **not** blur internally
//! (the caller controls smoothing through the blur stage, and a kernel
//! size of 1 must mean "no blur"), and its hysteresis walks all 8
//! neighbors with bounds checks (upstream `imageproc 0.26` misses two
//! neighbors and underflows at the image border, see
//! <https://github.com/image-rs/imageproc/issues/705>).
//!
//! Steps:
//!
//! 1. 3×3 Sobel gradients with edge-replicated borders.
//! 2. Magnitude `hypot(gx, gy) / √20`. The largest 3×3 Sobel response
//!    an 8-bit image can produce is `255·√20`, so magnitudes land on the
//!    same 0-255 scale as the thresholds.
//! 3. Non-maximum suppression along the gradient direction quantized to
//!    0°/45°/90°/135°.
//! 4. Hysteresis: magnitude `> high` seeds an edge, magnitude `> low`
//!    extends it through 8-connected neighbors.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

use crate::types::{BACKGROUND, EDGE};

/// Gradient magnitudes, one `f32` per pixel.
pub type MagnitudeImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Largest gradient magnitude after scaling.
pub const MAX_MAGNITUDE: f32 = 255.0;

/// `√20`: the norm of the largest possible 3×3 Sobel response for unit
/// input (gx = 4, gy = 2 at a corner-shaped step).
const SOBEL_NORM: f32 = 4.472_136;

/// Run the four Canny steps and return a binary edge mask
/// ([`EDGE`] = edge, [`BACKGROUND`] = non-edge).
///
/// `low_threshold` is clamped to at most `high_threshold`.
#[must_use = "returns the binary edge mask"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let low = low_threshold.min(high_threshold);
    let (gx, gy) = sobel(image);
    let magnitude = gradient_magnitude(&gx, &gy);
    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low, high_threshold)
}

/// Horizontal and vertical Sobel responses with clamped borders.
#[must_use]
pub fn sobel(image: &GrayImage) -> (Image<Luma<i16>>, Image<Luma<i16>>) {
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    (gx, gy)
}

/// Scaled gradient magnitude in `[0, MAX_MAGNITUDE]`.
#[must_use]
pub fn gradient_magnitude(gx: &Image<Luma<i16>>, gy: &Image<Luma<i16>>) -> MagnitudeImage {
    MagnitudeImage::from_fn(gx.width(), gx.height(), |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([(h.hypot(v) / SOBEL_NORM).min(MAX_MAGNITUDE)])
    })
}

/// Gradient direction rounded to the nearest of four axes, as a pixel
/// step `(dx, dy)` in image coordinates (y down).
fn quantized_direction(x_gradient: f32, y_gradient: f32) -> (i64, i64) {
    let mut angle = y_gradient.atan2(x_gradient).to_degrees();
    if angle < 0.0 {
        angle += 180.0;
    }
    if !(22.5..157.5).contains(&angle) {
        (1, 0)
    } else if angle < 67.5 {
        (1, 1)
    } else if angle < 112.5 {
        (0, 1)
    } else {
        (-1, 1)
    }
}

/// Thin gradient ridges to one pixel.
///
/// A pixel survives when it is strictly greater than its neighbor
/// behind it along the gradient and at least as large as the one
/// ahead. The asymmetry keeps exactly one pixel of a two-pixel plateau
/// (a sharp step produces equal magnitudes on both sides). Neighbors
/// outside the image count as zero.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn non_maximum_suppression(
    magnitude: &MagnitudeImage,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> MagnitudeImage {
    let (w, h) = magnitude.dimensions();
    let at = |x: i64, y: i64| -> f32 {
        if x < 0 || y < 0 || x >= i64::from(w) || y >= i64::from(h) {
            0.0
        } else {
            magnitude.get_pixel(x as u32, y as u32).0[0]
        }
    };

    MagnitudeImage::from_fn(w, h, |x, y| {
        let m = magnitude.get_pixel(x, y).0[0];
        if m <= 0.0 {
            return Luma([0.0]);
        }
        let (dx, dy) = quantized_direction(
            f32::from(gx.get_pixel(x, y).0[0]),
            f32::from(gy.get_pixel(x, y).0[0]),
        );
        let (x, y) = (i64::from(x), i64::from(y));
        let behind = at(x - dx, y - dy);
        let ahead = at(x + dx, y + dy);
        if m > behind && m >= ahead {
            Luma([m])
        } else {
            Luma([0.0])
        }
    })
}

/// Double-threshold hysteresis with 8-connectivity.
///
/// Non-recursive depth-first flood fill from every strong pixel.
#[must_use]
pub fn hysteresis(thinned: &MagnitudeImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = thinned.dimensions();
    let mut out = GrayImage::from_pixel(w, h, Luma([BACKGROUND]));
    let mut stack: Vec<(u32, u32)> = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if thinned.get_pixel(x, y).0[0] <= high || out.get_pixel(x, y).0[0] == EDGE {
                continue;
            }
            out.put_pixel(x, y, Luma([EDGE]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (Some(nx), Some(ny)) =
                            (cx.checked_add_signed(dx), cy.checked_add_signed(dy))
                        else {
                            continue;
                        };
                        if nx >= w || ny >= h {
                            continue;
                        }
                        if thinned.get_pixel(nx, ny).0[0] > low
                            && out.get_pixel(nx, ny).0[0] != EDGE
                        {
                            out.put_pixel(nx, ny, Luma([EDGE]));
                            stack.push((nx, ny));
                        }
                    }
                }
            }
        }
    }
    out
}
