//! Shared types for the inkflow stencil transform.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can build a
/// [`SourceImage`] from pixels they already hold.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A decoded photograph, held as 8-bit RGB samples.
///
/// Created once per upload and shared (usually behind an `Arc`) by every
/// subsequent transform call. Never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage(RgbImage);

impl SourceImage {
    /// Decode raw image bytes (PNG, JPEG, BMP, WebP).
    ///
    /// Any alpha channel is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StencilError::EmptyInput`] if `bytes` is empty or
    /// decodes to an image with no pixels.
    /// Returns [`StencilError::InvalidImage`] if the format is
    /// unrecognized or the data is corrupt.
    pub fn decode(bytes: &[u8]) -> Result<Self, StencilError> {
        let source = Self(crate::grayscale::decode(bytes)?);
        source.require_pixels()?;
        Ok(source)
    }

    /// Decode an image delivered as a base64 data URI, the form browser
    /// file readers produce.
    ///
    /// # Errors
    ///
    /// Returns [`StencilError::InvalidDataUri`] if the URI is malformed,
    /// otherwise the same errors as [`decode`](Self::decode).
    pub fn from_data_uri(uri: &str) -> Result<Self, StencilError> {
        let bytes = crate::encode::decode_data_uri(uri)?;
        Self::decode(&bytes)
    }

    /// Wrap an already-decoded RGB image.
    ///
    /// A zero-width or zero-height image is accepted here and rejected
    /// by the transform.
    #[must_use]
    pub const fn from_rgb(image: RgbImage) -> Self {
        Self(image)
    }

    /// The underlying RGB pixels.
    #[must_use]
    pub const fn as_rgb(&self) -> &RgbImage {
        &self.0
    }

    /// Width and height in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.0.width(),
            height: self.0.height(),
        }
    }

    /// Fail with [`StencilError::EmptyInput`] unless the image has at
    /// least one pixel.
    pub(crate) fn require_pixels(&self) -> Result<(), StencilError> {
        if self.dimensions().pixel_count() == 0 {
            return Err(StencilError::EmptyInput);
        }
        Ok(())
    }
}

/// User-adjustable parameters of the stencil transform.
///
/// Thresholds live on the same 0-255 scale as pixel values (see
/// [`canny`](crate::canny) for how gradient magnitudes are scaled).
///
/// # Threshold ordering
///
/// `high_threshold >= low_threshold` is expected but not enforced.
/// When `low_threshold` exceeds `high_threshold` the effective low
/// threshold is clamped down to `high_threshold`.
///
/// # Blur radius
///
/// `blur_radius` is the side length of the Gaussian kernel. Even values
/// are rounded up to the next odd value; values below 1 or above
/// [`MAX_BLUR_RADIUS`](Self::MAX_BLUR_RADIUS) are rejected by
/// [`blur_kernel_size`](Self::blur_kernel_size).
///
/// JSON accepts the `camelCase` keys used by browser front-ends
/// (`lowThreshold`, `highThreshold`, `blurRadius`) as well as the
/// field names. Missing keys fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilSettings {
    /// Canny lower hysteresis bound. Pixels whose gradient magnitude is
    /// above this value are edges only when connected to a strong edge.
    #[serde(alias = "lowThreshold")]
    pub low_threshold: u8,

    /// Canny upper hysteresis bound. Pixels whose gradient magnitude is
    /// above this value are definite edges.
    #[serde(alias = "highThreshold")]
    pub high_threshold: u8,

    /// Gaussian kernel size in pixels. `1` disables blurring.
    #[serde(alias = "blurRadius")]
    pub blur_radius: i32,

    /// Render edges black on white (`true`) or white on black (`false`).
    pub inverted: bool,
}

impl StencilSettings {
    /// Default low threshold.
    pub const DEFAULT_LOW_THRESHOLD: u8 = 30;

    /// Default high threshold.
    pub const DEFAULT_HIGH_THRESHOLD: u8 = 100;

    /// Default blur kernel size.
    pub const DEFAULT_BLUR_RADIUS: i32 = 3;

    /// Default output polarity (black lines on white).
    pub const DEFAULT_INVERTED: bool = true;

    /// Largest accepted blur kernel size (after even-to-odd coercion).
    pub const MAX_BLUR_RADIUS: u32 = 255;

    /// Resolve `blur_radius` to the odd kernel size actually used.
    ///
    /// Even values are coerced up to the next odd value (`2 -> 3`).
    ///
    /// # Errors
    ///
    /// Returns [`StencilError::InvalidParameter`] if `blur_radius` is
    /// below 1, or if the coerced size exceeds
    /// [`MAX_BLUR_RADIUS`](Self::MAX_BLUR_RADIUS).
    pub fn blur_kernel_size(&self) -> Result<u32, StencilError> {
        let radius = u32::try_from(self.blur_radius)
            .ok()
            .filter(|&r| r >= 1)
            .ok_or_else(|| StencilError::InvalidParameter {
                name: "blur_radius",
                reason: format!("must be a positive integer, got {}", self.blur_radius),
            })?;

        let size = if radius % 2 == 0 { radius + 1 } else { radius };
        if size > Self::MAX_BLUR_RADIUS {
            return Err(StencilError::InvalidParameter {
                name: "blur_radius",
                reason: format!(
                    "must be at most {}, got {}",
                    Self::MAX_BLUR_RADIUS,
                    self.blur_radius,
                ),
            });
        }
        Ok(size)
    }

    /// Check every parameter without running the transform.
    ///
    /// # Errors
    ///
    /// Returns [`StencilError::InvalidParameter`] for the first
    /// out-of-domain parameter.
    pub fn validate(&self) -> Result<(), StencilError> {
        self.blur_kernel_size().map(|_| ())
    }
}

impl Default for StencilSettings {
    fn default() -> Self {
        Self {
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
            inverted: Self::DEFAULT_INVERTED,
        }
    }
}

/// Pixel value marking an edge in the raw (non-inverted) edge mask.
pub const EDGE: u8 = 255;

/// Pixel value marking background in the raw (non-inverted) edge mask.
pub const BACKGROUND: u8 = 0;

/// Binary line-art output of the transform.
///
/// Every pixel is either 0 or 255. When [`inverted`](Self::inverted)
/// is `true` edges are 0 on a 255 background; otherwise edges are 255
/// on a 0 background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StencilImage {
    image: GrayImage,
    inverted: bool,
}

impl StencilImage {
    /// Build a stencil from a raw edge mask (edges = [`EDGE`]),
    /// inverting it when `inverted` is set.
    #[must_use]
    pub fn from_edge_mask(mask: GrayImage, inverted: bool) -> Self {
        let image = if inverted {
            crate::edge::invert_edge_map(&mask)
        } else {
            mask
        };
        Self { image, inverted }
    }

    /// The rendered stencil pixels.
    #[must_use]
    pub const fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    /// Whether edges are drawn dark on light.
    #[must_use]
    pub const fn inverted(&self) -> bool {
        self.inverted
    }

    /// Width and height in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Pixel value used for edges in this stencil.
    #[must_use]
    pub const fn edge_value(&self) -> u8 {
        if self.inverted { !EDGE } else { EDGE }
    }

    /// Pixel value used for background in this stencil.
    #[must_use]
    pub const fn background_value(&self) -> u8 {
        !self.edge_value()
    }

    /// Whether the pixel at `(x, y)` is an edge.
    ///
    /// Returns `false` for coordinates outside the image.
    #[must_use]
    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.image
            .get_pixel_checked(x, y)
            .is_some_and(|p| p.0[0] == self.edge_value())
    }

    /// Number of edge pixels.
    #[must_use]
    pub fn edge_pixel_count(&self) -> u64 {
        let edge = self.edge_value();
        self.image
            .pixels()
            .map(|p| u64::from(p.0[0] == edge))
            .sum()
    }

    /// Encode as an 8-bit grayscale PNG.
    ///
    /// # Errors
    ///
    /// Returns [`StencilError::Encode`] if the PNG encoder fails.
    pub fn to_png(&self) -> Result<Vec<u8>, StencilError> {
        crate::encode::encode_png(&self.image)
    }

    /// Encode as a `data:image/png;base64,...` URI for in-browser
    /// preview or download.
    ///
    /// # Errors
    ///
    /// Returns [`StencilError::Encode`] if the PNG encoder fails.
    pub fn to_data_uri(&self) -> Result<String, StencilError> {
        crate::encode::png_data_uri(&self.image)
    }

    /// The raw edge mask (edges = [`EDGE`]) regardless of polarity.
    #[must_use]
    pub fn edge_mask(&self) -> GrayImage {
        if self.inverted {
            crate::edge::invert_edge_map(&self.image)
        } else {
            self.image.clone()
        }
    }
}

/// Every intermediate raster of one transform run.
///
/// Front-ends that preview each step (grayscale, blur, edges, final
/// stencil) use this instead of [`StencilImage`] alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedStencil {
    /// Stage 1: BT.601 grayscale.
    pub grayscale: GrayImage,
    /// Stage 2: Gaussian-blurred grayscale.
    pub blurred: GrayImage,
    /// Stage 3: raw Canny edge mask (edges = 255), before inversion.
    pub edges: GrayImage,
    /// Stage 4: the final stencil.
    pub stencil: StencilImage,
    /// Blur kernel size after even-to-odd coercion.
    pub kernel_size: u32,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur while producing a stencil.
#[derive(Debug, thiserror::Error)]
pub enum StencilError {
    /// The input holds no image: zero bytes, or zero width or height.
    #[error("input image is empty")]
    EmptyInput,

    /// The input bytes could not be decoded as a supported raster format.
    #[error("failed to decode image: {0}")]
    InvalidImage(#[from] image::ImageError),

    /// The input string is not a usable base64 data URI.
    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    /// A setting is outside its valid domain after coercion.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending setting.
        name: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// PNG encoding of the result failed.
    #[error("failed to encode stencil: {0}")]
    Encode(String),
}

impl StencilError {
    /// Whether this error means the input was not a usable image
    /// (empty, undecodable, or a malformed data URI).
    #[must_use]
    pub const fn is_invalid_image(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::InvalidImage(_) | Self::InvalidDataUri(_)
        )
    }
}
