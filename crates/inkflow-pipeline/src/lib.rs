//! inkflow-pipeline: photo-to-stencil transform (sans-IO).
//!
//! Converts a photograph into binary line art through:
//! grayscale -> blur -> Canny edge detection -> optional inversion.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and images and returns owned rasters or encoded PNG
//! bytes. File, terminal, and thread handling live in the front-end
//! crates.

pub mod blur;
pub mod canny;
pub mod diagnostics;
pub mod edge;
pub mod encode;
pub mod grayscale;
pub mod stage;
pub mod types;

pub use stage::StageId;
pub use types::{
    Dimensions, GrayImage, RgbImage, SourceImage, StagedStencil, StencilError, StencilImage,
    StencilSettings,
};

/// Run the stencil transform on a decoded source image.
///
/// The result depends only on `source` and `settings`: identical inputs
/// give bit-identical output.
///
/// # Pipeline steps
///
/// 1. BT.601 grayscale conversion
/// 2. Gaussian blur (`settings.blur_radius`, even values rounded up)
/// 3. Canny edge detection (`low_threshold`, `high_threshold`)
/// 4. Optional inversion to dark lines on a light background
///
/// # Errors
///
/// Returns [`StencilError::InvalidParameter`] if the blur radius is out
/// of range, and [`StencilError::EmptyInput`] if `source` has zero width
/// or height. Settings are checked before any pixel work.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(
        width = source.as_rgb().width(),
        height = source.as_rgb().height(),
        blur_radius = settings.blur_radius,
        low = settings.low_threshold,
        high = settings.high_threshold,
        inverted = settings.inverted,
    )
)]
pub fn generate_stencil(
    source: &SourceImage,
    settings: &StencilSettings,
) -> Result<StencilImage, StencilError> {
    let kernel_size = settings.blur_kernel_size()?;
    source.require_pixels()?;

    let gray = grayscale::to_grayscale(source.as_rgb());
    let blurred = blur::gaussian_blur(&gray, kernel_size);
    tracing::debug!(kernel_size, "blurred");

    let edges = edge::detect_edges(&blurred, settings.low_threshold, settings.high_threshold);
    let stencil = StencilImage::from_edge_mask(edges, settings.inverted);
    tracing::debug!(edge_pixels = stencil.edge_pixel_count(), "stencil ready");

    Ok(stencil)
}

/// Decode raw image bytes and run [`generate_stencil`].
///
/// # Errors
///
/// Returns [`StencilError::InvalidParameter`] for bad settings (checked
/// first), [`StencilError::EmptyInput`] if `image_bytes` is empty, and
/// [`StencilError::InvalidImage`] if the bytes cannot be decoded.
pub fn generate_stencil_from_bytes(
    image_bytes: &[u8],
    settings: &StencilSettings,
) -> Result<StencilImage, StencilError> {
    settings.validate()?;
    let source = SourceImage::decode(image_bytes)?;
    generate_stencil(&source, settings)
}

/// Run the stencil transform and keep every intermediate raster.
///
/// Produces the same [`StencilImage`] as [`generate_stencil`], plus the
/// grayscale, blurred, and raw edge images for stage previews.
///
/// # Errors
///
/// Same as [`generate_stencil`].
#[tracing::instrument(level = "debug", skip_all, fields(blur_radius = settings.blur_radius))]
pub fn process_staged(
    source: &SourceImage,
    settings: &StencilSettings,
) -> Result<StagedStencil, StencilError> {
    let kernel_size = settings.blur_kernel_size()?;
    source.require_pixels()?;

    let gray = grayscale::to_grayscale(source.as_rgb());
    let blurred = blur::gaussian_blur(&gray, kernel_size);
    let edges = edge::detect_edges(&blurred, settings.low_threshold, settings.high_threshold);
    let stencil = StencilImage::from_edge_mask(edges.clone(), settings.inverted);
    tracing::debug!(
        kernel_size,
        edge_pixels = stencil.edge_pixel_count(),
        "staged run complete"
    );

    Ok(StagedStencil {
        grayscale: gray,
        blurred,
        edges,
        stencil,
        kernel_size,
        dimensions: source.dimensions(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Left half black, right half white.
    fn sharp_edge_source(width: u32, height: u32) -> SourceImage {
        SourceImage::from_rgb(RgbImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }))
    }

    #[test]
    fn output_has_source_dimensions() {
        let source = sharp_edge_source(37, 21);
        let stencil = generate_stencil(&source, &StencilSettings::default()).unwrap();
        assert_eq!(stencil.dimensions(), source.dimensions());
    }

    #[test]
    fn output_is_binary() {
        let source = SourceImage::from_rgb(RgbImage::from_fn(30, 30, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8])
        }));
        let stencil = generate_stencil(&source, &StencilSettings::default()).unwrap();
        assert!(stencil.as_gray().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn default_stencil_draws_dark_lines_on_white() {
        let stencil =
            generate_stencil(&sharp_edge_source(40, 40), &StencilSettings::default()).unwrap();
        assert!(stencil.inverted());
        assert!(stencil.edge_pixel_count() > 0);
        // Far from the boundary is background.
        assert_eq!(stencil.as_gray().get_pixel(2, 20).0[0], 255);
        assert_eq!(stencil.as_gray().get_pixel(37, 20).0[0], 255);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let source = sharp_edge_source(40, 40);
        let settings = StencilSettings::default();
        let a = generate_stencil(&source, &settings).unwrap();
        let b = generate_stencil(&source, &settings).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_blur_radius_is_rejected() {
        let settings = StencilSettings {
            blur_radius: -3,
            ..StencilSettings::default()
        };
        let result = generate_stencil(&sharp_edge_source(10, 10), &settings);
        assert!(matches!(result, Err(StencilError::InvalidParameter { .. })));
    }

    #[test]
    fn from_bytes_checks_settings_before_decoding() {
        let settings = StencilSettings {
            blur_radius: 0,
            ..StencilSettings::default()
        };
        let result = generate_stencil_from_bytes(&[], &settings);
        assert!(matches!(result, Err(StencilError::InvalidParameter { .. })));
    }

    #[test]
    fn from_bytes_rejects_empty_and_corrupt_input() {
        let settings = StencilSettings::default();
        assert!(matches!(
            generate_stencil_from_bytes(&[], &settings),
            Err(StencilError::EmptyInput)
        ));
        assert!(matches!(
            generate_stencil_from_bytes(&[0xFF, 0x00], &settings),
            Err(StencilError::InvalidImage(_))
        ));
    }

    #[test]
    fn zero_size_source_is_rejected() {
        let settings = StencilSettings::default();
        for (w, h) in [(0, 0), (0, 7), (7, 0)] {
            let source = SourceImage::from_rgb(RgbImage::new(w, h));
            let err = generate_stencil(&source, &settings).unwrap_err();
            assert!(matches!(err, StencilError::EmptyInput), "{w}x{h}: {err}");
            assert!(err.is_invalid_image());
            assert!(matches!(
                process_staged(&source, &settings),
                Err(StencilError::EmptyInput)
            ));
        }
    }

    #[test]
    fn staged_stencil_matches_one_shot() {
        let source = sharp_edge_source(40, 40);
        let settings = StencilSettings {
            blur_radius: 4,
            ..StencilSettings::default()
        };
        let staged = process_staged(&source, &settings).unwrap();
        assert_eq!(staged.kernel_size, 5);
        assert_eq!(staged.stencil, generate_stencil(&source, &settings).unwrap());
        assert_eq!(staged.stencil.edge_mask(), staged.edges);
        for stage in StageId::ALL {
            assert_eq!(staged.image(stage).dimensions(), (40, 40), "{stage}");
        }
    }
}
