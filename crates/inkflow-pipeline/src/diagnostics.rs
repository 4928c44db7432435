//! Transform diagnostics: timing and metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning. [`process_staged_with_diagnostics`] runs the same
//! stages as [`process_staged`](crate::process_staged) and records how
//! long each one took and what it produced.
//!
//! The crate performs no I/O and reads no clock of its own: callers
//! supply a [`Clock`]. Native front-ends wrap `std::time::Instant`;
//! tests use a deterministic fake.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{SourceImage, StagedStencil, StencilError, StencilImage, StencilSettings};
use crate::{blur, edge, grayscale};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single transform run.
///
/// The invert stage is `None` when `inverted` was off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StencilDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: grayscale conversion.
    pub grayscale: StageDiagnostics,
    /// Stage 2: Gaussian blur.
    pub blur: StageDiagnostics,
    /// Stage 3: Canny edge detection.
    pub edge_detection: StageDiagnostics,
    /// Stage 4: edge map inversion (only when `settings.inverted`).
    pub invert: Option<StageDiagnostics>,
    /// Total wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: StencilSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Grayscale conversion metrics.
    Grayscale {
        /// Mean luma over the whole image.
        mean_luma: f64,
    },
    /// Gaussian blur metrics.
    Blur {
        /// Kernel side length after even-to-odd coercion.
        kernel_size: u32,
        /// Sigma derived from the kernel size.
        sigma: f32,
    },
    /// Canny edge detection metrics.
    EdgeDetection {
        /// Effective low threshold (`min(low, high)`).
        low_threshold: u8,
        /// High threshold.
        high_threshold: u8,
        /// Number of edge pixels in the mask.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Edge map inversion metrics.
    Invert {
        /// Pixel value edges are drawn with after inversion.
        edge_value: u8,
    },
}

/// High-level summary of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StencilSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of edge pixels in the stencil.
    pub edge_pixel_count: u64,
    /// Fraction of pixels that are edges, `0.0..=1.0`.
    pub edge_density: f64,
}

impl StencilDiagnostics {
    /// Every stage that ran, in order, with its display name.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        let mut stages = vec![
            ("Decode", &self.decode),
            ("Grayscale", &self.grayscale),
            ("Blur", &self.blur),
            ("Edge Detection", &self.edge_detection),
        ];
        if let Some(ref inv) = self.invert {
            stages.push(("Invert", inv));
        }
        stages
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Stencil Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Edge pixels: {}  |  Density: {:.2}%",
            self.summary.edge_pixel_count,
            self.summary.edge_density * 100.0,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Grayscale { mean_luma } => format!("mean={mean_luma:.1}"),
        StageMetrics::Blur { kernel_size, sigma } => {
            format!("k={kernel_size} sigma={sigma:.2}")
        }
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            let density = ratio(*edge_pixel_count, *total_pixel_count) * 100.0;
            format!(
                "low={low_threshold} high={high_threshold} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::Invert { edge_value } => format!("edge_value={edge_value}"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Count edge pixels (value == 255) in a raw edge mask.
pub(crate) fn count_edge_pixels(mask: &image::GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(p.0[0] == crate::types::EDGE))
        .sum()
}

fn mean_luma(gray: &image::GrayImage) -> f64 {
    let total: u64 = gray.pixels().map(|p| u64::from(p.0[0])).sum();
    ratio(total, u64::from(gray.width()) * u64::from(gray.height()))
}

/// Decode `image_bytes` and run every stage, timing each one.
///
/// Settings are validated before decoding, so an invalid parameter
/// costs no pixel work.
///
/// # Errors
///
/// Same as [`SourceImage::decode`] and
/// [`generate_stencil`](crate::generate_stencil).
pub fn process_staged_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    settings: &StencilSettings,
    clock: &C,
) -> Result<(StagedStencil, StencilDiagnostics), StencilError> {
    let kernel_size = settings.blur_kernel_size()?;
    let run_start = clock.now();

    // 0. Decode.
    let t = clock.now();
    let source = SourceImage::decode(image_bytes)?;
    let dimensions = source.dimensions();
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        },
    };

    // 1. Grayscale.
    let t = clock.now();
    let gray = grayscale::to_grayscale(source.as_rgb());
    let grayscale_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Grayscale {
            mean_luma: mean_luma(&gray),
        },
    };

    // 2. Blur.
    let t = clock.now();
    let blurred = blur::gaussian_blur(&gray, kernel_size);
    let blur_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Blur {
            kernel_size,
            sigma: blur::sigma_for_kernel_size(kernel_size),
        },
    };

    // 3. Canny.
    let t = clock.now();
    let edges = edge::detect_edges(&blurred, settings.low_threshold, settings.high_threshold);
    let edge_pixel_count = count_edge_pixels(&edges);
    let edge_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::EdgeDetection {
            low_threshold: settings.low_threshold.min(settings.high_threshold),
            high_threshold: settings.high_threshold,
            edge_pixel_count,
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    // 4. Inversion.
    let t = clock.now();
    let stencil = StencilImage::from_edge_mask(edges.clone(), settings.inverted);
    let invert = settings.inverted.then(|| StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Invert {
            edge_value: stencil.edge_value(),
        },
    });

    let diagnostics = StencilDiagnostics {
        decode,
        grayscale: grayscale_diag,
        blur: blur_diag,
        edge_detection: edge_diag,
        invert,
        total_duration: clock.elapsed(&run_start),
        summary: StencilSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            edge_pixel_count,
            edge_density: ratio(edge_pixel_count, dimensions.pixel_count()),
        },
    };

    let staged = StagedStencil {
        grayscale: gray,
        blurred,
        edges,
        stencil,
        kernel_size,
        dimensions,
    };

    Ok((staged, diagnostics))
}
