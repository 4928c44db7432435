//! Identifiers for the intermediate rasters of a staged run.

use image::GrayImage;

use crate::types::StagedStencil;

/// One previewable step of the stencil transform.
///
/// Decoding is not a stage here: its output is the colour source, which
/// front-ends already hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Stage 1: BT.601 grayscale.
    Grayscale,
    /// Stage 2: Gaussian blur.
    Blurred,
    /// Stage 3: raw Canny edge mask (white edges on black).
    Edges,
    /// Stage 4: final stencil, inverted when requested.
    Stencil,
}

impl StageId {
    /// All stages in pipeline order.
    pub const ALL: [Self; 4] = [Self::Grayscale, Self::Blurred, Self::Edges, Self::Stencil];

    /// Display label for the stage.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grayscale => "Grayscale",
            Self::Blurred => "Blur",
            Self::Edges => "Edges",
            Self::Stencil => "Stencil",
        }
    }

    /// Lower-case name usable in file names (`01-grayscale.png`).
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Blurred => "blur",
            Self::Edges => "edges",
            Self::Stencil => "stencil",
        }
    }

    /// One-based position in [`ALL`](Self::ALL).
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Grayscale => 1,
            Self::Blurred => 2,
            Self::Edges => 3,
            Self::Stencil => 4,
        }
    }

    /// File name for this stage's PNG, e.g. `03-edges.png`.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{:02}-{}.png", self.number(), self.slug())
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl StagedStencil {
    /// The raster produced by `stage`.
    #[must_use]
    pub const fn image(&self, stage: StageId) -> &GrayImage {
        match stage {
            StageId::Grayscale => &self.grayscale,
            StageId::Blurred => &self.blurred,
            StageId::Edges => &self.edges,
            StageId::Stencil => self.stencil.as_gray(),
        }
    }
}
