//! Per-user session state with "last request wins" commits.

use std::sync::Arc;

use inkflow_pipeline::{Dimensions, SourceImage, StencilError, StencilImage, StencilSettings};

/// One transform to run: a snapshot of the session at request time.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Generation this request was issued under.
    pub generation: u64,
    /// Image to transform, shared with the session.
    pub source: Arc<SourceImage>,
    /// Settings to apply.
    pub settings: StencilSettings,
}

impl RenderRequest {
    /// Run the transform synchronously on the calling thread.
    #[must_use]
    pub fn render(&self) -> RenderResult {
        RenderResult {
            generation: self.generation,
            outcome: inkflow_pipeline::generate_stencil(&self.source, &self.settings),
        }
    }
}

/// Outcome of a [`RenderRequest`], tagged with its generation.
#[derive(Debug)]
pub struct RenderResult {
    /// Generation of the request that produced this result.
    pub generation: u64,
    /// The stencil, or why it could not be produced.
    pub outcome: Result<StencilImage, StencilError>,
}

/// What [`Session::apply`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The stencil replaced the displayed one.
    Committed,
    /// The run failed; the previous stencil stays displayed and the
    /// error is recorded.
    Failed,
    /// A newer request exists (or the image changed); nothing changed.
    Stale,
}

/// State of one interactive session.
///
/// The session never runs the transform itself. Callers obtain a
/// [`RenderRequest`] from [`next_request`](Self::next_request), run it
/// anywhere, and hand the [`RenderResult`] back to
/// [`apply`](Self::apply).
#[derive(Debug, Default)]
pub struct Session {
    source: Option<Arc<SourceImage>>,
    settings: StencilSettings,
    generation: u64,
    display: Option<StencilImage>,
    last_error: Option<String>,
}

impl Session {
    /// An empty session with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and hold a newly uploaded image.
    ///
    /// On success the displayed stencil is cleared and any in-flight
    /// results for the previous image become stale.
    ///
    /// # Errors
    ///
    /// Returns [`StencilError::EmptyInput`] or
    /// [`StencilError::InvalidImage`] if the bytes are not a usable
    /// image. The session is left untouched in that case.
    pub fn load(&mut self, image_bytes: &[u8]) -> Result<Dimensions, StencilError> {
        let source = SourceImage::decode(image_bytes)?;
        Ok(self.load_source(source))
    }

    /// Hold an already-decoded image. See [`load`](Self::load).
    pub fn load_source(&mut self, source: SourceImage) -> Dimensions {
        let dimensions = source.dimensions();
        self.source = Some(Arc::new(source));
        self.display = None;
        self.last_error = None;
        self.generation += 1;
        tracing::debug!(
            width = dimensions.width,
            height = dimensions.height,
            generation = self.generation,
            "source loaded"
        );
        dimensions
    }

    /// Replace the current settings. Takes effect on the next request.
    pub const fn update_settings(&mut self, settings: StencilSettings) {
        self.settings = settings;
    }

    /// Drop the image and stencil and restore default settings.
    pub fn reset(&mut self) {
        self.source = None;
        self.display = None;
        self.last_error = None;
        self.settings = StencilSettings::default();
        self.generation += 1;
        tracing::debug!(generation = self.generation, "session reset");
    }

    /// Issue a request for the current image and settings.
    ///
    /// Returns `None` when no image is loaded. Every call supersedes all
    /// earlier requests.
    pub fn next_request(&mut self) -> Option<RenderRequest> {
        let source = Arc::clone(self.source.as_ref()?);
        self.generation += 1;
        Some(RenderRequest {
            generation: self.generation,
            source,
            settings: self.settings,
        })
    }

    /// Commit `result` if it answers the latest request.
    pub fn apply(&mut self, result: RenderResult) -> Applied {
        if result.generation != self.generation {
            tracing::debug!(
                result = result.generation,
                latest = self.generation,
                "discarding stale result"
            );
            return Applied::Stale;
        }
        match result.outcome {
            Ok(stencil) => {
                self.display = Some(stencil);
                self.last_error = None;
                Applied::Committed
            }
            Err(e) => {
                tracing::warn!(error = %e, "render failed; keeping previous stencil");
                self.last_error = Some(e.to_string());
                Applied::Failed
            }
        }
    }

    /// The loaded image, if any.
    #[must_use]
    pub const fn source(&self) -> Option<&Arc<SourceImage>> {
        self.source.as_ref()
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> &StencilSettings {
        &self.settings
    }

    /// The stencil currently on display.
    #[must_use]
    pub const fn display(&self) -> Option<&StencilImage> {
        self.display.as_ref()
    }

    /// Message of the most recent failed render, cleared by the next
    /// successful one.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Latest issued generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn step_source() -> SourceImage {
        SourceImage::from_rgb(image::RgbImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }))
    }

    fn loaded() -> Session {
        let mut session = Session::new();
        session.load_source(step_source());
        session
    }

    #[test]
    fn no_request_without_source() {
        let mut session = Session::new();
        assert!(session.next_request().is_none());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn latest_request_commits() {
        let mut session = loaded();
        let request = session.next_request().unwrap();
        assert_eq!(session.apply(request.render()), Applied::Committed);
        assert!(session.display().is_some());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn older_result_is_stale_even_when_it_arrives_last() {
        let mut session = loaded();
        let first = session.next_request().unwrap();
        session.update_settings(StencilSettings {
            inverted: false,
            ..StencilSettings::default()
        });
        let second = session.next_request().unwrap();

        assert_eq!(session.apply(second.render()), Applied::Committed);
        assert_eq!(session.apply(first.render()), Applied::Stale);
        assert!(!session.display().unwrap().inverted());
    }

    #[test]
    fn failure_keeps_previous_stencil() {
        let mut session = loaded();
        let good = session.next_request().unwrap();
        session.apply(good.render());
        let shown = session.display().cloned().unwrap();

        session.update_settings(StencilSettings {
            blur_radius: 0,
            ..StencilSettings::default()
        });
        let bad = session.next_request().unwrap();
        assert_eq!(session.apply(bad.render()), Applied::Failed);
        assert_eq!(session.display(), Some(&shown));
        assert!(session.last_error().unwrap().contains("blur_radius"));
    }

    #[test]
    fn loading_new_image_makes_inflight_results_stale() {
        let mut session = loaded();
        let request = session.next_request().unwrap();
        session.load_source(step_source());
        assert_eq!(session.apply(request.render()), Applied::Stale);
        assert!(session.display().is_none());
    }

    #[test]
    fn failed_load_leaves_session_untouched() {
        let mut session = loaded();
        let request = session.next_request().unwrap();
        session.apply(request.render());
        let generation = session.generation();

        assert!(session.load(&[]).unwrap_err().is_invalid_image());
        assert!(session.load(b"garbage").unwrap_err().is_invalid_image());
        assert_eq!(session.generation(), generation);
        assert!(session.source().is_some());
        assert!(session.display().is_some());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut session = loaded();
        session.update_settings(StencilSettings {
            low_threshold: 1,
            ..StencilSettings::default()
        });
        let request = session.next_request().unwrap();
        session.reset();

        assert!(session.source().is_none());
        assert_eq!(*session.settings(), StencilSettings::default());
        assert!(session.next_request().is_none());
        assert_eq!(session.apply(request.render()), Applied::Stale);
    }

    #[test]
    fn request_snapshots_settings() {
        let mut session = loaded();
        let request = session.next_request().unwrap();
        session.update_settings(StencilSettings {
            high_threshold: 7,
            ..StencilSettings::default()
        });
        assert_eq!(request.settings, StencilSettings::default());
        assert!(Arc::ptr_eq(&request.source, session.source().unwrap()));
    }
}
