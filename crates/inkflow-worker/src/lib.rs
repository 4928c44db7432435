//! inkflow-worker: coordination for interactive stencil front-ends.
//!
//! Live front-ends re-run the transform on every slider movement. Two
//! pieces keep that responsive and correct:
//!
//! - [`Session`] owns the uploaded image, the current settings, and the
//!   displayed stencil. Every request is tagged with a generation
//!   number and only a result carrying the latest generation is
//!   committed, so a slow run can never overwrite a newer one.
//! - [`StencilWorker`] renders requests on a background thread, waiting
//!   for a short quiet period and coalescing bursts down to the newest
//!   request before starting.
//!
//! Neither piece knows anything about a particular UI toolkit.

pub mod session;
pub mod worker;

pub use session::{Applied, RenderRequest, RenderResult, Session};
pub use worker::{StencilWorker, WorkerConfig, WorkerError};
