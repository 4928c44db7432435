//! Background rendering thread with debounce and coalescing.
//!
//! [`StencilWorker`] owns one thread. Submitted requests queue on a
//! channel; the thread takes the oldest, then keeps swallowing newer
//! ones until the queue has been quiet for
//! [`WorkerConfig::debounce`]. Only the newest survivor is rendered, so
//! a burst of slider events costs a single transform.
//!
//! Results come back on a second channel. The worker does not decide
//! which results are current; that is [`Session::apply`]'s job.
//!
//! [`Session::apply`]: crate::Session::apply

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::session::{RenderRequest, RenderResult};

/// Tuning for [`StencilWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Quiet period a request must survive before it is rendered.
    /// Zero renders immediately (still dropping already-queued
    /// superseded requests).
    pub debounce: Duration,
}

impl WorkerConfig {
    /// Default debounce period.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            debounce: Self::DEFAULT_DEBOUNCE,
        }
    }
}

/// Errors from talking to the worker thread.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The worker thread has stopped.
    #[error("stencil worker is no longer running")]
    Disconnected,

    /// The OS refused to start the worker thread.
    #[error("failed to spawn stencil worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

enum Command {
    Render(RenderRequest),
    Shutdown,
}

/// Handle to the background rendering thread.
///
/// Dropping the handle stops the thread and waits for it. A render in
/// progress is allowed to finish first.
pub struct StencilWorker {
    commands: Sender<Command>,
    results: Receiver<RenderResult>,
    handle: Option<JoinHandle<()>>,
}

impl StencilWorker {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] if the thread cannot be created.
    pub fn spawn(config: WorkerConfig) -> Result<Self, WorkerError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("inkflow-render".into())
            .spawn(move || run(&command_rx, &result_tx, config))?;
        Ok(Self {
            commands: command_tx,
            results: result_rx,
            handle: Some(handle),
        })
    }

    /// Queue a request. Supersedes any queued request not yet started.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the thread has stopped.
    pub fn submit(&self, request: RenderRequest) -> Result<(), WorkerError> {
        tracing::trace!(generation = request.generation, "submitting render request");
        self.commands
            .send(Command::Render(request))
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Take a finished result without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the thread has stopped
    /// and every result has been taken.
    pub fn try_recv(&self) -> Result<Option<RenderResult>, WorkerError> {
        match self.results.try_recv() {
            Ok(result) => Ok(Some(result)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Wait up to `timeout` for a finished result.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the thread has stopped
    /// and every result has been taken.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<RenderResult>, WorkerError> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Ok(Some(result)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Stop the thread and wait for it. Queued requests are dropped.
    ///
    /// Idempotent; later [`submit`](Self::submit) calls fail with
    /// [`WorkerError::Disconnected`].
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        // A send error means the thread already exited.
        let _ = self.commands.send(Command::Shutdown);
        if handle.join().is_err() {
            tracing::error!("stencil worker thread panicked");
        }
    }
}

impl Drop for StencilWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for StencilWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StencilWorker")
            .field("running", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

/// Thread body: debounce, coalesce, render, publish.
fn run(commands: &Receiver<Command>, results: &Sender<RenderResult>, config: WorkerConfig) {
    while let Ok(Command::Render(first)) = commands.recv() {
        let Some(request) = settle(commands, first, config.debounce) else {
            break;
        };

        tracing::debug!(generation = request.generation, "rendering");
        let result = request.render();
        if results.send(result).is_err() {
            // Handle dropped without shutdown; nobody is listening.
            break;
        }
    }
    tracing::debug!("stencil worker stopped");
}

/// Wait out the quiet period, replacing `request` with every newer one
/// that arrives. Returns `None` on shutdown.
fn settle(
    commands: &Receiver<Command>,
    mut request: RenderRequest,
    debounce: Duration,
) -> Option<RenderRequest> {
    loop {
        match commands.recv_timeout(debounce) {
            Ok(Command::Render(newer)) => {
                tracing::trace!(
                    dropped = request.generation,
                    kept = newer.generation,
                    "coalesced render request"
                );
                request = newer;
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return None,
            Err(RecvTimeoutError::Timeout) => return Some(request),
        }
    }
}
