//! Utterance job and handle types exchanged with the speech engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use super::synth::EngineError;

// ---------------------------------------------------------------------------
// UtteranceRequest
// ---------------------------------------------------------------------------

/// One unit of text submitted for speech synthesis.  Immutable once created.
#[derive(Debug, Clone)]
pub struct UtteranceRequest {
    /// Raw text before dictionary processing.
    pub text: String,
    /// Voice id (e.g. `"af_heart"`).
    pub voice: String,
    /// Speed multiplier; `None` takes the orchestrator's current speed at
    /// submit time, so `SetSpeed` applies to future plays.
    pub speed: Option<f32>,
    /// When the request was created.
    pub submitted_at: Instant,
}

impl UtteranceRequest {
    /// Request speaking `text` with `voice` at the orchestrator's current
    /// speed.
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            speed: None,
            submitted_at: Instant::now(),
        }
    }

    /// Pin an explicit speed instead of the orchestrator's current one.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }
}

// ---------------------------------------------------------------------------
// UtteranceJob
// ---------------------------------------------------------------------------

/// The concrete work item handed to [`super::SpeechEngine::submit`].
///
/// `sample_tx` is the audio callback: the engine streams mono `f32` PCM
/// chunks at its native [`sample_rate`](super::SpeechEngine::sample_rate)
/// into it while synthesizing.
pub struct UtteranceJob {
    /// Cleaned, speakable text (dictionary processing already applied).
    pub text: String,
    /// Voice id.
    pub voice: String,
    /// Effective speed multiplier.
    pub speed: f32,
    /// Destination for synthesized PCM chunks.
    pub sample_tx: mpsc::Sender<Vec<f32>>,
}

// ---------------------------------------------------------------------------
// JobOutcome / JobHandle
// ---------------------------------------------------------------------------

/// Terminal result of a synthesis job, reported exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The whole utterance was synthesized.
    Completed,
    /// The job was cancelled before finishing.
    Cancelled,
}

/// Handle to an in-flight synthesis job.
///
/// `outcome` resolves exactly once with `Completed`, `Cancelled`, or an
/// [`EngineError`]; a dropped sender is reported as
/// [`EngineError::Disconnected`] by [`JobHandle::wait`].
#[derive(Debug)]
pub struct JobHandle {
    cancel: Arc<AtomicBool>,
    /// Single-resolution completion signal.
    pub outcome: oneshot::Receiver<Result<JobOutcome, EngineError>>,
}

impl JobHandle {
    /// Create a handle plus the sender half the engine resolves it with.
    pub fn new() -> (Self, JobReporter) {
        let (tx, rx) = oneshot::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        (
            Self {
                cancel: Arc::clone(&cancel),
                outcome: rx,
            },
            JobReporter { cancel, tx },
        )
    }

    /// Request cancellation.  Idempotent; the engine observes the flag at
    /// its next chunk boundary and resolves the outcome as `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Await the terminal outcome, mapping a dropped engine into
    /// [`EngineError::Disconnected`].
    pub async fn wait(self) -> Result<JobOutcome, EngineError> {
        match self.outcome.await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Disconnected),
        }
    }
}

/// Engine-side half of a [`JobHandle`]: the cancellation flag to poll and
/// the one-shot outcome sender.
pub struct JobReporter {
    cancel: Arc<AtomicBool>,
    tx: oneshot::Sender<Result<JobOutcome, EngineError>>,
}

impl JobReporter {
    /// `true` once [`JobHandle::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Resolve the job.  Consumes the reporter so the outcome can only be
    /// sent once; an already-dropped handle is ignored.
    pub fn resolve(self, result: Result<JobOutcome, EngineError>) {
        let _ = self.tx.send(result);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_resolves_once_with_outcome() {
        let (handle, reporter) = JobHandle::new();
        reporter.resolve(Ok(JobOutcome::Completed));
        assert_eq!(handle.wait().await.unwrap(), JobOutcome::Completed);
    }

    #[tokio::test]
    async fn cancel_flag_is_visible_to_reporter() {
        let (handle, reporter) = JobHandle::new();
        assert!(!reporter.is_cancelled());
        handle.cancel();
        handle.cancel(); // idempotent
        assert!(reporter.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_reporter_maps_to_disconnected() {
        let (handle, reporter) = JobHandle::new();
        drop(reporter);
        assert!(matches!(
            handle.wait().await,
            Err(EngineError::Disconnected)
        ));
    }
}
