//! Core speech-engine trait and implementations.
//!
//! [`SpeechEngine`] is the public interface used by the playback
//! orchestrator.  It is object-safe and `Send + Sync` so it can be held
//! behind an `Arc<dyn SpeechEngine>`.
//!
//! [`NullEngine`] is the stub installed when no speech model is present —
//! the app still launches and every play attempt surfaces a clear error.
//!
//! [`MockEngine`] (available under `#[cfg(test)]`) streams pre-configured
//! sample chunks on a timer — the orchestrator tests run against it without
//! any model file or audio device.

use async_trait::async_trait;
use thiserror::Error;

use super::job::{JobHandle, UtteranceJob};

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// All errors that can arise from the speech-synthesis subsystem.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The speech model file was not found at the given path.
    #[error("speech model not found: {0}")]
    ModelNotFound(String),

    /// The requested voice id is not loaded.
    #[error("unknown voice: {0}")]
    UnknownVoice(String),

    /// Synthesis failed mid-job.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The engine went away without resolving the job.
    #[error("speech engine disconnected before resolving the job")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// SpeechEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-synthesis engines.
///
/// # Contract
///
/// - [`submit`](Self::submit) accepts one [`UtteranceJob`] and returns a
///   [`JobHandle`] whose outcome resolves **exactly once** with Completed,
///   Cancelled, or an error.
/// - Audio is streamed into the job's `sample_tx` as mono `f32` PCM at
///   [`sample_rate`](Self::sample_rate) Hz.
/// - [`pause`](Self::pause) / [`resume`](Self::resume) gate sample
///   delivery for the active job; both are no-ops when idle.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Start synthesizing `job`; returns immediately with the job handle.
    async fn submit(&self, job: UtteranceJob) -> Result<JobHandle, EngineError>;

    /// Suspend sample delivery for the active job.
    fn pause(&self);

    /// Resume sample delivery after [`pause`](Self::pause).
    fn resume(&self);

    /// Native PCM sample rate of the streamed audio, in Hz.
    fn sample_rate(&self) -> u32;
}

// Compile-time assertion: Box<dyn SpeechEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechEngine>) {}
};

// ---------------------------------------------------------------------------
// NullEngine
// ---------------------------------------------------------------------------

/// Fallback engine used when the speech model is not installed.
///
/// Every submit fails with [`EngineError::ModelNotFound`], which the
/// orchestrator surfaces as a status message — the rest of the app
/// (clipboard capture, hotkeys, presets) keeps working.
pub struct NullEngine {
    model_path: String,
}

impl NullEngine {
    /// `model_path` is echoed in the error so the user knows where to put
    /// the model file.
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

#[async_trait]
impl SpeechEngine for NullEngine {
    async fn submit(&self, _job: UtteranceJob) -> Result<JobHandle, EngineError> {
        Err(EngineError::ModelNotFound(self.model_path.clone()))
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn sample_rate(&self) -> u32 {
        24_000
    }
}

// ---------------------------------------------------------------------------
// MockEngine (test-only)
// ---------------------------------------------------------------------------

/// Scripted engine for orchestrator tests.
///
/// Streams `chunks` copies of a small sample buffer with `chunk_delay`
/// between them, honouring cancellation and pause, then resolves Completed.
/// `fail_on_submit` makes `submit` return an error instead.
#[cfg(test)]
pub struct MockEngine {
    pub chunks: usize,
    pub chunk_delay: std::time::Duration,
    pub fail_on_submit: Option<EngineError>,
    paused: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl MockEngine {
    /// Engine that streams `chunks` chunks 1 ms apart and completes.
    pub fn streaming(chunks: usize) -> Self {
        Self {
            chunks,
            chunk_delay: std::time::Duration::from_millis(1),
            fail_on_submit: None,
            paused: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    /// Engine whose `submit` always fails with `err`.
    pub fn failing(err: EngineError) -> Self {
        Self {
            chunks: 0,
            chunk_delay: std::time::Duration::ZERO,
            fail_on_submit: Some(err),
            paused: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechEngine for MockEngine {
    async fn submit(&self, job: UtteranceJob) -> Result<JobHandle, EngineError> {
        use std::sync::atomic::Ordering;

        if let Some(err) = &self.fail_on_submit {
            return Err(err.clone());
        }

        let (handle, reporter) = JobHandle::new();
        let chunks = self.chunks;
        let delay = self.chunk_delay;
        let paused = std::sync::Arc::clone(&self.paused);

        tokio::spawn(async move {
            for _ in 0..chunks {
                if reporter.is_cancelled() {
                    reporter.resolve(Ok(super::job::JobOutcome::Cancelled));
                    return;
                }
                while paused.load(Ordering::Relaxed) {
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    if reporter.is_cancelled() {
                        reporter.resolve(Ok(super::job::JobOutcome::Cancelled));
                        return;
                    }
                }
                if job.sample_tx.send(vec![0.0f32; 256]).await.is_err() {
                    // receiver gone — treat as cancellation
                    reporter.resolve(Ok(super::job::JobOutcome::Cancelled));
                    return;
                }
                tokio::time::sleep(delay).await;
            }
            reporter.resolve(Ok(super::job::JobOutcome::Completed));
        });

        Ok(handle)
    }

    fn pause(&self) {
        self.paused.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    fn resume(&self) {
        self.paused.store(false, std::sync::atomic::Ordering::Relaxed);
    }

    fn sample_rate(&self) -> u32 {
        24_000
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::job::JobOutcome;
    use tokio::sync::mpsc;

    fn job(tx: mpsc::Sender<Vec<f32>>) -> UtteranceJob {
        UtteranceJob {
            text: "hello".into(),
            voice: "af_heart".into(),
            speed: 1.0,
            sample_tx: tx,
        }
    }

    #[tokio::test]
    async fn null_engine_reports_missing_model() {
        let engine = NullEngine::new("/tmp/speech.onnx");
        let (tx, _rx) = mpsc::channel(4);
        let err = engine.submit(job(tx)).await.unwrap_err();
        assert!(matches!(err, EngineError::ModelNotFound(p) if p.contains("speech.onnx")));
    }

    #[tokio::test]
    async fn mock_engine_streams_then_completes() {
        let engine = MockEngine::streaming(3);
        let (tx, mut rx) = mpsc::channel(8);
        let handle = engine.submit(job(tx)).await.unwrap();

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 3);
        assert_eq!(handle.wait().await.unwrap(), JobOutcome::Completed);
    }

    #[tokio::test]
    async fn mock_engine_honours_cancellation() {
        let engine = MockEngine::streaming(1_000);
        let (tx, mut rx) = mpsc::channel(8);
        let handle = engine.submit(job(tx)).await.unwrap();

        // Let a chunk or two through, then cancel.
        let _ = rx.recv().await;
        handle.cancel();
        // Drain so the sender never blocks on a full channel.
        tokio::spawn(async move { while rx.recv().await.is_some() {} });

        assert_eq!(handle.wait().await.unwrap(), JobOutcome::Cancelled);
    }
}
