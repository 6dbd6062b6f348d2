//! Speech-synthesis engine boundary.
//!
//! # Architecture
//!
//! ```text
//! PlaybackOrchestrator
//!        │ submit(UtteranceJob { text, voice, speed, sample_tx })
//!        ▼
//! SpeechEngine (trait)                 JobHandle
//!   ├─ NullEngine  (no model stub)       ├─ cancel()   — idempotent flag
//!   └─ MockEngine  (tests)               └─ outcome    — resolves exactly
//!        │                                              once (oneshot)
//!        └──▶ sample_tx: mono f32 PCM chunks at sample_rate() Hz
//! ```
//!
//! The engine never touches shared state: it receives everything it needs
//! in the job and reports back through the handle.  The orchestrator is the
//! only caller.

pub mod job;
pub mod synth;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use job::{JobHandle, JobOutcome, JobReporter, UtteranceJob, UtteranceRequest};
pub use synth::{EngineError, NullEngine, SpeechEngine};

// test-only re-export so the player test module can import MockEngine
// without `use clipvoice::engine::synth::MockEngine`.
#[cfg(test)]
pub use synth::MockEngine;
