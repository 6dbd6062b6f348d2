//! Audio output via `cpal`.
//!
//! The playback orchestrator pushes mono `f32` PCM chunks (at the engine's
//! native rate) into an [`AudioSink`]; [`CpalSink`] resamples them to the
//! device rate, queues them in a [`SampleQueue`], and feeds the output
//! callback.  [`NullSink`] is the headless fallback when no device exists.

pub mod queue;
pub mod resample;
pub mod sink;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use queue::SampleQueue;
pub use resample::convert_rate;
pub use sink::{AudioSink, CpalSink, NullSink, SinkError};
