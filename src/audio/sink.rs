//! Audio output sinks.
//!
//! [`AudioSink`] is the narrow interface the orchestrator pushes synthesized
//! PCM through.  [`CpalSink`] is the production implementation on top of
//! `cpal`; [`NullSink`] discards audio so the app can run headless (no
//! output device, CI).
//!
//! # Thread model
//!
//! `cpal::Stream` is `!Send`, so [`CpalSink`] builds and parks the stream on
//! a dedicated OS thread and communicates with the device callback only
//! through the shared [`SampleQueue`] and a paused flag.  Dropping the sink
//! unparks the thread, which drops the stream and exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::queue::SampleQueue;
use super::resample::convert_rate;

// ---------------------------------------------------------------------------
// SinkError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up the audio output.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("failed to query default output config: {0}")]
    DefaultConfig(String),

    #[error("output device uses unsupported sample format {0}")]
    UnsupportedFormat(String),

    #[error("failed to build output stream: {0}")]
    BuildStream(String),

    #[error("failed to start output stream: {0}")]
    PlayStream(String),
}

// ---------------------------------------------------------------------------
// AudioSink trait
// ---------------------------------------------------------------------------

/// Destination for synthesized audio.  Object-safe and `Send + Sync` so the
/// orchestrator can hold an `Arc<dyn AudioSink>`.
pub trait AudioSink: Send + Sync {
    /// Queue mono samples (at the engine's native rate) for playback.
    fn push(&self, samples: &[f32]);

    /// Silence the output without discarding queued audio.
    fn pause(&self);

    /// Resume after [`pause`](Self::pause).
    fn resume(&self);

    /// Discard all queued audio (used by Stop and preemption).
    fn clear(&self);
}

// ---------------------------------------------------------------------------
// NullSink
// ---------------------------------------------------------------------------

/// Sink that discards everything.  Used when no output device is available
/// so the rest of the app keeps working.
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn push(&self, _samples: &[f32]) {}
    fn pause(&self) {}
    fn resume(&self) {}
    fn clear(&self) {}
}

// ---------------------------------------------------------------------------
// CpalSink
// ---------------------------------------------------------------------------

/// State shared between the sink handle and the device callback.
struct SinkShared {
    queue: Mutex<SampleQueue>,
    paused: AtomicBool,
}

/// Production audio sink on the default cpal output device.
///
/// Pushed chunks are resampled from `source_rate` to the device rate up
/// front; the callback then only pops samples and duplicates them across
/// the device channels.
pub struct CpalSink {
    shared: Arc<SinkShared>,
    source_rate: u32,
    device_rate: u32,
    /// Unparked on drop so the stream thread can exit.
    stream_thread: Option<std::thread::JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl CpalSink {
    /// Open the default output device and start a stream fed from the
    /// internal queue.  `source_rate` is the engine's native PCM rate.
    pub fn new(source_rate: u32) -> Result<Self, SinkError> {
        let shared = Arc::new(SinkShared {
            queue: Mutex::new(SampleQueue::new()),
            paused: AtomicBool::new(false),
        });
        let stop = Arc::new(AtomicBool::new(false));

        // The stream must live on its own thread; report setup results back
        // over a one-shot channel so `new` can still fail synchronously.
        let (setup_tx, setup_rx) = std::sync::mpsc::channel::<Result<u32, SinkError>>();
        let shared_cb = Arc::clone(&shared);
        let stop_thread = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("audio-sink".into())
            .spawn(move || {
                let stream = match build_stream(shared_cb) {
                    Ok((stream, rate)) => {
                        let _ = setup_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = setup_tx.send(Err(e));
                        return;
                    }
                };

                // Keep the stream alive until the sink is dropped.
                while !stop_thread.load(Ordering::Relaxed) {
                    std::thread::park();
                }
                drop(stream);
            })
            .expect("failed to spawn audio-sink thread");

        let device_rate = setup_rx
            .recv()
            .map_err(|_| SinkError::NoDevice)??;

        log::info!("audio sink started ({device_rate} Hz device, {source_rate} Hz source)");

        Ok(Self {
            shared,
            source_rate,
            device_rate,
            stream_thread: Some(thread),
            stop,
        })
    }
}

/// Build and start the output stream; returns it with the device rate.
fn build_stream(shared: Arc<SinkShared>) -> Result<(cpal::Stream, u32), SinkError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(SinkError::NoDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| SinkError::DefaultConfig(e.to_string()))?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(SinkError::UnsupportedFormat(
            format!("{:?}", config.sample_format()),
        ));
    }

    let channels = config.channels() as usize;
    let rate = config.sample_rate().0;
    let stream_config: cpal::StreamConfig = config.into();

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if shared.paused.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }

                let frames = data.len() / channels;
                let mut mono = vec![0.0f32; frames];
                shared.queue.lock().unwrap().pop_into(&mut mono);

                for (frame, &sample) in data.chunks_exact_mut(channels).zip(mono.iter()) {
                    frame.fill(sample);
                }
            },
            |err| log::error!("audio output stream error: {err}"),
            None,
        )
        .map_err(|e| SinkError::BuildStream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| SinkError::PlayStream(e.to_string()))?;

    Ok((stream, rate))
}

impl AudioSink for CpalSink {
    fn push(&self, samples: &[f32]) {
        let converted = convert_rate(samples, self.source_rate, self.device_rate);
        self.shared.queue.lock().unwrap().push_slice(&converted);
    }

    fn pause(&self) {
        self.shared.paused.store(true, Ordering::Relaxed);
    }

    fn resume(&self) {
        self.shared.paused.store(false, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.shared.queue.lock().unwrap().clear();
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.stream_thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_accepts_everything() {
        let sink = NullSink;
        sink.push(&[0.1, 0.2]);
        sink.pause();
        sink.resume();
        sink.clear();
    }

    #[test]
    fn sink_trait_is_object_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<dyn AudioSink>>();
        let _: Box<dyn AudioSink> = Box::new(NullSink);
    }
}
