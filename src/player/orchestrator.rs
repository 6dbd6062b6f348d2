//! The playback orchestrator: a single actor task that owns all utterance
//! lifecycle decisions.
//!
//! # Design
//!
//! All playback mutations flow through one `mpsc` command channel into one
//! actor loop, so at most one utterance session can exist at a time without
//! any locking.  A `Play` that arrives while a session is active preempts
//! it: the running job is cancelled, buffered audio is flushed, the old
//! session resolves as [`SessionOutcome::Cancelled`], and the new session
//! starts immediately.
//!
//! Each `Play` carries a oneshot the caller can await for the session's
//! terminal outcome; the clipboard handler uses this to hold off further
//! candidates while one is being spoken.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::audio::AudioSink;
use crate::config::{MAX_SPEED, MIN_SPEED};
use crate::dict::DictionaryTransformer;
use crate::engine::{EngineError, JobHandle, JobOutcome, SpeechEngine, UtteranceJob, UtteranceRequest};

use super::state::{PlaybackState, SharedStatus};

/// Chunks buffered between the engine and the actor loop.
const SAMPLE_CHANNEL_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// PlayerCommand / SessionOutcome
// ---------------------------------------------------------------------------

/// Commands accepted by the orchestrator actor.
#[derive(Debug)]
pub enum PlayerCommand {
    /// Speak `request`, preempting any active session.  `done` resolves with
    /// the session's terminal outcome.
    Play {
        request: UtteranceRequest,
        done: oneshot::Sender<SessionOutcome>,
    },
    /// Hold playback (valid while playing).
    Pause,
    /// Release a held session.
    Resume,
    /// Cancel the active session; no-op when idle.
    Stop,
    /// Pause if playing, resume if paused.
    TogglePause,
    /// Change the speed used for future utterances, clamped to the allowed
    /// range.
    SetSpeed(f32),
}

/// How an utterance session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Synthesis finished; remaining audio drains from the device queue.
    Completed,
    /// Stopped, preempted by a newer `Play`, or shut down.
    Cancelled,
    /// Dictionary processing left no speakable text; nothing was submitted.
    Filtered,
    /// The engine failed.
    Failed(String),
}

// ---------------------------------------------------------------------------
// PlayerHandle
// ---------------------------------------------------------------------------

/// Cloneable sender side of the orchestrator's command channel.
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
}

impl PlayerHandle {
    /// Speak `request` and wait for the session to end.
    ///
    /// Resolves as [`SessionOutcome::Cancelled`] if the orchestrator shuts
    /// down mid-session.
    pub async fn play(&self, request: UtteranceRequest) -> SessionOutcome {
        let (done_tx, done_rx) = oneshot::channel();
        let cmd = PlayerCommand::Play {
            request,
            done: done_tx,
        };
        if self.tx.send(cmd).await.is_err() {
            return SessionOutcome::Failed("playback actor is not running".into());
        }
        done_rx.await.unwrap_or(SessionOutcome::Cancelled)
    }

    pub async fn pause(&self) {
        let _ = self.tx.send(PlayerCommand::Pause).await;
    }

    pub async fn resume(&self) {
        let _ = self.tx.send(PlayerCommand::Resume).await;
    }

    pub async fn stop(&self) {
        let _ = self.tx.send(PlayerCommand::Stop).await;
    }

    pub async fn toggle_pause(&self) {
        let _ = self.tx.send(PlayerCommand::TogglePause).await;
    }

    pub async fn set_speed(&self, speed: f32) {
        let _ = self.tx.send(PlayerCommand::SetSpeed(speed)).await;
    }
}

// ---------------------------------------------------------------------------
// PlaybackOrchestrator
// ---------------------------------------------------------------------------

/// The actor state.  Construct with [`PlaybackOrchestrator::new`], then
/// either [`spawn`](Self::spawn) it or drive [`run`](Self::run) directly.
pub struct PlaybackOrchestrator {
    engine: Arc<dyn SpeechEngine>,
    sink: Arc<dyn AudioSink>,
    transformer: Arc<DictionaryTransformer>,
    status: SharedStatus,
    /// Speed applied to requests that do not pin their own.
    speed: f32,
}

/// A `Play` that preempted the current session and must start next.
type PendingPlay = (UtteranceRequest, oneshot::Sender<SessionOutcome>);

impl PlaybackOrchestrator {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        sink: Arc<dyn AudioSink>,
        transformer: Arc<DictionaryTransformer>,
        status: SharedStatus,
        initial_speed: f32,
    ) -> Self {
        Self {
            engine,
            sink,
            transformer,
            status,
            speed: initial_speed.clamp(MIN_SPEED, MAX_SPEED),
        }
    }

    /// Spawn the actor on the current runtime.
    pub fn spawn(self) -> (PlayerHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(self.run(rx));
        (PlayerHandle { tx }, task)
    }

    /// The actor loop.  Returns when the command channel closes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<PlayerCommand>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                PlayerCommand::Play { request, done } => {
                    // Preempting Plays chain: each session may end by handing
                    // over to the request that displaced it.
                    let mut next = Some((request, done));
                    while let Some((request, done)) = next.take() {
                        next = self.run_session(request, done, &mut rx).await;
                    }
                }
                PlayerCommand::SetSpeed(speed) => self.set_speed(speed),
                PlayerCommand::Stop => {
                    log::debug!("stop requested while idle, ignoring");
                }
                PlayerCommand::Pause | PlayerCommand::Resume | PlayerCommand::TogglePause => {
                    log::debug!("pause/resume requested while idle, ignoring");
                }
            }
        }
        log::info!("playback orchestrator shutting down");
    }

    /// Drive one utterance session to its terminal outcome.
    ///
    /// Returns the `Play` that preempted this session, if any, so the caller
    /// can start it without re-entering the idle loop.
    async fn run_session(
        &mut self,
        request: UtteranceRequest,
        done: oneshot::Sender<SessionOutcome>,
        rx: &mut mpsc::Receiver<PlayerCommand>,
    ) -> Option<PendingPlay> {
        let text = self.transformer.process_text(&request.text);
        if text.trim().is_empty() {
            log::info!("dictionary processing left no speakable text, skipping");
            let _ = done.send(SessionOutcome::Filtered);
            return None;
        }

        let speed = request.speed.unwrap_or(self.speed);
        let (sample_tx, mut sample_rx) = mpsc::channel::<Vec<f32>>(SAMPLE_CHANNEL_CAPACITY);
        let job = UtteranceJob {
            text: text.clone(),
            voice: request.voice.clone(),
            speed,
            sample_tx,
        };

        log::info!(
            "speaking {} chars with voice {} at speed {speed:.1}",
            text.chars().count(),
            request.voice
        );
        {
            let mut status = self.status.lock().unwrap();
            status.error_message = None;
            status.last_text = text.clone();
        }

        let mut handle = match self.engine.submit(job).await {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("synthesis submit failed: {e}");
                self.status.lock().unwrap().error_message = Some(e.to_string());
                self.set_state(PlaybackState::Idle);
                let _ = done.send(SessionOutcome::Failed(e.to_string()));
                return None;
            }
        };
        self.set_state(PlaybackState::Generating);

        let mut samples_done = false;
        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(PlayerCommand::Play { request, done: next_done }) => {
                            log::info!("new utterance preempts the active session");
                            self.cancel_session(&handle, done);
                            return Some((request, next_done));
                        }
                        Some(PlayerCommand::Stop) | None => {
                            self.cancel_session(&handle, done);
                            return None;
                        }
                        Some(PlayerCommand::Pause) => self.pause_playback(),
                        Some(PlayerCommand::Resume) => self.resume_playback(),
                        Some(PlayerCommand::TogglePause) => {
                            match self.state() {
                                PlaybackState::Playing => self.pause_playback(),
                                PlaybackState::Paused => self.resume_playback(),
                                _ => log::debug!("pause toggle outside playing/paused, ignoring"),
                            }
                        }
                        Some(PlayerCommand::SetSpeed(speed)) => self.set_speed(speed),
                    }
                }
                chunk = sample_rx.recv(), if !samples_done => {
                    match chunk {
                        Some(samples) => {
                            if self.state() == PlaybackState::Generating {
                                self.set_state(PlaybackState::Playing);
                            }
                            self.sink.push(&samples);
                        }
                        None => samples_done = true,
                    }
                }
                outcome = &mut handle.outcome => {
                    // The engine may resolve right after its last chunk;
                    // flush whatever is still queued before finishing.
                    while let Ok(samples) = sample_rx.try_recv() {
                        self.sink.push(&samples);
                    }
                    let outcome = match outcome {
                        Ok(result) => result,
                        Err(_) => Err(EngineError::Disconnected),
                    };
                    self.finish_session(outcome, done);
                    return None;
                }
            }
        }
    }

    /// Cancel the active job, flush buffered audio, and resolve the session.
    fn cancel_session(&mut self, handle: &JobHandle, done: oneshot::Sender<SessionOutcome>) {
        handle.cancel();
        self.sink.clear();
        self.sink.resume();
        self.set_state(PlaybackState::Idle);
        let _ = done.send(SessionOutcome::Cancelled);
    }

    /// Resolve a session that ended on the engine's side.
    fn finish_session(
        &mut self,
        outcome: Result<JobOutcome, EngineError>,
        done: oneshot::Sender<SessionOutcome>,
    ) {
        let session_outcome = match outcome {
            Ok(JobOutcome::Completed) => SessionOutcome::Completed,
            Ok(JobOutcome::Cancelled) => {
                self.sink.clear();
                SessionOutcome::Cancelled
            }
            Err(e) => {
                log::error!("synthesis failed: {e}");
                self.sink.clear();
                self.status.lock().unwrap().error_message = Some(e.to_string());
                SessionOutcome::Failed(e.to_string())
            }
        };
        self.sink.resume();
        self.set_state(PlaybackState::Idle);
        let _ = done.send(session_outcome);
    }

    fn pause_playback(&mut self) {
        if self.state() != PlaybackState::Playing {
            log::debug!("pause outside playing state, ignoring");
            return;
        }
        self.engine.pause();
        self.sink.pause();
        self.set_state(PlaybackState::Paused);
    }

    fn resume_playback(&mut self) {
        if self.state() != PlaybackState::Paused {
            log::debug!("resume outside paused state, ignoring");
            return;
        }
        self.engine.resume();
        self.sink.resume();
        self.set_state(PlaybackState::Playing);
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.status.lock().unwrap().speed = self.speed;
        log::info!("playback speed set to {:.1}", self.speed);
    }

    fn state(&self) -> PlaybackState {
        self.status.lock().unwrap().state
    }

    fn set_state(&self, state: PlaybackState) {
        let mut status = self.status.lock().unwrap();
        if status.state != state {
            log::debug!("playback state: {} -> {}", status.state.label(), state.label());
            status.state = state;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::RuleSet;
    use crate::engine::MockEngine;
    use crate::player::state::new_shared_status;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Sink that records what the orchestrator does to it.
    #[derive(Default)]
    struct RecordingSink {
        samples: Mutex<Vec<f32>>,
        paused: AtomicBool,
        clears: AtomicUsize,
    }

    impl AudioSink for RecordingSink {
        fn push(&self, samples: &[f32]) {
            self.samples.lock().unwrap().extend_from_slice(samples);
        }
        fn pause(&self) {
            self.paused.store(true, Ordering::Relaxed);
        }
        fn resume(&self) {
            self.paused.store(false, Ordering::Relaxed);
        }
        fn clear(&self) {
            self.samples.lock().unwrap().clear();
            self.clears.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn transformer() -> Arc<DictionaryTransformer> {
        Arc::new(DictionaryTransformer::from_rules(RuleSet::empty()))
    }

    fn spawn_player(engine: MockEngine) -> (PlayerHandle, Arc<RecordingSink>, SharedStatus) {
        let sink = Arc::new(RecordingSink::default());
        let status = new_shared_status(true, "Preset 1".into(), 1.0);
        let orchestrator = PlaybackOrchestrator::new(
            Arc::new(engine),
            sink.clone(),
            transformer(),
            status.clone(),
            1.0,
        );
        let (handle, _task) = orchestrator.spawn();
        (handle, sink, status)
    }

    fn request(text: &str) -> UtteranceRequest {
        UtteranceRequest::new(text, "af_heart")
    }

    #[tokio::test]
    async fn utterance_streams_to_the_sink_and_completes() {
        let (player, sink, status) = spawn_player(MockEngine::streaming(3));

        let outcome = player.play(request("hello world")).await;
        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(sink.samples.lock().unwrap().len(), 3 * 256);

        let status = status.lock().unwrap();
        assert_eq!(status.state, PlaybackState::Idle);
        assert_eq!(status.last_text, "hello world");
        assert!(status.error_message.is_none());
    }

    #[tokio::test]
    async fn new_play_preempts_the_active_session() {
        let mut engine = MockEngine::streaming(50);
        engine.chunk_delay = Duration::from_millis(10);
        let (player, sink, _status) = spawn_player(engine);

        let first = {
            let player = player.clone();
            tokio::spawn(async move { player.play(request("first utterance")).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        let second = player.play(request("second utterance")).await;

        assert_eq!(first.await.unwrap(), SessionOutcome::Cancelled);
        assert_eq!(second, SessionOutcome::Completed);
        // Preemption flushed the first utterance's buffered audio.
        assert!(sink.clears.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn stop_cancels_and_returns_to_idle() {
        let mut engine = MockEngine::streaming(50);
        engine.chunk_delay = Duration::from_millis(10);
        let (player, sink, status) = spawn_player(engine);

        let session = {
            let player = player.clone();
            tokio::spawn(async move { player.play(request("a long utterance")).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        player.stop().await;

        assert_eq!(session.await.unwrap(), SessionOutcome::Cancelled);
        assert_eq!(status.lock().unwrap().state, PlaybackState::Idle);
        assert!(sink.clears.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn pause_and_resume_gate_the_sink() {
        let mut engine = MockEngine::streaming(100);
        engine.chunk_delay = Duration::from_millis(5);
        let (player, sink, status) = spawn_player(engine);

        let session = {
            let player = player.clone();
            tokio::spawn(async move { player.play(request("pausable")).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        player.pause().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sink.paused.load(Ordering::Relaxed));
        assert_eq!(status.lock().unwrap().state, PlaybackState::Paused);

        player.resume().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sink.paused.load(Ordering::Relaxed));
        assert_eq!(status.lock().unwrap().state, PlaybackState::Playing);

        session.abort();
    }

    #[tokio::test]
    async fn filtered_text_never_reaches_the_engine() {
        let rules = RuleSet {
            ignore: vec!["skip me".into()],
            ..RuleSet::empty()
        };
        let sink = Arc::new(RecordingSink::default());
        let status = new_shared_status(true, "Preset 1".into(), 1.0);
        let orchestrator = PlaybackOrchestrator::new(
            Arc::new(MockEngine::streaming(3)),
            sink.clone(),
            Arc::new(DictionaryTransformer::from_rules(rules)),
            status.clone(),
            1.0,
        );
        let (player, _task) = orchestrator.spawn();

        let outcome = player.play(request("skip me")).await;
        assert_eq!(outcome, SessionOutcome::Filtered);
        assert!(sink.samples.lock().unwrap().is_empty());
        assert_eq!(status.lock().unwrap().state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn engine_failure_surfaces_in_the_status() {
        let engine = MockEngine::failing(EngineError::Synthesis("model exploded".into()));
        let (player, _sink, status) = spawn_player(engine);

        let outcome = player.play(request("doomed")).await;
        assert!(matches!(outcome, SessionOutcome::Failed(_)));

        let status = status.lock().unwrap();
        assert_eq!(status.state, PlaybackState::Idle);
        assert!(status.error_message.as_deref().unwrap().contains("model exploded"));
    }

    #[tokio::test]
    async fn stop_while_idle_is_a_no_op() {
        let (player, sink, status) = spawn_player(MockEngine::streaming(1));
        player.stop().await;
        player.pause().await;

        // Still fully functional afterwards.
        let outcome = player.play(request("after no-ops")).await;
        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(status.lock().unwrap().state, PlaybackState::Idle);
        assert!(!sink.samples.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_speed_is_clamped_and_applies_to_future_plays() {
        let (player, _sink, status) = spawn_player(MockEngine::streaming(1));

        player.set_speed(99.0).await;
        player.play(request("sync point")).await;
        assert_eq!(status.lock().unwrap().speed, MAX_SPEED);

        player.set_speed(0.0).await;
        player.play(request("sync point")).await;
        assert_eq!(status.lock().unwrap().speed, MIN_SPEED);
    }
}
