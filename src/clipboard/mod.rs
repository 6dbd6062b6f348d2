//! Clipboard monitoring: fixed-interval polling with change and length
//! filtering.
//!
//! # Design
//!
//! [`ClipboardWatcher::run`] is a single tokio task — one logical thread of
//! polling.  Each tick reads the clipboard (on the blocking pool; platform
//! clipboard APIs can stall) and, when the text is new and within the
//! configured length bounds, sends a [`CandidateText`] downstream.
//!
//! The candidate channel should be created with **capacity 1**: `send`
//! awaits while the previous candidate is still being handled, which
//! suppresses further ticks until handling finishes (pause-while-handling).
//! The watcher never writes to the clipboard, and read failures are logged
//! and swallowed — the loop continues on the next tick.
//!
//! Monitoring is enabled/disabled through a `watch::Receiver<bool>`;
//! disabling lets an in-flight candidate finish but schedules no further
//! ticks.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::config::SettingsHandle;

// ---------------------------------------------------------------------------
// ClipboardError
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`ClipboardSource`].  All are transient from the
/// watcher's point of view.
#[derive(Debug, Clone, Error)]
pub enum ClipboardError {
    /// The OS clipboard could not be opened.
    #[error("clipboard access failed: {0}")]
    Access(String),

    /// The clipboard content could not be read.
    #[error("clipboard read failed: {0}")]
    Read(String),
}

// ---------------------------------------------------------------------------
// ClipboardSource
// ---------------------------------------------------------------------------

/// Read-only view of the system clipboard.
///
/// Abstracted so the watcher can be driven by a scripted source in tests.
pub trait ClipboardSource: Send + Sync {
    /// Current plain-text clipboard content, `None` when empty or non-text
    /// (e.g. an image).
    fn read_text(&self) -> Result<Option<String>, ClipboardError>;
}

/// Production source backed by `arboard`.
///
/// A short-lived [`arboard::Clipboard`] handle is created per read rather
/// than shared across calls, because the handle is not `Send` on all
/// platforms and is cheap to create.
#[derive(Debug, Default)]
pub struct ArboardSource;

impl ClipboardSource for ArboardSource {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;
        // `get_text` errors when empty or non-text — treat both as None
        Ok(clipboard.get_text().ok())
    }
}

// ---------------------------------------------------------------------------
// CandidateText
// ---------------------------------------------------------------------------

/// Clipboard content that passed change/length filtering and is offered to
/// the playback layer.
#[derive(Debug, Clone)]
pub struct CandidateText {
    /// Trimmed clipboard text.
    pub text: String,
    /// When the change was detected.
    pub captured_at: Instant,
}

// ---------------------------------------------------------------------------
// ClipboardWatcher
// ---------------------------------------------------------------------------

/// Polls the clipboard and emits [`CandidateText`] events.
pub struct ClipboardWatcher {
    source: Arc<dyn ClipboardSource>,
    settings: SettingsHandle,
    enabled: watch::Receiver<bool>,
    last_seen: String,
}

impl ClipboardWatcher {
    /// Create a watcher.
    ///
    /// The current clipboard content is recorded as already-seen so that
    /// whatever the user copied before launch is not spoken at startup.
    pub fn new(
        source: Arc<dyn ClipboardSource>,
        settings: SettingsHandle,
        enabled: watch::Receiver<bool>,
    ) -> Self {
        let last_seen = match source.read_text() {
            Ok(Some(text)) => {
                let text = text.trim().to_owned();
                log::info!("recorded initial clipboard content ({} chars)", text.len());
                text
            }
            Ok(None) => String::new(),
            Err(e) => {
                log::warn!("could not read initial clipboard content: {e}");
                String::new()
            }
        };

        Self {
            source,
            settings,
            enabled,
            last_seen,
        }
    }

    /// Run the polling loop until `candidate_tx` is closed or the enabled
    /// sender is dropped.
    pub async fn run(mut self, candidate_tx: mpsc::Sender<CandidateText>) {
        let poll_ms = self.settings.snapshot().clipboard.poll_interval_ms.max(50);
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(poll_ms));
        // A delayed tick must not cause a burst of catch-up reads.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if !*self.enabled.borrow() {
                // Parked until monitoring is re-enabled.
                if self.enabled.changed().await.is_err() {
                    break;
                }
                continue;
            }

            interval.tick().await;
            if !*self.enabled.borrow() {
                continue;
            }

            let Some(candidate) = self.poll_once().await else {
                continue;
            };

            // Capacity-1 channel: awaits while the previous candidate is
            // still being handled, pausing the poll loop.
            if candidate_tx.send(candidate).await.is_err() {
                break;
            }
        }

        log::info!("clipboard watcher shutting down");
    }

    /// One tick: read, filter, and update `last_seen`.
    async fn poll_once(&mut self) -> Option<CandidateText> {
        let source = Arc::clone(&self.source);
        let read = tokio::task::spawn_blocking(move || source.read_text()).await;

        let text = match read {
            Ok(Ok(Some(text))) => text,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                log::debug!("clipboard read failed (will retry next tick): {e}");
                return None;
            }
            Err(e) => {
                log::warn!("clipboard read task panicked: {e}");
                return None;
            }
        };

        let text = text.trim();
        if text.is_empty() || text == self.last_seen {
            return None;
        }

        let (min_len, max_len) = {
            let cfg = self.settings.snapshot();
            (cfg.clipboard.min_text_length, cfg.clipboard.max_text_length)
        };
        let len = text.chars().count();
        if len < min_len || len > max_len {
            log::debug!("ignoring clipboard text outside length bounds ({len} chars)");
            return None;
        }

        log::info!("new text detected in clipboard ({len} chars)");
        self.last_seen = text.to_owned();
        Some(CandidateText {
            text: text.to_owned(),
            captured_at: Instant::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted clipboard: each read pops the next entry, repeating the
    /// last one forever.
    struct ScriptedSource {
        reads: Mutex<VecDeque<Result<Option<String>, ClipboardError>>>,
    }

    impl ScriptedSource {
        fn new(reads: Vec<Result<Option<String>, ClipboardError>>) -> Arc<Self> {
            Arc::new(Self {
                reads: Mutex::new(reads.into()),
            })
        }
    }

    impl ClipboardSource for ScriptedSource {
        fn read_text(&self) -> Result<Option<String>, ClipboardError> {
            let mut reads = self.reads.lock().unwrap();
            if reads.len() > 1 {
                reads.pop_front().unwrap()
            } else {
                reads.front().cloned().unwrap_or(Ok(None))
            }
        }
    }

    fn fast_settings() -> SettingsHandle {
        let mut cfg = AppConfig::default();
        cfg.clipboard.poll_interval_ms = 50;
        SettingsHandle::in_memory(cfg)
    }

    async fn first_candidate(
        source: Arc<dyn ClipboardSource>,
        settings: SettingsHandle,
    ) -> Option<CandidateText> {
        let (_enabled_tx, enabled_rx) = watch::channel(true);
        let watcher = ClipboardWatcher::new(source, settings, enabled_rx);
        let (tx, mut rx) = mpsc::channel(1);

        let task = tokio::spawn(watcher.run(tx));
        let result = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        task.abort();
        result.ok().flatten()
    }

    #[tokio::test]
    async fn emits_candidate_on_new_text() {
        // First read primes last_seen; the second is the change.
        let source = ScriptedSource::new(vec![
            Ok(Some("old".into())),
            Ok(Some("fresh clipboard text".into())),
        ]);
        let candidate = first_candidate(source, fast_settings()).await;
        assert_eq!(candidate.unwrap().text, "fresh clipboard text");
    }

    #[tokio::test]
    async fn unchanged_text_is_not_emitted() {
        let source = ScriptedSource::new(vec![Ok(Some("same".into()))]);
        assert!(first_candidate(source, fast_settings()).await.is_none());
    }

    #[tokio::test]
    async fn text_below_minimum_length_is_filtered() {
        let settings = fast_settings();
        settings.update(&[], |cfg| cfg.clipboard.min_text_length = 10);

        let source = ScriptedSource::new(vec![Ok(None), Ok(Some("short".into()))]);
        assert!(first_candidate(source, settings).await.is_none());
    }

    #[tokio::test]
    async fn text_above_maximum_length_is_filtered() {
        let settings = fast_settings();
        settings.update(&[], |cfg| cfg.clipboard.max_text_length = 4);

        let source = ScriptedSource::new(vec![Ok(None), Ok(Some("way too long".into()))]);
        assert!(first_candidate(source, settings).await.is_none());
    }

    #[tokio::test]
    async fn read_errors_are_swallowed_and_polling_continues() {
        let source = ScriptedSource::new(vec![
            Ok(None),
            Err(ClipboardError::Access("denied".into())),
            Ok(Some("recovered".into())),
        ]);
        let candidate = first_candidate(source, fast_settings()).await;
        assert_eq!(candidate.unwrap().text, "recovered");
    }

    #[tokio::test]
    async fn disabled_watcher_emits_nothing_until_enabled() {
        let source = ScriptedSource::new(vec![Ok(None), Ok(Some("while disabled".into()))]);
        let (enabled_tx, enabled_rx) = watch::channel(false);
        let watcher = ClipboardWatcher::new(source, fast_settings(), enabled_rx);
        let (tx, mut rx) = mpsc::channel(1);
        let task = tokio::spawn(watcher.run(tx));

        // Nothing arrives while disabled.
        let quiet = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(quiet.is_err());

        // Enabling releases the loop and the pending change is picked up.
        enabled_tx.send(true).unwrap();
        let candidate = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("candidate after enable")
            .expect("channel open");
        assert_eq!(candidate.text, "while disabled");
        task.abort();
    }

    #[tokio::test]
    async fn candidate_text_is_trimmed() {
        let source = ScriptedSource::new(vec![Ok(None), Ok(Some("  padded  \n".into()))]);
        let candidate = first_candidate(source, fast_settings()).await;
        assert_eq!(candidate.unwrap().text, "padded");
    }
}
