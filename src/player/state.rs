//! Playback state machine and UI-visible status snapshot.
//!
//! State transitions, driven entirely by the orchestrator:
//!
//! ```text
//!                play (text passes filtering)
//!        Idle ───────────────────────────────▶ Generating
//!          ▲                                       │
//!          │ stop / complete / fail                │ first samples arrive
//!          │                                       ▼
//!          └──────────────────────────────────  Playing ◀──────┐
//!          ▲                                       │           │ resume
//!          │ stop / complete / fail                │ pause     │
//!          └──────────────────────────────────  Paused ────────┘
//! ```
//!
//! A new `play` while in any active state first cancels the running session
//! (which lands back in `Idle`) and then starts the new one.

use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// Where the orchestrator currently is in an utterance's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No utterance in flight.
    #[default]
    Idle,
    /// Synthesis submitted, no audio delivered yet.
    Generating,
    /// Audio flowing to the output device.
    Playing,
    /// An utterance is in flight but the output is held.
    Paused,
}

impl PlaybackState {
    /// Whether an utterance is in flight (anything but [`PlaybackState::Idle`]).
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Short label for logs and the status widget.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerStatus
// ---------------------------------------------------------------------------

/// Snapshot of the playback layer for the UI.
///
/// Written by the orchestrator (and the command handler for the settings
/// fields), read by the egui widget each frame.
#[derive(Debug, Clone, Default)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    /// Text of the most recent utterance, post-transformation.
    pub last_text: String,
    /// Most recent playback error, cleared when a new utterance starts.
    pub error_message: Option<String>,
    /// Whether clipboard monitoring is on.
    pub monitoring: bool,
    /// Name of the active voice preset.
    pub current_preset: String,
    /// Current playback speed multiplier.
    pub speed: f32,
}

/// Shared handle to a [`PlayerStatus`].
///
/// A plain `std::sync::Mutex` rather than tokio's: every critical section is
/// a short field read or write, and the UI thread is not async.
pub type SharedStatus = Arc<Mutex<PlayerStatus>>;

/// Fresh shared status seeded from the current settings values.
pub fn new_shared_status(monitoring: bool, current_preset: String, speed: f32) -> SharedStatus {
    Arc::new(Mutex::new(PlayerStatus {
        monitoring,
        current_preset,
        speed,
        ..PlayerStatus::default()
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_is_the_only_inactive_state() {
        assert!(!PlaybackState::Idle.is_active());
        assert!(PlaybackState::Generating.is_active());
        assert!(PlaybackState::Playing.is_active());
        assert!(PlaybackState::Paused.is_active());
    }

    #[test]
    fn shared_status_carries_seed_values() {
        let status = new_shared_status(true, "Preset 1".into(), 1.5);
        let snapshot = status.lock().unwrap();
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert!(snapshot.monitoring);
        assert_eq!(snapshot.current_preset, "Preset 1");
        assert_eq!(snapshot.speed, 1.5);
        assert!(snapshot.error_message.is_none());
    }
}
