//! Playback layer: the state machine, shared status, and the orchestrator
//! actor that serializes every utterance through one task.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{PlaybackOrchestrator, PlayerCommand, PlayerHandle, SessionOutcome};
pub use state::{new_shared_status, PlaybackState, PlayerStatus, SharedStatus};
