//! OS-level hotkey registration backed by a dedicated `rdev::listen` thread.
//!
//! `rdev` delivers raw key events with no built-in modifier or combination
//! tracking, so [`RdevBackend`] keeps its own picture of which modifier keys
//! are currently held and matches every key press against the registered
//! combinations.  Matching registrations fire by id over a tokio channel;
//! if the same combination is registered twice, both ids fire.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Dropping the backend
//! sets a stop flag so the callback discards further events, but the OS
//! thread remains blocked in the rdev event loop until the process exits.
//! rdev holds no resources that need explicit cleanup, so this is safe.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc, Mutex,
};

use thiserror::Error;
use tokio::sync::mpsc;

use super::Modifier;

// ---------------------------------------------------------------------------
// HotkeyId / HotkeyError
// ---------------------------------------------------------------------------

/// Opaque id for one registered combination.  Never reused within a process.
pub type HotkeyId = u32;

/// Errors from hotkey registration.
#[derive(Debug, Clone, Error)]
pub enum HotkeyError {
    /// The backend refused the combination.
    #[error("hotkey registration failed: {0}")]
    Register(String),
}

// ---------------------------------------------------------------------------
// HotkeyBackend
// ---------------------------------------------------------------------------

/// Registration surface of a global-hotkey backend.
///
/// Abstracted so the dispatcher can be tested against a fake backend without
/// an OS event loop.
pub trait HotkeyBackend: Send + Sync {
    /// Register a combination.  The returned id will be sent on the backend's
    /// event channel each time the combination fires.
    fn register(&self, modifier: Modifier, key: rdev::Key) -> Result<HotkeyId, HotkeyError>;

    /// Remove a registration.  Unknown ids are ignored.
    fn unregister(&self, id: HotkeyId);
}

// ---------------------------------------------------------------------------
// ModifierState
// ---------------------------------------------------------------------------

/// Which modifier keys are currently held, maintained from raw press/release
/// events.
#[derive(Debug, Default, Clone, Copy)]
struct ModifierState {
    alt: bool,
    ctrl: bool,
    shift: bool,
    win: bool,
}

impl ModifierState {
    /// Update from a modifier key transition.  Returns `false` if the key is
    /// not a modifier.
    fn apply(&mut self, key: rdev::Key, pressed: bool) -> bool {
        match key {
            rdev::Key::Alt | rdev::Key::AltGr => self.alt = pressed,
            rdev::Key::ControlLeft | rdev::Key::ControlRight => self.ctrl = pressed,
            rdev::Key::ShiftLeft | rdev::Key::ShiftRight => self.shift = pressed,
            rdev::Key::MetaLeft | rdev::Key::MetaRight => self.win = pressed,
            _ => return false,
        }
        true
    }

    /// Whether the held modifiers satisfy a binding's requirement.
    ///
    /// `Modifier::None` requires that *no* modifier is held, so a bare-key
    /// binding does not also fire for Ctrl/Alt combinations of that key.
    fn satisfies(&self, required: Modifier) -> bool {
        match required {
            Modifier::None => !self.alt && !self.ctrl && !self.shift && !self.win,
            Modifier::Alt => self.alt,
            Modifier::Ctrl => self.ctrl,
            Modifier::Shift => self.shift,
            Modifier::Win => self.win,
        }
    }
}

// ---------------------------------------------------------------------------
// RdevBackend
// ---------------------------------------------------------------------------

/// Production hotkey backend.
///
/// [`RdevBackend::start`] spawns the listener thread; registrations can be
/// added and removed at any time afterwards.  Fired ids arrive on the
/// channel given to `start`.
pub struct RdevBackend {
    registrations: Arc<Mutex<HashMap<HotkeyId, (Modifier, rdev::Key)>>>,
    next_id: AtomicU32,
    /// Shared stop flag, set on [`Drop`].
    stop: Arc<AtomicBool>,
    /// Kept so the thread is not detached prematurely; never joined because
    /// `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl RdevBackend {
    /// Spawn the dedicated OS listener thread.
    ///
    /// The thread uses `blocking_send` on `tx`, which is correct from a
    /// non-async context; a full channel briefly blocks the OS callback.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread.
    pub fn start(tx: mpsc::Sender<HotkeyId>) -> Self {
        let registrations: Arc<Mutex<HashMap<HotkeyId, (Modifier, rdev::Key)>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let regs = Arc::clone(&registrations);
        let stop_flag = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("hotkey-backend".into())
            .spawn(move || {
                let mut held = ModifierState::default();
                let result = rdev::listen(move |event| {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    match event.event_type {
                        rdev::EventType::KeyPress(key) => {
                            if held.apply(key, true) {
                                return;
                            }
                            let regs = regs.lock().unwrap();
                            for (&id, &(modifier, bound_key)) in regs.iter() {
                                if bound_key == key && held.satisfies(modifier) {
                                    let _ = tx.blocking_send(id);
                                }
                            }
                        }
                        rdev::EventType::KeyRelease(key) => {
                            held.apply(key, false);
                        }
                        _ => {}
                    }
                });
                if let Err(e) = result {
                    log::error!("hotkey-backend: rdev::listen exited with error: {:?}", e);
                }
            })
            .expect("failed to spawn hotkey-backend thread");

        Self {
            registrations,
            next_id: AtomicU32::new(1),
            stop,
            _thread: thread,
        }
    }
}

impl HotkeyBackend for RdevBackend {
    fn register(&self, modifier: Modifier, key: rdev::Key) -> Result<HotkeyId, HotkeyError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registrations
            .lock()
            .unwrap()
            .insert(id, (modifier, key));
        Ok(id)
    }

    fn unregister(&self, id: HotkeyId) {
        self.registrations.lock().unwrap().remove(&id);
    }
}

impl Drop for RdevBackend {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The OS thread stays blocked inside rdev::listen until process exit.
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
