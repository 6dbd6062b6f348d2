//! Global hotkeys: parsing, registration and dispatch, backed by `rdev`.
//!
//! # Design
//!
//! Bindings live in the settings file as modifier/key string pairs, one per
//! slot, where the slot index determines the triggered [`Command`].  The
//! [`backend`] module owns the OS-level listener thread; the [`dispatcher`]
//! module keeps the registered-id-to-command table and re-applies bindings
//! whenever the hotkey settings change.
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive, so it runs on a dedicated OS thread and forwards fired
//! registration ids over a `tokio::sync::mpsc` channel via `blocking_send`.

pub mod backend;
pub mod dispatcher;

pub use backend::{HotkeyBackend, HotkeyError, HotkeyId, RdevBackend};
pub use dispatcher::HotkeyDispatcher;

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Control actions a hotkey (or the UI) can trigger.
///
/// Hotkey slots map to commands by position, so the order here is part of
/// the settings-file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Cycle to the next enabled voice preset.
    SwitchPreset,
    /// Toggle clipboard monitoring on/off.
    ToggleMonitoring,
    /// Stop the current utterance.
    StopSpeech,
    /// Pause playback, or resume if already paused.
    TogglePauseResume,
    /// Raise playback speed by one step.
    IncreaseSpeed,
    /// Lower playback speed by one step.
    DecreaseSpeed,
}

impl Command {
    /// Command assigned to a hotkey slot, `None` for out-of-range slots.
    pub fn from_slot(slot: usize) -> Option<Self> {
        match slot {
            0 => Some(Self::SwitchPreset),
            1 => Some(Self::ToggleMonitoring),
            2 => Some(Self::StopSpeech),
            3 => Some(Self::TogglePauseResume),
            4 => Some(Self::IncreaseSpeed),
            5 => Some(Self::DecreaseSpeed),
            _ => None,
        }
    }

    /// Human-readable name for logs and the settings UI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SwitchPreset => "switch preset",
            Self::ToggleMonitoring => "toggle monitoring",
            Self::StopSpeech => "stop speech",
            Self::TogglePauseResume => "pause/resume",
            Self::IncreaseSpeed => "increase speed",
            Self::DecreaseSpeed => "decrease speed",
        }
    }
}

// ---------------------------------------------------------------------------
// Modifier
// ---------------------------------------------------------------------------

/// Modifier required alongside the main key.
///
/// [`Modifier::None`] matches only when no modifier is held, so a bare key
/// binding does not also swallow Ctrl/Alt combinations of that key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    None,
    Alt,
    Ctrl,
    Shift,
    Win,
}

/// Parse a modifier name from a config string.
///
/// Returns `None` for unrecognised names so callers can skip the binding and
/// report it, rather than silently registering the wrong combination.
pub fn parse_modifier(modifier_str: &str) -> Option<Modifier> {
    match modifier_str.trim() {
        "" | "None" | "none" => Some(Modifier::None),
        "Alt" | "alt" => Some(Modifier::Alt),
        "Ctrl" | "ctrl" | "Control" => Some(Modifier::Ctrl),
        "Shift" | "shift" => Some(Modifier::Shift),
        "Win" | "win" | "Super" | "Meta" => Some(Modifier::Win),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a hotkey name from a config string into an [`rdev::Key`].
///
/// Supports F1–F12, digits, common named keys, and single ASCII letters in
/// either case.  Returns `None` for unrecognised names.
///
/// # Examples
///
/// ```
/// use clipvoice::hotkey::parse_key;
///
/// assert_eq!(parse_key("F9"),     Some(rdev::Key::F9));
/// assert_eq!(parse_key("Escape"), Some(rdev::Key::Escape));
/// assert_eq!(parse_key("a"),      Some(rdev::Key::KeyA));
/// assert_eq!(parse_key("xyz"),    None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    match key_str.trim() {
        // Function keys
        "F1" => Some(rdev::Key::F1),
        "F2" => Some(rdev::Key::F2),
        "F3" => Some(rdev::Key::F3),
        "F4" => Some(rdev::Key::F4),
        "F5" => Some(rdev::Key::F5),
        "F6" => Some(rdev::Key::F6),
        "F7" => Some(rdev::Key::F7),
        "F8" => Some(rdev::Key::F8),
        "F9" => Some(rdev::Key::F9),
        "F10" => Some(rdev::Key::F10),
        "F11" => Some(rdev::Key::F11),
        "F12" => Some(rdev::Key::F12),

        // Navigation / control
        "Escape" | "Esc" => Some(rdev::Key::Escape),
        "Space" => Some(rdev::Key::Space),
        "Return" | "Enter" => Some(rdev::Key::Return),
        "Tab" => Some(rdev::Key::Tab),
        "Backspace" => Some(rdev::Key::Backspace),
        "Delete" | "Del" => Some(rdev::Key::Delete),
        "Home" => Some(rdev::Key::Home),
        "End" => Some(rdev::Key::End),
        "PageUp" => Some(rdev::Key::PageUp),
        "PageDown" => Some(rdev::Key::PageDown),
        "UpArrow" | "Up" => Some(rdev::Key::UpArrow),
        "DownArrow" | "Down" => Some(rdev::Key::DownArrow),
        "LeftArrow" | "Left" => Some(rdev::Key::LeftArrow),
        "RightArrow" | "Right" => Some(rdev::Key::RightArrow),

        // Digit row
        "0" => Some(rdev::Key::Num0),
        "1" => Some(rdev::Key::Num1),
        "2" => Some(rdev::Key::Num2),
        "3" => Some(rdev::Key::Num3),
        "4" => Some(rdev::Key::Num4),
        "5" => Some(rdev::Key::Num5),
        "6" => Some(rdev::Key::Num6),
        "7" => Some(rdev::Key::Num7),
        "8" => Some(rdev::Key::Num8),
        "9" => Some(rdev::Key::Num9),

        // Letter keys (case-insensitive)
        "A" | "a" => Some(rdev::Key::KeyA),
        "B" | "b" => Some(rdev::Key::KeyB),
        "C" | "c" => Some(rdev::Key::KeyC),
        "D" | "d" => Some(rdev::Key::KeyD),
        "E" | "e" => Some(rdev::Key::KeyE),
        "F" | "f" => Some(rdev::Key::KeyF),
        "G" | "g" => Some(rdev::Key::KeyG),
        "H" | "h" => Some(rdev::Key::KeyH),
        "I" | "i" => Some(rdev::Key::KeyI),
        "J" | "j" => Some(rdev::Key::KeyJ),
        "K" | "k" => Some(rdev::Key::KeyK),
        "L" | "l" => Some(rdev::Key::KeyL),
        "M" | "m" => Some(rdev::Key::KeyM),
        "N" | "n" => Some(rdev::Key::KeyN),
        "O" | "o" => Some(rdev::Key::KeyO),
        "P" | "p" => Some(rdev::Key::KeyP),
        "Q" | "q" => Some(rdev::Key::KeyQ),
        "R" | "r" => Some(rdev::Key::KeyR),
        "S" | "s" => Some(rdev::Key::KeyS),
        "T" | "t" => Some(rdev::Key::KeyT),
        "U" | "u" => Some(rdev::Key::KeyU),
        "V" | "v" => Some(rdev::Key::KeyV),
        "W" | "w" => Some(rdev::Key::KeyW),
        "X" | "x" => Some(rdev::Key::KeyX),
        "Y" | "y" => Some(rdev::Key::KeyY),
        "Z" | "z" => Some(rdev::Key::KeyZ),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// HotkeyBinding
// ---------------------------------------------------------------------------

/// A fully parsed, enabled hotkey binding ready for registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub command: Command,
    pub modifier: Modifier,
    pub key: rdev::Key,
}

/// Extract the enabled, parseable bindings from the current settings.
///
/// Disabled slots are skipped silently; enabled slots with unparseable
/// modifier or key strings are skipped with a warning.
pub fn bindings_from_config(cfg: &AppConfig) -> Vec<HotkeyBinding> {
    let mut bindings = Vec::new();
    for (slot, entry) in cfg.hotkeys.iter().enumerate() {
        if !entry.enabled {
            continue;
        }
        let Some(command) = Command::from_slot(slot) else {
            continue;
        };
        let Some(modifier) = parse_modifier(&entry.modifier) else {
            log::warn!(
                "hotkey slot {slot} ({}): unknown modifier {:?}, skipping",
                command.label(),
                entry.modifier
            );
            continue;
        };
        let Some(key) = parse_key(&entry.key) else {
            log::warn!(
                "hotkey slot {slot} ({}): unknown key {:?}, skipping",
                command.label(),
                entry.key
            );
            continue;
        };
        bindings.push(HotkeyBinding {
            command,
            modifier,
            key,
        });
    }
    bindings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_map_to_commands_in_order() {
        assert_eq!(Command::from_slot(0), Some(Command::SwitchPreset));
        assert_eq!(Command::from_slot(1), Some(Command::ToggleMonitoring));
        assert_eq!(Command::from_slot(2), Some(Command::StopSpeech));
        assert_eq!(Command::from_slot(3), Some(Command::TogglePauseResume));
        assert_eq!(Command::from_slot(4), Some(Command::IncreaseSpeed));
        assert_eq!(Command::from_slot(5), Some(Command::DecreaseSpeed));
        assert_eq!(Command::from_slot(6), None);
    }

    #[test]
    fn parse_modifier_names() {
        assert_eq!(parse_modifier("None"), Some(Modifier::None));
        assert_eq!(parse_modifier(""), Some(Modifier::None));
        assert_eq!(parse_modifier("Ctrl"), Some(Modifier::Ctrl));
        assert_eq!(parse_modifier("Control"), Some(Modifier::Ctrl));
        assert_eq!(parse_modifier("Win"), Some(Modifier::Win));
        assert_eq!(parse_modifier("Hyper"), None);
    }

    #[test]
    fn parse_function_and_named_keys() {
        assert_eq!(parse_key("F9"), Some(rdev::Key::F9));
        assert_eq!(parse_key("Escape"), Some(rdev::Key::Escape));
        assert_eq!(parse_key("Esc"), Some(rdev::Key::Escape));
        assert_eq!(parse_key("5"), Some(rdev::Key::Num5));
    }

    #[test]
    fn parse_letter_keys_case_insensitive() {
        assert_eq!(parse_key("A"), Some(rdev::Key::KeyA));
        assert_eq!(parse_key("a"), Some(rdev::Key::KeyA));
        assert_eq!(parse_key("z"), Some(rdev::Key::KeyZ));
    }

    #[test]
    fn parse_unknown_key_returns_none() {
        assert_eq!(parse_key("xyz"), None);
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+V"), None);
    }

    #[test]
    fn bindings_skip_disabled_and_unparseable_slots() {
        let mut cfg = AppConfig::default();
        cfg.hotkeys[2].enabled = true;
        cfg.hotkeys[2].modifier = "Ctrl".into();
        cfg.hotkeys[2].key = "F10".into();
        cfg.hotkeys[4].enabled = true;
        cfg.hotkeys[4].modifier = "Hyper".into(); // unparseable
        cfg.hotkeys[4].key = "F11".into();

        let bindings = bindings_from_config(&cfg);
        assert_eq!(
            bindings,
            vec![HotkeyBinding {
                command: Command::StopSpeech,
                modifier: Modifier::Ctrl,
                key: rdev::Key::F10,
            }]
        );
    }
}
