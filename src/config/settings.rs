//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Number of preset slots.
pub const PRESET_SLOTS: usize = 4;
/// Number of hotkey slots; the slot index fixes the bound command.
pub const HOTKEY_SLOTS: usize = 6;

/// Lower bound of the playback speed multiplier.
pub const MIN_SPEED: f32 = 0.5;
/// Upper bound of the playback speed multiplier.
pub const MAX_SPEED: f32 = 3.0;

// ---------------------------------------------------------------------------
// ClipboardConfig
// ---------------------------------------------------------------------------

/// Settings for the clipboard polling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Whether clipboard monitoring starts enabled.
    pub monitor: bool,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Clipboard text shorter than this (in chars) is ignored.
    pub min_text_length: usize,
    /// Clipboard text longer than this (in chars) is ignored.
    pub max_text_length: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            monitor: true,
            poll_interval_ms: 500,
            min_text_length: 1,
            max_text_length: 5_000,
        }
    }
}

// ---------------------------------------------------------------------------
// PresetConfig
// ---------------------------------------------------------------------------

/// A named (voice, speed) pair the user can switch to as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetConfig {
    /// Display name shown in the preset menu.
    pub name: String,
    /// Voice id applied when the preset is selected.
    pub voice: String,
    /// Speed multiplier applied when the preset is selected.
    pub speed: f32,
    /// Disabled presets are hidden and skipped when cycling.
    pub enabled: bool,
}

impl PresetConfig {
    fn slot_default(slot: usize) -> Self {
        Self {
            name: format!("Preset {}", slot + 1),
            voice: "af_heart".into(),
            speed: 1.0,
            // Only the first preset is enabled out of the box.
            enabled: slot == 0,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeySlot
// ---------------------------------------------------------------------------

/// One configurable global hotkey.
///
/// The slot index determines the command (0 = switch preset, 1 = toggle
/// monitoring, 2 = stop speech, 3 = pause/resume, 4 = speed up,
/// 5 = speed down).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotkeySlot {
    /// Modifier name: `""`/`"none"`, `"alt"`, `"ctrl"`, `"shift"`, `"win"`.
    pub modifier: String,
    /// Key name (e.g. `"F9"`, `"S"`); empty = unbound.
    pub key: String,
    /// Disabled slots are never registered.
    pub enabled: bool,
}

impl Default for HotkeySlot {
    fn default() -> Self {
        Self {
            modifier: String::new(),
            key: String::new(),
            enabled: false,
        }
    }
}

// ---------------------------------------------------------------------------
// MenuConfig
// ---------------------------------------------------------------------------

/// Visibility flags for the control-widget actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Show the monitoring on/off toggle.
    pub show_monitoring: bool,
    /// Show the Stop Speech action.
    pub show_stop_speech: bool,
    /// Show the Pause | Resume action.
    pub show_pause_resume: bool,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            show_monitoring: true,
            show_stop_speech: true,
            show_pause_resume: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use clipvoice::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Active voice id.
    pub voice: String,
    /// Active speed multiplier.
    pub speed: f32,
    /// Name of the currently selected preset.
    pub current_preset: String,
    /// Clipboard polling settings.
    pub clipboard: ClipboardConfig,
    /// Preset slots ([`PRESET_SLOTS`] entries).
    pub presets: Vec<PresetConfig>,
    /// Hotkey slots ([`HOTKEY_SLOTS`] entries).
    pub hotkeys: Vec<HotkeySlot>,
    /// Control-widget visibility flags.
    pub menu: MenuConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            voice: "af_heart".into(),
            speed: 1.0,
            current_preset: "Preset 1".into(),
            clipboard: ClipboardConfig::default(),
            presets: (0..PRESET_SLOTS).map(PresetConfig::slot_default).collect(),
            hotkeys: vec![HotkeySlot::default(); HOTKEY_SLOTS],
            menu: MenuConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.normalize();
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Pad missing preset/hotkey slots and clamp the speed so hand-edited
    /// files cannot put the app in an out-of-range state.
    fn normalize(&mut self) {
        while self.presets.len() < PRESET_SLOTS {
            self.presets.push(PresetConfig::slot_default(self.presets.len()));
        }
        self.presets.truncate(PRESET_SLOTS);
        self.hotkeys.resize(HOTKEY_SLOTS, HotkeySlot::default());
        self.speed = self.speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    // ── Preset queries ───────────────────────────────────────────────────

    /// Indices of enabled presets, in slot order.
    pub fn enabled_presets(&self) -> Vec<usize> {
        self.presets
            .iter()
            .enumerate()
            .filter(|(_, p)| p.enabled)
            .map(|(i, _)| i)
            .collect()
    }

    /// Slot index of the preset whose name matches `current_preset`.
    pub fn current_preset_index(&self) -> Option<usize> {
        self.presets.iter().position(|p| p.name == self.current_preset)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
