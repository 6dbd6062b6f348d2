//! Configuration module for clipvoice.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and `SettingsHandle` for shared
//! access with per-key change notification.

pub mod paths;
pub mod settings;
pub mod watch;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, ClipboardConfig, HotkeySlot, MenuConfig, PresetConfig, HOTKEY_SLOTS, MAX_SPEED,
    MIN_SPEED, PRESET_SLOTS,
};
pub use watch::{SettingKey, SettingsHandle};
