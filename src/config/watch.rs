//! Shared settings handle with per-key change notification.
//!
//! [`SettingsHandle`] replaces ambient/global settings access: every
//! component receives a clone at construction and subscribes to changes it
//! cares about.  Mutations go through [`update`](SettingsHandle::update),
//! which persists the file (best-effort, errors logged) and broadcasts the
//! changed [`SettingKey`]s over a `tokio::sync::broadcast` channel.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use super::settings::{AppConfig, MAX_SPEED, MIN_SPEED};

// ---------------------------------------------------------------------------
// SettingKey
// ---------------------------------------------------------------------------

/// Names the setting (group) that changed, for subscribers that only care
/// about part of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Voice,
    Speed,
    MonitorClipboard,
    TextLengthBounds,
    Presets,
    CurrentPreset,
    Hotkeys,
    Menu,
}

// ---------------------------------------------------------------------------
// SettingsHandle
// ---------------------------------------------------------------------------

/// Thread-safe, clonable handle to the live [`AppConfig`].
///
/// Cheap to clone (two `Arc`s).  Readers take a snapshot; writers mutate
/// under the lock, save, and notify.
#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<AppConfig>>,
    tx: broadcast::Sender<SettingKey>,
    /// Where mutations are persisted; `None` keeps everything in memory
    /// (tests).
    save_path: Option<Arc<std::path::PathBuf>>,
}

impl SettingsHandle {
    /// Wrap a loaded configuration, persisting mutations to `save_path`.
    pub fn new(config: AppConfig, save_path: std::path::PathBuf) -> Self {
        let (tx, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(RwLock::new(config)),
            tx,
            save_path: Some(Arc::new(save_path)),
        }
    }

    /// Wrap a configuration without persistence (tests).
    pub fn in_memory(config: AppConfig) -> Self {
        let (tx, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(RwLock::new(config)),
            tx,
            save_path: None,
        }
    }

    /// Clone of the current configuration.
    pub fn snapshot(&self) -> AppConfig {
        self.inner.read().unwrap().clone()
    }

    /// Subscribe to change notifications.  Receivers that lag simply miss
    /// intermediate keys and should re-read the snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<SettingKey> {
        self.tx.subscribe()
    }

    /// Mutate the configuration, persist it, and broadcast `keys`.
    ///
    /// Persistence failure is logged and never propagated — a read-only
    /// filesystem must not take the running app down.
    pub fn update(&self, keys: &[SettingKey], f: impl FnOnce(&mut AppConfig)) {
        {
            let mut cfg = self.inner.write().unwrap();
            f(&mut cfg);
            if let Some(path) = &self.save_path {
                if let Err(e) = cfg.save_to(path) {
                    log::error!("failed to save settings: {e}");
                }
            }
        }
        for &key in keys {
            // Send fails only when there are no subscribers — fine.
            let _ = self.tx.send(key);
        }
    }

    // ── Convenience mutations ────────────────────────────────────────────

    /// Set the clipboard-monitoring flag.
    pub fn set_monitoring(&self, enabled: bool) {
        self.update(&[SettingKey::MonitorClipboard], |cfg| {
            cfg.clipboard.monitor = enabled;
        });
    }

    /// Adjust the speed by `delta`, clamped to `[MIN_SPEED, MAX_SPEED]`.
    /// Returns the new speed.
    pub fn adjust_speed(&self, delta: f32) -> f32 {
        let mut new_speed = 0.0;
        self.update(&[SettingKey::Speed], |cfg| {
            cfg.speed = (cfg.speed + delta).clamp(MIN_SPEED, MAX_SPEED);
            new_speed = cfg.speed;
        });
        log::info!("speed adjusted to {new_speed:.1}x");
        new_speed
    }

    /// Select preset `slot`: copies its voice/speed into the active settings
    /// and records it as the current preset.  No-op for a disabled slot.
    pub fn apply_preset(&self, slot: usize) {
        self.update(
            &[SettingKey::Voice, SettingKey::Speed, SettingKey::CurrentPreset],
            |cfg| {
                let Some(preset) = cfg.presets.get(slot) else {
                    return;
                };
                if !preset.enabled {
                    return;
                }
                let preset = preset.clone();
                cfg.voice = preset.voice.clone();
                cfg.speed = preset.speed.clamp(MIN_SPEED, MAX_SPEED);
                cfg.current_preset = preset.name.clone();
                log::info!(
                    "switched to preset {:?} (voice {}, speed {:.1}x)",
                    preset.name,
                    preset.voice,
                    preset.speed
                );
            },
        );
    }

    /// Cycle to the next enabled preset.  No-op when fewer than two presets
    /// are enabled.  Returns the applied slot, if any.
    pub fn switch_to_next_preset(&self) -> Option<usize> {
        let cfg = self.snapshot();
        let enabled = cfg.enabled_presets();
        if enabled.len() < 2 {
            return None;
        }

        let current = cfg.current_preset_index();
        let pos = current
            .and_then(|idx| enabled.iter().position(|&e| e == idx))
            .unwrap_or(enabled.len() - 1);
        let next = enabled[(pos + 1) % enabled.len()];

        self.apply_preset(next);
        Some(next)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
