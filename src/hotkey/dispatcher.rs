//! Maps fired hotkey ids to [`Command`]s and keeps registrations in sync
//! with the settings.
//!
//! On every hotkey settings change the dispatcher unregisters everything it
//! previously registered and re-registers the now-enabled bindings under
//! fresh ids.  Ids from a previous generation that are still in flight when
//! the table is rebuilt are simply unknown and get dropped with a log line.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::{SettingKey, SettingsHandle};

use super::{bindings_from_config, Command, HotkeyBackend, HotkeyBinding, HotkeyId};

// ---------------------------------------------------------------------------
// HotkeyDispatcher
// ---------------------------------------------------------------------------

/// Owns the id-to-command table for the current binding generation.
pub struct HotkeyDispatcher {
    backend: Arc<dyn HotkeyBackend>,
    table: HashMap<HotkeyId, Command>,
}

impl HotkeyDispatcher {
    pub fn new(backend: Arc<dyn HotkeyBackend>) -> Self {
        Self {
            backend,
            table: HashMap::new(),
        }
    }

    /// Replace all registrations with `bindings`.
    ///
    /// A binding the backend rejects is logged and skipped; the remaining
    /// bindings still register.
    pub fn apply_bindings(&mut self, bindings: &[HotkeyBinding]) {
        for id in self.table.keys() {
            self.backend.unregister(*id);
        }
        self.table.clear();

        for binding in bindings {
            match self.backend.register(binding.modifier, binding.key) {
                Ok(id) => {
                    self.table.insert(id, binding.command);
                }
                Err(e) => {
                    log::warn!(
                        "could not register hotkey for {}: {e}",
                        binding.command.label()
                    );
                }
            }
        }
        log::info!("registered {} hotkey binding(s)", self.table.len());
    }

    /// Command for a fired id, if it belongs to the current generation.
    pub fn resolve(&self, id: HotkeyId) -> Option<Command> {
        self.table.get(&id).copied()
    }

    /// Number of live registrations.
    pub fn registered_count(&self) -> usize {
        self.table.len()
    }

    /// Run the dispatch loop: registers the current bindings, then forwards
    /// fired hotkeys as [`Command`]s on `cmd_tx` and re-applies bindings on
    /// every hotkey settings change.
    ///
    /// Returns when `id_rx` closes or `cmd_tx` is dropped.
    pub async fn run(
        mut self,
        mut id_rx: mpsc::Receiver<HotkeyId>,
        settings: SettingsHandle,
        cmd_tx: mpsc::Sender<Command>,
    ) {
        let mut changes = settings.subscribe();
        self.apply_bindings(&bindings_from_config(&settings.snapshot()));

        loop {
            tokio::select! {
                fired = id_rx.recv() => {
                    let Some(id) = fired else { break };
                    match self.resolve(id) {
                        Some(command) => {
                            log::debug!("hotkey fired: {}", command.label());
                            if cmd_tx.send(command).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            log::debug!("ignoring hotkey id {id} from a stale binding generation");
                        }
                    }
                }
                changed = changes.recv() => {
                    match changed {
                        Ok(SettingKey::Hotkeys) => {
                            self.apply_bindings(&bindings_from_config(&settings.snapshot()));
                        }
                        Ok(_) => {}
                        // Missed notifications may have included a hotkey
                        // change, so re-sync with the current settings.
                        Err(broadcast::error::RecvError::Lagged(_)) => {
                            self.apply_bindings(&bindings_from_config(&settings.snapshot()));
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        log::info!("hotkey dispatcher shutting down");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::hotkey::{HotkeyError, Modifier};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory backend that records registrations and can reject keys.
    struct FakeBackend {
        next_id: AtomicU32,
        live: Mutex<HashMap<HotkeyId, (Modifier, rdev::Key)>>,
        reject_key: Option<rdev::Key>,
    }

    impl FakeBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                next_id: AtomicU32::new(1),
                live: Mutex::new(HashMap::new()),
                reject_key: None,
            })
        }

        fn rejecting(key: rdev::Key) -> Arc<Self> {
            Arc::new(Self {
                next_id: AtomicU32::new(1),
                live: Mutex::new(HashMap::new()),
                reject_key: Some(key),
            })
        }

        fn live_ids(&self) -> Vec<HotkeyId> {
            let mut ids: Vec<_> = self.live.lock().unwrap().keys().copied().collect();
            ids.sort_unstable();
            ids
        }
    }

    impl HotkeyBackend for FakeBackend {
        fn register(&self, modifier: Modifier, key: rdev::Key) -> Result<HotkeyId, HotkeyError> {
            if self.reject_key == Some(key) {
                return Err(HotkeyError::Register("combination unavailable".into()));
            }
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.live.lock().unwrap().insert(id, (modifier, key));
            Ok(id)
        }

        fn unregister(&self, id: HotkeyId) {
            self.live.lock().unwrap().remove(&id);
        }
    }

    fn binding(command: Command, key: rdev::Key) -> HotkeyBinding {
        HotkeyBinding {
            command,
            modifier: Modifier::None,
            key,
        }
    }

    #[test]
    fn apply_bindings_registers_and_maps_commands() {
        let backend = FakeBackend::new();
        let mut dispatcher = HotkeyDispatcher::new(backend.clone());

        dispatcher.apply_bindings(&[
            binding(Command::StopSpeech, rdev::Key::F10),
            binding(Command::ToggleMonitoring, rdev::Key::F11),
        ]);

        assert_eq!(dispatcher.registered_count(), 2);
        let ids = backend.live_ids();
        assert_eq!(ids.len(), 2);
        let commands: Vec<_> = ids.iter().filter_map(|&id| dispatcher.resolve(id)).collect();
        assert!(commands.contains(&Command::StopSpeech));
        assert!(commands.contains(&Command::ToggleMonitoring));
    }

    #[test]
    fn reapplying_replaces_the_previous_generation() {
        let backend = FakeBackend::new();
        let mut dispatcher = HotkeyDispatcher::new(backend.clone());

        dispatcher.apply_bindings(&[binding(Command::StopSpeech, rdev::Key::F10)]);
        let old_id = backend.live_ids()[0];

        dispatcher.apply_bindings(&[binding(Command::TogglePauseResume, rdev::Key::F12)]);

        // Old id unregistered and no longer resolvable, new one live.
        assert_eq!(dispatcher.resolve(old_id), None);
        assert_eq!(backend.live_ids().len(), 1);
        assert_ne!(backend.live_ids()[0], old_id);
        assert_eq!(dispatcher.registered_count(), 1);
    }

    #[test]
    fn rejected_binding_is_skipped_but_others_register() {
        let backend = FakeBackend::rejecting(rdev::Key::F10);
        let mut dispatcher = HotkeyDispatcher::new(backend.clone());

        dispatcher.apply_bindings(&[
            binding(Command::StopSpeech, rdev::Key::F10),
            binding(Command::IncreaseSpeed, rdev::Key::F11),
        ]);

        assert_eq!(dispatcher.registered_count(), 1);
        let id = backend.live_ids()[0];
        assert_eq!(dispatcher.resolve(id), Some(Command::IncreaseSpeed));
    }

    #[tokio::test]
    async fn run_forwards_fired_ids_as_commands() {
        let backend = FakeBackend::new();

        let mut cfg = AppConfig::default();
        cfg.hotkeys[2].enabled = true;
        cfg.hotkeys[2].modifier = "None".into();
        cfg.hotkeys[2].key = "F10".into();
        let settings = SettingsHandle::in_memory(cfg);

        let dispatcher = HotkeyDispatcher::new(backend.clone());
        let (id_tx, id_rx) = mpsc::channel(16);
        let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
        let task = tokio::spawn(dispatcher.run(id_rx, settings, cmd_tx));

        // Wait for the initial registration, then fire it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let id = backend.live_ids()[0];
        id_tx.send(id).await.unwrap();

        let command = tokio::time::timeout(Duration::from_millis(500), cmd_rx.recv())
            .await
            .expect("command in time")
            .expect("channel open");
        assert_eq!(command, Command::StopSpeech);

        // Unknown ids are dropped, not forwarded.
        id_tx.send(9999).await.unwrap();
        let quiet = tokio::time::timeout(Duration::from_millis(100), cmd_rx.recv()).await;
        assert!(quiet.is_err());
        task.abort();
    }

    #[tokio::test]
    async fn run_reapplies_bindings_on_settings_change() {
        let backend = FakeBackend::new();
        let settings = SettingsHandle::in_memory(AppConfig::default());

        let dispatcher = HotkeyDispatcher::new(backend.clone());
        let (_id_tx, id_rx) = mpsc::channel(16);
        let (cmd_tx, _cmd_rx) = mpsc::channel(16);
        let task = tokio::spawn(dispatcher.run(id_rx, settings.clone(), cmd_tx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(backend.live_ids().is_empty());

        settings.update(&[SettingKey::Hotkeys], |cfg| {
            cfg.hotkeys[1].enabled = true;
            cfg.hotkeys[1].modifier = "Ctrl".into();
            cfg.hotkeys[1].key = "m".into();
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.live_ids().len(), 1);
        task.abort();
    }
}
