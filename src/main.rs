//! Application entry point — ClipVoice.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults on first run) and wrap it in a
//!    [`SettingsHandle`].
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Load dictionary rules and build the speech engine and audio sink.
//! 5. Spawn the playback orchestrator, clipboard watcher, candidate
//!    handler, hotkey dispatcher, and command handler.
//! 6. Run [`eframe::run_native`] — blocks the main thread until the widget
//!    is closed.

use std::sync::Arc;

use clipvoice::{
    app::ClipVoiceApp,
    audio::{AudioSink, CpalSink, NullSink},
    clipboard::{ArboardSource, CandidateText, ClipboardWatcher},
    config::{AppConfig, AppPaths, SettingsHandle},
    dict::DictionaryTransformer,
    engine::{NullEngine, SpeechEngine, UtteranceRequest},
    hotkey::{Command, HotkeyDispatcher, RdevBackend},
    player::{new_shared_status, PlaybackOrchestrator, PlayerHandle, SharedStatus},
};
use eframe::egui;
use tokio::sync::{mpsc, watch};

/// Speed delta applied by the increase/decrease hotkeys.
const SPEED_STEP: f32 = 0.1;

// ---------------------------------------------------------------------------
// Candidate handler
// ---------------------------------------------------------------------------

/// Turns filtered clipboard candidates into playback sessions, one at a
/// time.
///
/// `player.play` resolves only when the session ends, and the candidate
/// channel has capacity 1, so the clipboard watcher stays paused while an
/// utterance is being handled.
async fn run_candidates(
    mut candidate_rx: mpsc::Receiver<CandidateText>,
    player: PlayerHandle,
    settings: SettingsHandle,
) {
    while let Some(candidate) = candidate_rx.recv().await {
        let voice = settings.snapshot().voice;
        let outcome = player
            .play(UtteranceRequest::new(candidate.text, voice))
            .await;
        log::debug!("clipboard utterance finished: {outcome:?}");
    }
}

// ---------------------------------------------------------------------------
// Command handler
// ---------------------------------------------------------------------------

/// Applies control commands from hotkeys and the widget.
///
/// Playback commands forward to the orchestrator; settings commands mutate
/// the [`SettingsHandle`] (which persists and notifies) and mirror the
/// visible fields into the shared status.
async fn run_commands(
    mut cmd_rx: mpsc::Receiver<Command>,
    player: PlayerHandle,
    settings: SettingsHandle,
    monitor_tx: watch::Sender<bool>,
    status: SharedStatus,
) {
    while let Some(command) = cmd_rx.recv().await {
        log::info!("command: {}", command.label());
        match command {
            Command::SwitchPreset => {
                if settings.switch_to_next_preset().is_some() {
                    let cfg = settings.snapshot();
                    {
                        let mut status = status.lock().unwrap();
                        status.current_preset = cfg.current_preset.clone();
                        status.speed = cfg.speed;
                    }
                    player.set_speed(cfg.speed).await;
                    log::info!("switched to preset {:?}", cfg.current_preset);
                }
            }
            Command::ToggleMonitoring => {
                let enabled = !settings.snapshot().clipboard.monitor;
                settings.set_monitoring(enabled);
                status.lock().unwrap().monitoring = enabled;
                let _ = monitor_tx.send(enabled);
                log::info!(
                    "clipboard monitoring {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            Command::StopSpeech => player.stop().await,
            Command::TogglePauseResume => player.toggle_pause().await,
            Command::IncreaseSpeed => {
                player.set_speed(settings.adjust_speed(SPEED_STEP)).await;
            }
            Command::DecreaseSpeed => {
                player.set_speed(settings.adjust_speed(-SPEED_STEP)).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options() -> eframe::NativeOptions {
    let vp = egui::ViewportBuilder::default()
        .with_decorations(false)
        .with_transparent(true)
        .with_always_on_top()
        .with_inner_size([300.0, 110.0])
        .with_min_inner_size([250.0, 90.0])
        .with_resizable(false);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("ClipVoice starting up");

    // 2. Configuration
    let paths = AppPaths::new();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load settings ({e}); using defaults");
        AppConfig::default()
    });
    let settings = SettingsHandle::new(config.clone(), paths.settings_file.clone());

    // 3. Tokio runtime (2 workers — synthesis and the control loops)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");
    let _guard = rt.enter();

    // 4. Dictionary rules (created on first run), engine, audio sink
    let transformer = Arc::new(DictionaryTransformer::new(paths.dict_dir.clone()));

    // NullEngine reports the missing model on every submit so the app still
    // launches and the widget can show the error.
    let engine: Arc<dyn SpeechEngine> =
        Arc::new(NullEngine::new(paths.model_file.display().to_string()));
    if !paths.model_file.exists() {
        log::warn!(
            "speech model not found at {}; playback will report an error",
            paths.model_file.display()
        );
    }

    let sink: Arc<dyn AudioSink> = match CpalSink::new(engine.sample_rate()) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            log::warn!("audio output unavailable ({e}); discarding audio");
            Arc::new(NullSink)
        }
    };

    // 5. Background tasks
    let status = new_shared_status(
        config.clipboard.monitor,
        config.current_preset.clone(),
        config.speed,
    );

    let orchestrator = PlaybackOrchestrator::new(
        engine,
        sink,
        Arc::clone(&transformer),
        status.clone(),
        config.speed,
    );
    let (player, _player_task) = orchestrator.spawn();

    let (monitor_tx, monitor_rx) = watch::channel(config.clipboard.monitor);
    let (candidate_tx, candidate_rx) = mpsc::channel::<CandidateText>(1);
    let watcher = ClipboardWatcher::new(Arc::new(ArboardSource), settings.clone(), monitor_rx);
    rt.spawn(watcher.run(candidate_tx));
    rt.spawn(run_candidates(candidate_rx, player.clone(), settings.clone()));

    let (id_tx, id_rx) = mpsc::channel(16);
    let backend = Arc::new(RdevBackend::start(id_tx));
    let dispatcher = HotkeyDispatcher::new(backend);
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(16);
    rt.spawn(dispatcher.run(id_rx, settings.clone(), cmd_tx.clone()));

    rt.spawn(run_commands(
        cmd_rx,
        player,
        settings.clone(),
        monitor_tx,
        status.clone(),
    ));

    // 6. Run the widget (blocks until the window is closed)
    let app = ClipVoiceApp::new(status, cmd_tx, settings);
    eframe::run_native(
        "ClipVoice",
        native_options(),
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
