//! ClipVoice floating control widget — egui/eframe application.
//!
//! # Architecture
//!
//! [`ClipVoiceApp`] is the top-level [`eframe::App`].  It renders a compact,
//! always-on-top, borderless floating widget and owns two endpoints:
//!
//! * `status` — shared [`PlayerStatus`] snapshot written by the playback
//!   layer and the command handler, read here each frame.
//! * `command_tx` — sends [`Command`]s into the same channel the hotkeys
//!   use, so a button click and a hotkey press take the identical path.
//!
//! The widget never mutates playback state directly; it only observes the
//! status and emits commands.
//!
//! # Widget states
//!
//! | Playback state | Visual |
//! |----------------|--------|
//! | `Idle`         | "copy text to speak" hint — dim gray |
//! | `Generating`   | Spinner + "generating..." — blue |
//! | `Playing`      | Current text — green |
//! | `Paused`       | Current text — yellow, "paused" badge |

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::SettingsHandle;
use crate::hotkey::Command;
use crate::player::{PlaybackState, PlayerStatus, SharedStatus};

/// Longest prefix of the spoken text shown in the widget.
const TEXT_PREVIEW_CHARS: usize = 90;

// ---------------------------------------------------------------------------
// ClipVoiceApp
// ---------------------------------------------------------------------------

/// eframe application — the floating playback control widget.
pub struct ClipVoiceApp {
    /// Playback status snapshot, shared with the orchestrator.
    status: SharedStatus,
    /// Control commands, merged with the hotkey stream downstream.
    command_tx: mpsc::Sender<Command>,
    /// Live settings, for preset names and menu visibility flags.
    settings: SettingsHandle,

    /// Whether the settings panel is expanded.
    show_settings: bool,
    /// Spinner animation phase (increases each frame).
    spinner_phase: f32,
}

impl ClipVoiceApp {
    pub fn new(
        status: SharedStatus,
        command_tx: mpsc::Sender<Command>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            status,
            command_tx,
            settings,
            show_settings: false,
            spinner_phase: 0.0,
        }
    }

    /// Fire a control command without blocking the UI thread.  A full
    /// channel drops the click, which is fine for tap-style commands.
    fn send(&self, command: Command) {
        if self.command_tx.try_send(command).is_err() {
            log::warn!("command channel full or closed, dropping {}", command.label());
        }
    }

    // ── Custom title bar ─────────────────────────────────────────────────

    /// Draggable title bar with status icon, title, and window controls.
    fn draw_title_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, status: &PlayerStatus) {
        ui.horizontal(|ui| {
            let icon = match status.state {
                PlaybackState::Idle => "  ",
                PlaybackState::Generating => "~ ",
                PlaybackState::Playing => "> ",
                PlaybackState::Paused => "||",
            };
            ui.label(egui::RichText::new(icon).color(state_color(status.state)));

            let title_resp = ui.label(
                egui::RichText::new("ClipVoice")
                    .color(egui::Color32::from_rgb(200, 200, 200))
                    .size(13.0),
            );
            if title_resp.is_pointer_button_down_on() {
                if let Some(outer_rect) = ctx.input(|i| i.viewport().outer_rect) {
                    let delta = ctx.input(|i| i.pointer.delta());
                    ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(
                        outer_rect.min + delta,
                    ));
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(
                        egui::Button::new(
                            egui::RichText::new("x")
                                .color(egui::Color32::from_rgb(200, 100, 100))
                                .size(12.0),
                        )
                        .frame(false),
                    )
                    .clicked()
                {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                if ui
                    .add(
                        egui::Button::new(
                            egui::RichText::new("-")
                                .color(egui::Color32::from_rgb(150, 150, 150))
                                .size(12.0),
                        )
                        .frame(false),
                    )
                    .clicked()
                {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
                }
                if ui
                    .add(
                        egui::Button::new(
                            egui::RichText::new("=")
                                .color(egui::Color32::from_rgb(150, 150, 150))
                                .size(12.0),
                        )
                        .frame(false),
                    )
                    .clicked()
                {
                    self.show_settings = !self.show_settings;
                }
            });
        });
    }

    // ── Main panel ───────────────────────────────────────────────────────

    /// Central status area: current text or an idle hint, plus any error.
    fn draw_status(&self, ui: &mut egui::Ui, status: &PlayerStatus) {
        ui.add_space(4.0);

        match status.state {
            PlaybackState::Idle => {
                let hint = if status.monitoring {
                    "copy text to speak"
                } else {
                    "monitoring off"
                };
                ui.label(
                    egui::RichText::new(hint)
                        .color(egui::Color32::from_rgb(120, 120, 120))
                        .size(12.0),
                );
            }
            PlaybackState::Generating => {
                ui.label(
                    egui::RichText::new(format!("{} generating...", self.spinner_char()))
                        .color(egui::Color32::from_rgb(68, 136, 255))
                        .size(12.0),
                );
            }
            PlaybackState::Playing | PlaybackState::Paused => {
                ui.label(
                    egui::RichText::new(preview(&status.last_text))
                        .color(state_color(status.state))
                        .size(12.0),
                );
            }
        }

        if let Some(ref message) = status.error_message {
            ui.add_space(2.0);
            ui.label(
                egui::RichText::new(message.as_str())
                    .color(egui::Color32::from_rgb(255, 136, 68))
                    .size(11.0),
            );
        }
    }

    /// Control row: monitoring toggle, stop, pause/resume, preset, speed.
    ///
    /// The menu visibility flags in the settings decide which controls
    /// appear; the speed and preset controls are always shown.
    fn draw_controls(&mut self, ui: &mut egui::Ui, status: &PlayerStatus) {
        let menu = self.settings.snapshot().menu;

        ui.horizontal(|ui| {
            if menu.show_monitoring {
                let mut monitoring = status.monitoring;
                if ui.checkbox(&mut monitoring, "monitor").clicked() {
                    self.send(Command::ToggleMonitoring);
                }
            }

            if menu.show_stop_speech
                && ui
                    .add_enabled(
                        status.state.is_active(),
                        egui::Button::new(egui::RichText::new("stop").size(11.0)),
                    )
                    .clicked()
            {
                self.send(Command::StopSpeech);
            }

            if menu.show_pause_resume {
                let label = if status.state == PlaybackState::Paused {
                    "resume"
                } else {
                    "pause"
                };
                if ui
                    .add_enabled(
                        status.state.is_active(),
                        egui::Button::new(egui::RichText::new(label).size(11.0)),
                    )
                    .clicked()
                {
                    self.send(Command::TogglePauseResume);
                }
            }
        });

        ui.horizontal(|ui| {
            if ui
                .add(egui::Button::new(
                    egui::RichText::new(status.current_preset.as_str()).size(11.0),
                ))
                .clicked()
            {
                self.send(Command::SwitchPreset);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(egui::Button::new(egui::RichText::new("+").size(11.0)))
                    .clicked()
                {
                    self.send(Command::IncreaseSpeed);
                }
                ui.label(
                    egui::RichText::new(format!("{:.1}x", status.speed))
                        .color(egui::Color32::from_rgb(160, 160, 160))
                        .size(11.0),
                );
                if ui
                    .add(egui::Button::new(egui::RichText::new("-").size(11.0)))
                    .clicked()
                {
                    self.send(Command::DecreaseSpeed);
                }
            });
        });
    }

    /// Settings panel: voice presets and hotkey assignments, read-only.
    fn draw_settings(&self, ui: &mut egui::Ui) {
        let cfg = self.settings.snapshot();

        ui.add_space(4.0);
        ui.label(
            egui::RichText::new("presets:")
                .color(egui::Color32::from_rgb(180, 180, 180))
                .size(12.0),
        );
        for preset in &cfg.presets {
            let marker = if preset.name == cfg.current_preset {
                ">"
            } else if preset.enabled {
                " "
            } else {
                "-"
            };
            ui.label(
                egui::RichText::new(format!(
                    "{marker} {} ({}, {:.1}x)",
                    preset.name, preset.voice, preset.speed
                ))
                .color(egui::Color32::from_rgb(140, 140, 140))
                .size(11.0),
            );
        }

        ui.add_space(2.0);
        ui.label(
            egui::RichText::new("hotkeys:")
                .color(egui::Color32::from_rgb(180, 180, 180))
                .size(12.0),
        );
        for (slot, entry) in cfg.hotkeys.iter().enumerate() {
            if !entry.enabled {
                continue;
            }
            let Some(command) = Command::from_slot(slot) else {
                continue;
            };
            let combo = if entry.modifier.is_empty() || entry.modifier.eq_ignore_ascii_case("none")
            {
                entry.key.clone()
            } else {
                format!("{}+{}", entry.modifier, entry.key)
            };
            ui.label(
                egui::RichText::new(format!("  {combo}: {}", command.label()))
                    .color(egui::Color32::from_rgb(140, 140, 140))
                    .size(11.0),
            );
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    /// A simple rotating ASCII spinner character driven by `spinner_phase`.
    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }
}

/// Accent colour for a playback state.
fn state_color(state: PlaybackState) -> egui::Color32 {
    match state {
        PlaybackState::Idle => egui::Color32::from_rgb(100, 100, 100),
        PlaybackState::Generating => egui::Color32::from_rgb(68, 136, 255),
        PlaybackState::Playing => egui::Color32::from_rgb(80, 200, 120),
        PlaybackState::Paused => egui::Color32::from_rgb(230, 200, 80),
    }
}

/// Char-boundary-safe preview of the spoken text.
fn preview(text: &str) -> String {
    if text.chars().count() <= TEXT_PREVIEW_CHARS {
        return text.to_owned();
    }
    let truncated: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
    format!("{truncated}...")
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for ClipVoiceApp {
    /// Called every frame by eframe.  Reads the shared status, advances the
    /// spinner, then renders the widget.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let status = self.status.lock().unwrap().clone();

        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // Animated states repaint on a timer; idle repaints only on input,
        // except that clipboard-triggered state changes still need polling.
        match status.state {
            PlaybackState::Generating => ctx.request_repaint_after(Duration::from_millis(66)),
            PlaybackState::Playing | PlaybackState::Paused => {
                ctx.request_repaint_after(Duration::from_millis(150));
            }
            PlaybackState::Idle => ctx.request_repaint_after(Duration::from_millis(250)),
        }

        let size = if self.show_settings {
            egui::vec2(300.0, 200.0)
        } else {
            match status.state {
                PlaybackState::Idle => egui::vec2(280.0, 95.0),
                _ => egui::vec2(300.0, 110.0),
            }
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));

        // Dark transparent background frame
        let frame = egui::Frame::new()
            .fill(egui::Color32::from_rgba_premultiplied(30, 30, 30, 220))
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::same(8));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            self.draw_title_bar(ui, ctx, &status);
            ui.separator();

            if self.show_settings {
                self.draw_settings(ui);
                return;
            }

            self.draw_status(ui, &status);
            ui.add_space(4.0);
            self.draw_controls(ui, &status);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("ClipVoice widget closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(preview("hello"), "hello");
    }

    #[test]
    fn long_text_is_truncated_on_char_boundaries() {
        let text = "é".repeat(200);
        let shown = preview(&text);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), TEXT_PREVIEW_CHARS + 3);
    }
}
