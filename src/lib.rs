//! ClipVoice — clipboard-to-speech playback controller.
//!
//! Copy text anywhere, hear it spoken.  The crate watches the system
//! clipboard, cleans the text through user-editable dictionary rules, and
//! plays it through a speech engine, with global hotkeys and a small
//! floating widget for control.
//!
//! # Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML settings, presets, live settings handle |
//! | [`dict`] | Dictionary rule files and text transformation |
//! | [`clipboard`] | Polling clipboard watcher |
//! | [`hotkey`] | Global hotkey parsing, registration, dispatch |
//! | [`engine`] | Speech engine boundary and job types |
//! | [`audio`] | Sample queue, resampling, cpal output sink |
//! | [`player`] | Playback state machine and orchestrator actor |
//! | [`app`] | egui floating control widget |

pub mod app;
pub mod audio;
pub mod clipboard;
pub mod config;
pub mod dict;
pub mod engine;
pub mod hotkey;
pub mod player;
