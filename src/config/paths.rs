//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + dictionaries):
//!   Windows: %APPDATA%\clipvoice\
//!   macOS:   ~/Library/Application Support/clipvoice/
//!   Linux:   ~/.config/clipvoice/
//!
//! Data dir (speech model + voices):
//!   Windows: %LOCALAPPDATA%\clipvoice\
//!   macOS:   ~/Library/Application Support/clipvoice/
//!   Linux:   ~/.local/share/clipvoice/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and the `dict/` sub-directory.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory holding `ignore.dict`, `banned.dict`, `replace.dict`.
    pub dict_dir: PathBuf,
    /// Full path to the speech-synthesis model file.
    pub model_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "clipvoice";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let dict_dir = config_dir.join("dict");
        let model_file = data_dir.join("model").join("speech.onnx");

        Self {
            config_dir,
            settings_file,
            dict_dir,
            model_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths.dict_dir.file_name().is_some_and(|n| n == "dict"));
        assert!(paths
            .model_file
            .file_name()
            .is_some_and(|n| n == "speech.onnx"));
    }
}
