//! Rule-set file parsing and loading.
//!
//! The three dictionary sources live side by side in one directory:
//!
//! | File | Format | Effect |
//! |------|--------|--------|
//! | `ignore.dict`  | one word per line        | occurrences are deleted |
//! | `banned.dict`  | one phrase per line      | whole line is dropped   |
//! | `replace.dict` | `key=value` per line     | occurrences are replaced |
//!
//! All files are UTF-8; blank lines and lines starting with `#` are
//! comments.  Entries are trimmed.  In `replace.dict` only the **first**
//! `=` separates key from value, so a value may itself contain `=`.

use std::path::Path;

use thiserror::Error;

// ---------------------------------------------------------------------------
// DictError
// ---------------------------------------------------------------------------

/// Errors that can occur while loading dictionary files.
#[derive(Debug, Error)]
pub enum DictError {
    /// The dictionary directory could not be created.
    #[error("failed to create dictionary directory {0}: {1}")]
    CreateDir(String, std::io::Error),

    /// A dictionary file could not be read or created.
    #[error("failed to read dictionary file {0}: {1}")]
    ReadFile(String, std::io::Error),
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// The combined ignore / banned / replace dictionaries.
///
/// A `RuleSet` is immutable once built; [`crate::dict::DictionaryTransformer`]
/// swaps complete sets atomically on reload.
#[derive(Debug, Default, Clone)]
pub struct RuleSet {
    /// Words deleted from every line (case-insensitive substring match).
    pub ignore: Vec<String>,
    /// Phrases whose presence drops the entire line (case-insensitive
    /// substring match).
    pub banned: Vec<String>,
    /// Ordered `(key, value)` replacement pairs, file order preserved.
    /// Keys match case-insensitively; later rules see already-substituted
    /// text.
    pub replacements: Vec<(String, String)>,
}

/// File names looked up inside the dictionary directory.
const RULE_FILES: [&str; 3] = ["ignore.dict", "banned.dict", "replace.dict"];

impl RuleSet {
    /// An empty rule set — `process_text` becomes a line-filtering no-op.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load all three rule files from `dir`.
    ///
    /// The directory and any missing rule file are created empty so the
    /// user has something to edit on first run.
    ///
    /// # Errors
    ///
    /// Returns [`DictError`] when the directory cannot be created or a file
    /// cannot be read.  Callers are expected to fall back to
    /// [`RuleSet::empty`] — a broken dictionary must never stop playback.
    pub fn load(dir: &Path) -> Result<Self, DictError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| DictError::CreateDir(dir.display().to_string(), e))?;

        for name in RULE_FILES {
            let path = dir.join(name);
            if !path.exists() {
                std::fs::write(&path, "")
                    .map_err(|e| DictError::ReadFile(path.display().to_string(), e))?;
                log::info!("created dictionary file: {}", path.display());
            }
        }

        let read = |name: &str| -> Result<String, DictError> {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .map_err(|e| DictError::ReadFile(path.display().to_string(), e))
        };

        let ignore = parse_word_list(&read("ignore.dict")?);
        let banned = parse_word_list(&read("banned.dict")?);
        let replacements = parse_replacements(&read("replace.dict")?);

        log::info!(
            "loaded dictionaries from {}: {} ignore, {} banned, {} replacements",
            dir.display(),
            ignore.len(),
            banned.len(),
            replacements.len()
        );

        Ok(Self {
            ignore,
            banned,
            replacements,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Parse a flat word/phrase list: one entry per line, trimmed, skipping
/// blank lines and `#` comments.
pub fn parse_word_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Parse `key=value` replacement lines, preserving file order.
///
/// Only the first `=` separates key from value.  Lines without `=` or with
/// an empty key are skipped.
pub fn parse_replacements(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), value.trim().to_owned()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
