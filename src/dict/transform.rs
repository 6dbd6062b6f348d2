//! Text transformation applied to every utterance before synthesis.
//!
//! [`DictionaryTransformer`] holds the active [`RuleSet`] behind
//! `RwLock<Arc<…>>` so [`reload`](DictionaryTransformer::reload) can swap in
//! a complete new set atomically while `process_text` runs concurrently —
//! readers see either the old or the new set, never a partial one.
//!
//! Matching is **case-insensitive substring** matching throughout, including
//! ignore words.  An ignore rule for `a` will strip letters out of unrelated
//! words; that is the documented behavior, not a bug to fix here.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use super::rules::RuleSet;

// ---------------------------------------------------------------------------
// Case-insensitive substring helpers
// ---------------------------------------------------------------------------

/// Find the first case-insensitive occurrence of `needle` in
/// `haystack[from..]`, returning its byte range in `haystack`.
///
/// Comparison uses full Unicode lowercase folding per character, so matches
/// never split a char boundary.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    let needle_chars: Vec<char> = needle.chars().collect();

    for (start, _) in haystack[from..].char_indices() {
        let start = from + start;
        let mut pos = start;
        let mut matched = true;

        let mut rest = haystack[start..].chars();
        for &n in &needle_chars {
            match rest.next() {
                Some(h) if h.to_lowercase().eq(n.to_lowercase()) => {
                    pos += h.len_utf8();
                }
                _ => {
                    matched = false;
                    break;
                }
            }
        }
        if matched {
            return Some((start, pos));
        }
    }
    None
}

/// `true` when `needle` occurs in `haystack`, ignoring case.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    find_ci(haystack, needle, 0).is_some()
}

/// Replace every case-insensitive occurrence of `needle` with `replacement`.
///
/// Scanning continues after the inserted replacement, so a replacement whose
/// value contains its own key does not loop.
pub(crate) fn replace_ci(text: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some((start, end)) = find_ci(text, needle, cursor) {
        out.push_str(&text[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

// ---------------------------------------------------------------------------
// DictionaryTransformer
// ---------------------------------------------------------------------------

/// Converts raw candidate text into speakable text using the active
/// [`RuleSet`].
///
/// Sits in the path of every utterance: the playback orchestrator runs
/// [`process_text`](Self::process_text) before any session is created.
pub struct DictionaryTransformer {
    /// Dictionary directory; `None` for in-memory rule sets (tests).
    dir: Option<PathBuf>,
    rules: RwLock<Arc<RuleSet>>,
}

impl DictionaryTransformer {
    /// Load rules from `dir`, creating the directory and empty rule files
    /// on first run.
    ///
    /// IO failures are logged and degrade to an empty rule set — a broken
    /// dictionary never prevents playback.
    pub fn new(dir: PathBuf) -> Self {
        let rules = Self::load_or_empty(&dir);
        Self {
            dir: Some(dir),
            rules: RwLock::new(Arc::new(rules)),
        }
    }

    /// Build a transformer around a fixed in-memory rule set (tests).
    pub fn from_rules(rules: RuleSet) -> Self {
        Self {
            dir: None,
            rules: RwLock::new(Arc::new(rules)),
        }
    }

    fn load_or_empty(dir: &std::path::Path) -> RuleSet {
        match RuleSet::load(dir) {
            Ok(rules) => rules,
            Err(e) => {
                log::warn!("dictionary load failed ({e}); using empty rule set");
                RuleSet::empty()
            }
        }
    }

    /// Re-read all three rule sources and atomically replace the in-memory
    /// set.  Safe to call while `process_text` runs on other threads.
    pub fn reload(&self) {
        let Some(dir) = &self.dir else {
            return; // in-memory rule set has nothing to reload
        };
        log::info!("reloading dictionaries");
        let rules = Arc::new(Self::load_or_empty(dir));
        *self.rules.write().unwrap() = rules;
    }

    /// Snapshot of the active rule set.
    fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.rules.read().unwrap())
    }

    /// Clean `text` through the banned / replace / ignore rules.
    ///
    /// * Empty or whitespace-only input is returned unchanged.
    /// * Lines containing a banned phrase are dropped whole.
    /// * Replacements apply in file order, then ignore words are deleted.
    /// * Lines blank after processing are dropped; survivors are rejoined
    ///   with `\n`.  The result may be empty.
    pub fn process_text(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_owned();
        }

        let rules = self.snapshot();
        log::debug!(
            "processing {} chars through {} banned / {} replace / {} ignore rules",
            text.len(),
            rules.banned.len(),
            rules.replacements.len(),
            rules.ignore.len()
        );

        let mut kept = Vec::new();
        for line in split_lines(text) {
            if rules.banned.iter().any(|b| contains_ci(line, b)) {
                log::debug!("dropping line with banned phrase: {line:?}");
                continue;
            }

            let mut processed = line.to_owned();
            for (key, value) in &rules.replacements {
                processed = replace_ci(&processed, key, value);
            }
            for word in &rules.ignore {
                processed = replace_ci(&processed, word, "");
            }

            if !processed.trim().is_empty() {
                kept.push(processed);
            }
        }

        kept.join("\n")
    }
}

/// Split on any newline convention (`\r\n`, `\r`, `\n`).
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push(&text[start..]);
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn transformer(ignore: &[&str], banned: &[&str], replace: &[(&str, &str)]) -> DictionaryTransformer {
        DictionaryTransformer::from_rules(RuleSet {
            ignore: ignore.iter().map(|s| s.to_string()).collect(),
            banned: banned.iter().map(|s| s.to_string()).collect(),
            replacements: replace
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    // ---- substring helpers ---

    #[test]
    fn contains_ci_ignores_case() {
        assert!(contains_ci("Hello World", "world"));
        assert!(contains_ci("HELLO", "hello"));
        assert!(!contains_ci("Hello", "goodbye"));
    }

    #[test]
    fn replace_ci_replaces_all_occurrences() {
        assert_eq!(replace_ci("Teh cat and teh dog", "teh", "the"), "the cat and the dog");
    }

    #[test]
    fn replace_ci_does_not_rescan_replacement() {
        // value contains its own key; must not loop
        assert_eq!(replace_ci("ab", "ab", "abab"), "abab");
    }

    #[test]
    fn replace_ci_handles_multibyte_text() {
        assert_eq!(replace_ci("héllo héllo", "HÉLLO", "x"), "x x");
    }

    // ---- process_text ---

    #[test]
    fn whitespace_only_input_is_unchanged() {
        let t = transformer(&[], &[], &[]);
        assert_eq!(t.process_text("   "), "   ");
        assert_eq!(t.process_text(""), "");
    }

    #[test]
    fn banned_phrase_drops_whole_line() {
        let t = transformer(&[], &["spoiler"], &[]);
        let out = t.process_text("keep me\nThis is a SPOILER alert\nand me");
        assert_eq!(out, "keep me\nand me");
    }

    #[test]
    fn replacements_apply_in_rule_order() {
        // later rules operate on the already-substituted text
        let t = transformer(&[], &[], &[("colour", "color"), ("color", "hue")]);
        assert_eq!(t.process_text("colour"), "hue");
    }

    #[test]
    fn ignore_words_are_substring_deleted() {
        // substring, not whole-word: documented behavior
        let t = transformer(&["cat"], &[], &[]);
        assert_eq!(t.process_text("concatenate the cat"), "conenate the ");
    }

    #[test]
    fn replace_then_ignore_composition() {
        let t = transformer(&["FOO"], &[], &[("teh", "the")]);
        let out = t.process_text("teh FOO ");
        assert_eq!(out.trim(), "the");
    }

    #[test]
    fn blank_lines_after_processing_are_dropped() {
        let t = transformer(&["noise"], &[], &[]);
        assert_eq!(t.process_text("noise\nreal text\nnoise noise"), "real text");
    }

    #[test]
    fn splits_on_any_newline_convention() {
        let t = transformer(&[], &["bad"], &[]);
        assert_eq!(t.process_text("one\r\nbad line\rthree"), "one\nthree");
    }

    #[test]
    fn idempotent_on_clean_text() {
        let t = transformer(&["um"], &["banned"], &[("teh", "the")]);
        let clean = "nothing matches here";
        let once = t.process_text(clean);
        let twice = t.process_text(&once);
        assert_eq!(once, twice);
        assert_eq!(once, clean);
    }

    #[test]
    fn result_may_be_empty() {
        let t = transformer(&[], &["everything"], &[]);
        assert_eq!(t.process_text("everything goes"), "");
    }

    #[test]
    fn reload_is_noop_for_in_memory_rules() {
        let t = transformer(&["x"], &[], &[]);
        t.reload();
        assert_eq!(t.process_text("axb"), "ab");
    }
}
