//! User dictionaries: ignore words, banned phrases, and replacements.
//!
//! Three plain-text files (`ignore.dict`, `banned.dict`, `replace.dict`)
//! are loaded into a [`RuleSet`] and applied to every utterance by
//! [`DictionaryTransformer::process_text`] before it reaches the speech
//! engine.  Editing the files and calling
//! [`DictionaryTransformer::reload`] swaps the whole set atomically.

pub mod rules;
pub mod transform;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use rules::{DictError, RuleSet};
pub use transform::DictionaryTransformer;
