//! Immutable reference word sequence.

use crate::error::{Result, TilawaError};
use crate::text::normalize::normalize;

/// One word of the reference passage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWord {
    /// The word exactly as written in the passage (used for display).
    pub original: String,
    /// Precomputed comparison key.
    pub key: String,
}

/// The canonical word sequence the user is expected to recite.
///
/// Built once by splitting the passage on whitespace and newlines; never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct ReferenceText {
    words: Vec<ReferenceWord>,
}

impl ReferenceText {
    /// Split `passage` into reference words.
    ///
    /// Tokens that normalize to nothing (standalone pause marks, stray
    /// diacritics) are not words and are skipped.
    ///
    /// # Errors
    /// `TilawaError::EmptyReference` if no words remain.
    pub fn new(passage: &str) -> Result<Self> {
        let words: Vec<ReferenceWord> = passage
            .split_whitespace()
            .filter_map(|token| {
                let key = normalize(token);
                (!key.is_empty()).then(|| ReferenceWord {
                    original: token.to_string(),
                    key,
                })
            })
            .collect();

        if words.is_empty() {
            return Err(TilawaError::EmptyReference);
        }
        Ok(Self { words })
    }

    /// Number of words, `N`.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false: construction rejects empty passages.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReferenceWord> {
        self.words.get(index)
    }

    /// Comparison key of the word at `index`.
    pub(crate) fn key(&self, index: usize) -> &str {
        &self.words[index].key
    }

    pub fn words(&self) -> &[ReferenceWord] {
        &self.words
    }

    /// Original words `0..=last` joined with single spaces.
    pub fn prefix_through(&self, last: usize) -> String {
        let end = (last + 1).min(self.words.len());
        self.words[..end]
            .iter()
            .map(|w| w.original.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
