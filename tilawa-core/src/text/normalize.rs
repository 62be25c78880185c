//! Arabic comparison-key normalization.
//!
//! ## Pipeline
//!
//! 1. Canonical decomposition (NFD), so `أ` becomes `ا` + U+0654.
//! 2. Drop combining marks and tashkeel (see [`is_ignorable`]).
//! 3. Fold letter variants the recognizer renders inconsistently.
//! 4. Collapse whitespace runs, trim.
//! 5. Lowercase (only affects Latin transliteration).
//!
//! The output is the sole comparison key: two words match iff their
//! normalized forms are equal.

use unicode_normalization::UnicodeNormalization;

const ALEF: char = '\u{0627}';
const YEH: char = '\u{064A}';
const HEH: char = '\u{0647}';

/// Canonicalize an Arabic word or phrase for comparison.
///
/// Never fails; empty or whitespace-only input yields an empty string.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let folded: String = text
        .nfd()
        .filter(|c| !is_ignorable(*c))
        .map(fold_letter)
        .collect();

    let mut out = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    out.to_lowercase()
}

/// Combining marks removed before comparison.
///
/// Covers the generic combining block plus everything Arabic script carries
/// after decomposition: Quranic honorifics, harakat, shadda, sukun, the
/// decomposed hamza marks, superscript alef, annotation/pause marks, and the
/// tatweel.
fn is_ignorable(c: char) -> bool {
    matches!(
        c,
        '\u{0300}'..='\u{036F}'
            | '\u{0610}'..='\u{061A}'
            | '\u{0640}'
            | '\u{064B}'..='\u{065F}'
            | '\u{0670}'
            | '\u{06D6}'..='\u{06DC}'
            | '\u{06DF}'..='\u{06E4}'
            | '\u{06E7}'..='\u{06E8}'
            | '\u{06EA}'..='\u{06ED}'
    )
}

fn fold_letter(c: char) -> char {
    match c {
        // hamza above/below, madda, wasla, wavy hamza forms
        '\u{0623}' | '\u{0625}' | '\u{0622}' | '\u{0671}' | '\u{0672}' | '\u{0673}' => ALEF,
        // alef maksura, yeh with hamza
        '\u{0649}' | '\u{0626}' => YEH,
        // teh marbuta
        '\u{0629}' => HEH,
        other => other,
    }
}
