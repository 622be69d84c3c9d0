//! Whitespace word splitting and word validity checks.

/// Split text into maximal space-delimited words. Runs of consecutive
/// spaces collapse; empty input yields an empty vector.
pub fn split_into_words(text: &str) -> Vec<&str> {
    text.split(' ').filter(|word| !word.is_empty()).collect()
}

/// A valid word contains no control characters (code points below U+0020).
pub fn is_valid_word(text: &str) -> bool {
    !text.chars().any(|c| c < '\u{20}')
}
