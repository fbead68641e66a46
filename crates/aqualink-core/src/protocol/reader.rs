use crate::sensor::SensorKind;

use super::layout;

/// Tokenising conventions shared by both dialects.
pub struct FrameReader<'a> {
    raw: &'a str,
}

impl<'a> FrameReader<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw: raw.trim() }
    }

    /// Frame text with surrounding whitespace removed.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Untrimmed pieces between field separators.
    pub fn fields(&self) -> std::str::Split<'a, char> {
        self.raw.split(layout::FIELD_SEPARATOR)
    }

    pub fn field_count(&self) -> usize {
        self.fields().count()
    }
}

/// Split a piece on the first pair separator, trimming both halves.
///
/// `" temp : 24.1"` gives `("temp", "24.1")`; a piece without a separator
/// gives `None`.
pub fn split_pair(piece: &str) -> Option<(&str, &str)> {
    piece
        .split_once(layout::PAIR_SEPARATOR)
        .map(|(key, value)| (key.trim(), value.trim()))
}

/// Resolve a key case-insensitively through the key table.
pub fn lookup_key(key: &str) -> Option<SensorKind> {
    let upper = key.trim().to_ascii_uppercase();
    layout::KEY_TABLE
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, kind)| *kind)
}
