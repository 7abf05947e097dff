//! Text normalization for slide content.
//!
//! Unicode NFC, line-ending cleanup, whitespace collapsing and the small
//! amount of escaping markdown tables need.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse runs of horizontal whitespace into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

/// Text normalizer for titles, bullets, cells and notes.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    /// Create a new text normalizer.
    pub fn new() -> Self {
        Self
    }

    /// Normalize multi-line text, keeping its line structure.
    ///
    /// - Composes to Unicode NFC
    /// - Converts `\r\n`, `\r` and vertical tabs to `\n`
    /// - Collapses whitespace runs to single spaces and trims every line
    /// - Drops leading and trailing blank lines (interior ones are kept)
    pub fn normalize_block(&self, text: &str) -> String {
        let composed: String = text.nfc().collect();
        let unified = composed
            .replace("\r\n", "\n")
            .replace(['\r', '\u{000B}'], "\n");

        let lines: Vec<String> = unified
            .split('\n')
            .map(|line| {
                WHITESPACE_COLLAPSE_REGEX
                    .replace_all(line, " ")
                    .trim()
                    .to_string()
            })
            .collect();

        let first = lines.iter().position(|l| !l.is_empty());
        let last = lines.iter().rposition(|l| !l.is_empty());

        match (first, last) {
            (Some(first), Some(last)) => lines[first..=last].join("\n"),
            _ => String::new(),
        }
    }

    /// Normalize text onto a single line.
    ///
    /// Same cleanup as [`normalize_block`](Self::normalize_block), then the
    /// non-empty lines are joined with a space.
    pub fn normalize_inline(&self, text: &str) -> String {
        self.normalize_block(text)
            .split('\n')
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Normalize a table cell and escape pipes for a markdown table.
    pub fn markdown_cell(&self, text: &str) -> String {
        self.normalize_inline(text).replace('|', "\\|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        let normalizer = TextNormalizer::new();

        assert_eq!(normalizer.normalize_inline("Hello    world"), "Hello world");
        assert_eq!(normalizer.normalize_inline("  Hello  "), "Hello");
        assert_eq!(normalizer.normalize_inline("\t\tHello\t\t"), "Hello");
        assert_eq!(normalizer.normalize_inline("a\u{00A0}\u{00A0}b"), "a b");
    }

    #[test]
    fn test_inline_joins_lines() {
        let normalizer = TextNormalizer::new();

        assert_eq!(normalizer.normalize_inline("Line one\nLine two"), "Line one Line two");
        assert_eq!(normalizer.normalize_inline("Line one\r\n\r\nLine two"), "Line one Line two");
        assert_eq!(normalizer.normalize_inline("Soft\u{000B}break"), "Soft break");
    }

    #[test]
    fn test_block_preserves_interior_blank_lines() {
        let normalizer = TextNormalizer::new();

        assert_eq!(
            normalizer.normalize_block("\n\n  First  \n\nSecond\r\n  \n"),
            "First\n\nSecond"
        );
    }

    #[test]
    fn test_blank_text_normalizes_to_empty() {
        let normalizer = TextNormalizer::new();

        assert_eq!(normalizer.normalize_block(" \n\t\n "), "");
        assert_eq!(normalizer.normalize_inline(""), "");
    }

    #[test]
    fn test_nfc_composition() {
        let normalizer = TextNormalizer::new();

        // "e" followed by a combining acute accent
        assert_eq!(normalizer.normalize_inline("Cafe\u{0301}"), "Caf\u{00E9}");
    }

    #[test]
    fn test_markdown_cell_escapes_pipes() {
        let normalizer = TextNormalizer::new();

        assert_eq!(normalizer.markdown_cell("a|b"), "a\\|b");
        assert_eq!(normalizer.markdown_cell(" two\nlines "), "two lines");
    }
}
