// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises one corpus line before tokenisation.
//
// Corpora scraped from the web carry invisible noise that the
// word-level vocabulary would otherwise count as real tokens:
//   - non-breaking / ideographic / zero-width spaces
//   - byte order marks at the start of a file
//   - tabs and stray control characters
//
// Every sentence pair is one line, so unlike free text there are
// no paragraph breaks to preserve: the output is a single line
// with single spaces between words.

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, line: &str) -> String {
        let normalised: String = line
            .chars()
            .filter(|&c| c != '\u{200B}' && c != '\u{FEFF}')
            .map(|c| match c {
                '\u{00A0}' | '\u{3000}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        normalised.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello \t  world  "), "hello world");
    }

    #[test]
    fn test_ideographic_and_nbsp_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("你好\u{3000}世界"), "你好 世界");
        assert_eq!(p.clean("a\u{00A0}b"), "a b");
    }

    #[test]
    fn test_zero_width_characters_vanish() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("\u{FEFF}foo\u{200B}bar"), "foobar");
    }

    #[test]
    fn test_control_chars_and_newlines() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("line\r\nnext\x01end"), "line next end");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(Preprocessor::new().clean(""), "");
    }
}
