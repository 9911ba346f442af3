use std::str::{Chars, Utf8Chunks};

/// Classification of a decoded character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharKind {
    /// An ordinary character to be looked up in the font.
    Glyph,
    /// `\n`: ends the current line.
    LineBreak,
    /// U+FFFD standing in for an invalid byte sequence.
    Replacement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedChar {
    pub codepoint: char,
    pub kind: CharKind,
}

impl DecodedChar {
    pub fn is_line_break(&self) -> bool {
        self.kind == CharKind::LineBreak
    }
}

/// Lazy, strict UTF-8 decoder.
///
/// Overlong encodings, surrogates, values above U+10FFFF and truncated
/// sequences are invalid. Each maximal invalid subsequence is replaced by a
/// single U+FFFD and decoding continues with the next byte, so a bad byte
/// never hides the rest of the string. Characters come out in byte order.
pub struct Decoder<'a> {
    chunks: Utf8Chunks<'a>,
    valid: Chars<'a>,
    pending_invalid: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            chunks: bytes.utf8_chunks(),
            valid: "".chars(),
            pending_invalid: false,
        }
    }
}

impl Iterator for Decoder<'_> {
    type Item = DecodedChar;

    fn next(&mut self) -> Option<DecodedChar> {
        loop {
            if let Some(c) = self.valid.next() {
                let kind = if c == '\n' {
                    CharKind::LineBreak
                } else {
                    CharKind::Glyph
                };
                return Some(DecodedChar { codepoint: c, kind });
            }

            if self.pending_invalid {
                self.pending_invalid = false;
                return Some(DecodedChar {
                    codepoint: char::REPLACEMENT_CHARACTER,
                    kind: CharKind::Replacement,
                });
            }

            let chunk = self.chunks.next()?;
            self.valid = chunk.valid().chars();
            self.pending_invalid = !chunk.invalid().is_empty();
        }
    }
}

/// Decodes `bytes` lazily. See [`Decoder`].
pub fn decode(bytes: &[u8]) -> Decoder<'_> {
    Decoder::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codepoints(bytes: &[u8]) -> Vec<char> {
        decode(bytes).map(|d| d.codepoint).collect()
    }

    #[test]
    fn test_decode_ascii_and_multibyte() {
        assert_eq!(codepoints("aß€😀".as_bytes()), vec!['a', 'ß', '€', '😀']);
    }

    #[test]
    fn test_line_break_classification() {
        let kinds: Vec<CharKind> = decode(b"a\nb\r").map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CharKind::Glyph,
                CharKind::LineBreak,
                CharKind::Glyph,
                CharKind::Glyph
            ]
        );
    }

    #[test]
    fn test_invalid_continuation_substituted() {
        // 0xC3 expects a continuation byte but gets 'A'.
        let decoded: Vec<DecodedChar> = decode(b"x\xC3Ay").collect();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[1].codepoint, '\u{FFFD}');
        assert_eq!(decoded[1].kind, CharKind::Replacement);
        assert_eq!(decoded[2].codepoint, 'A');
        assert_eq!(decoded[3].codepoint, 'y');
    }

    #[test]
    fn test_overlong_rejected() {
        // Overlong encoding of '/'.
        assert_eq!(codepoints(b"\xC0\xAF"), vec!['\u{FFFD}', '\u{FFFD}']);
        // Overlong three-byte NUL.
        assert!(codepoints(b"\xE0\x80\x80").iter().all(|&c| c == '\u{FFFD}'));
    }

    #[test]
    fn test_surrogate_rejected() {
        let out = codepoints(b"\xED\xA0\x80z");
        assert_eq!(out.last(), Some(&'z'));
        assert!(out[..out.len() - 1].iter().all(|&c| c == '\u{FFFD}'));
    }

    #[test]
    fn test_truncated_sequence_at_end() {
        assert_eq!(codepoints(b"ab\xE2\x82"), vec!['a', 'b', '\u{FFFD}']);
    }

    #[test]
    fn test_above_max_codepoint_rejected() {
        assert!(codepoints(b"\xF4\x90\x80\x80")
            .iter()
            .all(|&c| c == '\u{FFFD}'));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode(b"").count(), 0);
    }
}
