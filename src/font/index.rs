use crate::error::Result;

use super::resource::Glyph;

/// Codepoints below this value resolve through a dense table.
const DENSE_RANGE: usize = 256;
const NO_GLYPH: u32 = u32::MAX;

/// Replacement candidates tried, in order, after the configured one. When
/// none exist the first glyph with pixels is used.
const FALLBACK_CHAIN: [char; 3] = ['\u{FFFD}', '?', '\u{25A1}'];

/// Result of resolving a codepoint against a font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<'a> {
    pub glyph: &'a Glyph,
    /// `true` when the font had no glyph and the fallback was used.
    pub substituted: bool,
}

/// Codepoint to glyph mapping.
///
/// Glyphs are kept sorted by codepoint for binary search. Codepoints below
/// 256 additionally go through a dense table, which covers ASCII and
/// Latin-1 text in O(1).
#[derive(Debug)]
pub struct GlyphIndex {
    glyphs: Vec<Glyph>,
    dense: Vec<u32>,
    fallback: usize,
}

impl GlyphIndex {
    /// Builds the index. `glyphs` must be sorted by codepoint, without
    /// duplicates, and non-empty.
    pub(crate) fn new(glyphs: Vec<Glyph>, replacement: Option<char>) -> Result<Self> {
        debug_assert!(!glyphs.is_empty());
        debug_assert!(glyphs.windows(2).all(|w| w[0].codepoint < w[1].codepoint));

        let mut dense = Vec::new();
        dense.try_reserve_exact(DENSE_RANGE)?;
        dense.resize(DENSE_RANGE, NO_GLYPH);
        for (i, glyph) in glyphs.iter().enumerate() {
            let cp = glyph.codepoint as usize;
            if cp >= DENSE_RANGE {
                break;
            }
            dense[cp] = i as u32;
        }

        let mut index = Self {
            glyphs,
            dense,
            fallback: 0,
        };

        let fallback = replacement
            .into_iter()
            .chain(FALLBACK_CHAIN)
            .find_map(|c| index.position(c))
            .or_else(|| index.glyphs.iter().position(|g| !g.is_blank()))
            .unwrap_or(0);
        index.fallback = fallback;

        log::debug!(
            "Fallback glyph is U+{:04X}",
            index.glyphs[index.fallback].codepoint as u32
        );

        Ok(index)
    }

    fn position(&self, codepoint: char) -> Option<usize> {
        let cp = codepoint as usize;
        if cp < DENSE_RANGE {
            return match self.dense[cp] {
                NO_GLYPH => None,
                i => Some(i as usize),
            };
        }
        self.glyphs
            .binary_search_by_key(&codepoint, |g| g.codepoint)
            .ok()
    }

    /// Returns the glyph for `codepoint` if the font has one.
    pub fn get(&self, codepoint: char) -> Option<&Glyph> {
        self.position(codepoint).map(|i| &self.glyphs[i])
    }

    /// Resolves `codepoint`, substituting the fallback glyph when absent.
    pub fn lookup(&self, codepoint: char) -> Resolved<'_> {
        match self.position(codepoint) {
            Some(i) => Resolved {
                glyph: &self.glyphs[i],
                substituted: false,
            },
            None => {
                log::trace!("No glyph for U+{:04X}, using fallback", codepoint as u32);
                Resolved {
                    glyph: self.fallback(),
                    substituted: true,
                }
            }
        }
    }

    pub fn fallback(&self) -> &Glyph {
        &self.glyphs[self.fallback]
    }

    /// All glyphs, sorted by codepoint.
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}
