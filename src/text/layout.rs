use crate::font::{FontResource, Glyph};

use super::decoder::{decode, DecodedChar, Decoder};

/// A glyph positioned at a pen location, relative to the text origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement<'f> {
    pub codepoint: char,
    pub glyph: &'f Glyph,
    pub pen_x: i32,
    pub pen_y: i32,
    /// Zero-based line number.
    pub line: usize,
    /// `true` when `glyph` is the font's fallback for a missing character.
    pub substituted: bool,
}

impl Placement<'_> {
    /// Rightmost pixel column touched by this placement, advance included.
    pub fn extent(&self) -> i32 {
        glyph_extent(self.pen_x, self.glyph)
    }
}

fn glyph_extent(pen_x: i32, glyph: &Glyph) -> i32 {
    let advance = pen_x.saturating_add(i32::from(glyph.advance));
    let ink = pen_x
        .saturating_add(i32::from(glyph.x_offset))
        .saturating_add(i32::from(glyph.width));
    advance.max(ink)
}

/// Lazily places decoded characters.
///
/// The pen starts at (0, 0), moves right by each glyph's advance, and on a
/// line break returns to x = 0 one line height further down. Pen positions
/// saturate at the `i32` range instead of overflowing.
pub struct Placements<'f, I> {
    chars: I,
    font: &'f FontResource,
    pen_x: i32,
    pen_y: i32,
    line: usize,
}

impl<'f, I> Placements<'f, I>
where
    I: Iterator<Item = DecodedChar>,
{
    pub fn new(font: &'f FontResource, chars: I) -> Self {
        Self {
            chars,
            font,
            pen_x: 0,
            pen_y: 0,
            line: 0,
        }
    }
}

impl<'f, I> Iterator for Placements<'f, I>
where
    I: Iterator<Item = DecodedChar>,
{
    type Item = Placement<'f>;

    fn next(&mut self) -> Option<Placement<'f>> {
        loop {
            let decoded = self.chars.next()?;
            if decoded.is_line_break() {
                self.pen_x = 0;
                self.pen_y = self.pen_y.saturating_add(i32::from(self.font.line_height()));
                self.line += 1;
                continue;
            }

            let resolved = self.font.lookup(decoded.codepoint);
            let placement = Placement {
                codepoint: decoded.codepoint,
                glyph: resolved.glyph,
                pen_x: self.pen_x,
                pen_y: self.pen_y,
                line: self.line,
                substituted: resolved.substituted,
            };
            self.pen_x = self.pen_x.saturating_add(i32::from(resolved.glyph.advance));
            return Some(placement);
        }
    }
}

/// Places the characters of a UTF-8 byte string.
pub fn placements<'f, 't>(
    font: &'f FontResource,
    text: &'t [u8],
) -> Placements<'f, Decoder<'t>> {
    Placements::new(font, decode(text))
}

/// Size of laid-out text in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBounds {
    pub width: u32,
    pub height: u32,
    pub lines: usize,
}

#[derive(Default)]
struct BoundsTracker {
    line_width: i32,
    max_width: i32,
    breaks: usize,
}

impl BoundsTracker {
    fn push(&mut self, extent: i32) {
        self.line_width = self.line_width.max(extent);
    }

    fn line_break(&mut self) {
        self.max_width = self.max_width.max(self.line_width);
        self.line_width = 0;
        self.breaks += 1;
    }

    fn finish(mut self, line_height: u16) -> TextBounds {
        self.max_width = self.max_width.max(self.line_width);
        let lines = self.breaks.saturating_add(1);
        let line_count = u32::try_from(lines).unwrap_or(u32::MAX);
        TextBounds {
            width: self.max_width.max(0) as u32,
            height: u32::from(line_height).saturating_mul(line_count),
            lines,
        }
    }
}

/// Computes the bounding box of `text` without storing placements.
pub fn measure(font: &FontResource, text: &[u8]) -> TextBounds {
    let mut tracker = BoundsTracker::default();
    let mut pen_x = 0;
    for decoded in decode(text) {
        if decoded.is_line_break() {
            tracker.line_break();
            pen_x = 0;
            continue;
        }
        let glyph = font.lookup(decoded.codepoint).glyph;
        tracker.push(glyph_extent(pen_x, glyph));
        pen_x = pen_x.saturating_add(i32::from(glyph.advance));
    }
    tracker.finish(font.line_height())
}

/// Placements of one output line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineLayout<'f> {
    pub placements: Vec<Placement<'f>>,
    /// Vertical pen position shared by every placement on the line.
    pub pen_y: i32,
    pub width: u32,
}

/// Fully laid-out text: lines in order plus the overall bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout<'f> {
    lines: Vec<LineLayout<'f>>,
    bounds: TextBounds,
}

impl<'f> TextLayout<'f> {
    /// Lays out already-decoded characters.
    pub fn from_chars(
        font: &'f FontResource,
        chars: impl IntoIterator<Item = DecodedChar>,
    ) -> Self {
        let line_height = i32::from(font.line_height());
        let mut tracker = BoundsTracker::default();
        let mut lines = vec![LineLayout::default()];

        let mut chars = chars.into_iter().peekable();
        loop {
            // Split on line breaks here so that empty lines are kept.
            let segment = std::iter::from_fn(|| chars.next_if(|d| !d.is_line_break()));
            let current = lines.len() - 1;
            let pen_y = i32::try_from(current)
                .unwrap_or(i32::MAX)
                .saturating_mul(line_height);
            for placement in Placements::new(font, segment) {
                tracker.push(placement.extent());
                lines[current].placements.push(Placement {
                    pen_y,
                    line: current,
                    ..placement
                });
            }
            lines[current].pen_y = pen_y;
            lines[current].width = tracker.line_width.max(0) as u32;

            if chars.next().is_none() {
                break;
            }
            tracker.line_break();
            lines.push(LineLayout::default());
        }

        Self {
            lines,
            bounds: tracker.finish(font.line_height()),
        }
    }

    /// Decodes and lays out a UTF-8 byte string.
    pub fn new(font: &'f FontResource, text: &[u8]) -> Self {
        Self::from_chars(font, decode(text))
    }

    pub fn lines(&self) -> &[LineLayout<'f>] {
        &self.lines
    }

    pub fn bounds(&self) -> TextBounds {
        self.bounds
    }

    /// All placements in reading order.
    pub fn placements(&self) -> impl Iterator<Item = &Placement<'f>> + '_ {
        self.lines.iter().flat_map(|line| line.placements.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontBuilder;
    use crate::render::PixelFormat;

    fn font() -> FontResource {
        let data = FontBuilder::new(PixelFormat::Indexed4, 64, 64, 16)
            .glyph('A', (0, 0, 8, 12), 1, 2, 10)
            .glyph('B', (8, 0, 10, 12), 0, 2, 12)
            .glyph('W', (18, 0, 16, 12), -1, 2, 12)
            .glyph(' ', (0, 0, 0, 0), 0, 0, 4)
            .glyph('?', (34, 0, 6, 12), 0, 2, 7)
            .build();
        FontResource::load(&data).unwrap()
    }

    #[test]
    fn test_single_line_pen_positions() {
        let font = font();
        let layout = TextLayout::new(&font, b"AB");
        assert_eq!(layout.lines().len(), 1);
        let xs: Vec<i32> = layout.placements().map(|p| p.pen_x).collect();
        assert_eq!(xs, vec![0, 10]);
        assert_eq!(layout.bounds().width, 22);
        assert_eq!(layout.bounds().height, 16);
    }

    #[test]
    fn test_line_break_resets_pen() {
        let font = font();
        let layout = TextLayout::new(&font, b"A\nB");
        let lines = layout.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].placements[0].pen_y, 0);
        assert_eq!(lines[1].placements[0].pen_y, 16);
        assert_eq!(lines[1].pen_y - lines[0].pen_y, i32::from(font.line_height()));
        assert_eq!(lines[1].placements[0].pen_x, 0);
        assert_eq!(layout.bounds().height, 32);
        assert_eq!(layout.bounds().width, 12);
    }

    #[test]
    fn test_empty_and_trailing_lines_kept() {
        let font = font();
        let layout = TextLayout::new(&font, b"A\n\nB\n");
        assert_eq!(layout.lines().len(), 4);
        assert!(layout.lines()[1].placements.is_empty());
        assert_eq!(layout.lines()[1].pen_y, 16);
        assert!(layout.lines()[3].placements.is_empty());
        assert_eq!(layout.bounds().lines, 4);
        assert_eq!(layout.bounds().height, 64);
    }

    #[test]
    fn test_ink_wider_than_advance_counts() {
        let font = FontResource::load(
            &FontBuilder::new(PixelFormat::Indexed4, 32, 32, 8)
                .glyph('f', (0, 0, 9, 8), 0, 0, 5)
                .build(),
        )
        .unwrap();
        assert_eq!(TextLayout::new(&font, b"f").bounds().width, 9);
        assert_eq!(TextLayout::new(&font, b"ff").bounds().width, 14);
    }

    #[test]
    fn test_missing_glyph_substituted() {
        let font = font();
        let layout = TextLayout::new(&font, "AŋB".as_bytes());
        let placements: Vec<_> = layout.placements().collect();
        assert_eq!(placements.len(), 3);
        assert!(placements[1].substituted);
        assert_eq!(placements[1].codepoint, 'ŋ');
        assert_eq!(placements[1].glyph.codepoint, '?');
        assert_eq!(placements[2].pen_x, 17);
    }

    #[test]
    fn test_measure_matches_layout() {
        let font = font();
        for text in ["", "AB", "A\nB", "W W\n\nA\n", "AAAA\nB"] {
            assert_eq!(
                measure(&font, text.as_bytes()),
                TextLayout::new(&font, text.as_bytes()).bounds(),
                "bounds differ for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_lazy_placements_match_layout() {
        let font = font();
        let text = "AB\nW A".as_bytes();
        let lazy: Vec<_> = placements(&font, text).collect();
        let eager: Vec<_> = TextLayout::new(&font, text).placements().copied().collect();
        assert_eq!(lazy, eager);
    }

    #[test]
    fn test_empty_text() {
        let font = font();
        let layout = TextLayout::new(&font, b"");
        assert_eq!(layout.lines().len(), 1);
        assert_eq!(
            layout.bounds(),
            TextBounds {
                width: 0,
                height: 16,
                lines: 1
            }
        );
    }

    #[test]
    fn test_pen_saturates_on_tall_text() {
        let font = FontResource::load(
            &FontBuilder::new(PixelFormat::Indexed4, 32, 32, u16::MAX)
                .glyph('A', (0, 0, 8, 8), 0, 0, 8)
                .build(),
        )
        .unwrap();
        let mut text = "\n".repeat(40_000);
        text.push('A');

        let last = placements(&font, text.as_bytes()).last().unwrap();
        assert_eq!(last.pen_y, i32::MAX);
        assert_eq!(last.line, 40_000);

        let layout = TextLayout::new(&font, text.as_bytes());
        assert_eq!(layout.placements().last().unwrap().pen_y, i32::MAX);
        assert_eq!(
            measure(&font, text.as_bytes()).height,
            u32::from(u16::MAX) * 40_001
        );
    }

    #[test]
    fn test_pen_saturates_on_wide_text() {
        let font = FontResource::load(
            &FontBuilder::new(PixelFormat::Indexed4, 32, 32, 8)
                .glyph('W', (0, 0, 8, 8), 0, 0, i16::MAX)
                .build(),
        )
        .unwrap();
        let text = "W".repeat(70_000);
        let last = placements(&font, text.as_bytes()).last().unwrap();
        assert_eq!(last.pen_x, i32::MAX);
        assert_eq!(measure(&font, text.as_bytes()).width, i32::MAX as u32);
    }

    #[test]
    fn test_layout_deterministic() {
        let font = font();
        let a = TextLayout::new(&font, b"WAB\nBA");
        let b = TextLayout::new(&font, b"WAB\nBA");
        assert_eq!(a, b);
    }
}
