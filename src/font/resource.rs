use bitflags::bitflags;
use compact_str::CompactString;

use crate::error::{FontError, Result};
use crate::render::PixelFormat;

use super::format::{self, AtlasBlock, CharRecord};
use super::index::{GlyphIndex, Resolved};

bitflags! {
    /// Face attributes from the optional info block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FaceFlags: u8 {
        const SMOOTH = 0b1000_0000;
        const UNICODE = 0b0100_0000;
        const ITALIC = 0b0010_0000;
        const BOLD = 0b0001_0000;
        const FIXED_HEIGHT = 0b0000_1000;
    }
}

/// Metrics and atlas rectangle for one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub codepoint: char,
    /// Left edge in the atlas, in pixels.
    pub x: u16,
    /// Top edge in the atlas, in pixels.
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Horizontal offset from the pen to the left edge of the bitmap.
    pub x_offset: i16,
    /// Vertical offset from the line top to the top edge of the bitmap.
    pub y_offset: i16,
    /// Horizontal pen movement after drawing this glyph.
    pub advance: i16,
}

impl Glyph {
    /// Glyphs without pixels (e.g. space) only move the pen.
    pub fn is_blank(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Glyph bitmap shared by all glyphs of a font.
#[derive(Debug)]
pub struct Atlas {
    format: PixelFormat,
    width: u16,
    height: u16,
    palette: Vec<u16>,
    pixels: Vec<u8>,
}

impl Atlas {
    fn from_block(block: &AtlasBlock<'_>) -> Result<Self> {
        let mut palette = Vec::new();
        palette.try_reserve_exact(block.palette.len() / 2)?;
        palette.extend(
            block
                .palette
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]])),
        );

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(block.pixels.len())?;
        pixels.extend_from_slice(block.pixels);

        Ok(Self {
            format: block.format,
            width: block.width,
            height: block.height,
            palette,
            pixels,
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// RGB15 palette entries. Entry 0 is the transparent key.
    pub fn palette(&self) -> &[u16] {
        &self.palette
    }

    /// Packed pixel data in the atlas format, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Palette index of the pixel at (x, y).
    pub fn index_at(&self, x: usize, y: usize) -> u8 {
        self.format
            .read_index(&self.pixels, usize::from(self.width), x, y)
    }
}

/// Options applied while loading a font.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Glyph used for characters the font lacks, if the font has it.
    pub replacement: Option<char>,
}

/// An immutable, loaded bitmap font.
///
/// Each value owns its data; there is no global font table. Dropping the
/// value releases it.
#[derive(Debug)]
pub struct FontResource {
    name: CompactString,
    size: i16,
    flags: FaceFlags,
    line_height: u16,
    base: u16,
    index: GlyphIndex,
    atlas: Atlas,
}

impl FontResource {
    /// Loads a font from its binary representation.
    pub fn load(data: &[u8]) -> Result<Self> {
        Self::load_with(data, &LoadOptions::default())
    }

    /// Loads a font, applying `options`.
    ///
    /// Either a complete font is returned or nothing is: every failure
    /// happens before the value is constructed.
    pub fn load_with(data: &[u8], options: &LoadOptions) -> Result<Self> {
        if data.is_empty() {
            return Err(FontError::InvalidArgument("empty font buffer".into()));
        }

        let raw = format::parse(data)?;

        let mut glyphs = Vec::new();
        glyphs.try_reserve_exact(raw.char_count())?;
        for record in raw.chars() {
            glyphs.push(glyph_from_record(&record?, &raw.atlas)?);
        }

        glyphs.sort_unstable_by_key(|g| g.codepoint);
        if let Some(pair) = glyphs.windows(2).find(|w| w[0].codepoint == w[1].codepoint) {
            return Err(FontError::InvalidFontData(format!(
                "duplicate glyph for U+{:04X}",
                pair[0].codepoint as u32
            )));
        }

        let index = GlyphIndex::new(glyphs, options.replacement)?;
        let atlas = Atlas::from_block(&raw.atlas)?;

        let (name, size, flags) = match raw.info {
            Some(info) => (
                CompactString::from(String::from_utf8_lossy(info.name)),
                info.size,
                FaceFlags::from_bits_truncate(info.flags),
            ),
            None => (CompactString::default(), 0, FaceFlags::empty()),
        };

        log::debug!(
            "Loaded font '{}': {} glyphs, line height {}, {}x{} {} atlas",
            name,
            index.len(),
            raw.common.line_height,
            atlas.width,
            atlas.height,
            atlas.format
        );

        Ok(Self {
            name,
            size,
            flags,
            line_height: raw.common.line_height,
            base: raw.common.base,
            index,
            atlas,
        })
    }

    /// Face name from the info block, empty if the font has none.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nominal size from the info block.
    pub fn size(&self) -> i16 {
        self.size
    }

    pub fn flags(&self) -> FaceFlags {
        self.flags
    }

    /// Vertical pen movement per line break.
    pub fn line_height(&self) -> u16 {
        self.line_height
    }

    /// Distance from the line top to the baseline.
    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn glyph_count(&self) -> usize {
        self.index.len()
    }

    pub fn glyphs(&self) -> &[Glyph] {
        self.index.glyphs()
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn glyph_index(&self) -> &GlyphIndex {
        &self.index
    }

    /// Resolves a codepoint, substituting the fallback glyph when absent.
    pub fn lookup(&self, codepoint: char) -> Resolved<'_> {
        self.index.lookup(codepoint)
    }

    pub fn fallback(&self) -> &Glyph {
        self.index.fallback()
    }
}

fn glyph_from_record(record: &CharRecord, atlas: &AtlasBlock<'_>) -> Result<Glyph> {
    let codepoint = char::from_u32(record.id).ok_or_else(|| {
        FontError::InvalidFontData(format!("glyph id {:#X} is not a Unicode scalar", record.id))
    })?;

    if record.page != 0 {
        return Err(FontError::InvalidFontData(format!(
            "glyph U+{:04X} is on page {}",
            record.id, record.page
        )));
    }

    let right = u32::from(record.x) + u32::from(record.width);
    let bottom = u32::from(record.y) + u32::from(record.height);
    if right > u32::from(atlas.width) || bottom > u32::from(atlas.height) {
        return Err(FontError::InvalidFontData(format!(
            "glyph U+{:04X} rectangle {}x{}+{}+{} lies outside the {}x{} atlas",
            record.id, record.width, record.height, record.x, record.y, atlas.width, atlas.height
        )));
    }

    Ok(Glyph {
        codepoint,
        x: record.x,
        y: record.y,
        width: record.width,
        height: record.height,
        x_offset: record.x_offset,
        y_offset: record.y_offset,
        advance: record.advance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontBuilder;

    fn sample() -> Vec<u8> {
        FontBuilder::new(PixelFormat::Indexed4, 16, 16, 12)
            .name("Tiny")
            .flags(FaceFlags::UNICODE | FaceFlags::BOLD)
            .glyph('B', (8, 0, 4, 4), 0, 0, 5)
            .glyph('A', (0, 0, 4, 4), 0, 0, 5)
            .glyph('?', (4, 0, 4, 4), 0, 0, 5)
            .build()
    }

    #[test]
    fn test_load_sorts_and_counts() {
        let font = FontResource::load(&sample()).unwrap();
        assert_eq!(font.glyph_count(), 3);
        let order: Vec<char> = font.glyphs().iter().map(|g| g.codepoint).collect();
        assert_eq!(order, vec!['?', 'A', 'B']);
        assert_eq!(font.name(), "Tiny");
        assert!(font.flags().contains(FaceFlags::BOLD));
        assert_eq!(font.line_height(), 12);
        assert_eq!(font.atlas().width(), 16);
        assert_eq!(font.fallback().codepoint, '?');
    }

    #[test]
    fn test_load_empty_buffer() {
        assert!(matches!(
            FontResource::load(&[]),
            Err(FontError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_rejects_duplicate_codepoints() {
        let data = FontBuilder::new(PixelFormat::Indexed4, 8, 8, 8)
            .glyph('A', (0, 0, 2, 2), 0, 0, 2)
            .glyph('A', (2, 0, 2, 2), 0, 0, 2)
            .build();
        assert!(matches!(
            FontResource::load(&data),
            Err(FontError::InvalidFontData(_))
        ));
    }

    #[test]
    fn test_load_rejects_glyph_outside_atlas() {
        let data = FontBuilder::new(PixelFormat::Indexed8, 8, 8, 8)
            .glyph('A', (6, 0, 4, 4), 0, 0, 4)
            .build();
        assert!(matches!(
            FontResource::load(&data),
            Err(FontError::InvalidFontData(_))
        ));
    }

    #[test]
    fn test_load_rejects_zero_glyphs() {
        let data = FontBuilder::new(PixelFormat::Indexed4, 8, 8, 8).build();
        assert_eq!(
            FontResource::load(&data).unwrap_err(),
            FontError::InvalidFontData("font has no glyphs".into())
        );
    }

    #[test]
    fn test_load_with_replacement() {
        let options = LoadOptions {
            replacement: Some('B'),
        };
        let font = FontResource::load_with(&sample(), &options).unwrap();
        assert_eq!(font.lookup('Z').glyph.codepoint, 'B');
    }

    #[test]
    fn test_atlas_index_at() {
        let data = FontBuilder::new(PixelFormat::Indexed4, 8, 8, 8)
            .glyph('A', (0, 0, 2, 2), 0, 0, 2)
            .fill((1, 1, 1, 1), 9)
            .build();
        let font = FontResource::load(&data).unwrap();
        assert_eq!(font.atlas().index_at(1, 1), 9);
        assert_eq!(font.atlas().index_at(0, 0), 0);
    }

    #[test]
    fn test_font_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FontResource>();
    }
}
