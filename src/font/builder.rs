//! Encoder for the font binary format.
//!
//! Fonts are normally produced by an offline converter; this builder exists
//! for tooling (`dsfont sample-font`) and for tests that need fonts with
//! exact metrics.

use crate::render::PixelFormat;

use super::format::{
    BLOCK_ATLAS, BLOCK_CHARS, BLOCK_COMMON, BLOCK_INFO, MAGIC, SUPPORTED_VERSION,
};
use super::resource::FaceFlags;

#[derive(Debug, Clone)]
struct GlyphEntry {
    codepoint: u32,
    rect: (u16, u16, u16, u16),
    x_offset: i16,
    y_offset: i16,
    advance: i16,
}

/// Builds a font binary in memory.
#[derive(Debug, Clone)]
pub struct FontBuilder {
    version: u8,
    name: String,
    flags: FaceFlags,
    size: i16,
    line_height: u16,
    base: u16,
    format: PixelFormat,
    width: u16,
    height: u16,
    palette: Vec<u16>,
    pixels: Vec<u8>,
    glyphs: Vec<GlyphEntry>,
}

impl FontBuilder {
    /// Starts a font with an empty `width` x `height` atlas in `format`.
    ///
    /// The palette defaults to a grey ramp covering every index of the format.
    pub fn new(format: PixelFormat, width: u16, height: u16, line_height: u16) -> Self {
        let colors = (1usize << format.bits_per_pixel().min(8)) as u16;
        let palette = (0..colors)
            .map(|i| {
                let level = (u32::from(i) * 31 / u32::from(colors - 1).max(1)) as u16;
                level | (level << 5) | (level << 10)
            })
            .collect();
        let pixels = vec![
            0u8;
            format
                .buffer_len(usize::from(width), usize::from(height))
                .unwrap_or(0)
        ];

        Self {
            version: SUPPORTED_VERSION,
            name: String::new(),
            flags: FaceFlags::UNICODE,
            size: line_height as i16,
            line_height,
            base: line_height,
            format,
            width,
            height,
            palette,
            pixels,
            glyphs: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn flags(mut self, flags: FaceFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn base(mut self, base: u16) -> Self {
        self.base = base;
        self
    }

    /// Overrides the version byte written to the header.
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn palette(mut self, palette: Vec<u16>) -> Self {
        self.palette = palette;
        self
    }

    /// Adds a glyph. `rect` is (x, y, width, height) in the atlas.
    pub fn glyph(
        self,
        codepoint: char,
        rect: (u16, u16, u16, u16),
        x_offset: i16,
        y_offset: i16,
        advance: i16,
    ) -> Self {
        self.raw_glyph(codepoint as u32, rect, x_offset, y_offset, advance)
    }

    /// Adds a glyph with an arbitrary id, including invalid scalar values.
    pub fn raw_glyph(
        mut self,
        codepoint: u32,
        rect: (u16, u16, u16, u16),
        x_offset: i16,
        y_offset: i16,
        advance: i16,
    ) -> Self {
        self.glyphs.push(GlyphEntry {
            codepoint,
            rect,
            x_offset,
            y_offset,
            advance,
        });
        self
    }

    /// Paints `rect` of the atlas with palette `index`, clipped to the atlas.
    pub fn fill(mut self, rect: (u16, u16, u16, u16), index: u8) -> Self {
        let (x0, y0, w, h) = rect;
        let width = usize::from(self.width);
        let bottom = (usize::from(y0) + usize::from(h)).min(usize::from(self.height));
        let right = (usize::from(x0) + usize::from(w)).min(width);
        for y in usize::from(y0)..bottom {
            for x in usize::from(x0)..right {
                self.format
                    .write(&mut self.pixels, width, x, y, u16::from(index));
            }
        }
        self
    }

    /// Encodes the font.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(self.version);

        let mut info = Vec::new();
        info.extend_from_slice(&self.size.to_le_bytes());
        info.push(self.flags.bits());
        // charset, stretch_h (100%), aa, padding, spacing, outline
        info.push(0);
        info.extend_from_slice(&100u16.to_le_bytes());
        info.push(1);
        info.extend_from_slice(&[0; 4]);
        info.extend_from_slice(&[1, 1]);
        info.push(0);
        info.extend_from_slice(self.name.as_bytes());
        info.push(0);
        push_block(&mut out, BLOCK_INFO, &info);

        let mut common = Vec::new();
        for v in [self.line_height, self.base, self.width, self.height, 1] {
            common.extend_from_slice(&v.to_le_bytes());
        }
        // bit field, alpha, red, green, blue channels
        common.extend_from_slice(&[0, 0, 4, 4, 4]);
        push_block(&mut out, BLOCK_COMMON, &common);

        let mut chars = Vec::new();
        for glyph in &self.glyphs {
            chars.extend_from_slice(&glyph.codepoint.to_le_bytes());
            let (x, y, w, h) = glyph.rect;
            for v in [x, y, w, h] {
                chars.extend_from_slice(&v.to_le_bytes());
            }
            for v in [glyph.x_offset, glyph.y_offset, glyph.advance] {
                chars.extend_from_slice(&v.to_le_bytes());
            }
            // page, channel
            chars.extend_from_slice(&[0, 15]);
        }
        push_block(&mut out, BLOCK_CHARS, &chars);

        let mut atlas = Vec::new();
        atlas.push(self.format.code());
        atlas.extend_from_slice(&self.width.to_le_bytes());
        atlas.extend_from_slice(&self.height.to_le_bytes());
        atlas.extend_from_slice(&(self.palette.len() as u16).to_le_bytes());
        for color in &self.palette {
            atlas.extend_from_slice(&color.to_le_bytes());
        }
        atlas.extend_from_slice(&self.pixels);
        push_block(&mut out, BLOCK_ATLAS, &atlas);

        out
    }

    /// A small 16-colour font covering printable ASCII and a U+25A1 box.
    ///
    /// Each glyph is a hollow rectangle in an 8x8 cell; space is blank.
    pub fn sample() -> Self {
        let mut builder = FontBuilder::new(PixelFormat::Indexed4, 128, 128, 10)
            .name("dsfont sample")
            .base(8);

        let cells = (' '..='~').chain(std::iter::once('\u{25A1}'));
        for (i, c) in cells.enumerate() {
            let x = (i % 16) as u16 * 8;
            let y = (i / 16) as u16 * 8;
            if c == ' ' {
                builder = builder.glyph(c, (x, y, 0, 0), 0, 0, 4);
                continue;
            }
            builder = builder
                .glyph(c, (x, y, 6, 7), 0, 1, 7)
                .fill((x, y, 6, 7), 15)
                .fill((x + 1, y + 1, 4, 5), if c == '\u{25A1}' { 0 } else { 1 });
        }
        builder
    }
}

fn push_block(out: &mut Vec<u8>, kind: u8, payload: &[u8]) {
    out.push(kind);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}
