//! Binary font layout.
//!
//! The container follows the BMFont binary layout (`BMF` magic, version byte,
//! then `kind: u8, len: u32, payload` blocks) and adds an atlas block carrying
//! the glyph bitmap and its palette. All integers are little-endian.
//!
//! Parsing borrows from the input and never allocates: every length is checked
//! against the bytes actually present before anything is copied out.

use crate::error::{FontError, Result};
use crate::render::PixelFormat;

pub const MAGIC: &[u8; 3] = b"BMF";
pub const SUPPORTED_VERSION: u8 = 3;

pub const BLOCK_INFO: u8 = 1;
pub const BLOCK_COMMON: u8 = 2;
pub const BLOCK_CHARS: u8 = 3;
pub const BLOCK_KERNING: u8 = 4;
pub const BLOCK_ATLAS: u8 = 5;

pub const HEADER_LEN: usize = 4;
pub const BLOCK_HEADER_LEN: usize = 5;
pub const INFO_FIXED_LEN: usize = 14;
pub const COMMON_LEN: usize = 15;
pub const CHAR_RECORD_LEN: usize = 20;
pub const ATLAS_FIXED_LEN: usize = 7;

pub const MIN_ATLAS_SIZE: u16 = 8;
pub const MAX_ATLAS_SIZE: u16 = 1024;

fn invalid(msg: impl Into<String>) -> FontError {
    FontError::InvalidFontData(msg.into())
}

/// Bounds-checked little-endian cursor.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(invalid(format!(
                "truncated data: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct InfoBlock<'a> {
    pub size: i16,
    pub flags: u8,
    pub name: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct CommonBlock {
    pub line_height: u16,
    pub base: u16,
    pub scale_w: u16,
    pub scale_h: u16,
    pub pages: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CharRecord {
    pub id: u32,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub x_offset: i16,
    pub y_offset: i16,
    pub advance: i16,
    pub page: u8,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AtlasBlock<'a> {
    pub format: PixelFormat,
    pub width: u16,
    pub height: u16,
    /// Raw little-endian RGB15 entries.
    pub palette: &'a [u8],
    pub pixels: &'a [u8],
}

/// A structurally valid font, still borrowing from the input buffer.
pub(crate) struct RawFont<'a> {
    pub info: Option<InfoBlock<'a>>,
    pub common: CommonBlock,
    chars: &'a [u8],
    pub atlas: AtlasBlock<'a>,
}

impl<'a> RawFont<'a> {
    pub fn char_count(&self) -> usize {
        self.chars.len() / CHAR_RECORD_LEN
    }

    pub fn chars(&self) -> impl Iterator<Item = Result<CharRecord>> + 'a {
        self.chars
            .chunks_exact(CHAR_RECORD_LEN)
            .map(|chunk| parse_char(&mut Reader::new(chunk)))
    }
}

/// Validates the header and block structure of a font binary.
pub(crate) fn parse(data: &[u8]) -> Result<RawFont<'_>> {
    let mut reader = Reader::new(data);
    if reader.remaining() < HEADER_LEN {
        return Err(invalid("buffer too short for header"));
    }
    if reader.bytes(3)? != MAGIC {
        return Err(invalid("bad magic"));
    }
    let version = reader.u8()?;
    if version != SUPPORTED_VERSION {
        return Err(FontError::FontVersionMismatch {
            found: version,
            supported: SUPPORTED_VERSION,
        });
    }

    let mut info = None;
    let mut common = None;
    let mut chars = None;
    let mut atlas = None;

    while reader.remaining() > 0 {
        if reader.remaining() < BLOCK_HEADER_LEN {
            return Err(invalid("truncated block header"));
        }
        let kind = reader.u8()?;
        let len = usize::try_from(reader.u32()?).map_err(|_| invalid("block too large"))?;
        let payload = reader.bytes(len)?;

        match kind {
            BLOCK_INFO => set_once(&mut info, parse_info(payload)?, "info")?,
            BLOCK_COMMON => set_once(&mut common, parse_common(payload)?, "common")?,
            BLOCK_CHARS => {
                if payload.len() % CHAR_RECORD_LEN != 0 {
                    return Err(invalid(format!(
                        "chars block length {} is not a multiple of {}",
                        payload.len(),
                        CHAR_RECORD_LEN
                    )));
                }
                set_once(&mut chars, payload, "chars")?
            }
            BLOCK_KERNING => log::debug!("Skipping kerning block ({} bytes)", len),
            BLOCK_ATLAS => set_once(&mut atlas, parse_atlas(payload)?, "atlas")?,
            other => log::debug!("Skipping unknown block kind {} ({} bytes)", other, len),
        }
    }

    let common = common.ok_or_else(|| invalid("missing common block"))?;
    let chars = chars.ok_or_else(|| invalid("missing chars block"))?;
    let atlas = atlas.ok_or_else(|| invalid("missing atlas block"))?;

    if chars.is_empty() {
        return Err(invalid("font has no glyphs"));
    }
    if common.line_height == 0 {
        return Err(invalid("line height is zero"));
    }
    if common.pages > 1 {
        return Err(invalid(format!(
            "{} texture pages declared, only single-atlas fonts are supported",
            common.pages
        )));
    }
    if common.scale_w != atlas.width || common.scale_h != atlas.height {
        return Err(invalid(format!(
            "common block declares a {}x{} atlas but atlas block is {}x{}",
            common.scale_w, common.scale_h, atlas.width, atlas.height
        )));
    }

    Ok(RawFont {
        info,
        common,
        chars,
        atlas,
    })
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &str) -> Result<()> {
    if slot.is_some() {
        return Err(invalid(format!("duplicate {} block", name)));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_info(payload: &[u8]) -> Result<InfoBlock<'_>> {
    let mut reader = Reader::new(payload);
    if reader.remaining() < INFO_FIXED_LEN {
        return Err(invalid("info block too short"));
    }
    let size = reader.i16()?;
    let flags = reader.u8()?;
    // charset, stretch_h, aa, padding, spacing, outline
    reader.bytes(INFO_FIXED_LEN - 3)?;

    let rest = reader.bytes(reader.remaining())?;
    let name = match rest.iter().position(|&b| b == 0) {
        Some(end) => &rest[..end],
        None => rest,
    };

    Ok(InfoBlock { size, flags, name })
}

fn parse_common(payload: &[u8]) -> Result<CommonBlock> {
    if payload.len() < COMMON_LEN {
        return Err(invalid("common block too short"));
    }
    let mut reader = Reader::new(payload);
    Ok(CommonBlock {
        line_height: reader.u16()?,
        base: reader.u16()?,
        scale_w: reader.u16()?,
        scale_h: reader.u16()?,
        pages: reader.u16()?,
    })
}

fn parse_char(reader: &mut Reader<'_>) -> Result<CharRecord> {
    let record = CharRecord {
        id: reader.u32()?,
        x: reader.u16()?,
        y: reader.u16()?,
        width: reader.u16()?,
        height: reader.u16()?,
        x_offset: reader.i16()?,
        y_offset: reader.i16()?,
        advance: reader.i16()?,
        page: reader.u8()?,
    };
    // channel
    reader.u8()?;
    Ok(record)
}

fn parse_atlas(payload: &[u8]) -> Result<AtlasBlock<'_>> {
    let mut reader = Reader::new(payload);
    if reader.remaining() < ATLAS_FIXED_LEN {
        return Err(invalid("atlas block too short"));
    }

    let code = reader.u8()?;
    let format = PixelFormat::from_code(code)
        .filter(|f| f.is_indexed())
        .ok_or_else(|| invalid(format!("unsupported atlas pixel format {}", code)))?;
    let width = reader.u16()?;
    let height = reader.u16()?;
    for (name, size) in [("width", width), ("height", height)] {
        if !size.is_power_of_two() || !(MIN_ATLAS_SIZE..=MAX_ATLAS_SIZE).contains(&size) {
            return Err(invalid(format!(
                "atlas {} {} is not a power of two in {}..={}",
                name, size, MIN_ATLAS_SIZE, MAX_ATLAS_SIZE
            )));
        }
    }

    let palette_len = usize::from(reader.u16()?);
    let max_colors = 1usize << format.bits_per_pixel();
    if palette_len == 0 || palette_len > max_colors {
        return Err(invalid(format!(
            "palette of {} entries invalid for {}",
            palette_len, format
        )));
    }
    let palette = reader.bytes(palette_len * 2)?;

    // Atlas dimensions are bounded above, so this cannot overflow.
    let expected = format
        .buffer_len(usize::from(width), usize::from(height))
        .ok_or_else(|| invalid("atlas size overflow"))?;
    if reader.remaining() != expected {
        return Err(invalid(format!(
            "atlas pixel data is {} bytes, expected {}",
            reader.remaining(),
            expected
        )));
    }
    let pixels = reader.bytes(expected)?;

    Ok(AtlasBlock {
        format,
        width,
        height,
        palette,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_bounds() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u16().unwrap(), 0x0201);
        assert_eq!(reader.remaining(), 1);
        assert!(matches!(reader.u16(), Err(FontError::InvalidFontData(_))));
        // A failed read does not consume anything.
        assert_eq!(reader.u8().unwrap(), 0x03);
    }

    #[test]
    fn test_reader_signed() {
        let data = (-5i16).to_le_bytes();
        assert_eq!(Reader::new(&data).i16().unwrap(), -5);
    }

    #[test]
    fn test_parse_rejects_short_header() {
        assert!(matches!(parse(b"BM"), Err(FontError::InvalidFontData(_))));
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        assert!(matches!(
            parse(b"XYZ\x03"),
            Err(FontError::InvalidFontData(_))
        ));
    }

    #[test]
    fn test_parse_rejects_version() {
        assert_eq!(
            parse(b"BMF\x04").err(),
            Some(FontError::FontVersionMismatch {
                found: 4,
                supported: 3
            })
        );
    }

    #[test]
    fn test_parse_rejects_missing_blocks() {
        let err = parse(b"BMF\x03").err().unwrap();
        assert_eq!(err, FontError::InvalidFontData("missing common block".into()));
    }

    #[test]
    fn test_parse_rejects_block_past_end() {
        let mut data = b"BMF\x03".to_vec();
        data.push(BLOCK_COMMON);
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&[0; 15]);
        assert!(matches!(parse(&data), Err(FontError::InvalidFontData(_))));
    }

    #[test]
    fn test_parse_char_record() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x41u32.to_le_bytes());
        for v in [1u16, 2, 3, 4] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in [-1i16, 2, 5] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 15]);

        let record = parse_char(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(record.id, 0x41);
        assert_eq!((record.x, record.y, record.width, record.height), (1, 2, 3, 4));
        assert_eq!(record.x_offset, -1);
        assert_eq!(record.advance, 5);
    }

    #[test]
    fn test_parse_info_name() {
        let mut payload = vec![0u8; INFO_FIXED_LEN];
        payload[2] = 0b1000_0000;
        payload.extend_from_slice(b"Sans\0junk");
        let info = parse_info(&payload).unwrap();
        assert_eq!(info.name, b"Sans");
        assert_eq!(info.flags, 0b1000_0000);
    }
}
