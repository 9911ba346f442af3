use std::fmt;
use std::str::FromStr;

use crate::error::{FontError, Result};

/// Texture pixel formats understood by the target hardware.
///
/// The numeric codes match the hardware texture-format field and are what the
/// font binary stores for its atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3-bit alpha, 5-bit palette index.
    A3I5,
    /// 16-colour palette, two pixels per byte (low nibble first).
    Indexed4,
    /// 256-colour palette.
    Indexed8,
    /// 5-bit alpha, 3-bit palette index.
    A5I3,
    /// ARGB1555, little-endian.
    Direct,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 5] = [
        PixelFormat::A3I5,
        PixelFormat::Indexed4,
        PixelFormat::Indexed8,
        PixelFormat::A5I3,
        PixelFormat::Direct,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::A3I5),
            3 => Some(Self::Indexed4),
            4 => Some(Self::Indexed8),
            6 => Some(Self::A5I3),
            7 => Some(Self::Direct),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::A3I5 => 1,
            Self::Indexed4 => 3,
            Self::Indexed8 => 4,
            Self::A5I3 => 6,
            Self::Direct => 7,
        }
    }

    pub fn bits_per_pixel(self) -> usize {
        match self {
            Self::Indexed4 => 4,
            Self::A3I5 | Self::Indexed8 | Self::A5I3 => 8,
            Self::Direct => 16,
        }
    }

    /// Plain palette formats usable as a font atlas source.
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Indexed4 | Self::Indexed8)
    }

    /// Number of bytes for a `width` x `height` image, or `None` on overflow.
    pub fn buffer_len(self, width: usize, height: usize) -> Option<usize> {
        width
            .checked_mul(height)?
            .checked_mul(self.bits_per_pixel())
            .map(|bits| bits.div_ceil(8))
    }

    /// Reads the palette index at (x, y). Only meaningful for indexed formats.
    pub(crate) fn read_index(self, data: &[u8], width: usize, x: usize, y: usize) -> u8 {
        let pixel = y * width + x;
        match self {
            Self::Indexed4 => {
                let byte = data[pixel / 2];
                if pixel % 2 == 0 {
                    byte & 0x0F
                } else {
                    byte >> 4
                }
            }
            Self::Direct => 0,
            _ => data[pixel],
        }
    }

    pub(crate) fn write(self, data: &mut [u8], width: usize, x: usize, y: usize, value: u16) {
        let pixel = y * width + x;
        match self {
            Self::Indexed4 => {
                let byte = &mut data[pixel / 2];
                let nibble = (value & 0x0F) as u8;
                if pixel % 2 == 0 {
                    *byte = (*byte & 0xF0) | nibble;
                } else {
                    *byte = (*byte & 0x0F) | (nibble << 4);
                }
            }
            Self::Direct => {
                let bytes = value.to_le_bytes();
                data[pixel * 2] = bytes[0];
                data[pixel * 2 + 1] = bytes[1];
            }
            _ => data[pixel] = value as u8,
        }
    }

    /// Looks up the conversion from `self` (an atlas format) to `target`.
    ///
    /// Returns `None` for pairs outside the conversion table.
    pub fn conversion_to(self, target: PixelFormat) -> Option<Conversion> {
        use PixelFormat::*;
        match (self, target) {
            (Indexed4, Indexed4) | (Indexed8, Indexed8) => Some(Conversion::Copy),
            (Indexed4, Indexed8) => Some(Conversion::Widen),
            (Indexed4, A3I5) => Some(Conversion::WithAlpha {
                alpha: 7,
                index_bits: 5,
            }),
            (Indexed8, A3I5) => Some(Conversion::WithAlpha {
                alpha: 7,
                index_bits: 5,
            }),
            (Indexed4, A5I3) => Some(Conversion::WithAlpha {
                alpha: 31,
                index_bits: 3,
            }),
            (Indexed4, Direct) | (Indexed8, Direct) => Some(Conversion::Palette),
            _ => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A3I5 => "a3i5",
            Self::Indexed4 => "i4",
            Self::Indexed8 => "i8",
            Self::A5I3 => "a5i3",
            Self::Direct => "direct",
        };
        f.write_str(name)
    }
}

impl FromStr for PixelFormat {
    type Err = FontError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a3i5" => Ok(Self::A3I5),
            "i4" | "indexed4" | "rgb16" => Ok(Self::Indexed4),
            "i8" | "indexed8" | "rgb256" => Ok(Self::Indexed8),
            "a5i3" => Ok(Self::A5I3),
            "direct" | "rgba" => Ok(Self::Direct),
            other => Err(FontError::InvalidArgument(format!(
                "unknown pixel format '{}'",
                other
            ))),
        }
    }
}

/// One entry of the atlas-to-output conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Copy,
    Widen,
    /// Index stored in the low `index_bits`, `alpha` in the remaining bits.
    WithAlpha { alpha: u8, index_bits: u8 },
    /// Palette lookup into ARGB1555.
    Palette,
}

impl Conversion {
    /// Converts a non-zero source index into the output pixel value.
    ///
    /// Index 0 is the transparent key and is handled by the caller.
    pub fn apply(self, index: u8, palette: &[u16]) -> Result<u16> {
        match self {
            Conversion::Copy | Conversion::Widen => Ok(u16::from(index)),
            Conversion::WithAlpha { alpha, index_bits } => {
                let max = (1u16 << index_bits) - 1;
                if u16::from(index) > max {
                    return Err(FontError::InvalidArgument(format!(
                        "palette index {} does not fit in {} bits",
                        index, index_bits
                    )));
                }
                Ok((u16::from(alpha) << index_bits) | u16::from(index))
            }
            Conversion::Palette => palette
                .get(usize::from(index))
                .map(|color| (color & 0x7FFF) | 0x8000)
                .ok_or_else(|| {
                    FontError::InvalidFontData(format!(
                        "pixel index {} outside palette of {} entries",
                        index,
                        palette.len()
                    ))
                }),
        }
    }
}
