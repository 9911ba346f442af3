use serde::Deserialize;

use crate::error::{FontError, Result};
use crate::font::FontResource;
use crate::text::{measure, placements};

use super::pixel::PixelFormat;

pub const DEFAULT_MIN_TEXTURE_SIZE: u16 = 8;
pub const DEFAULT_MAX_TEXTURE_SIZE: u16 = 1024;

/// Texture dimension limits of the target hardware.
///
/// Read from the `[texture]` config table; missing keys take the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TextureLimits {
    pub min_size: u16,
    pub max_size: u16,
}

impl Default for TextureLimits {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_TEXTURE_SIZE,
            max_size: DEFAULT_MAX_TEXTURE_SIZE,
        }
    }
}

impl TextureLimits {
    pub fn validate(&self) -> Result<()> {
        if !self.min_size.is_power_of_two() || !self.max_size.is_power_of_two() {
            return Err(FontError::InvalidArgument(format!(
                "texture limits {}..={} must be powers of two",
                self.min_size, self.max_size
            )));
        }
        if self.min_size > self.max_size {
            return Err(FontError::InvalidArgument(format!(
                "minimum texture size {} exceeds maximum {}",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }

    /// Smallest allowed power of two covering `content` pixels.
    pub fn padded(&self, content: u32) -> u32 {
        content
            .max(1)
            .next_power_of_two()
            .max(u32::from(self.min_size))
    }

    fn check_request(&self, name: &str, size: u32) -> Result<()> {
        let range = u32::from(self.min_size)..=u32::from(self.max_size);
        if !size.is_power_of_two() || !range.contains(&size) {
            return Err(FontError::InvalidArgument(format!(
                "maximum {} {} is not a power of two in {}..={}",
                name, size, self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

/// A string pre-rendered into a single texture.
///
/// The buffer belongs to the caller; dropping the value (or taking the data
/// with [`BakedTexture::into_data`]) releases it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedTexture {
    format: PixelFormat,
    width: u32,
    height: u32,
    content_width: u32,
    content_height: u32,
    data: Vec<u8>,
}

impl BakedTexture {
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Texture width: a power of two.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Texture height: a power of two.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width of the rendered text before padding.
    pub fn content_width(&self) -> u32 {
        self.content_width
    }

    /// Height of the rendered text before padding.
    pub fn content_height(&self) -> u32 {
        self.content_height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Palette index (or raw ARGB1555 value for direct textures) at (x, y),
    /// or `None` outside the texture.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let (x, y, width) = (x as usize, y as usize, self.width as usize);
        let value = match self.format {
            PixelFormat::Direct => {
                let i = (y * width + x) * 2;
                u16::from_le_bytes([self.data[i], self.data[i + 1]])
            }
            format => u16::from(format.read_index(&self.data, width, x, y)),
        };
        Some(value)
    }
}

/// Renders whole strings into power-of-two textures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Baker {
    limits: TextureLimits,
}

impl Baker {
    pub fn new(limits: TextureLimits) -> Result<Self> {
        limits.validate()?;
        Ok(Self { limits })
    }

    pub fn limits(&self) -> TextureLimits {
        self.limits
    }

    /// Bakes `text` into a new texture in `format`.
    ///
    /// `max_width` and `max_height` bound the texture and must themselves be
    /// valid texture sizes. Content that does not fit fails with
    /// `InvalidArgument` before anything is allocated; the texture buffer is
    /// the only allocation.
    pub fn bake(
        &self,
        font: &FontResource,
        text: &[u8],
        format: PixelFormat,
        max_width: u32,
        max_height: u32,
    ) -> Result<BakedTexture> {
        self.limits.check_request("width", max_width)?;
        self.limits.check_request("height", max_height)?;

        let atlas = font.atlas();
        let conversion = atlas.format().conversion_to(format).ok_or_else(|| {
            FontError::InvalidArgument(format!(
                "cannot convert {} atlas to {} texture",
                atlas.format(),
                format
            ))
        })?;

        let bounds = measure(font, text);
        if bounds.width > max_width || bounds.height > max_height {
            return Err(FontError::InvalidArgument(format!(
                "text of {}x{} pixels does not fit in {}x{}",
                bounds.width, bounds.height, max_width, max_height
            )));
        }

        let width = self.limits.padded(bounds.width);
        let height = self.limits.padded(bounds.height);
        let len = format
            .buffer_len(width as usize, height as usize)
            .ok_or(FontError::OutOfMemory)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0);

        let clip_w = bounds.width as i32;
        let clip_h = bounds.height as i32;
        for placement in placements(font, text) {
            let glyph = placement.glyph;
            let left = placement.pen_x.saturating_add(i32::from(glyph.x_offset));
            let top = placement.pen_y.saturating_add(i32::from(glyph.y_offset));

            for gy in 0..usize::from(glyph.height) {
                let dy = top + gy as i32;
                if dy < 0 || dy >= clip_h {
                    continue;
                }
                for gx in 0..usize::from(glyph.width) {
                    let dx = left + gx as i32;
                    if dx < 0 || dx >= clip_w {
                        continue;
                    }
                    let index =
                        atlas.index_at(usize::from(glyph.x) + gx, usize::from(glyph.y) + gy);
                    // Index 0 is the transparent key.
                    if index == 0 {
                        continue;
                    }
                    let value = conversion.apply(index, atlas.palette())?;
                    format.write(&mut data, width as usize, dx as usize, dy as usize, value);
                }
            }
        }

        log::debug!(
            "Baked {}x{} text into {}x{} {} texture ({} bytes)",
            bounds.width,
            bounds.height,
            width,
            height,
            format,
            data.len()
        );

        Ok(BakedTexture {
            format,
            width,
            height,
            content_width: bounds.width,
            content_height: bounds.height,
            data,
        })
    }
}
