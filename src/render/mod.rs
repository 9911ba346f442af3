//! Output stages: immediate quads and baked textures.
//!
//! Both stages start from the same layout, so a string drawn with
//! [`render_immediate`] and one baked with [`bake`] line up pixel for pixel.

mod bake;
mod pixel;
mod quad;

pub use bake::{
    BakedTexture, Baker, TextureLimits, DEFAULT_MAX_TEXTURE_SIZE, DEFAULT_MIN_TEXTURE_SIZE,
};
pub use pixel::{Conversion, PixelFormat};
pub use quad::{Quad, QuadEmitter, Quads, Translucency, Vertex, MAX_ALPHA, MAX_POLYGON_ID};

use crate::error::Result;
use crate::font::FontResource;
use crate::text::placements;

/// Lays out `text` and returns its quads with the origin at (x, y, z).
pub fn render_immediate(
    font: &FontResource,
    text: impl AsRef<[u8]>,
    x: i32,
    y: i32,
    z: i32,
    translucency: Option<Translucency>,
) -> Vec<Quad> {
    let mut quads = Vec::new();
    render_immediate_into(font, text, x, y, z, translucency, &mut quads);
    quads
}

/// Like [`render_immediate`], but writes into `out`, reusing its capacity.
///
/// `out` is cleared first. Once it has grown to fit the string, repeated
/// calls do not allocate.
pub fn render_immediate_into(
    font: &FontResource,
    text: impl AsRef<[u8]>,
    x: i32,
    y: i32,
    z: i32,
    translucency: Option<Translucency>,
    out: &mut Vec<Quad>,
) {
    out.clear();
    let emitter = QuadEmitter::new(font.atlas(), [x, y, z], translucency);
    out.extend(emitter.emit(placements(font, text.as_ref())));
}

/// Bakes `text` into a caller-owned texture using the default hardware limits.
pub fn bake(
    font: &FontResource,
    text: impl AsRef<[u8]>,
    format: PixelFormat,
    max_width: u32,
    max_height: u32,
) -> Result<BakedTexture> {
    Baker::default().bake(font, text.as_ref(), format, max_width, max_height)
}
