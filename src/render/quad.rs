use bytemuck::{Pod, Zeroable};

use crate::error::{FontError, Result};
use crate::font::Atlas;
use crate::text::{LineLayout, Placement};

pub const MAX_ALPHA: u8 = 31;
pub const MAX_POLYGON_ID: u8 = 63;

pub const FLAG_TRANSLUCENT: u8 = 1;
pub const FLAG_SUBSTITUTED: u8 = 2;

/// Alpha and polygon ID applied to every quad of one draw.
///
/// The hardware only blends overlapping translucent polygons correctly when
/// they are submitted in a manual order with distinct polygon IDs. Quads are
/// never sorted here; assigning IDs and ordering draws is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Translucency {
    alpha: u8,
    polygon_id: u8,
}

impl Translucency {
    /// `alpha` is 0..=31, `polygon_id` is 0..=63.
    pub fn new(alpha: u8, polygon_id: u8) -> Result<Self> {
        if alpha > MAX_ALPHA {
            return Err(FontError::InvalidArgument(format!(
                "alpha {} out of range 0..={}",
                alpha, MAX_ALPHA
            )));
        }
        if polygon_id > MAX_POLYGON_ID {
            return Err(FontError::InvalidArgument(format!(
                "polygon id {} out of range 0..={}",
                polygon_id, MAX_POLYGON_ID
            )));
        }
        Ok(Self { alpha, polygon_id })
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn polygon_id(&self) -> u8 {
        self.polygon_id
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Output-space position in pixels.
    pub position: [i32; 3],
    /// Texture coordinates normalized to the atlas size.
    pub texcoord: [f32; 2],
}

impl Vertex {
    /// Position packed the way 16-bit vertex registers take it (low 16 bits).
    pub fn position_v16(&self) -> [i16; 3] {
        self.position.map(|v| v as i16)
    }

    /// Texture coordinates in 12.4 fixed-point texels of an atlas of the
    /// given size.
    pub fn texcoord_t16(&self, atlas_width: u16, atlas_height: u16) -> [i16; 2] {
        let texel = |t: f32, size: u16| (t * f32::from(size) * 16.0).round() as i16;
        [
            texel(self.texcoord[0], atlas_width),
            texel(self.texcoord[1], atlas_height),
        ]
    }
}

/// A textured quad. Vertices run up-left, down-left, down-right, up-right.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Quad {
    pub vertices: [Vertex; 4],
    pub alpha: u8,
    pub polygon_id: u8,
    pub flags: u8,
    _padding: u8,
}

impl Quad {
    pub const UP_LEFT: usize = 0;
    pub const DOWN_LEFT: usize = 1;
    pub const DOWN_RIGHT: usize = 2;
    pub const UP_RIGHT: usize = 3;

    pub fn new(
        position: [i32; 3],
        size: [i32; 2],
        uv: [f32; 2],
        uv_size: [f32; 2],
        translucency: Option<Translucency>,
    ) -> Self {
        let [x, y, z] = position;
        let [w, h] = size;
        let [u0, v0] = uv;
        let (u1, v1) = (u0 + uv_size[0], v0 + uv_size[1]);
        let (right, bottom) = (x.saturating_add(w), y.saturating_add(h));

        let vertex = |px, py, u, v| Vertex {
            position: [px, py, z],
            texcoord: [u, v],
        };

        let (alpha, polygon_id, flags) = match translucency {
            Some(t) => (t.alpha, t.polygon_id, FLAG_TRANSLUCENT),
            None => (MAX_ALPHA, 0, 0),
        };

        Self {
            vertices: [
                vertex(x, y, u0, v0),
                vertex(x, bottom, u0, v1),
                vertex(right, bottom, u1, v1),
                vertex(right, y, u1, v0),
            ],
            alpha,
            polygon_id,
            flags,
            _padding: 0,
        }
    }

    /// Top-left corner in output space.
    pub fn origin(&self) -> [i32; 3] {
        self.vertices[Self::UP_LEFT].position
    }

    /// Width and height; smaller than the glyph when clamped at the edge of
    /// the `i32` range.
    pub fn size(&self) -> [i32; 2] {
        let ul = self.vertices[Self::UP_LEFT].position;
        let dr = self.vertices[Self::DOWN_RIGHT].position;
        [dr[0].saturating_sub(ul[0]), dr[1].saturating_sub(ul[1])]
    }

    pub fn translucency(&self) -> Option<Translucency> {
        (self.flags & FLAG_TRANSLUCENT != 0).then_some(Translucency {
            alpha: self.alpha,
            polygon_id: self.polygon_id,
        })
    }

    /// Whether this quad draws the fallback glyph for a missing character.
    pub fn is_substituted(&self) -> bool {
        self.flags & FLAG_SUBSTITUTED != 0
    }
}

/// Turns glyph placements into quads at an output-space origin.
///
/// Emission is pure: no GPU calls, no state kept between calls.
#[derive(Debug, Clone, Copy)]
pub struct QuadEmitter {
    origin: [i32; 3],
    atlas_width: f32,
    atlas_height: f32,
    translucency: Option<Translucency>,
}

impl QuadEmitter {
    pub fn new(atlas: &Atlas, origin: [i32; 3], translucency: Option<Translucency>) -> Self {
        Self {
            origin,
            atlas_width: f32::from(atlas.width()),
            atlas_height: f32::from(atlas.height()),
            translucency,
        }
    }

    /// Quad for one placement, or `None` for glyphs without pixels.
    pub fn quad(&self, placement: &Placement<'_>) -> Option<Quad> {
        let glyph = placement.glyph;
        if glyph.is_blank() {
            return None;
        }

        let [ox, oy, oz] = self.origin;
        let x = ox
            .saturating_add(placement.pen_x)
            .saturating_add(i32::from(glyph.x_offset));
        let y = oy
            .saturating_add(placement.pen_y)
            .saturating_add(i32::from(glyph.y_offset));

        let mut quad = Quad::new(
            [x, y, oz],
            [i32::from(glyph.width), i32::from(glyph.height)],
            [
                f32::from(glyph.x) / self.atlas_width,
                f32::from(glyph.y) / self.atlas_height,
            ],
            [
                f32::from(glyph.width) / self.atlas_width,
                f32::from(glyph.height) / self.atlas_height,
            ],
            self.translucency,
        );
        if placement.substituted {
            quad.flags |= FLAG_SUBSTITUTED;
        }
        Some(quad)
    }

    /// Emits quads for `placements` in order.
    pub fn emit<I: IntoIterator>(self, placements: I) -> Quads<I::IntoIter> {
        Quads {
            emitter: self,
            placements: placements.into_iter(),
        }
    }

    /// Emits quads for laid-out lines in order.
    pub fn emit_lines<'a, 'f: 'a>(
        self,
        lines: &'a [LineLayout<'f>],
    ) -> Quads<impl Iterator<Item = Placement<'f>> + 'a> {
        self.emit(lines.iter().flat_map(|line| line.placements.iter()).copied())
    }
}

/// Lazy quad stream produced by [`QuadEmitter::emit`].
pub struct Quads<I> {
    emitter: QuadEmitter,
    placements: I,
}

impl<'f, I> Iterator for Quads<I>
where
    I: Iterator<Item = Placement<'f>>,
{
    type Item = Quad;

    fn next(&mut self) -> Option<Quad> {
        loop {
            let placement = self.placements.next()?;
            if let Some(quad) = self.emitter.quad(&placement) {
                return Some(quad);
            }
        }
    }
}
