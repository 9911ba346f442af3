pub mod cli;
pub mod config;
pub mod error;
pub mod font;
pub mod render;
pub mod text;

pub use error::{FontError, Result};
pub use font::{FontResource, Glyph, LoadOptions};
pub use render::{
    bake, render_immediate, render_immediate_into, BakedTexture, PixelFormat, Quad, Translucency,
};
pub use text::{measure, TextBounds, TextLayout};
