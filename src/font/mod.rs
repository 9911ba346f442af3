mod builder;
pub mod format;
mod index;
mod resource;

pub use builder::FontBuilder;
pub use index::{GlyphIndex, Resolved};
pub use resource::{Atlas, FaceFlags, FontResource, Glyph, LoadOptions};
