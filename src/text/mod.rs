mod decoder;
mod layout;

pub use decoder::{decode, CharKind, DecodedChar, Decoder};
pub use layout::{
    measure, placements, LineLayout, Placement, Placements, TextBounds, TextLayout,
};
