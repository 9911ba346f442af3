use std::collections::TryReserveError;

/// Errors reported by font loading and texture baking.
///
/// Malformed *text* never produces one of these: invalid UTF-8 and missing
/// glyphs are recovered by substitution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FontError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid font data: {0}")]
    InvalidFontData(String),

    #[error("Unsupported font version {found} (supported: {supported})")]
    FontVersionMismatch { found: u8, supported: u8 },

    #[error("Out of memory")]
    OutOfMemory,
}

impl From<TryReserveError> for FontError {
    fn from(_: TryReserveError) -> Self {
        FontError::OutOfMemory
    }
}

pub type Result<T> = std::result::Result<T, FontError>;
