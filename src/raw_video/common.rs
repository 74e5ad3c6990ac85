//! Common utilities module
//!
//! Error types and limits shared by the codec, source and playback modules.

pub mod error;

pub use error::{ConfigError, DecodeError, ExportError, PlaybackError, Result, SourceError};

/// Largest accepted frame width or height.
pub const MAX_DIMENSION: u32 = 65535;

/// Checks that a frame geometry is usable.
pub fn validate_dimensions(width: u32, height: u32) -> std::result::Result<(), ConfigError> {
    if width == 0 || height == 0 {
        return Err(ConfigError::InvalidDimensions(width, height));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ConfigError::DimensionsTooLarge(width, height));
    }
    Ok(())
}
