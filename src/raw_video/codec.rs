//! Pixel format codec module
//!
//! Pure per-layout frame sizing and conversion of one raw frame into an
//! interleaved BGRA buffer.

mod convert;
pub mod format;

pub use convert::{BGRA_CHANNELS, bgra_len, yuv_to_bgra};
pub use format::PixelFormat;
