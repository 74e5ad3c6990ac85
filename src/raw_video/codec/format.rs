use std::fmt;
use std::str::FromStr;

use crate::raw_video::common::error::ConfigError;

/// Layout of one headerless raw frame.
///
/// The frame byte size depends on `(width, height)` only; the codec never
/// inspects content to infer a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luma only.
    Gray,
    /// Planar Y, then quarter-size U and V planes (I420).
    Yuv420,
    /// Planar Y, U, V at full resolution.
    Yuv444,
    /// Interleaved R, G, B.
    Rgb24,
    /// Interleaved B, G, R.
    Bgr24,
    /// Planar Y, then one half-height plane of interleaved U,V pairs.
    Nv12,
    /// Like `Nv12` with V,U pairs.
    Nv21,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 7] = [
        PixelFormat::Bgr24,
        PixelFormat::Nv12,
        PixelFormat::Nv21,
        PixelFormat::Rgb24,
        PixelFormat::Gray,
        PixelFormat::Yuv420,
        PixelFormat::Yuv444,
    ];

    /// Bytes occupied by one frame of this layout.
    ///
    /// Saturates at `usize::MAX` for geometries no address space can hold, so
    /// such a frame never fits in a stream.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        let pixels = (width as usize).saturating_mul(height as usize);
        match self {
            PixelFormat::Gray => pixels,
            PixelFormat::Yuv420 | PixelFormat::Nv12 | PixelFormat::Nv21 => {
                (pixels / 2).saturating_mul(3).saturating_add(pixels % 2)
            }
            PixelFormat::Yuv444 | PixelFormat::Rgb24 | PixelFormat::Bgr24 => {
                pixels.saturating_mul(3)
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Gray => "Y",
            PixelFormat::Yuv420 => "YUV420",
            PixelFormat::Yuv444 => "YUV444",
            PixelFormat::Rgb24 => "RGB24",
            PixelFormat::Bgr24 => "BGR24",
            PixelFormat::Nv12 => "NV12",
            PixelFormat::Nv21 => "NV21",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Y" | "GRAY" => Ok(PixelFormat::Gray),
            "YUV420" | "I420" => Ok(PixelFormat::Yuv420),
            "YUV444" => Ok(PixelFormat::Yuv444),
            "RGB24" => Ok(PixelFormat::Rgb24),
            "BGR24" => Ok(PixelFormat::Bgr24),
            "NV12" => Ok(PixelFormat::Nv12),
            "NV21" => Ok(PixelFormat::Nv21),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}
