//! Raw frame to BGRA conversion.
//!
//! Every layout writes the same destination order: `B, G, R, A` per pixel with
//! `A = 255`. Chroma-bearing layouts and grayscale funnel through
//! [`yuv_to_bgra`]; the packed RGB layouts copy channels directly.

use crate::raw_video::codec::format::PixelFormat;
use crate::raw_video::common::error::DecodeError;

/// Bytes per destination pixel.
pub const BGRA_CHANNELS: usize = 4;

const CHROMA_ZERO: f32 = 128.0;
const R_FROM_V: f32 = 1.370705;
const G_FROM_U: f32 = 0.337633;
const G_FROM_V: f32 = 0.698001;
const B_FROM_U: f32 = 1.732446;

/// Size of the BGRA buffer for a `width x height` frame.
pub fn bgra_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(BGRA_CHANNELS)
}

/// Converts one luma/chroma triple and stores it as `B, G, R, 255` in `px`.
#[inline]
pub fn yuv_to_bgra(y: u8, u: u8, v: u8, px: &mut [u8]) {
    let y = y as f32;
    let u = u as f32 - CHROMA_ZERO;
    let v = v as f32 - CHROMA_ZERO;

    let r = y + R_FROM_V * v;
    let g = y - G_FROM_U * u - G_FROM_V * v;
    let b = y + B_FROM_U * u;

    px[0] = to_channel(b);
    px[1] = to_channel(g);
    px[2] = to_channel(r);
    px[3] = u8::MAX;
}

#[inline]
fn to_channel(value: f32) -> u8 {
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

impl PixelFormat {
    /// Smallest raw slice the conversion may index into.
    ///
    /// Equals [`PixelFormat::frame_size`] for even dimensions. Odd widths or
    /// heights push the subsampled chroma addresses past the nominal frame
    /// size, in which case the larger value is returned.
    pub fn required_len(self, width: u32, height: u32) -> usize {
        let frame_size = self.frame_size(width, height);
        if width == 0 || height == 0 {
            return frame_size;
        }
        let (w, h) = (width as usize, height as usize);
        let luma_len = w.saturating_mul(h);
        let (row_offset, last_in_row) = match self {
            PixelFormat::Yuv420 => (((h - 1) / 2).saturating_mul(w / 2), (w - 1) / 2 + luma_len / 4),
            PixelFormat::Nv12 | PixelFormat::Nv21 => (((h - 1) / 2).saturating_mul(w), (w - 1) / 2 * 2 + 1),
            _ => return frame_size,
        };
        let last_chroma = luma_len
            .saturating_add(row_offset)
            .saturating_add(last_in_row);
        frame_size.max(last_chroma.saturating_add(1))
    }

    fn check_raw(self, width: u32, height: u32, raw: &[u8]) -> Result<(), DecodeError> {
        let required = self.required_len(width, height);
        if raw.len() < required {
            return Err(DecodeError::ShortBuffer {
                expected: required,
                actual: raw.len(),
            });
        }
        Ok(())
    }

    /// Converts one raw frame into `dest`, which must hold exactly
    /// `width * height * 4` bytes.
    pub fn convert(
        self,
        width: u32,
        height: u32,
        raw: &[u8],
        dest: &mut [u8],
    ) -> Result<(), DecodeError> {
        self.check_raw(width, height, raw)?;
        let expected = bgra_len(width, height);
        if dest.len() != expected {
            return Err(DecodeError::DestinationSize {
                expected,
                actual: dest.len(),
            });
        }
        if expected == 0 {
            return Ok(());
        }

        let (w, h) = (width as usize, height as usize);
        match self {
            PixelFormat::Gray => convert_gray(w, h, raw, dest),
            PixelFormat::Yuv420 => convert_yuv420(w, h, raw, dest),
            PixelFormat::Yuv444 => convert_yuv444(w, h, raw, dest),
            PixelFormat::Rgb24 => convert_packed(w, h, raw, dest, [2, 1, 0]),
            PixelFormat::Bgr24 => convert_packed(w, h, raw, dest, [0, 1, 2]),
            PixelFormat::Nv12 => convert_semi_planar(w, h, raw, dest, false),
            PixelFormat::Nv21 => convert_semi_planar(w, h, raw, dest, true),
        }
        Ok(())
    }

    /// Allocating variant of [`PixelFormat::convert`].
    pub fn decode(self, width: u32, height: u32, raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
        self.check_raw(width, height, raw)?;
        let mut dest = vec![0u8; bgra_len(width, height)];
        self.convert(width, height, raw, &mut dest)?;
        Ok(dest)
    }
}

fn convert_gray(w: usize, h: usize, raw: &[u8], dest: &mut [u8]) {
    let luma = &raw[..w * h];
    for (px, &y) in dest.chunks_exact_mut(BGRA_CHANNELS).zip(luma) {
        yuv_to_bgra(y, 128, 128, px);
    }
}

fn convert_yuv420(w: usize, h: usize, raw: &[u8], dest: &mut [u8]) {
    let luma_len = w * h;
    let v_plane_offset = luma_len / 4;
    for (r, row) in dest.chunks_exact_mut(w * BGRA_CHANNELS).take(h).enumerate() {
        let luma_row = r * w;
        let chroma_row = luma_len + (r / 2) * (w / 2);
        for (c, px) in row.chunks_exact_mut(BGRA_CHANNELS).enumerate() {
            let u = chroma_row + c / 2;
            yuv_to_bgra(raw[luma_row + c], raw[u], raw[u + v_plane_offset], px);
        }
    }
}

fn convert_yuv444(w: usize, h: usize, raw: &[u8], dest: &mut [u8]) {
    let plane = w * h;
    let (luma, chroma) = raw.split_at(plane);
    let (u_plane, v_plane) = chroma.split_at(plane);
    for (i, px) in dest.chunks_exact_mut(BGRA_CHANNELS).enumerate() {
        yuv_to_bgra(luma[i], u_plane[i], v_plane[i], px);
    }
}

/// Copies interleaved 3-byte pixels; `order` maps destination B,G,R to the
/// source byte offsets within a pixel.
fn convert_packed(w: usize, h: usize, raw: &[u8], dest: &mut [u8], order: [usize; 3]) {
    let packed = &raw[..w * h * 3];
    for (px, src) in dest
        .chunks_exact_mut(BGRA_CHANNELS)
        .zip(packed.chunks_exact(3))
    {
        px[0] = src[order[0]];
        px[1] = src[order[1]];
        px[2] = src[order[2]];
        px[3] = u8::MAX;
    }
}

fn convert_semi_planar(w: usize, h: usize, raw: &[u8], dest: &mut [u8], v_first: bool) {
    let luma_len = w * h;
    for (r, row) in dest.chunks_exact_mut(w * BGRA_CHANNELS).take(h).enumerate() {
        let luma_row = r * w;
        let chroma_row = luma_len + (r / 2) * w;
        for (c, px) in row.chunks_exact_mut(BGRA_CHANNELS).enumerate() {
            let pair = chroma_row + (c / 2) * 2;
            let (u, v) = if v_first {
                (raw[pair + 1], raw[pair])
            } else {
                (raw[pair], raw[pair + 1])
            };
            yuv_to_bgra(raw[luma_row + c], u, v, px);
        }
    }
}
