use std::io::{Cursor, Write};

use tracing::debug;

use crate::raw_video::codec::{BGRA_CHANNELS, bgra_len};
use crate::raw_video::common::error::ExportError;
use crate::raw_video::export::exporter::FrameExporter;
use crate::raw_video::export::types::{ExportConfig, TiffCompression};
use crate::raw_video::playback::DecodedFrame;

/// Writes frames as 8-bit RGBA TIFF images.
pub struct TiffFrameExporter;

impl FrameExporter for TiffFrameExporter {
    fn export(
        &self,
        frame: &DecodedFrame,
        output: &mut dyn Write,
        config: &ExportConfig,
    ) -> Result<(), ExportError> {
        let expected = bgra_len(frame.width, frame.height);
        if frame.pixels.len() != expected {
            return Err(ExportError::FrameSize {
                expected,
                actual: frame.pixels.len(),
            });
        }
        debug!(
            "Encoding TIFF image: {}x{} (frame {})",
            frame.width, frame.height, frame.index
        );

        let rgba = bgra_to_rgba(&frame.pixels);
        let mut buffer = Vec::new();

        let mut encoder = tiff::encoder::TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| ExportError::Encode(e.to_string()))?
            .with_compression(config.compression.to_tiff());
        if config.predictor && config.compression != TiffCompression::None {
            encoder = encoder.with_predictor(tiff::tags::Predictor::Horizontal);
        }

        encoder
            .write_image::<tiff::encoder::colortype::RGBA8>(frame.width, frame.height, &rgba)
            .map_err(|e| ExportError::Encode(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!(bytes = buffer.len(), "TIFF encoding complete");
        Ok(())
    }
}

fn bgra_to_rgba(bgra: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(bgra.len());
    for px in bgra.chunks_exact(BGRA_CHANNELS) {
        rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }
    rgba
}
