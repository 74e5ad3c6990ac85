//! Frame export module
//!
//! Writes decoded BGRA frames to TIFF files with configurable compression.

mod exporter;
mod tiff_exporter;
pub mod types;

pub use exporter::FrameExporter;
pub use tiff_exporter::TiffFrameExporter;
pub use types::{ExportConfig, ExportConfigBuilder, TiffCompression};
