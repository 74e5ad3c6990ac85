use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::instrument;

use crate::raw_video::common::error::ExportError;
use crate::raw_video::export::types::ExportConfig;
use crate::raw_video::playback::DecodedFrame;

pub trait FrameExporter {
    fn export(
        &self,
        frame: &DecodedFrame,
        output: &mut dyn Write,
        config: &ExportConfig,
    ) -> Result<(), ExportError>;

    /// Creates (or truncates) `path` and exports `frame` into it.
    #[instrument(skip(self, frame, config), fields(index = frame.index))]
    fn export_to_path(
        &self,
        frame: &DecodedFrame,
        path: &Path,
        config: &ExportConfig,
    ) -> Result<(), ExportError> {
        let mut output = BufWriter::new(File::create(path)?);
        self.export(frame, &mut output, config)?;
        output.flush()?;
        Ok(())
    }
}
