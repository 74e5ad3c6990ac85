use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, instrument};

use crate::raw_video::codec::PixelFormat;
use crate::raw_video::common::error::SourceError;
use crate::raw_video::source::stream::measure;

type Result<T> = std::result::Result<T, SourceError>;

/// Bounds-checked frame reader over a headerless raw stream.
///
/// The frame count is derived from the stream length and the frame size of
/// the configured `(width, height, format)`; it is recomputed whenever any of
/// those change so a read can never be admitted against a stale count.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use rawview::raw_video::{FrameSource, PixelFormat};
///
/// let stream = Cursor::new(vec![0u8; 4 * 2 * 10]);
/// let mut source = FrameSource::open(stream, 4, 2, PixelFormat::Gray).unwrap();
/// assert_eq!(source.frame_count(), 10);
/// assert_eq!(source.read_frame(9).unwrap().len(), 8);
/// assert!(source.read_frame(10).is_err());
/// ```
#[derive(Debug)]
pub struct FrameSource<S> {
    stream: S,
    width: u32,
    height: u32,
    format: PixelFormat,
    stream_len: u64,
    frame_count: u64,
    /// Index of the frame the stream is positioned at.
    cursor: u64,
}

impl FrameSource<BufReader<File>> {
    /// Opens a raw file for frame access.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open_path<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::open(BufReader::new(file), width, height, format)
    }
}

impl<S: Read + Seek> FrameSource<S> {
    pub fn open(mut stream: S, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let stream_len = measure(&mut stream)?;
        let mut source = Self {
            stream,
            width,
            height,
            format,
            stream_len,
            frame_count: 0,
            cursor: 0,
        };
        source.recount();
        debug!(
            stream_len,
            frame_size = source.frame_size(),
            frame_count = source.frame_count,
            "Opened frame source"
        );
        Ok(source)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn stream_len(&self) -> u64 {
        self.stream_len
    }

    pub fn frame_size(&self) -> usize {
        self.format.frame_size(self.width, self.height)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Highest selectable index for display purposes: `frame_count - 1`,
    /// but never below 1, even for an empty stream.
    pub fn max_frame_index(&self) -> u64 {
        self.frame_count.saturating_sub(1).max(1)
    }

    /// Changes the frame geometry and re-derives the frame count.
    ///
    /// The count is recomputed from the last known stream length before the
    /// stream is re-measured, so a failed measurement never leaves a count
    /// taken under the old frame size.
    pub fn reconfigure(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<u64> {
        self.width = width;
        self.height = height;
        self.format = format;
        self.cursor = 0;
        self.recount();
        self.refresh()
    }

    /// Re-measures the stream, picking up files that grew or shrank.
    pub fn refresh(&mut self) -> Result<u64> {
        self.stream_len = measure(&mut self.stream)?;
        self.cursor = 0;
        self.recount();
        Ok(self.frame_count)
    }

    fn recount(&mut self) {
        let frame_size = self.frame_size() as u64;
        self.frame_count = if frame_size == 0 {
            0
        } else {
            self.stream_len / frame_size
        };
    }

    fn check_index(&self, index: u64) -> Result<()> {
        if index >= self.frame_count {
            return Err(SourceError::OutOfRange {
                index,
                frame_count: self.frame_count,
            });
        }
        Ok(())
    }

    /// Positions the stream at the first byte of frame `index`.
    pub fn seek_frame(&mut self, index: u64) -> Result<()> {
        self.check_index(index)?;
        let offset = index * self.frame_size() as u64;
        self.stream.seek(SeekFrom::Start(offset))?;
        self.cursor = index;
        Ok(())
    }

    /// Reads the frame the stream is positioned at into `buf`, resizing it to
    /// exactly one frame. On success the source advances to the next frame.
    pub fn read_into(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let index = self.cursor;
        self.check_index(index)?;

        let expected = self.frame_size();
        buf.resize(expected, 0);
        let mut filled = 0;
        while filled < expected {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled < expected {
            return Err(SourceError::Truncated {
                index,
                expected,
                actual: filled,
            });
        }

        self.cursor = index + 1;
        Ok(())
    }

    pub fn read_frame_into(&mut self, index: u64, buf: &mut Vec<u8>) -> Result<()> {
        self.seek_frame(index)?;
        self.read_into(buf)
    }

    /// Reads exactly one frame's bytes.
    pub fn read_frame(&mut self, index: u64) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.frame_size());
        self.read_frame_into(index, &mut buf)?;
        Ok(buf)
    }

}
