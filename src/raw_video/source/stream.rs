use std::io::{Read, Seek, SeekFrom};

/// Random-access byte storage a [`FrameSource`](super::FrameSource) can read
/// frames from. Implemented for every `Read + Seek` type that can move to a
/// playback worker.
pub trait FrameStream: Read + Seek + Send + 'static {}

impl<T: Read + Seek + Send + 'static> FrameStream for T {}

/// Measures the stream and rewinds it to the start.
pub(crate) fn measure<S: Seek>(stream: &mut S) -> std::io::Result<u64> {
    let len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(0))?;
    Ok(len)
}
