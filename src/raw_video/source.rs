//! Raw frame source module
//!
//! Seek-and-read access to the fixed-size frames of a headerless raw stream.

mod frame_source;
mod stream;

pub use frame_source::FrameSource;
pub use stream::FrameStream;
