//! Raw video playback module
//!
//! Decodes headerless raw video streams (planar, semi-planar and packed pixel
//! layouts) into BGRA frames, with single-frame seeking and paced continuous
//! playback on a background worker.

pub mod codec;
pub mod common;
pub mod export;
pub mod playback;
pub mod source;

pub use common::{
    ConfigError, DecodeError, ExportError, PlaybackError, Result, SourceError, MAX_DIMENSION,
};

pub use codec::{BGRA_CHANNELS, PixelFormat, bgra_len, yuv_to_bgra};

pub use source::{FrameSource, FrameStream};

pub use playback::{
    ChannelSink, DecodedFrame, FrameSink, PlaybackConfig, PlaybackConfigBuilder, PlaybackEvent,
    PlaybackScheduler, PlaybackSession, PlaybackState, PlaybackStats, SessionId, StepTiming,
    StopReason,
};

pub use export::{ExportConfig, ExportConfigBuilder, FrameExporter, TiffCompression, TiffFrameExporter};
