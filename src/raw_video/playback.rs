//! Playback scheduling module
//!
//! Single-frame and continuous decode sessions on a background worker, with
//! cooperative cancellation and deadline-based frame pacing.

mod pacing;
mod scheduler;
pub mod sink;
mod timing;
pub mod types;
mod worker;

#[cfg(test)]
mod tests;

pub use scheduler::PlaybackScheduler;
pub use sink::{ChannelSink, FrameSink, PlaybackEvent};
pub use timing::{PlaybackStats, StepTiming};
pub use types::{
    DecodedFrame, PlaybackConfig, PlaybackConfigBuilder, PlaybackSession, PlaybackState,
    SessionId, StopReason,
};
