use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::debug;

use crate::raw_video::playback::types::{DecodedFrame, SessionId, StopReason};

/// Receiver of decoded frames, owned by the presentation layer.
///
/// Called from the playback worker thread. Frames of one session arrive in
/// strictly increasing index order, followed by exactly one `stopped` call.
pub trait FrameSink: Send + Sync + 'static {
    fn deliver(&self, frame: DecodedFrame);

    fn stopped(&self, session: SessionId, reason: StopReason) {
        debug!(%session, ?reason, "Playback stopped");
    }
}

/// Sink notifications in delivery order.
#[derive(Debug)]
pub enum PlaybackEvent {
    Frame(DecodedFrame),
    Stopped {
        session: SessionId,
        reason: StopReason,
    },
}

/// Forwards everything to a channel so a UI loop can poll for new frames.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    events: Sender<PlaybackEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<PlaybackEvent>) {
        let (events, receiver) = unbounded();
        (Self { events }, receiver)
    }
}

impl FrameSink for ChannelSink {
    fn deliver(&self, frame: DecodedFrame) {
        // A dropped receiver means nobody is displaying anymore.
        let _ = self.events.send(PlaybackEvent::Frame(frame));
    }

    fn stopped(&self, session: SessionId, reason: StopReason) {
        let _ = self.events.send(PlaybackEvent::Stopped { session, reason });
    }
}
