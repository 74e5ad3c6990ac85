use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::raw_video::codec::bgra_len;
use crate::raw_video::common::error::{PlaybackError, Result};
use crate::raw_video::playback::pacing::{FramePacer, PaceOutcome};
use crate::raw_video::playback::sink::FrameSink;
use crate::raw_video::playback::timing::{PlaybackStats, Timer};
use crate::raw_video::playback::types::{
    DecodedFrame, PlaybackSession, PlaybackState, SessionId, StopReason,
};
use crate::raw_video::source::{FrameSource, FrameStream};

/// No session holds the token.
pub(crate) const NO_SESSION: u64 = 0;

/// State shared between the scheduler and its workers.
#[derive(Debug)]
pub(crate) struct SharedState {
    /// Id of the only session allowed to touch the stream or the sink.
    pub(crate) current: AtomicU64,
    /// Index of the last delivered or requested frame.
    pub(crate) position: AtomicU64,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            current: AtomicU64::new(NO_SESSION),
            position: AtomicU64::new(0),
        }
    }
}

enum Outcome {
    Completed,
    EndOfStream,
    Cancelled,
}

/// Decode loop of one session, run on its own thread.
///
/// Owns the raw and destination scratch buffers; only copies of the
/// destination buffer ever leave the worker.
pub(crate) struct SessionWorker<S, K> {
    session: PlaybackSession,
    source: Arc<Mutex<FrameSource<S>>>,
    sink: Arc<K>,
    shared: Arc<SharedState>,
    cancel: Receiver<()>,
    status: Arc<Mutex<PlaybackState>>,
    raw: Vec<u8>,
    dest: Vec<u8>,
    stats: PlaybackStats,
}

impl<S: FrameStream, K: FrameSink> SessionWorker<S, K> {
    pub(crate) fn new(
        session: PlaybackSession,
        source: Arc<Mutex<FrameSource<S>>>,
        sink: Arc<K>,
        shared: Arc<SharedState>,
        cancel: Receiver<()>,
        status: Arc<Mutex<PlaybackState>>,
    ) -> Self {
        let raw = Vec::with_capacity(session.format.frame_size(session.width, session.height));
        let dest = vec![0u8; bgra_len(session.width, session.height)];
        Self {
            session,
            source,
            sink,
            shared,
            cancel,
            status,
            raw,
            dest,
            stats: PlaybackStats::new(),
        }
    }

    fn id(&self) -> SessionId {
        self.session.id
    }

    fn is_current(&self) -> bool {
        self.shared.current.load(Ordering::Acquire) == self.id().get()
    }

    pub(crate) fn run(mut self) -> PlaybackStats {
        let session = self.session;
        info!(
            session = %session.id,
            start = session.start_index,
            continuous = session.continuous,
            format = %session.format,
            width = session.width,
            height = session.height,
            "Session started"
        );

        let result = self.run_session();
        let (reason, final_state) = match result {
            Ok(Outcome::Completed) => (StopReason::Completed, PlaybackState::Idle),
            Ok(Outcome::EndOfStream) => (StopReason::EndOfStream, PlaybackState::Idle),
            Ok(Outcome::Cancelled) => (StopReason::Cancelled, PlaybackState::Cancelled),
            Err(_) if !self.is_current() => (StopReason::Cancelled, PlaybackState::Cancelled),
            Err(err) => {
                match &err {
                    PlaybackError::Decode(e) => error!(session = %session.id, "Decode defect: {}", e),
                    e => warn!(session = %session.id, "Playback stopped: {}", e),
                }
                (StopReason::Failed(err), PlaybackState::Idle)
            }
        };

        *self.status.lock() = final_state;
        info!(
            session = %session.id,
            frames = self.stats.frames_delivered,
            late_frames = self.stats.late_frames,
            "Session ended"
        );
        self.sink.stopped(session.id, reason);
        self.stats
    }

    fn run_session(&mut self) -> Result<Outcome> {
        let mut index = self.session.start_index;
        if !self.decode(index)? || !self.deliver(index) {
            return Ok(Outcome::Cancelled);
        }
        if !self.session.continuous {
            return Ok(Outcome::Completed);
        }

        let mut pacer = FramePacer::new(self.session.frame_interval());
        while index < self.session.last_index() {
            pacer.arm();
            index += 1;
            if !self.decode(index)? {
                return Ok(Outcome::Cancelled);
            }
            match pacer.wait(&self.cancel) {
                PaceOutcome::OnTime => {}
                PaceOutcome::Late(lag) => {
                    debug!(session = %self.id(), index, lag_ms = lag.as_secs_f64() * 1000.0, "Frame late");
                    self.stats.record_lag(lag);
                }
                PaceOutcome::Cancelled => return Ok(Outcome::Cancelled),
            }
            if !self.deliver(index) {
                return Ok(Outcome::Cancelled);
            }
        }
        Ok(Outcome::EndOfStream)
    }

    /// Seeks, reads and converts frame `index` into the scratch buffers.
    /// Returns `false` once the session is no longer current.
    fn decode(&mut self, index: u64) -> Result<bool> {
        if !self.is_current() {
            return Ok(false);
        }
        {
            let mut source = self.source.lock();

            let timer = Timer::start("seek");
            {
                let _span = tracing::info_span!("seek_frame", index).entered();
                source.seek_frame(index)?;
            }
            let (name, duration) = timer.stop();
            self.stats.add_step(name, duration);

            if !self.is_current() {
                return Ok(false);
            }

            let timer = Timer::start("read");
            {
                let _span = tracing::info_span!("read_frame", index).entered();
                source.read_into(&mut self.raw)?;
            }
            let (name, duration) = timer.stop();
            self.stats.add_step(name, duration);
        }

        let timer = Timer::start("convert");
        {
            let _span = tracing::info_span!("convert_frame", format = %self.session.format).entered();
            self.session.format.convert(
                self.session.width,
                self.session.height,
                &self.raw,
                &mut self.dest,
            )?;
        }
        let (name, duration) = timer.stop();
        self.stats.add_step(name, duration);

        debug!(session = %self.id(), index, "Frame decoded");
        Ok(true)
    }

    fn deliver(&mut self, index: u64) -> bool {
        if !self.is_current() {
            return false;
        }
        self.shared.position.store(index, Ordering::Release);
        self.sink.deliver(DecodedFrame {
            session: self.id(),
            index,
            width: self.session.width,
            height: self.session.height,
            pixels: self.dest.clone(),
        });
        self.stats.frames_delivered += 1;
        true
    }
}
