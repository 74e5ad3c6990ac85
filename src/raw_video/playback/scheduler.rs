use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::raw_video::codec::PixelFormat;
use crate::raw_video::common::error::{PlaybackError, Result, SourceError};
use crate::raw_video::playback::sink::FrameSink;
use crate::raw_video::playback::timing::PlaybackStats;
use crate::raw_video::playback::types::{
    PlaybackConfig, PlaybackSession, PlaybackState, SessionId, StopReason,
};
use crate::raw_video::playback::worker::{NO_SESSION, SessionWorker, SharedState};
use crate::raw_video::source::{FrameSource, FrameStream};

struct ActiveSession {
    session: PlaybackSession,
    /// Dropping the sender wakes a worker blocked in its pacing wait.
    cancel: Option<Sender<()>>,
    status: Arc<Mutex<PlaybackState>>,
    handle: Option<JoinHandle<PlaybackStats>>,
}

/// Drives decode sessions over one raw stream on a background worker.
///
/// Every command that needs a frame (open, reload, seek, step, a parameter
/// change, play) first cancels and joins the previous session, so at most one
/// thread touches the stream and the scratch buffers at a time. Pause only
/// signals the worker; the join happens when the next session starts.
///
/// ```no_run
/// use rawview::raw_video::{ChannelSink, PlaybackConfig, PlaybackScheduler, PixelFormat};
///
/// let config = PlaybackConfig::builder()
///     .dimensions(1920, 1080)
///     .format(PixelFormat::Yuv420)
///     .build()?;
/// let (sink, events) = ChannelSink::new();
/// let mut scheduler = PlaybackScheduler::new(sink, config);
/// scheduler.open(std::fs::File::open("capture.yuv")?)?;
/// scheduler.play()?;
/// for event in events.iter() {
///     println!("{event:?}");
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PlaybackScheduler<S: FrameStream, K: FrameSink> {
    config: PlaybackConfig,
    source: Option<Arc<Mutex<FrameSource<S>>>>,
    sink: Arc<K>,
    shared: Arc<SharedState>,
    active: Option<ActiveSession>,
    last_session: u64,
    last_stats: Option<PlaybackStats>,
}

impl<S: FrameStream, K: FrameSink> PlaybackScheduler<S, K> {
    pub fn new(sink: K, config: PlaybackConfig) -> Self {
        Self {
            config,
            source: None,
            sink: Arc::new(sink),
            shared: Arc::new(SharedState::new()),
            active: None,
            last_session: NO_SESSION,
            last_stats: None,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Current frame index: the last delivered frame, or the last requested
    /// one if nothing was delivered since.
    pub fn position(&self) -> u64 {
        self.shared.position.load(Ordering::Acquire)
    }

    pub fn frame_count(&self) -> u64 {
        match &self.source {
            Some(source) if !self.is_busy() => source.lock().frame_count(),
            _ => self.active.as_ref().map_or(0, |a| a.session.frame_count),
        }
    }

    /// Highest index to offer for selection, `frame_count - 1` clamped to at
    /// least 1 so an empty stream still shows a usable range.
    pub fn max_frame_index(&self) -> u64 {
        self.frame_count().saturating_sub(1).max(1)
    }

    pub fn state(&self) -> PlaybackState {
        self.active
            .as_ref()
            .map_or(PlaybackState::Idle, |active| *active.status.lock())
    }

    /// The session started most recently, if any.
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.active.as_ref().map(|active| &active.session)
    }

    /// Counters of the most recently joined session.
    pub fn last_stats(&self) -> Option<&PlaybackStats> {
        self.last_stats.as_ref()
    }

    fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.handle.as_ref().is_some_and(|h| !h.is_finished()))
    }

    /// Replaces the stream and shows its first frame.
    ///
    /// A config that fails validation is rejected before the stream is
    /// measured or any running session is touched.
    #[instrument(skip(self, stream))]
    pub fn open(&mut self, stream: S) -> Result<SessionId> {
        self.config.validate()?;
        self.supersede();
        let source = FrameSource::open(stream, self.config.width, self.config.height, self.config.format)?;
        info!(
            frame_count = source.frame_count(),
            stream_len = source.stream_len(),
            "Stream opened"
        );
        self.source = Some(Arc::new(Mutex::new(source)));
        self.shared.position.store(0, Ordering::Release);
        self.start(0, false)
    }

    /// Drops the stream after stopping any session.
    pub fn close(&mut self) {
        self.supersede();
        self.source = None;
        self.shared.position.store(0, Ordering::Release);
    }

    /// Re-measures the stream and decodes the current frame again.
    pub fn reload(&mut self) -> Result<SessionId> {
        self.start(self.position(), false)
    }

    /// Decodes the frame at `index`, clamped into the valid range.
    pub fn seek(&mut self, index: u64) -> Result<SessionId> {
        self.start(index, false)
    }

    /// Moves `delta` frames from the current position and decodes there.
    pub fn step(&mut self, delta: i64) -> Result<SessionId> {
        let target = self.position().saturating_add_signed(delta);
        self.start(target, false)
    }

    /// Plays from the current position to the last frame.
    pub fn play(&mut self) -> Result<SessionId> {
        self.start(self.position(), true)
    }

    /// Requests cancellation without waiting for the worker to stop.
    pub fn pause(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if Self::cancel(&self.shared, active) {
                debug!(session = %active.session.id, "Pause requested");
            }
        }
    }

    pub fn set_dimensions(&mut self, width: u32, height: u32) -> Result<SessionId> {
        self.configure(PlaybackConfig {
            width,
            height,
            ..self.config
        })
    }

    pub fn set_format(&mut self, format: PixelFormat) -> Result<SessionId> {
        self.configure(PlaybackConfig {
            format,
            ..self.config
        })
    }

    pub fn set_fps(&mut self, fps: f64) -> Result<SessionId> {
        self.configure(PlaybackConfig { fps, ..self.config })
    }

    /// Applies new parameters and decodes the current frame under them.
    ///
    /// Invalid parameters are rejected before any running session is touched.
    pub fn configure(&mut self, config: PlaybackConfig) -> Result<SessionId> {
        config.validate()?;
        self.supersede();
        self.config = config;
        if let Some(source) = &self.source {
            source
                .lock()
                .reconfigure(config.width, config.height, config.format)?;
        }
        self.start(self.position(), false)
    }

    /// Waits for the running session to end and returns its counters.
    pub fn join(&mut self) -> Option<PlaybackStats> {
        let active = self.active.as_mut()?;
        let handle = active.handle.take()?;
        let id = active.session.id;
        match handle.join() {
            Ok(stats) => {
                self.last_stats = Some(stats.clone());
                Some(stats)
            }
            Err(_) => {
                error!(session = %id, "Playback worker panicked");
                *active.status.lock() = PlaybackState::Idle;
                self.sink
                    .stopped(id, StopReason::Failed(PlaybackError::WorkerPanicked));
                None
            }
        }
    }

    fn cancel(shared: &SharedState, active: &mut ActiveSession) -> bool {
        let id = active.session.id.get();
        let was_current = shared
            .current
            .compare_exchange(id, NO_SESSION, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        active.cancel.take();
        if was_current {
            let mut status = active.status.lock();
            if matches!(*status, PlaybackState::Decoding | PlaybackState::Playing) {
                *status = PlaybackState::Cancelled;
            }
        }
        was_current
    }

    /// Cancels, joins and discards the running session, if any.
    fn supersede(&mut self) {
        if let Some(active) = self.active.as_mut() {
            Self::cancel(&self.shared, active);
        }
        self.join();
        self.active = None;
    }

    fn start(&mut self, requested: u64, continuous: bool) -> Result<SessionId> {
        self.supersede();
        self.config.validate()?;

        let Some(source) = self.source.clone() else {
            warn!("No stream open; nothing to decode");
            return Err(SourceError::NoSource.into());
        };

        let frame_count = source.lock().refresh()?;
        if frame_count == 0 {
            warn!(
                frame_size = self.config.frame_size(),
                "Stream is shorter than one frame"
            );
            return Err(SourceError::OutOfRange {
                index: requested,
                frame_count,
            }
            .into());
        }
        let start_index = requested.min(frame_count - 1);
        self.shared.position.store(start_index, Ordering::Release);

        self.last_session += 1;
        let session = PlaybackSession {
            id: SessionId(self.last_session),
            format: self.config.format,
            width: self.config.width,
            height: self.config.height,
            start_index,
            fps: self.config.fps,
            continuous,
            frame_count,
        };

        let (cancel_tx, cancel_rx) = bounded(1);
        let status = Arc::new(Mutex::new(if continuous {
            PlaybackState::Playing
        } else {
            PlaybackState::Decoding
        }));
        self.shared
            .current
            .store(session.id.get(), Ordering::Release);

        let worker = SessionWorker::new(
            session,
            source,
            Arc::clone(&self.sink),
            Arc::clone(&self.shared),
            cancel_rx,
            Arc::clone(&status),
        );
        let handle = std::thread::Builder::new()
            .name(format!("rawview-session-{}", session.id.get()))
            .spawn(move || worker.run())
            .map_err(|e| {
                self.shared.current.store(NO_SESSION, Ordering::Release);
                PlaybackError::Spawn(e)
            })?;

        debug!(session = %session.id, start_index, continuous, "Session spawned");
        self.active = Some(ActiveSession {
            session,
            cancel: Some(cancel_tx),
            status,
            handle: Some(handle),
        });
        Ok(session.id)
    }
}

impl<S: FrameStream, K: FrameSink> Drop for PlaybackScheduler<S, K> {
    fn drop(&mut self) {
        self.supersede();
    }
}
