#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Seek, SeekFrom};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use crossbeam_channel::{Receiver, Sender, bounded};

    use crate::raw_video::codec::PixelFormat;
    use crate::raw_video::common::error::{ConfigError, PlaybackError, SourceError};
    use crate::raw_video::playback::{
        ChannelSink, DecodedFrame, FrameSink, PlaybackConfig, PlaybackEvent, PlaybackScheduler,
        PlaybackState, SessionId, StopReason,
    };

    const WIDTH: u32 = 4;
    const HEIGHT: u32 = 2;
    const GRAY_FRAME: usize = (WIDTH * HEIGHT) as usize;

    /// Gray frames whose every byte equals the frame index.
    fn numbered_frames(frames: usize) -> Vec<u8> {
        (0..frames)
            .flat_map(|i| std::iter::repeat_n(i as u8, GRAY_FRAME))
            .collect()
    }

    fn config(fps: f64) -> PlaybackConfig {
        PlaybackConfig::builder()
            .dimensions(WIDTH, HEIGHT)
            .format(PixelFormat::Gray)
            .fps(fps)
            .build()
            .unwrap()
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Seek(u64),
        Read(usize),
    }

    #[derive(Default)]
    struct Faults {
        fail_reads: AtomicBool,
        /// Reads past this offset see end of file while the length still
        /// reports the full stream.
        readable_len: AtomicU64,
    }

    /// Stream that logs every seek and read with the calling thread's name.
    struct InstrumentedStream {
        inner: Cursor<Vec<u8>>,
        log: Arc<Mutex<Vec<(String, Op)>>>,
        faults: Arc<Faults>,
        read_delay: Duration,
    }

    impl InstrumentedStream {
        fn new(data: Vec<u8>) -> (Self, Arc<Mutex<Vec<(String, Op)>>>, Arc<Faults>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            let faults = Arc::new(Faults::default());
            faults.readable_len.store(u64::MAX, Ordering::SeqCst);
            let stream = Self {
                inner: Cursor::new(data),
                log: log.clone(),
                faults: faults.clone(),
                read_delay: Duration::ZERO,
            };
            (stream, log, faults)
        }

        fn record(&self, op: Op) {
            let name = std::thread::current().name().unwrap_or("").to_string();
            self.log.lock().unwrap().push((name, op));
        }
    }

    impl Read for InstrumentedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.faults.fail_reads.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("device failure"));
            }
            if !self.read_delay.is_zero() {
                std::thread::sleep(self.read_delay);
            }
            let limit = self.faults.readable_len.load(Ordering::SeqCst);
            let remaining = limit.saturating_sub(self.inner.position()) as usize;
            let n = buf.len().min(remaining);
            let n = self.inner.read(&mut buf[..n])?;
            self.record(Op::Read(n));
            Ok(n)
        }
    }

    impl Seek for InstrumentedStream {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            let offset = self.inner.seek(pos)?;
            self.record(Op::Seek(offset));
            Ok(offset)
        }
    }

    /// Sink that records deliveries and can hold the worker at one index
    /// until the test releases it.
    struct MockSink {
        frames: Arc<Mutex<Vec<DecodedFrame>>>,
        stops: Arc<Mutex<Vec<(SessionId, StopReason)>>>,
        gate: Option<Gate>,
    }

    struct Gate {
        index: u64,
        continuous_only: bool,
        reached: Sender<u64>,
        release: Receiver<()>,
    }

    struct GateHandle {
        reached: Receiver<u64>,
        release: Sender<()>,
    }

    impl GateHandle {
        fn wait_reached(&self) -> u64 {
            self.reached
                .recv_timeout(Duration::from_secs(10))
                .expect("worker never reached the gate")
        }

        fn release(&self) {
            self.release.send(()).unwrap();
        }
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                frames: Arc::new(Mutex::new(Vec::new())),
                stops: Arc::new(Mutex::new(Vec::new())),
                gate: None,
            }
        }

        fn gated(index: u64) -> (Self, GateHandle) {
            let (reached_tx, reached_rx) = bounded(1);
            let (release_tx, release_rx) = bounded(1);
            let mut sink = Self::new();
            sink.gate = Some(Gate {
                index,
                continuous_only: true,
                reached: reached_tx,
                release: release_rx,
            });
            (
                sink,
                GateHandle {
                    reached: reached_rx,
                    release: release_tx,
                },
            )
        }
    }

    impl FrameSink for MockSink {
        fn deliver(&self, frame: DecodedFrame) {
            let index = frame.index;
            let session = frame.session;
            self.frames.lock().unwrap().push(frame);
            if let Some(gate) = &self.gate {
                // Session 1 is the single-frame decode issued by `open`.
                let applies = !gate.continuous_only || session.get() > 1;
                if applies && index == gate.index {
                    gate.reached.send(index).unwrap();
                    gate.release.recv().unwrap();
                }
            }
        }

        fn stopped(&self, session: SessionId, reason: StopReason) {
            self.stops.lock().unwrap().push((session, reason));
        }
    }

    fn indices_of(frames: &[DecodedFrame], session: SessionId) -> Vec<u64> {
        frames
            .iter()
            .filter(|f| f.session == session)
            .map(|f| f.index)
            .collect()
    }

    #[test]
    fn open_decodes_first_frame() {
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let stops = sink.stops.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));

        let session = scheduler.open(Cursor::new(numbered_frames(10))).unwrap();
        let stats = scheduler.join().unwrap();

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].index, 0);
        assert_eq!(frames[0].session, session);
        assert_eq!(frames[0].pixels.len(), GRAY_FRAME * 4);
        assert_eq!(&frames[0].pixels[..4], &[0, 0, 0, 255]);
        assert_eq!(stats.frames_delivered, 1);

        let stops = stops.lock().unwrap();
        assert!(matches!(stops[0], (id, StopReason::Completed) if id == session));
        assert_eq!(scheduler.state(), PlaybackState::Idle);
        assert_eq!(scheduler.frame_count(), 10);
        assert_eq!(scheduler.max_frame_index(), 9);
    }

    #[test]
    fn seek_decodes_requested_frame_and_clamps() {
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));
        scheduler.open(Cursor::new(numbered_frames(10))).unwrap();

        let session = scheduler.seek(5).unwrap();
        scheduler.join();
        {
            let frames = frames.lock().unwrap();
            let last = frames.last().unwrap();
            assert_eq!((last.session, last.index), (session, 5));
            assert!(last.pixels.chunks(4).all(|px| px == [5, 5, 5, 255]));
        }

        scheduler.seek(500).unwrap();
        scheduler.join();
        assert_eq!(scheduler.position(), 9);
        assert_eq!(frames.lock().unwrap().last().unwrap().index, 9);
    }

    #[test]
    fn step_moves_relative_to_position() {
        let sink = MockSink::new();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));
        scheduler.open(Cursor::new(numbered_frames(10))).unwrap();

        scheduler.step(3).unwrap();
        scheduler.join();
        assert_eq!(scheduler.position(), 3);

        scheduler.step(-10).unwrap();
        scheduler.join();
        assert_eq!(scheduler.position(), 0);

        scheduler.step(100).unwrap();
        scheduler.join();
        assert_eq!(scheduler.position(), 9);
    }

    #[test]
    fn continuous_playback_delivers_every_frame_in_order() {
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let stops = sink.stops.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));
        scheduler.open(Cursor::new(numbered_frames(10))).unwrap();
        scheduler.join();

        let started = Instant::now();
        let session = scheduler.play().unwrap();
        assert_eq!(scheduler.state(), PlaybackState::Playing);
        let stats = scheduler.join().unwrap();
        let elapsed = started.elapsed();

        let frames = frames.lock().unwrap();
        assert_eq!(indices_of(&frames, session), (0..10).collect::<Vec<_>>());
        for frame in frames.iter().filter(|f| f.session == session) {
            assert_eq!(frame.pixels[0], frame.index as u8);
        }
        assert_eq!(stats.frames_delivered, 10);
        // Nine paced intervals of 40ms.
        assert!(elapsed >= Duration::from_millis(350), "played too fast: {elapsed:?}");

        let stops = stops.lock().unwrap();
        assert!(matches!(stops.last().unwrap(), (id, StopReason::EndOfStream) if *id == session));
        assert_eq!(scheduler.state(), PlaybackState::Idle);
        assert_eq!(scheduler.position(), 9);
    }

    #[test]
    fn pause_after_frame_three_stops_delivery() {
        let (sink, gate) = MockSink::gated(3);
        let frames = sink.frames.clone();
        let stops = sink.stops.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));
        scheduler.open(Cursor::new(numbered_frames(10))).unwrap();
        scheduler.join();

        let session = scheduler.play().unwrap();
        assert_eq!(gate.wait_reached(), 3);
        scheduler.pause();
        assert_eq!(scheduler.state(), PlaybackState::Cancelled);
        gate.release();
        scheduler.join();

        let frames = frames.lock().unwrap();
        assert_eq!(indices_of(&frames, session), vec![0, 1, 2, 3]);
        let stops = stops.lock().unwrap();
        assert!(matches!(stops.last().unwrap(), (id, StopReason::Cancelled) if *id == session));
        assert_eq!(scheduler.state(), PlaybackState::Cancelled);

        // Playing again resumes where the paused session stopped.
        assert_eq!(scheduler.position(), 3);
    }

    #[test]
    fn new_session_joins_playing_one_before_any_io() {
        let (stream, log, _faults) = InstrumentedStream::new(numbered_frames(10));
        let (sink, gate) = MockSink::gated(2);
        let frames = sink.frames.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(50.0));
        scheduler.open(stream).unwrap();
        scheduler.join();

        let playing = scheduler.play().unwrap();
        gate.wait_reached();
        gate.release();
        let seeking = scheduler.seek(7).unwrap();
        scheduler.join();

        let log = log.lock().unwrap();
        let old_thread = format!("rawview-session-{}", playing.get());
        let new_thread = format!("rawview-session-{}", seeking.get());
        let last_old = log.iter().rposition(|(t, _)| *t == old_thread).unwrap();
        let first_new = log.iter().position(|(t, _)| *t == new_thread).unwrap();
        assert!(last_old < first_new, "interleaved stream access: {log:?}");

        let frames = frames.lock().unwrap();
        let old = indices_of(&frames, playing);
        assert!(old.windows(2).all(|w| w[0] < w[1]));
        assert!(old.len() >= 3 && old.len() < 10);
        assert_eq!(indices_of(&frames, seeking), vec![7]);
        let last_old_frame = frames.iter().rposition(|f| f.session == playing).unwrap();
        let first_new_frame = frames.iter().position(|f| f.session == seeking).unwrap();
        assert!(last_old_frame < first_new_frame);
    }

    #[test]
    fn slow_decode_delivers_late_instead_of_skipping() {
        let (mut stream, _log, _faults) = InstrumentedStream::new(numbered_frames(10));
        stream.read_delay = Duration::from_millis(3);
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(1000.0));
        scheduler.open(stream).unwrap();
        scheduler.join();

        let session = scheduler.play().unwrap();
        let stats = scheduler.join().unwrap();

        assert_eq!(
            indices_of(&frames.lock().unwrap(), session),
            (0..10).collect::<Vec<_>>()
        );
        assert_eq!(stats.frames_delivered, 10);
        assert_eq!(stats.late_frames, 9);
        assert!(stats.total_lag >= Duration::from_millis(9 * 2));
        assert!(stats.get_step("read").is_some());
    }

    #[test]
    fn read_failure_stops_session_and_scheduler_recovers() {
        let (stream, _log, faults) = InstrumentedStream::new(numbered_frames(10));
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let stops = sink.stops.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));
        scheduler.open(stream).unwrap();
        scheduler.join();

        faults.fail_reads.store(true, Ordering::SeqCst);
        let failed = scheduler.seek(3).unwrap();
        scheduler.join();
        assert!(indices_of(&frames.lock().unwrap(), failed).is_empty());
        assert!(matches!(
            stops.lock().unwrap().last().unwrap(),
            (id, StopReason::Failed(PlaybackError::Source(SourceError::Io(_)))) if *id == failed
        ));
        assert_eq!(scheduler.state(), PlaybackState::Idle);

        faults.fail_reads.store(false, Ordering::SeqCst);
        let recovered = scheduler.seek(4).unwrap();
        scheduler.join();
        assert_eq!(indices_of(&frames.lock().unwrap(), recovered), vec![4]);
    }

    #[test]
    fn truncated_read_is_reported_without_partial_frame() {
        let (stream, _log, faults) = InstrumentedStream::new(numbered_frames(10));
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let stops = sink.stops.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(200.0));
        scheduler.open(stream).unwrap();
        scheduler.join();

        // Frame 5 is only half readable.
        faults
            .readable_len
            .store((GRAY_FRAME * 5 + GRAY_FRAME / 2) as u64, Ordering::SeqCst);
        let session = scheduler.play().unwrap();
        scheduler.join();

        assert_eq!(
            indices_of(&frames.lock().unwrap(), session),
            vec![0, 1, 2, 3, 4]
        );
        assert!(matches!(
            stops.lock().unwrap().last().unwrap(),
            (_, StopReason::Failed(PlaybackError::Source(SourceError::Truncated {
                index: 5,
                expected: 8,
                actual: 4
            })))
        ));
    }

    #[test]
    fn empty_stream_starts_no_session() {
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));

        let err = scheduler.open(Cursor::new(vec![0u8; 5])).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::Source(SourceError::OutOfRange {
                index: 0,
                frame_count: 0
            })
        ));
        assert_eq!(scheduler.frame_count(), 0);
        assert_eq!(scheduler.max_frame_index(), 1);
        assert!(scheduler.play().is_err());
        assert!(scheduler.session().is_none());
        assert!(frames.lock().unwrap().is_empty());
    }

    #[test]
    fn commands_without_stream_fail() {
        let mut scheduler: PlaybackScheduler<Cursor<Vec<u8>>, _> =
            PlaybackScheduler::new(MockSink::new(), config(25.0));
        assert!(matches!(
            scheduler.play(),
            Err(PlaybackError::Source(SourceError::NoSource))
        ));
        assert!(matches!(
            scheduler.seek(2),
            Err(PlaybackError::Source(SourceError::NoSource))
        ));
        assert_eq!(scheduler.state(), PlaybackState::Idle);
    }

    #[test]
    fn invalid_parameters_are_rejected_synchronously() {
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));
        let session = scheduler.open(Cursor::new(numbered_frames(4))).unwrap();
        scheduler.join();

        assert!(matches!(
            scheduler.set_dimensions(0, 2),
            Err(PlaybackError::Config(ConfigError::InvalidDimensions(0, 2)))
        ));
        assert!(matches!(
            scheduler.set_fps(-1.0),
            Err(PlaybackError::Config(ConfigError::InvalidFps(_)))
        ));
        assert_eq!(scheduler.session().unwrap().id, session);
        assert_eq!(scheduler.config().width, WIDTH);
        assert_eq!(frames.lock().unwrap().len(), 1);
    }

    #[test]
    fn unvalidated_config_is_rejected_by_open() {
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let oversized = PlaybackConfig {
            width: u32::MAX,
            height: u32::MAX,
            format: PixelFormat::Rgb24,
            fps: 25.0,
        };
        let mut scheduler = PlaybackScheduler::new(sink, oversized);

        assert!(matches!(
            scheduler.open(Cursor::new(vec![0u8; 64])),
            Err(PlaybackError::Config(ConfigError::DimensionsTooLarge(
                u32::MAX,
                u32::MAX
            )))
        ));
        assert!(scheduler.session().is_none());
        assert!(frames.lock().unwrap().is_empty());

        let stalled = PlaybackConfig {
            fps: 0.0,
            ..config(25.0)
        };
        let mut scheduler = PlaybackScheduler::new(MockSink::new(), stalled);
        assert!(matches!(
            scheduler.open(Cursor::new(numbered_frames(2))),
            Err(PlaybackError::Config(ConfigError::InvalidFps(_)))
        ));
    }

    #[test]
    fn format_change_recounts_and_clamps_position() {
        let sink = MockSink::new();
        let frames = sink.frames.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));
        scheduler.open(Cursor::new(numbered_frames(10))).unwrap();
        scheduler.seek(9).unwrap();
        scheduler.join();

        let session = scheduler.set_format(PixelFormat::Rgb24).unwrap();
        scheduler.join();

        // 80 bytes hold three 24-byte RGB24 frames.
        assert_eq!(scheduler.frame_count(), 3);
        assert_eq!(scheduler.max_frame_index(), 2);
        assert_eq!(scheduler.position(), 2);
        let frames = frames.lock().unwrap();
        let last = frames.last().unwrap();
        assert_eq!((last.session, last.index), (session, 2));
    }

    #[test]
    fn channel_sink_streams_frames_then_stop() {
        let (sink, events) = ChannelSink::new();
        let mut scheduler = PlaybackScheduler::new(sink, config(25.0));
        let session = scheduler.open(Cursor::new(numbered_frames(3))).unwrap();
        scheduler.join();

        match events.recv_timeout(Duration::from_secs(5)).unwrap() {
            PlaybackEvent::Frame(frame) => assert_eq!((frame.session, frame.index), (session, 0)),
            other => panic!("expected a frame, got {other:?}"),
        }
        match events.recv_timeout(Duration::from_secs(5)).unwrap() {
            PlaybackEvent::Stopped { session: id, reason } => {
                assert_eq!(id, session);
                assert!(matches!(reason, StopReason::Completed));
            }
            other => panic!("expected a stop, got {other:?}"),
        }
    }

    #[test]
    fn dropping_scheduler_cancels_slow_playback_promptly() {
        let sink = MockSink::new();
        let stops = sink.stops.clone();
        let mut scheduler = PlaybackScheduler::new(sink, config(0.5));
        scheduler.open(Cursor::new(numbered_frames(10))).unwrap();
        scheduler.join();
        scheduler.play().unwrap();

        let started = Instant::now();
        drop(scheduler);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(
            stops.lock().unwrap().last().unwrap(),
            (_, StopReason::Cancelled)
        ));
    }
}
