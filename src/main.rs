use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use crossbeam_channel::Receiver;
use tracing::{info, warn};

use rawview::logger;
use rawview::raw_video::{
    ChannelSink, DecodedFrame, ExportConfig, FrameExporter, FrameSource, PixelFormat,
    PlaybackConfig, PlaybackEvent, PlaybackScheduler, SessionId, StopReason, TiffCompression,
    TiffFrameExporter,
};

#[derive(Parser, Debug)]
#[command(name = "rawview", version, about = "Inspect and play headerless raw video files")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print stream length and frame count for the given geometry.
    Info(StreamArgs),
    /// Decode a single frame, optionally writing it as a TIFF.
    Frame(FrameArgs),
    /// Play the stream at the configured frame rate.
    Play(PlayArgs),
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// Raw video file.
    input: PathBuf,

    #[arg(long, default_value_t = 1920)]
    width: u32,

    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Pixel format (Y, YUV420, YUV444, RGB24, BGR24, NV12, NV21).
    #[arg(long, default_value = "Y")]
    format: PixelFormat,

    #[arg(long, default_value_t = 25.0)]
    fps: f64,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    stream: StreamArgs,

    /// Frame index (0-based), clamped to the last frame.
    #[arg(long, default_value_t = 0)]
    index: u64,

    /// Output TIFF path.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = CompressionChoice::None)]
    compression: CompressionChoice,

    /// Horizontal predictor for compressed output.
    #[arg(long)]
    predictor: bool,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    stream: StreamArgs,

    /// First frame to play.
    #[arg(long, default_value_t = 0)]
    from: u64,

    /// Pause after this many frames.
    #[arg(long)]
    limit: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompressionChoice {
    None,
    Lzw,
    DeflateFast,
    DeflateBalanced,
    DeflateBest,
}

impl From<CompressionChoice> for TiffCompression {
    fn from(choice: CompressionChoice) -> Self {
        match choice {
            CompressionChoice::None => TiffCompression::None,
            CompressionChoice::Lzw => TiffCompression::Lzw,
            CompressionChoice::DeflateFast => TiffCompression::DeflateFast,
            CompressionChoice::DeflateBalanced => TiffCompression::DeflateBalanced,
            CompressionChoice::DeflateBest => TiffCompression::DeflateBest,
        }
    }
}

type Scheduler = PlaybackScheduler<BufReader<File>, ChannelSink>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Play(args) => cmd_play(args),
    }
}

impl StreamArgs {
    fn config(&self) -> anyhow::Result<PlaybackConfig> {
        Ok(PlaybackConfig::builder()
            .dimensions(self.width, self.height)
            .format(self.format)
            .fps(self.fps)
            .build()?)
    }
}

fn open_scheduler(args: &StreamArgs) -> anyhow::Result<(Scheduler, Receiver<PlaybackEvent>)> {
    let config = args.config()?;
    let file = File::open(&args.input)
        .with_context(|| format!("open raw video '{}'", args.input.display()))?;
    let (sink, events) = ChannelSink::new();
    let mut scheduler = PlaybackScheduler::new(sink, config);
    scheduler
        .open(BufReader::new(file))
        .with_context(|| format!("decode first frame of '{}'", args.input.display()))?;
    scheduler.join();
    Ok((scheduler, events))
}

/// Drains events until `session` stops, handing its frames to `on_frame`.
fn follow_session(
    events: &Receiver<PlaybackEvent>,
    session: SessionId,
    mut on_frame: impl FnMut(DecodedFrame),
) -> anyhow::Result<StopReason> {
    for event in events.iter() {
        match event {
            PlaybackEvent::Frame(frame) if frame.session == session => on_frame(frame),
            PlaybackEvent::Stopped { session: id, reason } if id == session => return Ok(reason),
            _ => {}
        }
    }
    bail!("playback worker disconnected before session {session} stopped")
}

fn cmd_info(args: StreamArgs) -> anyhow::Result<()> {
    args.config()?;
    let source = FrameSource::open_path(&args.input, args.width, args.height, args.format)?;

    println!("file:          {}", args.input.display());
    println!(
        "geometry:      {}x{} {}",
        source.width(),
        source.height(),
        source.format()
    );
    println!("stream bytes:  {}", source.stream_len());
    println!("frame bytes:   {}", source.frame_size());
    println!("frames:        {}", source.frame_count());
    println!("max index:     {}", source.max_frame_index());
    println!(
        "duration:      {:.2}s at {} fps",
        source.frame_count() as f64 / args.fps,
        args.fps
    );

    let trailing = source.stream_len() - source.frame_count() * source.frame_size() as u64;
    if trailing > 0 {
        warn!(trailing, "Stream length is not a multiple of the frame size");
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (mut scheduler, events) = open_scheduler(&args.stream)?;
    let session = scheduler.seek(args.index)?;

    let mut decoded = None;
    let reason = follow_session(&events, session, |frame| decoded = Some(frame))?;
    scheduler.join();
    if let StopReason::Failed(err) = reason {
        return Err(err).context("decode frame");
    }
    let Some(frame) = decoded else {
        bail!("session {session} ended without a frame ({reason:?})");
    };

    info!(
        index = frame.index,
        width = frame.width,
        height = frame.height,
        "Frame decoded"
    );

    if let Some(out) = args.out.as_deref() {
        let config = ExportConfig::builder()
            .compression(args.compression.into())
            .predictor(args.predictor)
            .build();
        export_frame(&frame, out, &config)?;
    }
    Ok(())
}

fn export_frame(frame: &DecodedFrame, out: &Path, config: &ExportConfig) -> anyhow::Result<()> {
    TiffFrameExporter
        .export_to_path(frame, out, config)
        .with_context(|| format!("write '{}'", out.display()))?;
    info!("Wrote {}", out.display());
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let (mut scheduler, events) = open_scheduler(&args.stream)?;
    if args.from > 0 {
        let seek = scheduler.seek(args.from)?;
        follow_session(&events, seek, |_| {})?;
    }

    let session = scheduler.play()?;
    info!(
        from = scheduler.position(),
        last = scheduler.max_frame_index(),
        fps = args.stream.fps,
        "Playing"
    );

    let mut delivered = 0u64;
    let reason = follow_session(&events, session, |frame| {
        delivered += 1;
        info!(index = frame.index, "Frame");
        if args.limit.is_some_and(|limit| delivered >= limit) {
            scheduler.pause();
        }
    })?;

    if let Some(stats) = scheduler.join() {
        stats.print_summary();
    }
    match reason {
        StopReason::Failed(err) => Err(err).context("playback"),
        reason => {
            info!(?reason, position = scheduler.position(), "Playback stopped");
            Ok(())
        }
    }
}
