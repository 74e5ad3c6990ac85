use std::path::PathBuf;

use thiserror::Error;

/// Rejected playback parameters. Raised before any worker is started.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid frame dimensions: width={0}, height={1}")]
    InvalidDimensions(u32, u32),

    #[error("Frame dimensions {0}x{1} exceed the maximum of {max}", max = super::MAX_DIMENSION)]
    DimensionsTooLarge(u32, u32),

    #[error("Invalid frame rate: {0}")]
    InvalidFps(f64),

    #[error("Unknown pixel format: {0}")]
    UnknownFormat(String),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Frame {index} out of range (stream holds {frame_count} frames)")]
    OutOfRange { index: u64, frame_count: u64 },

    #[error("Frame {index} truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        index: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No input stream is open")]
    NoSource,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Raw frame too short: expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("Destination buffer has {actual} bytes, expected {expected}")]
    DestinationSize { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to encode TIFF image: {0}")]
    Encode(String),

    #[error("Frame buffer has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a playback session can fail with.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Failed to spawn playback worker: {0}")]
    Spawn(std::io::Error),

    #[error("Playback worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
