//! Playback configuration and session types

use std::fmt;
use std::time::Duration;

use crate::raw_video::codec::PixelFormat;
use crate::raw_video::common::{self, error::ConfigError, error::PlaybackError};

/// Frame geometry, layout and cadence the scheduler decodes with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Raw layout of every frame in the stream
    pub format: PixelFormat,
    /// Continuous playback rate in frames per second
    pub fps: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            format: PixelFormat::Gray,
            fps: 25.0,
        }
    }
}

impl PlaybackConfig {
    pub fn builder() -> PlaybackConfigBuilder {
        PlaybackConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        common::validate_dimensions(self.width, self.height)?;
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        Ok(())
    }

    pub fn frame_size(&self) -> usize {
        self.format.frame_size(self.width, self.height)
    }
}

/// Builder for PlaybackConfig
#[derive(Default)]
pub struct PlaybackConfigBuilder {
    width: Option<u32>,
    height: Option<u32>,
    format: Option<PixelFormat>,
    fps: Option<f64>,
}

impl PlaybackConfigBuilder {
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn dimensions(self, width: u32, height: u32) -> Self {
        self.width(width).height(height)
    }

    pub fn format(mut self, format: PixelFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Fills unset fields from [`PlaybackConfig::default`] and validates.
    pub fn build(self) -> Result<PlaybackConfig, ConfigError> {
        let default = PlaybackConfig::default();
        let config = PlaybackConfig {
            width: self.width.unwrap_or(default.width),
            height: self.height.unwrap_or(default.height),
            format: self.format.unwrap_or(default.format),
            fps: self.fps.unwrap_or(default.fps),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Token identifying one playback session. Ids increase monotonically per
/// scheduler and are never reused; the default id (0) never names a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub(crate) u64);

impl SessionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One run of the scheduler, fixed at start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSession {
    pub id: SessionId,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub start_index: u64,
    pub fps: f64,
    /// `false` decodes a single frame, `true` plays until the last frame.
    pub continuous: bool,
    /// Frame count observed when the session started.
    pub frame_count: u64,
}

impl PlaybackSession {
    pub fn last_index(&self) -> u64 {
        self.frame_count.saturating_sub(1)
    }

    /// Target spacing between two delivered frames during continuous playback.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Decoding,
    Playing,
    Cancelled,
}

/// A converted frame handed to the sink. The sink owns the pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub session: SessionId,
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, BGRA order
    pub pixels: Vec<u8>,
}

impl fmt::Debug for DecodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedFrame")
            .field("session", &self.session)
            .field("index", &self.index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &format_args!("[{} bytes]", self.pixels.len()))
            .finish()
    }
}

/// Why a session ended.
#[derive(Debug)]
pub enum StopReason {
    /// The single requested frame was delivered.
    Completed,
    /// Continuous playback delivered the last frame.
    EndOfStream,
    /// Paused, superseded, or the scheduler shut down.
    Cancelled,
    /// A read or decode failed; nothing further was delivered.
    Failed(PlaybackError),
}
