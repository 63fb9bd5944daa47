use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading sounds or driving the output device.
///
/// None of these ever leave an `AudioSound` method: a sound that fails to
/// load becomes a `SoundStatus::Bad` handle instead.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("no supported audio track in {}", .0.display())]
    NoTrack(PathBuf),

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("malformed config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
