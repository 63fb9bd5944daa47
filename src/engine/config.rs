use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::error::AudioError;

/// Parameters every new sound handle starts with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundDefaults {
    /// 0 = forever, 1 = play once, n = play n times.
    pub loop_count: u32,
    /// 0.0 (silent) to 1.0 (max).
    pub volume: f32,
    /// -1.0 (hard left) to 1.0 (hard right).
    pub balance: f32,
    /// Start position in seconds.
    pub time: f32,
}

impl Default for SoundDefaults {
    fn default() -> Self {
        Self {
            loop_count: 1,
            volume: 1.0,
            balance: 0.0,
            time: 0.0,
        }
    }
}

/// Audio engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Internal mixing rate; loaded sounds are resampled to it.
    pub mix_sample_rate: u32,
    /// Frames rendered per mixer pass.
    pub block_frames: usize,
    /// Capacity of the ring buffer feeding the device, in frames.
    pub buffer_frames: usize,
    /// Bus limiter threshold.
    pub limiter_threshold_db: f32,
    /// Maximum number of decoded sounds kept in the cache.
    pub cache_limit: usize,
    /// Whether sounds are audible when the engine starts.
    pub active: bool,
    pub sound_defaults: SoundDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mix_sample_rate: 48_000,
            block_frames: 512,
            buffer_frames: 4096,
            limiter_threshold_db: -0.1,
            cache_limit: 16,
            active: true,
            sound_defaults: SoundDefaults::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, AudioError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the mixer thread cannot run with.
    ///
    /// The ring buffer must hold at least two mixer blocks, or the mixer
    /// could wait forever for room the device never frees.
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.mix_sample_rate == 0 {
            return Err(AudioError::InvalidConfig("mix_sample_rate must be positive".into()));
        }
        if self.block_frames == 0 {
            return Err(AudioError::InvalidConfig("block_frames must be positive".into()));
        }
        if self.buffer_frames < self.block_frames * 2 {
            return Err(AudioError::InvalidConfig(format!(
                "buffer_frames ({}) must be at least twice block_frames ({})",
                self.buffer_frames, self.block_frames
            )));
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
