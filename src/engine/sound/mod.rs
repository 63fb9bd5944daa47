pub mod data;

use std::sync::Arc;

pub use data::SoundData;

/// Lifecycle of a sound handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SoundStatus {
    /// The resource failed to load or became unusable. Terminal.
    Bad = 0,
    /// Loaded and not playing.
    Ready = 1,
    /// Actively advancing.
    Playing = 2,
}

impl From<u8> for SoundStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => SoundStatus::Ready,
            2 => SoundStatus::Playing,
            _ => SoundStatus::Bad,
        }
    }
}

/// A sound handle shared between the application and its manager.
///
/// Dropping the last clone stops playback and releases the backend voice.
pub type SoundHandle = Arc<dyn AudioSound>;

/// Control and status surface of one playback instance.
///
/// Every backend implements the same contract:
///
/// - No method blocks, panics or reports an error. A handle whose resource
///   failed to load reports `SoundStatus::Bad` and ignores every mutator.
/// - Set loop count, volume and balance before `play()` for portable results.
///   They can be changed while playing and take effect on the next mixed block.
/// - Calling `play()` on a playing sound restarts it (audible stutter).
/// - `get_time()` moves while the sound plays; cache it if a snapshot is needed.
///   A time set with `set_time()` only applies to the current pass: later loop
///   iterations start from 0.0.
/// - `set_loop(true)` is `set_loop_count(0)` and `set_loop(false)` is
///   `set_loop_count(1)`; `get_loop()` is `get_loop_count() == 0`.
/// - Volume is clamped to `[0.0, 1.0]`, balance to `[-1.0, 1.0]`. Non-finite
///   values are ignored.
pub trait AudioSound: Send + Sync {
    /// Starts playback at the current time position, or restarts it.
    fn play(&self);
    /// Halts playback and rewinds to 0.0. Does nothing when not playing.
    fn stop(&self);

    /// false = play once, true = play forever.
    fn set_loop(&self, looping: bool);
    fn get_loop(&self) -> bool;

    /// 0 = forever, 1 = play once, n = play n times.
    fn set_loop_count(&self, loop_count: u32);
    fn get_loop_count(&self) -> u32;

    /// Seeks to `start_time` seconds, clamped to `[0.0, length()]`.
    fn set_time(&self, start_time: f32);
    fn get_time(&self) -> f32;

    fn set_volume(&self, volume: f32);
    fn get_volume(&self) -> f32;

    /// -1.0 is hard left, 0.0 centered, 1.0 hard right.
    fn set_balance(&self, balance_right: f32);
    fn get_balance(&self) -> f32;

    /// Inactive sounds keep their playback state but produce no output.
    fn set_active(&self, active: bool);
    fn get_active(&self) -> bool;

    /// There is no `set_name()`: managers key their tables on it.
    fn get_name(&self) -> &str;

    /// Playing time in seconds.
    fn length(&self) -> f32;

    fn status(&self) -> SoundStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_u8() {
        assert_eq!(SoundStatus::from(SoundStatus::Bad as u8), SoundStatus::Bad);
        assert_eq!(SoundStatus::from(SoundStatus::Ready as u8), SoundStatus::Ready);
        assert_eq!(SoundStatus::from(SoundStatus::Playing as u8), SoundStatus::Playing);
        assert_eq!(SoundStatus::from(200), SoundStatus::Bad);
    }
}
