pub mod device;

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::engine::config::SoundDefaults;
use crate::engine::sound::SoundStatus;

pub use device::DeviceClock;

/// Per-sound playback clock and parameter store.
///
/// The application thread mutates it through a sound handle while the
/// backend's mixing thread advances it. Everything is a plain atomic: no
/// call blocks, and readers see a recent value rather than a linearizable one.
/// Positions are counted in frames of the sound's own sample rate.
pub struct SoundClock {
    /// Current playback position in frames. Always `<= total_frames`.
    frame_pos: AtomicU64,
    /// Position the next `play()` starts from. Consumed by `play()`.
    cue_frame: AtomicU64,
    total_frames: u64,
    sample_rate: u32,
    /// `SoundStatus` stored as u8.
    status: AtomicU8,
    /// Configured loop count, 0 = forever.
    loop_count: AtomicU32,
    /// Iterations left in the current playback including the one playing,
    /// 0 = forever.
    loops_left: AtomicU32,
    /// f32 bits.
    volume: AtomicU32,
    /// f32 bits.
    balance: AtomicU32,
    active: AtomicBool,
}

impl SoundClock {
    pub fn new(total_frames: u64, sample_rate: u32, defaults: &SoundDefaults, active: bool) -> Self {
        let clock = Self {
            frame_pos: AtomicU64::new(0),
            cue_frame: AtomicU64::new(0),
            total_frames,
            sample_rate: sample_rate.max(1),
            status: AtomicU8::new(SoundStatus::Ready as u8),
            loop_count: AtomicU32::new(defaults.loop_count),
            loops_left: AtomicU32::new(defaults.loop_count),
            volume: AtomicU32::new(1.0f32.to_bits()),
            balance: AtomicU32::new(0.0f32.to_bits()),
            active: AtomicBool::new(active),
        };
        clock.set_volume(defaults.volume);
        clock.set_balance(defaults.balance);
        clock.set_time(defaults.time);
        clock
    }

    /// A clock for a resource that failed to load. Ignores every mutation.
    pub fn bad() -> Self {
        Self {
            frame_pos: AtomicU64::new(0),
            cue_frame: AtomicU64::new(0),
            total_frames: 0,
            sample_rate: 1,
            status: AtomicU8::new(SoundStatus::Bad as u8),
            loop_count: AtomicU32::new(1),
            loops_left: AtomicU32::new(1),
            volume: AtomicU32::new(1.0f32.to_bits()),
            balance: AtomicU32::new(0.0f32.to_bits()),
            active: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> SoundStatus {
        SoundStatus::from(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: SoundStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    fn is_bad(&self) -> bool {
        self.status() == SoundStatus::Bad
    }

    /// Starts playback from the cue point, or restarts it if already playing.
    pub fn play(&self) {
        if self.is_bad() {
            return;
        }
        let cue = self.cue_frame.swap(0, Ordering::AcqRel);
        self.frame_pos.store(cue.min(self.total_frames), Ordering::Release);
        self.loops_left
            .store(self.loop_count.load(Ordering::Relaxed), Ordering::Relaxed);
        self.set_status(SoundStatus::Playing);
    }

    pub fn stop(&self) {
        if self.is_bad() {
            return;
        }
        self.set_status(SoundStatus::Ready);
        self.frame_pos.store(0, Ordering::Release);
        self.cue_frame.store(0, Ordering::Release);
    }

    pub fn set_loop(&self, looping: bool) {
        self.set_loop_count(if looping { 0 } else { 1 });
    }

    pub fn get_loop(&self) -> bool {
        self.get_loop_count() == 0
    }

    /// Takes effect for the current playback too: the iterations already
    /// played are kept, the remaining ones follow the new count.
    pub fn set_loop_count(&self, loop_count: u32) {
        if self.is_bad() {
            return;
        }
        let previous = self.loop_count.swap(loop_count, Ordering::Relaxed);
        if self.status() != SoundStatus::Playing {
            self.loops_left.store(loop_count, Ordering::Relaxed);
            return;
        }
        let left = self.loops_left.load(Ordering::Relaxed);
        let updated = if loop_count == 0 {
            0
        } else if previous == 0 || left == 0 {
            // Leaving infinite mode: finish the pass in progress.
            1
        } else {
            let played = previous.saturating_sub(left);
            loop_count.saturating_sub(played).max(1)
        };
        self.loops_left.store(updated, Ordering::Relaxed);
    }

    pub fn get_loop_count(&self) -> u32 {
        self.loop_count.load(Ordering::Relaxed)
    }

    pub fn set_time(&self, seconds: f32) {
        if self.is_bad() {
            return;
        }
        if !seconds.is_finite() {
            log::warn!("ignoring non-finite time position {}", seconds);
            return;
        }
        let frame = self.secs_to_frames(seconds);
        self.cue_frame.store(frame, Ordering::Release);
        self.frame_pos.store(frame, Ordering::Release);
    }

    pub fn get_time(&self) -> f32 {
        self.frames_to_secs(self.frame_pos.load(Ordering::Acquire).min(self.total_frames))
    }

    pub fn set_volume(&self, volume: f32) {
        if self.is_bad() {
            return;
        }
        if !volume.is_finite() {
            log::warn!("ignoring non-finite volume {}", volume);
            return;
        }
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn get_volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    pub fn set_balance(&self, balance: f32) {
        if self.is_bad() {
            return;
        }
        if !balance.is_finite() {
            log::warn!("ignoring non-finite balance {}", balance);
            return;
        }
        self.balance
            .store(balance.clamp(-1.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn get_balance(&self) -> f32 {
        f32::from_bits(self.balance.load(Ordering::Relaxed))
    }

    pub fn set_active(&self, active: bool) {
        if self.is_bad() {
            return;
        }
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn get_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn length(&self) -> f32 {
        self.frames_to_secs(self.total_frames)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Claims the next contiguous run of at most `max_frames` frames for
    /// rendering and moves the playhead past it.
    ///
    /// Reaching the end of the sound either wraps to frame 0 for the next
    /// iteration or finishes playback (status becomes `Ready`, position 0).
    /// The returned range may be empty right at a loop boundary; `None` means
    /// nothing is playing.
    pub fn take_segment(&self, max_frames: u64) -> Option<Range<u64>> {
        if self.status() != SoundStatus::Playing || max_frames == 0 {
            return None;
        }
        if self.total_frames == 0 {
            self.finish();
            return None;
        }

        let pos = self.frame_pos.load(Ordering::Acquire).min(self.total_frames);
        let end = pos.saturating_add(max_frames).min(self.total_frames);

        if end == self.total_frames {
            self.complete_iteration(pos);
        } else {
            // A concurrent seek or restart wins over this advance.
            let _ = self.frame_pos.compare_exchange(
                pos,
                end,
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
        }
        Some(pos..end)
    }

    /// Advances the playhead by `frames` without rendering anything.
    pub fn advance(&self, frames: u64) {
        let mut remaining = frames;
        let mut empty_runs = 0;
        while remaining > 0 {
            let Some(range) = self.take_segment(remaining) else {
                break;
            };
            let taken = range.end - range.start;
            if taken == 0 {
                empty_runs += 1;
                if empty_runs > 1 {
                    break;
                }
                continue;
            }
            empty_runs = 0;
            remaining -= taken;
        }
    }

    fn complete_iteration(&self, observed_pos: u64) {
        let left = self.loops_left.load(Ordering::Relaxed);
        // A concurrent seek, restart or stop moved the playhead: it wins and
        // this iteration neither wraps nor finishes.
        if self
            .frame_pos
            .compare_exchange(observed_pos, 0, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        match left {
            0 => {}
            1 => {
                self.cue_frame.store(0, Ordering::Release);
                self.mark_ready();
            }
            n => self.loops_left.store(n - 1, Ordering::Relaxed),
        }
    }

    fn finish(&self) {
        self.frame_pos.store(0, Ordering::Release);
        self.cue_frame.store(0, Ordering::Release);
        self.mark_ready();
    }

    fn mark_ready(&self) {
        let _ = self.status.compare_exchange(
            SoundStatus::Playing as u8,
            SoundStatus::Ready as u8,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }

    fn secs_to_frames(&self, seconds: f32) -> u64 {
        let frames = (seconds.max(0.0) as f64 * self.sample_rate as f64).round();
        (frames as u64).min(self.total_frames)
    }

    fn frames_to_secs(&self, frames: u64) -> f32 {
        (frames as f64 / self.sample_rate as f64) as f32
    }
}

impl std::fmt::Debug for SoundClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundClock")
            .field("status", &self.status())
            .field("time", &self.get_time())
            .field("length", &self.length())
            .field("loop_count", &self.get_loop_count())
            .field("volume", &self.get_volume())
            .field("balance", &self.get_balance())
            .field("active", &self.get_active())
            .finish()
    }
}
