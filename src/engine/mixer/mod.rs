use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::engine::clock::SoundClock;
use crate::engine::config::SoundDefaults;
use crate::engine::dsp::limiter::BusLimiter;
use crate::engine::dsp::pan::balance_gains;
use crate::engine::sound::{AudioSound, SoundData, SoundStatus};

/// The mixer always renders interleaved stereo.
pub const MIX_CHANNELS: usize = 2;

/// One playback instance as the mixer sees it.
pub struct Voice {
    data: Arc<SoundData>,
    clock: SoundClock,
}

impl Voice {
    fn new(data: Arc<SoundData>, defaults: &SoundDefaults, active: bool) -> Self {
        let clock = SoundClock::new(data.frames(), data.sample_rate(), defaults, active);
        Self { data, clock }
    }

    pub fn clock(&self) -> &SoundClock {
        &self.clock
    }

    /// Adds this voice's next `out.len() / 2` frames into `out`.
    ///
    /// Inactive voices advance their clock but write nothing.
    fn mix_into(&self, out: &mut [f32], master_volume: f32) {
        let frames = out.len() / MIX_CHANNELS;
        let audible = self.clock.get_active();
        let gain = self.clock.get_volume() * master_volume;
        let (left_gain, right_gain) = balance_gains(self.clock.get_balance());

        let mut written = 0;
        let mut empty_runs = 0;
        while written < frames {
            let Some(range) = self.clock.take_segment((frames - written) as u64) else {
                break;
            };
            let len = (range.end - range.start) as usize;
            if len == 0 {
                empty_runs += 1;
                if empty_runs > 1 {
                    break;
                }
                continue;
            }
            empty_runs = 0;

            if audible {
                let dest = &mut out[written * MIX_CHANNELS..(written + len) * MIX_CHANNELS];
                for (frame, src) in dest.chunks_exact_mut(MIX_CHANNELS).zip(range.start as usize..) {
                    let (left, right) = self.data.stereo_frame(src);
                    frame[0] += left * gain * left_gain;
                    frame[1] += right * gain * right_gain;
                }
            }
            written += len;
        }
    }
}

/// Voice registry shared by a manager and its mixer.
///
/// Holds only weak references: a voice lives as long as some handle does.
pub struct MixerShared {
    voices: Mutex<Vec<Weak<Voice>>>,
    /// f32 bits.
    master_volume: AtomicU32,
}

impl MixerShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            voices: Mutex::new(Vec::new()),
            master_volume: AtomicU32::new(1.0f32.to_bits()),
        })
    }

    /// Creates a handle playing `data` and registers its voice.
    pub(crate) fn create_sound(&self, data: Arc<SoundData>, defaults: &SoundDefaults, active: bool) -> MixerSound {
        let voice = Arc::new(Voice::new(data, defaults, active));
        if let Ok(mut voices) = self.voices.lock() {
            voices.push(Arc::downgrade(&voice));
        }
        MixerSound { voice }
    }

    /// Upgrades every live voice, forgetting dropped ones.
    pub fn live_voices(&self) -> Vec<Arc<Voice>> {
        let mut live = Vec::new();
        if let Ok(mut voices) = self.voices.lock() {
            voices.retain(|weak| match weak.upgrade() {
                Some(voice) => {
                    live.push(voice);
                    true
                }
                None => false,
            });
        }
        live
    }

    pub fn voice_count(&self) -> usize {
        self.live_voices().len()
    }

    pub fn set_master_volume(&self, volume: f32) {
        if volume.is_finite() {
            self.master_volume
                .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
        }
    }

    pub fn master_volume(&self) -> f32 {
        f32::from_bits(self.master_volume.load(Ordering::Relaxed))
    }

    pub fn set_active_all(&self, active: bool) {
        for voice in self.live_voices() {
            voice.clock.set_active(active);
        }
    }

    pub fn stop_all(&self) {
        for voice in self.live_voices() {
            voice.clock.stop();
        }
    }
}

/// Sums every playing voice into an interleaved stereo block.
pub struct Mixer {
    shared: Arc<MixerShared>,
    limiter: BusLimiter,
}

impl Mixer {
    pub fn new(shared: Arc<MixerShared>, sample_rate: u32, limiter_threshold_db: f32) -> Self {
        Self {
            shared,
            limiter: BusLimiter::new(limiter_threshold_db, sample_rate as f32, MIX_CHANNELS),
        }
    }

    /// Overwrites `out` with the next block of the mix and advances every
    /// playing voice's clock by `out.len() / 2` frames.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let master = self.shared.master_volume();
        for voice in self.shared.live_voices() {
            voice.mix_into(out, master);
        }
        self.limiter.process_interleaved(out);
    }
}

/// Sound handle backed by the software mixer.
pub struct MixerSound {
    voice: Arc<Voice>,
}

impl AudioSound for MixerSound {
    fn play(&self) {
        log::debug!("play {}", self.voice.data.name());
        self.voice.clock.play();
    }

    fn stop(&self) {
        self.voice.clock.stop();
    }

    fn set_loop(&self, looping: bool) {
        self.voice.clock.set_loop(looping);
    }

    fn get_loop(&self) -> bool {
        self.voice.clock.get_loop()
    }

    fn set_loop_count(&self, loop_count: u32) {
        self.voice.clock.set_loop_count(loop_count);
    }

    fn get_loop_count(&self) -> u32 {
        self.voice.clock.get_loop_count()
    }

    fn set_time(&self, start_time: f32) {
        self.voice.clock.set_time(start_time);
    }

    fn get_time(&self) -> f32 {
        self.voice.clock.get_time()
    }

    fn set_volume(&self, volume: f32) {
        self.voice.clock.set_volume(volume);
    }

    fn get_volume(&self) -> f32 {
        self.voice.clock.get_volume()
    }

    fn set_balance(&self, balance_right: f32) {
        self.voice.clock.set_balance(balance_right);
    }

    fn get_balance(&self) -> f32 {
        self.voice.clock.get_balance()
    }

    fn set_active(&self, active: bool) {
        self.voice.clock.set_active(active);
    }

    fn get_active(&self) -> bool {
        self.voice.clock.get_active()
    }

    fn get_name(&self) -> &str {
        self.voice.data.name()
    }

    fn length(&self) -> f32 {
        self.voice.clock.length()
    }

    fn status(&self) -> SoundStatus {
        self.voice.clock.status()
    }
}

impl Drop for MixerSound {
    fn drop(&mut self) {
        self.voice.clock.stop();
    }
}
