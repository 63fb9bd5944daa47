use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::engine::buffer::{create_mix_buffer, MixProducer};
use crate::engine::clock::DeviceClock;
use crate::engine::config::EngineConfig;
use crate::engine::dsp::pan::stereo_to_channels;
use crate::engine::dsp::resampler::{resample_all, Resampler};
use crate::engine::error::AudioError;
use crate::engine::manager::{load_cached, AudioManager, SoundCache};
use crate::engine::mixer::{Mixer, MixerShared, MIX_CHANNELS};
use crate::engine::null::NullSound;
use crate::engine::output::{AudioOutput, output_manager::OutputManager};
use crate::engine::sound::{SoundData, SoundHandle};

/// Manager playing sounds on the default output device.
///
/// A mixer thread renders every live sound into a ring buffer that the
/// device callback drains; sound clocks advance as the mixer renders.
/// Call `tick()` from the application loop to follow device changes.
pub struct AudioEngine {
    config: EngineConfig,
    device: Arc<DeviceClock>,
    output: Box<dyn AudioOutput>,
    shared: Arc<MixerShared>,
    cache: SoundCache,
    mix_thread: Option<JoinHandle<()>>,
    is_mixing: Arc<AtomicBool>,
    active: bool,
}

impl AudioEngine {
    pub fn new(config: EngineConfig) -> Result<Self, AudioError> {
        config.validate()?;
        let device = Arc::new(DeviceClock::new(config.mix_sample_rate));
        let (producer, consumer) = create_mix_buffer(config.buffer_frames * MIX_CHANNELS);

        let mut output = Box::new(OutputManager::new(consumer, device.clone()));
        let shared = MixerShared::new();
        let mixer = Mixer::new(shared.clone(), config.mix_sample_rate, config.limiter_threshold_db);

        let is_mixing = Arc::new(AtomicBool::new(true));
        let mix_thread = {
            let device = device.clone();
            let is_mixing = is_mixing.clone();
            let mix_rate = config.mix_sample_rate;
            let block_frames = config.block_frames;
            thread::Builder::new()
                .name("sound-mixer".into())
                .spawn(move || run_mixer(mixer, producer, device, is_mixing, mix_rate, block_frames))?
        };

        if let Err(e) = output.start() {
            log::warn!("output not started: {}", e);
        }
        log::info!(
            "audio engine started (mix {}Hz, device {}Hz/{}ch)",
            config.mix_sample_rate,
            device.get_sample_rate(),
            device.get_channels()
        );

        Ok(Self {
            cache: SoundCache::new(config.cache_limit),
            active: config.active,
            config,
            device,
            output,
            shared,
            mix_thread: Some(mix_thread),
            is_mixing,
        })
    }

    /// Checks device health and reconnects if the default device changed.
    pub fn tick(&mut self) {
        self.output.tick();
    }

    /// Number of handles still held by someone.
    pub fn sound_count(&self) -> usize {
        self.shared.voice_count()
    }

    /// Current device (sample rate, channel count).
    pub fn device_format(&self) -> (u32, u32) {
        (self.device.get_sample_rate(), self.device.get_channels())
    }

    fn register(&self, data: Arc<SoundData>) -> SoundHandle {
        Arc::new(self.shared.create_sound(data, &self.config.sound_defaults, self.active))
    }

    fn shutdown(&mut self) {
        self.is_mixing.store(false, Ordering::SeqCst);
        if let Some(handle) = self.mix_thread.take() {
            if handle.join().is_err() {
                log::error!("mixer thread panicked");
            }
        }
        let _ = self.output.shutdown();
        // Handles may outlive the engine; leave them stopped.
        self.shared.stop_all();
        log::info!("audio engine shut down");
    }
}

impl AudioManager for AudioEngine {
    fn get_sound(&mut self, path: &Path) -> SoundHandle {
        match load_cached(&mut self.cache, path, Some(self.config.mix_sample_rate)) {
            Ok(data) => self.register(data),
            Err(e) => {
                log::warn!("could not load {}: {}", path.display(), e);
                Arc::new(NullSound::bad(path.display().to_string()))
            }
        }
    }

    fn create_sound(&mut self, data: SoundData) -> SoundHandle {
        let mix_rate = self.config.mix_sample_rate;
        if data.sample_rate() == mix_rate {
            return self.register(Arc::new(data));
        }
        match resample_all(data.samples(), data.channels(), data.sample_rate(), mix_rate) {
            Ok(samples) => {
                let data = SoundData::new(data.name(), samples, data.channels(), mix_rate);
                self.register(Arc::new(data))
            }
            Err(e) => {
                log::warn!("could not convert {}: {}", data.name(), e);
                Arc::new(NullSound::bad(data.name()))
            }
        }
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
        self.shared.set_active_all(active);
    }

    fn get_active(&self) -> bool {
        self.active
    }

    fn set_volume(&mut self, volume: f32) {
        self.shared.set_master_volume(volume);
    }

    fn get_volume(&self) -> f32 {
        self.shared.master_volume()
    }

    fn stop_all_sounds(&mut self) {
        self.shared.stop_all();
    }

    fn uncache_sound(&mut self, path: &Path) {
        self.cache.remove(path);
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn set_cache_limit(&mut self, limit: usize) {
        self.cache.set_limit(limit);
    }

    fn get_cache_limit(&self) -> usize {
        self.cache.limit()
    }

    fn is_valid(&self) -> bool {
        self.output.is_healthy()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

const RESAMPLER_CHUNK: usize = 1024;

fn make_resampler(mix_rate: u32, device_rate: u32) -> Option<Resampler> {
    if mix_rate == device_rate {
        return None;
    }
    log::info!("resampling mix {}Hz -> {}Hz", mix_rate, device_rate);
    match Resampler::new(mix_rate, device_rate, MIX_CHANNELS, RESAMPLER_CHUNK) {
        Ok(r) => Some(r),
        Err(e) => {
            log::error!("resampler unavailable, playing at mix rate: {}", e);
            None
        }
    }
}

/// Free ring buffer space (in samples) to wait for before rendering a block.
///
/// A resampler emits a whole chunk at once, so its chunk bounds the burst.
/// Never more than the buffer can hold.
fn required_room(
    block_frames: usize,
    mix_rate: u32,
    device_rate: u32,
    device_channels: u32,
    capacity: usize,
) -> usize {
    let input_frames = if mix_rate == device_rate {
        block_frames
    } else {
        block_frames.max(RESAMPLER_CHUNK)
    };
    let output_frames =
        (input_frames as f64 * device_rate as f64 / mix_rate.max(1) as f64).ceil() as usize;
    let wanted = output_frames * device_channels.max(1) as usize;
    if wanted > capacity {
        log::warn!(
            "mix buffer ({} samples) is smaller than one block ({} samples); pushing in pieces",
            capacity,
            wanted
        );
    }
    wanted.min(capacity)
}

/// Mixer thread body: render, convert to the device format, push.
fn run_mixer(
    mut mixer: Mixer,
    mut producer: MixProducer,
    device: Arc<DeviceClock>,
    is_mixing: Arc<AtomicBool>,
    mix_rate: u32,
    block_frames: usize,
) {
    let mut block = vec![0.0f32; block_frames * MIX_CHANNELS];
    let mut device_out = Vec::with_capacity(block.len() * 4);
    let block_time = Duration::from_secs_f64(block_frames as f64 / mix_rate.max(1) as f64);

    let mut device_rate = device.get_sample_rate();
    let mut device_channels = device.get_channels();
    let mut resampler = make_resampler(mix_rate, device_rate);
    let capacity = producer.capacity();
    let mut room = required_room(block_frames, mix_rate, device_rate, device_channels, capacity);

    while is_mixing.load(Ordering::Relaxed) {
        let current_rate = device.get_sample_rate();
        let current_channels = device.get_channels();
        if current_rate != device_rate || current_channels != device_channels {
            log::info!(
                "output format changed: {}Hz/{}ch -> {}Hz/{}ch",
                device_rate, device_channels, current_rate, current_channels
            );
            device_rate = current_rate;
            device_channels = current_channels;
            resampler = make_resampler(mix_rate, device_rate);
            room = required_room(block_frames, mix_rate, device_rate, device_channels, capacity);
            device.signal_clear_buffer();
        }

        if !device.is_running() {
            // No device to pace us: keep sound clocks moving in real time.
            mixer.render(&mut block);
            thread::sleep(block_time);
            continue;
        }

        // If buffer is full, sleep briefly to avoid pegging CPU
        if producer.vacant_len() < room {
            thread::sleep(Duration::from_millis(5));
            continue;
        }

        mixer.render(&mut block);

        let converted;
        let stereo: &[f32] = match &mut resampler {
            Some(r) => match r.process(&block) {
                Ok(out) => {
                    converted = out;
                    &converted
                }
                Err(e) => {
                    log::error!("resampling error: {}", e);
                    &block
                }
            },
            None => &block,
        };

        device_out.clear();
        stereo_to_channels(stereo, device_channels as usize, &mut device_out);

        let mut pushed = 0;
        while pushed < device_out.len() {
            if !is_mixing.load(Ordering::Relaxed) || !device.is_running() {
                break;
            }
            pushed += producer.push_slice(&device_out[pushed..]);
            if pushed < device_out.len() {
                thread::sleep(Duration::from_millis(2));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SoundDefaults;
    use crate::engine::sound::{AudioSound, SoundStatus};

    struct MixerRun {
        device: Arc<DeviceClock>,
        is_mixing: Arc<AtomicBool>,
        thread: Option<JoinHandle<()>>,
    }

    impl MixerRun {
        /// Mixes at 1kHz into a ring buffer nobody drains.
        fn start(shared: &Arc<MixerShared>, running: bool) -> Self {
            let device = Arc::new(DeviceClock::new(1_000));
            device.set_running(running);
            let (mut producer, _consumer) = create_mix_buffer(64);
            producer.push_slice(&[0.0; 64]);

            let mixer = Mixer::new(shared.clone(), 1_000, -0.1);
            let is_mixing = Arc::new(AtomicBool::new(true));
            let thread = {
                let device = device.clone();
                let is_mixing = is_mixing.clone();
                thread::spawn(move || run_mixer(mixer, producer, device, is_mixing, 1_000, 16))
            };
            Self {
                device,
                is_mixing,
                thread: Some(thread),
            }
        }
    }

    impl Drop for MixerRun {
        fn drop(&mut self) {
            self.is_mixing.store(false, Ordering::SeqCst);
            if let Some(thread) = self.thread.take() {
                thread.join().unwrap();
            }
        }
    }

    fn playing_sound(shared: &Arc<MixerShared>) -> impl AudioSound {
        let data = Arc::new(SoundData::silent("pace", 10.0, 2, 1_000));
        let sound = shared.create_sound(data, &SoundDefaults::default(), true);
        sound.play();
        sound
    }

    #[test]
    fn full_buffer_holds_clocks_while_device_runs() {
        let shared = MixerShared::new();
        let sound = playing_sound(&shared);
        let _run = MixerRun::start(&shared, true);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(sound.get_time(), 0.0);
        assert_eq!(sound.status(), SoundStatus::Playing);
    }

    #[test]
    fn clocks_keep_moving_after_device_stops() {
        let shared = MixerShared::new();
        let sound = playing_sound(&shared);
        let run = MixerRun::start(&shared, true);
        thread::sleep(Duration::from_millis(50));

        // What a backend shutdown leaves behind after losing the device.
        run.device.set_running(false);
        thread::sleep(Duration::from_millis(200));
        assert!(sound.get_time() > 0.0, "clock stuck at {}", sound.get_time());
    }

    #[test]
    fn room_is_capped_by_buffer_capacity() {
        assert_eq!(required_room(512, 48_000, 48_000, 2, 8192), 1024);
        assert_eq!(required_room(512, 48_000, 48_000, 6, 1024), 1024);
        // Resampling bursts a whole chunk at once.
        assert_eq!(required_room(256, 48_000, 96_000, 2, 1 << 16), 4096);
    }
}
