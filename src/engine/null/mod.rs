use std::path::Path;
use std::sync::{Arc, Weak};

use crate::engine::clock::SoundClock;
use crate::engine::config::EngineConfig;
use crate::engine::manager::{load_cached, AudioManager, SoundCache};
use crate::engine::sound::{AudioSound, SoundData, SoundHandle, SoundStatus};

/// Sound handle with no audio output.
///
/// Runs the full playback state machine; its clock only moves when the
/// owning `NullManager` is updated. A `NullSound` is also what every manager
/// hands out for a resource that failed to load.
pub struct NullSound {
    name: String,
    clock: SoundClock,
}

impl NullSound {
    pub(crate) fn new(name: String, clock: SoundClock) -> Self {
        Self { name, clock }
    }

    /// A handle in the terminal `Bad` state.
    pub(crate) fn bad(name: impl Into<String>) -> Self {
        Self::new(name.into(), SoundClock::bad())
    }

    fn clock(&self) -> &SoundClock {
        &self.clock
    }
}

impl AudioSound for NullSound {
    fn play(&self) {
        self.clock.play();
    }

    fn stop(&self) {
        self.clock.stop();
    }

    fn set_loop(&self, looping: bool) {
        self.clock.set_loop(looping);
    }

    fn get_loop(&self) -> bool {
        self.clock.get_loop()
    }

    fn set_loop_count(&self, loop_count: u32) {
        self.clock.set_loop_count(loop_count);
    }

    fn get_loop_count(&self) -> u32 {
        self.clock.get_loop_count()
    }

    fn set_time(&self, start_time: f32) {
        self.clock.set_time(start_time);
    }

    fn get_time(&self) -> f32 {
        self.clock.get_time()
    }

    fn set_volume(&self, volume: f32) {
        self.clock.set_volume(volume);
    }

    fn get_volume(&self) -> f32 {
        self.clock.get_volume()
    }

    fn set_balance(&self, balance_right: f32) {
        self.clock.set_balance(balance_right);
    }

    fn get_balance(&self) -> f32 {
        self.clock.get_balance()
    }

    fn set_active(&self, active: bool) {
        self.clock.set_active(active);
    }

    fn get_active(&self) -> bool {
        self.clock.get_active()
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> f32 {
        self.clock.length()
    }

    fn status(&self) -> SoundStatus {
        self.clock.status()
    }
}

impl Drop for NullSound {
    fn drop(&mut self) {
        self.clock.stop();
    }
}

/// A registered handle and the fraction of a frame its last update owed.
struct TrackedSound {
    sound: Weak<NullSound>,
    carry: f64,
}

/// Manager without an output device.
///
/// Useful headless and in tests: `update()` plays the part of the mixing
/// thread and advances every playing sound.
pub struct NullManager {
    config: EngineConfig,
    cache: SoundCache,
    sounds: Vec<TrackedSound>,
    active: bool,
    volume: f32,
}

impl NullManager {
    pub fn new(config: EngineConfig) -> Self {
        log::info!("null audio manager created");
        Self {
            cache: SoundCache::new(config.cache_limit),
            active: config.active,
            volume: 1.0,
            sounds: Vec::new(),
            config,
        }
    }

    /// Advances every playing sound by `dt` seconds of playback.
    ///
    /// Partial frames are carried to the next update, so a fixed step that
    /// is not a whole number of frames does not drift.
    pub fn update(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.sounds.retain_mut(|tracked| {
            let Some(sound) = tracked.sound.upgrade() else {
                return false;
            };
            let clock = sound.clock();
            if clock.status() != SoundStatus::Playing {
                tracked.carry = 0.0;
                return true;
            }
            let exact = dt as f64 * clock.sample_rate() as f64 + tracked.carry;
            let frames = exact.floor();
            tracked.carry = exact - frames;
            clock.advance(frames as u64);
            true
        });
    }

    /// Number of handles still held by someone.
    pub fn sound_count(&mut self) -> usize {
        self.live_sounds().len()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    fn live_sounds(&mut self) -> Vec<Arc<NullSound>> {
        let mut live = Vec::new();
        self.sounds.retain(|tracked| match tracked.sound.upgrade() {
            Some(sound) => {
                live.push(sound);
                true
            }
            None => false,
        });
        live
    }

    fn register(&mut self, data: &SoundData) -> SoundHandle {
        let clock = SoundClock::new(
            data.frames(),
            data.sample_rate(),
            &self.config.sound_defaults,
            self.active,
        );
        let sound = Arc::new(NullSound::new(data.name().to_string(), clock));
        self.sounds.push(TrackedSound {
            sound: Arc::downgrade(&sound),
            carry: 0.0,
        });
        sound
    }
}

impl Default for NullManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AudioManager for NullManager {
    fn get_sound(&mut self, path: &Path) -> SoundHandle {
        match load_cached(&mut self.cache, path, None) {
            Ok(data) => self.register(&data),
            Err(err) => {
                log::warn!("could not load {}: {}", path.display(), err);
                Arc::new(NullSound::bad(path.display().to_string()))
            }
        }
    }

    fn create_sound(&mut self, data: SoundData) -> SoundHandle {
        self.register(&data)
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
        for sound in self.live_sounds() {
            sound.set_active(active);
        }
    }

    fn get_active(&self) -> bool {
        self.active
    }

    fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn get_volume(&self) -> f32 {
        self.volume
    }

    fn stop_all_sounds(&mut self) {
        for sound in self.live_sounds() {
            sound.stop();
        }
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
        true
    }
}

impl Drop for NullManager {
    fn drop(&mut self) {
        self.stop_all_sounds();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::decoder::tests::write_wav;

    fn ten_seconds(manager: &mut NullManager) -> SoundHandle {
        manager.create_sound(SoundData::silent("ten", 10.0, 1, 100))
    }

    #[test]
    fn loop_count_scenario() {
        let mut manager = NullManager::default();
        let sound = ten_seconds(&mut manager);
        assert_eq!(sound.length(), 10.0);
        sound.set_loop_count(3);
        sound.play();

        manager.update(10.0);
        manager.update(10.0);
        assert_eq!(sound.status(), SoundStatus::Playing);
        manager.update(10.0);
        assert_eq!(sound.status(), SoundStatus::Ready);
    }

    #[test]
    fn get_time_advances_with_updates() {
        let mut manager = NullManager::default();
        let sound = ten_seconds(&mut manager);
        sound.play();
        let before = sound.get_time();
        manager.update(0.5);
        let after = sound.get_time();
        assert!(after > before);
        assert_eq!(after, 0.5);
    }

    #[test]
    fn fractional_steps_do_not_drift() {
        let mut manager = NullManager::default();
        let sound = ten_seconds(&mut manager);
        sound.play();
        // 100Hz at 60 updates a second is 1.67 frames per update.
        for _ in 0..60 {
            manager.update(1.0 / 60.0);
        }
        assert!((sound.get_time() - 1.0).abs() <= 0.01, "time {}", sound.get_time());

        for _ in 0..240 {
            manager.update(1.0 / 60.0);
        }
        assert!((sound.get_time() - 5.0).abs() <= 0.01, "time {}", sound.get_time());
    }

    #[test]
    fn new_sounds_inherit_active_state() {
        let mut manager = NullManager::default();
        let early = ten_seconds(&mut manager);
        assert!(early.get_active());

        manager.set_active(false);
        assert!(!early.get_active());
        let late = ten_seconds(&mut manager);
        assert!(!late.get_active());

        manager.set_active(true);
        assert!(early.get_active() && late.get_active());
    }

    #[test]
    fn sound_defaults_come_from_config() {
        let mut config = EngineConfig::default();
        config.sound_defaults.volume = 0.5;
        config.sound_defaults.loop_count = 0;
        let mut manager = NullManager::new(config);
        let sound = ten_seconds(&mut manager);
        assert_eq!(sound.get_volume(), 0.5);
        assert!(sound.get_loop());
    }

    #[test]
    fn unloadable_file_gives_bad_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ogg");
        std::fs::write(&path, b"garbage").unwrap();

        let mut manager = NullManager::default();
        let sound = manager.get_sound(&path);
        assert_eq!(sound.status(), SoundStatus::Bad);
        sound.play();
        manager.update(1.0);
        assert_eq!(sound.status(), SoundStatus::Bad);
        assert_eq!(sound.get_time(), 0.0);
        assert!(sound.get_name().ends_with("broken.ogg"));
        assert_eq!(manager.cached_count(), 0);
    }

    #[test]
    fn loads_and_caches_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beep.wav");
        write_wav(&path, 8000, 1, 16_000, 1000);

        let mut manager = NullManager::default();
        let first = manager.get_sound(&path);
        let second = manager.get_sound(&path);
        assert_eq!(first.status(), SoundStatus::Ready);
        assert_eq!(first.length(), 2.0);
        assert_eq!(first.get_name(), second.get_name());
        assert_eq!(manager.cached_count(), 1);

        manager.uncache_sound(&path);
        assert_eq!(manager.cached_count(), 0);
        assert_eq!(first.length(), 2.0);
    }

    #[test]
    fn dropped_handles_are_forgotten() {
        let mut manager = NullManager::default();
        let sound = ten_seconds(&mut manager);
        let _other = ten_seconds(&mut manager);
        assert_eq!(manager.sound_count(), 2);
        drop(sound);
        assert_eq!(manager.sound_count(), 1);
    }

    #[test]
    fn handles_outlive_manager() {
        let mut manager = NullManager::default();
        let sound = ten_seconds(&mut manager);
        sound.play();
        drop(manager);
        assert_eq!(sound.status(), SoundStatus::Ready);
        sound.play();
        sound.set_volume(0.2);
        assert_eq!(sound.get_volume(), 0.2);
        sound.stop();
    }

    #[test]
    fn stop_all_and_master_volume() {
        let mut manager = NullManager::default();
        let a = ten_seconds(&mut manager);
        let b = ten_seconds(&mut manager);
        a.play();
        b.play();
        manager.stop_all_sounds();
        assert_eq!(a.status(), SoundStatus::Ready);
        assert_eq!(b.status(), SoundStatus::Ready);

        manager.set_volume(3.0);
        assert_eq!(manager.get_volume(), 1.0);
        manager.set_cache_limit(2);
        assert_eq!(manager.get_cache_limit(), 2);
        assert!(manager.is_valid());
    }
}
