pub mod cache;

use std::path::Path;
use std::sync::Arc;

use crate::engine::decoder::load_sound_data;
use crate::engine::error::AudioError;
use crate::engine::sound::{SoundData, SoundHandle};

pub use cache::SoundCache;

/// Owner of sound resources and device-wide policy.
///
/// Managers are the only way to obtain a `SoundHandle`. They keep decoded
/// data in a cache so handles for the same file share one buffer, and they
/// drive global state (active, master volume) through every live handle.
pub trait AudioManager {
    /// Returns a new handle for the file at `path`. A file that cannot be
    /// loaded yields a handle with `SoundStatus::Bad`.
    fn get_sound(&mut self, path: &Path) -> SoundHandle;

    /// Returns a new handle playing already decoded data.
    fn create_sound(&mut self, data: SoundData) -> SoundHandle;

    /// Activates or silences every live sound. New sounds inherit the flag.
    fn set_active(&mut self, active: bool);
    fn get_active(&self) -> bool;

    /// Master volume, 0.0 to 1.0.
    fn set_volume(&mut self, volume: f32);
    fn get_volume(&self) -> f32;

    fn stop_all_sounds(&mut self);

    /// Forgets the cached data for `path`. Live handles keep playing it.
    fn uncache_sound(&mut self, path: &Path);
    fn clear_cache(&mut self);
    fn set_cache_limit(&mut self, limit: usize);
    fn get_cache_limit(&self) -> usize;

    /// False when the manager has no working output.
    fn is_valid(&self) -> bool;
}

/// Looks `path` up in the cache, decoding and inserting it on a miss.
pub(crate) fn load_cached(
    cache: &mut SoundCache,
    path: &Path,
    target_rate: Option<u32>,
) -> Result<Arc<SoundData>, AudioError> {
    if let Some(data) = cache.get(path) {
        return Ok(data);
    }
    let data = Arc::new(load_sound_data(path, target_rate)?);
    log::info!(
        "loaded {} ({:.2}s, {}ch, {}Hz)",
        path.display(),
        data.duration_secs(),
        data.channels(),
        data.sample_rate()
    );
    cache.insert(path, data.clone());
    Ok(data)
}
