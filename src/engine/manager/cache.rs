use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;

use crate::engine::sound::SoundData;

/// Decoded sounds keyed by path, least recently used evicted first.
///
/// A limit of 0 disables caching.
pub struct SoundCache {
    entries: LruCache<PathBuf, Arc<SoundData>>,
    limit: usize,
}

impl SoundCache {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN)),
            limit,
        }
    }

    /// Looks `path` up and marks it as the most recently used entry.
    pub fn get(&mut self, path: &Path) -> Option<Arc<SoundData>> {
        self.entries.get(path).cloned()
    }

    pub fn insert(&mut self, path: &Path, data: Arc<SoundData>) {
        if self.limit == 0 {
            return;
        }
        if let Some((evicted, _)) = self.entries.push(path.to_path_buf(), data) {
            if evicted.as_path() != path {
                log::debug!("evicting {} from sound cache", evicted.display());
            }
        }
    }

    pub fn remove(&mut self, path: &Path) -> Option<Arc<SoundData>> {
        self.entries.pop(path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        match NonZeroUsize::new(limit) {
            Some(capacity) => self.entries.resize(capacity),
            None => self.entries.clear(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &str) -> Arc<SoundData> {
        Arc::new(SoundData::silent(name, 1.0, 1, 100))
    }

    #[test]
    fn caches_same_path() {
        let mut cache = SoundCache::new(4);
        let path = Path::new("/test/sound.wav");
        cache.insert(path, data("a"));
        let first = cache.get(path).unwrap();
        let second = cache.get(path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = SoundCache::new(2);
        cache.insert(Path::new("a"), data("a"));
        cache.insert(Path::new("b"), data("b"));
        // Touching "a" leaves "b" as the eviction candidate.
        assert!(cache.get(Path::new("a")).is_some());
        cache.insert(Path::new("c"), data("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(Path::new("b")).is_none());
        assert!(cache.get(Path::new("a")).is_some());
        assert!(cache.get(Path::new("c")).is_some());

        cache.set_limit(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(Path::new("c")).is_some());
    }

    #[test]
    fn reinserting_a_path_replaces_it() {
        let mut cache = SoundCache::new(2);
        cache.insert(Path::new("a"), data("old"));
        cache.insert(Path::new("a"), data("new"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(Path::new("a")).unwrap().name(), "new");
    }

    #[test]
    fn eviction_keeps_data_alive_for_holders() {
        let mut cache = SoundCache::new(1);
        let held = data("a");
        cache.insert(Path::new("a"), held.clone());
        cache.insert(Path::new("b"), data("b"));
        assert!(cache.get(Path::new("a")).is_none());
        assert_eq!(held.name(), "a");
    }

    #[test]
    fn zero_limit_disables_caching() {
        let mut cache = SoundCache::new(0);
        cache.insert(Path::new("a"), data("a"));
        assert!(cache.is_empty());

        let mut cache = SoundCache::new(2);
        cache.insert(Path::new("a"), data("a"));
        cache.set_limit(0);
        assert!(cache.is_empty());
        cache.insert(Path::new("b"), data("b"));
        assert!(cache.is_empty());
        assert_eq!(cache.limit(), 0);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = SoundCache::new(4);
        cache.insert(Path::new("a"), data("a"));
        cache.insert(Path::new("b"), data("b"));
        assert!(cache.remove(Path::new("a")).is_some());
        assert!(cache.remove(Path::new("a")).is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
