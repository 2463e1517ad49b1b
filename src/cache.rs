//! # Synchronized cache
//!
//! A map shared between threads, the typical "many reads, few writes" customer of the rwlock.
//! Lookups go under the read lock, everything that modifies the map goes under the write lock.

use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    sync::atomic::{AtomicU64, Ordering::Relaxed},
    thread,
};

use log::debug;
use rand::Rng;
use strum_macros::Display;

use crate::{
    critical_section::{CriticalSection, SpinSection},
    error::CacheError,
    rwlock::RwCell,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AddOrUpdateStatus {
    Added,
    Updated,
    Unchanged,
}

pub struct SynchronizedCache<K, V, C: CriticalSection = SpinSection> {
    inner: RwCell<HashMap<K, V>, C>,
}

impl<K, V> SynchronizedCache<K, V, SpinSection> {
    pub fn new() -> Self {
        Self {
            inner: RwCell::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for SynchronizedCache<K, V, SpinSection> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> SynchronizedCache<K, V, C>
where
    K: Eq + Hash + Debug,
    V: Clone + PartialEq,
    C: CriticalSection,
{
    pub fn with_section(section: C) -> Self {
        Self {
            inner: RwCell::with_section(HashMap::new(), section),
        }
    }

    pub fn read(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    /// # Errors
    /// [`CacheError::DuplicateKey`] if the key is already there, the stored value is kept
    pub fn add(&self, key: K, value: V) -> Result<(), CacheError> {
        let mut map = self.inner.write()?;
        if map.contains_key(&key) {
            return Err(CacheError::DuplicateKey {
                key: format!("{key:?}"),
            });
        }
        map.insert(key, value);
        Ok(())
    }

    pub fn add_or_update(&self, key: K, value: V) -> Result<AddOrUpdateStatus, CacheError> {
        let mut map = self.inner.write()?;
        let status = match map.get_mut(&key) {
            Some(current) if *current == value => AddOrUpdateStatus::Unchanged,
            Some(current) => {
                *current = value;
                AddOrUpdateStatus::Updated
            }
            None => {
                map.insert(key, value);
                AddOrUpdateStatus::Added
            }
        };
        Ok(status)
    }

    /// Returns whether the key was there
    pub fn delete(&self, key: &K) -> Result<bool, CacheError> {
        Ok(self.inner.write()?.remove(key).is_some())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CacheDemoConfig {
    pub readers: usize,
    pub writers: usize,
    /// keys 0..entries get written, split between the writers
    pub entries: u32,
    /// lookups per reader
    pub reads: u32,
}

impl Default for CacheDemoConfig {
    fn default() -> Self {
        Self {
            readers: 8,
            writers: 2,
            entries: 1_000,
            reads: 10_000,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheDemoReport {
    pub hits: u64,
    pub misses: u64,
    pub added: u64,
    pub updated: u64,
    pub final_len: usize,
}

/// Writers fill (and then rewrite) keys `0..entries` while readers look up random keys.
/// Every hit has to carry exactly the value of its own key, otherwise [`CacheError::WrongValue`].
pub fn exercise<C: CriticalSection>(
    cache: &SynchronizedCache<u32, String, C>,
    config: &CacheDemoConfig,
) -> Result<CacheDemoReport, CacheError> {
    let hits = AtomicU64::new(0);
    let misses = AtomicU64::new(0);
    let added = AtomicU64::new(0);
    let updated = AtomicU64::new(0);
    // with no writers the loop below doesn't run, the stride only has to be non-zero
    let stride = config.writers.max(1);

    thread::scope(|s| {
        let mut handles = Vec::new();
        for w in 0..config.writers as u32 {
            let (added, updated) = (&added, &updated);
            handles.push(s.spawn(move || -> Result<(), CacheError> {
                // the writer owns every key with key % writers == w
                for key in (w..config.entries).step_by(stride) {
                    cache.add(key, format!("value-{key}"))?;
                    added.fetch_add(1, Relaxed);
                }
                for key in (w..config.entries).step_by(stride) {
                    if cache.add_or_update(key, format!("value-{key}-v2"))?
                        == AddOrUpdateStatus::Updated
                    {
                        updated.fetch_add(1, Relaxed);
                    }
                }
                debug!("cache writer {w} done");
                Ok(())
            }));
        }
        for r in 0..config.readers {
            let (hits, misses) = (&hits, &misses);
            handles.push(s.spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..config.reads {
                    let key = rng.gen_range(0..config.entries.max(1));
                    match cache.read(&key) {
                        Some(value) => {
                            if value != format!("value-{key}") && value != format!("value-{key}-v2") {
                                return Err(CacheError::WrongValue {
                                    key: key.to_string(),
                                    value,
                                });
                            }
                            hits.fetch_add(1, Relaxed);
                        }
                        None => {
                            misses.fetch_add(1, Relaxed);
                        }
                    }
                }
                debug!("cache reader {r} done");
                Ok(())
            }));
        }
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect::<Result<(), CacheError>>()
    })?;

    Ok(CacheDemoReport {
        hits: hits.into_inner(),
        misses: misses.into_inner(),
        added: added.into_inner(),
        updated: updated.into_inner(),
        final_len: cache.len(),
    })
}

#[cfg(test)]
mod test {
    use crate::{critical_section::BlockingSection, error::LockError};

    use super::*;

    #[test]
    fn test_crud() {
        let cache = SynchronizedCache::new();
        assert!(cache.is_empty());

        cache.add(1, "one".to_string()).unwrap();
        assert_eq!(cache.read(&1).as_deref(), Some("one"));
        assert_eq!(cache.read(&2), None);

        assert_eq!(
            cache.add(1, "uno".to_string()),
            Err(CacheError::DuplicateKey {
                key: "1".to_string()
            })
        );
        assert_eq!(cache.read(&1).as_deref(), Some("one"));

        assert_eq!(cache.delete(&1), Ok(true));
        assert_eq!(cache.delete(&1), Ok(false));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_add_or_update() {
        let cache = SynchronizedCache::new();
        let status = |v: &str| cache.add_or_update("k", v.to_string()).unwrap();

        assert_eq!(status("a"), AddOrUpdateStatus::Added);
        assert_eq!(status("a"), AddOrUpdateStatus::Unchanged);
        assert_eq!(status("b"), AddOrUpdateStatus::Updated);
        assert_eq!(cache.read(&"k").as_deref(), Some("b"));
        assert_eq!(cache.len(), 1);
        assert_eq!(AddOrUpdateStatus::Unchanged.to_string(), "unchanged");
    }

    #[test]
    fn test_writes_are_not_reentrant_under_a_held_guard() {
        let cache: SynchronizedCache<u32, u32> = SynchronizedCache::new();
        let _held = cache.inner.write().unwrap();
        assert_eq!(
            cache.add(1, 1),
            Err(CacheError::Lock {
                source: LockError::ReentrantWrite
            })
        );
    }

    #[test]
    fn test_exercise_without_writers_writes_nothing() {
        let config = CacheDemoConfig {
            readers: 1,
            writers: 0,
            entries: 10,
            reads: 10,
        };
        let report = exercise(&SynchronizedCache::new(), &config).unwrap();
        assert_eq!(report.added, 0);
        assert_eq!(report.updated, 0);
        assert_eq!(report.final_len, 0);
        assert_eq!(report.misses, 10);
    }

    #[test]
    fn test_exercise_catches_foreign_values() {
        // key 1 holding key 10's value shares its prefix, it still has to be reported
        let cache = SynchronizedCache::new();
        cache.add(1, "value-10".to_string()).unwrap();
        let config = CacheDemoConfig {
            readers: 1,
            writers: 0,
            entries: 2,
            reads: 200,
        };
        assert_eq!(
            exercise(&cache, &config),
            Err(CacheError::WrongValue {
                key: "1".to_string(),
                value: "value-10".to_string()
            })
        );
    }

    #[test]
    fn test_exercise() {
        let config = CacheDemoConfig {
            readers: 4,
            writers: 3,
            entries: 300,
            reads: 2_000,
        };
        for report in [
            exercise(&SynchronizedCache::new(), &config).unwrap(),
            exercise(&SynchronizedCache::with_section(BlockingSection::new()), &config).unwrap(),
        ] {
            assert_eq!(report.added, 300);
            assert_eq!(report.updated, 300);
            assert_eq!(report.final_len, 300);
            assert_eq!(report.hits + report.misses, 4 * 2_000);
        }
    }
}
