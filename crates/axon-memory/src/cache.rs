// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bounded in-process memory with least-recently-used eviction

use ahash::AHashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::{MemoryError, MemoryResult, MemoryStore, MemoryValue};

struct Entry {
    value: MemoryValue,
    tick: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: AHashMap<String, Entry>,
    /// tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    closed: bool,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, key.to_string());
            self.next_tick += 1;
        }
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.recency.pop_first() {
            self.entries.remove(&key);
            tracing::trace!(key = %key, "evicted from memory cache");
        }
    }
}

/// In-process cache holding at most `capacity` entries
pub struct CacheMemory {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl CacheMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemoryStore for CacheMemory {
    fn set(&self, key: &str, value: MemoryValue) -> MemoryResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(MemoryError::Closed);
        }

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.value = value;
            inner.touch(key);
            return Ok(());
        }

        while inner.entries.len() >= self.capacity {
            inner.evict_oldest();
        }
        let tick = inner.next_tick;
        inner.next_tick += 1;
        inner.entries.insert(key.to_string(), Entry { value, tick });
        inner.recency.insert(tick, key.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<MemoryValue> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        inner.touch(key);
        inner.entries.get(key).map(|e| e.value.clone())
    }

    fn delete(&self, key: &str) -> MemoryResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(MemoryError::Closed);
        }
        if let Some(entry) = inner.entries.remove(key) {
            inner.recency.remove(&entry.tick);
        }
        Ok(())
    }

    fn clear(&self) -> MemoryResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(MemoryError::Closed);
        }
        inner.entries.clear();
        inner.recency.clear();
        Ok(())
    }

    fn close(&self) -> MemoryResult<()> {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
        inner.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let cache = CacheMemory::new(8);
        cache.set("name", "Clay".into()).unwrap();
        assert_eq!(cache.get("name"), Some(MemoryValue::from("Clay")));

        cache.set("name", "Zhang".into()).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("name").unwrap().as_str(), Some("Zhang"));

        cache.delete("name").unwrap();
        cache.delete("name").unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = CacheMemory::new(2);
        cache.set("a", MemoryValue::Int(1)).unwrap();
        cache.set("b", MemoryValue::Int(2)).unwrap();
        // reading "a" makes "b" the oldest
        assert!(cache.get("a").is_some());
        cache.set("c", MemoryValue::Int(3)).unwrap();

        assert!(cache.exists("a"));
        assert!(!cache.exists("b"));
        assert!(cache.exists("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_closed_cache_rejects_writes() {
        let cache = CacheMemory::new(4);
        cache.set("a", MemoryValue::Int(1)).unwrap();
        cache.close().unwrap();

        assert!(cache.get("a").is_none());
        assert!(matches!(cache.set("a", MemoryValue::Int(2)), Err(MemoryError::Closed)));
        assert!(matches!(cache.clear(), Err(MemoryError::Closed)));
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = std::sync::Arc::new(CacheMemory::new(1024));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.set(&format!("{}-{}", t, i), (i as i64).into()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
