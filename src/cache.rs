//! Index-page and revprop caches (spec.md §5 "Index page and revprop
//! caches are shared across threads in a process, protected by the cache
//! implementation's own locking; their keys include the revprop
//! generation so stale entries from prior writers are ignored.").
//!
//! `clru::Lru` pairs a lock-free sharded map (`cmap`) with a background
//! eviction thread; `cmap` is not a dependency this crate carries, and a
//! background evictor is more machinery than a page cache needs here.
//! This uses [crate::util::Spinlock] guarding a plain bounded LRU instead,
//! which gives the same "shared across threads, cache owns its own
//! locking" contract at the scope this subsystem needs.

use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
};

use crate::{item::ItemNumber, layout::Revision, util::Spinlock};

struct Inner<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    max_entries: usize,
}

impl<K, V> Inner<K, V>
where
    K: Clone + Eq + Hash,
{
    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos).unwrap();
            self.order.push_back(k);
        }
    }

    fn insert(&mut self, key: K, value: V) {
        if self.map.insert(key.clone(), value).is_some() {
            self.touch(&key);
        } else {
            self.order.push_back(key);
            while self.map.len() > self.max_entries {
                if let Some(evicted) = self.order.pop_front() {
                    self.map.remove(&evicted);
                } else {
                    break;
                }
            }
        }
    }
}

/// A bounded, thread-shared LRU cache. Eviction is capacity-only (spec.md
/// does not size this by byte footprint, unlike `clru::Lru`, which tracks
/// both count and byte-size budgets).
pub struct Cache<K, V> {
    inner: Spinlock<Inner<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(max_entries: usize) -> Cache<K, V> {
        Cache {
            inner: Spinlock::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
                max_entries,
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.write();
        let value = guard.map.get(key).cloned();
        if value.is_some() {
            guard.touch(key);
        }
        value
    }

    pub fn put(&self, key: K, value: V) {
        self.inner.write().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner.write().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Key for a cached L2P/P2L index page: which revision file it belongs to
/// and which page within that file's index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageCacheKey {
    pub file_id: u64,
    pub page_index: u64,
}

/// Key for a cached revprop list. Includes the generation the entry was
/// read under so a writer's bump invalidates every cached revision at once
/// without iterating the cache (spec.md §5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RevpropCacheKey {
    pub revision: Revision,
    pub generation: u64,
}

pub type PageCache = Cache<PageCacheKey, Vec<u8>>;
pub type RevpropCache = Cache<RevpropCacheKey, crate::item::PropertyList>;

/// Key for a cached, already-materialized item body (spec.md §5 implies
/// readers may also cache decoded items, not just raw index pages).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemCacheKey {
    pub revision: Revision,
    pub item_number: ItemNumber,
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
