use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use crate::{DecodedImage, ResourceKey};

/// In-memory image cache keyed by normalized URL.
///
/// Entries may disappear at any time (cost eviction or [`ImageCache::purge`]),
/// so a hit now says nothing about the next lookup.
#[derive(Debug, Default)]
pub struct ImageCache {
    inner: RwLock<CacheInner>,
    max_cost: Option<usize>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<ResourceKey, Arc<DecodedImage>>,
    /// Insertion order, oldest first.
    order: VecDeque<ResourceKey>,
    cost: usize,
}

impl CacheInner {
    fn remove(&mut self, key: &ResourceKey) {
        if let Some(old) = self.entries.remove(key) {
            self.cost -= old.byte_len();
            self.order.retain(|queued| queued != key);
        }
    }

    fn evict_oldest(&mut self) -> bool {
        match self.order.pop_front() {
            Some(key) => {
                if let Some(old) = self.entries.remove(&key) {
                    self.cost -= old.byte_len();
                }
                true
            }
            None => false,
        }
    }
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that keeps at most `max_cost` bytes of pixel data.
    pub fn with_max_cost(max_cost: usize) -> Self {
        Self {
            inner: RwLock::default(),
            max_cost: Some(max_cost),
        }
    }

    pub fn get(&self, key: &ResourceKey) -> Option<Arc<DecodedImage>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(key).cloned()
    }

    pub fn put(&self, key: ResourceKey, image: Arc<DecodedImage>) {
        let cost = image.byte_len();
        if self.max_cost.is_some_and(|max| cost > max) {
            return;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remove(&key);
        if let Some(max) = self.max_cost {
            while inner.cost + cost > max && inner.evict_oldest() {}
        }
        inner.cost += cost;
        inner.order.push_back(key.clone());
        inner.entries.insert(key, image);
    }

    /// Drops every entry. Call on memory pressure.
    pub fn purge(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.order.clear();
        inner.cost = 0;
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of pixel data currently held.
    pub fn cost(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).cost
    }
}
