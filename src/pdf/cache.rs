//! LRU cache for extracted page text

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::types::PageText;

/// LRU cache of extracted text, keyed by page index
pub(crate) struct TextCache {
    cache: LruCache<usize, Arc<PageText>>,
}

impl TextCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get cached text, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, page: usize) -> Option<Arc<PageText>> {
        self.cache.get(&page).cloned()
    }

    /// Insert page text, returning an Arc to it
    pub fn insert(&mut self, page: usize, text: PageText) -> Arc<PageText> {
        let arc = Arc::new(text);
        self.cache.put(page, arc.clone());
        arc
    }

    #[cfg(test)]
    pub fn contains(&self, page: usize) -> bool {
        self.cache.contains(&page)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = TextCache::new(2);
        cache.insert(0, PageText::default());
        cache.insert(1, PageText::default());

        // Touch page 0 so page 1 becomes the eviction candidate
        assert!(cache.get(0).is_some());
        cache.insert(2, PageText::default());

        assert!(cache.contains(0));
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_becomes_one() {
        let cache = TextCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_returns_shared_handle() {
        let mut cache = TextCache::new(4);
        let stored = cache.insert(3, PageText::default());
        let fetched = cache.get(3).unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));
    }
}
