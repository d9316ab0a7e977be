//! Block timestamp cache: block number → block timestamp.
//!
//! Finalized blocks never change, so entries are never invalidated. Many bids
//! can land in the same block, which makes this the main saving on
//! `eth_getBlockByNumber` round trips.

use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe block timestamp cache. Clones share the same map.
#[derive(Clone, Default)]
pub struct BlockTimestampCache {
    by_number: Arc<DashMap<u64, u64>>,
}

impl BlockTimestampCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, block_number: u64) -> Option<u64> {
        self.by_number.get(&block_number).map(|entry| *entry.value())
    }

    pub fn insert(&self, block_number: u64, timestamp: u64) {
        self.by_number.insert(block_number, timestamp);
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let cache = BlockTimestampCache::new();
        assert!(cache.is_empty());

        let other = cache.clone();
        other.insert(25_809_105, 1_641_000_000);

        assert_eq!(cache.get(25_809_105), Some(1_641_000_000));
        assert_eq!(cache.get(25_809_106), None);
        assert_eq!(cache.len(), 1);
    }
}
