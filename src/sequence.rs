//! Identifier allocation for new log entries
//!
//! A [`SequenceAllocator`] only exists once it is ready: it is built from the
//! highest persisted identifier at startup, then shared behind an `Arc` with
//! every entry-creation path. Identifiers are handed out with a single atomic
//! increment, so [`SequenceAllocator::next`] never blocks and never fails.

use crate::error::LogbookError;
use crate::state::EntryStore;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{info, warn};

#[derive(Debug)]
pub struct SequenceAllocator {
    counter: AtomicI64,
    degraded: bool,
}

impl SequenceAllocator {
    /// Ready allocator whose first identifier is `current_max + 1`
    pub fn initialize(current_max: i64) -> Self {
        Self {
            counter: AtomicI64::new(current_max.max(0)),
            degraded: false,
        }
    }

    /// Seed from the store's highest identifier.
    ///
    /// A failed read still yields a ready allocator counting from zero; the
    /// failure is logged as [`LogbookError::IdentityAllocationDegraded`].
    pub async fn bootstrap(store: &dyn EntryStore) -> Self {
        match store.max_id().await {
            Ok(current_max) => {
                info!(current_max, "Sequence allocator ready");
                Self::initialize(current_max)
            }
            Err(e) => {
                let degraded = LogbookError::IdentityAllocationDegraded(format!(
                    "could not read the current maximum identifier: {}",
                    e
                ));
                warn!(
                    error = %degraded,
                    code = degraded.error_code(),
                    "Sequence allocator seeded from zero"
                );
                Self {
                    counter: AtomicI64::new(0),
                    degraded: true,
                }
            }
        }
    }

    /// Allocate the next identifier
    pub fn next(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last identifier handed out (or the seed, if none yet)
    pub fn current(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// True when the startup read failed and the counter started from zero
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InMemoryStore;
    use crate::models::LogEntry;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_initialize_and_next() {
        let allocator = SequenceAllocator::initialize(41);
        assert_eq!(allocator.current(), 41);
        assert_eq!(allocator.next(), 42);
        assert_eq!(allocator.next(), 43);
        assert!(!allocator.is_degraded());
    }

    #[test]
    fn test_negative_seed_clamped() {
        let allocator = SequenceAllocator::initialize(-5);
        assert_eq!(allocator.next(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_from_store() {
        let store = InMemoryStore::new();
        let mut entry = LogEntry::new("a", "t", "d").with_logbook("ops");
        entry.id = Some(17);
        store.put(&entry).await.unwrap();

        let allocator = SequenceAllocator::bootstrap(&store).await;
        assert_eq!(allocator.next(), 18);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let allocator = Arc::new(SequenceAllocator::initialize(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || (0..1000).map(|_| allocator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            // each caller observes its own values in increasing order
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for id in ids {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 8000);
        assert_eq!(allocator.current(), 8000);
    }
}
