use std::path::PathBuf;

pub mod error;
pub mod test_utils;

mod disk;
mod memory;
mod writer_manager;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use writer_manager::get_writer;

use error::StorageFault;
use store_types::CacheEntry;

/// A CacheWriter is called by the cache to persist a changed record that is
/// about to be dropped from the cache.
///
/// On success the backing store durably reflects the entry's payload for the
/// entry's key. On failure the store holds no observable partial write and the
/// fault is reported to the caller synchronously; no retries happen here, the
/// calling cache decides whether eviction proceeds or is aborted.
#[cfg_attr(test, mockall::automock)]
pub trait CacheWriter: Send + Sync {
    fn write_back(&self, entry: &CacheEntry) -> Result<(), StorageFault>;
}

/// Configuration for a disk-backed writer. Hashable so it can key the shared
/// writer map in [`get_writer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreConfig {
    pub store_directory: PathBuf,
    /// Byte budget for the store, 0 means unlimited. A write pushing the store
    /// past its budget fails with [`error::StorageFault::CapacityExhausted`];
    /// reclaiming space is the caller's policy, not the writer's.
    pub capacity: u64,
}

#[cfg(test)]
mod tests {
    use store_types::RecordKey;

    use super::*;
    use crate::test_utils::FailingStore;

    #[test]
    fn test_mock_writer_scripts_a_fault() {
        let mut mock = MockCacheWriter::new();
        mock.expect_write_back()
            .times(1)
            .returning(|_| Err(StorageFault::corruption("scripted fault")));

        let entry = CacheEntry::new(RecordKey::new("p", 7), vec![1u8, 2, 3]);
        let result = mock.write_back(&entry);
        assert!(matches!(result, Err(StorageFault::Corruption(_))));
    }

    #[test]
    fn test_failing_store_raises_fault_and_records_nothing() {
        let store = FailingStore::new();
        let entry = test_utils::random_entry();

        assert!(matches!(
            store.write_back(&entry),
            Err(StorageFault::IO(_))
        ));
        assert_eq!(store.attempts(), 1);
    }

    #[test]
    fn test_writer_usable_as_trait_object() {
        let store: std::sync::Arc<dyn CacheWriter> = std::sync::Arc::new(MemoryStore::default());
        let entry = CacheEntry::new(RecordKey::new("obj", 1), b"bytes".to_vec());
        store.write_back(&entry).unwrap();
    }
}
