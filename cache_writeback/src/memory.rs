use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use store_types::{CacheEntry, RecordKey};

use crate::error::StorageFault;
use crate::CacheWriter;

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<RecordKey, Vec<u8>>,
    total_bytes: u64,
}

/// MemoryStore is a CacheWriter implementor that keeps written-back records in
/// memory, for ephemeral stores and as a test double.
///
/// Writing the same key twice overwrites the record; that makes this backend
/// idempotent, which is a property of the backend and not of the contract.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn get(&self, key: &RecordKey) -> Result<Option<Vec<u8>>, StorageFault> {
        let state = self.state.read()?;
        Ok(state.records.get(key).cloned())
    }

    pub fn num_records(&self) -> Result<usize, StorageFault> {
        Ok(self.state.read()?.records.len())
    }

    pub fn total_bytes(&self) -> Result<u64, StorageFault> {
        Ok(self.state.read()?.total_bytes)
    }

    pub fn clear(&self) -> Result<(), StorageFault> {
        let mut state = self.state.write()?;
        state.records.clear();
        state.total_bytes = 0;
        Ok(())
    }
}

impl CacheWriter for MemoryStore {
    fn write_back(&self, entry: &CacheEntry) -> Result<(), StorageFault> {
        let mut state = self.state.write()?;
        if let Some(old) = state.records.insert(entry.key.clone(), entry.data.clone()) {
            state.total_bytes -= old.len() as u64;
        }
        state.total_bytes += entry.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use store_types::RecordKey;

    use super::*;

    #[test]
    fn test_write_back_then_read() {
        let store = MemoryStore::default();
        let key = RecordKey::new("K", 0);
        let entry = CacheEntry::new(key.clone(), b"payload-bytes".to_vec());

        store.write_back(&entry).unwrap();

        assert_eq!(store.get(&key).unwrap(), Some(b"payload-bytes".to_vec()));
        assert_eq!(store.num_records().unwrap(), 1);
        assert_eq!(store.total_bytes().unwrap(), entry.len() as u64);
    }

    #[test]
    fn test_missing_key_reads_none() {
        let store = MemoryStore::default();
        assert_eq!(store.get(&RecordKey::new("absent", 3)).unwrap(), None);
    }

    #[test]
    fn test_double_write_back_is_backend_idempotent() {
        let store = MemoryStore::default();
        let entry = CacheEntry::new(RecordKey::new("twice", 1), vec![9u8; 64]);

        store.write_back(&entry).unwrap();
        store.write_back(&entry).unwrap();

        assert_eq!(store.num_records().unwrap(), 1);
        assert_eq!(store.total_bytes().unwrap(), 64);
        assert_eq!(store.get(&entry.key).unwrap(), Some(vec![9u8; 64]));
    }

    #[test]
    fn test_overwrite_adjusts_accounting() {
        let store = MemoryStore::default();
        let key = RecordKey::new("grow", 2);

        store
            .write_back(&CacheEntry::new(key.clone(), vec![0u8; 100]))
            .unwrap();
        store
            .write_back(&CacheEntry::new(key.clone(), vec![1u8; 40]))
            .unwrap();

        assert_eq!(store.total_bytes().unwrap(), 40);
        assert_eq!(store.get(&key).unwrap(), Some(vec![1u8; 40]));
    }

    #[test]
    fn test_empty_payload_accepted() {
        let store = MemoryStore::default();
        let key = RecordKey::new("empty", 0);

        store
            .write_back(&CacheEntry::new(key.clone(), Vec::<u8>::new()))
            .unwrap();

        assert_eq!(store.get(&key).unwrap(), Some(Vec::new()));
        assert_eq!(store.total_bytes().unwrap(), 0);
    }

    #[test]
    fn test_clear_resets_state() {
        let store = MemoryStore::default();
        store
            .write_back(&CacheEntry::new(RecordKey::new("a", 0), vec![1u8; 10]))
            .unwrap();

        store.clear().unwrap();

        assert_eq!(store.num_records().unwrap(), 0);
        assert_eq!(store.total_bytes().unwrap(), 0);
    }
}
