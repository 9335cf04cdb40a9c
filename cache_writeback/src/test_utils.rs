use std::io::ErrorKind;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use store_types::{CacheEntry, RecordKey};

use crate::error::StorageFault;
use crate::CacheWriter;

pub const DEFAULT_PAYLOAD_LEN: usize = 4000;

pub fn random_key() -> RecordKey {
    RecordKey {
        prefix: "default".to_string(),
        pos: rand::rng().random::<u64>() % 1024,
    }
}

pub fn random_payload(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    (0..len).map(|_| rng.random()).collect()
}

pub fn random_entry() -> CacheEntry {
    CacheEntry::new(random_key(), random_payload(DEFAULT_PAYLOAD_LEN))
}

pub struct RandomEntryIterator;

impl Iterator for RandomEntryIterator {
    type Item = CacheEntry;

    fn next(&mut self) -> Option<Self::Item> {
        Some(random_entry())
    }
}

/// FailingStore is a CacheWriter implementor whose backing device always
/// reports an error; nothing is ever recorded. Counts attempts so tests can
/// check the caller saw every fault.
#[derive(Debug, Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl CacheWriter for FailingStore {
    fn write_back(&self, entry: &CacheEntry) -> Result<(), StorageFault> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(StorageFault::IO(std::io::Error::new(
            ErrorKind::Other,
            format!("injected device failure writing {}", entry.key),
        )))
    }
}
