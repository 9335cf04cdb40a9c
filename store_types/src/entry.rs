use serde::{Deserialize, Serialize};

use crate::RecordKey;

/// A CacheEntry is a snapshot of a modified cached record handed to a writer
/// for persistence. The cache keeps ownership of the live record; the entry
/// only describes what to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: RecordKey,
    pub data: Vec<u8>,
}

impl CacheEntry {
    pub fn new<T: Into<Vec<u8>>>(key: RecordKey, data: T) -> Self {
        Self {
            key,
            data: data.into(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
