use std::array::TryFromSliceError;
use std::sync::PoisonError;

use thiserror::Error;

/// Every way a persistence attempt can fail. Faults propagate to the calling
/// cache unmodified; nothing in this crate retries or suppresses them.
#[derive(Debug, Error)]
pub enum StorageFault {
    #[error("IO: {0}")]
    IO(#[from] std::io::Error),
    #[error("corrupt record: {0}")]
    Corruption(String),
    #[error("capacity exhausted: store would hold {needed} bytes, capacity is {capacity}")]
    CapacityExhausted { needed: u64, capacity: u64 },
    #[error("store lock poisoned")]
    LockPoison,
}

impl StorageFault {
    pub fn corruption<T: ToString>(value: T) -> StorageFault {
        StorageFault::Corruption(value.to_string())
    }
}

impl<T> From<PoisonError<T>> for StorageFault {
    fn from(_value: PoisonError<T>) -> Self {
        StorageFault::LockPoison
    }
}

impl From<TryFromSliceError> for StorageFault {
    fn from(value: TryFromSliceError) -> Self {
        StorageFault::corruption(value)
    }
}
