use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use once_cell::sync::Lazy;

use crate::error::StorageFault;
use crate::{CacheWriter, DiskStore, StoreConfig};

static WRITER_MANAGER: Lazy<WriterManager> = Lazy::new(WriterManager::new);

/// Returns the shared disk writer for this config, initializing one if no
/// live handle exists.
pub fn get_writer(config: &StoreConfig) -> Result<Arc<dyn CacheWriter>, StorageFault> {
    WRITER_MANAGER.get(config)
}

struct WriterManager {
    vals: Mutex<HashMap<StoreConfig, RefCell<Weak<dyn CacheWriter>>>>,
}

impl WriterManager {
    fn new() -> Self {
        Self {
            vals: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &StoreConfig) -> Result<Arc<dyn CacheWriter>, StorageFault> {
        let mut vals = self.vals.lock()?;
        if let Some(v) = vals.get_mut(key) {
            let w = v.borrow().clone();
            let result: Arc<dyn CacheWriter> = if let Some(value) = w.upgrade() {
                value
            } else {
                let result: Arc<dyn CacheWriter> = Arc::new(DiskStore::initialize(key)?);
                let weak = Arc::downgrade(&result);
                v.replace(weak);
                result
            };
            return Ok(result);
        }
        let result: Arc<dyn CacheWriter> = Arc::new(DiskStore::initialize(key)?);
        vals.insert(key.clone(), RefCell::new(Arc::downgrade(&result)));
        Ok(result)
    }
}
