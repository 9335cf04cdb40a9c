use std::collections::HashMap;
use std::fs::{DirEntry, File};
use std::io::{ErrorKind, Read, Write};
use std::mem::size_of;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE;
use base64::engine::GeneralPurpose;
use base64::Engine;
use rand::Rng;
use record_file::{RecordFileHeader, RECORD_HEADER_LEN};
use store_types::{CacheEntry, RecordKey};
use tracing::{debug, warn};

use crate::error::StorageFault;
use crate::{CacheWriter, StoreConfig};

mod record_file;

// consistently use URL_SAFE (also file path safe) base64 codec
const BASE64_ENGINE: GeneralPurpose = URL_SAFE;
const PREFIX_DIR_NAME_LEN: usize = 2;

#[derive(Debug, Default)]
struct DiskState {
    // record file length on disk (header included), per key
    records: HashMap<RecordKey, u64>,
    total_bytes: u64,
}

/// DiskStore is a CacheWriter implementor that persists each record to its own
/// file under the store root.
///
/// The store layout is as follows: each record is one file whose name is the
/// base64 encoding of its key, grouped into subdirectories named after the
/// first 2 characters of that name to bound root fan-out.
///
/// store_root/
/// ├── [ab]/
/// │   ├── [key 1 (ab123...)]
/// │   └── [key 2 (ab456...)]
/// ├── [cd]/
/// │   └── [key 3 (cd789...)]
///
/// Each file is a [`RecordFileHeader`] followed by the payload. Writes go to a
/// temp file in the final directory, are synced, then renamed into place, so a
/// failed write leaves no observable record.
#[derive(Debug, Clone)]
pub struct DiskStore {
    store_root: PathBuf,
    capacity: Option<u64>,
    state: Arc<Mutex<DiskState>>,
}

impl DiskStore {
    /// Opens a store rooted at `config.store_directory`, scanning any record
    /// files already present there to rebuild byte accounting. Undecodable
    /// entries are skipped; record files whose size disagrees with their
    /// header are removed.
    pub fn initialize(config: &StoreConfig) -> Result<Self, StorageFault> {
        let store_root = config.store_directory.clone();
        // ensures we only enforce a real capacity
        let capacity = if config.capacity == 0 {
            None
        } else {
            Some(config.capacity)
        };
        let state = Self::initialize_state(&store_root)?;

        Ok(Self {
            store_root,
            capacity,
            state: Arc::new(Mutex::new(state)),
        })
    }

    fn initialize_state(store_root: &Path) -> Result<DiskState, StorageFault> {
        let mut state = DiskState::default();

        let Some(root_readdir) = read_dir(store_root)? else {
            return Ok(state);
        };

        // first level under the root holds the 2-character grouping directories
        for prefix_dir in root_readdir {
            let Some(prefix_dir) = is_ok_dir(prefix_dir)? else {
                continue;
            };

            let prefix_dir_name = prefix_dir.file_name();
            if prefix_dir_name.as_encoded_bytes().len() != PREFIX_DIR_NAME_LEN {
                debug!("skipping {prefix_dir_name:?}, name len != {PREFIX_DIR_NAME_LEN}");
                continue;
            }

            let Some(prefix_readdir) = read_dir(prefix_dir.path())? else {
                continue;
            };

            for record_file in prefix_readdir {
                let record_file = match record_file {
                    Ok(rf) => rf,
                    Err(e) => {
                        if e.kind() == ErrorKind::NotFound {
                            continue;
                        }
                        return Err(e.into());
                    }
                };
                let md = match record_file.metadata() {
                    Ok(md) => md,
                    Err(e) => {
                        if e.kind() == ErrorKind::NotFound {
                            continue;
                        }
                        return Err(e.into());
                    }
                };
                if !md.is_file() {
                    warn!("found non file under prefix dir: {:?}", record_file.path());
                    continue;
                }

                let file_name = record_file.file_name();
                let key = match try_parse_key(file_name.as_encoded_bytes()) {
                    Ok(key) => key,
                    Err(e) => {
                        warn!("skipping {file_name:?}, not a record file name: {e}");
                        continue;
                    }
                };

                // asserts that the grouping dir name is actually the prefix of this file name
                debug_assert_eq!(
                    file_name.as_encoded_bytes()[..PREFIX_DIR_NAME_LEN].to_ascii_uppercase(),
                    prefix_dir_name.as_encoded_bytes().to_ascii_uppercase(),
                    "{file_name:?}",
                );

                let mut file = match File::open(record_file.path()) {
                    Ok(f) => f,
                    Err(e) => {
                        if e.kind() == ErrorKind::NotFound {
                            continue;
                        }
                        return Err(e.into());
                    }
                };
                let header = match RecordFileHeader::deserialize(&mut file) {
                    Ok(h) => h,
                    Err(_) => {
                        warn!("removing {:?}, unreadable record header", record_file.path());
                        remove_file(record_file.path())?;
                        continue;
                    }
                };
                if md.len() != RECORD_HEADER_LEN as u64 + header.payload_len {
                    warn!(
                        "removing {:?}, file size does not match record header",
                        record_file.path()
                    );
                    remove_file(record_file.path())?;
                    continue;
                }

                state.total_bytes += md.len();
                state.records.insert(key, md.len());
            }
        }

        Ok(state)
    }

    /// Reads a record back, validating it against its header. A record that
    /// fails validation is removed from disk and from accounting, and the call
    /// reports a corruption fault.
    pub fn get(&self, key: &RecordKey) -> Result<Option<Vec<u8>>, StorageFault> {
        let mut state = self.state.lock()?;
        if !state.records.contains_key(key) {
            return Ok(None);
        }

        let path = self.record_path(key);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => match e.kind() {
                // the record file went away underneath us; drop it from accounting
                ErrorKind::NotFound => {
                    forget(&mut state, key);
                    return Ok(None);
                }
                _ => return Err(e.into()),
            },
        };

        let header = match RecordFileHeader::deserialize(&mut file) {
            Ok(h) => h,
            Err(_) => {
                remove_file(&path)?;
                forget(&mut state, key);
                return Err(StorageFault::corruption(format!(
                    "record {key} has an unreadable header"
                )));
            }
        };
        if file.metadata()?.len() != RECORD_HEADER_LEN as u64 + header.payload_len {
            remove_file(&path)?;
            forget(&mut state, key);
            return Err(StorageFault::corruption(format!(
                "record {key} size does not match its header"
            )));
        }

        let mut data = vec![0u8; header.payload_len as usize];
        file.read_exact(&mut data)?;
        if blake3::hash(&data) != header.payload_hash {
            warn!("record {key} failed content validation, removing");
            remove_file(&path)?;
            forget(&mut state, key);
            return Err(StorageFault::corruption(format!(
                "record {key} content hash mismatch"
            )));
        }

        Ok(Some(data))
    }

    pub fn contains(&self, key: &RecordKey) -> Result<bool, StorageFault> {
        Ok(self.state.lock()?.records.contains_key(key))
    }

    pub fn num_records(&self) -> Result<usize, StorageFault> {
        Ok(self.state.lock()?.records.len())
    }

    pub fn total_bytes(&self) -> Result<u64, StorageFault> {
        Ok(self.state.lock()?.total_bytes)
    }

    fn record_path(&self, key: &RecordKey) -> PathBuf {
        let file_name = file_name_for_key(key);
        let prefix_dir = &file_name[..PREFIX_DIR_NAME_LEN];
        self.store_root.join(prefix_dir).join(&file_name)
    }
}

impl CacheWriter for DiskStore {
    fn write_back(&self, entry: &CacheEntry) -> Result<(), StorageFault> {
        let header = RecordFileHeader::for_payload(&entry.data);
        let file_len = (RECORD_HEADER_LEN + entry.data.len()) as u64;

        // holding the state lock across the file write keeps write-backs to
        // the same store single-writer
        let mut state = self.state.lock()?;
        let old_len = state.records.get(&entry.key).copied().unwrap_or(0);

        if let Some(capacity) = self.capacity {
            let needed = state.total_bytes - old_len + file_len;
            if needed > capacity {
                return Err(StorageFault::CapacityExhausted { needed, capacity });
            }
        }

        write_record_file(&self.record_path(&entry.key), &header, &entry.data)?;

        state.records.insert(entry.key.clone(), file_len);
        state.total_bytes = state.total_bytes - old_len + file_len;
        debug!("wrote back record {} ({} payload bytes)", entry.key, entry.len());

        Ok(())
    }
}

fn forget(state: &mut DiskState, key: &RecordKey) {
    if let Some(len) = state.records.remove(key) {
        state.total_bytes -= len;
    }
}

/// Writes header + payload to a temp file in the final directory, syncs it,
/// then renames it over the final path. The rename makes overwrites of an
/// existing record atomic as well.
fn write_record_file(
    path: &Path,
    header: &RecordFileHeader,
    payload: &[u8],
) -> Result<(), StorageFault> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension(format!("{:x}.tmp", rand::rng().random::<u64>()));
    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        header.serialize(&mut file)?;
        file.write_all(payload)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }

    result.map_err(StorageFault::from)
}

fn file_name_for_key(key: &RecordKey) -> String {
    let mut buf = Vec::with_capacity(size_of::<u64>() + key.prefix.len());
    buf.extend_from_slice(&key.pos.to_le_bytes());
    buf.extend_from_slice(key.prefix.as_bytes());
    BASE64_ENGINE.encode(buf)
}

fn try_parse_key(file_name: &[u8]) -> Result<RecordKey, StorageFault> {
    let buf = BASE64_ENGINE
        .decode(file_name)
        .map_err(StorageFault::corruption)?;
    if buf.len() < size_of::<u64>() {
        return Err(StorageFault::corruption(
            "file name too short to hold a record position",
        ));
    }
    let pos = u64::from_le_bytes(buf[..size_of::<u64>()].try_into()?);
    let prefix = String::from(
        std::str::from_utf8(&buf[size_of::<u64>()..]).map_err(StorageFault::corruption)?,
    );
    Ok(RecordKey { prefix, pos })
}

fn read_dir(path: impl AsRef<Path>) -> Result<Option<std::fs::ReadDir>, StorageFault> {
    match std::fs::read_dir(path) {
        Ok(rd) => Ok(Some(rd)),
        Err(e) => {
            if e.kind() == ErrorKind::NotFound {
                return Ok(None);
            }
            Err(e.into())
        }
    }
}

fn is_ok_dir(dir_entry: std::io::Result<DirEntry>) -> Result<Option<DirEntry>, StorageFault> {
    let dir_entry = match dir_entry {
        Ok(de) => de,
        Err(e) => {
            if e.kind() == ErrorKind::NotFound {
                return Ok(None);
            }
            return Err(e.into());
        }
    };
    let md = match dir_entry.metadata() {
        Ok(md) => md,
        Err(e) => {
            if e.kind() == ErrorKind::NotFound {
                return Ok(None);
            }
            return Err(e.into());
        }
    };
    if !md.is_dir() {
        debug!("expected directory at {:?}, skipping", dir_entry.path());
        return Ok(None);
    }
    Ok(Some(dir_entry))
}

fn remove_file(path: impl AsRef<Path>) -> Result<(), StorageFault> {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            return Err(e.into());
        }
    }
    Ok(())
}
