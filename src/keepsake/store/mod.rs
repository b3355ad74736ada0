//! # Storage Port
//!
//! Everything keepsake persists on the device goes through the [`KeyValueStore`] trait:
//! a handful of string keys, each holding one JSON document. The sync core (cache, room
//! gate, message board) only ever sees this trait, never a concrete backend.
//!
//! ## Implementations
//!
//! - [`fs::FileKv`]: Production implementation, one file per key in a data directory.
//! - [`memory::MemoryKv`]: For testing logic without filesystem I/O.
//!
//! ## Capacity
//!
//! Both implementations accept an optional byte budget and fail writes that would exceed
//! it with [`KeepsakeError::QuotaExceeded`](crate::error::KeepsakeError::QuotaExceeded).
//! The check counts the value being replaced as still present, the way a browser's
//! storage area does while a write is in flight. Removing a key first is therefore the
//! only way to reclaim its space, which is what the cache's recovery path relies on.
//!
//! ## Storage Layout
//!
//! For `FileKv`:
//! ```text
//! <data dir>/local/
//! ├── keepsake.room-code.v1.json
//! ├── keepsake.records.v1.json
//! └── keepsake.messages.v1.json
//! ```

use crate::error::{KeepsakeError, Result};
use std::rc::Rc;

pub mod fs;
pub mod memory;

/// Abstract interface for device-local, string-valued persistence.
///
/// All methods take `&self`; implementations handle their own interior mutability
/// (keepsake is single-threaded, so `RefCell` is enough).
pub trait KeyValueStore {
    /// Read a value. Returns Ok(None) if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    /// Fails with `QuotaExceeded` when the write does not fit.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key.
    fn clear(&self) -> Result<()>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Rc<K> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Shared quota check: `used` already includes the entry being replaced.
pub(crate) fn check_quota(
    capacity: Option<usize>,
    used: usize,
    key: &str,
    value: &str,
) -> Result<()> {
    let Some(capacity) = capacity else {
        return Ok(());
    };
    let needed = key.len() + value.len();
    if used + needed > capacity {
        return Err(KeepsakeError::QuotaExceeded {
            key: key.to_string(),
            needed,
            capacity,
        });
    }
    Ok(())
}
