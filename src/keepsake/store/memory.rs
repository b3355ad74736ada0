use super::{check_quota, KeyValueStore};
use crate::error::{KeepsakeError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// In-memory key-value store for testing.
///
/// Uses `RefCell` for interior mutability since keepsake is single-threaded.
#[derive(Default)]
pub struct MemoryKv {
    entries: RefCell<HashMap<String, String>>,
    capacity: Option<usize>,
    quota_failures: Cell<usize>,
    simulate_write_error: Cell<bool>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once keys plus values exceed `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Make the next `count` writes fail with `QuotaExceeded` regardless of size.
    pub fn fail_next_writes(&self, count: usize) {
        self.quota_failures.set(count);
    }

    /// Enable I/O error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn used_bytes(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(KeepsakeError::Io(std::io::Error::other(
                "Simulated write error",
            )));
        }

        let pending = self.quota_failures.get();
        if pending > 0 {
            self.quota_failures.set(pending - 1);
            return Err(KeepsakeError::QuotaExceeded {
                key: key.to_string(),
                needed: key.len() + value.len(),
                capacity: self.capacity.unwrap_or(0),
            });
        }

        check_quota(self.capacity, self.used_bytes(), key, value)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let kv = MemoryKv::new();
        kv.set("a", "1").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));

        kv.remove("a").unwrap();
        assert_eq!(kv.get("a").unwrap(), None);

        // Removing twice is fine
        kv.remove("a").unwrap();
    }

    #[test]
    fn capacity_counts_replaced_value() {
        let kv = MemoryKv::with_capacity(10);
        kv.set("k", "12345").unwrap(); // 6 bytes used

        // Replacing needs 6 more while the old 6 are still counted
        let err = kv.set("k", "abcde").unwrap_err();
        assert!(matches!(err, KeepsakeError::QuotaExceeded { .. }));

        kv.remove("k").unwrap();
        kv.set("k", "abcde").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("abcde"));
    }

    #[test]
    fn fail_next_writes_is_consumed() {
        let kv = MemoryKv::new();
        kv.fail_next_writes(1);
        assert!(kv.set("k", "v").is_err());
        assert!(kv.set("k", "v").is_ok());
    }

    #[test]
    fn clear_removes_everything() {
        let kv = MemoryKv::new();
        kv.set("a", "1").unwrap();
        kv.set("b", "2").unwrap();
        kv.clear().unwrap();
        assert!(kv.is_empty());
    }
}
