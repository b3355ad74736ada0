use super::{check_quota, KeyValueStore};
use crate::error::{KeepsakeError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const VALUE_EXT: &str = ".json";

/// File-backed key-value store: one `<key>.json` file per key under `root`.
pub struct FileKv {
    root: PathBuf,
    capacity: Option<usize>,
}

impl FileKv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            capacity: None,
        }
    }

    /// Limit the total size of all keys and values, in bytes.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}{}", safe, VALUE_EXT))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(KeepsakeError::Io)?;
        }
        Ok(())
    }

    /// Bytes used by all stored values, counting each key by its file stem.
    fn used_bytes(&self) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut used = 0;
        for entry in fs::read_dir(&self.root).map_err(KeepsakeError::Io)? {
            let path = entry.map_err(KeepsakeError::Io)?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(VALUE_EXT) else {
                continue;
            };
            let len = fs::metadata(&path).map_err(KeepsakeError::Io)?.len() as usize;
            used += stem.len() + len;
        }
        Ok(used)
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(KeepsakeError::Io)?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        check_quota(self.capacity, self.used_bytes()?, key, value)?;
        self.ensure_dir()?;

        // Write to a temp file and rename so a crash never leaves half a value behind
        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, value).map_err(KeepsakeError::Io)?;
        fs::rename(&tmp, self.value_path(key)).map_err(KeepsakeError::Io)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.value_path(key);
        if path.exists() {
            fs::remove_file(path).map_err(KeepsakeError::Io)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if !self.root.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.root).map_err(KeepsakeError::Io)? {
            let path = entry.map_err(KeepsakeError::Io)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(path).map_err(KeepsakeError::Io)?;
            }
        }
        Ok(())
    }
}
