//! # Local Record Cache
//!
//! A lossy write-through copy of the records this device saved, kept in the
//! key-value port under [`RECORDS_KEY`].
//!
//! Inline `data:` payloads are stripped before every write (hero image → absent,
//! photo `src` → empty string), so the cache size does not grow with photo size.
//! Remote URLs and site paths are kept as-is.
//!
//! When a write does not fit, the cache drops its previously persisted list and
//! retries once. Whatever was cached before is lost; the new list is what remains.

use crate::error::{KeepsakeError, Result};
use crate::model::{is_inline_uri, Record};
use crate::store::KeyValueStore;

pub const RECORDS_KEY: &str = "keepsake.records.v1";

pub struct LocalCache<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> LocalCache<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Cached records in stored order. A missing or malformed value loads as empty.
    pub fn load(&self) -> Result<Vec<Record>> {
        let Some(raw) = self.kv.get(RECORDS_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Record>>(&raw) {
            Ok(records) => Ok(records
                .into_iter()
                .filter(|r| !r.slug.is_empty())
                .collect()),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed local record cache");
                Ok(Vec::new())
            }
        }
    }

    pub fn get(&self, slug: &str) -> Result<Option<Record>> {
        Ok(self.load()?.into_iter().find(|r| r.slug == slug))
    }

    /// Replace the cached list. Inline payloads are stripped first.
    pub fn save(&self, records: &[Record]) -> Result<()> {
        let lightweight: Vec<Record> = records.iter().map(strip_inline).collect();
        let value = serde_json::to_string(&lightweight)?;

        match self.kv.set(RECORDS_KEY, &value) {
            Err(KeepsakeError::QuotaExceeded { .. }) => {
                tracing::warn!(
                    bytes = value.len(),
                    "local storage full, dropping cached records and retrying"
                );
                self.kv.remove(RECORDS_KEY)?;
                self.kv.set(RECORDS_KEY, &value)?;
                tracing::info!("local record cache rewritten after clearing");
                Ok(())
            }
            other => other,
        }
    }

    /// Replace the record with the same slug in place, or put a new one first.
    pub fn upsert(&self, record: &Record) -> Result<()> {
        let mut records = self.load()?;
        match records.iter().position(|r| r.slug == record.slug) {
            Some(idx) => records[idx] = record.clone(),
            None => records.insert(0, record.clone()),
        }
        self.save(&records)
    }

    /// Remove a record by slug. Absent slugs leave the cache untouched.
    pub fn delete(&self, slug: &str) -> Result<()> {
        let records = self.load()?;
        if !records.iter().any(|r| r.slug == slug) {
            return Ok(());
        }
        let remaining: Vec<Record> = records.into_iter().filter(|r| r.slug != slug).collect();
        self.save(&remaining)
    }
}

/// The cacheable form of a record: inline image payloads removed.
pub fn strip_inline(record: &Record) -> Record {
    let mut light = record.clone();
    if light.hero_image.as_deref().is_some_and(is_inline_uri) {
        light.hero_image = None;
    }
    for photo in &mut light.photos {
        if photo.is_inline() {
            photo.src.clear();
        }
    }
    light
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Photo;
    use crate::store::memory::MemoryKv;

    const INLINE: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn record(slug: &str) -> Record {
        let mut r = Record::new(slug, slug.to_uppercase());
        r.photos = vec![Photo::new("https://cdn/a.jpg", "A")];
        r
    }

    #[test]
    fn empty_store_loads_nothing() {
        let cache = LocalCache::new(MemoryKv::new());
        assert!(cache.load().unwrap().is_empty());
    }

    #[test]
    fn strips_inline_payloads_but_keeps_the_rest() {
        let cache = LocalCache::new(MemoryKv::new());
        let mut r = record("trip");
        r.hero_image = Some(INLINE.to_string());
        r.photos.push(Photo::new(INLINE, "inline").with_caption("beach"));

        cache.save(&[r.clone()]).unwrap();
        let loaded = cache.load().unwrap();

        let mut expected = r;
        expected.hero_image = None;
        expected.photos[1].src = String::new();
        assert_eq!(loaded, vec![expected]);
    }

    #[test]
    fn remote_hero_is_kept() {
        let cache = LocalCache::new(MemoryKv::new());
        let mut r = record("trip");
        r.hero_image = Some("https://cdn/hero.jpg".to_string());
        cache.save(&[r.clone()]).unwrap();
        assert_eq!(cache.load().unwrap(), vec![r]);
    }

    #[test]
    fn malformed_value_loads_empty() {
        let kv = MemoryKv::new();
        kv.set(RECORDS_KEY, "{not json").unwrap();
        let cache = LocalCache::new(kv);
        assert!(cache.load().unwrap().is_empty());
    }

    #[test]
    fn entries_without_slug_are_filtered() {
        let kv = MemoryKv::new();
        let blank = Record::new("", "nameless");
        let value = serde_json::to_string(&vec![blank, record("ok")]).unwrap();
        kv.set(RECORDS_KEY, &value).unwrap();

        let loaded = LocalCache::new(kv).load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].slug, "ok");
    }

    #[test]
    fn upsert_puts_new_first_and_replaces_in_place() {
        let cache = LocalCache::new(MemoryKv::new());
        cache.upsert(&record("a")).unwrap();
        cache.upsert(&record("b")).unwrap();

        let mut changed = record("a");
        changed.title = "Changed".to_string();
        cache.upsert(&changed).unwrap();

        let slugs: Vec<_> = cache.load().unwrap().into_iter().map(|r| r.slug).collect();
        assert_eq!(slugs, vec!["b", "a"]);
        assert_eq!(cache.get("a").unwrap().unwrap().title, "Changed");
    }

    #[test]
    fn delete_missing_slug_is_noop() {
        let cache = LocalCache::new(MemoryKv::new());
        cache.upsert(&record("a")).unwrap();
        cache.delete("nope").unwrap();
        assert_eq!(cache.load().unwrap().len(), 1);

        cache.delete("a").unwrap();
        assert!(cache.load().unwrap().is_empty());
    }

    #[test]
    fn quota_recovery_replaces_previous_data() {
        let kv = MemoryKv::new();
        let cache = LocalCache::new(kv);
        cache.save(&[record("old")]).unwrap();

        cache.kv.fail_next_writes(1);
        cache.save(&[record("new")]).unwrap();

        let slugs: Vec<_> = cache.load().unwrap().into_iter().map(|r| r.slug).collect();
        assert_eq!(slugs, vec!["new"]);
    }

    #[test]
    fn second_quota_failure_surfaces() {
        let cache = LocalCache::new(MemoryKv::new());
        cache.kv.fail_next_writes(2);
        let err = cache.save(&[record("a")]).unwrap_err();
        assert!(matches!(err, KeepsakeError::QuotaExceeded { .. }));
    }

    #[test]
    fn other_write_errors_are_not_retried() {
        let cache = LocalCache::new(MemoryKv::new());
        cache.kv.set_simulate_write_error(true);
        let err = cache.save(&[record("a")]).unwrap_err();
        assert!(matches!(err, KeepsakeError::Io(_)));
    }
}
