//! # Sync Store
//!
//! The read, save and delete policy over the three record sources.
//!
//! - **Read** is best-effort: a failing backend is logged and the collection falls back
//!   to local plus default records.
//! - **Save** writes the backend first, then the local cache. If the backend fails, the
//!   record is still cached and the backend error comes back wrapped in
//!   [`KeepsakeError::Unsynced`], which says whether the local copy made it.
//! - **Delete** removes the backend rows, then the cached copy. A backend failure stops
//!   the delete so the record does not silently come back on the next read. Without a
//!   configured backend only the cached copy is removed.

use crate::cache::LocalCache;
use crate::defaults::default_records;
use crate::error::{KeepsakeError, Result};
use crate::merge::resolve;
use crate::model::{Record, RoomCode};
use crate::remote::RecordRepository;
use crate::store::KeyValueStore;

pub struct SyncStore<K: KeyValueStore, R: RecordRepository> {
    cache: LocalCache<K>,
    repo: R,
    defaults: Vec<Record>,
}

impl<K: KeyValueStore, R: RecordRepository> SyncStore<K, R> {
    pub fn new(kv: K, repo: R) -> Self {
        Self::with_defaults(kv, repo, default_records())
    }

    pub fn with_defaults(kv: K, repo: R, defaults: Vec<Record>) -> Self {
        Self {
            cache: LocalCache::new(kv),
            repo,
            defaults,
        }
    }

    pub fn cache(&self) -> &LocalCache<K> {
        &self.cache
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// The merged collection for `room`.
    pub fn collection(&self, room: &RoomCode) -> Result<Vec<Record>> {
        let local = self.cache.load()?;
        let remote = self.repo.list_records(room);
        Ok(resolve(&local, remote, &self.defaults))
    }

    pub fn find(&self, room: &RoomCode, slug: &str) -> Result<Record> {
        self.collection(room)?
            .into_iter()
            .find(|r| r.slug == slug)
            .ok_or_else(|| KeepsakeError::RecordNotFound(slug.to_string()))
    }

    /// Normalize and persist a record. Returns what was stored.
    pub fn save(&self, room: &RoomCode, record: Record) -> Result<Record> {
        let record = record.normalized();

        match self.repo.upsert_record(room, &record) {
            Ok(id) => {
                tracing::debug!(room = %room, slug = %record.slug, id = %id, "record synced");
                self.cache.upsert(&record)?;
                Ok(record)
            }
            Err(remote_err) => {
                tracing::warn!(room = %room, slug = %record.slug, error = %remote_err, "remote save failed, saving locally");
                let saved_locally = match self.cache.upsert(&record) {
                    Ok(()) => true,
                    Err(local_err) => {
                        tracing::error!(error = %local_err, "local save failed too");
                        false
                    }
                };
                Err(KeepsakeError::Unsynced {
                    source: Box::new(remote_err),
                    saved_locally,
                })
            }
        }
    }

    /// With no backend configured there is no remote copy, so only the cache is touched.
    pub fn delete(&self, room: &RoomCode, slug: &str) -> Result<()> {
        match self.repo.delete_record(room, slug) {
            Ok(()) => {}
            Err(KeepsakeError::Configuration(reason)) => {
                tracing::debug!(room = %room, slug, %reason, "no backend, deleting locally only");
            }
            Err(e) => return Err(e),
        }
        self.cache.delete(slug)?;
        tracing::debug!(room = %room, slug, "record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DEFAULT_SLUG;
    use crate::remote::memory::MemoryRepository;
    use crate::remote::Disabled;
    use crate::store::memory::MemoryKv;

    fn room() -> RoomCode {
        RoomCode::parse("abc-2026").unwrap()
    }

    fn store() -> SyncStore<MemoryKv, MemoryRepository> {
        SyncStore::new(MemoryKv::new(), MemoryRepository::new())
    }

    #[test]
    fn fresh_room_shows_defaults() {
        let store = store();
        let records = store.collection(&room()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slug, DEFAULT_SLUG);
    }

    #[test]
    fn save_writes_both_sides() {
        let store = store();
        store.save(&room(), Record::new("trip", "Trip")).unwrap();

        assert!(store.cache().get("trip").unwrap().is_some());
        assert_eq!(store.repo().list_records(&room()).unwrap().len(), 1);
    }

    #[test]
    fn offline_save_is_unsynced_but_local() {
        let store = store();
        store.repo().set_offline(true);

        let err = store.save(&room(), Record::new("trip", "Trip")).unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::Unsynced {
                saved_locally: true,
                ..
            }
        ));
        assert_eq!(store.find(&room(), "trip").unwrap().title, "Trip");
    }

    #[test]
    fn find_missing_slug() {
        let err = store().find(&room(), "nope").unwrap_err();
        assert!(matches!(err, KeepsakeError::RecordNotFound(_)));
    }

    #[test]
    fn failed_remote_delete_keeps_local_copy() {
        let store = store();
        store.save(&room(), Record::new("trip", "Trip")).unwrap();
        store.repo().set_offline(true);

        assert!(store.delete(&room(), "trip").is_err());
        assert!(store.cache().get("trip").unwrap().is_some());
    }

    #[test]
    fn local_only_delete_removes_cached_copy() {
        let store = SyncStore::new(
            MemoryKv::new(),
            Disabled::new(vec!["KEEPSAKE_BACKEND_URL".into()]),
        );
        let err = store.save(&room(), Record::new("trip", "Trip")).unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::Unsynced {
                saved_locally: true,
                ..
            }
        ));

        store.delete(&room(), "trip").unwrap();

        assert!(store.cache().get("trip").unwrap().is_none());
        let slugs: Vec<_> = store
            .collection(&room())
            .unwrap()
            .into_iter()
            .map(|r| r.slug)
            .collect();
        assert_eq!(slugs, vec![DEFAULT_SLUG]);
    }
}
