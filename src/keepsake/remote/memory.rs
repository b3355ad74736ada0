use super::{
    assemble, plan_photo_sync, PhotoRow, RecordPayload, RecordRepository, RecordRow,
};
use crate::error::{KeepsakeError, Result};
use crate::image::{object_name, ImageFile};
use crate::model::{Record, RoomCode};
use crate::notify::hub::ChangeHub;
use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

const PUBLIC_BASE: &str = "memory://keepsake";

/// In-memory tables with the same observable behavior as the REST backend.
///
/// Every row change is published to the attached [`ChangeHub`], one event per row,
/// which mirrors how the realtime feed reports a save.
#[derive(Default)]
pub struct MemoryRepository {
    rooms: RefCell<HashSet<String>>,
    // (insertion sequence, row); the sequence breaks updated_at ties
    records: RefCell<Vec<(u64, RecordRow)>>,
    photos: RefCell<Vec<PhotoRow>>,
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
    seq: Cell<u64>,
    offline: Cell<bool>,
    hub: ChangeHub,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish row changes into an existing hub instead of a private one.
    pub fn with_hub(hub: ChangeHub) -> Self {
        Self {
            hub,
            ..Self::default()
        }
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    /// While offline every call fails with a `Repository` error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn has_room(&self, room: &RoomCode) -> bool {
        self.rooms.borrow().contains(room.as_str())
    }

    /// Photo rows of a record in sort order; empty if the record does not exist.
    pub fn photo_rows(&self, room: &RoomCode, slug: &str) -> Vec<PhotoRow> {
        let Some(id) = self.record_id(room, slug) else {
            return Vec::new();
        };
        let mut rows: Vec<PhotoRow> = self
            .photos
            .borrow()
            .iter()
            .filter(|p| p.record_id == id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.sort_order);
        rows
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.borrow().get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.borrow().len()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.get() {
            return Err(KeepsakeError::Repository("backend unreachable".to_string()));
        }
        Ok(())
    }

    fn next_seq(&self) -> u64 {
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        seq
    }

    fn record_id(&self, room: &RoomCode, slug: &str) -> Option<String> {
        self.records
            .borrow()
            .iter()
            .find(|(_, r)| r.room_code == room.as_str() && r.slug == slug)
            .map(|(_, r)| r.id.clone())
    }

    fn upsert_row(&self, room: &RoomCode, record: &Record) -> String {
        let payload = RecordPayload::new(room, record, Utc::now());
        let seq = self.next_seq();
        let mut records = self.records.borrow_mut();

        let existing = records
            .iter_mut()
            .find(|(_, r)| r.room_code == payload.room_code && r.slug == payload.slug);
        match existing {
            Some((row_seq, row)) => {
                *row_seq = seq;
                row.title = payload.title;
                row.summary = payload.summary;
                row.tags = payload.tags;
                row.theme_id = payload.theme_id;
                row.hero_image_uri = payload.hero_image_uri;
                row.note = payload.note;
                row.story = payload.story;
                row.updated_at = payload.updated_at;
                row.id.clone()
            }
            None => {
                let id = Uuid::new_v4().to_string();
                records.push((
                    seq,
                    RecordRow {
                        id: id.clone(),
                        room_code: payload.room_code,
                        slug: payload.slug,
                        title: payload.title,
                        summary: payload.summary,
                        tags: payload.tags,
                        theme_id: payload.theme_id,
                        hero_image_uri: payload.hero_image_uri,
                        note: payload.note,
                        story: payload.story,
                        created_at: payload.updated_at,
                        updated_at: payload.updated_at,
                    },
                ));
                id
            }
        }
    }
}

impl RecordRepository for MemoryRepository {
    fn ensure_room(&self, room: &RoomCode) -> Result<()> {
        self.check_online()?;
        self.rooms.borrow_mut().insert(room.as_str().to_string());
        Ok(())
    }

    fn list_records(&self, room: &RoomCode) -> Result<Vec<Record>> {
        self.check_online()?;
        let mut rows: Vec<(u64, RecordRow)> = self
            .records
            .borrow()
            .iter()
            .filter(|(_, r)| r.room_code == room.as_str())
            .cloned()
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| b.updated_at.cmp(&a.updated_at).then(sb.cmp(sa)));

        let ids: HashSet<&str> = rows.iter().map(|(_, r)| r.id.as_str()).collect();
        let photos: Vec<PhotoRow> = self
            .photos
            .borrow()
            .iter()
            .filter(|p| ids.contains(p.record_id.as_str()))
            .cloned()
            .collect();

        Ok(assemble(rows.into_iter().map(|(_, r)| r).collect(), photos))
    }

    fn upsert_record(&self, room: &RoomCode, record: &Record) -> Result<String> {
        self.check_online()?;
        let id = self.upsert_row(room, record);
        self.hub.publish(room);

        let existing: Vec<PhotoRow> = self
            .photos
            .borrow()
            .iter()
            .filter(|p| p.record_id == id)
            .cloned()
            .collect();
        let plan = plan_photo_sync(&id, &existing, &record.photos);

        for photo_id in &plan.deletes {
            self.photos.borrow_mut().retain(|p| &p.id != photo_id);
            self.hub.publish(room);
        }
        for (photo_id, patch) in plan.updates {
            if let Some(row) = self.photos.borrow_mut().iter_mut().find(|p| p.id == photo_id) {
                row.caption = patch.caption;
                row.date_label = patch.date_label;
                row.sort_order = patch.sort_order;
            }
            self.hub.publish(room);
        }
        for new in plan.inserts {
            self.photos.borrow_mut().push(PhotoRow {
                id: Uuid::new_v4().to_string(),
                record_id: new.record_id,
                image_uri: new.image_uri,
                caption: new.caption,
                date_label: new.date_label,
                sort_order: new.sort_order,
                created_at: Utc::now(),
            });
            self.hub.publish(room);
        }

        Ok(id)
    }

    fn delete_record(&self, room: &RoomCode, slug: &str) -> Result<()> {
        self.check_online()?;
        let Some(id) = self.record_id(room, slug) else {
            return Ok(());
        };
        self.photos.borrow_mut().retain(|p| p.record_id != id);
        self.records.borrow_mut().retain(|(_, r)| r.id != id);
        self.hub.publish(room);
        Ok(())
    }

    fn upload_image(&self, room: &RoomCode, file: &ImageFile, _mime: &str) -> Result<String> {
        self.check_online()?;
        let path = format!("{}/{}", room, object_name(file.extension()));
        self.objects
            .borrow_mut()
            .insert(path.clone(), file.bytes.clone());
        Ok(format!("{}/{}", PUBLIC_BASE, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Photo;
    use crate::notify::ChangeNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn room() -> RoomCode {
        RoomCode::parse("abc-2026").unwrap()
    }

    fn trip() -> Record {
        let mut r = Record::new("trip", "Trip");
        r.photos = vec![
            Photo::new("https://cdn/a.jpg", "A").with_caption("A"),
            Photo::new("https://cdn/b.jpg", "B"),
        ];
        r
    }

    #[test]
    fn upsert_then_list_round_trips_photos() {
        let repo = MemoryRepository::new();
        repo.upsert_record(&room(), &trip()).unwrap();

        let listed = repo.list_records(&room()).unwrap();
        assert_eq!(listed.len(), 1);
        let srcs: Vec<_> = listed[0].photos.iter().map(|p| p.src.as_str()).collect();
        assert_eq!(srcs, vec!["https://cdn/a.jpg", "https://cdn/b.jpg"]);
        assert!(listed[0].updated_at.is_some());
    }

    #[test]
    fn second_upsert_keeps_id_and_matched_rows() {
        let repo = MemoryRepository::new();
        let first = repo.upsert_record(&room(), &trip()).unwrap();
        let before = repo.photo_rows(&room(), "trip");

        let mut edited = trip();
        edited.title = "Trip!".into();
        edited.photos[1].caption = Some("B".into());
        let second = repo.upsert_record(&room(), &edited).unwrap();

        assert_eq!(first, second);
        let after = repo.photo_rows(&room(), "trip");
        let ids = |rows: &[PhotoRow]| rows.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&before), ids(&after));
        assert_eq!(after[1].caption.as_deref(), Some("B"));
    }

    #[test]
    fn latest_update_lists_first() {
        let repo = MemoryRepository::new();
        repo.upsert_record(&room(), &Record::new("one", "One")).unwrap();
        repo.upsert_record(&room(), &Record::new("two", "Two")).unwrap();
        repo.upsert_record(&room(), &Record::new("one", "One again")).unwrap();

        let slugs: Vec<_> = repo
            .list_records(&room())
            .unwrap()
            .into_iter()
            .map(|r| r.slug)
            .collect();
        assert_eq!(slugs, vec!["one", "two"]);
    }

    #[test]
    fn rooms_are_isolated() {
        let repo = MemoryRepository::new();
        let other = RoomCode::parse("other").unwrap();
        repo.upsert_record(&room(), &trip()).unwrap();
        assert!(repo.list_records(&other).unwrap().is_empty());
    }

    #[test]
    fn delete_is_idempotent_and_removes_photos() {
        let repo = MemoryRepository::new();
        repo.upsert_record(&room(), &trip()).unwrap();
        repo.delete_record(&room(), "trip").unwrap();
        repo.delete_record(&room(), "trip").unwrap();
        assert!(repo.list_records(&room()).unwrap().is_empty());
        assert!(repo.photos.borrow().is_empty());
    }

    #[test]
    fn offline_fails_with_repository_error() {
        let repo = MemoryRepository::new();
        repo.set_offline(true);
        assert!(matches!(
            repo.list_records(&room()),
            Err(KeepsakeError::Repository(_))
        ));
    }

    #[test]
    fn writes_publish_changes() {
        let repo = MemoryRepository::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let _sub = repo.hub().subscribe(
            &room(),
            Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        repo.upsert_record(&room(), &trip()).unwrap();
        // record row plus two photo inserts
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn upload_stores_object_under_room() {
        let repo = MemoryRepository::new();
        let url = repo
            .upload_image(&room(), &ImageFile::new("a.png", vec![1, 2, 3]), "image/png")
            .unwrap();
        assert!(url.starts_with("memory://keepsake/abc-2026/"));
        assert!(url.ends_with(".png"));
        assert_eq!(repo.object_count(), 1);
    }
}
