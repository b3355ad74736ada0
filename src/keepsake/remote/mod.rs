//! # Remote Record Repository
//!
//! The room's shared records live in three backend tables:
//!
//! ```text
//! rooms(code unique)
//! records(id, room_code, slug, title, summary, tags[], theme_id, hero_image_uri?,
//!         note?, story?, created_at, updated_at)        unique (room_code, slug)
//! sub_records(id, record_id, image_uri, caption?, date_label?, sort_order, created_at)
//! ```
//!
//! Nothing outside this module touches the tables; callers go through
//! [`RecordRepository`].
//!
//! ## Photo Reconciliation
//!
//! Saving a record does not replace its photo rows wholesale. [`plan_photo_sync`]
//! matches the stored rows against the draft by image reference:
//!
//! - **Matched**: row kept, caption/date/sort_order updated if they changed. The
//!   reference itself never changes once stored.
//! - **Only in draft**: inserted as a new row.
//! - **Only stored**: deleted.
//!
//! Two devices saving the same record at once are not serialized. The record row follows
//! the backend's upsert-on-conflict (last write wins); the photo reconciliations can
//! interleave, and a row deleted by one writer may be re-inserted by the other.
//!
//! ## Implementations
//!
//! - [`rest::RestRepository`]: PostgREST tables plus the storage API.
//! - [`memory::MemoryRepository`]: In-memory tables for testing, with change events.
//! - [`Disabled`]: No backend configured; every call fails with `Configuration`.

use crate::error::{KeepsakeError, Result};
use crate::image::ImageFile;
use crate::model::{Photo, Record, RoomCode, PLACEHOLDER_ALT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

pub mod memory;
pub mod rest;

pub const ROOMS_TABLE: &str = "rooms";
pub const RECORDS_TABLE: &str = "records";
pub const PHOTOS_TABLE: &str = "sub_records";

/// Typed access to a room's records on the shared backend.
pub trait RecordRepository {
    /// Register a room. Registering an existing room is not an error.
    fn ensure_room(&self, room: &RoomCode) -> Result<()>;

    /// All records of a room, most recently updated first, photos in sort order.
    fn list_records(&self, room: &RoomCode) -> Result<Vec<Record>>;

    /// Insert or replace a record by (room, slug) and reconcile its photos.
    /// Returns the backend id of the record row.
    fn upsert_record(&self, room: &RoomCode, record: &Record) -> Result<String>;

    /// Delete a record and its photos. A missing record is not an error.
    fn delete_record(&self, room: &RoomCode, slug: &str) -> Result<()>;

    /// Store an image under the room and return its public URL.
    fn upload_image(&self, room: &RoomCode, file: &ImageFile, mime: &str) -> Result<String>;
}

impl<R: RecordRepository + ?Sized> RecordRepository for Box<R> {
    fn ensure_room(&self, room: &RoomCode) -> Result<()> {
        (**self).ensure_room(room)
    }

    fn list_records(&self, room: &RoomCode) -> Result<Vec<Record>> {
        (**self).list_records(room)
    }

    fn upsert_record(&self, room: &RoomCode, record: &Record) -> Result<String> {
        (**self).upsert_record(room, record)
    }

    fn delete_record(&self, room: &RoomCode, slug: &str) -> Result<()> {
        (**self).delete_record(room, slug)
    }

    fn upload_image(&self, room: &RoomCode, file: &ImageFile, mime: &str) -> Result<String> {
        (**self).upload_image(room, file, mime)
    }
}

impl<R: RecordRepository + ?Sized> RecordRepository for Rc<R> {
    fn ensure_room(&self, room: &RoomCode) -> Result<()> {
        (**self).ensure_room(room)
    }

    fn list_records(&self, room: &RoomCode) -> Result<Vec<Record>> {
        (**self).list_records(room)
    }

    fn upsert_record(&self, room: &RoomCode, record: &Record) -> Result<String> {
        (**self).upsert_record(room, record)
    }

    fn delete_record(&self, room: &RoomCode, slug: &str) -> Result<()> {
        (**self).delete_record(room, slug)
    }

    fn upload_image(&self, room: &RoomCode, file: &ImageFile, mime: &str) -> Result<String> {
        (**self).upload_image(room, file, mime)
    }
}

/// Repository used when no backend is configured: every call fails fast.
#[derive(Debug, Clone, Default)]
pub struct Disabled {
    missing: Vec<String>,
}

impl Disabled {
    /// `missing` names the configuration values that were absent.
    pub fn new(missing: Vec<String>) -> Self {
        Self { missing }
    }

    fn error(&self) -> KeepsakeError {
        if self.missing.is_empty() {
            KeepsakeError::Configuration("backend credentials are not set".to_string())
        } else {
            KeepsakeError::Configuration(format!("missing {}", self.missing.join(", ")))
        }
    }
}

impl RecordRepository for Disabled {
    fn ensure_room(&self, _room: &RoomCode) -> Result<()> {
        Err(self.error())
    }

    fn list_records(&self, _room: &RoomCode) -> Result<Vec<Record>> {
        Err(self.error())
    }

    fn upsert_record(&self, _room: &RoomCode, _record: &Record) -> Result<String> {
        Err(self.error())
    }

    fn delete_record(&self, _room: &RoomCode, _slug: &str) -> Result<()> {
        Err(self.error())
    }

    fn upload_image(&self, _room: &RoomCode, _file: &ImageFile, _mime: &str) -> Result<String> {
        Err(self.error())
    }
}

// --- Wire Rows ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    pub id: String,
    pub room_code: String,
    pub slug: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub theme_id: String,
    pub hero_image_uri: Option<String>,
    pub note: Option<String>,
    pub story: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record columns written on upsert; ids and created_at are assigned by the backend.
#[derive(Debug, Clone, Serialize)]
pub struct RecordPayload {
    pub room_code: String,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub theme_id: String,
    pub hero_image_uri: Option<String>,
    pub note: Option<String>,
    pub story: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RecordPayload {
    pub fn new(room: &RoomCode, record: &Record, now: DateTime<Utc>) -> Self {
        Self {
            room_code: room.as_str().to_string(),
            slug: record.slug.clone(),
            title: record.title.clone(),
            summary: record.summary.clone(),
            tags: record.tags.clone(),
            theme_id: record.theme.clone(),
            hero_image_uri: record.hero_image.clone(),
            note: record.note.clone(),
            story: record.story.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRow {
    pub id: String,
    pub record_id: String,
    pub image_uri: String,
    pub caption: Option<String>,
    pub date_label: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPhotoRow {
    pub record_id: String,
    pub image_uri: String,
    pub caption: Option<String>,
    pub date_label: Option<String>,
    pub sort_order: i64,
}

/// The mutable columns of a stored photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoPatch {
    pub caption: Option<String>,
    pub date_label: Option<String>,
    pub sort_order: i64,
}

/// Assemble a record from its row and its (unordered) photo rows.
pub fn record_from_rows(row: RecordRow, mut photos: Vec<PhotoRow>) -> Record {
    photos.sort_by_key(|p| p.sort_order);
    Record {
        slug: row.slug,
        title: row.title,
        summary: row.summary,
        tags: row.tags,
        theme: row.theme_id,
        hero_image: row.hero_image_uri,
        note: row.note,
        story: row.story,
        timeline: Vec::new(),
        photos: photos
            .into_iter()
            .map(|p| Photo {
                src: p.image_uri,
                alt: p.caption.clone().unwrap_or_else(|| PLACEHOLDER_ALT.to_string()),
                caption: p.caption,
                date: p.date_label,
            })
            .collect(),
        updated_at: Some(row.updated_at),
    }
}

/// Group photo rows by record and build records in row order.
pub fn assemble(rows: Vec<RecordRow>, photos: Vec<PhotoRow>) -> Vec<Record> {
    let mut by_record: HashMap<String, Vec<PhotoRow>> = HashMap::new();
    for photo in photos {
        by_record
            .entry(photo.record_id.clone())
            .or_default()
            .push(photo);
    }
    rows.into_iter()
        .map(|row| {
            let photos = by_record.remove(&row.id).unwrap_or_default();
            record_from_rows(row, photos)
        })
        .collect()
}

// --- Reconciliation ---

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PhotoPlan {
    pub updates: Vec<(String, PhotoPatch)>,
    pub inserts: Vec<NewPhotoRow>,
    pub deletes: Vec<String>,
}

impl PhotoPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// Work out the row changes that turn `existing` into `draft`.
///
/// Rows are matched by image reference, one-to-one and in order, so a picture that
/// appears twice keeps two rows. Matched rows whose caption, date and position are
/// already right are left alone.
pub fn plan_photo_sync(record_id: &str, existing: &[PhotoRow], draft: &[Photo]) -> PhotoPlan {
    let mut sorted: Vec<&PhotoRow> = existing.iter().collect();
    sorted.sort_by_key(|p| p.sort_order);

    let mut unused: HashMap<&str, Vec<&PhotoRow>> = HashMap::new();
    for row in sorted.iter().rev() {
        unused.entry(row.image_uri.as_str()).or_default().push(row);
    }

    let mut plan = PhotoPlan::default();
    for (position, photo) in draft.iter().enumerate() {
        let sort_order = position as i64;
        let matched = unused.get_mut(photo.src.as_str()).and_then(|rows| rows.pop());

        match matched {
            Some(row) => {
                let patch = PhotoPatch {
                    caption: photo.caption.clone(),
                    date_label: photo.date.clone(),
                    sort_order,
                };
                let unchanged = row.caption == patch.caption
                    && row.date_label == patch.date_label
                    && row.sort_order == sort_order;
                if !unchanged {
                    plan.updates.push((row.id.clone(), patch));
                }
            }
            None => plan.inserts.push(NewPhotoRow {
                record_id: record_id.to_string(),
                image_uri: photo.src.clone(),
                caption: photo.caption.clone(),
                date_label: photo.date.clone(),
                sort_order,
            }),
        }
    }

    for row in sorted {
        let still_unused = unused
            .get(row.image_uri.as_str())
            .is_some_and(|rows| rows.iter().any(|r| r.id == row.id));
        if still_unused {
            plan.deletes.push(row.id.clone());
        }
    }

    plan
}
