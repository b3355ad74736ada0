//! PostgREST tables and the storage API, over blocking HTTP.
//!
//! Every request carries the project key twice: as `apikey` and as a bearer token.
//! Non-2xx responses become `Repository` errors that include the response body, which
//! is where PostgREST puts its explanation.

use super::{
    assemble, plan_photo_sync, NewPhotoRow, PhotoPlan, PhotoRow, RecordPayload,
    RecordRepository, RecordRow, PHOTOS_TABLE, RECORDS_TABLE, ROOMS_TABLE,
};
use crate::error::{KeepsakeError, Result};
use crate::image::{object_name, ImageFile};
use crate::model::{Record, RoomCode};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

const PREFER: &str = "Prefer";
const CACHE_CONTROL_SECS: &str = "3600";

pub struct RestRepository {
    client: Client,
    base: Url,
    key: String,
    bucket: String,
}

#[derive(Serialize)]
struct RoomPayload<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct IdRow {
    id: String,
}

impl RestRepository {
    pub fn new(base: Url, key: impl Into<String>, bucket: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            base,
            key: key.into(),
            bucket: bucket.into(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        Ok(self.base.join(&format!("rest/v1/{}", table))?)
    }

    fn object_url(&self, public: bool, room: &RoomCode, name: &str) -> Result<Url> {
        let mut url = self.base.join("storage/v1/object")?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                KeepsakeError::Configuration("backend URL cannot have a path".to_string())
            })?;
            if public {
                segments.push("public");
            }
            segments.push(&self.bucket).push(room.as_str()).push(name);
        }
        Ok(url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.key).bearer_auth(&self.key)
    }

    // --- Requests ---

    fn room_request(&self, room: &RoomCode) -> Result<RequestBuilder> {
        let mut url = self.table_url(ROOMS_TABLE)?;
        url.query_pairs_mut().append_pair("on_conflict", "code");
        Ok(self
            .authed(self.client.post(url))
            .header(PREFER, "resolution=ignore-duplicates")
            .json(&[RoomPayload {
                code: room.as_str(),
            }]))
    }

    fn list_request(&self, room: &RoomCode) -> Result<RequestBuilder> {
        let mut url = self.table_url(RECORDS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("room_code", &format!("eq.{}", room))
            .append_pair("order", "updated_at.desc");
        Ok(self.authed(self.client.get(url)))
    }

    /// Photo rows whose `record_id` matches a PostgREST filter such as `eq.<id>`.
    fn photos_request(&self, record_filter: &str) -> Result<RequestBuilder> {
        let mut url = self.table_url(PHOTOS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("record_id", record_filter)
            .append_pair("order", "sort_order.asc");
        Ok(self.authed(self.client.get(url)))
    }

    fn find_request(&self, room: &RoomCode, slug: &str) -> Result<RequestBuilder> {
        let mut url = self.table_url(RECORDS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("room_code", &format!("eq.{}", room))
            .append_pair("slug", &format!("eq.{}", slug));
        Ok(self.authed(self.client.get(url)))
    }

    fn upsert_request(
        &self,
        room: &RoomCode,
        record: &Record,
        now: DateTime<Utc>,
    ) -> Result<RequestBuilder> {
        let mut url = self.table_url(RECORDS_TABLE)?;
        url.query_pairs_mut().append_pair("on_conflict", "room_code,slug");
        Ok(self
            .authed(self.client.post(url))
            .header(PREFER, "resolution=merge-duplicates,return=representation")
            .json(&[RecordPayload::new(room, record, now)]))
    }

    /// Row changes for a photo plan, in the order they must run: deletes, updates, inserts.
    fn photo_sync_requests(
        &self,
        plan: &PhotoPlan,
    ) -> Result<Vec<(&'static str, RequestBuilder)>> {
        let mut requests = Vec::new();

        if !plan.deletes.is_empty() {
            let mut url = self.table_url(PHOTOS_TABLE)?;
            url.query_pairs_mut()
                .append_pair("id", &format!("in.({})", plan.deletes.join(",")));
            requests.push(("delete photos", self.authed(self.client.delete(url))));
        }
        for (photo_id, patch) in &plan.updates {
            let mut url = self.table_url(PHOTOS_TABLE)?;
            url.query_pairs_mut()
                .append_pair("id", &format!("eq.{}", photo_id));
            requests.push(("update photo", self.authed(self.client.patch(url)).json(patch)));
        }
        if !plan.inserts.is_empty() {
            let url = self.table_url(PHOTOS_TABLE)?;
            let rows: &[NewPhotoRow] = &plan.inserts;
            requests.push((
                "insert photos",
                self.authed(self.client.post(url))
                    .header(PREFER, "return=minimal")
                    .json(rows),
            ));
        }

        Ok(requests)
    }

    /// Photo rows go first so no photo is left pointing at a missing record.
    fn delete_requests(&self, record_id: &str) -> Result<Vec<(&'static str, RequestBuilder)>> {
        let mut photos = self.table_url(PHOTOS_TABLE)?;
        photos
            .query_pairs_mut()
            .append_pair("record_id", &format!("eq.{}", record_id));

        let mut record = self.table_url(RECORDS_TABLE)?;
        record
            .query_pairs_mut()
            .append_pair("id", &format!("eq.{}", record_id));

        Ok(vec![
            ("delete photos", self.authed(self.client.delete(photos))),
            ("delete record", self.authed(self.client.delete(record))),
        ])
    }

    fn upload_request(
        &self,
        room: &RoomCode,
        name: &str,
        file: &ImageFile,
        mime: &str,
    ) -> Result<RequestBuilder> {
        Ok(self
            .authed(self.client.post(self.object_url(false, room, name)?))
            .header("x-upsert", "false")
            .header("cache-control", format!("max-age={}", CACHE_CONTROL_SECS))
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(file.bytes.clone()))
    }

    // --- Round trips ---

    fn fetch_photos(&self, record_filter: &str) -> Result<Vec<PhotoRow>> {
        let response = check(self.photos_request(record_filter)?.send()?, "list photos")?;
        Ok(response.json()?)
    }

    fn find_record_id(&self, room: &RoomCode, slug: &str) -> Result<Option<String>> {
        let response = check(self.find_request(room, slug)?.send()?, "find record")?;
        let rows: Vec<IdRow> = response.json()?;
        Ok(rows.into_iter().next().map(|r| r.id))
    }
}

impl RecordRepository for RestRepository {
    fn ensure_room(&self, room: &RoomCode) -> Result<()> {
        check(self.room_request(room)?.send()?, "register room")?;
        Ok(())
    }

    fn list_records(&self, room: &RoomCode) -> Result<Vec<Record>> {
        let response = check(self.list_request(room)?.send()?, "list records")?;
        let rows: Vec<RecordRow> = response.json()?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        let photos = self.fetch_photos(&format!("in.({})", ids.join(",")))?;
        tracing::debug!(room = %room, records = rows.len(), photos = photos.len(), "fetched records");
        Ok(assemble(rows, photos))
    }

    fn upsert_record(&self, room: &RoomCode, record: &Record) -> Result<String> {
        let request = self.upsert_request(room, record, Utc::now())?;
        let response = check(request.send()?, "save record")?;
        let rows: Vec<IdRow> = response.json()?;
        let id = rows
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| KeepsakeError::Repository("save record returned no row".to_string()))?;

        let existing = self.fetch_photos(&format!("eq.{}", id))?;
        let plan = plan_photo_sync(&id, &existing, &record.photos);
        tracing::debug!(
            slug = %record.slug,
            deletes = plan.deletes.len(),
            updates = plan.updates.len(),
            inserts = plan.inserts.len(),
            "reconciling photos"
        );
        for (what, request) in self.photo_sync_requests(&plan)? {
            check(request.send()?, what)?;
        }

        Ok(id)
    }

    fn delete_record(&self, room: &RoomCode, slug: &str) -> Result<()> {
        let Some(id) = self.find_record_id(room, slug)? else {
            tracing::debug!(room = %room, slug, "record already absent remotely");
            return Ok(());
        };
        for (what, request) in self.delete_requests(&id)? {
            check(request.send()?, what)?;
        }
        Ok(())
    }

    fn upload_image(&self, room: &RoomCode, file: &ImageFile, mime: &str) -> Result<String> {
        let name = object_name(file.extension());
        check(
            self.upload_request(room, &name, file, mime)?.send()?,
            "upload image",
        )?;
        tracing::info!(room = %room, object = %name, bytes = file.bytes.len(), "uploaded image");
        Ok(self.object_url(true, room, &name)?.to_string())
    }
}

fn check(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(KeepsakeError::Repository(format!(
        "{} failed ({}): {}",
        what,
        status,
        body.trim()
    )))
}
