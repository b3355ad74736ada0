use crate::commands::{edit, CmdMessage, CmdResult, RecordEdit};
use crate::draft::Draft;
use crate::error::{KeepsakeError, Result};
use crate::image::ImageFile;
use crate::model::RoomCode;
use crate::remote::RecordRepository;
use crate::store::KeyValueStore;
use crate::sync::SyncStore;

/// Where an uploaded image ends up on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Gallery,
    Hero,
}

/// A validated image reference ready to be put on a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub src: String,
    /// True when the image could not be uploaded and is carried inline.
    pub inline: bool,
}

/// Validate and upload one image. Without a configured backend the image is kept
/// inline as a `data:` URI instead; the local cache will not retain it.
pub fn stage_image<R: RecordRepository + ?Sized>(
    repo: &R,
    room: &RoomCode,
    file: &ImageFile,
    max_bytes: usize,
) -> Result<StagedImage> {
    let mime = file.validate(max_bytes)?;
    match repo.upload_image(room, file, mime) {
        Ok(url) => Ok(StagedImage {
            src: url,
            inline: false,
        }),
        Err(KeepsakeError::Configuration(reason)) => {
            tracing::warn!(file = %file.name, %reason, "no backend, keeping image inline");
            Ok(StagedImage {
                src: file.to_data_uri(mime),
                inline: true,
            })
        }
        Err(e) => Err(e),
    }
}

/// Upload images and attach them to `slug`. Every file is validated before the first
/// upload, so one bad file means nothing is uploaded.
pub fn run<K: KeyValueStore, R: RecordRepository>(
    store: &SyncStore<K, R>,
    room: &RoomCode,
    slug: &str,
    files: &[ImageFile],
    target: UploadTarget,
    max_bytes: usize,
) -> Result<CmdResult> {
    for file in files {
        file.validate(max_bytes)?;
    }
    let record = store.find(room, slug)?;

    let mut result = CmdResult::default();
    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        let image = stage_image(store.repo(), room, file, max_bytes)?;
        if image.inline {
            result.add_message(CmdMessage::warning(format!(
                "{} was not uploaded and will not survive a restart",
                file.name
            )));
        }
        staged.push(image.src);
    }

    let mut draft = Draft::begin(&record);
    let added = staged.len();
    let change = match target {
        UploadTarget::Hero => RecordEdit::Hero(staged.into_iter().next()),
        UploadTarget::Gallery => RecordEdit::AddPhotos(staged),
    };
    edit::apply(&mut draft, change)?;

    let saved = store.save(room, draft.finish())?;
    result.add_message(CmdMessage::success(match target {
        UploadTarget::Hero => format!("Hero image set on {}", saved.slug),
        UploadTarget::Gallery => format!("Added {} photo(s) to {}", added, saved.slug),
    }));
    Ok(result.with_affected_records(vec![saved]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::image::DEFAULT_MAX_IMAGE_BYTES;
    use crate::model::Record;
    use crate::remote::memory::MemoryRepository;
    use crate::remote::Disabled;
    use crate::store::memory::MemoryKv;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn room() -> RoomCode {
        RoomCode::parse("abc").unwrap()
    }

    #[test]
    fn stage_uploads_when_backend_available() {
        let repo = MemoryRepository::new();
        let staged = stage_image(
            &repo,
            &room(),
            &ImageFile::new("a.png", PNG.to_vec()),
            DEFAULT_MAX_IMAGE_BYTES,
        )
        .unwrap();
        assert!(!staged.inline);
        assert_eq!(repo.object_count(), 1);
    }

    #[test]
    fn stage_falls_back_to_inline_without_backend() {
        let staged = stage_image(
            &Disabled::default(),
            &room(),
            &ImageFile::new("a.png", PNG.to_vec()),
            DEFAULT_MAX_IMAGE_BYTES,
        )
        .unwrap();
        assert!(staged.inline);
        assert!(staged.src.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn backend_failure_is_not_masked() {
        let repo = MemoryRepository::new();
        repo.set_offline(true);
        let err = stage_image(
            &repo,
            &room(),
            &ImageFile::new("a.png", PNG.to_vec()),
            DEFAULT_MAX_IMAGE_BYTES,
        )
        .unwrap_err();
        assert!(matches!(err, KeepsakeError::Repository(_)));
    }

    #[test]
    fn invalid_file_blocks_every_upload() {
        let store = SyncStore::new(MemoryKv::new(), MemoryRepository::new());
        store.save(&room(), Record::new("trip", "Trip")).unwrap();
        let files = vec![
            ImageFile::new("a.png", PNG.to_vec()),
            ImageFile::new("notes.txt", b"hello".to_vec()),
        ];

        let err = run(
            &store,
            &room(),
            "trip",
            &files,
            UploadTarget::Gallery,
            DEFAULT_MAX_IMAGE_BYTES,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::Validation(ValidationError::NotAnImage { .. })
        ));
        assert_eq!(store.repo().object_count(), 0);
    }

    #[test]
    fn gallery_upload_prepends_photos() {
        let store = SyncStore::new(MemoryKv::new(), MemoryRepository::new());
        store.save(&room(), Record::new("trip", "Trip")).unwrap();
        let files = vec![ImageFile::new("a.png", PNG.to_vec())];

        run(
            &store,
            &room(),
            "trip",
            &files,
            UploadTarget::Gallery,
            DEFAULT_MAX_IMAGE_BYTES,
        )
        .unwrap();

        let saved = store.find(&room(), "trip").unwrap();
        assert_eq!(saved.photos.len(), 2);
        assert!(saved.photos[0].src.starts_with("memory://keepsake/abc/"));
        assert_eq!(saved.photos[0].caption.as_deref(), Some("New memory"));
    }
}
