use crate::commands::{CmdMessage, CmdResult, NewRecord};
use crate::error::Result;
use crate::model::{slugify, Record, RoomCode, THEMES};
use crate::remote::RecordRepository;
use crate::store::KeyValueStore;
use crate::sync::SyncStore;
use rand::seq::SliceRandom;

pub fn run<K: KeyValueStore, R: RecordRepository>(
    store: &SyncStore<K, R>,
    room: &RoomCode,
    new: NewRecord,
) -> Result<CmdResult> {
    let base = match new.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slugify(slug),
        _ => slugify(&new.title),
    };
    let taken: Vec<String> = store
        .collection(room)?
        .into_iter()
        .map(|r| r.slug)
        .collect();
    let slug = unique_slug(&base, &taken);

    let theme = new.theme.unwrap_or_else(|| {
        THEMES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(THEMES[0])
            .to_string()
    });

    let mut record = Record::new(slug, new.title);
    record.summary = new.summary;
    record.tags = new.tags;
    record.theme = theme;
    record.hero_image = new.hero_image;
    record.note = new.note;
    record.story = new.story;

    let saved = store.save(room, record)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Created {} ({})",
        saved.title, saved.slug
    )));
    Ok(result.with_affected_records(vec![saved]))
}

/// `base`, or `base-2`, `base-3`, ... whichever is free first.
fn unique_slug(base: &str, taken: &[String]) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|t| t == candidate);
    if !is_taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DEFAULT_SLUG;
    use crate::model::PLACEHOLDER_SRC;
    use crate::remote::memory::MemoryRepository;
    use crate::store::memory::MemoryKv;

    fn setup() -> (SyncStore<MemoryKv, MemoryRepository>, RoomCode) {
        (
            SyncStore::new(MemoryKv::new(), MemoryRepository::new()),
            RoomCode::parse("abc").unwrap(),
        )
    }

    #[test]
    fn slug_derived_from_title() {
        let (store, room) = setup();
        let new = NewRecord {
            title: "Our Trip to Jeju!".into(),
            ..NewRecord::default()
        };
        let result = run(&store, &room, new).unwrap();
        let saved = &result.affected_records[0];
        assert_eq!(saved.slug, "our-trip-to-jeju");
        assert!(THEMES.contains(&saved.theme.as_str()));
        assert_eq!(saved.photos[0].src, PLACEHOLDER_SRC);
    }

    #[test]
    fn colliding_slug_gets_suffix() {
        let (store, room) = setup();
        let new = NewRecord {
            title: "Anything".into(),
            slug: Some(DEFAULT_SLUG.into()),
            ..NewRecord::default()
        };
        let result = run(&store, &room, new).unwrap();
        assert_eq!(result.affected_records[0].slug, "project-1-2");
    }

    #[test]
    fn unique_slug_skips_taken() {
        let taken = vec!["a".to_string(), "a-2".to_string()];
        assert_eq!(unique_slug("a", &taken), "a-3");
        assert_eq!(unique_slug("b", &taken), "b");
    }
}
