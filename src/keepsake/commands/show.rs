use crate::commands::CmdResult;
use crate::error::Result;
use crate::model::RoomCode;
use crate::remote::RecordRepository;
use crate::store::KeyValueStore;
use crate::sync::SyncStore;

pub fn run<K: KeyValueStore, R: RecordRepository>(
    store: &SyncStore<K, R>,
    room: &RoomCode,
    slug: &str,
) -> Result<CmdResult> {
    let record = store.find(room, slug)?;
    Ok(CmdResult::default().with_listed_records(vec![record]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DEFAULT_SLUG;
    use crate::error::KeepsakeError;
    use crate::remote::memory::MemoryRepository;
    use crate::store::memory::MemoryKv;

    #[test]
    fn shows_default_record_in_fresh_room() {
        let store = SyncStore::new(MemoryKv::new(), MemoryRepository::new());
        let room = RoomCode::parse("abc").unwrap();
        let result = run(&store, &room, DEFAULT_SLUG).unwrap();
        assert_eq!(result.listed_records[0].slug, DEFAULT_SLUG);
    }

    #[test]
    fn unknown_slug_is_not_found() {
        let store = SyncStore::new(MemoryKv::new(), MemoryRepository::new());
        let room = RoomCode::parse("abc").unwrap();
        assert!(matches!(
            run(&store, &room, "nope"),
            Err(KeepsakeError::RecordNotFound(_))
        ));
    }
}
