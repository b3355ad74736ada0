use crate::commands::{CmdMessage, CmdResult};
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
    let existing = store.find(room, slug).ok();
    store.delete(room, slug)?;

    let mut result = CmdResult::default();
    match existing {
        Some(record) => {
            result.add_message(CmdMessage::success(format!(
                "Deleted {} ({})",
                record.title, record.slug
            )));
            result.affected_records.push(record);
        }
        None => result.add_message(CmdMessage::info(format!("Nothing to delete for {}", slug))),
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::remote::memory::MemoryRepository;
    use crate::store::memory::MemoryKv;

    #[test]
    fn removes_record_everywhere() {
        let store = SyncStore::new(MemoryKv::new(), MemoryRepository::new());
        let room = RoomCode::parse("abc").unwrap();
        store.save(&room, Record::new("trip", "Trip")).unwrap();

        let result = run(&store, &room, "trip").unwrap();
        assert_eq!(result.affected_records.len(), 1);
        assert!(store.cache().get("trip").unwrap().is_none());
        assert!(store.repo().list_records(&room).unwrap().is_empty());
    }

    #[test]
    fn missing_slug_is_fine() {
        let store = SyncStore::new(MemoryKv::new(), MemoryRepository::new());
        let room = RoomCode::parse("abc").unwrap();
        let result = run(&store, &room, "ghost").unwrap();
        assert!(result.affected_records.is_empty());
    }
}
