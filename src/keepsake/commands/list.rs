use crate::commands::CmdResult;
use crate::error::Result;
use crate::model::RoomCode;
use crate::remote::RecordRepository;
use crate::store::KeyValueStore;
use crate::sync::SyncStore;

pub fn run<K: KeyValueStore, R: RecordRepository>(
    store: &SyncStore<K, R>,
    room: &RoomCode,
) -> Result<CmdResult> {
    let records = store.collection(room)?;
    Ok(CmdResult::default()
        .with_listed_records(records)
        .with_room(room.clone()))
}
