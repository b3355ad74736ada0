use crate::commands::{CmdMessage, CmdResult};
use crate::error::{KeepsakeError, Result};
use crate::remote::RecordRepository;
use crate::room::RoomGate;
use crate::store::KeyValueStore;

pub fn enter<K: KeyValueStore, R: RecordRepository + ?Sized>(
    gate: &RoomGate<K>,
    repo: &R,
    code: &str,
) -> Result<CmdResult> {
    let room = gate.enter(code, repo)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Entered room {}", room)));
    Ok(result.with_room(room))
}

pub fn current<K: KeyValueStore>(gate: &RoomGate<K>) -> Result<CmdResult> {
    let room = gate.get_room_code().ok_or(KeepsakeError::NoRoom)?;
    Ok(CmdResult::default().with_room(room))
}

pub fn leave<K: KeyValueStore>(gate: &RoomGate<K>) -> Result<CmdResult> {
    gate.clear_room_code()?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info("Left the room"));
    Ok(result)
}
