//! # Room Session Gate
//!
//! Nothing is shown until a room code is known. The code is kept on the device under
//! [`ROOM_KEY`] as a JSON string and only written after the backend has accepted the room.

use crate::error::Result;
use crate::model::RoomCode;
use crate::remote::RecordRepository;
use crate::store::KeyValueStore;

pub const ROOM_KEY: &str = "keepsake.room-code.v1";

pub struct RoomGate<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> RoomGate<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// The stored room code. Absent, malformed, or blank values read as `None`.
    pub fn get_room_code(&self) -> Option<RoomCode> {
        let raw = match self.kv.get(ROOM_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "could not read room code");
                return None;
            }
        };
        let code: String = serde_json::from_str(&raw).ok()?;
        RoomCode::parse(&code).ok()
    }

    pub fn set_room_code(&self, code: &RoomCode) -> Result<()> {
        self.kv.set(ROOM_KEY, &serde_json::to_string(code)?)
    }

    pub fn clear_room_code(&self) -> Result<()> {
        self.kv.remove(ROOM_KEY)
    }

    /// Validate, register with the backend, then remember the code.
    /// Nothing is persisted when registration fails.
    pub fn enter<R: RecordRepository + ?Sized>(&self, input: &str, repo: &R) -> Result<RoomCode> {
        let code = RoomCode::parse(input)?;
        repo.ensure_room(&code)?;
        self.set_room_code(&code)?;
        tracing::info!(room = %code, "entered room");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{KeepsakeError, ValidationError};
    use crate::remote::memory::MemoryRepository;
    use crate::remote::Disabled;
    use crate::store::memory::MemoryKv;

    #[test]
    fn no_code_initially() {
        let gate = RoomGate::new(MemoryKv::new());
        assert_eq!(gate.get_room_code(), None);
    }

    #[test]
    fn enter_trims_and_persists() {
        let gate = RoomGate::new(MemoryKv::new());
        let repo = MemoryRepository::new();

        let code = gate.enter("  abc-2026 ", &repo).unwrap();
        assert_eq!(code.as_str(), "abc-2026");
        assert_eq!(gate.get_room_code(), Some(code.clone()));
        assert!(repo.has_room(&code));
    }

    #[test]
    fn blank_code_is_rejected_before_the_backend() {
        let gate = RoomGate::new(MemoryKv::new());
        let err = gate.enter("   ", &Disabled::default()).unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::Validation(ValidationError::EmptyRoomCode)
        ));
    }

    #[test]
    fn failed_registration_persists_nothing() {
        let gate = RoomGate::new(MemoryKv::new());
        assert!(gate.enter("abc", &Disabled::default()).is_err());
        assert_eq!(gate.get_room_code(), None);
    }

    #[test]
    fn malformed_value_reads_as_absent() {
        let kv = MemoryKv::new();
        kv.set(ROOM_KEY, "abc-without-quotes").unwrap();
        assert_eq!(RoomGate::new(kv).get_room_code(), None);
    }
}
