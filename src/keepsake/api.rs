//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single entry point
//! for keepsake operations, whatever UI sits on top.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Wires** one key-value store into the record cache, the room gate and the message
//!   board
//! - **Requires a room** for record operations, failing with `NoRoom` otherwise
//! - **Dispatches** to the appropriate command function
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It does no I/O of its own and never formats output.
//!
//! ## Generic Over Ports
//!
//! `KeepsakeApi<K, R, N>` is generic over storage, repository and notifier:
//! - Production: `KeepsakeApi<FileKv, Box<dyn RecordRepository>, Box<dyn ChangeNotifier>>`
//! - Testing: `KeepsakeApi<MemoryKv, MemoryRepository, ChangeHub>`

use crate::commands::{self, upload::UploadTarget, CmdResult, NewRecord, RecordEdit};
use crate::error::{KeepsakeError, Result};
use crate::image::{ImageFile, DEFAULT_MAX_IMAGE_BYTES};
use crate::messages::MessageBoard;
use crate::model::RoomCode;
use crate::notify::{ChangeNotifier, Invalidation, Subscription};
use crate::remote::RecordRepository;
use crate::room::RoomGate;
use crate::store::KeyValueStore;
use crate::sync::SyncStore;
use std::rc::Rc;

pub struct KeepsakeApi<K: KeyValueStore, R: RecordRepository, N: ChangeNotifier> {
    store: SyncStore<Rc<K>, R>,
    gate: RoomGate<Rc<K>>,
    board: MessageBoard<Rc<K>>,
    notifier: N,
    max_image_bytes: usize,
}

impl<K: KeyValueStore, R: RecordRepository, N: ChangeNotifier> KeepsakeApi<K, R, N> {
    pub fn new(kv: K, repo: R, notifier: N) -> Self {
        let kv = Rc::new(kv);
        Self {
            store: SyncStore::new(kv.clone(), repo),
            gate: RoomGate::new(kv.clone()),
            board: MessageBoard::new(kv),
            notifier,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    pub fn store(&self) -> &SyncStore<Rc<K>, R> {
        &self.store
    }

    pub fn room(&self) -> Option<RoomCode> {
        self.gate.get_room_code()
    }

    fn require_room(&self) -> Result<RoomCode> {
        self.room().ok_or(KeepsakeError::NoRoom)
    }

    pub fn enter_room(&self, code: &str) -> Result<CmdResult> {
        commands::room::enter(&self.gate, self.store.repo(), code)
    }

    pub fn current_room(&self) -> Result<CmdResult> {
        commands::room::current(&self.gate)
    }

    pub fn leave_room(&self) -> Result<CmdResult> {
        commands::room::leave(&self.gate)
    }

    pub fn list_records(&self) -> Result<CmdResult> {
        commands::list::run(&self.store, &self.require_room()?)
    }

    pub fn show_record(&self, slug: &str) -> Result<CmdResult> {
        commands::show::run(&self.store, &self.require_room()?, slug)
    }

    pub fn create_record(&self, new: NewRecord) -> Result<CmdResult> {
        commands::create::run(&self.store, &self.require_room()?, new)
    }

    pub fn edit_record(&self, slug: &str, edits: Vec<RecordEdit>) -> Result<CmdResult> {
        commands::edit::run(&self.store, &self.require_room()?, slug, edits)
    }

    pub fn delete_record(&self, slug: &str) -> Result<CmdResult> {
        commands::delete::run(&self.store, &self.require_room()?, slug)
    }

    pub fn upload_images(
        &self,
        slug: &str,
        files: &[ImageFile],
        target: UploadTarget,
    ) -> Result<CmdResult> {
        commands::upload::run(
            &self.store,
            &self.require_room()?,
            slug,
            files,
            target,
            self.max_image_bytes,
        )
    }

    pub fn messages(&self) -> Result<CmdResult> {
        commands::messages::show(&self.board)
    }

    pub fn set_messages(&self, first: Option<String>, second: Option<String>) -> Result<CmdResult> {
        commands::messages::set(&self.board, first, second)
    }

    /// Call `on_change` whenever the current room changes remotely or locally.
    pub fn watch(&self, on_change: Invalidation) -> Result<Subscription> {
        let room = self.require_room()?;
        Ok(self.notifier.subscribe(&room, on_change))
    }
}
