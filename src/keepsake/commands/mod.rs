//! # Commands
//!
//! Business logic for each user-facing operation. Commands take the stores they need,
//! return a [`CmdResult`], and never print; rendering is the CLI's job.
//!
//! Save failures are not turned into messages here. An `Unsynced` error travels back to
//! the caller intact so it can tell "saved locally" apart from "not saved at all".

use crate::messages::MessagePair;
use crate::model::{Record, RoomCode};

pub mod create;
pub mod delete;
pub mod edit;
pub mod list;
pub mod messages;
pub mod room;
pub mod show;
pub mod upload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    /// Records to display, in display order.
    pub listed_records: Vec<Record>,
    /// Records written or removed by the command.
    pub affected_records: Vec<Record>,
    pub room: Option<RoomCode>,
    pub message_pair: Option<MessagePair>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_listed_records(mut self, records: Vec<Record>) -> Self {
        self.listed_records = records;
        self
    }

    pub fn with_affected_records(mut self, records: Vec<Record>) -> Self {
        self.affected_records = records;
        self
    }

    pub fn with_room(mut self, room: RoomCode) -> Self {
        self.room = Some(room);
        self
    }

    pub fn with_message_pair(mut self, pair: MessagePair) -> Self {
        self.message_pair = Some(pair);
        self
    }
}

/// Fields for a new record. Empty strings are normalized on save.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub summary: String,
    pub tags: Vec<String>,
    /// Picked at random from [`THEMES`](crate::model::THEMES) when absent.
    pub theme: Option<String>,
    pub hero_image: Option<String>,
    pub note: Option<String>,
    pub story: Option<String>,
}

/// One change to an existing record. Photo indexes are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEdit {
    Title(String),
    Summary(String),
    Tags(Vec<String>),
    Theme(String),
    Note(Option<String>),
    Story(Option<String>),
    Hero(Option<String>),
    AddPhotos(Vec<String>),
    RemovePhoto(usize),
    MovePhoto { from: usize, to: usize },
    Caption { index: usize, caption: Option<String> },
    Date { index: usize, date: Option<String> },
}
