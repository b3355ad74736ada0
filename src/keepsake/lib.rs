//! # Keepsake Architecture
//!
//! Keepsake is a **UI-agnostic, local-first memory album library**. Two people share a
//! room code and both see (and edit) the same list of memory pages. The CLI in `main.rs`
//! is one client of the library; nothing below the API layer knows about a terminal.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, renders results, owns stdout/stderr    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade, resolves the current room                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Business operations returning `CmdResult`                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Sync Core (sync.rs, merge.rs, cache.rs, remote/, notify/)  │
//! │  - Local cache, remote repository, change feed, merging     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Port (store/)                                      │
//! │  - KeyValueStore trait: FileKv (CLI), MemoryKv (testing)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Three Sources of Truth
//!
//! A presented collection is always assembled from:
//!
//! 1. **Local cache**: records this device saved. Highest precedence, lossy (inline image
//!    payloads are stripped before writing).
//! 2. **Remote repository**: the room's shared records. Read failures are swallowed.
//! 3. **Defaults**: the built-in sample page, shown when the room has nothing to offer.
//!
//! See [`merge`] for the precedence rules and [`sync`] for the save path.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Business logic for each command
//! - [`sync`]: Save/delete/read policy over cache + repository
//! - [`merge`]: Precedence merge of local, remote and default records
//! - [`cache`]: Local record cache with inline-payload stripping and quota recovery
//! - [`remote`]: Remote record repository (REST, in-memory, disabled)
//! - [`notify`]: Change notifier (realtime websocket, in-process hub, disabled)
//! - [`room`]: Room session gate
//! - [`messages`]: The couple's message pair
//! - [`draft`]: Edit sessions over a record
//! - [`image`]: Image validation and staging helpers
//! - [`store`]: Key-value persistence port
//! - [`model`]: Core data types (`Record`, `Photo`, `RoomCode`)
//! - [`defaults`]: Built-in sample dataset
//! - [`config`]: Settings and backend configuration
//! - [`init`]: Builds the application from settings and environment
//! - [`error`]: Error types

pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod defaults;
pub mod draft;
pub mod error;
pub mod image;
pub mod init;
pub mod merge;
pub mod messages;
pub mod model;
pub mod notify;
pub mod remote;
pub mod room;
pub mod store;
pub mod sync;
