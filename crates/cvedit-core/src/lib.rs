//! cvedit Core Library
//!
//! This crate provides the editing core for cvedit, an in-place editor for
//! a structured résumé: click a field to edit it, drag entries to reorder
//! them, undo anything, and never press save.
//!
//! # Architecture
//!
//! - **ContentTree**: the document, an ordered forest of sections, entries
//!   and fields with unique ids
//! - **HistoryManager**: bounded undo/redo stacks of whole-document snapshots
//! - **EditSession**: `Idle` / `Editing`, at most one open editor
//! - **PersistenceScheduler**: debounced single-record writes, startup load
//! - **ReorderController**: drag-and-drop with before/after insertion
//!
//! The [`Editor`] owns all of it and is driven by [`Intent`]s, with time
//! passed in explicitly so front ends decide how to tick it.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut editor = Editor::open(&config);
//! editor.load_on_startup(Instant::now());
//!
//! editor.dispatch(Intent::StartEdit("experience-1-title".into()), Instant::now());
//! editor.dispatch(Intent::CommitValue("Lead Engineer".into()), Instant::now());
//!
//! // From the event loop
//! editor.tick(Instant::now());
//! ```
//!
//! # Modules
//!
//! - `editor`: Intent dispatcher (main entry point)
//! - `document`: Blocks, ids and the content tree
//! - `history`: Undo/redo snapshots
//! - `session`: Inline edit state machine
//! - `persistence`: Debounced storage of the document, theme and photo
//! - `reorder`: Drag-and-drop protocol
//! - `factory`: Templates for new blocks
//! - `theme`: Colors and profile image
//! - `translate`: fr/en heading translation
//! - `keymap`: Keyboard shortcuts
//! - `notify`: Transient notifications
//! - `config`: Application configuration

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod factory;
pub mod history;
pub mod keymap;
pub mod notify;
pub mod persistence;
pub mod reorder;
pub mod session;
pub mod theme;
pub mod translate;

pub use config::Config;
pub use document::{Block, BlockId, BlockKind, ContentTree, DropSide, Location};
pub use editor::{Dispatch, Editor, EditorSettings, Intent};
pub use error::EditError;
pub use factory::{BlockFactory, ParentContext, ResumeBlockFactory, TemplateKind};
pub use history::{HistoryManager, Snapshot};
pub use keymap::{Key, KeyAction, KeyChord, Modifiers};
pub use notify::{Notification, Notifier};
pub use persistence::{
    FileStorage, MemoryStorage, PersistedRecord, PersistenceScheduler, Storage, StorageError,
};
pub use reorder::{DropOutcome, ReorderController};
pub use session::{EditSession, Focus};
pub use theme::{ColorSlot, ProfileImage, ThemeColors};
pub use translate::Language;
