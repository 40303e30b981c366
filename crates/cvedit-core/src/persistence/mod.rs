//! Debounced persistence
//!
//! The whole editor state (document, theme, profile image) is written as one
//! record under one storage key. Change notifications are coalesced: each
//! notification cancels the pending write and arms a new one, so only the
//! last state in a burst of edits reaches storage.
//!
//! Timers are explicit: the scheduler holds a [`SaveHandle`] with a due
//! instant and the owner calls [`PersistenceScheduler::poll_due`] from its
//! event loop.
//!
//! Persistence is best-effort. Nothing in here returns an error to the
//! editing flow; the [`Editor`](crate::Editor) logs failures and carries on.

pub mod error;
pub mod storage;

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::ContentTree;
use crate::theme::{ProfileImage, ThemeColors};

pub use error::{StorageError, StorageResult};
pub use storage::{FileStorage, MemoryStorage, Storage};

/// Default debounce delay before an automatic save
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);

/// Default storage key for the persisted record
pub const DEFAULT_STORAGE_KEY: &str = "cvData";

/// The single persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    /// The serialized content tree
    pub html: ContentTree,
    /// Absent in records that predate theming; the live theme is kept then
    #[serde(default)]
    pub colors: Option<ThemeColors>,
    #[serde(default)]
    pub profile_image: ProfileImage,
    pub timestamp: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn new(tree: &ContentTree, colors: &ThemeColors, image: &ProfileImage) -> Self {
        let mut html = tree.clone();
        html.clear_editing();
        Self {
            html,
            colors: Some(colors.clone()),
            profile_image: image.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Parse and validate a stored record
    pub fn from_json(key: &str, json: &str) -> StorageResult<Self> {
        let mut record: PersistedRecord = serde_json::from_str(json)?;
        if let Some(id) = record.html.duplicate_id() {
            return Err(StorageError::InvalidFormat {
                key: key.to_string(),
                details: format!("duplicate block id '{id}'"),
            });
        }
        if record.html.blocks().is_empty() {
            return Err(StorageError::InvalidFormat {
                key: key.to_string(),
                details: "empty document".to_string(),
            });
        }
        record.html.clear_editing();
        Ok(record)
    }

    pub fn to_json(&self) -> StorageResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A pending automatic save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveHandle {
    id: u64,
    due_at: Instant,
}

impl SaveHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn due_at(&self) -> Instant {
        self.due_at
    }
}

/// Debounced writer and startup loader for the persisted record
pub struct PersistenceScheduler {
    storage: Box<dyn Storage>,
    key: String,
    delay: Duration,
    pending: Option<SaveHandle>,
    next_id: u64,
    last_saved: Option<DateTime<Utc>>,
}

impl PersistenceScheduler {
    pub fn new(storage: Box<dyn Storage>, key: impl Into<String>, delay: Duration) -> Self {
        Self {
            storage,
            key: key.into(),
            delay,
            pending: None,
            next_id: 0,
            last_saved: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn pending(&self) -> Option<SaveHandle> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time of the last successful write in this process
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    /// Re-arm the debounce timer
    ///
    /// Any pending save is cancelled and replaced: last writer wins.
    pub fn notify_changed(&mut self, now: Instant) -> SaveHandle {
        if let Some(previous) = self.cancel() {
            debug!(handle = previous.id, "autosave re-armed");
        }
        self.next_id += 1;
        let handle = SaveHandle {
            id: self.next_id,
            due_at: now + self.delay,
        };
        self.pending = Some(handle);
        handle
    }

    /// Drop the pending save, if any
    pub fn cancel(&mut self) -> Option<SaveHandle> {
        self.pending.take()
    }

    /// Consume the pending save if it is due at `now`
    pub fn poll_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(handle) if now >= handle.due_at => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Serialize the state and overwrite the stored record in one write
    pub fn write(
        &mut self,
        tree: &ContentTree,
        colors: &ThemeColors,
        image: &ProfileImage,
    ) -> StorageResult<DateTime<Utc>> {
        let record = PersistedRecord::new(tree, colors, image);
        let json = record.to_json()?;
        self.storage.write(&self.key, &json)?;
        self.last_saved = Some(record.timestamp);
        info!(key = %self.key, bytes = json.len(), "record saved");
        Ok(record.timestamp)
    }

    /// Bypass the debounce and write immediately
    pub fn save_now(
        &mut self,
        tree: &ContentTree,
        colors: &ThemeColors,
        image: &ProfileImage,
    ) -> StorageResult<DateTime<Utc>> {
        self.cancel();
        self.write(tree, colors, image)
    }

    /// Read the stored record, `None` if nothing was saved yet
    pub fn load(&self) -> StorageResult<Option<PersistedRecord>> {
        let Some(json) = self.storage.read(&self.key)? else {
            return Ok(None);
        };
        PersistedRecord::from_json(&self.key, &json).map(Some)
    }

    /// Delete the stored record and cancel any pending save
    pub fn clear(&mut self) -> StorageResult<()> {
        self.cancel();
        self.storage.remove(&self.key)
    }
}
