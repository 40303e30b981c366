//! Inline edit session
//!
//! At most one field is open for editing at any time. The session is an
//! explicit value, `Idle` or `Editing`, and owns everything that lives only
//! as long as the editor is open: the pre-edit value, the input buffer and
//! the outside-pointer dismissal guard. Ending the session drops all of it,
//! so no dismissal guard outlives its editor.
//!
//! The session only touches the one block it leases; history snapshots,
//! persistence and notifications are sequenced by the [`Editor`](crate::Editor).

use std::time::{Duration, Instant};

use tracing::debug;

use crate::document::{BlockId, ContentTree};
use crate::error::EditError;

/// Delay before a pointer event outside the field may close the editor,
/// so the click that opened it cannot immediately close it.
pub const DISMISS_ARM_DELAY: Duration = Duration::from_millis(100);

/// Kind of input surface, used to resolve keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// No field is being edited
    #[default]
    None,
    /// A single-line input
    SingleLine,
    /// A multi-line free-text area
    MultiLine,
}

/// The state of the one open editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEdit {
    block: BlockId,
    original_value: String,
    buffer: String,
    multiline: bool,
    /// Outside-pointer dismissal is ignored before this instant
    armed_at: Instant,
}

impl ActiveEdit {
    pub fn block(&self) -> &BlockId {
        &self.block
    }

    /// The field's text, trimmed, when the edit started
    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn armed_at(&self) -> Instant {
        self.armed_at
    }
}

/// Successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub block: BlockId,
    pub value: String,
    /// Whether the committed value differs from the pre-edit value
    pub changed: bool,
}

/// `Idle` or `Editing`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditSession {
    #[default]
    Idle,
    Editing(ActiveEdit),
}

impl EditSession {
    pub fn is_idle(&self) -> bool {
        matches!(self, EditSession::Idle)
    }

    pub fn active(&self) -> Option<&ActiveEdit> {
        match self {
            EditSession::Idle => None,
            EditSession::Editing(active) => Some(active),
        }
    }

    /// Whether `id` is the block currently mid-edit
    pub fn is_editing(&self, id: &BlockId) -> bool {
        self.active().is_some_and(|active| active.block == *id)
    }

    pub fn focus(&self) -> Focus {
        match self.active() {
            None => Focus::None,
            Some(active) if active.multiline => Focus::MultiLine,
            Some(_) => Focus::SingleLine,
        }
    }

    /// Open an editor on `id`
    ///
    /// The caller must have closed any previous session first. The buffer is
    /// seeded with the trimmed text of the field.
    pub fn begin(&mut self, tree: &mut ContentTree, id: &BlockId, now: Instant) -> Result<(), EditError> {
        debug_assert!(self.is_idle(), "begin() called with an open session");

        let block = tree
            .find_mut(id)
            .ok_or_else(|| EditError::BlockNotFound(id.clone()))?;
        if !block.is_editable() {
            return Err(EditError::NotEditable(id.clone()));
        }

        let original_value = block.text.trim().to_string();
        block.editing = true;

        *self = EditSession::Editing(ActiveEdit {
            block: id.clone(),
            buffer: original_value.clone(),
            original_value,
            multiline: block.multiline,
            armed_at: now + DISMISS_ARM_DELAY,
        });
        debug!(block = %id, "edit session started");
        Ok(())
    }

    /// Replace the input buffer
    pub fn set_buffer(&mut self, value: impl Into<String>) -> Result<(), EditError> {
        match self {
            EditSession::Idle => Err(EditError::NoActiveSession),
            EditSession::Editing(active) => {
                active.buffer = value.into();
                Ok(())
            }
        }
    }

    pub fn push_char(&mut self, c: char) -> Result<(), EditError> {
        match self {
            EditSession::Idle => Err(EditError::NoActiveSession),
            EditSession::Editing(active) => {
                active.buffer.push(c);
                Ok(())
            }
        }
    }

    pub fn backspace(&mut self) -> Result<(), EditError> {
        match self {
            EditSession::Idle => Err(EditError::NoActiveSession),
            EditSession::Editing(active) => {
                active.buffer.pop();
                Ok(())
            }
        }
    }

    /// Write the value into the field and close the session
    ///
    /// `value` defaults to the current buffer. An empty value on a required
    /// field is rejected: the session stays open with the rejected value in
    /// its buffer and the tree is untouched.
    pub fn commit(&mut self, tree: &mut ContentTree, value: Option<String>) -> Result<Committed, EditError> {
        let EditSession::Editing(active) = self else {
            return Err(EditError::NoActiveSession);
        };

        let raw = value.unwrap_or_else(|| active.buffer.clone());
        let trimmed = raw.trim();
        if trimmed.is_empty() && !active.multiline {
            active.buffer = raw;
            return Err(EditError::EmptyRequiredField(active.block.clone()));
        }
        let value = if trimmed.is_empty() {
            raw.clone()
        } else {
            trimmed.to_string()
        };

        let id = active.block.clone();
        let changed = value != active.original_value;
        match tree.find_mut(&id) {
            Some(block) => {
                block.text = value.clone();
                block.editing = false;
            }
            None => {
                // The block vanished under the session; nothing to write.
                *self = EditSession::Idle;
                return Err(EditError::BlockNotFound(id));
            }
        }

        *self = EditSession::Idle;
        debug!(block = %id, changed, "edit committed");
        Ok(Committed {
            block: id,
            value,
            changed,
        })
    }

    /// Restore the pre-edit value and close the session
    pub fn cancel(&mut self, tree: &mut ContentTree) -> Result<BlockId, EditError> {
        let EditSession::Editing(active) = std::mem::take(self) else {
            return Err(EditError::NoActiveSession);
        };

        if let Some(block) = tree.find_mut(&active.block) {
            block.text = active.original_value;
            block.editing = false;
        }
        debug!(block = %active.block, "edit cancelled");
        Ok(active.block)
    }

    /// Close the session without writing anything
    ///
    /// Used when the tree is about to be replaced or the field deleted.
    pub fn abandon(&mut self, tree: &mut ContentTree) -> Option<BlockId> {
        let EditSession::Editing(active) = std::mem::take(self) else {
            return None;
        };
        if let Some(block) = tree.find_mut(&active.block) {
            block.editing = false;
        }
        debug!(block = %active.block, "edit abandoned");
        Some(active.block)
    }

    /// Whether a pointer event on `target` at `now` should close the editor
    ///
    /// Only events outside the edited block count, and only once the
    /// dismissal guard is armed.
    pub fn dismisses(&self, tree: &ContentTree, target: Option<&BlockId>, now: Instant) -> bool {
        let Some(active) = self.active() else {
            return false;
        };
        if now < active.armed_at {
            return false;
        }
        match (target, tree.find(&active.block)) {
            (Some(target), Some(block)) => !block.contains(target),
            _ => true,
        }
    }
}
