//! Editing errors
//!
//! Every variant here is recoverable: the [`Editor`](crate::Editor) turns
//! validation failures into user-facing notifications and everything else
//! into a logged no-op.

use thiserror::Error;

use crate::document::BlockId;

/// Errors raised by editing, structural and history operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// A required field was committed with an empty value
    #[error("Field '{0}' cannot be empty")]
    EmptyRequiredField(BlockId),

    /// The target block no longer exists in the tree
    #[error("Block not found: '{0}'")]
    BlockNotFound(BlockId),

    /// The block exists but is not an editable text field
    #[error("Block '{0}' is not an editable field")]
    NotEditable(BlockId),

    /// Commit or cancel was requested with no open editor
    #[error("No edit in progress")]
    NoActiveSession,

    /// Drop was requested with no drag source
    #[error("No drag in progress")]
    NoActiveDrag,

    /// Only entries can be dragged
    #[error("Block '{0}' cannot be dragged")]
    NotDraggable(BlockId),

    /// The hovered block does not accept drops
    #[error("Block '{0}' is not a drop zone")]
    NotDropZone(BlockId),

    /// Moving a block next to itself or into its own subtree
    #[error("Cannot move '{block}' relative to '{target}'")]
    InvalidMove { block: BlockId, target: BlockId },

    /// Inserting a subtree whose id already exists in the tree
    #[error("Duplicate block id: '{0}'")]
    DuplicateId(BlockId),

    /// Color value that is not `#rrggbb`
    #[error("Invalid color value '{0}', expected a hex color like #3498db")]
    InvalidColor(String),
}

impl EditError {
    /// Whether this error should be shown to the user
    ///
    /// Only validation failures are surfaced; structural errors are
    /// treated as silent no-ops.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EditError::EmptyRequiredField(_) | EditError::InvalidColor(_)
        )
    }
}
