//! Undo/redo history
//!
//! Whole-document snapshots rather than per-field diffs. Every mutating
//! operation calls [`HistoryManager::push_snapshot`] immediately before it
//! touches the tree, so undoing always lands on a fully applied state.
//!
//! - Pushing a snapshot evicts the oldest one past the depth limit
//! - Pushing a snapshot clears the redo stack
//! - Undo and redo move the *current* tree onto the opposite stack and never
//!   push snapshots themselves

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::document::ContentTree;

/// Default maximum number of undo levels
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

/// An immutable copy of the whole document
///
/// Editing flags are dropped on capture: a snapshot always describes the
/// document with no editor open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<ContentTree>);

impl Snapshot {
    pub fn capture(tree: &ContentTree) -> Self {
        let mut copy = tree.clone();
        copy.clear_editing();
        Self(Arc::new(copy))
    }

    pub fn tree(&self) -> &ContentTree {
        &self.0
    }

    fn into_tree(self) -> ContentTree {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone())
    }
}

/// Bounded undo stack plus redo stack of snapshots
#[derive(Debug)]
pub struct HistoryManager {
    /// Oldest at the front, most recent at the back
    undo_stack: VecDeque<Snapshot>,
    /// Most recent last
    redo_stack: Vec<Snapshot>,
    max_depth: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_HISTORY_DEPTH)
    }

    /// A depth of zero is treated as one
    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record the tree as it is *before* a mutation
    pub fn push_snapshot(&mut self, tree: &ContentTree) {
        self.undo_stack.push_back(Snapshot::capture(tree));
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        debug!(depth = self.undo_stack.len(), "history snapshot pushed");
    }

    /// Restore the most recent snapshot
    ///
    /// Returns `false` (and leaves the tree alone) when there is nothing to undo.
    pub fn undo(&mut self, tree: &mut ContentTree) -> bool {
        let Some(previous) = self.undo_stack.pop_back() else {
            return false;
        };
        self.redo_stack.push(Snapshot::capture(tree));
        *tree = previous.into_tree();
        true
    }

    /// Re-apply the most recently undone state
    pub fn redo(&mut self, tree: &mut ContentTree) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push_back(Snapshot::capture(tree));
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        *tree = next.into_tree();
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Snapshots on the undo stack, oldest first
    pub fn undo_snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.undo_stack.iter()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
