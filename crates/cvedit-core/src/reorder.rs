//! Drag-and-drop reordering
//!
//! Protocol: `drag_start` snapshots history and records the source entry,
//! `drag_enter`/`drag_leave` toggle a hover affordance on drop zones,
//! `drag_over` tells the front end whether a drop is accepted, `drop` moves
//! the source next to the zone, `drag_end` clears everything. Hover flags
//! and the drag context never survive `drop` or `drag_end`.
//!
//! Every method takes the block under the pointer and works on the zone
//! that receives it (see [`ContentTree::drop_zone_for`]), so a drop on an
//! achievement list or a row of language dots lands on the enclosing entry
//! and entries never end up inside one another.

use std::collections::BTreeSet;

use tracing::debug;

use crate::document::{BlockId, ContentTree, DropSide};
use crate::error::EditError;
use crate::history::HistoryManager;

/// The block being dragged and the zone it was last seen over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragContext {
    pub source: BlockId,
    pub candidate: Option<BlockId>,
}

/// What a drop did to the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Moved {
        block: BlockId,
        target: BlockId,
        side: DropSide,
    },
    /// Dropped onto the dragged block itself
    Unchanged,
}

#[derive(Debug, Default)]
pub struct ReorderController {
    context: Option<DragContext>,
    hovered: BTreeSet<BlockId>,
}

impl ReorderController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> Option<&DragContext> {
        self.context.as_ref()
    }

    pub fn source(&self) -> Option<&BlockId> {
        self.context.as_ref().map(|context| &context.source)
    }

    pub fn is_active(&self) -> bool {
        self.context.is_some()
    }

    /// Whether `id` is the block being dragged
    pub fn is_dragging(&self, id: &BlockId) -> bool {
        self.source() == Some(id)
    }

    /// Whether `id` currently shows the drag-over affordance
    pub fn is_drag_over(&self, id: &BlockId) -> bool {
        self.hovered.contains(id)
    }

    pub fn hovered(&self) -> impl Iterator<Item = &BlockId> {
        self.hovered.iter()
    }

    /// Pick up an entry
    ///
    /// The snapshot is taken here, before any move, so one undo reverts the
    /// whole drag.
    pub fn drag_start(
        &mut self,
        tree: &ContentTree,
        history: &mut HistoryManager,
        id: &BlockId,
    ) -> Result<(), EditError> {
        let block = tree
            .find(id)
            .ok_or_else(|| EditError::BlockNotFound(id.clone()))?;
        if !block.is_draggable() {
            return Err(EditError::NotDraggable(id.clone()));
        }

        history.push_snapshot(tree);
        self.hovered.clear();
        self.context = Some(DragContext {
            source: id.clone(),
            candidate: None,
        });
        debug!(block = %id, "drag started");
        Ok(())
    }

    /// Show the affordance on a zone; returns whether the zone accepts drops
    pub fn drag_enter(&mut self, tree: &ContentTree, target: &BlockId) -> bool {
        let Some(zone) = zone_for(tree, target) else {
            return false;
        };
        self.hovered.insert(zone.clone());
        if let Some(context) = &mut self.context {
            context.candidate = Some(zone);
        }
        true
    }

    pub fn drag_leave(&mut self, tree: &ContentTree, target: &BlockId) {
        let zone = zone_for(tree, target).unwrap_or_else(|| target.clone());
        self.hovered.remove(&zone);
        if let Some(context) = &mut self.context {
            if context.candidate.as_ref() == Some(&zone) {
                context.candidate = None;
            }
        }
    }

    /// Whether a drop on `zone` would be accepted
    pub fn drag_over(&mut self, tree: &ContentTree, target: &BlockId) -> bool {
        let Some(context) = &mut self.context else {
            return false;
        };
        match zone_for(tree, target) {
            Some(zone) => {
                context.candidate = Some(zone);
                true
            }
            None => false,
        }
    }

    /// Drop the source onto the zone receiving `target`
    ///
    /// `offset_y` is the pointer's vertical offset inside the zone's box of
    /// the given `height`: upper half inserts before, lower half after. The
    /// drag context is cleared whatever the outcome.
    pub fn drop(
        &mut self,
        tree: &mut ContentTree,
        target: &BlockId,
        offset_y: f32,
        height: f32,
    ) -> Result<DropOutcome, EditError> {
        self.hovered.clear();
        let context = self.context.take().ok_or(EditError::NoActiveDrag)?;

        let zone = zone_for(tree, target).ok_or_else(|| EditError::NotDropZone(target.clone()))?;
        if context.source == zone {
            debug!(block = %zone, "dropped onto itself");
            return Ok(DropOutcome::Unchanged);
        }

        let side = DropSide::from_offset(offset_y, height);
        tree.move_relative(&context.source, &zone, side)?;
        debug!(block = %context.source, %zone, ?side, "block moved");
        Ok(DropOutcome::Moved {
            block: context.source,
            target: zone,
            side,
        })
    }

    /// Clear every drag flag, whether or not a drop happened
    pub fn drag_end(&mut self) {
        self.context = None;
        self.hovered.clear();
    }
}

fn zone_for(tree: &ContentTree, target: &BlockId) -> Option<BlockId> {
    tree.drop_zone_for(target).map(|block| block.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> BlockId {
        BlockId::new(s)
    }

    fn experience_order(tree: &ContentTree) -> Vec<String> {
        tree.find(&id("experience"))
            .unwrap()
            .children
            .iter()
            .map(|block| block.id.to_string())
            .collect()
    }

    #[test]
    fn test_drop_upper_half_inserts_before() {
        let mut tree = ContentTree::default_resume();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        reorder
            .drag_start(&tree, &mut history, &id("experience-2"))
            .unwrap();
        assert_eq!(history.undo_depth(), 1);
        assert!(reorder.drag_over(&tree, &id("experience-1")));

        let outcome = reorder
            .drop(&mut tree, &id("experience-1"), 10.0, 100.0)
            .unwrap();

        assert_eq!(
            outcome,
            DropOutcome::Moved {
                block: id("experience-2"),
                target: id("experience-1"),
                side: DropSide::Before,
            }
        );
        assert_eq!(
            experience_order(&tree),
            vec!["experience-title", "experience-2", "experience-1"]
        );
        assert!(!reorder.is_active());
    }

    #[test]
    fn test_drop_lower_half_inserts_after() {
        let mut tree = ContentTree::default_resume();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        reorder
            .drag_start(&tree, &mut history, &id("experience-1"))
            .unwrap();
        reorder
            .drop(&mut tree, &id("experience-2"), 75.0, 100.0)
            .unwrap();

        assert_eq!(
            experience_order(&tree),
            vec!["experience-title", "experience-2", "experience-1"]
        );
    }

    #[test]
    fn test_drop_on_self_is_noop() {
        let mut tree = ContentTree::default_resume();
        let before = tree.clone();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        reorder
            .drag_start(&tree, &mut history, &id("experience-1"))
            .unwrap();
        let outcome = reorder
            .drop(&mut tree, &id("experience-1"), 10.0, 100.0)
            .unwrap();

        assert_eq!(outcome, DropOutcome::Unchanged);
        assert_eq!(tree, before);
        // The drag-start snapshot stays as a harmless undo point
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_only_entries_can_be_dragged() {
        let tree = ContentTree::default_resume();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        let err = reorder
            .drag_start(&tree, &mut history, &id("experience-1-title"))
            .unwrap_err();
        assert_eq!(err, EditError::NotDraggable(id("experience-1-title")));
        assert_eq!(history.undo_depth(), 0);
        assert!(!reorder.is_active());
    }

    #[test]
    fn test_drop_without_drag_fails() {
        let mut tree = ContentTree::default_resume();
        let mut reorder = ReorderController::new();
        let result = reorder.drop(&mut tree, &id("experience-1"), 0.0, 10.0);
        assert_eq!(result, Err(EditError::NoActiveDrag));
    }

    #[test]
    fn test_drop_on_field_is_rejected_and_context_cleared() {
        let mut tree = ContentTree::default_resume();
        let before = tree.clone();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        reorder
            .drag_start(&tree, &mut history, &id("experience-1"))
            .unwrap();
        assert!(!reorder.drag_over(&tree, &id("name")));
        let result = reorder.drop(&mut tree, &id("name"), 0.0, 10.0);

        assert_eq!(result, Err(EditError::NotDropZone(id("name"))));
        assert_eq!(tree, before);
        assert!(!reorder.is_active());
    }

    #[test]
    fn test_drop_inside_own_subtree_is_noop() {
        let mut tree = ContentTree::default_resume();
        let before = tree.clone();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        reorder
            .drag_start(&tree, &mut history, &id("experience-1"))
            .unwrap();
        let outcome = reorder
            .drop(&mut tree, &id("experience-1-achievements"), 0.0, 10.0)
            .unwrap();

        assert_eq!(outcome, DropOutcome::Unchanged);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_drop_on_achievements_lands_next_to_experience() {
        let mut tree = ContentTree::default_resume();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        reorder
            .drag_start(&tree, &mut history, &id("experience-2"))
            .unwrap();
        assert!(reorder.drag_over(&tree, &id("experience-1-achievements")));
        assert_eq!(
            reorder.context().unwrap().candidate,
            Some(id("experience-1"))
        );

        let outcome = reorder
            .drop(&mut tree, &id("experience-1-achievements"), 1.0, 10.0)
            .unwrap();

        assert_eq!(
            outcome,
            DropOutcome::Moved {
                block: id("experience-2"),
                target: id("experience-1"),
                side: DropSide::Before,
            }
        );
        assert_eq!(
            tree.locate(&id("experience-2")).unwrap().parent,
            Some(id("experience"))
        );
        assert_eq!(
            experience_order(&tree),
            vec!["experience-title", "experience-2", "experience-1"]
        );
    }

    #[test]
    fn test_drop_on_language_dots_lands_next_to_language() {
        let mut tree = ContentTree::default_resume();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        reorder
            .drag_start(&tree, &mut history, &id("language-1"))
            .unwrap();
        assert!(reorder.drag_enter(&tree, &id("language-2-dots")));
        assert!(reorder.is_drag_over(&id("language-2")));
        assert!(!reorder.is_drag_over(&id("language-2-dots")));

        reorder
            .drop(&mut tree, &id("language-2-dots"), 9.0, 10.0)
            .unwrap();

        let location = tree.locate(&id("language-1")).unwrap();
        assert_eq!(location.parent, Some(id("languages")));
        let languages: Vec<_> = tree
            .find(&id("languages"))
            .unwrap()
            .children
            .iter()
            .map(|block| block.id.to_string())
            .collect();
        assert_eq!(languages, vec!["languages-title", "language-2", "language-1"]);
        assert!(tree.duplicate_id().is_none());
    }

    #[test]
    fn test_columns_and_nested_lists_are_not_zones() {
        let tree = ContentTree::default_resume();
        let zone = |target: &str| tree.drop_zone_for(&id(target)).map(|b| b.id.to_string());

        assert_eq!(zone("left-column"), None);
        assert_eq!(zone("header"), None);
        assert_eq!(zone("name"), None);
        assert_eq!(zone("experience").as_deref(), Some("experience"));
        assert_eq!(zone("experience-1").as_deref(), Some("experience-1"));
        assert_eq!(zone("experience-1-project-1").as_deref(), Some("experience-1"));
        assert_eq!(zone("expertise-1").as_deref(), Some("expertise"));
        assert_eq!(zone("language-2-dot-3").as_deref(), Some("language-2"));
    }

    #[test]
    fn test_hover_affordance_and_drag_end() {
        let tree = ContentTree::default_resume();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();

        reorder
            .drag_start(&tree, &mut history, &id("education-1"))
            .unwrap();
        assert!(reorder.drag_enter(&tree, &id("experience")));
        assert!(reorder.drag_enter(&tree, &id("experience-1")));
        assert!(!reorder.drag_enter(&tree, &id("name")));
        assert!(reorder.is_drag_over(&id("experience")));
        assert_eq!(
            reorder.context().unwrap().candidate,
            Some(id("experience-1"))
        );

        reorder.drag_leave(&tree, &id("experience-1"));
        assert!(!reorder.is_drag_over(&id("experience-1")));
        assert!(reorder.context().unwrap().candidate.is_none());

        reorder.drag_end();
        assert!(!reorder.is_active());
        assert_eq!(reorder.hovered().count(), 0);
    }

    #[test]
    fn test_move_across_sections_keeps_subtree() {
        let mut tree = ContentTree::default_resume();
        let mut history = HistoryManager::new();
        let mut reorder = ReorderController::new();
        let moved = tree.find(&id("education-1")).unwrap().clone();

        reorder
            .drag_start(&tree, &mut history, &id("education-1"))
            .unwrap();
        reorder
            .drop(&mut tree, &id("experience-1"), 90.0, 100.0)
            .unwrap();

        let location = tree.locate(&id("education-1")).unwrap();
        assert_eq!(location.parent, Some(id("experience")));
        assert_eq!(location.index, 2);
        assert_eq!(tree.find(&id("education-1")).unwrap(), &moved);
        assert!(tree.duplicate_id().is_none());
    }
}
