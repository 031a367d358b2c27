// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batch group tracking and dirty-root bookkeeping.
//!
//! Every slot carries a [`BatchGroupElement`]: the batch root that owns it
//! and its depth below that root. Mutations do not recompute annotations
//! directly. Instead they mark the *batch* containing the touched slot dirty;
//! the [`HierarchyEngine`](crate::HierarchyEngine) later re-walks each dirty
//! root's subtree and rewrites the annotations in one pass.
//!
//! Invalidation is deliberately coarse. A slot's [`Dependency`] only says how
//! far the damage may reach, never which field changed.

use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use understory_dirty::DirtySet;

use crate::dirty;
use crate::id::ElementId;

/// How far a change at a slot may reach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Dependency {
    /// Clean.
    #[default]
    None,
    /// Only the slot itself.
    SelfOnly,
    /// The slot and its parent.
    Parent,
    /// The slot, its parent, and its children.
    ParentAndChildren,
}

impl Dependency {
    /// The widest dependency; used for every structural change.
    pub const MAX: Self = Self::ParentAndChildren;
}

/// Per-slot batch annotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BatchGroupElement {
    /// The batch root owning this slot, or [`ElementId::INVALID`] while
    /// unassigned.
    pub batch_root: ElementId,
    /// Number of non-virtual ancestors up to and including `batch_root`.
    pub depth: u32,
}

/// Decoded form of a [`BatchGroupElement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchState {
    /// No batch root has been resolved yet.
    Unassigned,
    /// Owned by `root` at `depth`.
    Assigned {
        /// The owning batch root.
        root: ElementId,
        /// Depth below `root`.
        depth: u32,
    },
}

impl BatchGroupElement {
    /// The annotation of a slot that has not been classified.
    pub const UNASSIGNED: Self = Self {
        batch_root: ElementId::INVALID,
        depth: 0,
    };

    /// Creates an assigned annotation.
    #[must_use]
    pub const fn assigned(batch_root: ElementId, depth: u32) -> Self {
        Self { batch_root, depth }
    }

    /// Returns the decoded state.
    #[must_use]
    pub const fn state(self) -> BatchState {
        if self.batch_root.is_valid() {
            BatchState::Assigned {
                root: self.batch_root,
                depth: self.depth,
            }
        } else {
            BatchState::Unassigned
        }
    }
}

/// Batch annotations, the batch-root set, and the dirty-root set.
///
/// Per-slot arrays are indexed like the
/// [`HierarchyStore`](crate::HierarchyStore) and are compacted together with
/// it through [`remove_at_swap_back`](Self::remove_at_swap_back).
#[derive(Debug)]
pub struct BatchGroupTracker {
    elements: Vec<BatchGroupElement>,
    dependencies: Vec<Dependency>,

    // Active batch roots, with each root's position in `roots`.
    roots: Vec<ElementId>,
    root_index: HashMap<ElementId, u32>,
    // Roots that stay roots even while parented.
    explicit: HashSet<ElementId>,

    dirty: DirtySet<ElementId>,
    sticky_dirty: bool,
}

impl Default for BatchGroupTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchGroupTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            dependencies: Vec::new(),
            roots: Vec::new(),
            root_index: HashMap::new(),
            explicit: HashSet::new(),
            dirty: DirtySet::new(),
            sticky_dirty: false,
        }
    }

    /// Number of tracked slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if no slots are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Appends an unassigned slot with the widest dependency and raises the
    /// sticky dirty flag. Returns the new slot.
    pub fn add_empty(&mut self) -> u32 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "slot indices are u32 by construction"
        )]
        let slot = self.elements.len() as u32;
        self.elements.push(BatchGroupElement::UNASSIGNED);
        self.dependencies.push(Dependency::MAX);
        self.sticky_dirty = true;
        slot
    }

    /// Returns the annotation at `slot`.
    #[must_use]
    pub fn annotation(&self, slot: u32) -> Option<BatchGroupElement> {
        self.elements.get(slot as usize).copied()
    }

    /// Returns the dependency flag at `slot`.
    #[must_use]
    pub fn dependency(&self, slot: u32) -> Option<Dependency> {
        self.dependencies.get(slot as usize).copied()
    }

    pub(crate) fn set_annotation(&mut self, slot: u32, element: BatchGroupElement) {
        if let Some(e) = self.elements.get_mut(slot as usize) {
            *e = element;
        }
    }

    /// Whether an update is pending: the sticky flag is set and at least one
    /// batch root exists.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.sticky_dirty && !self.roots.is_empty()
    }

    /// Marks the batch currently owning `slot` dirty.
    ///
    /// Returns `false` if the slot is unassigned, in which case no root was
    /// marked and the caller must resolve the owning root itself.
    pub fn mark_containing_batch_dirty(&mut self, slot: u32) -> bool {
        let Some(dep) = self.dependencies.get_mut(slot as usize) else {
            return false;
        };
        *dep = Dependency::MAX;
        self.sticky_dirty = true;
        let root = self.elements[slot as usize].batch_root;
        if root.is_valid() {
            self.dirty.mark(root, dirty::BATCH);
            true
        } else {
            false
        }
    }

    /// Marks a batch root id dirty directly.
    pub fn mark_root_dirty(&mut self, root: ElementId) {
        if root.is_valid() {
            self.sticky_dirty = true;
            self.dirty.mark(root, dirty::BATCH);
        }
    }

    /// Marks both the child's current batch and the new parent's batch dirty.
    ///
    /// Returns `(child_resolved, parent_resolved)`; see
    /// [`mark_containing_batch_dirty`](Self::mark_containing_batch_dirty).
    pub fn mark_child_dirty(&mut self, child_slot: u32, new_parent_slot: u32) -> (bool, bool) {
        let child = self.mark_containing_batch_dirty(child_slot);
        let parent = self.mark_containing_batch_dirty(new_parent_slot);
        (child, parent)
    }

    /// Records that `parent`'s child order changed.
    pub fn mark_reordered(&mut self, parent: ElementId) {
        if parent.is_valid() {
            self.sticky_dirty = true;
            self.dirty.mark(parent, dirty::ORDER);
        }
    }

    /// Adds `id` to the batch-root set.
    ///
    /// The root itself is dirtied, as is the batch containing its former
    /// structural parent. Returns `false` if it was already a root.
    pub fn add_batch_root(&mut self, id: ElementId, former_parent_slot: Option<u32>) -> bool {
        if !id.is_valid() || self.root_index.contains_key(&id) {
            return false;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "root positions are bounded by the u32 slot space"
        )]
        let position = self.roots.len() as u32;
        self.root_index.insert(id, position);
        self.roots.push(id);
        self.mark_root_dirty(id);
        if let Some(slot) = former_parent_slot {
            self.mark_containing_batch_dirty(slot);
        }
        true
    }

    /// Removes `id` from the batch-root set.
    ///
    /// The root itself is dirtied (a stale entry that is filtered later) and
    /// so is the batch containing its former structural parent. Returns
    /// `false` if it was not a root.
    pub fn remove_batch_root(&mut self, id: ElementId, former_parent_slot: Option<u32>) -> bool {
        let Some(idx) = self.root_index.remove(&id) else {
            return false;
        };
        self.roots.swap_remove(idx as usize);
        if let Some(&moved) = self.roots.get(idx as usize) {
            self.root_index.insert(moved, idx);
        }
        self.explicit.remove(&id);
        self.mark_root_dirty(id);
        if let Some(slot) = former_parent_slot {
            self.mark_containing_batch_dirty(slot);
        }
        true
    }

    /// Returns `true` if `id` is an active batch root.
    #[must_use]
    pub fn is_batch_root(&self, id: ElementId) -> bool {
        self.root_index.contains_key(&id)
    }

    /// Number of active batch roots.
    #[must_use]
    pub fn batch_root_count(&self) -> usize {
        self.roots.len()
    }

    /// Active batch roots in set order.
    #[must_use]
    pub fn batch_roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub(crate) fn set_explicit(&mut self, id: ElementId, explicit: bool) {
        if explicit {
            self.explicit.insert(id);
        } else {
            self.explicit.remove(&id);
        }
    }

    /// Returns `true` if `id` was explicitly marked as a batch root.
    #[must_use]
    pub fn is_explicit_root(&self, id: ElementId) -> bool {
        self.explicit.contains(&id)
    }

    /// Appends the dirty roots that are still active batch roots to `out`,
    /// in batch-root set order.
    pub fn populate_with_dirty_roots(&self, out: &mut Vec<ElementId>) {
        let start = out.len();
        out.extend(
            self.dirty
                .iter(dirty::BATCH)
                .filter(|id| self.root_index.contains_key(id)),
        );
        out[start..].sort_unstable_by_key(|id| self.root_index[id]);
    }

    /// Appends the parents whose child order changed to `out`, sorted by id.
    pub fn populate_with_reordered(&self, out: &mut Vec<ElementId>) {
        let start = out.len();
        out.extend(self.dirty.iter(dirty::ORDER));
        out[start..].sort_unstable();
    }

    /// Ends an update: empties the dirty sets, zeroes every dependency flag,
    /// and drops the sticky flag.
    pub fn clear_dirty_state(&mut self) {
        self.dirty.clear_all();
        self.dependencies.fill(Dependency::None);
        self.sticky_dirty = false;
    }

    /// Removes `slot`, moving the last slot's data into it.
    pub fn remove_at_swap_back(&mut self, slot: u32) {
        let idx = slot as usize;
        if idx < self.elements.len() {
            self.elements.swap_remove(idx);
            self.dependencies.swap_remove(idx);
        }
    }

    /// Drops any dirty entries for a deleted id.
    pub fn forget(&mut self, id: ElementId) {
        self.dirty.remove_key(id);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn add_empty_is_unassigned_and_sticky() {
        let mut tracker = BatchGroupTracker::new();
        let slot = tracker.add_empty();
        assert_eq!(slot, 0);
        assert_eq!(
            tracker.annotation(slot).unwrap().state(),
            BatchState::Unassigned
        );
        assert_eq!(tracker.dependency(slot), Some(Dependency::MAX));
        assert!(
            !tracker.is_dirty(),
            "no batch roots yet, so nothing is pending"
        );

        tracker.add_batch_root(ElementId(1), None);
        assert!(tracker.is_dirty());
    }

    #[test]
    fn containing_batch_resolves_through_annotation() {
        let mut tracker = BatchGroupTracker::new();
        let root_slot = tracker.add_empty();
        let child_slot = tracker.add_empty();
        tracker.add_batch_root(ElementId(1), None);
        tracker.set_annotation(root_slot, BatchGroupElement::assigned(ElementId(1), 0));
        tracker.set_annotation(child_slot, BatchGroupElement::assigned(ElementId(1), 1));
        tracker.clear_dirty_state();

        assert!(tracker.mark_containing_batch_dirty(child_slot));
        let mut out = Vec::new();
        tracker.populate_with_dirty_roots(&mut out);
        assert_eq!(out, vec![ElementId(1)]);
    }

    #[test]
    fn unassigned_slot_reports_unresolved() {
        let mut tracker = BatchGroupTracker::new();
        let slot = tracker.add_empty();
        assert!(!tracker.mark_containing_batch_dirty(slot));
        assert!(!tracker.mark_containing_batch_dirty(99));
    }

    #[test]
    fn stale_dirty_roots_are_filtered() {
        let mut tracker = BatchGroupTracker::new();
        tracker.add_batch_root(ElementId(1), None);
        tracker.add_batch_root(ElementId(2), None);
        tracker.remove_batch_root(ElementId(1), None);

        let mut out = Vec::new();
        tracker.populate_with_dirty_roots(&mut out);
        assert_eq!(out, vec![ElementId(2)], "removed root must not surface");
    }

    #[test]
    fn clear_dirty_state_resets_everything() {
        let mut tracker = BatchGroupTracker::new();
        tracker.add_empty();
        tracker.add_batch_root(ElementId(3), None);
        tracker.mark_reordered(ElementId(3));
        tracker.clear_dirty_state();

        assert!(!tracker.is_dirty());
        assert_eq!(tracker.dependency(0), Some(Dependency::None));
        let mut out = Vec::new();
        tracker.populate_with_dirty_roots(&mut out);
        tracker.populate_with_reordered(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn root_removal_keeps_index_consistent() {
        let mut tracker = BatchGroupTracker::new();
        for id in 1..=3 {
            tracker.add_batch_root(ElementId(id), None);
        }
        tracker.remove_batch_root(ElementId(1), None);
        assert_eq!(tracker.batch_roots(), &[ElementId(3), ElementId(2)]);
        assert!(tracker.remove_batch_root(ElementId(3), None));
        assert_eq!(tracker.batch_roots(), &[ElementId(2)]);
        assert!(tracker.is_batch_root(ElementId(2)));
    }

    #[test]
    fn swap_back_moves_last_annotation() {
        let mut tracker = BatchGroupTracker::new();
        tracker.add_empty();
        let last = tracker.add_empty();
        tracker.set_annotation(last, BatchGroupElement::assigned(ElementId(9), 2));
        tracker.remove_at_swap_back(0);
        assert_eq!(tracker.len(), 1);
        assert_eq!(
            tracker.annotation(0),
            Some(BatchGroupElement::assigned(ElementId(9), 2))
        );
    }
}
