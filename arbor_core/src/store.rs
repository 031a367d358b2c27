// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dense element storage with swap-back removal.
//!
//! The store owns the tree shape: one [`HierarchyElement`] per slot plus
//! parallel sibling-priority and virtual-flag arrays. Links between elements
//! are stored two ways: a child names its parent by [`ElementId`] (stable),
//! while a parent lists its children by slot index (fast to walk). Because
//! slots move on removal, [`swap_remove`](HierarchyStore::swap_remove)
//! re-resolves the moved element's entry in its parent's child list.
//!
//! The store does not know about batches or proxies. The combined mutation
//! API that keeps all of them in sync lives on
//! [`HierarchyData`](crate::HierarchyData).

use alloc::vec::Vec;

use crate::error::HierarchyError;
use crate::id::{ElementId, INVALID_SLOT};
use crate::identity::{IdentityMap, SwapRemoval};
use crate::pool::ListPool;

/// One element's structural record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HierarchyElement {
    /// The element's stable id.
    pub id: ElementId,
    /// The structural parent, or [`ElementId::INVALID`] for roots.
    pub parent: ElementId,
    /// Child slots in sibling order. Never contains duplicates.
    pub children: Vec<u32>,
}

/// Struct-of-arrays storage for every registered element.
#[derive(Debug)]
pub struct HierarchyStore {
    pub(crate) elements: Vec<HierarchyElement>,
    pub(crate) priorities: Vec<i32>,
    pub(crate) virtual_flags: Vec<bool>,
    pub(crate) identity: IdentityMap,
    pub(crate) child_lists: ListPool<u32>,
}

impl Default for HierarchyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0, 64)
    }

    /// Creates an empty store with room for `capacity` elements, keeping at
    /// most `retained_lists` idle child lists pooled.
    #[must_use]
    pub fn with_capacity(capacity: usize, retained_lists: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
            priorities: Vec::with_capacity(capacity),
            virtual_flags: Vec::with_capacity(capacity),
            identity: IdentityMap::with_capacity(capacity),
            child_lists: ListPool::new(retained_lists),
        }
    }

    // -- Slot queries --

    /// Number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if no elements are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the slot holding `id`.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, id: ElementId) -> Option<u32> {
        self.identity.try_get_index(id)
    }

    /// Returns the id stored at `slot`.
    #[inline]
    #[must_use]
    pub fn id_at(&self, slot: u32) -> Option<ElementId> {
        self.identity.id_at(slot)
    }

    /// Returns the element record at `slot`.
    #[inline]
    #[must_use]
    pub fn element(&self, slot: u32) -> Option<&HierarchyElement> {
        self.elements.get(slot as usize)
    }

    /// Returns the identity map.
    #[must_use]
    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    /// Returns the sibling priority at `slot`.
    #[must_use]
    pub fn priority(&self, slot: u32) -> Option<i32> {
        self.priorities.get(slot as usize).copied()
    }

    /// Returns `true` if the element at `slot` was registered as virtual.
    #[must_use]
    pub fn is_virtual(&self, slot: u32) -> bool {
        self.virtual_flags.get(slot as usize).copied().unwrap_or(false)
    }

    /// Returns the slot of the structural parent of `slot`.
    #[must_use]
    pub fn parent_slot(&self, slot: u32) -> Option<u32> {
        let parent = self.element(slot)?.parent;
        if parent.is_valid() {
            self.slot_of(parent)
        } else {
            None
        }
    }

    /// Returns the index of `slot` within its parent's child list.
    #[must_use]
    pub fn sibling_index(&self, slot: u32) -> Option<usize> {
        let parent = self.parent_slot(slot)?;
        self.elements[parent as usize]
            .children
            .iter()
            .position(|&c| c == slot)
    }

    /// Iterates the slots of every ancestor of `slot`, nearest first.
    pub fn ancestors(&self, slot: u32) -> Ancestors<'_> {
        Ancestors {
            store: self,
            current: self.parent_slot(slot).unwrap_or(INVALID_SLOT),
        }
    }

    /// Returns `true` if `ancestor` is reached by walking parents from `slot`.
    ///
    /// An element is not its own descendant.
    #[must_use]
    pub fn is_descendant_of(&self, slot: u32, ancestor: u32) -> bool {
        self.ancestors(slot).any(|a| a == ancestor)
    }

    /// Returns the slot of the topmost ancestor of `slot` (or `slot` itself).
    #[must_use]
    pub fn root_slot(&self, slot: u32) -> u32 {
        self.ancestors(slot).last().unwrap_or(slot)
    }

    // -- Allocation --

    /// Allocates a slot for a new, unparented element.
    pub(crate) fn allocate(
        &mut self,
        id: ElementId,
        priority: i32,
        is_virtual: bool,
    ) -> Result<u32, HierarchyError> {
        if !id.is_valid() {
            return Err(HierarchyError::InvalidId);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "slot indices are u32 by construction"
        )]
        let slot = self.elements.len() as u32;
        if !self.identity.add(id, slot) {
            return Err(HierarchyError::DuplicateElement(id));
        }
        self.elements.push(HierarchyElement {
            id,
            parent: ElementId::INVALID,
            children: self.child_lists.take(),
        });
        self.priorities.push(priority);
        self.virtual_flags.push(is_virtual);
        Ok(slot)
    }

    /// Removes a detached, childless element, moving the last slot into its
    /// place and re-resolving the moved element's entry in its parent.
    pub(crate) fn swap_remove(&mut self, slot: u32) -> Option<SwapRemoval> {
        let idx = slot as usize;
        if idx >= self.elements.len() {
            return None;
        }
        debug_assert!(
            !self.elements[idx].parent.is_valid(),
            "element must be unparented before removal"
        );
        let removed = self.elements.swap_remove(idx);
        if !removed.children.is_empty() {
            tracing::error!(
                id = ?removed.id,
                children = removed.children.len(),
                "removed element still listed children"
            );
        }
        self.child_lists.give(removed.children);
        self.priorities.swap_remove(idx);
        self.virtual_flags.swap_remove(idx);
        let removal = self.identity.remove_at_swap_back(slot)?;

        if let Some((moved_id, old_slot)) = removal.moved {
            self.patch_moved_slot(moved_id, old_slot, slot);
        }
        Some(removal)
    }

    fn patch_moved_slot(&mut self, moved_id: ElementId, old_slot: u32, new_slot: u32) {
        let Some(parent) = self.parent_slot(new_slot) else {
            return;
        };
        let siblings = &mut self.elements[parent as usize].children;
        match siblings.iter_mut().find(|c| **c == old_slot) {
            Some(entry) => *entry = new_slot,
            None => tracing::error!(
                id = ?moved_id,
                old_slot,
                "moved element missing from its parent's child list"
            ),
        }
    }

    // -- Linking --

    /// Computes where a child with `priority` goes among `parent`'s children.
    ///
    /// The scan starts at whichever end of the sibling list is expected to
    /// be closer, so append-heavy workloads insert in constant time. Equal
    /// priorities keep insertion order.
    #[must_use]
    pub fn insertion_index(&self, parent: u32, priority: i32) -> usize {
        let children = &self.elements[parent as usize].children;
        self.insertion_index_in(children, priority)
    }

    pub(crate) fn insertion_index_in(&self, siblings: &[u32], priority: i32) -> usize {
        let count = siblings.len();
        let halfway = i32::try_from(count / 2).unwrap_or(i32::MAX);
        if priority < halfway {
            siblings
                .iter()
                .position(|&s| self.priorities[s as usize] > priority)
                .unwrap_or(count)
        } else {
            siblings
                .iter()
                .rposition(|&s| self.priorities[s as usize] <= priority)
                .map_or(0, |i| i + 1)
        }
    }

    /// Inserts `child` under `parent` at its priority position and returns
    /// the sibling index.
    pub(crate) fn link_child(&mut self, parent: u32, child: u32, priority: i32) -> usize {
        self.priorities[child as usize] = priority;
        let index = self.insertion_index(parent, priority);
        self.link_child_at(parent, child, index);
        index
    }

    /// Inserts `child` under `parent` at `index` without looking at
    /// priorities.
    pub(crate) fn link_child_at(&mut self, parent: u32, child: u32, index: usize) {
        let parent_id = self.elements[parent as usize].id;
        let children = &mut self.elements[parent as usize].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.elements[child as usize].parent = parent_id;
    }

    /// Detaches `child` from its parent's child list and clears its parent.
    ///
    /// Returns the former parent slot and sibling index. A child missing from
    /// its parent's list is an invariant violation: it is logged and the
    /// parent link is cleared anyway.
    pub(crate) fn unlink_from_parent(&mut self, child: u32) -> Option<(u32, usize)> {
        let parent = self.parent_slot(child);
        let element = &mut self.elements[child as usize];
        if !element.parent.is_valid() {
            return None;
        }
        let parent_id = element.parent;
        element.parent = ElementId::INVALID;
        let Some(parent) = parent else {
            tracing::error!(child = ?element.id, parent = ?parent_id, "parent is not registered");
            return None;
        };

        let siblings = &mut self.elements[parent as usize].children;
        match siblings.iter().position(|&c| c == child) {
            Some(index) => {
                siblings.remove(index);
                Some((parent, index))
            }
            None => {
                tracing::error!(
                    child = ?self.elements[child as usize].id,
                    parent = ?parent_id,
                    "child missing from its parent's child list"
                );
                None
            }
        }
    }

    /// Replaces `parent`'s child list wholesale, updating every listed
    /// child's parent id. Children previously listed but absent from
    /// `children` are left untouched; callers detach them first.
    pub(crate) fn replace_children(&mut self, parent: u32, children: &[u32]) {
        let parent_id = self.elements[parent as usize].id;
        let list = &mut self.elements[parent as usize].children;
        list.clear();
        list.extend_from_slice(children);
        for &child in children {
            self.elements[child as usize].parent = parent_id;
        }
    }

    pub(crate) fn set_priority(&mut self, slot: u32, priority: i32) {
        if let Some(p) = self.priorities.get_mut(slot as usize) {
            *p = priority;
        }
    }

    pub(crate) fn take_list(&mut self) -> Vec<u32> {
        self.child_lists.take()
    }

    pub(crate) fn give_list(&mut self, list: Vec<u32>) {
        self.child_lists.give(list);
    }

    // -- Traversal --

    /// Appends the depth-first pre-order of `root`'s subtree (including
    /// `root`) to `out`.
    pub fn collect_subtree(&self, root: u32, stack: &mut Vec<u32>, out: &mut Vec<u32>) {
        stack.clear();
        stack.push(root);
        while let Some(slot) = stack.pop() {
            out.push(slot);
            stack.extend(self.elements[slot as usize].children.iter().rev());
        }
    }

    /// Reduces `roots` to the slots whose subtrees must be walked.
    ///
    /// Unknown ids and duplicates are dropped, and any root that is a
    /// descendant of another listed root is skipped because its subtree is
    /// already covered. The ancestor scan is quadratic in the number of
    /// roots, which stays small per frame.
    pub fn independent_roots(&self, roots: &[ElementId], out: &mut Vec<u32>) {
        out.clear();
        out.extend(roots.iter().filter_map(|&id| self.slot_of(id)));
        let candidates = core::mem::take(out);
        for (i, &slot) in candidates.iter().enumerate() {
            if candidates[..i].contains(&slot) {
                continue;
            }
            let covered = candidates
                .iter()
                .any(|&other| other != slot && self.is_descendant_of(slot, other));
            if !covered {
                out.push(slot);
            }
        }
    }

    /// Flattens the subtrees of `roots` into one depth-first slot sequence.
    ///
    /// See [`independent_roots`](Self::independent_roots) for deduplication.
    pub fn combine_subtrees(&self, roots: &[ElementId], out: &mut Vec<u32>) {
        let mut independent = Vec::new();
        self.independent_roots(roots, &mut independent);
        let mut stack = Vec::new();
        for root in independent {
            self.collect_subtree(root, &mut stack, out);
        }
    }
}

/// Iterator over ancestor slots, nearest first.
///
/// Created by [`HierarchyStore::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    store: &'a HierarchyStore,
    current: u32,
}

impl Iterator for Ancestors<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.current == INVALID_SLOT {
            return None;
        }
        let slot = self.current;
        self.current = self.store.parent_slot(slot).unwrap_or(INVALID_SLOT);
        Some(slot)
    }
}
