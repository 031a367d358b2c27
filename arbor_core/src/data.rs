// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The hierarchy façade.
//!
//! [`HierarchyData`] combines the [`HierarchyStore`], the [`ProxyTable`], and
//! the [`BatchGroupTracker`] behind one mutation API that keeps them
//! consistent. Every structural mutation marks the affected batches dirty;
//! annotations are only recomputed by the next
//! [`HierarchyEngine`](crate::HierarchyEngine) update.
//!
//! # Batch roots
//!
//! A non-virtual element without a parent is a batch root automatically.
//! Parenting it demotes it again unless it was marked explicitly with
//! [`mark_batch_root`](HierarchyData::mark_batch_root). Virtual elements
//! never become roots on their own.
//!
//! # Errors
//!
//! Misuse (unknown ids, cycles, mismatched reorders) returns a
//! [`HierarchyError`], logs a warning, and leaves the hierarchy untouched.

use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::batch::{BatchGroupElement, BatchGroupTracker, BatchState};
use crate::config::HierarchyConfig;
use crate::error::{HierarchyError, logged};
use crate::id::ElementId;
use crate::jobs::Workers;
use crate::proxy::ProxyTable;
use crate::store::{HierarchyElement, HierarchyStore};

/// Element hierarchy, proxies, and batch bookkeeping.
#[derive(Debug)]
pub struct HierarchyData {
    pub(crate) store: HierarchyStore,
    pub(crate) proxies: ProxyTable,
    pub(crate) batches: BatchGroupTracker,
    pub(crate) pending_added: Vec<ElementId>,
    pub(crate) pending_removed: Vec<ElementId>,
    pub(crate) config: HierarchyConfig,
}

impl Default for HierarchyData {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyData {
    /// Creates an empty hierarchy with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HierarchyConfig::default())
    }

    /// Creates an empty hierarchy.
    #[must_use]
    pub fn with_config(config: HierarchyConfig) -> Self {
        Self {
            store: HierarchyStore::with_capacity(
                config.initial_capacity,
                config.retained_child_lists,
            ),
            proxies: ProxyTable::new(),
            batches: BatchGroupTracker::new(),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Number of registered elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.store.identity.contains(id)
    }

    /// Read access to the element storage.
    #[must_use]
    pub fn store(&self) -> &HierarchyStore {
        &self.store
    }

    /// Read access to the batch tracker.
    #[must_use]
    pub fn batches(&self) -> &BatchGroupTracker {
        &self.batches
    }

    /// Read access to the proxy table.
    #[must_use]
    pub fn proxies(&self) -> &ProxyTable {
        &self.proxies
    }

    /// Elements added since the last completed update.
    #[must_use]
    pub fn pending_added(&self) -> &[ElementId] {
        &self.pending_added
    }

    /// Elements removed since the last completed update.
    #[must_use]
    pub fn pending_removed(&self) -> &[ElementId] {
        &self.pending_removed
    }

    // -- Registration --

    /// Registers `id` and, if `parent` is valid, parents it with `priority`.
    ///
    /// Returns the new slot. A parentless non-virtual element becomes a batch
    /// root.
    pub fn add(
        &mut self,
        id: ElementId,
        parent: ElementId,
        priority: i32,
        is_virtual: bool,
    ) -> Result<u32, HierarchyError> {
        let parent_slot = self.check_add(id, parent).map_err(logged("add"))?;
        let slot = self
            .store
            .allocate(id, priority, is_virtual)
            .map_err(logged("add"))?;
        let tracked = self.batches.add_empty();
        debug_assert_eq!(slot, tracked, "store and tracker slots diverged");
        self.pending_added.push(id);

        match parent_slot {
            Some(parent_slot) => {
                self.reparent(slot, parent_slot, priority);
            }
            None if !is_virtual => {
                self.batches.add_batch_root(id, None);
            }
            None => {}
        }
        tracing::trace!(?id, ?parent, slot, is_virtual, "element added");
        Ok(slot)
    }

    /// Unregisters `id`.
    ///
    /// Proxies it owns are dissolved first, so its effective children become
    /// its direct children. Those children are then orphaned: non-virtual
    /// ones become batch roots, virtual ones become unassigned.
    pub fn remove(&mut self, id: ElementId) -> Result<(), HierarchyError> {
        let slot = self.slot(id).map_err(logged("remove"))?;

        if let Some(owner_slot) = self
            .proxies
            .owner_of(id)
            .and_then(|owner| self.store.slot_of(owner))
        {
            self.detach_proxy(slot, owner_slot);
        }
        if self.proxies.has_proxies(id) {
            self.dissolve_proxies(slot);
        }

        self.mark_slot_dirty(slot);
        let former_parent = self.detach(slot);
        if let Some(former) = former_parent {
            self.mark_slot_dirty(former);
        }
        self.batches.remove_batch_root(id, former_parent);
        self.orphan_children(slot);

        self.store.swap_remove(slot);
        self.batches.remove_at_swap_back(slot);
        self.batches.forget(id);

        match self.pending_added.iter().position(|&a| a == id) {
            Some(pos) => {
                self.pending_added.remove(pos);
            }
            None => self.pending_removed.push(id),
        }
        tracing::trace!(?id, slot, "element removed");
        Ok(())
    }

    /// Alias of [`add`](Self::add) for framework integration code.
    pub fn register(
        &mut self,
        id: ElementId,
        parent: ElementId,
        priority: i32,
        is_virtual: bool,
    ) -> Result<u32, HierarchyError> {
        self.add(id, parent, priority, is_virtual)
    }

    /// Alias of [`remove`](Self::remove).
    pub fn unregister(&mut self, id: ElementId) -> Result<(), HierarchyError> {
        self.remove(id)
    }

    // -- Parenting --

    /// Moves `child` under `parent` at `priority`.
    ///
    /// Returns the child's index among the parent's effective children. If
    /// `parent` is an attached proxy, the child is inserted into the proxy's
    /// owner instead.
    pub fn set_parent(
        &mut self,
        child: ElementId,
        parent: ElementId,
        priority: i32,
    ) -> Result<usize, HierarchyError> {
        let (child_slot, parent_slot) = self
            .check_reparent(child, parent)
            .map_err(logged("set_parent"))?;
        Ok(self.reparent(child_slot, parent_slot, priority))
    }

    /// Detaches `child` from its parent.
    ///
    /// A non-virtual child becomes a batch root. A virtual child and its
    /// subtree become unassigned. Unparenting an attached proxy detaches it
    /// from its owner.
    pub fn unparent(&mut self, child: ElementId) -> Result<(), HierarchyError> {
        let slot = self.slot(child).map_err(logged("unparent"))?;
        if self.proxies.owner_of(child).is_some() {
            return self.remove_virtual_proxy_from_parent(child);
        }

        self.mark_slot_dirty(slot);
        let Some(former) = self.detach(slot) else {
            return Ok(());
        };
        if self.store.is_virtual(slot) {
            self.settle_if_detached(slot);
        } else if !self.batches.add_batch_root(child, Some(former)) {
            self.batches.mark_root_dirty(child);
        }
        self.mark_slot_dirty(former);
        Ok(())
    }

    // -- Ordering --

    /// Moves `id` to the front of its parent's effective children.
    ///
    /// Its priority becomes one less than the smallest sibling priority. An
    /// attached proxy is moved to the front of the proxy list instead.
    pub fn set_as_first_sibling(&mut self, id: ElementId) -> Result<(), HierarchyError> {
        self.move_to_edge(id, true)
            .map_err(logged("set_as_first_sibling"))
    }

    /// Moves `id` to the back of its parent's effective children.
    ///
    /// Its priority becomes one more than the largest sibling priority. An
    /// attached proxy is moved to the back of the proxy list instead.
    pub fn set_as_last_sibling(&mut self, id: ElementId) -> Result<(), HierarchyError> {
        self.move_to_edge(id, false)
            .map_err(logged("set_as_last_sibling"))
    }

    /// Replaces the whole effective child order of `parent`.
    ///
    /// `ids` must list every effective child exactly once, and `priorities`
    /// gives each its new priority. The children end up in `ids` order.
    pub fn update_child_order(
        &mut self,
        parent: ElementId,
        ids: &[ElementId],
        priorities: &[i32],
    ) -> Result<(), HierarchyError> {
        let (parent_slot, order) = self
            .check_child_order(parent, ids, priorities)
            .map_err(logged("update_child_order"))?;
        for (&slot, &priority) in order.iter().zip(priorities) {
            self.store.set_priority(slot, priority);
        }
        self.apply_order(parent_slot, &order);
        Ok(())
    }

    // -- Batches and dirtiness --

    /// Explicitly adds or removes `id` from the batch-root set.
    ///
    /// An explicit root stays a root while parented. Clearing the mark on a
    /// parentless non-virtual element leaves it an automatic root.
    pub fn mark_batch_root(&mut self, id: ElementId, is_root: bool) -> Result<(), HierarchyError> {
        let slot = self.slot(id).map_err(logged("mark_batch_root"))?;
        let parent = self.store.parent_slot(slot);
        if is_root {
            self.batches.add_batch_root(id, parent);
            self.batches.set_explicit(id, true);
        } else if parent.is_none() && !self.store.is_virtual(slot) {
            self.batches.set_explicit(id, false);
        } else {
            self.batches.remove_batch_root(id, parent);
        }
        self.mark_slot_dirty(slot);
        self.settle_if_detached(slot);
        Ok(())
    }

    /// Marks the batch containing `id` dirty without any structural change.
    pub fn mark_dirty(&mut self, id: ElementId) -> Result<(), HierarchyError> {
        let slot = self.slot(id).map_err(logged("mark_dirty"))?;
        self.mark_slot_dirty(slot);
        Ok(())
    }

    /// Returns `true` if an update has work to do.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.batches.is_dirty()
    }

    // -- Queries --

    /// Number of structural children of `id`.
    #[must_use]
    pub fn child_count(&self, id: ElementId) -> Option<usize> {
        Some(self.element_of(id)?.children.len())
    }

    /// Index of `id` in its structural parent's child list.
    #[must_use]
    pub fn sibling_index(&self, id: ElementId) -> Option<usize> {
        self.store.sibling_index(self.store.slot_of(id)?)
    }

    /// The structural parent of `id`.
    #[must_use]
    pub fn parent_id(&self, id: ElementId) -> Option<ElementId> {
        self.element_of(id)?.parent.valid()
    }

    /// The parent of `id` with proxies skipped over.
    #[must_use]
    pub fn real_parent_id(&self, id: ElementId) -> Option<ElementId> {
        let parent = self.parent_id(id)?;
        Some(self.proxies.owner_of(parent).unwrap_or(parent))
    }

    /// The sibling priority of `id`.
    #[must_use]
    pub fn priority(&self, id: ElementId) -> Option<i32> {
        self.store.priority(self.store.slot_of(id)?)
    }

    /// Returns `true` if `id` was registered as virtual.
    #[must_use]
    pub fn is_virtual(&self, id: ElementId) -> bool {
        self.store
            .slot_of(id)
            .is_some_and(|slot| self.store.is_virtual(slot))
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn is_descendant_of(&self, id: ElementId, ancestor: ElementId) -> bool {
        match (self.store.slot_of(id), self.store.slot_of(ancestor)) {
            (Some(slot), Some(ancestor)) => self.store.is_descendant_of(slot, ancestor),
            _ => false,
        }
    }

    /// The topmost ancestor of `id`, or `id` itself if it has no parent.
    #[must_use]
    pub fn hierarchy_root_id(&self, id: ElementId) -> Option<ElementId> {
        let slot = self.store.slot_of(id)?;
        self.store.id_at(self.store.root_slot(slot))
    }

    /// Structural children of `id` in sibling order.
    pub fn children(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.element_of(id)
            .into_iter()
            .flat_map(|element| element.children.iter())
            .filter_map(|&slot| self.store.id_at(slot))
    }

    /// Children of `id` with proxies flattened away.
    #[must_use]
    pub fn effective_children(&self, id: ElementId) -> Vec<ElementId> {
        let mut slots = Vec::new();
        if let Some(slot) = self.store.slot_of(id) {
            self.effective_order_into(slot, &mut slots);
        }
        slots
            .into_iter()
            .filter_map(|slot| self.store.id_at(slot))
            .collect()
    }

    /// The batch annotation of `id` as of the last update.
    #[must_use]
    pub fn annotation(&self, id: ElementId) -> Option<BatchGroupElement> {
        self.batches.annotation(self.store.slot_of(id)?)
    }

    /// The decoded batch state of `id` as of the last update.
    #[must_use]
    pub fn batch_state(&self, id: ElementId) -> Option<BatchState> {
        self.annotation(id).map(BatchGroupElement::state)
    }

    /// Returns `true` if `id` is an active batch root.
    #[must_use]
    pub fn is_batch_root(&self, id: ElementId) -> bool {
        self.batches.is_batch_root(id)
    }

    /// Appends the dirty batch roots to `out_roots` (batch-root set order)
    /// and the depth-first slots of their subtrees to `out_slots`.
    ///
    /// Slot values are only meaningful until the next mutation.
    pub fn populate_with_dirty_batch_elements(
        &self,
        workers: &Workers,
        out_roots: &mut Vec<ElementId>,
        out_slots: &mut Vec<u32>,
    ) {
        let start = out_roots.len();
        self.batches.populate_with_dirty_roots(out_roots);
        self.depth_sorted_hierarchy(workers, &out_roots[start..], out_slots);
    }

    /// Appends the depth-first pre-order of every subtree in `roots` to
    /// `out`, skipping roots covered by another listed root.
    ///
    /// Subtrees are walked on `workers`; the output order matches `roots`.
    pub fn depth_sorted_hierarchy(&self, workers: &Workers, roots: &[ElementId], out: &mut Vec<u32>) {
        let mut independent = Vec::new();
        self.store.independent_roots(roots, &mut independent);
        let store = &self.store;
        workers.flat_map(
            &independent,
            |&root, acc| {
                let mut stack = Vec::new();
                store.collect_subtree(root, &mut stack, acc);
            },
            out,
        );
    }

    // -- Internals --

    pub(crate) fn slot(&self, id: ElementId) -> Result<u32, HierarchyError> {
        if !id.is_valid() {
            return Err(HierarchyError::InvalidId);
        }
        self.store
            .slot_of(id)
            .ok_or(HierarchyError::UnknownElement(id))
    }

    fn element_of(&self, id: ElementId) -> Option<&HierarchyElement> {
        self.store.element(self.store.slot_of(id)?)
    }

    fn check_add(&self, id: ElementId, parent: ElementId) -> Result<Option<u32>, HierarchyError> {
        if !id.is_valid() {
            return Err(HierarchyError::InvalidId);
        }
        if self.contains(id) {
            return Err(HierarchyError::DuplicateElement(id));
        }
        if parent.is_valid() {
            self.slot(parent).map(Some)
        } else {
            Ok(None)
        }
    }

    fn check_reparent(
        &self,
        child: ElementId,
        parent: ElementId,
    ) -> Result<(u32, u32), HierarchyError> {
        let child_slot = self.slot(child)?;
        let parent_slot = self.slot(parent)?;
        if child_slot == parent_slot || self.store.is_descendant_of(parent_slot, child_slot) {
            return Err(HierarchyError::CycleDetected { child, parent });
        }
        if let Some(owner) = self.proxies.owner_of(child) {
            return Err(HierarchyError::ProxyAlreadyAttached {
                proxy: child,
                parent: owner,
            });
        }
        Ok((child_slot, parent_slot))
    }

    fn check_child_order(
        &self,
        parent: ElementId,
        ids: &[ElementId],
        priorities: &[i32],
    ) -> Result<(u32, Vec<u32>), HierarchyError> {
        if ids.len() != priorities.len() {
            return Err(HierarchyError::PriorityCountMismatch {
                ids: ids.len(),
                priorities: priorities.len(),
            });
        }
        let parent_slot = self.slot(parent)?;
        let mut current = Vec::new();
        self.effective_order_into(parent_slot, &mut current);
        if current.len() != ids.len() {
            return Err(HierarchyError::ChildCountMismatch {
                parent,
                expected: current.len(),
                actual: ids.len(),
            });
        }

        let mut remaining: HashSet<u32> = current.iter().copied().collect();
        let mut order = Vec::with_capacity(ids.len());
        for &child in ids {
            let slot = self
                .store
                .slot_of(child)
                .filter(|slot| remaining.remove(slot))
                .ok_or(HierarchyError::NotAChild { parent, child })?;
            order.push(slot);
        }
        Ok((parent_slot, order))
    }

    /// Links `child` under `parent` (or the owner, if `parent` is an attached
    /// proxy), demoting an automatic batch root. Returns the effective
    /// sibling index.
    pub(crate) fn reparent(&mut self, child: u32, parent: u32, priority: i32) -> usize {
        let child_id = self.store.elements[child as usize].id;
        self.mark_slot_dirty(child);
        self.detach(child);
        if self.batches.is_batch_root(child_id) && !self.batches.is_explicit_root(child_id) {
            self.batches.remove_batch_root(child_id, None);
        }

        let parent = self.redirect_to_owner(parent);
        let parent_id = self.store.elements[parent as usize].id;
        let index = if self.proxies.has_proxies(parent_id) {
            self.insert_into_proxied(parent, child, priority)
        } else {
            let index = self.store.link_child(parent, child, priority);
            self.batches.mark_reordered(parent_id);
            index
        };
        self.mark_child_dirty(child, parent);
        self.settle_if_detached(child);
        index
    }

    /// Unlinks `slot` from its parent, redistributing the owner if the
    /// parent was a proxy. Returns the former parent slot.
    pub(crate) fn detach(&mut self, slot: u32) -> Option<u32> {
        let (former, _) = self.store.unlink_from_parent(slot)?;
        let former_id = self.store.elements[former as usize].id;
        self.batches.mark_reordered(former_id);
        if let Some(owner_slot) = self
            .proxies
            .owner_of(former_id)
            .and_then(|owner| self.store.slot_of(owner))
        {
            self.redistribute_slot(owner_slot);
        }
        Some(former)
    }

    fn redirect_to_owner(&self, slot: u32) -> u32 {
        let id = self.store.elements[slot as usize].id;
        self.proxies
            .owner_of(id)
            .and_then(|owner| self.store.slot_of(owner))
            .unwrap_or(slot)
    }

    fn orphan_children(&mut self, slot: u32) {
        let children = core::mem::take(&mut self.store.elements[slot as usize].children);
        for &child in &children {
            self.store.elements[child as usize].parent = ElementId::INVALID;
            let child_id = self.store.elements[child as usize].id;
            if self.store.is_virtual(child) {
                self.settle_if_detached(child);
            } else if !self.batches.add_batch_root(child_id, None) {
                self.batches.mark_root_dirty(child_id);
            }
        }
        self.store.give_list(children);
    }

    /// Resets the annotations of a subtree that left every batch, stopping
    /// at nested batch roots.
    fn clear_detached_subtree(&mut self, slot: u32) {
        let mut stack = self.store.take_list();
        stack.push(slot);
        while let Some(current) = stack.pop() {
            self.batches
                .set_annotation(current, BatchGroupElement::UNASSIGNED);
            let Some(element) = self.store.element(current) else {
                continue;
            };
            let (store, batches) = (&self.store, &self.batches);
            stack.extend(element.children.iter().copied().filter(|&c| {
                store
                    .id_at(c)
                    .is_some_and(|id| !batches.is_batch_root(id))
            }));
        }
        self.store.give_list(stack);
    }

    fn move_to_edge(&mut self, id: ElementId, first: bool) -> Result<(), HierarchyError> {
        let slot = self.slot(id)?;
        if let Some(owner) = self.proxies.owner_of(id) {
            let index = if first {
                0
            } else {
                self.proxies.container(owner).map_or(0, |c| c.len())
            };
            return self.update_virtual_proxy_index(id, index);
        }
        let Some(parent) = self.effective_parent_slot(slot) else {
            return Ok(());
        };

        let mut order = self.effective_order(parent);
        order.retain(|&s| s != slot);
        let priorities = order.iter().filter_map(|&s| self.store.priority(s));
        let own = self.store.priority(slot).unwrap_or(0);
        let priority = if first {
            priorities.min().map_or(own, |p| p.saturating_sub(1))
        } else {
            priorities.max().map_or(own, |p| p.saturating_add(1))
        };
        self.store.set_priority(slot, priority);
        if first {
            order.insert(0, slot);
        } else {
            order.push(slot);
        }
        self.apply_order(parent, &order);
        self.store.give_list(order);
        Ok(())
    }

    fn effective_parent_slot(&self, slot: u32) -> Option<u32> {
        let parent = self.store.parent_slot(slot)?;
        Some(self.redirect_to_owner(parent))
    }

    /// Writes a new effective child order for `parent_slot`.
    fn apply_order(&mut self, parent_slot: u32, order: &[u32]) {
        let parent = self.store.elements[parent_slot as usize].id;
        self.assign_runs(parent_slot, order);
        self.batches.mark_reordered(parent);
        self.mark_slot_dirty(parent_slot);
    }

    /// Appends the effective child slots of `parent_slot` to `out`.
    pub(crate) fn effective_order_into(&self, parent_slot: u32, out: &mut Vec<u32>) {
        let Some(element) = self.store.element(parent_slot) else {
            return;
        };
        match self.proxies.container(element.id) {
            Some(container) => {
                for &proxy in &container.proxy_ids {
                    if let Some(proxy) = self.store.slot_of(proxy).and_then(|s| self.store.element(s)) {
                        out.extend_from_slice(&proxy.children);
                    }
                }
            }
            None => out.extend_from_slice(&element.children),
        }
    }

    /// Pooled variant of [`effective_order_into`](Self::effective_order_into).
    /// Return the list with `self.store.give_list`.
    pub(crate) fn effective_order(&mut self, parent_slot: u32) -> Vec<u32> {
        let mut list = self.store.take_list();
        self.effective_order_into(parent_slot, &mut list);
        list
    }

    /// Marks the batch containing `slot` dirty.
    ///
    /// Both the batch named by the slot's annotation and the nearest batch
    /// root found by walking up the tree are marked; they differ while the
    /// slot is unassigned or has moved since the last update.
    pub(crate) fn mark_slot_dirty(&mut self, slot: u32) {
        self.batches.mark_containing_batch_dirty(slot);
        self.mark_structural_owner(slot);
    }

    fn mark_child_dirty(&mut self, child: u32, parent: u32) {
        self.batches.mark_child_dirty(child, parent);
        self.mark_structural_owner(child);
        self.mark_structural_owner(parent);
    }

    fn mark_structural_owner(&mut self, slot: u32) {
        if let Some(root) = self.structural_owner(slot) {
            self.batches.mark_root_dirty(root);
        }
    }

    /// The nearest batch root at or above `slot`.
    fn structural_owner(&self, slot: u32) -> Option<ElementId> {
        core::iter::once(slot)
            .chain(self.store.ancestors(slot))
            .filter_map(|s| self.store.id_at(s))
            .find(|&id| self.batches.is_batch_root(id))
    }

    /// Resets the subtree at `slot` if no batch root owns it anymore.
    pub(crate) fn settle_if_detached(&mut self, slot: u32) {
        if self.structural_owner(slot).is_none() {
            self.clear_detached_subtree(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn id(n: u32) -> ElementId {
        ElementId(n)
    }

    /// 1 -> [2 -> [4], 3]
    fn small_tree() -> HierarchyData {
        let mut data = HierarchyData::new();
        data.add(id(1), ElementId::INVALID, 0, false).unwrap();
        data.add(id(2), id(1), 0, false).unwrap();
        data.add(id(3), id(1), 1, false).unwrap();
        data.add(id(4), id(2), 0, false).unwrap();
        data
    }

    #[test]
    fn parentless_elements_become_batch_roots() {
        let mut data = small_tree();
        assert!(data.is_batch_root(id(1)));
        assert!(!data.is_batch_root(id(2)));

        data.add(id(9), ElementId::INVALID, 0, true).unwrap();
        assert!(!data.is_batch_root(id(9)), "virtual elements are never automatic roots");
        assert_eq!(data.pending_added(), &[id(1), id(2), id(3), id(4), id(9)]);
    }

    #[test]
    fn add_with_unknown_parent_changes_nothing() {
        let mut data = small_tree();
        assert_eq!(
            data.add(id(5), id(77), 0, false),
            Err(HierarchyError::UnknownElement(id(77)))
        );
        assert!(!data.contains(id(5)));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn set_parent_rejects_cycles() {
        let mut data = small_tree();
        assert_eq!(
            data.set_parent(id(1), id(4), 0),
            Err(HierarchyError::CycleDetected {
                child: id(1),
                parent: id(4)
            })
        );
        assert_eq!(
            data.set_parent(id(2), id(2), 0),
            Err(HierarchyError::CycleDetected {
                child: id(2),
                parent: id(2)
            })
        );
        assert_eq!(data.parent_id(id(1)), None);
    }

    #[test]
    fn set_parent_demotes_automatic_roots_only() {
        let mut data = small_tree();
        data.add(id(5), ElementId::INVALID, 0, false).unwrap();
        data.add(id(6), ElementId::INVALID, 0, false).unwrap();
        data.mark_batch_root(id(6), true).unwrap();

        data.set_parent(id(5), id(3), 0).unwrap();
        data.set_parent(id(6), id(3), 1).unwrap();
        assert!(!data.is_batch_root(id(5)));
        assert!(data.is_batch_root(id(6)), "explicit roots survive parenting");
        assert_eq!(data.children(id(3)).collect::<Vec<_>>(), vec![id(5), id(6)]);
    }

    #[test]
    fn unparent_promotes_to_batch_root() {
        let mut data = small_tree();
        data.unparent(id(2)).unwrap();
        assert!(data.is_batch_root(id(2)));
        assert_eq!(data.parent_id(id(2)), None);
        assert_eq!(data.child_count(id(1)), Some(1));
        assert_eq!(data.hierarchy_root_id(id(4)), Some(id(2)));
    }

    #[test]
    fn remove_orphans_children_as_roots() {
        let mut data = small_tree();
        data.remove(id(2)).unwrap();
        assert!(!data.contains(id(2)));
        assert!(data.is_batch_root(id(4)));
        assert_eq!(data.parent_id(id(4)), None);
        assert_eq!(data.children(id(1)).collect::<Vec<_>>(), vec![id(3)]);
        assert!(
            data.pending_removed().is_empty(),
            "added and removed before any update cancels out"
        );
    }

    #[test]
    fn removing_a_batch_root_drops_it_from_the_set() {
        let mut data = small_tree();
        data.remove(id(1)).unwrap();
        assert!(!data.is_batch_root(id(1)));
        assert!(data.is_batch_root(id(2)));
        assert!(data.is_batch_root(id(3)));
        assert_eq!(data.batches().batch_root_count(), 2);
    }

    #[test]
    fn sibling_edges_rewrite_priorities() {
        let mut data = small_tree();
        data.add(id(5), id(1), 5, false).unwrap();
        data.set_as_first_sibling(id(5)).unwrap();
        assert_eq!(data.children(id(1)).collect::<Vec<_>>(), vec![id(5), id(2), id(3)]);
        assert_eq!(data.priority(id(5)), Some(-1));

        data.set_as_last_sibling(id(2)).unwrap();
        assert_eq!(data.children(id(1)).collect::<Vec<_>>(), vec![id(5), id(3), id(2)]);
        assert_eq!(data.priority(id(2)), Some(2));
        assert_eq!(data.sibling_index(id(2)), Some(2));
    }

    #[test]
    fn update_child_order_validates_input() {
        let mut data = small_tree();
        assert_eq!(
            data.update_child_order(id(1), &[id(3)], &[0, 1]),
            Err(HierarchyError::PriorityCountMismatch {
                ids: 1,
                priorities: 2
            })
        );
        assert_eq!(
            data.update_child_order(id(1), &[id(3)], &[0]),
            Err(HierarchyError::ChildCountMismatch {
                parent: id(1),
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            data.update_child_order(id(1), &[id(3), id(4)], &[0, 1]),
            Err(HierarchyError::NotAChild {
                parent: id(1),
                child: id(4)
            })
        );
        assert_eq!(
            data.update_child_order(id(1), &[id(3), id(3)], &[0, 1]),
            Err(HierarchyError::NotAChild {
                parent: id(1),
                child: id(3)
            })
        );

        data.update_child_order(id(1), &[id(3), id(2)], &[0, 1])
            .unwrap();
        assert_eq!(data.children(id(1)).collect::<Vec<_>>(), vec![id(3), id(2)]);
        assert_eq!(data.priority(id(2)), Some(1));
    }

    #[test]
    fn mark_dirty_resolves_unassigned_slots_structurally() {
        let mut data = small_tree();
        data.batches.clear_dirty_state();
        assert!(!data.is_dirty());

        // Nothing has been assigned yet, so only the structural walk finds 1.
        data.mark_dirty(id(4)).unwrap();
        let mut roots = Vec::new();
        data.batches().populate_with_dirty_roots(&mut roots);
        assert_eq!(roots, vec![id(1)]);
    }

    #[test]
    fn moving_under_a_detached_virtual_parent_unassigns() {
        let mut data = small_tree();
        crate::HierarchyEngine::new(crate::config::EngineConfig::sequential()).update(&mut data);
        assert!(matches!(data.batch_state(id(4)), Some(BatchState::Assigned { .. })));

        data.add(id(8), ElementId::INVALID, 0, true).unwrap();
        data.set_parent(id(2), id(8), 0).unwrap();
        assert_eq!(data.batch_state(id(2)), Some(BatchState::Unassigned));
        assert_eq!(data.batch_state(id(4)), Some(BatchState::Unassigned));
    }

    #[test]
    fn depth_sorted_hierarchy_is_preorder() {
        let data = small_tree();
        let mut slots = Vec::new();
        data.depth_sorted_hierarchy(&Workers::sequential(), &[id(1)], &mut slots);
        let ids: Vec<_> = slots.iter().filter_map(|&s| data.store().id_at(s)).collect();
        assert_eq!(ids, vec![id(1), id(2), id(4), id(3)]);
    }

    #[test]
    fn queries_on_unknown_ids_are_empty() {
        let data = small_tree();
        assert_eq!(data.child_count(id(42)), None);
        assert_eq!(data.parent_id(id(42)), None);
        assert_eq!(data.children(id(42)).count(), 0);
        assert!(data.effective_children(id(42)).is_empty());
        assert!(!data.is_descendant_of(id(42), id(1)));
    }
}
