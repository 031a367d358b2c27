// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Virtual proxies and child redistribution.
//!
//! A parent with many children can hand them to one or more *virtual
//! proxies*. Once a parent has proxies, its structural child list holds only
//! the proxies, and its real children are spread across them in contiguous
//! runs. The concatenation of every proxy's children, in proxy order, is the
//! parent's *effective* child list; priorities and reorders always apply to
//! that flattened list.
//!
//! Proxies are virtual elements, so they do not add depth: a child under a
//! proxy has the same batch depth it would have directly under the parent.
//!
//! ```text
//!   parent                 parent
//!   ├── a                  ├── proxy0
//!   ├── b      ──────▶     │   ├── a
//!   ├── c                  │   └── b
//!   └── d                  └── proxy1
//!                              ├── c
//!                              └── d
//! ```

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::data::HierarchyData;
use crate::error::{HierarchyError, logged};
use crate::id::ElementId;

/// The proxies attached to one parent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyContainer {
    /// Proxy ids in child order.
    pub proxy_ids: SmallVec<[ElementId; 4]>,
    /// Minimum run length per proxy; `0` means "balance evenly".
    pub desired_children_per_proxy: u32,
}

impl ProxyContainer {
    /// Number of attached proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proxy_ids.len()
    }

    /// Returns `true` if no proxies are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxy_ids.is_empty()
    }

    /// Returns the position of `proxy` among the attached proxies.
    #[must_use]
    pub fn position(&self, proxy: ElementId) -> Option<usize> {
        self.proxy_ids.iter().position(|&p| p == proxy)
    }
}

/// Proxy containers keyed by parent, plus the reverse proxy-to-parent map.
#[derive(Clone, Debug, Default)]
pub struct ProxyTable {
    containers: HashMap<ElementId, ProxyContainer>,
    owners: HashMap<ElementId, ElementId>,
}

impl ProxyTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parents with at least one proxy.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Returns `true` if no parent has proxies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Returns the container for `parent`.
    #[must_use]
    pub fn container(&self, parent: ElementId) -> Option<&ProxyContainer> {
        self.containers.get(&parent)
    }

    /// Returns `true` if `parent` has proxies.
    #[must_use]
    pub fn has_proxies(&self, parent: ElementId) -> bool {
        self.containers.contains_key(&parent)
    }

    /// Returns the parent `proxy` is attached to.
    #[must_use]
    pub fn owner_of(&self, proxy: ElementId) -> Option<ElementId> {
        self.owners.get(&proxy).copied()
    }

    pub(crate) fn attach(
        &mut self,
        parent: ElementId,
        proxy: ElementId,
        desired: u32,
        insert_first: bool,
    ) {
        let container = self.containers.entry(parent).or_default();
        container.desired_children_per_proxy = desired;
        if insert_first {
            container.proxy_ids.insert(0, proxy);
        } else {
            container.proxy_ids.push(proxy);
        }
        self.owners.insert(proxy, parent);
    }

    /// Detaches `proxy`, dropping its parent's container once it is empty.
    /// Returns the former parent.
    pub(crate) fn detach(&mut self, proxy: ElementId) -> Option<ElementId> {
        let parent = self.owners.remove(&proxy)?;
        if let Some(container) = self.containers.get_mut(&parent) {
            container.proxy_ids.retain(|p| *p != proxy);
            if container.is_empty() {
                self.containers.remove(&parent);
            }
        }
        Some(parent)
    }

    /// Moves `proxy` to `index` (clamped) within its container.
    pub(crate) fn move_proxy(&mut self, proxy: ElementId, index: usize) -> bool {
        let Some(parent) = self.owner_of(proxy) else {
            return false;
        };
        let Some(container) = self.containers.get_mut(&parent) else {
            return false;
        };
        let Some(from) = container.position(proxy) else {
            return false;
        };
        container.proxy_ids.remove(from);
        let to = index.min(container.proxy_ids.len());
        container.proxy_ids.insert(to, proxy);
        true
    }

    pub(crate) fn set_desired(&mut self, parent: ElementId, desired: u32) -> bool {
        match self.containers.get_mut(&parent) {
            Some(container) => {
                container.desired_children_per_proxy = desired;
                true
            }
            None => false,
        }
    }

    /// Removes `parent`'s container and every owner entry pointing at it.
    pub(crate) fn take_container(&mut self, parent: ElementId) -> Option<ProxyContainer> {
        let container = self.containers.remove(&parent)?;
        for proxy in &container.proxy_ids {
            self.owners.remove(proxy);
        }
        Some(container)
    }
}

/// Returns how many of `child_count` children each of `proxy_count` proxies
/// receives, in proxy order.
///
/// Runs are balanced so that every run is either `⌈N/M⌉` or `⌊N/M⌋` long,
/// with the longer runs first. If `desired` exceeds `⌈N/M⌉`, every proxy
/// instead takes up to `desired` children and the trailing proxies may end
/// up short or empty.
pub fn run_lengths(
    child_count: usize,
    proxy_count: usize,
    desired: u32,
) -> impl Iterator<Item = usize> {
    let desired = desired as usize;
    let ceil = if proxy_count == 0 {
        0
    } else {
        child_count.div_ceil(proxy_count)
    };
    let base = child_count.checked_div(proxy_count).unwrap_or(0);
    let extra = child_count.checked_rem(proxy_count).unwrap_or(0);
    (0..proxy_count).map(move |i| {
        if desired > ceil {
            child_count.saturating_sub(i * desired).min(desired)
        } else {
            base + usize::from(i < extra)
        }
    })
}

// -- HierarchyData proxy operations --

impl HierarchyData {
    /// Attaches the virtual element `proxy` to `parent` and redistributes the
    /// parent's effective children across all of its proxies.
    ///
    /// If `proxy` already had children, they join the end of the effective
    /// child list. If it was parented the ordinary way, it is moved.
    pub fn add_virtual_proxy_to_parent(
        &mut self,
        proxy: ElementId,
        parent: ElementId,
        desired_children_per_proxy: u32,
        insert_first: bool,
    ) -> Result<(), HierarchyError> {
        let (proxy_slot, parent_slot) = self
            .check_attach_proxy(proxy, parent)
            .map_err(logged("add_virtual_proxy_to_parent"))?;

        self.mark_slot_dirty(proxy_slot);
        self.detach(proxy_slot);

        let mut order = self.effective_order(parent_slot);
        order.extend_from_slice(&self.store.elements[proxy_slot as usize].children);
        self.proxies
            .attach(parent, proxy, desired_children_per_proxy, insert_first);
        self.relink_proxies(parent_slot);
        self.assign_runs(parent_slot, &order);
        self.store.give_list(order);

        self.batches.mark_reordered(parent);
        self.mark_slot_dirty(parent_slot);
        self.settle_if_detached(proxy_slot);
        tracing::debug!(
            ?proxy,
            ?parent,
            desired = desired_children_per_proxy,
            "virtual proxy attached"
        );
        Ok(())
    }

    /// Like [`add_virtual_proxy_to_parent`](Self::add_virtual_proxy_to_parent),
    /// appending the proxy with the configured default run length.
    pub fn add_default_virtual_proxy(
        &mut self,
        proxy: ElementId,
        parent: ElementId,
    ) -> Result<(), HierarchyError> {
        let desired = self.config.default_children_per_proxy;
        self.add_virtual_proxy_to_parent(proxy, parent, desired, false)
    }

    /// Moves an attached proxy to `index` among its siblings, keeping the
    /// effective child order and redistributing runs.
    pub fn update_virtual_proxy_index(
        &mut self,
        proxy: ElementId,
        index: usize,
    ) -> Result<(), HierarchyError> {
        let (_, owner_slot) = self
            .check_proxy(proxy)
            .map_err(logged("update_virtual_proxy_index"))?;

        let order = self.effective_order(owner_slot);
        self.proxies.move_proxy(proxy, index);
        self.relink_proxies(owner_slot);
        self.assign_runs(owner_slot, &order);
        self.store.give_list(order);
        self.finish_redistribution(owner_slot);
        Ok(())
    }

    /// Detaches an attached proxy. Its children are redistributed over the
    /// remaining proxies, or handed back to the real parent if it was the
    /// last one. The proxy stays registered, parentless and unassigned.
    pub fn remove_virtual_proxy_from_parent(
        &mut self,
        proxy: ElementId,
    ) -> Result<(), HierarchyError> {
        let (proxy_slot, owner_slot) = self
            .check_proxy(proxy)
            .map_err(logged("remove_virtual_proxy_from_parent"))?;
        self.detach_proxy(proxy_slot, owner_slot);
        Ok(())
    }

    /// Changes `parent`'s run length and redistributes its children.
    ///
    /// A parent without proxies is left alone.
    pub fn adjust_child_proxy_distribution(
        &mut self,
        parent: ElementId,
        desired_children_per_proxy: u32,
    ) -> Result<(), HierarchyError> {
        let slot = self
            .slot(parent)
            .map_err(logged("adjust_child_proxy_distribution"))?;
        if self.proxies.set_desired(parent, desired_children_per_proxy) {
            self.redistribute_slot(slot);
        }
        Ok(())
    }

    /// Re-runs the distribution for `parent` without changing its settings.
    pub fn redistribute_children(&mut self, parent: ElementId) -> Result<(), HierarchyError> {
        let slot = self.slot(parent).map_err(logged("redistribute_children"))?;
        if self.proxies.has_proxies(parent) {
            self.redistribute_slot(slot);
        }
        Ok(())
    }

    /// Returns the proxy container of `parent`.
    #[must_use]
    pub fn proxy_container(&self, parent: ElementId) -> Option<&ProxyContainer> {
        self.proxies.container(parent)
    }

    /// Returns the parent `proxy` is attached to.
    #[must_use]
    pub fn proxy_owner(&self, proxy: ElementId) -> Option<ElementId> {
        self.proxies.owner_of(proxy)
    }

    // -- Internals --

    fn check_attach_proxy(
        &self,
        proxy: ElementId,
        parent: ElementId,
    ) -> Result<(u32, u32), HierarchyError> {
        let proxy_slot = self.slot(proxy)?;
        let parent_slot = self.slot(parent)?;
        if !self.store.is_virtual(proxy_slot) {
            return Err(HierarchyError::NotVirtual(proxy));
        }
        if let Some(owner) = self.proxies.owner_of(proxy) {
            return Err(HierarchyError::ProxyAlreadyAttached {
                proxy,
                parent: owner,
            });
        }
        if self.proxies.owner_of(parent).is_some() || self.proxies.has_proxies(proxy) {
            return Err(HierarchyError::NestedProxy { proxy, parent });
        }
        if proxy_slot == parent_slot || self.store.is_descendant_of(parent_slot, proxy_slot) {
            return Err(HierarchyError::CycleDetected {
                child: proxy,
                parent,
            });
        }
        Ok((proxy_slot, parent_slot))
    }

    /// Resolves an attached proxy to `(proxy_slot, owner_slot)`.
    fn check_proxy(&self, proxy: ElementId) -> Result<(u32, u32), HierarchyError> {
        let proxy_slot = self.slot(proxy)?;
        let owner = self
            .proxies
            .owner_of(proxy)
            .ok_or(HierarchyError::NotAProxy(proxy))?;
        Ok((proxy_slot, self.slot(owner)?))
    }

    pub(crate) fn detach_proxy(&mut self, proxy_slot: u32, owner_slot: u32) {
        let proxy = self.store.elements[proxy_slot as usize].id;
        let order = self.effective_order(owner_slot);
        self.mark_slot_dirty(proxy_slot);
        self.proxies.detach(proxy);

        let element = &mut self.store.elements[proxy_slot as usize];
        element.children.clear();
        element.parent = ElementId::INVALID;
        self.settle_if_detached(proxy_slot);

        self.relink_proxies(owner_slot);
        self.assign_runs(owner_slot, &order);
        self.store.give_list(order);
        self.finish_redistribution(owner_slot);
        tracing::debug!(?proxy, "virtual proxy detached");
    }

    /// Drops every proxy of the parent at `parent_slot`, moving its effective
    /// children back under it.
    pub(crate) fn dissolve_proxies(&mut self, parent_slot: u32) {
        let parent = self.store.elements[parent_slot as usize].id;
        let order = self.effective_order(parent_slot);
        if let Some(container) = self.proxies.take_container(parent) {
            for proxy in container.proxy_ids {
                let Some(slot) = self.store.slot_of(proxy) else {
                    continue;
                };
                self.mark_slot_dirty(slot);
                let element = &mut self.store.elements[slot as usize];
                element.children.clear();
                element.parent = ElementId::INVALID;
                self.settle_if_detached(slot);
            }
        }
        self.store.replace_children(parent_slot, &order);
        self.store.give_list(order);
        self.finish_redistribution(parent_slot);
    }

    /// Inserts `child` into a proxied parent's effective list at its priority
    /// position. Returns the effective sibling index.
    pub(crate) fn insert_into_proxied(&mut self, parent_slot: u32, child: u32, priority: i32) -> usize {
        self.store.set_priority(child, priority);
        let mut order = self.effective_order(parent_slot);
        let index = self.store.insertion_index_in(&order, priority);
        order.insert(index, child);
        self.assign_runs(parent_slot, &order);
        self.store.give_list(order);
        self.finish_redistribution(parent_slot);
        index
    }

    pub(crate) fn redistribute_slot(&mut self, parent_slot: u32) {
        let order = self.effective_order(parent_slot);
        self.assign_runs(parent_slot, &order);
        self.store.give_list(order);
        self.finish_redistribution(parent_slot);
    }

    fn finish_redistribution(&mut self, parent_slot: u32) {
        let parent = self.store.elements[parent_slot as usize].id;
        self.batches.mark_reordered(parent);
        self.mark_slot_dirty(parent_slot);
    }

    /// Makes the parent's structural child list match its proxy order.
    fn relink_proxies(&mut self, parent_slot: u32) {
        let parent = self.store.elements[parent_slot as usize].id;
        let mut slots = self.store.take_list();
        if let Some(container) = self.proxies.container(parent) {
            slots.extend(
                container
                    .proxy_ids
                    .iter()
                    .filter_map(|&p| self.store.slot_of(p)),
            );
            self.store.replace_children(parent_slot, &slots);
        }
        self.store.give_list(slots);
    }

    /// Splits `order` into runs and hands one run to each proxy of the
    /// parent. Without proxies, `order` becomes the parent's own list.
    pub(crate) fn assign_runs(&mut self, parent_slot: u32, order: &[u32]) {
        let parent = self.store.elements[parent_slot as usize].id;
        let Some(container) = self.proxies.container(parent) else {
            self.adopt_children(parent_slot, order);
            return;
        };
        let desired = container.desired_children_per_proxy;
        let proxy_slots: SmallVec<[u32; 8]> = container
            .proxy_ids
            .iter()
            .filter_map(|&p| self.store.slot_of(p))
            .collect();
        if proxy_slots.is_empty() {
            self.adopt_children(parent_slot, order);
            return;
        }

        let mut offset = 0;
        for (&proxy_slot, run) in proxy_slots
            .iter()
            .zip(run_lengths(order.len(), proxy_slots.len(), desired))
        {
            let end = (offset + run).min(order.len());
            self.apply_run(proxy_slot, &order[offset..end]);
            offset = end;
        }
        debug_assert_eq!(offset, order.len(), "every child lands in a run");
    }

    /// Gives `run` to the proxy at `proxy_slot`. A run that is already in
    /// place is left alone.
    fn apply_run(&mut self, proxy_slot: u32, run: &[u32]) {
        let proxy = self.store.elements[proxy_slot as usize].id;
        if self.store.elements[proxy_slot as usize].children.as_slice() == run {
            return;
        }
        let arrived = self.adopt_children(proxy_slot, run);
        self.batches.mark_reordered(proxy);
        tracing::trace!(?proxy, arrived, "proxy run reassigned");
    }

    /// Makes `run` the child list of `slot`. Children arriving from another
    /// parent dirty the batch they leave and the batch they join; if they
    /// join none, their subtrees are reset. Returns how many arrived.
    fn adopt_children(&mut self, slot: u32, run: &[u32]) -> usize {
        let id = self.store.elements[slot as usize].id;
        let mut arriving = self.store.take_list();
        arriving.extend(
            run.iter()
                .copied()
                .filter(|&child| self.store.elements[child as usize].parent != id),
        );
        for &child in &arriving {
            self.mark_slot_dirty(child);
        }
        self.store.replace_children(slot, run);
        for &child in &arriving {
            self.mark_slot_dirty(child);
            self.settle_if_detached(child);
        }
        let count = arriving.len();
        self.store.give_list(arriving);
        count
    }
}
