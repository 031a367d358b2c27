// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The four-phase hierarchy update.
//!
//! An update turns the dirty-root set into fresh batch annotations:
//!
//! 1. **Setup**: Snapshot the active batch roots that are still registered,
//!    each with its ordinal in the batch-root set.
//! 2. **Harvest**: Intersect the dirty roots with that snapshot (in ordinal
//!    order), drop roots nested inside another dirty root, and flatten each
//!    remaining subtree depth-first. Subtrees are walked on the engine's
//!    [`Workers`].
//! 3. **Assign**: For every harvested slot, compute the annotation writes
//!    it owns: a batch root writes `(self, 0)`, and any slot with children
//!    writes `(root, depth)` into each child that is not itself a root. The
//!    writes are computed on the workers and applied in harvest order.
//! 4. **Complete**: Collect reordered parents, clear every dirty set, and
//!    publish the added/removed lists.
//!
//! The phases are encoded as [`FrameUpdate`] typestates, so a caller driving
//! the phases by hand cannot run them out of order. Each phase finishes all
//! of its parallel work before returning.
//!
//! Depth counts non-virtual ancestors: a child of a virtual element has the
//! same depth as its virtual parent.
//!
//! ```text
//!   root (depth 0)
//!   ├── proxy (virtual, depth 1)
//!   │   └── a (depth 1)
//!   └── b (depth 1)
//!       └── c (depth 2)
//! ```

use alloc::vec::Vec;
use core::marker::PhantomData;

use hashbrown::HashMap;

use crate::batch::{BatchGroupElement, BatchGroupTracker};
use crate::config::EngineConfig;
use crate::data::HierarchyData;
use crate::id::ElementId;
use crate::jobs::Workers;
use crate::store::HierarchyStore;
use crate::trace::{
    FrameBeginEvent, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, Tracer,
};

/// What an update changed.
///
/// `dirty_slots` are raw store slots so consumers can index the store's
/// arrays directly. They stay valid until the next mutation of the
/// [`HierarchyData`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HierarchyChanges {
    /// Index of the update that produced these changes.
    pub frame_index: u64,
    /// Dirty batch roots processed, in batch-root set order.
    pub dirty_roots: Vec<ElementId>,
    /// Every reclassified slot, depth-first per root.
    pub dirty_slots: Vec<u32>,
    /// Parents whose child order changed, sorted by id.
    pub reordered: Vec<ElementId>,
    /// Elements added since the previous update.
    pub added: Vec<ElementId>,
    /// Elements removed since the previous update.
    pub removed: Vec<ElementId>,
}

impl HierarchyChanges {
    /// Clears all change lists, keeping their capacity.
    pub fn clear(&mut self) {
        self.frame_index = 0;
        self.dirty_roots.clear();
        self.dirty_slots.clear();
        self.reordered.clear();
        self.added.clear();
        self.removed.clear();
    }

    /// Returns `true` if the update changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirty_roots.is_empty()
            && self.dirty_slots.is_empty()
            && self.reordered.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }

    /// Resolves `dirty_slots` to ids against `data`.
    pub fn dirty_ids<'a>(&'a self, data: &'a HierarchyData) -> impl Iterator<Item = ElementId> + 'a {
        self.dirty_slots
            .iter()
            .filter_map(|&slot| data.store.id_at(slot))
    }
}

/// Drives hierarchy updates.
#[derive(Debug)]
pub struct HierarchyEngine {
    config: EngineConfig,
    workers: Workers,
    frame_index: u64,
    ordinals: HashMap<ElementId, u32>,
    writes: Vec<(u32, BatchGroupElement)>,
}

impl Default for HierarchyEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl HierarchyEngine {
    /// Creates an engine and its workers.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            workers: Workers::new(&config),
            frame_index: 0,
            ordinals: HashMap::new(),
            writes: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the engine's workers.
    #[must_use]
    pub fn workers(&self) -> &Workers {
        &self.workers
    }

    /// Number of completed updates.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Runs all four phases.
    pub fn update(&mut self, data: &mut HierarchyData) -> HierarchyChanges {
        self.begin(data).harvest().assign().complete()
    }

    /// Runs all four phases, reporting to `tracer`.
    pub fn update_traced<'a>(
        &'a mut self,
        data: &'a mut HierarchyData,
        tracer: Tracer<'a>,
    ) -> HierarchyChanges {
        self.begin_traced(data, tracer).harvest().assign().complete()
    }

    /// Like [`update`](Self::update), but reuses a caller-provided buffer.
    pub fn update_into(&mut self, data: &mut HierarchyData, changes: &mut HierarchyChanges) {
        let mut update = self.begin(data);
        let frame_index = update.changes.frame_index;
        update.changes = core::mem::take(changes);
        update.changes.clear();
        update.changes.frame_index = frame_index;
        *changes = update.harvest().assign().complete();
    }

    /// Starts an update (phase 1).
    pub fn begin<'a>(&'a mut self, data: &'a mut HierarchyData) -> FrameUpdate<'a, Setup> {
        self.begin_traced(data, Tracer::none())
    }

    /// Starts an update reporting to `tracer` (phase 1).
    pub fn begin_traced<'a>(
        &'a mut self,
        data: &'a mut HierarchyData,
        mut tracer: Tracer<'a>,
    ) -> FrameUpdate<'a, Setup> {
        let frame_index = self.frame_index;
        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            element_count: count(data.len()),
            batch_root_count: count(data.batches.batch_root_count()),
        });
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Setup,
        });
        self.writes.clear();
        self.ordinals.clear();
        for &root in data.batches.batch_roots() {
            if data.contains(root) {
                let ordinal = count(self.ordinals.len());
                self.ordinals.insert(root, ordinal);
            }
        }
        let active = count(self.ordinals.len());
        let mut summary = FrameSummaryBuilder::new(frame_index);
        summary.phase_end(PhaseKind::Setup, active);
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Setup,
            items: active,
        });
        FrameUpdate {
            engine: self,
            data,
            tracer,
            summary,
            changes: HierarchyChanges {
                frame_index,
                ..HierarchyChanges::default()
            },
            _phase: PhantomData,
        }
    }
}

/// Phase marker: setup done, nothing harvested yet.
#[derive(Debug)]
pub enum Setup {}

/// Phase marker: dirty slots harvested.
#[derive(Debug)]
pub enum Harvested {}

/// Phase marker: annotations rewritten.
#[derive(Debug)]
pub enum Assigned {}

/// An update in progress, in phase `P`.
///
/// Holds exclusive borrows of the engine and the hierarchy until
/// [`complete`](FrameUpdate::complete).
#[derive(Debug)]
pub struct FrameUpdate<'a, P> {
    engine: &'a mut HierarchyEngine,
    data: &'a mut HierarchyData,
    tracer: Tracer<'a>,
    summary: FrameSummaryBuilder,
    changes: HierarchyChanges,
    _phase: PhantomData<P>,
}

impl<'a, P> FrameUpdate<'a, P> {
    fn advance<Q>(self) -> FrameUpdate<'a, Q> {
        FrameUpdate {
            engine: self.engine,
            data: self.data,
            tracer: self.tracer,
            summary: self.summary,
            changes: self.changes,
            _phase: PhantomData,
        }
    }

    fn begin_phase(&mut self, phase: PhaseKind) {
        self.tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.changes.frame_index,
            phase,
        });
    }

    fn end_phase(&mut self, phase: PhaseKind, items: u32) {
        self.summary.phase_end(phase, items);
        self.tracer.phase_end(&PhaseEndEvent {
            frame_index: self.changes.frame_index,
            phase,
            items,
        });
    }

    /// The hierarchy being updated.
    #[must_use]
    pub fn data(&self) -> &HierarchyData {
        self.data
    }
}

impl<'a> FrameUpdate<'a, Setup> {
    /// Returns `true` if the harvest will find any work.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.data.is_dirty()
    }

    /// The ordinal of `root` in this update's batch-root snapshot.
    #[must_use]
    pub fn root_ordinal(&self, root: ElementId) -> Option<u32> {
        self.engine.ordinals.get(&root).copied()
    }

    /// Phase 2: collects dirty roots and flattens their subtrees.
    pub fn harvest(mut self) -> FrameUpdate<'a, Harvested> {
        self.begin_phase(PhaseKind::Harvest);
        if self.data.is_dirty() {
            let engine = &*self.engine;
            let roots = &mut self.changes.dirty_roots;
            self.data.batches.populate_with_dirty_roots(roots);
            roots.retain(|id| engine.ordinals.contains_key(id));
            roots.sort_unstable_by_key(|id| engine.ordinals[id]);
            self.data
                .depth_sorted_hierarchy(&engine.workers, &roots[..], &mut self.changes.dirty_slots);
        }
        let roots = count(self.changes.dirty_roots.len());
        let slots = count(self.changes.dirty_slots.len());
        self.summary.harvested(roots, slots);
        self.tracer
            .dirty_roots(self.changes.frame_index, &self.changes.dirty_roots);
        tracing::debug!(
            frame = self.changes.frame_index,
            roots,
            slots,
            "harvested dirty batches"
        );
        self.end_phase(PhaseKind::Harvest, slots);
        self.advance()
    }
}

impl<'a> FrameUpdate<'a, Harvested> {
    /// Dirty roots found by the harvest.
    #[must_use]
    pub fn dirty_roots(&self) -> &[ElementId] {
        &self.changes.dirty_roots
    }

    /// Harvested slots, depth-first per root.
    #[must_use]
    pub fn dirty_slots(&self) -> &[u32] {
        &self.changes.dirty_slots
    }

    /// Phase 3: rewrites the batch annotations of every harvested slot.
    pub fn assign(mut self) -> FrameUpdate<'a, Assigned> {
        self.begin_phase(PhaseKind::Assign);

        let engine = &mut *self.engine;
        let store = &self.data.store;
        let batches = &self.data.batches;
        engine.writes.clear();
        engine.workers.flat_map(
            &self.changes.dirty_slots,
            |&slot, writes| classify(store, batches, slot, writes),
            &mut engine.writes,
        );

        let mut assigned = 0_u32;
        let mut detached = 0_u32;
        for &(slot, element) in &engine.writes {
            if element.batch_root.is_valid() {
                assigned += 1;
            } else {
                detached += 1;
            }
            self.data.batches.set_annotation(slot, element);
        }
        let writes = count(engine.writes.len());
        self.summary.assigned(assigned, detached);
        self.end_phase(PhaseKind::Assign, writes);
        self.advance()
    }
}

impl FrameUpdate<'_, Assigned> {
    /// Phase 4: clears dirty state and returns the changes.
    pub fn complete(mut self) -> HierarchyChanges {
        self.begin_phase(PhaseKind::Complete);
        let data = &mut *self.data;
        data.batches.populate_with_reordered(&mut self.changes.reordered);
        self.changes.reordered.retain(|&id| data.contains(id));
        data.batches.clear_dirty_state();
        self.changes.added.append(&mut data.pending_added);
        self.changes.removed.append(&mut data.pending_removed);

        self.summary.lifecycle(
            count(self.changes.added.len()),
            count(self.changes.removed.len()),
        );
        self.end_phase(PhaseKind::Complete, count(self.changes.reordered.len()));
        self.tracer.frame_summary(&self.summary.finish());
        self.engine.frame_index += 1;
        self.changes
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Computes the annotation writes owned by `slot`.
fn classify(
    store: &HierarchyStore,
    batches: &BatchGroupTracker,
    slot: u32,
    out: &mut Vec<(u32, BatchGroupElement)>,
) {
    let Some(element) = store.element(slot) else {
        return;
    };
    let is_root = batches.is_batch_root(element.id);
    if !element.parent.is_valid() && !is_root {
        // A detached virtual subtree top: nothing owns it.
        out.push((slot, BatchGroupElement::UNASSIGNED));
        return;
    }
    if element.children.is_empty() && !is_root {
        return;
    }

    let own = if is_root {
        let own = BatchGroupElement::assigned(element.id, 0);
        out.push((slot, own));
        own
    } else {
        resolve_upward(store, batches, slot)
    };
    let child = if own.batch_root.is_valid() {
        BatchGroupElement::assigned(own.batch_root, own.depth + u32::from(!store.is_virtual(slot)))
    } else {
        BatchGroupElement::UNASSIGNED
    };
    for &c in &element.children {
        if store.id_at(c).is_some_and(|id| !batches.is_batch_root(id)) {
            out.push((c, child));
        }
    }
}

/// Walks up from `slot` to the nearest batch root, counting non-virtual
/// ancestors.
fn resolve_upward(store: &HierarchyStore, batches: &BatchGroupTracker, slot: u32) -> BatchGroupElement {
    let mut depth = 0;
    for ancestor in store.ancestors(slot) {
        if !store.is_virtual(ancestor) {
            depth += 1;
        }
        if let Some(id) = store.id_at(ancestor).filter(|&id| batches.is_batch_root(id)) {
            return BatchGroupElement::assigned(id, depth);
        }
    }
    BatchGroupElement::UNASSIGNED
}
