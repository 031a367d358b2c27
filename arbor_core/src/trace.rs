// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for hierarchy updates.
//!
//! [`TraceSink`] has one method per event emitted while a
//! [`FrameUpdate`](crate::FrameUpdate) runs. Every method defaults to a
//! no-op, so a sink only implements what it cares about.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. With the `trace`
//! feature **off**, every `Tracer` method compiles to nothing. With it **on**,
//! each method is a single `Option` branch before dispatch.
//!
//! Events carry counts, not timestamps: the core crate has no clock. Sinks
//! that want wall-clock timing (such as `arbor_debug`'s recorder) stamp
//! events on arrival.

use crate::id::ElementId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of an update is being reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Reading the engine setup state.
    Setup,
    /// Collecting dirty roots and flattening their subtrees.
    Harvest,
    /// Rewriting batch annotations for the harvested slots.
    Assign,
    /// Clearing dirty state and publishing lifecycle lists.
    Complete,
}

impl PhaseKind {
    /// Every phase, in execution order.
    pub const ALL: [Self; 4] = [Self::Setup, Self::Harvest, Self::Assign, Self::Complete];

    /// A short lowercase label.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Harvest => "harvest",
            Self::Assign => "assign",
            Self::Complete => "complete",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Setup => 0,
            Self::Harvest => 1,
            Self::Assign => 2,
            Self::Complete => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an update starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameBeginEvent {
    /// Monotonic update counter.
    pub frame_index: u64,
    /// Live elements at the start of the update.
    pub element_count: u32,
    /// Active batch roots at the start of the update.
    pub batch_root_count: u32,
}

/// Marks the beginning of an update phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBeginEvent {
    /// Update counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of an update phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEndEvent {
    /// Update counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Items the phase processed: harvested slots for
    /// [`PhaseKind::Harvest`], annotation writes for [`PhaseKind::Assign`].
    pub items: u32,
}

/// Per-update summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// Update counter.
    pub frame_index: u64,
    /// Dirty batch roots processed.
    pub dirty_roots: u32,
    /// Slots in the harvested sequence.
    pub dirty_slots: u32,
    /// Annotations written with a valid batch root.
    pub assigned: u32,
    /// Annotations reset to unassigned.
    pub detached: u32,
    /// Elements added since the previous update.
    pub added: u32,
    /// Elements removed since the previous update.
    pub removed: u32,
    /// Per-phase item counts, indexed in [`PhaseKind::ALL`] order.
    pub phase_items: [u32; 4],
}

impl FrameSummary {
    /// Returns the item count recorded for `phase`.
    #[must_use]
    pub const fn items(&self, phase: PhaseKind) -> u32 {
        self.phase_items[phase.index()]
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from hierarchy updates.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an update starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of an update phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of an update phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called with the dirty roots harvested for this update, in batch-root
    /// set order.
    fn on_dirty_roots(&mut self, frame_index: u64, roots: &[ElementId]) {
        _ = (frame_index, roots);
    }

    /// Called with the per-update summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits the harvested dirty roots.
    #[inline]
    pub fn dirty_roots(&mut self, frame_index: u64, roots: &[ElementId]) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_dirty_roots(frame_index, roots);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (frame_index, roots);
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects per-phase counts during an update and produces a
/// [`FrameSummary`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameSummaryBuilder {
    summary: FrameSummary,
}

impl FrameSummaryBuilder {
    /// Starts a summary for `frame_index`.
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            summary: FrameSummary {
                frame_index,
                ..FrameSummary::default()
            },
        }
    }

    /// Records the item count of a finished phase.
    pub fn phase_end(&mut self, phase: PhaseKind, items: u32) {
        self.summary.phase_items[phase.index()] = items;
    }

    /// Records the harvest totals.
    pub fn harvested(&mut self, dirty_roots: u32, dirty_slots: u32) {
        self.summary.dirty_roots = dirty_roots;
        self.summary.dirty_slots = dirty_slots;
    }

    /// Records the annotation-write totals.
    pub fn assigned(&mut self, assigned: u32, detached: u32) {
        self.summary.assigned = assigned;
        self.summary.detached = detached;
    }

    /// Records the lifecycle totals.
    pub fn lifecycle(&mut self, added: u32, removed: u32) {
        self.summary.added = added;
        self.summary.removed = removed;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        self.summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
