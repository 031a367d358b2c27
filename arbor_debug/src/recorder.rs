// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records, each stamped with the nanoseconds
//! elapsed since the recorder was created. [`decode`] reads them back as an
//! iterator of [`Recorded`] events.

use std::time::Instant;

use arbor_core::ElementId;
use arbor_core::trace::{
    FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_DIRTY_ROOTS: u8 = 4;
const TAG_FRAME_SUMMARY: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    origin: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            origin: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    /// Writes the tag and the elapsed time.
    fn begin_record(&mut self, tag: u8) {
        let elapsed = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.write_u8(tag);
        self.write_u64(elapsed);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Setup => 0,
            PhaseKind::Harvest => 1,
            PhaseKind::Assign => 2,
            PhaseKind::Complete => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.begin_record(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u32(e.element_count);
        self.write_u32(e.batch_root_count);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.begin_record(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.begin_record(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u32(e.items);
    }

    fn on_dirty_roots(&mut self, frame_index: u64, roots: &[ElementId]) {
        self.begin_record(TAG_DIRTY_ROOTS);
        self.write_u64(frame_index);
        let count = u32::try_from(roots.len()).unwrap_or(u32::MAX);
        self.write_u32(count);
        for root in roots.iter().take(count as usize) {
            self.write_u32(root.0);
        }
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.begin_record(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        for v in [
            s.dirty_roots,
            s.dirty_slots,
            s.assigned,
            s.detached,
            s.added,
            s.removed,
        ] {
            self.write_u32(v);
        }
        for v in s.phase_items {
            self.write_u32(v);
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// The dirty roots harvested in a frame.
    DirtyRoots {
        /// Frame counter.
        frame_index: u64,
        /// Harvested roots, in processing order.
        roots: Vec<ElementId>,
    },
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// A decoded event with its recording time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded {
    /// Nanoseconds since the recorder was created.
    pub at_nanos: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Recorded`] events.
///
/// Decoding stops at the first truncated or unknown record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            element_count: self.read_u32()?,
            batch_root_count: self.read_u32()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            items: self.read_u32()?,
        }))
    }

    fn decode_dirty_roots(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let count = self.read_u32()?;
        let roots = (0..count)
            .map(|_| self.read_u32().map(ElementId))
            .collect::<Option<Vec<_>>>()?;
        Some(RecordedEvent::DirtyRoots { frame_index, roots })
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let mut counts = [0_u32; 6];
        for c in &mut counts {
            *c = self.read_u32()?;
        }
        let mut phase_items = [0_u32; 4];
        for c in &mut phase_items {
            *c = self.read_u32()?;
        }
        let [dirty_roots, dirty_slots, assigned, detached, added, removed] = counts;
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index,
            dirty_roots,
            dirty_slots,
            assigned,
            detached,
            added,
            removed,
            phase_items,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Recorded;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_nanos = self.read_u64()?;
        let event = match tag {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_DIRTY_ROOTS => self.decode_dirty_roots(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None,
        };
        match event {
            Some(event) => Some(Recorded { at_nanos, event }),
            None => {
                self.pos = self.data.len();
                None
            }
        }
    }
}
