// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use arbor_core::ElementId;
use arbor_core::trace::{
    FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
};

/// Dirty root lists longer than this are truncated in the output.
const MAX_LISTED_ROOTS: usize = 8;

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn phase_label(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Setup => "setup",
        PhaseKind::Harvest => "harvest",
        PhaseKind::Assign => "assign",
        PhaseKind::Complete => "done",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] {} elements={} roots={}",
            e.frame_index, e.element_count, e.batch_root_count,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame_index,
            phase_label(e.phase),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} items={}",
            e.frame_index,
            phase_label(e.phase),
            e.items,
        );
    }

    fn on_dirty_roots(&mut self, frame_index: u64, roots: &[ElementId]) {
        let listed: Vec<String> = roots
            .iter()
            .take(MAX_LISTED_ROOTS)
            .map(ToString::to_string)
            .collect();
        let more = roots.len().saturating_sub(MAX_LISTED_ROOTS);
        let suffix = if more > 0 {
            format!(" (+{more} more)")
        } else {
            String::new()
        };
        let _ = writeln!(
            self.writer,
            "[dirty] frame={frame_index} roots=[{}]{suffix}",
            listed.join(", "),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} roots={} slots={} assigned={} detached={} \
             added={} removed={}",
            s.frame_index, s.dirty_roots, s.dirty_slots, s.assigned, s.detached, s.added, s.removed,
        );
    }
}
