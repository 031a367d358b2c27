// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated widget-tree churn that exercises the tracing and diagnostics
//! pipeline.
//!
//! Builds a list view whose rows are spread over virtual proxies, then runs
//! a series of updates that add, move, reorder, and remove rows. Events go to
//! both a [`PrettyPrintSink`](arbor_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](arbor_debug::recorder::RecorderSink); the recording is
//! exported as a Chrome trace JSON file at the end.
//!
//! Set `RUST_LOG=arbor_core=debug` to see the engine's own log output.

use std::fs::File;
use std::io::BufWriter;

use arbor_core::config::{EngineConfig, HierarchyConfig};
use arbor_core::trace::{
    FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, TraceSink, Tracer,
};
use arbor_core::{ElementId, HierarchyData, HierarchyEngine};
use arbor_debug::pretty::PrettyPrintSink;
use arbor_debug::recorder::RecorderSink;
use tracing_subscriber::EnvFilter;

const FRAME_COUNT: u32 = 12;
const ROWS: u32 = 40;
const PROXIES: u32 = 4;

const WINDOW: ElementId = ElementId(1);
const LIST: ElementId = ElementId(2);
const POPUP: ElementId = ElementId(3);

fn row(n: u32) -> ElementId {
    ElementId(1_000 + n)
}

fn proxy(n: u32) -> ElementId {
    ElementId(100 + n)
}

/// Forwards every event to two sinks.
struct Tee<'a> {
    pretty: &'a mut PrettyPrintSink,
    recorder: &'a mut RecorderSink,
}

impl TraceSink for Tee<'_> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.pretty.on_frame_begin(e);
        self.recorder.on_frame_begin(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.pretty.on_phase_begin(e);
        self.recorder.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.pretty.on_phase_end(e);
        self.recorder.on_phase_end(e);
    }

    fn on_dirty_roots(&mut self, frame_index: u64, roots: &[ElementId]) {
        self.pretty.on_dirty_roots(frame_index, roots);
        self.recorder.on_dirty_roots(frame_index, roots);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.pretty.on_frame_summary(s);
        self.recorder.on_frame_summary(s);
    }
}

fn build(data: &mut HierarchyData) {
    data.add(WINDOW, ElementId::INVALID, 0, false)
        .expect("window");
    data.add(LIST, WINDOW, 0, false).expect("list");
    data.mark_batch_root(LIST, true).expect("list root");
    for n in 0..ROWS {
        let priority = i32::try_from(n).expect("row priority");
        data.add(row(n), LIST, priority, false).expect("row");
    }
    for n in 0..PROXIES {
        data.add(proxy(n), ElementId::INVALID, 0, true)
            .expect("proxy");
        data.add_virtual_proxy_to_parent(proxy(n), LIST, 0, false)
            .expect("attach proxy");
    }
    data.add(POPUP, WINDOW, 1, false).expect("popup");
}

/// One frame's worth of mutations.
fn churn(data: &mut HierarchyData, frame: u32) {
    match frame % 4 {
        0 => {
            let id = row(ROWS + frame);
            let _ = data.add(id, LIST, -1, false);
        }
        1 => {
            let _ = data.set_parent(row(frame), POPUP, 0);
        }
        2 => {
            let _ = data.set_as_last_sibling(row(frame + 1));
        }
        _ => {
            let _ = data.remove(row(frame + 2));
            let _ = data.update_virtual_proxy_index(proxy(PROXIES - 1), 0);
        }
    }
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- hierarchy ---------------------------------------------------------
    let mut data = HierarchyData::with_config(HierarchyConfig::small());
    let mut engine = HierarchyEngine::new(EngineConfig::bounded(2));
    build(&mut data);

    // -- simulated loop ----------------------------------------------------
    for frame in 0..FRAME_COUNT {
        if frame > 0 {
            churn(&mut data, frame);
        }
        let mut tee = Tee {
            pretty: &mut pretty,
            recorder: &mut recorder,
        };
        let changes = engine.update_traced(&mut data, Tracer::new(&mut tee));
        tracing::info!(
            frame = changes.frame_index,
            roots = changes.dirty_roots.len(),
            slots = changes.dirty_slots.len(),
            reordered = changes.reordered.len(),
            "update finished"
        );
    }

    println!("{}", arbor_debug::dump::hierarchy_to_string(&data));

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    arbor_debug::chrome::export(recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({FRAME_COUNT} frames)");
}
