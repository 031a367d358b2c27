// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for arbor
//! diagnostics.
//!
//! This crate provides [`TraceSink`](arbor_core::trace::TraceSink)
//! implementations and inspection helpers for development:
//!
//! - [`pretty::PrettyPrintSink`]: one line per update event.
//! - [`recorder::RecorderSink`]: compact binary recording, read back with
//!   [`recorder::decode`].
//! - [`chrome::export`]: Chrome Trace Event Format JSON from recorded bytes.
//! - [`dump::write_hierarchy`]: an indented tree with batch annotations.

pub mod chrome;
pub mod dump;
pub mod pretty;
pub mod recorder;
