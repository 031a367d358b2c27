// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental element hierarchy with batched dirty propagation.
//!
//! `arbor_core` keeps a tree of framework elements in dense, swap-back
//! storage and groups them into *batches*: each element is annotated with
//! the batch root that owns it and its depth below that root. Mutations only
//! mark batches dirty; a [`HierarchyEngine`] update later re-walks the dirty
//! batches and rewrites their annotations. The crate is `no_std` compatible
//! (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   HierarchyData::add / set_parent / update_child_order / proxies …
//!       │  (marks batches dirty)
//!       ▼
//!   BatchGroupTracker ── dirty roots ──► HierarchyEngine::update()
//!                                            │ Setup → Harvest → Assign → Complete
//!                                            ▼
//!                                      HierarchyChanges
//! ```
//!
//! **[`HierarchyData`]**: the mutation and query façade. It owns the
//! [`HierarchyStore`] (elements, priorities, virtual flags, and the
//! [`IdentityMap`] between stable [`ElementId`]s and dense slots), the
//! [`ProxyTable`], and the [`BatchGroupTracker`].
//!
//! **Virtual proxies**: a parent may spread its children across virtual
//! proxy elements in contiguous runs; see [`ProxyContainer`] and
//! [`run_lengths`].
//!
//! **[`HierarchyEngine`]**: the four-phase update, with the phases exposed
//! as [`FrameUpdate`] typestates. Read-only passes run on bounded
//! [`jobs::Workers`].
//!
//! **[`dirty`]**: the `understory_dirty` channels used for batch and
//! child-order invalidation.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) events for each update
//! phase, behind a zero-overhead [`Tracer`](trace::Tracer).
//!
//! **[`config`]**: [`HierarchyConfig`](config::HierarchyConfig) and
//! [`EngineConfig`](config::EngineConfig).
//!
//! # Logging
//!
//! Rejected mutations are logged at `warn` through `tracing`, invariant
//! violations at `error`. Per-element activity is logged at `trace`.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `parallel` (disabled by default, implies `std`): Runs the harvest and
//!   assign phases on a bounded rayon thread pool.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod dirty;
pub mod jobs;
pub mod trace;

mod batch;
mod data;
mod engine;
mod error;
mod id;
mod identity;
mod pool;
mod proxy;
mod store;

pub use batch::{BatchGroupElement, BatchGroupTracker, BatchState, Dependency};
pub use data::HierarchyData;
pub use engine::{Assigned, FrameUpdate, Harvested, HierarchyChanges, HierarchyEngine, Setup};
pub use error::HierarchyError;
pub use id::{ElementId, INVALID_SLOT};
pub use identity::{IdentityMap, SwapRemoval};
pub use pool::ListPool;
pub use proxy::{ProxyContainer, ProxyTable, run_lengths};
pub use store::{Ancestors, HierarchyElement, HierarchyStore};
