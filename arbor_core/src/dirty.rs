// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Arbor keeps its per-frame invalidation sets in an
//! [`understory_dirty::DirtySet`] keyed by [`ElementId`](crate::ElementId).
//! Each channel is an independent category:
//!
//! - [`BATCH`]: batch roots whose subtree must be re-harvested and
//!   reclassified on the next update. Entries are filtered against the active
//!   batch-root set before use, so a root removed after being dirtied is never
//!   surfaced.
//! - [`ORDER`]: parents whose child order changed (reorders, proxy
//!   redistribution). Surfaced as
//!   [`HierarchyChanges::reordered`](crate::HierarchyChanges::reordered).
//!
//! Both channels are cleared by
//! [`BatchGroupTracker::clear_dirty_state`](crate::BatchGroupTracker::clear_dirty_state).

use understory_dirty::Channel;

/// A batch root's subtree needs reclassification.
pub const BATCH: Channel = Channel::new(0);

/// A parent's child order changed.
pub const ORDER: Channel = Channel::new(1);
