// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tuning knobs for the hierarchy and the update engine.

/// Configuration for [`HierarchyData`](crate::HierarchyData).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// Number of elements to reserve storage for up front.
    pub initial_capacity: usize,
    /// Maximum number of idle child lists kept in the pool.
    pub retained_child_lists: usize,
    /// Children-per-proxy used by
    /// [`add_default_virtual_proxy`](crate::HierarchyData::add_default_virtual_proxy).
    pub default_children_per_proxy: u32,
}

impl HierarchyConfig {
    /// Defaults suited to a small UI tree.
    #[must_use]
    pub const fn small() -> Self {
        Self {
            initial_capacity: 64,
            retained_child_lists: 64,
            default_children_per_proxy: 16,
        }
    }

    /// Defaults suited to large virtualized views.
    #[must_use]
    pub const fn large() -> Self {
        Self {
            initial_capacity: 4096,
            retained_child_lists: 1024,
            default_children_per_proxy: 64,
        }
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self::small()
    }
}

/// Configuration for [`HierarchyEngine`](crate::HierarchyEngine) and its
/// [`Workers`](crate::jobs::Workers).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on worker threads. `0` lets the pool pick one per core.
    ///
    /// Ignored unless the `parallel` feature is enabled.
    pub worker_threads: usize,
    /// Inputs shorter than this run on the calling thread.
    pub min_parallel_len: usize,
}

impl EngineConfig {
    /// Runs every pass on the calling thread.
    #[must_use]
    pub const fn sequential() -> Self {
        Self {
            worker_threads: 1,
            min_parallel_len: usize::MAX,
        }
    }

    /// A bounded pool of `worker_threads` workers.
    #[must_use]
    pub const fn bounded(worker_threads: usize) -> Self {
        Self {
            worker_threads,
            min_parallel_len: 256,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::bounded(4)
    }
}
