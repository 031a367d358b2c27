// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded-worker parallel-for over contiguous ranges.
//!
//! With the `parallel` feature, [`Workers`] owns a rayon thread pool capped
//! at [`EngineConfig::worker_threads`] threads and splits each input slice
//! into one contiguous chunk per worker. Without the feature, or for inputs
//! shorter than [`EngineConfig::min_parallel_len`], work runs on the calling
//! thread. Output order never depends on scheduling: per-chunk results are
//! concatenated in input order.

use alloc::vec::Vec;

use crate::config::EngineConfig;

/// A bounded set of workers for the engine's read-only passes.
pub struct Workers {
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
    min_parallel_len: usize,
}

impl core::fmt::Debug for Workers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Workers")
            .field("threads", &self.thread_count())
            .field("min_parallel_len", &self.min_parallel_len)
            .finish()
    }
}

impl Default for Workers {
    fn default() -> Self {
        Self::sequential()
    }
}

impl Workers {
    /// Creates workers per `config`.
    ///
    /// If the thread pool cannot be built, the failure is logged and the
    /// workers fall back to running on the calling thread.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        #[cfg(feature = "parallel")]
        {
            let pool = if config.worker_threads == 1 {
                None
            } else {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.worker_threads)
                    .thread_name(|i| std::format!("arbor-worker-{i}"))
                    .build()
                    .inspect_err(|err| {
                        tracing::warn!(error = %err, "worker pool unavailable, running sequentially");
                    })
                    .ok()
            };
            Self {
                pool,
                min_parallel_len: config.min_parallel_len,
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            Self {
                min_parallel_len: config.min_parallel_len,
            }
        }
    }

    /// Workers that always run on the calling thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self::new(&EngineConfig::sequential())
    }

    /// Number of threads work may be spread across.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            return pool.current_num_threads();
        }
        1
    }

    /// Returns `true` if inputs of length `len` would be split across
    /// threads.
    #[must_use]
    pub fn splits(&self, len: usize) -> bool {
        self.thread_count() > 1 && len >= self.min_parallel_len
    }

    /// Runs `f` for every item, appending each item's outputs to `out` in
    /// input order.
    ///
    /// `f` only gets shared access to its captures, so it may run on several
    /// threads at once.
    pub fn flat_map<I, O, F>(&self, items: &[I], f: F, out: &mut Vec<O>)
    where
        I: Sync,
        O: Send,
        F: Fn(&I, &mut Vec<O>) + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if let Some(pool) = self.pool.as_ref().filter(|_| self.splits(items.len())) {
            use rayon::prelude::*;

            let chunk = items.len().div_ceil(pool.current_num_threads()).max(1);
            let parts: Vec<Vec<O>> = pool.install(|| {
                items
                    .par_chunks(chunk)
                    .map(|range| {
                        let mut local = Vec::new();
                        for item in range {
                            f(item, &mut local);
                        }
                        local
                    })
                    .collect()
            });
            for part in parts {
                out.extend(part);
            }
            return;
        }

        for item in items {
            f(item, out);
        }
    }
}
