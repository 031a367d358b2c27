// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Free-list pool for child lists and scratch buffers.

use alloc::vec::Vec;

/// A free list of cleared `Vec<T>` buffers.
///
/// Buffers taken from the pool are owned by the caller until they are handed
/// back with [`give`](Self::give). Returned buffers keep their capacity, up to
/// [`retain`](Self::retain) of them are kept; the rest are dropped.
#[derive(Debug)]
pub struct ListPool<T> {
    free: Vec<Vec<T>>,
    retain: usize,
}

impl<T> Default for ListPool<T> {
    fn default() -> Self {
        Self::new(64)
    }
}

impl<T> ListPool<T> {
    /// Creates a pool that keeps at most `retain` idle buffers.
    #[must_use]
    pub const fn new(retain: usize) -> Self {
        Self {
            free: Vec::new(),
            retain,
        }
    }

    /// Maximum number of idle buffers kept.
    #[must_use]
    pub const fn retain(&self) -> usize {
        self.retain
    }

    /// Number of idle buffers currently pooled.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    /// Takes an empty buffer, reusing a pooled allocation when available.
    #[must_use]
    pub fn take(&mut self) -> Vec<T> {
        self.free.pop().unwrap_or_default()
    }

    /// Returns a buffer to the pool.
    pub fn give(&mut self, mut list: Vec<T>) {
        if self.free.len() < self.retain && list.capacity() > 0 {
            list.clear();
            self.free.push(list);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn returned_buffers_are_reused_empty() {
        let mut pool = ListPool::<u32>::new(4);
        let list = vec![1, 2, 3];
        let cap = list.capacity();
        pool.give(list);
        assert_eq!(pool.idle(), 1);

        let reused = pool.take();
        assert!(reused.is_empty());
        assert_eq!(reused.capacity(), cap);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn retain_bounds_idle_buffers() {
        let mut pool = ListPool::<u32>::new(1);
        pool.give(vec![1]);
        pool.give(vec![2]);
        assert_eq!(pool.idle(), 1, "second buffer exceeds retain and is dropped");
    }
}
