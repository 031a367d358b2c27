// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bidirectional element id ↔ dense slot mapping.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::id::ElementId;

/// Result of [`IdentityMap::remove_at_swap_back`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapRemoval {
    /// The id that was removed.
    pub removed: ElementId,
    /// The id that was moved into the vacated slot, and the slot it came
    /// from. `None` when the removed slot was the last one.
    pub moved: Option<(ElementId, u32)>,
}

/// Maps stable [`ElementId`]s to dense slot indices and back.
///
/// Slots are always dense: `0..len()`. Removing a slot moves the last id into
/// it, so callers holding slot indices must patch them using the returned
/// [`SwapRemoval`].
#[derive(Clone, Debug, Default)]
pub struct IdentityMap {
    id_to_slot: HashMap<ElementId, u32>,
    slot_to_id: Vec<ElementId>,
}

impl IdentityMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` ids.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_slot: HashMap::with_capacity(capacity),
            slot_to_id: Vec::with_capacity(capacity),
        }
    }

    /// Number of mapped ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slot_to_id.len()
    }

    /// Returns `true` if no ids are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot_to_id.is_empty()
    }

    /// Maps `id` to `slot`.
    ///
    /// `slot` must be the next dense slot (`len()`). Returns `false` and
    /// changes nothing if `id` is already mapped or `slot` is not dense.
    pub fn add(&mut self, id: ElementId, slot: u32) -> bool {
        if slot as usize != self.slot_to_id.len() || self.id_to_slot.contains_key(&id) {
            return false;
        }
        self.id_to_slot.insert(id, slot);
        self.slot_to_id.push(id);
        true
    }

    /// Returns the slot currently holding `id`.
    #[inline]
    #[must_use]
    pub fn try_get_index(&self, id: ElementId) -> Option<u32> {
        self.id_to_slot.get(&id).copied()
    }

    /// Returns the id stored at `slot`.
    #[inline]
    #[must_use]
    pub fn id_at(&self, slot: u32) -> Option<ElementId> {
        self.slot_to_id.get(slot as usize).copied()
    }

    /// Returns `true` if `id` is mapped.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.id_to_slot.contains_key(&id)
    }

    /// Iterates `(slot, id)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, ElementId)> + '_ {
        (0_u32..).zip(self.slot_to_id.iter().copied())
    }

    /// Removes the id at `slot`, moving the last id into its place.
    ///
    /// Both the removed id and the moved id have their mappings updated.
    pub fn remove_at_swap_back(&mut self, slot: u32) -> Option<SwapRemoval> {
        let idx = slot as usize;
        if idx >= self.slot_to_id.len() {
            return None;
        }
        let last = self.slot_to_id.len() - 1;
        let removed = self.slot_to_id.swap_remove(idx);
        self.id_to_slot.remove(&removed);

        let moved = if idx == last {
            None
        } else {
            let moved_id = self.slot_to_id[idx];
            self.id_to_slot.insert(moved_id, slot);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "slot indices are u32 by construction"
            )]
            let old_slot = last as u32;
            Some((moved_id, old_slot))
        };
        Some(SwapRemoval { removed, moved })
    }

    /// Removes every mapping.
    pub fn clear(&mut self) {
        self.id_to_slot.clear();
        self.slot_to_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_lookup_both_ways() {
        let mut map = IdentityMap::new();
        assert!(map.add(ElementId(10), 0));
        assert!(map.add(ElementId(20), 1));
        assert_eq!(map.try_get_index(ElementId(20)), Some(1));
        assert_eq!(map.id_at(0), Some(ElementId(10)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn duplicate_add_is_a_noop() {
        let mut map = IdentityMap::new();
        assert!(map.add(ElementId(1), 0));
        assert!(!map.add(ElementId(1), 1), "duplicate id must be rejected");
        assert!(!map.add(ElementId(2), 5), "non-dense slot must be rejected");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn swap_back_updates_moved_id() {
        let mut map = IdentityMap::new();
        for (slot, id) in [1, 2, 3].into_iter().enumerate() {
            map.add(ElementId(id), slot as u32);
        }

        let removal = map.remove_at_swap_back(0).unwrap();
        assert_eq!(removal.removed, ElementId(1));
        assert_eq!(removal.moved, Some((ElementId(3), 2)));
        assert_eq!(map.try_get_index(ElementId(3)), Some(0));
        assert_eq!(map.try_get_index(ElementId(1)), None);
        assert_eq!(map.id_at(0), Some(ElementId(3)));
    }

    #[test]
    fn removing_last_slot_moves_nothing() {
        let mut map = IdentityMap::new();
        map.add(ElementId(1), 0);
        map.add(ElementId(2), 1);

        let removal = map.remove_at_swap_back(1).unwrap();
        assert_eq!(removal.moved, None);
        assert_eq!(map.len(), 1);
        assert!(map.remove_at_swap_back(4).is_none());
    }
}
