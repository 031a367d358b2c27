// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element identity types.

use core::fmt;

/// Sentinel value indicating "no slot" in slot index fields.
pub const INVALID_SLOT: u32 = u32::MAX;

/// A stable handle to an element registered with a
/// [`HierarchyData`](crate::HierarchyData).
///
/// Ids are chosen by the owning framework and must be unique for as long as
/// they are registered. Unlike slot indices, an id never changes when other
/// elements are removed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ElementId(pub u32);

impl ElementId {
    /// The "no element" sentinel.
    pub const INVALID: Self = Self(0);

    /// Returns `true` unless this is [`ElementId::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Converts the sentinel into `None`.
    #[inline]
    #[must_use]
    pub const fn valid(self) -> Option<Self> {
        if self.is_valid() { Some(self) } else { None }
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ElementId({})", self.0)
        } else {
            f.write_str("ElementId(INVALID)")
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_not_valid() {
        assert!(!ElementId::INVALID.is_valid());
        assert_eq!(ElementId::INVALID.valid(), None);
        assert_eq!(ElementId(7).valid(), Some(ElementId(7)));
    }
}
