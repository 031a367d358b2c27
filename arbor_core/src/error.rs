// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the mutation API.
//!
//! Every variant describes caller misuse. The failing operation is aborted
//! and the hierarchy is left as it was; the engine keeps running.

use crate::id::ElementId;

/// Misuse of the hierarchy mutation API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    /// [`ElementId::INVALID`] was passed where a real id is required.
    #[error("the invalid element id cannot be registered or referenced")]
    InvalidId,
    /// The id is not registered.
    #[error("element {0} is not registered")]
    UnknownElement(ElementId),
    /// The id is already registered.
    #[error("element {0} is already registered")]
    DuplicateElement(ElementId),
    /// Reparenting would make an element its own ancestor.
    #[error("parenting {child} under {parent} would create a cycle")]
    CycleDetected {
        /// The element being moved.
        child: ElementId,
        /// The requested parent.
        parent: ElementId,
    },
    /// A bulk reorder did not list every tracked child.
    #[error("child order for {parent} lists {actual} children but {expected} are tracked")]
    ChildCountMismatch {
        /// The parent being reordered.
        parent: ElementId,
        /// Number of children currently tracked.
        expected: usize,
        /// Number of ids supplied.
        actual: usize,
    },
    /// A bulk reorder supplied a different number of priorities than ids.
    #[error("{ids} ids were supplied with {priorities} priorities")]
    PriorityCountMismatch {
        /// Number of ids supplied.
        ids: usize,
        /// Number of priorities supplied.
        priorities: usize,
    },
    /// The element is not a child of the given parent.
    #[error("{child} is not a child of {parent}")]
    NotAChild {
        /// The expected parent.
        parent: ElementId,
        /// The element that was not found.
        child: ElementId,
    },
    /// A proxy operation was given an element registered as non-virtual.
    #[error("element {0} is not virtual and cannot act as a proxy")]
    NotVirtual(ElementId),
    /// The element is not attached as a proxy to any parent.
    #[error("element {0} is not an attached virtual proxy")]
    NotAProxy(ElementId),
    /// The proxy is already attached to a parent.
    #[error("proxy {proxy} is already attached to {parent}")]
    ProxyAlreadyAttached {
        /// The proxy being attached.
        proxy: ElementId,
        /// The parent it is already attached to.
        parent: ElementId,
    },
    /// Proxies cannot be stacked: the parent is itself an attached proxy, or
    /// the proxy has proxies of its own.
    #[error("proxy {proxy} cannot be nested under {parent}")]
    NestedProxy {
        /// The proxy being attached.
        proxy: ElementId,
        /// The requested parent.
        parent: ElementId,
    },
}

/// Logs a misuse error at the call site and passes it through.
///
/// Mutation methods end with `.map_err(logged("op"))` style calls so that
/// every rejected operation leaves a trace even if the caller drops the
/// `Result`.
pub(crate) fn logged(op: &'static str) -> impl Fn(HierarchyError) -> HierarchyError {
    move |err| {
        tracing::warn!(op, error = %err, "hierarchy operation rejected");
        err
    }
}
