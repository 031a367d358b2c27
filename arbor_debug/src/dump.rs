// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented hierarchy dumps.
//!
//! One line per element, children indented below their structural parent.
//! Each line shows the element id, its priority, flags, and its batch
//! annotation as of the last update:
//!
//! ```text
//! #1 p=0 [root] -> #1/0
//!   #10 p=0 [virtual proxy] -> #1/1
//!     #100 p=0 -> #1/1
//! ```

use std::io::{self, Write};

use arbor_core::{BatchState, ElementId, HierarchyData};

/// Writes every parentless element and its subtree to `writer`, in slot
/// order of the tops.
pub fn write_hierarchy(data: &HierarchyData, writer: &mut dyn Write) -> io::Result<()> {
    let tops: Vec<ElementId> = data
        .store()
        .identity()
        .iter()
        .map(|(_, id)| id)
        .filter(|&id| data.parent_id(id).is_none())
        .collect();
    for top in tops {
        write_subtree(data, top, writer)?;
    }
    Ok(())
}

/// Writes `root` and its subtree to `writer`.
pub fn write_subtree(data: &HierarchyData, root: ElementId, writer: &mut dyn Write) -> io::Result<()> {
    let mut stack = vec![(root, 0_usize)];
    while let Some((id, level)) = stack.pop() {
        write_line(data, id, level, writer)?;
        let children: Vec<ElementId> = data.children(id).collect();
        stack.extend(children.into_iter().rev().map(|c| (c, level + 1)));
    }
    Ok(())
}

/// Renders [`write_hierarchy`] into a string.
#[must_use]
pub fn hierarchy_to_string(data: &HierarchyData) -> String {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write_hierarchy(data, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}

fn write_line(
    data: &HierarchyData,
    id: ElementId,
    level: usize,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let mut flags = Vec::new();
    if data.is_batch_root(id) {
        flags.push("root");
    }
    if data.is_virtual(id) {
        flags.push("virtual");
    }
    if data.proxy_owner(id).is_some() {
        flags.push("proxy");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(" "))
    };
    let state = match data.batch_state(id) {
        Some(BatchState::Assigned { root, depth }) => format!("{root}/{depth}"),
        _ => "unassigned".to_owned(),
    };
    writeln!(
        writer,
        "{:indent$}{id} p={}{flags} -> {state}",
        "",
        data.priority(id).unwrap_or_default(),
        indent = level * 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::HierarchyEngine;
    use arbor_core::config::EngineConfig;

    #[test]
    fn dump_indents_children_under_proxies() {
        let mut data = HierarchyData::new();
        data.add(ElementId(1), ElementId::INVALID, 0, false).unwrap();
        data.add(ElementId(100), ElementId(1), 0, false).unwrap();
        data.add(ElementId(10), ElementId::INVALID, 0, true).unwrap();
        data.add_virtual_proxy_to_parent(ElementId(10), ElementId(1), 0, false)
            .unwrap();
        HierarchyEngine::new(EngineConfig::sequential()).update(&mut data);

        let dump = hierarchy_to_string(&data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(
            lines,
            [
                "#1 p=0 [root] -> #1/0",
                "  #10 p=0 [virtual proxy] -> #1/1",
                "    #100 p=0 -> #1/1",
            ]
        );
    }

    #[test]
    fn detached_virtual_elements_are_listed_unassigned() {
        let mut data = HierarchyData::new();
        data.add(ElementId(3), ElementId::INVALID, 0, true).unwrap();
        let dump = hierarchy_to_string(&data);
        assert_eq!(dump, "#3 p=0 [virtual] -> unassigned\n");
    }
}
