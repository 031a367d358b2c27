// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end hierarchy scenarios through the public API.

use arbor_core::config::{EngineConfig, HierarchyConfig};
use arbor_core::{BatchState, ElementId, HierarchyData, HierarchyEngine, HierarchyError};

const NONE: ElementId = ElementId::INVALID;

fn id(n: u32) -> ElementId {
    ElementId(n)
}

fn engine() -> HierarchyEngine {
    HierarchyEngine::new(EngineConfig::sequential())
}

fn state(data: &HierarchyData, n: u32) -> (ElementId, u32) {
    match data.batch_state(id(n)) {
        Some(BatchState::Assigned { root, depth }) => (root, depth),
        other => panic!("element {n} not assigned: {other:?}"),
    }
}

/// A parent with `count` children `100..`, priorities in order.
fn wide_parent(count: u32) -> HierarchyData {
    let mut data = HierarchyData::new();
    data.add(id(1), NONE, 0, false).unwrap();
    for n in 0..count {
        data.add(id(100 + n), id(1), n as i32, false).unwrap();
    }
    data
}

fn proxy(data: &mut HierarchyData, n: u32) {
    data.add(id(n), NONE, 0, true).unwrap();
}

#[test]
fn siblings_follow_priority() {
    let mut data = HierarchyData::new();
    data.add(id(1), NONE, 0, false).unwrap();
    data.add(id(2), id(1), 0, false).unwrap();
    data.add(id(3), id(1), 1, false).unwrap();

    assert_eq!(data.child_count(id(1)), Some(2));
    assert_eq!(data.sibling_index(id(3)), Some(1));
    assert_eq!(data.parent_id(id(2)), Some(id(1)));
}

#[test]
fn two_proxies_split_five_children() {
    let mut data = wide_parent(5);
    proxy(&mut data, 10);
    proxy(&mut data, 11);
    data.add_virtual_proxy_to_parent(id(10), id(1), 2, false)
        .unwrap();
    data.add_virtual_proxy_to_parent(id(11), id(1), 2, false)
        .unwrap();

    assert_eq!(data.child_count(id(1)), Some(2));
    assert_eq!(data.child_count(id(10)), Some(3));
    assert_eq!(data.child_count(id(11)), Some(2));
    assert_eq!(
        data.effective_children(id(1)),
        (100..105).map(id).collect::<Vec<_>>()
    );
    assert_eq!(data.real_parent_id(id(104)), Some(id(1)));
    assert_eq!(data.parent_id(id(104)), Some(id(11)));
}

#[test]
fn large_desired_run_fills_leading_proxies() {
    let mut data = wide_parent(5);
    proxy(&mut data, 10);
    proxy(&mut data, 11);
    data.add_virtual_proxy_to_parent(id(10), id(1), 4, false)
        .unwrap();
    data.add_virtual_proxy_to_parent(id(11), id(1), 4, false)
        .unwrap();

    assert_eq!(data.child_count(id(10)), Some(4));
    assert_eq!(data.child_count(id(11)), Some(1));

    data.adjust_child_proxy_distribution(id(1), 0).unwrap();
    assert_eq!(data.child_count(id(10)), Some(3));
    assert_eq!(data.child_count(id(11)), Some(2));
}

#[test]
fn proxies_do_not_add_depth() {
    let mut data = wide_parent(3);
    proxy(&mut data, 10);
    data.add_virtual_proxy_to_parent(id(10), id(1), 0, false)
        .unwrap();
    engine().update(&mut data);

    assert_eq!(state(&data, 10), (id(1), 1));
    for n in 100..103 {
        assert_eq!(state(&data, n), (id(1), 1));
    }
}

#[test]
fn dirty_grandchild_harvests_its_whole_batch() {
    // 1 -> 2 -> 3 -> 4
    let mut data = HierarchyData::new();
    data.add(id(1), NONE, 0, false).unwrap();
    data.add(id(2), id(1), 0, false).unwrap();
    data.add(id(3), id(2), 0, false).unwrap();
    data.add(id(4), id(3), 0, false).unwrap();
    let mut engine = engine();
    engine.update(&mut data);
    assert!(!data.is_dirty(), "first update settles everything");

    data.mark_dirty(id(3)).unwrap();
    let harvested = engine.begin(&mut data).harvest();
    assert_eq!(harvested.dirty_roots(), &[id(1)]);
    let slots = harvested.dirty_slots().to_vec();
    let changes = harvested.assign().complete();

    let store = data.store();
    let ids: Vec<_> = slots.iter().filter_map(|&s| store.id_at(s)).collect();
    assert_eq!(ids, [id(1), id(2), id(3), id(4)]);
    assert_eq!(changes.dirty_ids(&data).count(), 4);
    assert_eq!(state(&data, 3), (id(1), 2));
    assert_eq!(state(&data, 4), (id(1), 3));
}

#[test]
fn removing_the_last_proxy_returns_children() {
    let mut data = wide_parent(4);
    proxy(&mut data, 10);
    data.add_virtual_proxy_to_parent(id(10), id(1), 0, false)
        .unwrap();
    assert_eq!(data.parent_id(id(100)), Some(id(10)));

    data.remove_virtual_proxy_from_parent(id(10)).unwrap();
    assert_eq!(data.child_count(id(1)), Some(4));
    assert_eq!(data.parent_id(id(100)), Some(id(1)));
    assert_eq!(data.proxy_container(id(1)), None);
    assert_eq!(data.parent_id(id(10)), None);
    assert_eq!(data.child_count(id(10)), Some(0));

    engine().update(&mut data);
    assert_eq!(data.batch_state(id(10)), Some(BatchState::Unassigned));
    assert_eq!(state(&data, 103), (id(1), 1));
}

#[test]
fn removing_one_of_two_proxies_redistributes() {
    let mut data = wide_parent(4);
    proxy(&mut data, 10);
    proxy(&mut data, 11);
    data.add_virtual_proxy_to_parent(id(10), id(1), 0, false)
        .unwrap();
    data.add_virtual_proxy_to_parent(id(11), id(1), 0, false)
        .unwrap();

    data.unparent(id(10)).unwrap();
    assert_eq!(data.child_count(id(11)), Some(4));
    assert_eq!(
        data.effective_children(id(1)),
        (100..104).map(id).collect::<Vec<_>>()
    );
}

#[test]
fn moving_a_proxy_keeps_effective_order() {
    let mut data = wide_parent(6);
    for n in 10..13 {
        proxy(&mut data, n);
        data.add_virtual_proxy_to_parent(id(n), id(1), 0, false)
            .unwrap();
    }
    let before = data.effective_children(id(1));

    data.update_virtual_proxy_index(id(12), 0).unwrap();
    let container = data.proxy_container(id(1)).unwrap();
    assert_eq!(container.proxy_ids.as_slice(), &[id(12), id(10), id(11)]);
    assert_eq!(data.effective_children(id(1)), before);
    assert_eq!(
        data.children(id(12)).collect::<Vec<_>>(),
        [id(100), id(101)]
    );
}

#[test]
fn new_children_of_a_proxied_parent_land_by_priority() {
    let mut data = wide_parent(4);
    proxy(&mut data, 10);
    proxy(&mut data, 11);
    data.add_virtual_proxy_to_parent(id(10), id(1), 0, false)
        .unwrap();
    data.add_virtual_proxy_to_parent(id(11), id(1), 0, false)
        .unwrap();

    data.add(id(200), id(1), 1, false).unwrap();
    let effective = data.effective_children(id(1));
    assert_eq!(effective.len(), 5);
    assert_eq!(data.real_parent_id(id(200)), Some(id(1)));
    assert_eq!(data.child_count(id(10)), Some(3));
    assert_eq!(data.child_count(id(11)), Some(2));
}

#[test]
fn parenting_onto_a_proxy_redirects_to_its_owner() {
    let mut data = wide_parent(2);
    proxy(&mut data, 10);
    data.add_virtual_proxy_to_parent(id(10), id(1), 0, false)
        .unwrap();
    data.add(id(5), NONE, 0, false).unwrap();

    data.set_parent(id(5), id(10), 10).unwrap();
    assert_eq!(data.real_parent_id(id(5)), Some(id(1)));
    assert_eq!(data.effective_children(id(1)).last(), Some(&id(5)));
}

#[test]
fn attaching_an_attached_proxy_is_rejected() {
    let mut data = wide_parent(2);
    data.add(id(2), NONE, 0, false).unwrap();
    proxy(&mut data, 10);
    data.add_virtual_proxy_to_parent(id(10), id(1), 0, false)
        .unwrap();

    let err = data
        .add_virtual_proxy_to_parent(id(10), id(2), 0, false)
        .unwrap_err();
    assert!(
        matches!(err, HierarchyError::ProxyAlreadyAttached { .. }),
        "got {err:?}"
    );
    let err = data
        .add_virtual_proxy_to_parent(id(100), id(2), 0, false)
        .unwrap_err();
    assert!(matches!(err, HierarchyError::NotVirtual(_)), "got {err:?}");
}

#[test]
fn reorder_is_reported_once() {
    let mut data = wide_parent(3);
    let mut engine = engine();
    engine.update(&mut data);

    data.update_child_order(id(1), &[id(102), id(100), id(101)], &[0, 1, 2])
        .unwrap();
    let changes = engine.update(&mut data);
    assert_eq!(changes.reordered, [id(1)]);
    assert_eq!(
        data.children(id(1)).collect::<Vec<_>>(),
        [id(102), id(100), id(101)]
    );
    assert!(engine.update(&mut data).is_empty(), "nothing left to report");
}

#[test]
fn lifecycle_lists_cancel_within_a_frame() {
    let mut data = HierarchyData::new();
    let mut engine = engine();
    data.add(id(1), NONE, 0, false).unwrap();
    data.add(id(2), NONE, 0, false).unwrap();
    engine.update(&mut data);

    data.add(id(3), NONE, 0, false).unwrap();
    data.remove(id(3)).unwrap();
    data.remove(id(2)).unwrap();
    let changes = engine.update(&mut data);
    assert!(changes.added.is_empty(), "add then remove cancels");
    assert_eq!(changes.removed, [id(2)]);
}

#[test]
fn dirty_roots_follow_batch_root_order() {
    let mut data = HierarchyData::new();
    for n in 1..=4 {
        data.add(id(n), NONE, 0, false).unwrap();
    }
    let mut engine = engine();
    engine.update(&mut data);

    data.mark_dirty(id(4)).unwrap();
    data.mark_dirty(id(2)).unwrap();
    let setup = engine.begin(&mut data);
    assert!(setup.is_dirty());
    assert!(setup.root_ordinal(id(2)) < setup.root_ordinal(id(4)));
    let harvested = setup.harvest();
    assert_eq!(harvested.dirty_roots(), &[id(2), id(4)]);
    harvested.assign().complete();
}

#[test]
fn removing_a_proxied_parent_orphans_effective_children() {
    let mut data = wide_parent(3);
    proxy(&mut data, 10);
    data.add_virtual_proxy_to_parent(id(10), id(1), 0, false)
        .unwrap();

    data.remove(id(1)).unwrap();
    for n in 100..103 {
        assert_eq!(data.parent_id(id(n)), None);
        assert!(data.is_batch_root(id(n)));
    }
    assert_eq!(data.parent_id(id(10)), None);
    assert_eq!(data.child_count(id(10)), Some(0));
}

#[test]
fn large_config_threads_through() {
    let mut data = HierarchyData::with_config(HierarchyConfig::large());
    data.add(id(1), NONE, 0, false).unwrap();
    data.add(id(2), NONE, 0, true).unwrap();
    data.add_default_virtual_proxy(id(2), id(1)).unwrap();
    assert_eq!(
        data.proxy_container(id(1)).map(|c| c.desired_children_per_proxy),
        Some(HierarchyConfig::large().default_children_per_proxy)
    );
}

#[test]
fn proxies_do_not_nest() {
    let mut data = HierarchyData::new();
    data.add(id(3), NONE, 0, false).unwrap();
    proxy(&mut data, 6);
    proxy(&mut data, 8);
    data.add_virtual_proxy_to_parent(id(6), id(3), 0, false)
        .unwrap();

    assert_eq!(
        data.add_virtual_proxy_to_parent(id(8), id(6), 0, false),
        Err(HierarchyError::NestedProxy {
            proxy: id(8),
            parent: id(6)
        })
    );

    proxy(&mut data, 7);
    proxy(&mut data, 11);
    data.add_virtual_proxy_to_parent(id(11), id(7), 0, false)
        .unwrap();
    assert_eq!(
        data.add_virtual_proxy_to_parent(id(7), id(3), 0, false),
        Err(HierarchyError::NestedProxy {
            proxy: id(7),
            parent: id(3)
        })
    );

    data.add(id(13), id(3), 0, false).unwrap();
    assert_eq!(data.children(id(3)).collect::<Vec<_>>(), [id(6)]);
    assert_eq!(data.children(id(6)).collect::<Vec<_>>(), [id(13)]);
    assert_eq!(data.proxy_owner(id(8)), None);
}

#[test]
fn rooted_proxy_keeps_its_batch_when_the_owner_goes() {
    let mut data = HierarchyData::new();
    let mut engine = engine();
    data.add(id(4), NONE, 0, false).unwrap();
    proxy(&mut data, 5);
    data.add_virtual_proxy_to_parent(id(5), id(4), 0, false)
        .unwrap();
    data.mark_batch_root(id(5), true).unwrap();
    engine.update(&mut data);
    assert_eq!(state(&data, 5), (id(5), 0));

    data.remove(id(4)).unwrap();
    engine.update(&mut data);
    assert!(data.is_batch_root(id(5)));
    assert_eq!(state(&data, 5), (id(5), 0));
}

#[test]
fn children_leaving_a_rooted_proxy_lose_its_batch() {
    let mut data = HierarchyData::new();
    let mut engine = engine();
    data.add(id(5), NONE, 0, true).unwrap();
    for (priority, n) in [6, 9, 10, 12].into_iter().enumerate() {
        data.add(id(n), id(5), priority as i32, false).unwrap();
    }
    proxy(&mut data, 1);
    proxy(&mut data, 3);
    data.add_virtual_proxy_to_parent(id(1), id(5), 0, false)
        .unwrap();
    data.add_virtual_proxy_to_parent(id(3), id(5), 0, false)
        .unwrap();
    data.mark_batch_root(id(3), true).unwrap();
    engine.update(&mut data);
    assert_eq!(data.parent_id(id(10)), Some(id(3)));
    assert_eq!(state(&data, 10), (id(3), 0));

    // [9, 10] | [12]: 10 moves into the unrooted proxy.
    data.remove(id(6)).unwrap();
    engine.update(&mut data);
    assert_eq!(data.parent_id(id(10)), Some(id(1)));
    assert_eq!(data.batch_state(id(10)), Some(BatchState::Unassigned));
    assert_eq!(state(&data, 12), (id(3), 0));
}
