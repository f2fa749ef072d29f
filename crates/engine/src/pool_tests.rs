// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use serde_json::json;

fn granted(allocation: Allocation) -> Vec<Resource> {
    match allocation {
        Allocation::Granted(resources) => resources,
        other => panic!("expected grant, got {other:?}"),
    }
}

fn ids(resources: &[Resource]) -> Vec<&str> {
    resources.iter().map(Resource::id).collect()
}

#[test]
fn port_resource() {
    let port = Resource::port(8080);
    assert_eq!(port.id(), "port=8080");
    assert_eq!(port.value(), &json!(8080));
}

#[test]
fn resources_compare_by_id() {
    assert_eq!(Resource::new("db", 1), Resource::new("db", 2));
    assert_ne!(Resource::new("db", 1), Resource::new("cache", 1));
}

#[test]
fn pool_of_n_gives_n_distinct_values() {
    let pool = ResourcePool::ports("ports", 9000..9003);
    let mut allocator = ResourceAllocator::new();
    let request = [ResourceRequest::AnyOf(pool.clone())];

    let mut seen = Vec::new();
    for case in ["a", "b", "c"] {
        let resources = granted(allocator.try_acquire(case, &request));
        seen.push(resources[0].id().to_string());
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 3);
}

#[test]
fn depleted_pool_blocks_until_release() {
    let pool = ResourcePool::ports("ports", 9000..9002);
    let mut allocator = ResourceAllocator::new();
    let request = [ResourceRequest::AnyOf(pool.clone())];

    let first = granted(allocator.try_acquire("a", &request));
    granted(allocator.try_acquire("b", &request));
    assert_eq!(allocator.try_acquire("c", &request), Allocation::Blocked);

    allocator.release("a");
    let third = granted(allocator.try_acquire("c", &request));
    assert_eq!(ids(&third), ids(&first));
}

#[test]
fn round_robin_continues_after_release() {
    let pool = ResourcePool::ports("ports", 9000..9003);
    let mut allocator = ResourceAllocator::new();
    let request = [ResourceRequest::AnyOf(pool.clone())];

    let a = granted(allocator.try_acquire("a", &request));
    allocator.release("a");
    let b = granted(allocator.try_acquire("b", &request));
    assert_eq!(ids(&a), vec!["port=9000"]);
    assert_eq!(ids(&b), vec!["port=9001"]);
}

#[test]
fn one_case_drawing_twice_gets_distinct_values() {
    let pool = ResourcePool::ports("ports", 9000..9002);
    let mut allocator = ResourceAllocator::new();
    let request = [
        ResourceRequest::AnyOf(pool.clone()),
        ResourceRequest::AnyOf(pool.clone()),
    ];
    let resources = granted(allocator.try_acquire("a", &request));
    assert_ne!(resources[0].id(), resources[1].id());
}

#[test]
fn demand_beyond_capacity_is_impossible() {
    let pool = ResourcePool::ports("ports", 9000..9001);
    let mut allocator = ResourceAllocator::new();
    let request = [
        ResourceRequest::AnyOf(pool.clone()),
        ResourceRequest::AnyOf(pool.clone()),
    ];
    assert!(matches!(
        allocator.try_acquire("a", &request),
        Allocation::Impossible(_)
    ));
}

#[test]
fn exact_resources_are_exclusive() {
    let mut allocator = ResourceAllocator::new();
    let request = [ResourceRequest::Exact(Resource::new("db", "sqlite"))];

    granted(allocator.try_acquire("a", &request));
    assert_eq!(allocator.holder("db"), Some("a"));
    assert_eq!(allocator.try_acquire("b", &request), Allocation::Blocked);

    allocator.release("a");
    assert_eq!(allocator.holder("db"), None);
    granted(allocator.try_acquire("b", &request));
}

#[test]
fn blocked_request_takes_nothing() {
    let pool = ResourcePool::ports("ports", 9000..9002);
    let mut allocator = ResourceAllocator::new();
    granted(allocator.try_acquire("holder", &[ResourceRequest::Exact(Resource::new("db", 0))]));

    let request = [
        ResourceRequest::AnyOf(pool.clone()),
        ResourceRequest::Exact(Resource::new("db", 0)),
    ];
    assert_eq!(allocator.try_acquire("a", &request), Allocation::Blocked);
    assert_eq!(allocator.holder("port=9000"), None);

    // The pool cursor was rolled back too.
    let next = granted(allocator.try_acquire("b", &[ResourceRequest::AnyOf(pool)]));
    assert_eq!(ids(&next), vec!["port=9000"]);
}

#[test]
fn no_requests_is_an_empty_grant() {
    let mut allocator = ResourceAllocator::new();
    assert_eq!(allocator.try_acquire("a", &[]), Allocation::Granted(vec![]));
}
