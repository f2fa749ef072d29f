// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared resources and resource pools.
//!
//! A [`Resource`] is a value handed to a case instead of a case result. A
//! [`ResourcePool`] is a fixed set of interchangeable resources. The
//! [`ResourceAllocator`] lives on the scheduling coordinator and is the only
//! writer of allocation state.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// A named value supplied to dependent cases.
///
/// Resources are identified by `id`; two resources with the same id are the
/// same resource regardless of value.
#[derive(Clone, Debug)]
pub struct Resource {
    id: String,
    value: Value,
}

impl Resource {
    pub fn new(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }

    pub fn port(port: u16) -> Self {
        Self::new(format!("port={port}"), port)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A bounded set of interchangeable resources.
#[derive(Debug)]
pub struct ResourcePool {
    name: String,
    resources: Vec<Resource>,
}

impl ResourcePool {
    pub fn new(name: impl Into<String>, resources: Vec<Resource>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            resources,
        })
    }

    /// A pool of TCP ports.
    pub fn ports(name: impl Into<String>, ports: Range<u16>) -> Arc<Self> {
        Self::new(name, ports.map(Resource::port).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }
}

/// One resource a case needs, by dependency position.
#[derive(Clone, Debug)]
pub enum ResourceRequest {
    /// Exactly this resource, held exclusively
    Exact(Resource),
    /// Any free resource of the pool
    AnyOf(Arc<ResourcePool>),
}

/// Result of trying to allocate resources for a case.
#[derive(Clone, Debug, PartialEq)]
pub enum Allocation {
    /// Resources granted, in request order
    Granted(Vec<Resource>),
    /// Some resource is held by a running case; retry after a release
    Blocked,
    /// The request can never be satisfied
    Impossible(String),
}

/// Coordinator-side allocation state.
#[derive(Debug, Default)]
pub struct ResourceAllocator {
    held: HashMap<String, String>,
    by_case: HashMap<String, Vec<String>>,
    cursors: HashMap<String, usize>,
}

impl ResourceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate every request for `case` or nothing.
    ///
    /// Pools are walked round-robin from where the previous allocation
    /// stopped; a slot held by a running case or already taken by this
    /// request is skipped in favor of the next one.
    pub fn try_acquire(&mut self, case: &str, requests: &[ResourceRequest]) -> Allocation {
        if let Some(reason) = impossible(requests) {
            return Allocation::Impossible(reason);
        }

        let saved_cursors = self.cursors.clone();
        let mut taken: Vec<Resource> = Vec::with_capacity(requests.len());
        let mut taken_ids: HashSet<String> = HashSet::new();

        for request in requests {
            let granted = match request {
                ResourceRequest::Exact(resource) => {
                    (!self.held.contains_key(resource.id()) && !taken_ids.contains(resource.id()))
                        .then(|| resource.clone())
                }
                ResourceRequest::AnyOf(pool) => self.next_free(pool, &taken_ids),
            };
            match granted {
                Some(resource) => {
                    taken_ids.insert(resource.id().to_string());
                    taken.push(resource);
                }
                None => {
                    self.cursors = saved_cursors;
                    debug!(case, "resources busy, case blocked");
                    return Allocation::Blocked;
                }
            }
        }

        for resource in &taken {
            self.held.insert(resource.id().to_string(), case.to_string());
        }
        if !taken.is_empty() {
            self.by_case
                .insert(case.to_string(), taken_ids.into_iter().collect());
        }
        Allocation::Granted(taken)
    }

    fn next_free(&mut self, pool: &ResourcePool, taken: &HashSet<String>) -> Option<Resource> {
        let len = pool.len();
        let start = self.cursors.get(pool.name()).copied().unwrap_or(0);
        for step in 0..len {
            let index = (start + step) % len;
            let resource = &pool.resources()[index];
            if self.held.contains_key(resource.id()) || taken.contains(resource.id()) {
                continue;
            }
            self.cursors.insert(pool.name().to_string(), index + 1);
            return Some(resource.clone());
        }
        None
    }

    /// Release everything held by `case`.
    pub fn release(&mut self, case: &str) {
        if let Some(ids) = self.by_case.remove(case) {
            for id in ids {
                self.held.remove(&id);
            }
        }
    }

    /// Case currently holding a resource.
    pub fn holder(&self, resource_id: &str) -> Option<&str> {
        self.held.get(resource_id).map(String::as_str)
    }
}

fn impossible(requests: &[ResourceRequest]) -> Option<String> {
    let mut demand: HashMap<&str, (usize, usize)> = HashMap::new();
    for request in requests {
        if let ResourceRequest::AnyOf(pool) = request {
            let entry = demand.entry(pool.name()).or_insert((0, pool.len()));
            entry.0 += 1;
        }
    }
    demand
        .into_iter()
        .find(|(_, (wanted, size))| wanted > size)
        .map(|(name, (wanted, size))| {
            format!("pool '{name}' has {size} resources but {wanted} were requested")
        })
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
