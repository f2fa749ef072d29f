// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency and resource graph.
//!
//! Case dependencies are resolved to concrete case paths once, when the
//! graph is built. Unknown dependencies and cycles are rejected up front.

use crate::cache::ResultCache;
use crate::case::{Case, CaseRegistry, Dependency};
use crate::error::EngineError;
use crate::pool::ResourceRequest;
use crate::selection::Selection;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Where the value for one declared dependency comes from.
#[derive(Clone, Debug)]
pub enum Edge {
    /// Cached result of another case
    Case(String),
    /// A resource allocated for the duration of the case
    Resource(ResourceRequest),
}

pub struct DependencyGraph {
    registry: Arc<CaseRegistry>,
    edges: HashMap<String, Vec<Edge>>,
    cache: ResultCache,
}

impl DependencyGraph {
    pub fn new(registry: Arc<CaseRegistry>, cache: ResultCache) -> Result<Self, EngineError> {
        let mut edges = HashMap::with_capacity(registry.len());
        for case in registry.cases() {
            edges.insert(case.path().to_string(), resolve_edges(&registry, case)?);
        }
        let graph = Self {
            registry,
            edges,
            cache,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    pub fn registry(&self) -> &Arc<CaseRegistry> {
        &self.registry
    }

    /// Declared dependencies of `path`, in declaration order.
    pub fn edges(&self, path: &str) -> &[Edge] {
        self.edges.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Paths of the cases `path` depends on directly.
    pub fn dependencies_of(&self, path: &str) -> impl Iterator<Item = &str> {
        self.edges(path).iter().filter_map(|edge| match edge {
            Edge::Case(dependency) => Some(dependency.as_str()),
            Edge::Resource(_) => None,
        })
    }

    /// Resource requests of `path`, in declaration order.
    pub fn resource_requests(&self, path: &str) -> Vec<ResourceRequest> {
        self.edges(path)
            .iter()
            .filter_map(|edge| match edge {
                Edge::Resource(request) => Some(request.clone()),
                Edge::Case(_) => None,
            })
            .collect()
    }

    /// Selected cases plus the dependencies they pull in, dependencies first.
    ///
    /// A dependency outside the selection is pulled in unless it was
    /// explicitly skipped, or unless it already has a cached result and
    /// `refresh` is off.
    pub fn resolve_order(&self, selection: &Selection, refresh: bool) -> Vec<String> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for case in self.registry.cases() {
            if selection.is_selected(case.path()) {
                self.visit(case.path(), selection, refresh, &mut seen, &mut order);
            }
        }
        order
    }

    fn visit(
        &self,
        path: &str,
        selection: &Selection,
        refresh: bool,
        seen: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) {
        if !seen.insert(path.to_string()) {
            return;
        }
        for dependency in self.dependencies_of(path) {
            let pulled = !selection.is_skipped(dependency)
                && (selection.is_selected(dependency)
                    || refresh
                    || !self.cache.contains(dependency));
            if pulled {
                self.visit(dependency, selection, refresh, seen, order);
            }
        }
        order.push(path.to_string());
    }

    pub fn cached_result(&mut self, path: &str) -> Result<Option<Value>, EngineError> {
        self.cache.get(path)
    }

    pub fn cache_result(&mut self, path: &str, value: Option<Value>) -> Result<(), EngineError> {
        self.cache.store(path, value)
    }

    fn check_acyclic(&self) -> Result<(), EngineError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        for root in self.registry.paths() {
            if marks.contains_key(root) {
                continue;
            }
            // Iterative depth-first search; the stack holds (path, next child).
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            marks.insert(root, Mark::Visiting);
            while let Some((path, child)) = stack.pop() {
                let next = self.dependencies_of(path).nth(child);
                match next {
                    Some(dependency) => {
                        stack.push((path, child + 1));
                        match marks.get(dependency) {
                            Some(Mark::Visiting) => {
                                return Err(EngineError::DependencyCycle(dependency.to_string()))
                            }
                            Some(Mark::Done) => {}
                            None => {
                                marks.insert(dependency, Mark::Visiting);
                                stack.push((dependency, 0));
                            }
                        }
                    }
                    None => {
                        marks.insert(path, Mark::Done);
                    }
                }
            }
        }
        Ok(())
    }
}

fn resolve_edges(registry: &CaseRegistry, case: &Case) -> Result<Vec<Edge>, EngineError> {
    case.dependencies()
        .iter()
        .map(|dependency| match dependency {
            Dependency::Case(callable) => registry
                .resolve_callable(case, *callable)
                .map(|target| Edge::Case(target.path().to_string()))
                .ok_or_else(|| EngineError::UnknownDependency {
                    case: case.path().to_string(),
                }),
            Dependency::Resource(resource) => {
                Ok(Edge::Resource(ResourceRequest::Exact(resource.clone())))
            }
            Dependency::Pool(pool) => Ok(Edge::Resource(ResourceRequest::AnyOf(Arc::clone(pool)))),
        })
        .collect()
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
