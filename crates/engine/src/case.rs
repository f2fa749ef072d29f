// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cases and the case registry.
//!
//! A case is a path, a callable body and an ordered list of dependencies.
//! Several cases may share one [`Callable`] (parametrized instances); they
//! are told apart by their [`CaseKind`].

use crate::context::CaseContext;
use crate::error::{CaseError, EngineError};
use crate::pool::{Resource, ResourcePool};
use crate::wrapper::CaseWrapper;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Signature of a case body.
///
/// The returned value is cached for dependent cases. `Ok(None)` caches
/// nothing.
pub type CaseFn = dyn Fn(&mut CaseContext, &Deps) -> Result<Option<Value>, CaseError> + Send + Sync;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identity of a case body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallableId(u64);

/// Identity of the instance a bound case belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    /// A fresh, process-unique owner.
    pub fn fresh() -> Self {
        Self(next_id())
    }
}

/// A case body with a stable identity.
#[derive(Clone)]
pub struct Callable {
    id: CallableId,
    body: Arc<CaseFn>,
}

impl Callable {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut CaseContext, &Deps) -> Result<Option<Value>, CaseError> + Send + Sync + 'static,
    {
        Self {
            id: CallableId(next_id()),
            body: Arc::new(body),
        }
    }

    pub fn id(&self) -> CallableId {
        self.id
    }

    pub fn body(&self) -> Arc<CaseFn> {
        Arc::clone(&self.body)
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Callable").field(&self.id).finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaseKind {
    Free,
    Bound { owner: OwnerId },
}

/// Something a case needs before it can run.
#[derive(Clone, Debug)]
pub enum Dependency {
    /// The cached result of the case running this callable
    Case(CallableId),
    /// A resource held exclusively while the case runs
    Resource(Resource),
    /// Any free resource of a pool
    Pool(Arc<ResourcePool>),
}

impl From<&Callable> for Dependency {
    fn from(callable: &Callable) -> Self {
        Dependency::Case(callable.id())
    }
}

impl From<Resource> for Dependency {
    fn from(resource: Resource) -> Self {
        Dependency::Resource(resource)
    }
}

impl From<Arc<ResourcePool>> for Dependency {
    fn from(pool: Arc<ResourcePool>) -> Self {
        Dependency::Pool(pool)
    }
}

#[derive(Clone)]
pub struct Case {
    path: String,
    callable: Callable,
    kind: CaseKind,
    dependencies: Vec<Dependency>,
    wrappers: Vec<Arc<dyn CaseWrapper>>,
}

impl Case {
    pub fn new(path: impl Into<String>, callable: &Callable) -> Self {
        Self {
            path: path.into(),
            callable: callable.clone(),
            kind: CaseKind::Free,
            dependencies: Vec::new(),
            wrappers: Vec::new(),
        }
    }

    /// Bind the case to an instance.
    pub fn bound_to(mut self, owner: OwnerId) -> Self {
        self.kind = CaseKind::Bound { owner };
        self
    }

    pub fn depends_on(mut self, dependency: impl Into<Dependency>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn wrapped(mut self, wrapper: Arc<dyn CaseWrapper>) -> Self {
        self.wrappers.push(wrapper);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    pub fn kind(&self) -> CaseKind {
        self.kind
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn wrappers(&self) -> &[Arc<dyn CaseWrapper>] {
        &self.wrappers
    }
}

/// All known cases, in registration order.
#[derive(Clone, Default)]
pub struct CaseRegistry {
    cases: Vec<Case>,
    index: HashMap<String, usize>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, case: Case) -> Result<(), EngineError> {
        if self.index.contains_key(case.path()) {
            return Err(EngineError::DuplicateCase(case.path().to_string()));
        }
        self.index.insert(case.path().to_string(), self.cases.len());
        self.cases.push(case);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Case> {
        self.index.get(path).map(|&i| &self.cases[i])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn cases(&self) -> impl Iterator<Item = &Case> {
        self.cases.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(Case::path)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Case that a dependency on `callable` resolves to for `dependent`.
    ///
    /// A case bound to the same owner wins; otherwise the first registered
    /// case running the callable.
    pub fn resolve_callable(&self, dependent: &Case, callable: CallableId) -> Option<&Case> {
        let mut candidates = self
            .cases
            .iter()
            .filter(|case| case.callable.id() == callable);
        if let CaseKind::Bound { owner } = dependent.kind {
            let same_owner = candidates
                .clone()
                .find(|case| case.kind == CaseKind::Bound { owner });
            if same_owner.is_some() {
                return same_owner;
            }
        }
        candidates.next()
    }
}

/// Values of a case's dependencies, in declaration order.
///
/// Case dependencies contribute their cached result (`null` when the
/// dependency returned nothing); resources contribute their value.
#[derive(Clone, Debug, Default)]
pub struct Deps {
    values: Vec<Value>,
}

impl Deps {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Decode dependency `index`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, CaseError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| CaseError::MissingDependency(format!("#{index}")))?;
        serde_json::from_value(value.clone())
            .map_err(|source| CaseError::DependencyShape { index, source })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Serialize a case's return value.
pub fn returns<T: serde::Serialize>(value: &T) -> Result<Option<Value>, CaseError> {
    Ok(Some(serde_json::to_value(value)?))
}

#[cfg(test)]
#[path = "case_tests.rs"]
mod tests;
