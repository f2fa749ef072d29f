// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Hooks run around a case body.
//!
//! Scheduler-wide wrappers run first, then the case's own wrappers, in
//! registration order. `after` hooks run in reverse order, and only for
//! wrappers whose `before` hook succeeded.

use crate::context::CaseContext;
use crate::error::CaseError;
use serde_json::Value;

pub trait CaseWrapper: Send + Sync {
    fn before(&self, _ctx: &mut CaseContext) -> Result<(), CaseError> {
        Ok(())
    }

    /// `value` is what the body returned, if it returned normally.
    fn after(&self, _ctx: &mut CaseContext, _value: Option<&Value>) -> Result<(), CaseError> {
        Ok(())
    }
}

type SetupFn = dyn Fn(&mut CaseContext) -> Result<(), CaseError> + Send + Sync;

/// A wrapper built from a setup and a teardown closure.
pub struct SetupTeardown {
    setup: Box<SetupFn>,
    teardown: Box<SetupFn>,
}

impl SetupTeardown {
    pub fn new<S, T>(setup: S, teardown: T) -> Self
    where
        S: Fn(&mut CaseContext) -> Result<(), CaseError> + Send + Sync + 'static,
        T: Fn(&mut CaseContext) -> Result<(), CaseError> + Send + Sync + 'static,
    {
        Self {
            setup: Box::new(setup),
            teardown: Box::new(teardown),
        }
    }
}

impl CaseWrapper for SetupTeardown {
    fn before(&self, ctx: &mut CaseContext) -> Result<(), CaseError> {
        (self.setup)(ctx)
    }

    fn after(&self, ctx: &mut CaseContext, _value: Option<&Value>) -> Result<(), CaseError> {
        (self.teardown)(ctx)
    }
}
