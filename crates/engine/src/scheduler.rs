// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sequential and concurrent case execution.
//!
//! Both strategies share one completion path: review, cache, record and
//! print. Cases execute on the blocking pool, each with its own
//! [`CaseContext`]; only the finished [`CaseRun`] travels back to the
//! coordinator, which alone touches the graph, the cache and the report log.

use crate::case::{CaseFn, CaseRegistry, Deps};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::context::CaseContext;
use crate::error::{CaseError, EngineError};
use crate::graph::{DependencyGraph, Edge};
use crate::layout::BookLayout;
use crate::output::RunPrinter;
use crate::pool::{Allocation, Resource, ResourceAllocator};
use crate::review::ReviewPolicy;
use crate::selection::Selection;
use crate::time::{Clock, ClockHandle};
use crate::wrapper::CaseWrapper;
use serde_json::Value;
use snapbook_report::{CaseEntry, CaseReports, ReportLog, RunMetrics, Summary, Verdict};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info, info_span, warn};

/// Cooperative abort flag shared with signal handlers.
///
/// Once set, no further case is dispatched; running cases finish.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying flag, for `signal_hook::flag::register`.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Lifecycle of a case within one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseState {
    Pending,
    Ready,
    Running,
    Done(Verdict),
}

/// Everything a worker needs to execute one case.
pub struct CaseJob {
    pub path: String,
    pub body: Arc<CaseFn>,
    pub wrappers: Vec<Arc<dyn CaseWrapper>>,
    /// Dependency values in declaration order, or the path of the first
    /// dependency without a result
    pub deps: Result<Vec<Value>, String>,
    pub layout: BookLayout,
    pub clock: ClockHandle,
    pub point_error_pos: bool,
}

/// A finished case, sent back to the coordinator.
#[derive(Clone, Debug)]
pub struct CaseRun {
    pub path: String,
    pub verdict: Verdict,
    pub value: Option<Value>,
    pub duration: Duration,
    /// Review report, when the case produced one
    pub report: Option<String>,
    /// The case exceeded its budget and may still be running
    pub timed_out: bool,
}

impl CaseRun {
    /// A case that failed without producing output.
    pub fn failed(path: impl Into<String>, cause: impl Into<String>, duration: Duration) -> Self {
        let cause = cause.into();
        Self {
            path: path.into(),
            verdict: Verdict::Fail,
            value: None,
            duration,
            report: Some(format!("! {cause}")),
            timed_out: false,
        }
    }
}

/// Outcome of [`Scheduler::run`].
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Entries of the cases in this run, carried-over ones included
    pub entries: Vec<CaseEntry>,
    pub summary: Summary,
    /// Paths of the cases that differed or failed
    pub failed: Vec<String>,
    pub took: Duration,
    /// Stopped by the abort handle
    pub aborted: bool,
    /// Stopped dispatching after a failure
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        crate::exit::for_summary(&self.summary, self.aborted)
    }
}

/// Coordinator-side bookkeeping for one run.
struct RunState {
    log: ReportLog,
    /// Cases executed (or carried over) in this run, by path
    planned: HashSet<String>,
    /// State of every case still to execute or executed in this run
    states: HashMap<String, CaseState>,
    /// Cases that failed in this run; their results are unavailable
    failed: HashSet<String>,
    stop: bool,
}

pub struct Scheduler {
    graph: DependencyGraph,
    layout: BookLayout,
    config: Config,
    wrappers: Vec<Arc<dyn CaseWrapper>>,
    printer: RunPrinter,
    clock: ClockHandle,
    abort: AbortHandle,
}

impl Scheduler {
    pub fn new(
        registry: Arc<CaseRegistry>,
        layout: BookLayout,
        config: Config,
    ) -> Result<Self, EngineError> {
        let cache = ResultCache::new(layout.clone());
        let graph = DependencyGraph::new(registry, cache)?;
        Ok(Self {
            graph,
            layout,
            printer: RunPrinter::sink().with_verbose(config.verbose),
            config,
            wrappers: Vec::new(),
            clock: ClockHandle::default(),
            abort: AbortHandle::new(),
        })
    }

    /// Add a wrapper applied to every case, before the case's own.
    pub fn with_wrapper(mut self, wrapper: Arc<dyn CaseWrapper>) -> Self {
        self.wrappers.push(wrapper);
        self
    }

    pub fn with_printer(mut self, printer: RunPrinter) -> Self {
        self.printer = printer.with_verbose(self.config.verbose);
        self
    }

    pub fn with_clock(mut self, clock: ClockHandle) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn layout(&self) -> &BookLayout {
        &self.layout
    }

    /// Run the selected cases and the dependencies they pull in.
    pub async fn run(&mut self, selection: &Selection) -> Result<RunSummary, EngineError> {
        let started = self.clock.now_millis();
        let order = self
            .graph
            .resolve_order(selection, self.config.refresh_dependencies);

        let cases_file = self.layout.cases_file();
        let mut previous = CaseReports::read(&cases_file)?;
        let registry = Arc::clone(self.graph.registry());
        previous.retain_paths(|path| registry.contains(path));
        let plan = previous.plan_continue(&order, self.config.continue_run);

        let mut state = RunState {
            log: ReportLog::create(&cases_file)?,
            planned: order.iter().cloned().collect(),
            states: plan
                .todo
                .iter()
                .map(|path| (path.clone(), CaseState::Pending))
                .collect(),
            failed: HashSet::new(),
            stop: false,
        };
        for entry in previous.entries() {
            if !state.states.contains_key(&entry.path) {
                state.log.record(entry.clone())?;
            }
        }
        info!(
            cases = order.len(),
            todo = plan.todo.len(),
            carried = plan.done.len(),
            parallel = self.config.parallel,
            "starting run"
        );

        self.printer.start_report();
        if self.config.parallel {
            self.run_concurrent(&plan.todo, &mut state).await?;
        } else {
            self.run_sequential(&plan.todo, &mut state).await?;
        }

        let took = self.clock.elapsed_since(started);
        RunMetrics::new(took.as_millis() as u64).to_dir(self.layout.out_dir())?;

        let entries: Vec<CaseEntry> = state
            .log
            .entries()
            .into_iter()
            .filter(|entry| state.planned.contains(&entry.path))
            .collect();
        let summary = Summary::of(&entries);
        let failed: Vec<String> = entries
            .iter()
            .filter(|entry| !entry.verdict.is_ok())
            .map(|entry| entry.path.clone())
            .collect();
        self.printer.end_report(&summary, &failed, took);

        Ok(RunSummary {
            entries,
            summary,
            failed,
            took,
            aborted: self.abort.is_aborted(),
            stopped_early: state.stop,
        })
    }

    fn should_stop(&self, state: &RunState) -> bool {
        state.stop || self.abort.is_aborted()
    }

    async fn run_sequential(
        &mut self,
        todo: &[String],
        state: &mut RunState,
    ) -> Result<(), EngineError> {
        let mut allocator = ResourceAllocator::new();
        for path in todo {
            if self.should_stop(state) {
                info!(case = %path, "run stopped, not dispatching further cases");
                break;
            }
            let requests = self.graph.resource_requests(path);
            let run = match allocator.try_acquire(path, &requests) {
                Allocation::Granted(resources) => {
                    let job = self.prepare(path, state, resources)?;
                    state.states.insert(path.clone(), CaseState::Running);
                    let run = dispatch(job, self.config.timeout()).await?;
                    release(&mut allocator, &run);
                    run
                }
                Allocation::Blocked => CaseRun::failed(path, "resources unavailable", Duration::ZERO),
                Allocation::Impossible(reason) => CaseRun::failed(path, reason, Duration::ZERO),
            };
            self.complete(run, state)?;
        }
        Ok(())
    }

    async fn run_concurrent(
        &mut self,
        todo: &[String],
        state: &mut RunState,
    ) -> Result<(), EngineError> {
        let workers = self.config.worker_count();
        let poll = self.config.poll_interval();
        let timeout = self.config.timeout();
        let mut allocator = ResourceAllocator::new();
        let mut pending: Vec<String> = todo.to_vec();
        let mut running = 0usize;
        let (tx, mut rx) = mpsc::unbounded_channel::<Result<CaseRun, JoinError>>();

        loop {
            if !self.should_stop(state) {
                let mut index = 0;
                while index < pending.len() && running < workers {
                    if !self.is_ready(&pending[index], state) {
                        index += 1;
                        continue;
                    }
                    state.states.insert(pending[index].clone(), CaseState::Ready);
                    let requests = self.graph.resource_requests(&pending[index]);
                    match allocator.try_acquire(&pending[index], &requests) {
                        Allocation::Granted(resources) => {
                            let path = pending.remove(index);
                            let job = self.prepare(&path, state, resources)?;
                            state.states.insert(path.clone(), CaseState::Running);
                            debug!(case = %path, running, "dispatching case");
                            let tx = tx.clone();
                            tokio::spawn(async move {
                                let _ = tx.send(dispatch(job, timeout).await);
                            });
                            running += 1;
                        }
                        Allocation::Blocked => index += 1,
                        Allocation::Impossible(reason) => {
                            let path = pending.remove(index);
                            self.complete(CaseRun::failed(path, reason, Duration::ZERO), state)?;
                            if self.should_stop(state) {
                                break;
                            }
                        }
                    }
                }
            }

            if running == 0 {
                if !pending.is_empty() && !self.should_stop(state) {
                    warn!(left = pending.len(), "no runnable case left");
                    for path in std::mem::take(&mut pending) {
                        self.complete(
                            CaseRun::failed(path, "resources unavailable", Duration::ZERO),
                            state,
                        )?;
                    }
                }
                break;
            }

            tokio::select! {
                received = rx.recv() => {
                    if let Some(result) = received {
                        running -= 1;
                        let run = result?;
                        release(&mut allocator, &run);
                        self.complete(run, state)?;
                    }
                }
                _ = tokio::time::sleep(poll) => {}
            }
        }
        Ok(())
    }

    /// Every case dependency is outside this run or has finished.
    fn is_ready(&self, path: &str, state: &RunState) -> bool {
        self.graph.dependencies_of(path).all(|dependency| {
            matches!(
                state.states.get(dependency),
                None | Some(CaseState::Done(_))
            )
        })
    }

    fn prepare(
        &mut self,
        path: &str,
        state: &RunState,
        resources: Vec<Resource>,
    ) -> Result<CaseJob, EngineError> {
        let registry = Arc::clone(self.graph.registry());
        let case = registry
            .get(path)
            .ok_or_else(|| EngineError::UnknownCase(path.to_string()))?;

        let edges = self.graph.edges(path).to_vec();
        let mut resources = resources.into_iter();
        let mut values = Vec::with_capacity(edges.len());
        let mut missing = None;
        for edge in edges {
            match edge {
                Edge::Case(dependency) => {
                    let value = if state.failed.contains(&dependency) {
                        None
                    } else {
                        self.graph.cached_result(&dependency)?
                    };
                    match value {
                        Some(value) => values.push(value),
                        None => {
                            missing = Some(dependency);
                            break;
                        }
                    }
                }
                Edge::Resource(_) => {
                    values.push(resources.next().map(|r| r.value().clone()).unwrap_or_default())
                }
            }
        }

        let mut wrappers = self.wrappers.clone();
        wrappers.extend(case.wrappers().iter().cloned());
        Ok(CaseJob {
            path: path.to_string(),
            body: case.callable().body(),
            wrappers,
            deps: match missing {
                Some(dependency) => Err(dependency),
                None => Ok(values),
            },
            layout: self.layout.clone(),
            clock: self.clock.clone(),
            point_error_pos: self.config.point_error_pos,
        })
    }

    fn complete(&mut self, run: CaseRun, state: &mut RunState) -> Result<(), EngineError> {
        let policy = ReviewPolicy::new(self.config.accept, self.config.update);
        let verdict = policy.review(&self.layout, &run.path, run.verdict)?;

        match run.verdict {
            Verdict::Ok | Verdict::Diff => self.graph.cache_result(&run.path, run.value)?,
            Verdict::Fail => {
                state.failed.insert(run.path.clone());
            }
        }
        state
            .states
            .insert(run.path.clone(), CaseState::Done(run.verdict));

        state
            .log
            .record(CaseEntry::new(run.path.clone(), verdict, run.duration))?;
        self.printer
            .case_result(&run.path, verdict, run.duration, run.report.as_deref());
        info!(case = %run.path, verdict = verdict.as_str(), ms = run.duration.as_millis() as u64, "case finished");

        if self.config.fail_fast && !verdict.is_ok() && !state.stop {
            info!(case = %run.path, "fail fast, stopping run");
            state.stop = true;
        }
        Ok(())
    }
}

/// Return the resources of a finished case to the allocator.
///
/// A timed-out case may still be using them, so they stay held.
fn release(allocator: &mut ResourceAllocator, run: &CaseRun) {
    if run.timed_out {
        warn!(case = %run.path, "timed-out case keeps its resources");
    } else {
        allocator.release(&run.path);
    }
}

/// Execute a job on the blocking pool, enforcing the optional timeout.
///
/// A timed-out case is reported as failed; its thread is left to finish
/// on its own and keeps its resources for the rest of the run.
pub async fn dispatch(job: CaseJob, timeout: Option<Duration>) -> Result<CaseRun, JoinError> {
    let path = job.path.clone();
    let clock = job.clock.clone();
    let started = clock.now_micros();
    let task = tokio::task::spawn_blocking(move || execute(job));
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(case = %path, limit_ms = limit.as_millis() as u64, "case timed out");
                Ok(CaseRun {
                    timed_out: true,
                    ..CaseRun::failed(
                        path,
                        format!("timed out after {} ms", limit.as_millis()),
                        clock.elapsed_micros_since(started),
                    )
                })
            }
        },
        None => task.await,
    }
}

/// Execute one case to completion on the current thread.
///
/// Errors and panics raised by the body or its wrappers are recorded in the
/// case output and make the case fail.
pub fn execute(job: CaseJob) -> CaseRun {
    let span = info_span!("case", path = %job.path);
    let _enter = span.enter();
    let started = job.clock.now_micros();

    let ctx = match CaseContext::open(&job.path, &job.layout) {
        Ok(ctx) => ctx
            .with_clock(job.clock.clone())
            .with_point_error_pos(job.point_error_pos),
        Err(e) => {
            warn!(error = %e, "failed to open case context");
            return CaseRun::failed(
                job.path.clone(),
                format!("failed to open case: {e}"),
                job.clock.elapsed_micros_since(started),
            );
        }
    };
    let mut ctx = ctx;
    let value = run_body(&mut ctx, &job);

    let duration = job.clock.elapsed_micros_since(started);
    match ctx.finish() {
        Ok(outcome) => CaseRun {
            path: job.path,
            verdict: outcome.verdict,
            value,
            duration,
            report: Some(outcome.report),
            timed_out: false,
        },
        Err(e) => {
            warn!(error = %e, "failed to write case output");
            CaseRun::failed(job.path, format!("failed to write output: {e}"), duration)
        }
    }
}

fn run_body(ctx: &mut CaseContext, job: &CaseJob) -> Option<Value> {
    let deps = match &job.deps {
        Ok(values) => Deps::new(values.clone()),
        Err(missing) => {
            warn!(dependency = %missing, "missing dependency result");
            ctx.fail()
                .iln(&format!("missing dependency result: {missing}"));
            return None;
        }
    };

    let mut entered = 0;
    for wrapper in &job.wrappers {
        match guarded(|| wrapper.before(ctx)) {
            Ok(()) => entered += 1,
            Err(message) => {
                ctx.record_error(&message);
                break;
            }
        }
    }

    let value = if entered == job.wrappers.len() {
        match guarded(|| (job.body)(ctx, &deps)) {
            Ok(value) => value,
            Err(message) => {
                ctx.record_error(&message);
                None
            }
        }
    } else {
        None
    };

    for wrapper in job.wrappers[..entered].iter().rev() {
        if let Err(message) = guarded(|| wrapper.after(ctx, value.as_ref())) {
            ctx.record_error(&message);
        }
    }
    value
}

/// Run `f`, turning both errors and panics into a message.
fn guarded<T>(f: impl FnOnce() -> Result<T, CaseError>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
