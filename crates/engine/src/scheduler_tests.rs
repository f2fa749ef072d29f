// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::case::{Callable, Case};
use crate::pool::ResourcePool;
use crate::wrapper::SetupTeardown;
use parking_lot::Mutex;
use rstest::rstest;
use serde_json::json;
use std::sync::atomic::AtomicUsize;
use tempfile::TempDir;

struct Book {
    dir: TempDir,
}

impl Book {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn layout(&self) -> BookLayout {
        BookLayout::new(self.dir.path().join("books"), self.dir.path().join("out"))
    }

    fn baseline(&self, path: &str, content: &str) {
        let file = self.layout().baseline_file(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, content).unwrap();
    }

    fn output(&self, path: &str) -> String {
        std::fs::read_to_string(self.layout().output_file(path)).unwrap()
    }

    async fn run(&self, registry: CaseRegistry, config: Config, selection: &Selection) -> RunSummary {
        let mut scheduler = Scheduler::new(Arc::new(registry), self.layout(), config).unwrap();
        scheduler.run(selection).await.unwrap()
    }
}

fn config() -> Config {
    Config {
        poll_ms: 1,
        ..Config::default()
    }
}

fn parallel(workers: usize) -> Config {
    Config {
        parallel: true,
        workers: Some(workers),
        ..config()
    }
}

fn verdicts(summary: &RunSummary) -> Vec<(String, Verdict)> {
    summary
        .entries
        .iter()
        .map(|e| (e.path.clone(), e.verdict))
        .collect()
}

fn verdict_of(summary: &RunSummary, path: &str) -> Verdict {
    summary
        .entries
        .iter()
        .find(|e| e.path == path)
        .map(|e| e.verdict)
        .unwrap()
}

fn writes(line: &'static str) -> Callable {
    Callable::new(move |ctx, _| {
        ctx.tln(line);
        Ok(None)
    })
}

#[tokio::test]
async fn dependency_values_flow_to_dependents() {
    let book = Book::new();
    book.baseline("calc/base", "base\n");
    book.baseline("calc/double", "got 42\n");

    let base = Callable::new(|ctx, _| {
        ctx.tln("base");
        Ok(Some(json!(21)))
    });
    let double = Callable::new(|ctx, deps| {
        let n: u64 = deps.get(0)?;
        ctx.tln(&format!("got {}", n * 2));
        Ok(None)
    });
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("calc/double", &double).depends_on(&base)).unwrap();
    registry.register(Case::new("calc/base", &base)).unwrap();

    let summary = book.run(registry, config(), &Selection::all()).await;

    assert_eq!(
        verdicts(&summary),
        vec![
            ("calc/base".to_string(), Verdict::Ok),
            ("calc/double".to_string(), Verdict::Ok),
        ]
    );
    assert_eq!(summary.exit_code(), crate::exit::SUCCESS);
    assert!(book.layout().cache_file("calc/base").is_file());
    assert!(RunMetrics::of_dir(book.layout().out_dir()).unwrap().is_some());
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
#[tokio::test]
async fn diamond_dependent_waits_for_both_branches(#[case] workers: usize) {
    let book = Book::new();
    let events = Arc::new(Mutex::new(Vec::<String>::new()));

    let step = |name: &'static str, pause_ms: u64| {
        let events = Arc::clone(&events);
        Callable::new(move |ctx, _| {
            events.lock().push(format!("start {name}"));
            std::thread::sleep(Duration::from_millis(pause_ms));
            ctx.tln(name);
            events.lock().push(format!("end {name}"));
            Ok(Some(json!(name)))
        })
    };
    let (a, b, c, d) = (step("a", 1), step("b", 20), step("c", 5), step("d", 1));

    let mut registry = CaseRegistry::new();
    registry.register(Case::new("g/a", &a)).unwrap();
    registry.register(Case::new("g/b", &b).depends_on(&a)).unwrap();
    registry.register(Case::new("g/c", &c).depends_on(&a)).unwrap();
    registry.register(Case::new("g/d", &d).depends_on(&b).depends_on(&c)).unwrap();

    let summary = book.run(registry, parallel(workers), &Selection::all()).await;
    assert_eq!(summary.summary.total, 4);

    let events = events.lock().clone();
    let at = |event: &str| events.iter().position(|e| e == event).unwrap();
    assert!(at("start d") > at("end b"));
    assert!(at("start d") > at("end c"));
    assert!(at("start b") > at("end a"));
    assert!(at("start c") > at("end a"));
}

#[tokio::test]
async fn skipped_dependency_without_result_fails_dependent() {
    let book = Book::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let base = writes("base");
    let dependent = Callable::new(move |ctx, _| {
        counted.fetch_add(1, Ordering::SeqCst);
        ctx.tln("never");
        Ok(None)
    });
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("base", &base)).unwrap();
    registry.register(Case::new("dependent", &dependent).depends_on(&base)).unwrap();

    let summary = book
        .run(registry, config(), &Selection::new(["dependent", "skip:base"]))
        .await;

    assert_eq!(verdicts(&summary), vec![("dependent".to_string(), Verdict::Fail)]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(book.output("dependent").contains("missing dependency result: base"));
}

#[tokio::test]
async fn failed_dependency_fails_dependent() {
    let book = Book::new();
    let base = Callable::new(|ctx, _| {
        ctx.fail();
        Ok(Some(json!(1)))
    });
    let dependent = writes("dependent");
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("base", &base)).unwrap();
    registry.register(Case::new("dependent", &dependent).depends_on(&base)).unwrap();

    let summary = book.run(registry, config(), &Selection::all()).await;

    assert_eq!(verdict_of(&summary, "base"), Verdict::Fail);
    assert_eq!(verdict_of(&summary, "dependent"), Verdict::Fail);
    assert!(!book.layout().cache_file("base").exists());
}

#[tokio::test]
async fn continue_mode_keeps_passed_cases() {
    let book = Book::new();
    book.baseline("ok", "ok\n");
    let calls = Arc::new(AtomicUsize::new(0));

    let registry = || {
        let counted = Arc::clone(&calls);
        let ok = Callable::new(move |ctx, _| {
            counted.fetch_add(1, Ordering::SeqCst);
            ctx.tln("ok");
            Ok(None)
        });
        let mut registry = CaseRegistry::new();
        registry.register(Case::new("ok", &ok)).unwrap();
        registry.register(Case::new("new", &writes("new"))).unwrap();
        registry
    };

    let first = book.run(registry(), config(), &Selection::all()).await;
    assert_eq!(verdict_of(&first, "ok"), Verdict::Ok);
    assert_eq!(verdict_of(&first, "new"), Verdict::Diff);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let resumed = Config {
        continue_run: true,
        ..config()
    };
    let second = book.run(registry(), resumed, &Selection::all()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(verdict_of(&second, "ok"), Verdict::Ok);
    assert_eq!(verdict_of(&second, "new"), Verdict::Diff);
    assert_eq!(second.entries.len(), 2);

    let persisted = CaseReports::read(&book.layout().cases_file()).unwrap();
    assert_eq!(persisted.get("ok").unwrap().verdict, Verdict::Ok);
}

#[tokio::test]
async fn continue_mode_feeds_carried_valueless_dependency() {
    let book = Book::new();
    book.baseline("setup", "ready\n");
    let setup_calls = Arc::new(AtomicUsize::new(0));
    let user_calls = Arc::new(AtomicUsize::new(0));

    let registry = || {
        let counted = Arc::clone(&setup_calls);
        let setup = Callable::new(move |ctx, _| {
            counted.fetch_add(1, Ordering::SeqCst);
            ctx.tln("ready");
            Ok(None)
        });
        let counted = Arc::clone(&user_calls);
        let user = Callable::new(move |ctx, deps| {
            counted.fetch_add(1, Ordering::SeqCst);
            let value: Value = deps.get(0)?;
            ctx.tln(&format!("setup gave {value}"));
            Ok(None)
        });
        let mut registry = CaseRegistry::new();
        registry.register(Case::new("setup", &setup)).unwrap();
        registry.register(Case::new("user", &user).depends_on(&setup)).unwrap();
        registry
    };

    let first = book.run(registry(), config(), &Selection::all()).await;
    assert_eq!(verdict_of(&first, "setup"), Verdict::Ok);
    assert_eq!(verdict_of(&first, "user"), Verdict::Diff);

    let resumed = Config {
        continue_run: true,
        ..config()
    };
    let second = book.run(registry(), resumed, &Selection::all()).await;
    assert_eq!(setup_calls.load(Ordering::SeqCst), 1);
    assert_eq!(user_calls.load(Ordering::SeqCst), 2);
    assert_eq!(verdict_of(&second, "setup"), Verdict::Ok);
    assert_eq!(verdict_of(&second, "user"), Verdict::Diff);
    assert_eq!(book.output("user"), "setup gave null\n");
}

#[tokio::test]
async fn reports_of_unselected_cases_are_carried_over() {
    let book = Book::new();
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("one", &writes("one"))).unwrap();
    registry.register(Case::new("two", &writes("two"))).unwrap();
    book.run(registry, config(), &Selection::all()).await;

    let mut registry = CaseRegistry::new();
    registry.register(Case::new("one", &writes("one"))).unwrap();
    registry.register(Case::new("two", &writes("two"))).unwrap();
    let summary = book.run(registry, config(), &Selection::new(["two"])).await;

    assert_eq!(summary.entries.len(), 1);
    let persisted = CaseReports::read(&book.layout().cases_file()).unwrap();
    let paths: Vec<&str> = persisted.entries().iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["one", "two"]);
}

#[tokio::test]
async fn reports_of_removed_cases_are_dropped() {
    let book = Book::new();
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("kept", &writes("kept"))).unwrap();
    registry.register(Case::new("removed", &writes("removed"))).unwrap();
    book.run(registry, config(), &Selection::all()).await;

    let mut registry = CaseRegistry::new();
    registry.register(Case::new("kept", &writes("kept"))).unwrap();
    book.run(registry, config(), &Selection::all()).await;

    let persisted = CaseReports::read(&book.layout().cases_file()).unwrap();
    assert!(persisted.get("removed").is_none());
    assert!(persisted.get("kept").is_some());
}

#[rstest]
#[case(false)]
#[case(true)]
#[tokio::test]
async fn fail_fast_stops_dispatching(#[case] concurrent: bool) {
    let book = Book::new();
    let mut registry = CaseRegistry::new();
    let first = writes("first");
    let second = writes("second");
    registry.register(Case::new("first", &first)).unwrap();
    // Chained so the concurrent strategy cannot dispatch it early.
    registry.register(Case::new("second", &second).depends_on(&first)).unwrap();

    let base = if concurrent { parallel(4) } else { config() };
    let config = Config {
        fail_fast: true,
        ..base
    };
    let summary = book.run(registry, config, &Selection::all()).await;

    assert_eq!(verdicts(&summary), vec![("first".to_string(), Verdict::Diff)]);
    assert!(summary.stopped_early);
    assert!(!summary.aborted);
    assert_eq!(summary.exit_code(), crate::exit::FAILURE);
}

#[tokio::test]
async fn abort_before_run_dispatches_nothing() {
    let book = Book::new();
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("a", &writes("a"))).unwrap();

    let abort = AbortHandle::new();
    abort.abort();
    let mut scheduler = Scheduler::new(Arc::new(registry), book.layout(), config())
        .unwrap()
        .with_abort(abort);
    let summary = scheduler.run(&Selection::all()).await.unwrap();

    assert!(summary.entries.is_empty());
    assert!(summary.aborted);
    assert_eq!(summary.exit_code(), crate::exit::INTERRUPTED);
}

#[tokio::test]
async fn panics_and_errors_become_failures() {
    let book = Book::new();
    let panics = Callable::new(|ctx, _| {
        ctx.tln("before");
        panic!("boom");
    });
    let errors = Callable::new(|_, _| Err(CaseError::msg("bad input")));
    let after = writes("after");
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("panics", &panics)).unwrap();
    registry.register(Case::new("errors", &errors)).unwrap();
    registry.register(Case::new("after", &after)).unwrap();

    let summary = book.run(registry, config(), &Selection::all()).await;

    assert_eq!(verdict_of(&summary, "panics"), Verdict::Fail);
    assert_eq!(verdict_of(&summary, "errors"), Verdict::Fail);
    assert_eq!(verdict_of(&summary, "after"), Verdict::Diff);
    assert!(book.output("panics").contains("case raised an error: panic: boom"));
    assert!(book.output("errors").contains("case raised an error: bad input"));
}

#[tokio::test]
async fn slow_case_times_out() {
    let book = Book::new();
    let slow = Callable::new(|ctx, _| {
        std::thread::sleep(Duration::from_millis(200));
        ctx.tln("late");
        Ok(None)
    });
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("slow", &slow)).unwrap();

    let config = Config {
        timeout_ms: Some(20),
        ..config()
    };
    let summary = book.run(registry, config, &Selection::all()).await;
    assert_eq!(verdict_of(&summary, "slow"), Verdict::Fail);
}

#[rstest]
#[case(false)]
#[case(true)]
#[tokio::test]
async fn timed_out_case_keeps_its_pool_resource(#[case] concurrent: bool) {
    let book = Book::new();
    let pool = ResourcePool::ports("single", 7100..7101);
    let entered = Arc::new(AtomicUsize::new(0));

    let mut registry = CaseRegistry::new();
    for (name, sleep_ms) in [("a/slow", 300), ("b/next", 0)] {
        let entered = Arc::clone(&entered);
        let body = Callable::new(move |ctx, _| {
            entered.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(sleep_ms));
            ctx.tln("served");
            Ok(None)
        });
        registry
            .register(Case::new(name, &body).depends_on(Arc::clone(&pool)))
            .unwrap();
    }

    let base = if concurrent { parallel(2) } else { config() };
    let config = Config {
        timeout_ms: Some(30),
        ..base
    };
    let summary = book.run(registry, config, &Selection::all()).await;

    assert_eq!(verdict_of(&summary, "a/slow"), Verdict::Fail);
    assert_eq!(verdict_of(&summary, "b/next"), Verdict::Fail);
    assert_eq!(entered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pool_allocations_are_distinct_while_running() {
    let book = Book::new();
    let pool = ResourcePool::ports("ports", 9000..9003);
    let seen = Arc::new(Mutex::new(Vec::<u64>::new()));
    let active = Arc::new(Mutex::new(HashSet::<u64>::new()));

    let mut registry = CaseRegistry::new();
    for name in ["p1", "p2", "p3"] {
        let seen = Arc::clone(&seen);
        let active = Arc::clone(&active);
        let body = Callable::new(move |ctx, deps| {
            let port: u64 = deps.get(0)?;
            assert!(active.lock().insert(port), "port {port} handed out twice");
            seen.lock().push(port);
            std::thread::sleep(Duration::from_millis(30));
            active.lock().remove(&port);
            ctx.tln("served");
            Ok(None)
        });
        registry
            .register(Case::new(name, &body).depends_on(Arc::clone(&pool)))
            .unwrap();
    }

    let summary = book.run(registry, parallel(3), &Selection::all()).await;
    assert_eq!(summary.summary.fail, 0);

    let mut ports = seen.lock().clone();
    ports.sort_unstable();
    assert_eq!(ports, vec![9000, 9001, 9002]);
}

#[tokio::test]
async fn exclusive_resource_serializes_cases() {
    let book = Book::new();
    let database = Resource::new("database", json!("db://test"));
    let busy = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicUsize::new(0));

    let mut registry = CaseRegistry::new();
    for name in ["q1", "q2", "q3"] {
        let busy = Arc::clone(&busy);
        let overlapped = Arc::clone(&overlapped);
        let body = Callable::new(move |ctx, deps| {
            if busy.fetch_add(1, Ordering::SeqCst) > 0 {
                overlapped.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(10));
            busy.fetch_sub(1, Ordering::SeqCst);
            let url: String = deps.get(0)?;
            ctx.tln(&url);
            Ok(None)
        });
        registry
            .register(Case::new(name, &body).depends_on(database.clone()))
            .unwrap();
    }

    let summary = book.run(registry, parallel(3), &Selection::all()).await;
    assert_eq!(summary.summary.total, 3);
    assert_eq!(overlapped.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_pool_request_fails() {
    let book = Book::new();
    let pool = ResourcePool::ports("single", 7000..7001);
    let greedy = writes("greedy");
    let mut registry = CaseRegistry::new();
    registry
        .register(
            Case::new("greedy", &greedy)
                .depends_on(Arc::clone(&pool))
                .depends_on(Arc::clone(&pool)),
        )
        .unwrap();

    let summary = book.run(registry, parallel(2), &Selection::all()).await;
    assert_eq!(verdict_of(&summary, "greedy"), Verdict::Fail);
}

#[tokio::test]
async fn accept_freezes_output_as_baseline() {
    let book = Book::new();
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("fresh", &writes("hello"))).unwrap();

    let accept = Config {
        accept: true,
        ..config()
    };
    let summary = book.run(registry, accept, &Selection::all()).await;
    assert_eq!(verdict_of(&summary, "fresh"), Verdict::Ok);
    let baseline = std::fs::read_to_string(book.layout().baseline_file("fresh")).unwrap();
    assert_eq!(baseline, "hello\n");

    let mut registry = CaseRegistry::new();
    registry.register(Case::new("fresh", &writes("hello"))).unwrap();
    let again = book.run(registry, config(), &Selection::all()).await;
    assert_eq!(verdict_of(&again, "fresh"), Verdict::Ok);
}

#[tokio::test]
async fn wrappers_run_in_nested_order() {
    let book = Book::new();
    let events = Arc::new(Mutex::new(Vec::<String>::new()));
    let wrapper = |name: &'static str| -> Arc<dyn CaseWrapper> {
        let (before, after) = (Arc::clone(&events), Arc::clone(&events));
        Arc::new(SetupTeardown::new(
            move |_| {
                before.lock().push(format!("before {name}"));
                Ok(())
            },
            move |_| {
                after.lock().push(format!("after {name}"));
                Ok(())
            },
        ))
    };
    let body_events = Arc::clone(&events);
    let body = Callable::new(move |ctx, _| {
        body_events.lock().push("body".to_string());
        ctx.tln("body");
        Ok(None)
    });
    let mut registry = CaseRegistry::new();
    registry
        .register(Case::new("wrapped", &body).wrapped(wrapper("case")))
        .unwrap();

    let mut scheduler = Scheduler::new(Arc::new(registry), book.layout(), config())
        .unwrap()
        .with_wrapper(wrapper("global"));
    scheduler.run(&Selection::all()).await.unwrap();

    assert_eq!(
        events.lock().clone(),
        vec!["before global", "before case", "body", "after case", "after global"]
    );
}

#[tokio::test]
async fn failing_setup_skips_body_and_fails() {
    let book = Book::new();
    let ran = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&ran);
    let body = Callable::new(move |_, _| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    });
    let setup: Arc<dyn CaseWrapper> = Arc::new(SetupTeardown::new(
        |_| Err(CaseError::msg("no fixture")),
        |_| Ok(()),
    ));
    let mut registry = CaseRegistry::new();
    registry.register(Case::new("fixture", &body).wrapped(setup)).unwrap();

    let summary = book.run(registry, config(), &Selection::all()).await;
    assert_eq!(verdict_of(&summary, "fixture"), Verdict::Fail);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cached_dependency_is_not_rerun_without_refresh() {
    let book = Book::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = || {
        let counted = Arc::clone(&calls);
        let base = Callable::new(move |ctx, _| {
            counted.fetch_add(1, Ordering::SeqCst);
            ctx.tln("base");
            Ok(Some(json!("value")))
        });
        let top = Callable::new(|ctx, deps| {
            let value: String = deps.get(0)?;
            ctx.tln(&value);
            Ok(None)
        });
        let mut registry = CaseRegistry::new();
        registry.register(Case::new("base", &base)).unwrap();
        registry.register(Case::new("top", &top).depends_on(&base)).unwrap();
        registry
    };

    book.run(registry(), config(), &Selection::all()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let summary = book.run(registry(), config(), &Selection::new(["top"])).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(verdicts(&summary), vec![("top".to_string(), Verdict::Diff)]);
    assert!(book.output("top").contains("value"));

    let refresh = Config {
        refresh_dependencies: true,
        ..config()
    };
    book.run(registry(), refresh, &Selection::new(["top"])).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
