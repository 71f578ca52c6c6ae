//! Lifecycle execution: hook discovery, ordering, failure handling and after-hook policies.

mod common;

use std::panic::{self, AssertUnwindSafe};

use attest::TaskState::{AfterHooksRunning, BeforeHooksRunning, Completed, Created, Failed, TestRunning};
use attest::{
    AfterHookPolicy, AnnotationSpec, AnnotationTypeDef, BoxError, ClassBuilder, ElementRef, EngineConfig,
    ExecutionContext, ExecutionError, LifecycleTask, MarkerId, MetadataTable, MetadataTableBuilder, ResolverRegistry,
    TaskFailure, TaskReport, TestClass, TypeResolver,
};
use common::{Boom, Journal, Recorder, init_tracing, names, step};

// =============================================================================
// Fixtures
// =============================================================================

/// `acme.CalcTests`: two `Before` hooks (one through the composed `acme.Setup`), an unannotated helper, the test
/// and two `After` hooks. Bodies named in `failing` record themselves and fail.
fn calc_class(meta: &mut MetadataTableBuilder, failing: &[&str]) -> TestClass {
    let fails = |name: &str| failing.iter().any(|f| *f == name);
    let fail_test = fails("test");

    meta.annotation_type(AnnotationTypeDef::new("acme.Setup").annotated(AnnotationSpec::marker(MarkerId::Before)));
    ClassBuilder::<Journal>::with_default("acme.CalcTests")
        .method("setup_a", |m| {
            m.annotated(AnnotationSpec::marker(MarkerId::Before))
                .body(step("setup_a", fails("setup_a")))
        })
        .method("setup_b", |m| {
            m.annotated(AnnotationSpec::new("acme.Setup"))
                .body(step("setup_b", fails("setup_b")))
        })
        .method("helper", |m| m.body(step("helper", false)))
        .method("test", |m| {
            m.annotated(AnnotationSpec::marker(MarkerId::Test).with("name", "adds numbers"))
                .body(move |journal, _| {
                    journal.calls.push("test".to_string());
                    if fail_test { Err(Boom("test").into()) } else { Ok(42_i64) }
                })
        })
        .method("teardown_a", |m| {
            m.annotated(AnnotationSpec::marker(MarkerId::After))
                .body(step("teardown_a", fails("teardown_a")))
        })
        .method("teardown_b", |m| {
            m.annotated(AnnotationSpec::marker(MarkerId::After))
                .body(step("teardown_b", fails("teardown_b")))
        })
        .register(meta)
}

struct Outcome {
    result: Result<TaskReport, TaskFailure>,
    journal: Journal,
    recorder: Recorder,
}

fn run_calc(failing: &[&str], policy: AfterHookPolicy) -> Outcome {
    init_tracing();
    let mut meta = MetadataTableBuilder::new();
    let class = calc_class(&mut meta, failing);
    let table = meta.build().unwrap();
    execute(&table, &ResolverRegistry::new(), &class, "test", policy)
}

fn execute(
    table: &MetadataTable,
    registry: &ResolverRegistry,
    class: &TestClass,
    method: &str,
    policy: AfterHookPolicy,
) -> Outcome {
    let method = ElementRef::method(class.element().path(), method);
    let context = ExecutionContext::for_method(table, class.element(), &method).unwrap();
    let task = LifecycleTask::new(table, registry).with_config(EngineConfig::new().with_after_hook_policy(policy));

    let mut journal = Journal::default();
    let mut recorder = Recorder::default();
    let result = task.execute_with_listener(class, &method, &mut journal, &context, &mut recorder);
    Outcome {
        result,
        journal,
        recorder,
    }
}

fn boom_of(error: &ExecutionError) -> Option<&'static str> {
    error.invocation_cause()?.downcast_ref::<Boom>().map(|boom| boom.0)
}

// =============================================================================
// Successful runs
// =============================================================================

#[test]
fn hooks_and_test_run_in_declaration_order() {
    let outcome = run_calc(&[], AfterHookPolicy::OnSuccess);
    let report = outcome.result.unwrap();

    assert_eq!(report.state(), Completed);
    assert_eq!(report.display_name(), "adds numbers");
    assert_eq!(report.result::<i64>(), Some(&42));
    assert_eq!(
        outcome.journal.calls,
        ["setup_a", "setup_b", "test", "teardown_a", "teardown_b"]
    );
    assert_eq!(names(report.invoked()), ["setup_a", "setup_b", "test", "teardown_a", "teardown_b"]);
    assert_eq!(
        outcome.recorder.transitions,
        [
            (Created, BeforeHooksRunning),
            (BeforeHooksRunning, TestRunning),
            (TestRunning, AfterHooksRunning),
            (AfterHooksRunning, Completed),
        ]
    );
    assert_eq!(outcome.recorder.started[1], (BeforeHooksRunning, "setup_b".to_string()));
    assert_eq!(outcome.recorder.started[2], (TestRunning, "test".to_string()));
    assert!(outcome.recorder.failed.is_empty());
}

#[test]
fn run_builds_instance_and_context() {
    let mut meta = MetadataTableBuilder::new();
    let class = calc_class(&mut meta, &[]);
    let table = meta.build().unwrap();
    let registry = ResolverRegistry::new();

    let report = LifecycleTask::new(&table, &registry)
        .run(&class, &ElementRef::method("acme.CalcTests", "test"))
        .unwrap();
    assert_eq!(report.display_name(), "adds numbers");
    assert_eq!(report.into_result().downcast_ref::<i64>(), Some(&42));
}

#[test]
fn hook_parameters_are_resolved() {
    let mut meta = MetadataTableBuilder::new();
    let class = ClassBuilder::<Journal>::with_default("acme.DbTests")
        .method("connect", |m| {
            m.annotated(AnnotationSpec::marker(MarkerId::Before))
                .param::<String>("url")
                .body(|journal, mut args| {
                    journal.calls.push(format!("connect {}", args.take::<String>(0)?));
                    Ok(())
                })
        })
        .method("query", |m| m.annotated(AnnotationSpec::marker(MarkerId::Test)).body(step("query", false)))
        .register(&mut meta);
    let table = meta.build().unwrap();

    let registry = ResolverRegistry::new();
    registry.register(TypeResolver::constant(String::from("mem://")));
    let outcome = execute(&table, &registry, &class, "query", AfterHookPolicy::OnSuccess);
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.journal.calls, ["connect mem://", "query"]);

    let outcome = execute(&table, &ResolverRegistry::new(), &class, "query", AfterHookPolicy::OnSuccess);
    let failure = outcome.result.unwrap_err();
    assert_eq!(failure.phase(), BeforeHooksRunning);
    assert!(matches!(failure.error(), ExecutionError::UnresolvedParameter { .. }));
    assert!(!failure.error().is_test_failure());
    assert!(outcome.journal.calls.is_empty());
}

#[test]
fn superclass_hooks_are_not_discovered() {
    let mut meta = MetadataTableBuilder::new();
    ClassBuilder::<Journal>::with_default("acme.BaseTests")
        .method("base_setup", |m| {
            m.annotated(AnnotationSpec::marker(MarkerId::Before))
                .body(step("base_setup", false))
        })
        .register(&mut meta);
    let child = ClassBuilder::<Journal>::with_default("acme.ChildTests")
        .extends("acme.BaseTests")
        .method("test", |m| m.annotated(AnnotationSpec::marker(MarkerId::Test)).body(step("test", false)))
        .register(&mut meta);
    let table = meta.build().unwrap();

    let outcome = execute(&table, &ResolverRegistry::new(), &child, "test", AfterHookPolicy::OnSuccess);
    assert_eq!(outcome.journal.calls, ["test"]);
}

// =============================================================================
// Failures under the default policy
// =============================================================================

#[test]
fn before_hook_failure_skips_test_and_after_hooks() {
    let outcome = run_calc(&["setup_a"], AfterHookPolicy::OnSuccess);
    let failure = outcome.result.unwrap_err();

    assert_eq!(failure.state(), Failed);
    assert_eq!(failure.phase(), BeforeHooksRunning);
    assert!(failure.error().is_test_failure());
    assert_eq!(boom_of(failure.error()), Some("setup_a"));
    assert!(failure.suppressed().is_empty());
    assert_eq!(names(failure.invoked()), ["setup_a"]);
    assert_eq!(outcome.journal.calls, ["setup_a"]);
    assert_eq!(
        outcome.recorder.transitions,
        [(Created, BeforeHooksRunning), (BeforeHooksRunning, Failed)]
    );
    assert_eq!(outcome.recorder.failed, ["setup_a"]);
}

#[test]
fn test_failure_skips_after_hooks() {
    let outcome = run_calc(&["test"], AfterHookPolicy::OnSuccess);
    let failure = outcome.result.unwrap_err();

    assert_eq!(failure.phase(), TestRunning);
    assert_eq!(boom_of(failure.error()), Some("test"));
    assert_eq!(outcome.journal.calls, ["setup_a", "setup_b", "test"]);
}

#[test]
fn after_hook_failure_stops_remaining_after_hooks() {
    let outcome = run_calc(&["teardown_a"], AfterHookPolicy::OnSuccess);
    let failure = outcome.result.unwrap_err();

    assert_eq!(failure.phase(), AfterHooksRunning);
    assert_eq!(boom_of(failure.error()), Some("teardown_a"));
    assert_eq!(outcome.journal.calls, ["setup_a", "setup_b", "test", "teardown_a"]);
    assert_eq!(outcome.recorder.transitions.last(), Some(&(AfterHooksRunning, Failed)));
}

#[test]
fn failure_message_names_the_phase() {
    let outcome = run_calc(&["setup_b"], AfterHookPolicy::OnSuccess);
    let failure = outcome.result.unwrap_err();

    insta::assert_snapshot!(failure.to_string(), @"test unit failed (before hooks)");
    let source = std::error::Error::source(&failure).unwrap();
    assert_eq!(source.to_string(), "method [acme.CalcTests#setup_b()] failed");
}

// =============================================================================
// Failures under AfterHookPolicy::Always
// =============================================================================

#[test]
fn always_runs_after_hooks_when_before_hook_fails() {
    let outcome = run_calc(&["setup_a"], AfterHookPolicy::Always);
    let failure = outcome.result.unwrap_err();

    assert_eq!(failure.phase(), BeforeHooksRunning);
    assert_eq!(outcome.journal.calls, ["setup_a", "teardown_a", "teardown_b"]);
    assert_eq!(
        outcome.recorder.transitions,
        [
            (Created, BeforeHooksRunning),
            (BeforeHooksRunning, AfterHooksRunning),
            (AfterHooksRunning, Failed),
        ]
    );
}

#[test]
fn always_suppresses_later_after_hook_failures() {
    let outcome = run_calc(&["test", "teardown_a", "teardown_b"], AfterHookPolicy::Always);
    let failure = outcome.result.unwrap_err();

    assert_eq!(failure.phase(), TestRunning);
    assert_eq!(boom_of(failure.error()), Some("test"));
    let suppressed: Vec<_> = failure.suppressed().iter().filter_map(boom_of).collect();
    assert_eq!(suppressed, ["teardown_a", "teardown_b"]);
    assert_eq!(
        outcome.journal.calls,
        ["setup_a", "setup_b", "test", "teardown_a", "teardown_b"]
    );
}

#[test]
fn always_keeps_first_after_hook_failure_as_primary() {
    let outcome = run_calc(&["teardown_a"], AfterHookPolicy::Always);
    let failure = outcome.result.unwrap_err();

    assert_eq!(failure.phase(), AfterHooksRunning);
    assert_eq!(boom_of(failure.error()), Some("teardown_a"));
    assert!(failure.suppressed().is_empty());
    assert_eq!(outcome.journal.calls.last().map(String::as_str), Some("teardown_b"));
}

// =============================================================================
// Panics
// =============================================================================

/// `acme.PanicTests`: one `Before` hook, a test that panics and one `After` hook recording "down".
fn panicking_class(meta: &mut MetadataTableBuilder) -> TestClass {
    ClassBuilder::<Journal>::with_default("acme.PanicTests")
        .method("setup", |m| m.annotated(AnnotationSpec::marker(MarkerId::Before)).body(step("setup", false)))
        .method("test", |m| {
            m.annotated(AnnotationSpec::marker(MarkerId::Test))
                .body(|journal, _| -> Result<(), BoxError> {
                    journal.calls.push("test".to_string());
                    panic!("kaboom")
                })
        })
        .method("teardown", |m| m.annotated(AnnotationSpec::marker(MarkerId::After)).body(step("down", false)))
        .register(meta)
}

struct PanicOutcome {
    result: std::thread::Result<Result<TaskReport, TaskFailure>>,
    journal: Journal,
    recorder: Recorder,
}

fn run_panicking(config: EngineConfig) -> PanicOutcome {
    init_tracing();
    let mut meta = MetadataTableBuilder::new();
    let class = panicking_class(&mut meta);
    let table = meta.build().unwrap();
    let registry = ResolverRegistry::new();
    let method = ElementRef::method("acme.PanicTests", "test");
    let context = ExecutionContext::for_method(&table, class.element(), &method).unwrap();
    let task = LifecycleTask::new(&table, &registry).with_config(config);

    let mut journal = Journal::default();
    let mut recorder = Recorder::default();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        task.execute_with_listener(&class, &method, &mut journal, &context, &mut recorder)
    }));
    PanicOutcome {
        result,
        journal,
        recorder,
    }
}

#[test]
fn always_runs_after_hooks_before_an_uncaught_panic_resumes() {
    let config = EngineConfig::new()
        .with_after_hook_policy(AfterHookPolicy::Always)
        .with_catch_panics(false);
    let outcome = run_panicking(config);

    let payload = outcome.result.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"kaboom"));
    assert_eq!(outcome.journal.calls, ["setup", "test", "down"]);
    assert_eq!(
        outcome.recorder.transitions,
        [
            (Created, BeforeHooksRunning),
            (BeforeHooksRunning, TestRunning),
            (TestRunning, AfterHooksRunning),
        ]
    );
}

#[test]
fn on_success_lets_an_uncaught_panic_skip_after_hooks() {
    let config = EngineConfig::new()
        .with_after_hook_policy(AfterHookPolicy::OnSuccess)
        .with_catch_panics(false);
    let outcome = run_panicking(config);

    assert!(outcome.result.is_err());
    assert_eq!(outcome.journal.calls, ["setup", "test"]);
}

#[test]
fn caught_panic_fails_the_test_and_runs_after_hooks_under_always() {
    let config = EngineConfig::new().with_after_hook_policy(AfterHookPolicy::Always);
    let outcome = run_panicking(config);

    let failure = outcome.result.unwrap().unwrap_err();
    assert_eq!(failure.phase(), TestRunning);
    assert!(failure.error().invocation_cause().is_some_and(|cause| cause.is_panic()));
    assert_eq!(outcome.journal.calls, ["setup", "test", "down"]);
    assert_eq!(outcome.recorder.transitions.last(), Some(&(AfterHooksRunning, Failed)));
}

// =============================================================================
// Invalid input
// =============================================================================

#[test]
fn method_of_another_class_fails_before_any_hook() {
    init_tracing();
    let mut meta = MetadataTableBuilder::new();
    let class = calc_class(&mut meta, &[]);
    let other = ClassBuilder::<Journal>::with_default("acme.OtherTests")
        .method("test", |m| m.body(step("other", false)))
        .register(&mut meta);
    let table = meta.build().unwrap();
    let registry = ResolverRegistry::new();

    let foreign = ElementRef::method(other.element().path(), "test");
    let mut journal = Journal::default();
    let mut recorder = Recorder::default();
    let failure = LifecycleTask::new(&table, &registry)
        .execute_with_listener(&class, &foreign, &mut journal, &ExecutionContext::default(), &mut recorder)
        .unwrap_err();

    assert_eq!(failure.phase(), Created);
    assert!(matches!(failure.error(), ExecutionError::InvalidArgument(_)));
    assert!(failure.invoked().is_empty());
    assert!(journal.calls.is_empty());
    assert_eq!(recorder.transitions, [(Created, Failed)]);
}

#[test]
fn hook_without_body_fails_before_any_hook() {
    let mut meta = MetadataTableBuilder::new();
    let class = ClassBuilder::<Journal>::with_default("acme.BrokenTests")
        .method("setup", |m| m.annotated(AnnotationSpec::marker(MarkerId::Before)).body(step("setup", false)))
        .method("teardown", |m| m.annotated(AnnotationSpec::marker(MarkerId::After)))
        .method("test", |m| m.annotated(AnnotationSpec::marker(MarkerId::Test)).body(step("test", false)))
        .register(&mut meta);
    let table = meta.build().unwrap();

    let outcome = execute(&table, &ResolverRegistry::new(), &class, "test", AfterHookPolicy::OnSuccess);
    let failure = outcome.result.unwrap_err();
    insta::assert_snapshot!(
        failure.error().to_string(),
        @"invalid argument: After hook `acme.BrokenTests#teardown` has no registered body"
    );
    assert!(outcome.journal.calls.is_empty());
}

#[test]
fn wrong_instance_type_fails_before_any_hook() {
    let mut meta = MetadataTableBuilder::new();
    let class = calc_class(&mut meta, &[]);
    let table = meta.build().unwrap();
    let registry = ResolverRegistry::new();

    let failure = LifecycleTask::new(&table, &registry)
        .execute(
            &class,
            &ElementRef::method("acme.CalcTests", "test"),
            &mut String::from("not a journal"),
            &ExecutionContext::default(),
        )
        .unwrap_err();
    assert_eq!(failure.phase(), Created);
    assert!(matches!(failure.error(), ExecutionError::InvalidArgument(_)));
}
