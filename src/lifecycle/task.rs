use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use attest_core::MarkerId;
use attest_meta::search::find_annotated_methods;
use attest_meta::{ElementProvider, ElementRef};
use thiserror::Error;

use super::listener::{NoopListener, TaskListener};
use crate::config::{AfterHookPolicy, EngineConfig};
use crate::context::ExecutionContext;
use crate::errors::ExecutionError;
use crate::injection::{MethodInvoker, ResolverRegistry};
use crate::reflect::{Method, TestClass, Value};

/// Lifecycle state of one test unit.
///
/// `Created → BeforeHooksRunning → TestRunning → AfterHooksRunning → Completed`; any failure ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Created,
    BeforeHooksRunning,
    TestRunning,
    AfterHooksRunning,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::BeforeHooksRunning => "before hooks",
            Self::TestRunning => "test",
            Self::AfterHooksRunning => "after hooks",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a test unit that completed.
#[derive(Debug)]
pub struct TaskReport {
    display_name: String,
    result: Value,
    invoked: Vec<ElementRef>,
}

impl TaskReport {
    pub fn state(&self) -> TaskState {
        TaskState::Completed
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The test method's return value, if it is a `T`.
    pub fn result<T: Any>(&self) -> Option<&T> {
        self.result.downcast_ref::<T>()
    }

    pub fn into_result(self) -> Value {
        self.result
    }

    /// Hooks and test method in invocation order.
    pub fn invoked(&self) -> &[ElementRef] {
        &self.invoked
    }
}

/// Outcome of a test unit that failed.
#[derive(Debug, Error)]
#[error("test unit failed ({phase})")]
pub struct TaskFailure {
    phase: TaskState,
    #[source]
    error: ExecutionError,
    suppressed: Vec<ExecutionError>,
    invoked: Vec<ElementRef>,
}

impl TaskFailure {
    pub fn state(&self) -> TaskState {
        TaskState::Failed
    }

    /// The state the task was in when the primary failure occurred.
    pub fn phase(&self) -> TaskState {
        self.phase
    }

    /// The first failure.
    pub fn error(&self) -> &ExecutionError {
        &self.error
    }

    pub fn into_error(self) -> ExecutionError {
        self.error
    }

    /// After-hook failures that occurred after the primary failure (only under [`AfterHookPolicy::Always`]).
    pub fn suppressed(&self) -> &[ExecutionError] {
        &self.suppressed
    }

    /// Hooks and test method that were invoked, in order, including the one that failed.
    pub fn invoked(&self) -> &[ElementRef] {
        &self.invoked
    }
}

/// Runs one test unit: every `Before` hook in declaration order, the test method, then every `After` hook.
///
/// Hooks are the class's declared methods on which the `Before` / `After` marker is present or meta-present.
/// A failing `Before` hook stops the remaining `Before` hooks and the test method. Whether `After` hooks still run
/// after a failure is governed by [`EngineConfig::after_hook_policy`].
pub struct LifecycleTask<'a, P: ?Sized> {
    provider: &'a P,
    registry: &'a ResolverRegistry,
    config: EngineConfig,
}

struct Plan<'c> {
    test: &'c Method,
    before: Vec<&'c Method>,
    after: Vec<&'c Method>,
}

type PhaseError = (TaskState, ExecutionError);

impl<'a, P> LifecycleTask<'a, P>
where
    P: ElementProvider + ?Sized,
{
    pub fn new(provider: &'a P, registry: &'a ResolverRegistry) -> Self {
        Self {
            provider,
            registry,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `method` on a fresh instance of `class`, with a context built by [`ExecutionContext::for_method`].
    pub fn run(&self, class: &TestClass, method: &ElementRef) -> Result<TaskReport, TaskFailure> {
        self.run_with_listener(class, method, &mut NoopListener)
    }

    pub fn run_with_listener(
        &self,
        class: &TestClass,
        method: &ElementRef,
        listener: &mut dyn TaskListener,
    ) -> Result<TaskReport, TaskFailure> {
        let context = match ExecutionContext::for_method(self.provider, class.element(), method) {
            Ok(context) => context,
            Err(error) => return Err(Run::new(listener).fail(TaskState::Created, error, Vec::new())),
        };
        let mut instance = class.new_instance();
        self.execute_with_listener(class, method, &mut *instance, &context, listener)
    }

    /// Run `method` of `class` on `instance`.
    pub fn execute(
        &self,
        class: &TestClass,
        method: &ElementRef,
        instance: &mut dyn Any,
        context: &ExecutionContext,
    ) -> Result<TaskReport, TaskFailure> {
        self.execute_with_listener(class, method, instance, context, &mut NoopListener)
    }

    #[tracing::instrument(
        skip_all,
        fields(class = %class.element(), method = %method, display_name = context.display_name())
    )]
    pub fn execute_with_listener(
        &self,
        class: &TestClass,
        method: &ElementRef,
        instance: &mut dyn Any,
        context: &ExecutionContext,
        listener: &mut dyn TaskListener,
    ) -> Result<TaskReport, TaskFailure> {
        let mut run = Run::new(listener);
        let plan = match self.plan(class, method, instance) {
            Ok(plan) => plan,
            Err(error) => return Err(run.fail(TaskState::Created, error, Vec::new())),
        };
        let invoker = MethodInvoker::new(self.provider, self.registry).with_config(&self.config);
        let policy = self.config.after_hook_policy;

        let mut outcome = if policy == AfterHookPolicy::Always && !self.config.catch_panics {
            // Panics propagate to the caller, but only after cleanup.
            match panic::catch_unwind(AssertUnwindSafe(|| run.before_and_test(&invoker, &plan, instance, context))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    for error in run.after_hooks(&invoker, &plan.after, instance, context, policy) {
                        tracing::warn!(%error, "after hook failed while a panic was propagating");
                    }
                    panic::resume_unwind(payload)
                }
            }
        } else {
            run.before_and_test(&invoker, &plan, instance, context)
        };

        let mut suppressed = Vec::new();
        if outcome.is_ok() || policy == AfterHookPolicy::Always {
            let mut errors = run.after_hooks(&invoker, &plan.after, instance, context, policy).into_iter();
            let first = if outcome.is_ok() { errors.next() } else { None };
            if let Some(error) = first {
                outcome = Err((TaskState::AfterHooksRunning, error));
            }
            suppressed.extend(errors);
        } else if !plan.after.is_empty() {
            tracing::warn!(skipped = plan.after.len(), "after hooks skipped because an earlier phase failed");
        }

        match outcome {
            Ok(result) => {
                run.enter(TaskState::Completed);
                Ok(TaskReport {
                    display_name: context.display_name().to_string(),
                    result,
                    invoked: run.invoked,
                })
            }
            Err((phase, error)) => Err(run.fail(phase, error, suppressed)),
        }
    }

    /// Validate inputs and discover hooks before anything is invoked.
    fn plan<'c>(
        &self,
        class: &'c TestClass,
        method: &ElementRef,
        instance: &dyn Any,
    ) -> Result<Plan<'c>, ExecutionError> {
        if !self.provider.contains(class.element()) {
            return Err(ExecutionError::InvalidArgument(format!(
                "class `{}` is not known to the element provider",
                class.element()
            )));
        }
        if method.declaring_class() != Some(class.element().path()) {
            return Err(ExecutionError::InvalidArgument(format!(
                "`{method}` is not a method of `{}`",
                class.element()
            )));
        }
        let test = class.method(method).ok_or_else(|| {
            ExecutionError::InvalidArgument(format!("method `{method}` has no registered body"))
        })?;
        if !test.accepts(instance) {
            return Err(ExecutionError::InvalidArgument(format!(
                "instance is not a `{}`",
                test.target_type_name()
            )));
        }

        Ok(Plan {
            test,
            before: self.hooks(class, MarkerId::Before)?,
            after: self.hooks(class, MarkerId::After)?,
        })
    }

    fn hooks<'c>(&self, class: &'c TestClass, marker: MarkerId) -> Result<Vec<&'c Method>, ExecutionError> {
        find_annotated_methods(self.provider, class.element(), &ElementRef::marker(marker))?
            .iter()
            .map(|hook| {
                class.method(hook).ok_or_else(|| {
                    ExecutionError::InvalidArgument(format!("{marker:?} hook `{hook}` has no registered body"))
                })
            })
            .collect()
    }
}

/// Mutable bookkeeping for one execution.
struct Run<'l> {
    state: TaskState,
    listener: &'l mut dyn TaskListener,
    invoked: Vec<ElementRef>,
}

impl<'l> Run<'l> {
    fn new(listener: &'l mut dyn TaskListener) -> Self {
        Self {
            state: TaskState::Created,
            listener,
            invoked: Vec::new(),
        }
    }

    fn enter(&mut self, to: TaskState) {
        tracing::debug!(from = %self.state, to = %to, "lifecycle transition");
        self.listener.on_transition(self.state, to);
        self.state = to;
    }

    fn fail(mut self, phase: TaskState, error: ExecutionError, suppressed: Vec<ExecutionError>) -> TaskFailure {
        self.enter(TaskState::Failed);
        TaskFailure {
            phase,
            error,
            suppressed,
            invoked: self.invoked,
        }
    }

    fn invoke<P: ElementProvider + ?Sized>(
        &mut self,
        invoker: &MethodInvoker<'_, P>,
        method: &Method,
        instance: &mut dyn Any,
        context: &ExecutionContext,
    ) -> Result<Value, ExecutionError> {
        let element = method.element();
        self.listener.on_method_started(self.state, element);
        self.invoked.push(element.clone());
        let outcome = invoker.invoke(method, instance, context);
        self.listener.on_method_finished(self.state, element, outcome.as_ref().err());
        outcome
    }

    /// Run `After` hooks and return their failures in order. Under `OnSuccess` the first failure stops the rest.
    fn after_hooks<P: ElementProvider + ?Sized>(
        &mut self,
        invoker: &MethodInvoker<'_, P>,
        hooks: &[&Method],
        instance: &mut dyn Any,
        context: &ExecutionContext,
        policy: AfterHookPolicy,
    ) -> Vec<ExecutionError> {
        self.enter(TaskState::AfterHooksRunning);
        let mut errors = Vec::new();
        for hook in hooks {
            if let Err(error) = self.invoke(invoker, hook, instance, context) {
                errors.push(error);
                if policy == AfterHookPolicy::OnSuccess {
                    break;
                }
            }
        }
        errors
    }

    fn before_and_test<P: ElementProvider + ?Sized>(
        &mut self,
        invoker: &MethodInvoker<'_, P>,
        plan: &Plan<'_>,
        instance: &mut dyn Any,
        context: &ExecutionContext,
    ) -> Result<Value, PhaseError> {
        self.enter(TaskState::BeforeHooksRunning);
        for hook in &plan.before {
            self.invoke(invoker, hook, instance, context)
                .map_err(|error| (TaskState::BeforeHooksRunning, error))?;
        }
        self.enter(TaskState::TestRunning);
        self.invoke(invoker, plan.test, instance, context)
            .map_err(|error| (TaskState::TestRunning, error))
    }
}
