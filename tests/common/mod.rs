//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use attest::{Arguments, BoxError, ElementRef, ExecutionError, TaskListener, TaskState};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness. Set `RUST_LOG=attest=debug` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test-class instance that records which bodies ran.
#[derive(Debug, Default)]
pub struct Journal {
    pub calls: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0} failed")]
pub struct Boom(pub &'static str);

/// Body that records `name` and then succeeds or fails with [`Boom`].
pub fn step(
    name: &'static str,
    fails: bool,
) -> impl Fn(&mut Journal, Arguments) -> Result<(), BoxError> + Send + Sync + 'static {
    move |journal, _| {
        journal.calls.push(name.to_string());
        if fails { Err(Boom(name).into()) } else { Ok(()) }
    }
}

/// Body that records `name` and succeeds.
pub fn record(name: &'static str) -> impl Fn(&mut Journal, Arguments) -> Result<(), BoxError> + Send + Sync + 'static {
    step(name, false)
}

/// Body that records `name` and fails with [`Boom`].
pub fn fail(name: &'static str) -> impl Fn(&mut Journal, Arguments) -> Result<(), BoxError> + Send + Sync + 'static {
    step(name, true)
}

/// Listener that keeps every event.
#[derive(Debug, Default)]
pub struct Recorder {
    pub transitions: Vec<(TaskState, TaskState)>,
    pub started: Vec<(TaskState, String)>,
    pub failed: Vec<String>,
}

impl TaskListener for Recorder {
    fn on_transition(&mut self, from: TaskState, to: TaskState) {
        self.transitions.push((from, to));
    }

    fn on_method_started(&mut self, phase: TaskState, method: &ElementRef) {
        self.started.push((phase, method.simple_name().to_string()));
    }

    fn on_method_finished(&mut self, _phase: TaskState, method: &ElementRef, error: Option<&ExecutionError>) {
        if error.is_some() {
            self.failed.push(method.simple_name().to_string());
        }
    }
}

/// Simple names of `elements`.
pub fn names(elements: &[ElementRef]) -> Vec<&str> {
    elements.iter().map(ElementRef::simple_name).collect()
}
