use attest_meta::ElementRef;

use super::task::TaskState;
use crate::errors::ExecutionError;

/// Observer for a running [`crate::LifecycleTask`].
///
/// All methods have no-op defaults; implement only what you need.
pub trait TaskListener {
    /// Called on every state change, including the final one.
    fn on_transition(&mut self, _from: TaskState, _to: TaskState) {}

    /// Called before a hook or the test method is invoked.
    fn on_method_started(&mut self, _phase: TaskState, _method: &ElementRef) {}

    /// Called after a hook or the test method returned.
    fn on_method_finished(&mut self, _phase: TaskState, _method: &ElementRef, _error: Option<&ExecutionError>) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl TaskListener for NoopListener {}
