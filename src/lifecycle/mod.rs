//! Test-unit lifecycle: `Before` hooks, the test method, `After` hooks.

mod listener;
mod task;

pub use listener::{NoopListener, TaskListener};
pub use task::{LifecycleTask, TaskFailure, TaskReport, TaskState};
