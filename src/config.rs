//! Engine configuration.
//!
//! There are no environment variables or config files at this layer; the hosting engine builds an
//! [`EngineConfig`] and hands it to each [`crate::LifecycleTask`].

/// What happens to `After` hooks when a `Before` hook or the test method fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterHookPolicy {
    /// Run `After` hooks only when every `Before` hook and the test method succeeded; stop at the first failing
    /// `After` hook.
    #[default]
    OnSuccess,
    /// Run every `After` hook on every exit path once `Before` hooks have started, even after a failure. The first
    /// failure is reported; later ones are attached as suppressed. When panics are not caught, a panic in a
    /// `Before` hook or the test method still runs the `After` hooks before it resumes unwinding.
    Always,
}

/// Execution configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// After-hook behavior on failure
    pub after_hook_policy: AfterHookPolicy,
    /// Whether panics in invoked bodies become `InvocationFailed` instead of unwinding through the engine
    pub catch_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            after_hook_policy: AfterHookPolicy::OnSuccess,
            catch_panics: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the after-hook policy
    pub fn with_after_hook_policy(mut self, policy: AfterHookPolicy) -> Self {
        self.after_hook_policy = policy;
        self
    }

    /// Set whether panics are caught
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }
}
