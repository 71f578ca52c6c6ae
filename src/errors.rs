//! Framework error taxonomy.
//!
//! Every failure surfaced by the invoker or a lifecycle task is an [`ExecutionError`]. Configuration errors
//! (`UnresolvedParameter`, `AmbiguousResolver`) and resolver failures are distinct from test failures
//! (`InvocationFailed`) so reporters can tell "the test is broken" apart from "the test failed".

use std::fmt;

use attest_meta::{MetadataError, Parameter};
use miette::Diagnostic;
use thiserror::Error;

use crate::reflect::{BoxError, MethodSignature};

/// Convenience alias.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[derive(Debug, Error, Diagnostic)]
pub enum ExecutionError {
    /// Malformed input detected before any side effect.
    #[error("invalid argument: {0}")]
    #[diagnostic(code(attest::invalid_argument))]
    InvalidArgument(String),

    #[error("no ArgumentResolver registered for parameter [{parameter}] in method [{method}]")]
    #[diagnostic(
        code(attest::unresolved_parameter),
        help("register a resolver whose `supports` accepts this parameter")
    )]
    UnresolvedParameter { parameter: Parameter, method: MethodSignature },

    #[error(
        "discovered multiple competing ArgumentResolvers for parameter [{parameter}] in method [{method}]: {}",
        .resolvers.join(", ")
    )]
    #[diagnostic(
        code(attest::ambiguous_resolver),
        help("exactly one registered resolver may support a given parameter")
    )]
    AmbiguousResolver {
        parameter: Parameter,
        method: MethodSignature,
        /// Names of every supporting resolver, sorted.
        resolvers: Vec<String>,
    },

    #[error("failed to resolve parameter [{parameter}] in method [{method}]")]
    #[diagnostic(code(attest::resolution_failed))]
    ResolutionFailed {
        parameter: Parameter,
        method: MethodSignature,
        /// Name of the resolver that failed.
        resolver: String,
        #[source]
        source: BoxError,
    },

    #[error("method [{method}] failed")]
    #[diagnostic(code(attest::invocation_failed))]
    InvocationFailed {
        method: MethodSignature,
        #[source]
        cause: InvocationCause,
    },
}

impl ExecutionError {
    /// Whether the error came from the invoked code rather than from the framework or its configuration.
    pub fn is_test_failure(&self) -> bool {
        matches!(self, Self::InvocationFailed { .. })
    }

    /// The method the error is about, when it concerns one.
    pub fn method(&self) -> Option<&MethodSignature> {
        match self {
            Self::InvalidArgument(_) => None,
            Self::UnresolvedParameter { method, .. }
            | Self::AmbiguousResolver { method, .. }
            | Self::ResolutionFailed { method, .. }
            | Self::InvocationFailed { method, .. } => Some(method),
        }
    }

    /// The parameter the error is about, when it concerns one.
    pub fn parameter(&self) -> Option<&Parameter> {
        match self {
            Self::UnresolvedParameter { parameter, .. }
            | Self::AmbiguousResolver { parameter, .. }
            | Self::ResolutionFailed { parameter, .. } => Some(parameter),
            Self::InvalidArgument(_) | Self::InvocationFailed { .. } => None,
        }
    }

    /// The original cause of an invocation failure.
    pub fn invocation_cause(&self) -> Option<&InvocationCause> {
        match self {
            Self::InvocationFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<MetadataError> for ExecutionError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::InvalidArgument(message) => Self::InvalidArgument(message),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

/// What an invoked body raised.
#[derive(Debug)]
pub enum InvocationCause {
    /// The body returned an error.
    Error(BoxError),
    /// The body panicked; holds the panic message.
    Panic(String),
}

impl InvocationCause {
    /// Downcast the returned error to a concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Error(err) => err.downcast_ref::<E>(),
            Self::Panic(_) => None,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }
}

impl fmt::Display for InvocationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(err) => write!(f, "{err}"),
            Self::Panic(message) => write!(f, "panicked: {message}"),
        }
    }
}

impl std::error::Error for InvocationCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Error(err) => err.source(),
            Self::Panic(_) => None,
        }
    }
}
