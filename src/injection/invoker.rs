use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use attest_meta::{ElementKind, ElementProvider, Parameter};
use thiserror::Error;

use super::registry::ResolverRegistry;
use super::resolver::ArgumentResolver;
use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::errors::{ExecutionError, InvocationCause};
use crate::reflect::{Arguments, BoxError, Method, MethodSignature, Value};

/// Invokes methods with every parameter resolved through the [`ResolverRegistry`].
///
/// ## Notes
///
/// - Parameters are resolved in declaration order; the first failure aborts the invocation and the method is not
///   called.
/// - Only the single supporting resolver's `resolve` is called for a parameter.
/// - A resolved value whose type differs from the parameter's declared type is a `ResolutionFailed`.
/// - With `catch_panics`, a panic in `supports` or `resolve` is a `ResolutionFailed` naming that resolver.
/// - The resolver set is snapshotted once per invocation.
pub struct MethodInvoker<'a, P: ?Sized> {
    provider: &'a P,
    registry: &'a ResolverRegistry,
    catch_panics: bool,
}

impl<'a, P> MethodInvoker<'a, P>
where
    P: ElementProvider + ?Sized,
{
    pub fn new(provider: &'a P, registry: &'a ResolverRegistry) -> Self {
        Self {
            provider,
            registry,
            catch_panics: EngineConfig::default().catch_panics,
        }
    }

    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.catch_panics = config.catch_panics;
        self
    }

    /// Resolve all parameters of `method` and call it on `target`.
    ///
    /// Returns the method's return value. Fails with:
    /// - `InvalidArgument` when the method is unknown to the provider or `target` is not an instance of the
    ///   declaring type,
    /// - `UnresolvedParameter` / `AmbiguousResolver` when a parameter has zero or several supporting resolvers,
    /// - `ResolutionFailed` when the supporting resolver fails, panics or returns a value of the wrong type,
    /// - `InvocationFailed` when the method body returns an error or panics.
    #[tracing::instrument(skip_all, fields(method = %method.element()))]
    pub fn invoke(
        &self,
        method: &Method,
        target: &mut dyn Any,
        context: &ExecutionContext,
    ) -> Result<Value, ExecutionError> {
        if !method.accepts(target) {
            return Err(ExecutionError::InvalidArgument(format!(
                "cannot invoke `{}` on an instance that is not a `{}`",
                method.element(),
                method.target_type_name()
            )));
        }
        let signature = self.signature(method)?;
        let arguments = self.resolve_arguments(&signature, context)?;
        self.call(method, signature, target, arguments)
    }

    /// Resolve one argument per declared parameter of `signature`, in order.
    pub fn resolve_arguments(
        &self,
        signature: &MethodSignature,
        context: &ExecutionContext,
    ) -> Result<Arguments, ExecutionError> {
        let resolvers = self.registry.all();
        let values = signature
            .parameters()
            .iter()
            .map(|parameter| resolve_argument(parameter, signature, &resolvers, context, self.catch_panics))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arguments::new(values))
    }

    fn signature(&self, method: &Method) -> Result<MethodSignature, ExecutionError> {
        let element = method.element();
        if element.kind() != ElementKind::Method || !self.provider.contains(element) {
            return Err(ExecutionError::InvalidArgument(format!(
                "method `{element}` is not known to the element provider"
            )));
        }
        Ok(MethodSignature::of(self.provider, element))
    }

    fn call(
        &self,
        method: &Method,
        signature: MethodSignature,
        target: &mut dyn Any,
        arguments: Arguments,
    ) -> Result<Value, ExecutionError> {
        let outcome = if self.catch_panics {
            match panic::catch_unwind(AssertUnwindSafe(|| method.call(target, arguments))) {
                Ok(result) => result.map_err(InvocationCause::Error),
                Err(payload) => Err(InvocationCause::Panic(panic_message(&*payload))),
            }
        } else {
            method.call(target, arguments).map_err(InvocationCause::Error)
        };

        outcome.map_err(|cause| {
            tracing::debug!(method = %signature, %cause, "invocation failed");
            ExecutionError::InvocationFailed {
                method: signature,
                cause,
            }
        })
    }
}

/// Failures inside a resolver that are not errors it returned.
#[derive(Debug, Error)]
enum ResolverFault {
    #[error("panicked: {0}")]
    Panicked(String),

    #[error("resolved value is not a `{expected}`")]
    TypeMismatch { expected: String },
}

fn resolve_argument(
    parameter: &Parameter,
    signature: &MethodSignature,
    resolvers: &[Arc<dyn ArgumentResolver>],
    context: &ExecutionContext,
    catch_panics: bool,
) -> Result<Value, ExecutionError> {
    let failed = |resolver: &str, source: BoxError| ExecutionError::ResolutionFailed {
        parameter: parameter.clone(),
        method: signature.clone(),
        resolver: resolver.to_string(),
        source,
    };

    let mut matching: Vec<&Arc<dyn ArgumentResolver>> = Vec::new();
    for resolver in resolvers {
        let supported = guarded(catch_panics, || resolver.supports(parameter))
            .map_err(|fault| failed(resolver.name(), fault.into()))?;
        if supported {
            matching.push(resolver);
        }
    }

    match matching.as_slice() {
        [] => Err(ExecutionError::UnresolvedParameter {
            parameter: parameter.clone(),
            method: signature.clone(),
        }),
        [resolver] => {
            tracing::debug!(parameter = %parameter, resolver = resolver.name(), "resolving argument");
            let value = guarded(catch_panics, || resolver.resolve(parameter, context))
                .map_err(BoxError::from)
                .and_then(|resolved| resolved)
                .map_err(|source| failed(resolver.name(), source))?;
            check_declared_type(parameter, &value).map_err(|fault| failed(resolver.name(), fault.into()))?;
            Ok(value)
        }
        competing => {
            let mut names: Vec<String> = competing.iter().map(|r| r.name().to_string()).collect();
            names.sort();
            Err(ExecutionError::AmbiguousResolver {
                parameter: parameter.clone(),
                method: signature.clone(),
                resolvers: names,
            })
        }
    }
}

/// Run resolver code, turning a panic into a [`ResolverFault`] when panics are caught.
fn guarded<T>(catch_panics: bool, f: impl FnOnce() -> T) -> Result<T, ResolverFault> {
    if !catch_panics {
        return Ok(f());
    }
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| ResolverFault::Panicked(panic_message(&*payload)))
}

fn check_declared_type(parameter: &Parameter, value: &Value) -> Result<(), ResolverFault> {
    match parameter.declared_type() {
        Some(expected) if (**value).type_id() != expected => Err(ResolverFault::TypeMismatch {
            expected: parameter.type_name().to_string(),
        }),
        _ => Ok(()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
