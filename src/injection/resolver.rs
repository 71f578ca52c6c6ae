use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use attest_meta::Parameter;

use crate::context::ExecutionContext;
use crate::reflect::{BoxError, Value};

/// Produces argument values for the parameters it supports.
///
/// ## Notes
///
/// - `supports` must be side-effect free: it is asked about every parameter, including ones another resolver
///   ends up resolving.
/// - `resolve` is only called for parameters this resolver supports, and only when no other resolver does.
pub trait ArgumentResolver: Send + Sync {
    /// Name used in diagnostics. Defaults to the Rust type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn supports(&self, parameter: &Parameter) -> bool;

    fn resolve(&self, parameter: &Parameter, context: &ExecutionContext) -> Result<Value, BoxError>;
}

type Supplier<T> = Box<dyn Fn(&Parameter, &ExecutionContext) -> Result<T, BoxError> + Send + Sync>;

/// Supports parameters declared with type `T` and resolves them with a supplier.
pub struct TypeResolver<T> {
    supplier: Supplier<T>,
}

impl<T: Any + Send> TypeResolver<T> {
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn(&Parameter, &ExecutionContext) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            supplier: Box::new(supplier),
        }
    }

    /// Always resolves to a clone of `value`.
    pub fn constant(value: T) -> Self
    where
        T: Clone + Sync + 'static,
    {
        Self::new(move |_, _| Ok(value.clone()))
    }
}

impl<T: Any + Send> ArgumentResolver for TypeResolver<T> {
    fn supports(&self, parameter: &Parameter) -> bool {
        parameter.is_type::<T>()
    }

    fn resolve(&self, parameter: &Parameter, context: &ExecutionContext) -> Result<Value, BoxError> {
        Ok(Box::new((self.supplier)(parameter, context)?))
    }
}

impl<T> fmt::Debug for TypeResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeResolver")
            .field("type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// Supports parameters declared with type `T` and resolves them to `T::default()`.
pub struct DefaultResolver<T> {
    _type: PhantomData<fn() -> T>,
}

impl<T> DefaultResolver<T> {
    pub fn new() -> Self {
        Self { _type: PhantomData }
    }
}

impl<T> Default for DefaultResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DefaultResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefaultResolver<{}>", std::any::type_name::<T>())
    }
}

impl<T: Any + Send + Default> ArgumentResolver for DefaultResolver<T> {
    fn supports(&self, parameter: &Parameter) -> bool {
        parameter.is_type::<T>()
    }

    fn resolve(&self, _parameter: &Parameter, _context: &ExecutionContext) -> Result<Value, BoxError> {
        Ok(Box::new(T::default()))
    }
}
