//! Parameter injection.
//!
//! Every parameter of an invoked method must be supported by exactly one [`ArgumentResolver`] in the
//! [`ResolverRegistry`]; the [`MethodInvoker`] enforces that and calls the method with the resolved arguments.

mod invoker;
mod registry;
mod resolver;

pub use invoker::MethodInvoker;
pub use registry::ResolverRegistry;
pub use resolver::{ArgumentResolver, DefaultResolver, TypeResolver};
