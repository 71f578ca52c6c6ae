//! Attest execution core.
//!
//! Given a test class registered with its metadata, this crate runs one test unit: it discovers lifecycle hooks
//! through meta-annotation search, resolves every method parameter through exactly one registered
//! [`ArgumentResolver`], and invokes `Before` hooks, the test method and `After` hooks in order.
//!
//! ## Layout
//!
//! - [`reflect`]: invocable methods and test classes (the Rust stand-in for runtime reflection)
//! - [`injection`]: resolver registry, resolvers, and the [`MethodInvoker`]
//! - [`lifecycle`]: the [`LifecycleTask`] state machine
//! - [`errors`]: the framework error taxonomy
//!
//! Metadata and annotation search live in `attest_meta`; marker spellings in `attest_core`.
//!
//! ## Panic Policy
//!
//! - **Library code**: `Result` with `?`; `#![deny(clippy::unwrap_used)]` and `#![deny(clippy::expect_used)]`.
//! - **Invoked code**: panics raised by test or hook bodies are caught (see [`EngineConfig::catch_panics`]) and
//!   reported as [`ExecutionError::InvocationFailed`].
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! ## Examples
//! ```rust
//! use attest::{
//!     AnnotationSpec, ClassBuilder, ElementRef, LifecycleTask, MarkerId, MetadataTableBuilder, ResolverRegistry,
//!     TypeResolver,
//! };
//!
//! #[derive(Default)]
//! struct GreeterTests {
//!     greeting: String,
//! }
//!
//! let mut meta = MetadataTableBuilder::new();
//! let class = ClassBuilder::<GreeterTests>::with_default("acme.GreeterTests")
//!     .method("setup", |m| {
//!         m.annotated(AnnotationSpec::marker(MarkerId::Before))
//!             .param::<String>("greeting")
//!             .body(|this, mut args| {
//!                 this.greeting = args.take::<String>(0)?;
//!                 Ok(())
//!             })
//!     })
//!     .method("greets", |m| {
//!         m.annotated(AnnotationSpec::marker(MarkerId::Test))
//!             .body(|this, _| Ok(format!("{}, world", this.greeting)))
//!     })
//!     .register(&mut meta);
//! let table = meta.build().unwrap();
//!
//! let registry = ResolverRegistry::new();
//! registry.register(TypeResolver::constant(String::from("hello")));
//!
//! let report = LifecycleTask::new(&table, &registry)
//!     .run(&class, &ElementRef::method("acme.GreeterTests", "greets"))
//!     .unwrap();
//! assert_eq!(report.result::<String>().map(String::as_str), Some("hello, world"));
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod context;
pub mod errors;
pub mod injection;
pub mod lifecycle;
pub mod reflect;

pub use attest_core::MarkerId;
pub use attest_meta::{
    Annotation, AnnotationSpec, AnnotationTypeDef, ClassDef, ElementKind, ElementProvider, ElementRef, MetadataError,
    MetadataTable, MetadataTableBuilder, MethodDef, Parameter, ParameterDef,
};

pub use config::{AfterHookPolicy, EngineConfig};
pub use context::ExecutionContext;
pub use errors::{ExecutionError, ExecutionResult, InvocationCause};
pub use injection::{ArgumentResolver, DefaultResolver, MethodInvoker, ResolverRegistry, TypeResolver};
pub use lifecycle::{LifecycleTask, TaskFailure, TaskListener, TaskReport, TaskState};
pub use reflect::{Arguments, BoxError, ClassBuilder, Method, MethodBuilder, MethodSignature, TestClass, Value};
