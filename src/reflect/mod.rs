//! Invocable methods and test classes.
//!
//! Rust has no runtime reflection, so a test class is registered twice over: its metadata goes into a
//! [`attest_meta::MetadataTableBuilder`] and its method bodies into a [`TestClass`]. [`ClassBuilder`] does both in
//! one pass so the two never drift apart.

mod class;
mod signature;
mod value;

pub use class::{ClassBuilder, Method, MethodBuilder, TestClass};
pub use signature::MethodSignature;
pub use value::{ArgumentError, Arguments, BoxError, Value};
