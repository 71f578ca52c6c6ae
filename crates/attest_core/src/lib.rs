//! Provide the canonical marker vocabulary shared by the Attest metadata store and execution core.
//!
//! This crate is intentionally tiny and dependency-free. It names the built-in markers (`Test`, `Before`, `After`,
//! ...) and the reserved annotation-definition namespace, so the metadata crate and the engine agree on spellings
//! without stringly-typed comparisons scattered across both.
//!
//! ## Notes
//!
//! - This is a "vocabulary" crate: **no IO**, no global state, no metadata types.
//! - Markers are identified by stable ids ([`lang::markers::MarkerId`]); qualified spellings live in a `const` table.

pub mod lang;

pub use lang::markers::{MarkerId, RESERVED_NAMESPACE, is_reserved_type_name};
