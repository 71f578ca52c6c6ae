//! Attest marker vocabulary registries.
//!
//! Callers work with **stable IDs** (e.g. [`markers::MarkerId`]) and look up qualified spellings and metadata via
//! registry tables.
//!
//! ## Notes
//! - Registries are intentionally **pure**: no metadata types, no IO, no side effects.
//!
//! ## Examples
//! ```rust
//! use attest_core::lang::markers::{self, MarkerId};
//!
//! assert_eq!(markers::from_str("attest.api.Before"), Some(MarkerId::Before));
//! assert_eq!(markers::as_str(MarkerId::Before), "attest.api.Before");
//! ```

pub mod markers;
pub mod registry;
