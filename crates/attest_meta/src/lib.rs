//! Program-element metadata and meta-annotation search for the Attest execution core.
//!
//! The crate has two halves:
//! - a read-only metadata model ([`ElementRef`], [`Annotation`], [`Parameter`]) served through the
//!   [`ElementProvider`] trait, with [`MetadataTable`] as the registration-based provider, and
//! - the annotation resolver ([`search`]), which finds an annotation that is *present* or *meta-present* on an
//!   element, terminating on cyclic meta-annotation graphs.
//!
//! ## Examples
//! ```rust
//! use attest_core::MarkerId;
//! use attest_meta::{AnnotationSpec, AnnotationTypeDef, ClassDef, ElementRef, MethodDef, MetadataTableBuilder};
//! use attest_meta::search::find_annotation;
//!
//! let mut builder = MetadataTableBuilder::new();
//! builder
//!     .annotation_type(AnnotationTypeDef::new("acme.Setup").annotated(AnnotationSpec::marker(MarkerId::Before)))
//!     .class(ClassDef::new("acme.CalcTests"))
//!     .method(MethodDef::new("acme.CalcTests", "init").annotated(AnnotationSpec::new("acme.Setup")));
//! let table = builder.build().unwrap();
//!
//! let init = ElementRef::method("acme.CalcTests", "init");
//! let before = ElementRef::marker(MarkerId::Before);
//! assert!(find_annotation(&table, &init, &before).unwrap().is_some());
//! ```

pub mod annotation;
pub mod element;
pub mod errors;
pub mod provider;
pub mod search;
pub mod table;

pub use annotation::{Annotation, AnnotationId, AnnotationSpec, AttributeValue};
pub use element::{ElementKind, ElementRef, Parameter};
pub use errors::MetadataError;
pub use provider::ElementProvider;
pub use table::{AnnotationTypeDef, ClassDef, MetadataTable, MetadataTableBuilder, MethodDef, ParameterDef};
