//! The element provider boundary.
//!
//! Everything the annotation resolver and the invoker know about program elements comes through
//! [`ElementProvider`]. [`crate::MetadataTable`] is the registration-based implementation; hosts with their own
//! metadata source implement the trait directly.

use attest_core::is_reserved_type_name;

use crate::annotation::Annotation;
use crate::element::{ElementRef, Parameter};

/// Read-only view over program elements and their annotations.
///
/// Unknown elements yield empty slices; only [`ElementProvider::contains`] distinguishes them.
pub trait ElementProvider {
    /// Whether the provider knows `element`.
    fn contains(&self, element: &ElementRef) -> bool;

    /// Annotations declared directly on `element`, in declaration order.
    fn declared_annotations(&self, element: &ElementRef) -> &[Annotation];

    /// Declared annotations plus inherited ones (repeated annotations folded into their container).
    fn visible_annotations(&self, element: &ElementRef) -> &[Annotation];

    /// Methods declared on `class`, in declaration order.
    fn declared_methods(&self, class: &ElementRef) -> &[ElementRef];

    /// Parameters of `method`, in declaration order.
    fn parameters(&self, method: &ElementRef) -> &[Parameter];

    /// Whether the annotation's defining type lives in the reserved annotation-definition namespace.
    fn is_reserved(&self, annotation: &Annotation) -> bool {
        is_reserved_type_name(annotation.type_name())
    }
}
