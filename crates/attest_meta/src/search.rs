//! Meta-annotation search.
//!
//! An annotation type `A` is *present* on an element when the element declares it, and *meta-present* when some
//! annotation on the element has a type on which `A` is present or meta-present. The search is depth-first and
//! terminates on cyclic graphs: each annotation instance is entered at most once per top-level call.
//!
//! Priority, highest first:
//! 1. `A` declared directly on the element
//! 2. `A` meta-present through a declared annotation (in declaration order)
//! 3. `A` visible on the element (inherited, or folded into a container)
//! 4. `A` meta-present through a visible annotation
//!
//! Annotations whose type lives in the reserved annotation-definition namespace are never entered.

use std::collections::HashSet;

use attest_core::MarkerId;

use crate::annotation::{Annotation, AnnotationId};
use crate::element::{ElementKind, ElementRef};
use crate::errors::MetadataError;
use crate::provider::ElementProvider;


/// Find an annotation of `annotation_type` that is present or meta-present on `element`.
///
/// Returns `Ok(None)` when no such annotation exists. Fails with [`MetadataError::InvalidArgument`], before any
/// traversal, when `element` is unknown to `provider` or `annotation_type` is not an annotation type.
#[tracing::instrument(level = "trace", skip_all, fields(element = %element, annotation_type = %annotation_type))]
pub fn find_annotation<P>(
    provider: &P,
    element: &ElementRef,
    annotation_type: &ElementRef,
) -> Result<Option<Annotation>, MetadataError>
where
    P: ElementProvider + ?Sized,
{
    require_known(provider, element)?;
    require_annotation_type(annotation_type)?;

    let mut visited = HashSet::new();
    let found = find_in(provider, element, annotation_type, &mut visited);
    tracing::trace!(found = found.is_some(), visited = visited.len(), "annotation search finished");
    Ok(found)
}

/// Whether `annotation_type` is present or meta-present on `element`.
pub fn is_annotated<P>(provider: &P, element: &ElementRef, annotation_type: &ElementRef) -> Result<bool, MetadataError>
where
    P: ElementProvider + ?Sized,
{
    Ok(find_annotation(provider, element, annotation_type)?.is_some())
}

/// [`find_annotation`] for a built-in marker.
pub fn find_marker<P>(provider: &P, element: &ElementRef, marker: MarkerId) -> Result<Option<Annotation>, MetadataError>
where
    P: ElementProvider + ?Sized,
{
    find_annotation(provider, element, &ElementRef::marker(marker))
}

/// Methods declared on `class` on which `annotation_type` is present or meta-present, in declaration order.
///
/// Only the class's own declared methods are scanned.
pub fn find_annotated_methods<P>(
    provider: &P,
    class: &ElementRef,
    annotation_type: &ElementRef,
) -> Result<Vec<ElementRef>, MetadataError>
where
    P: ElementProvider + ?Sized,
{
    if class.kind() != ElementKind::Class {
        return Err(MetadataError::InvalidArgument(format!(
            "`{class}` is a {}, not a class",
            class.kind()
        )));
    }
    require_known(provider, class)?;
    require_annotation_type(annotation_type)?;

    let methods = provider
        .declared_methods(class)
        .iter()
        .filter(|method| {
            let mut visited = HashSet::new();
            find_in(provider, method, annotation_type, &mut visited).is_some()
        })
        .cloned()
        .collect();
    Ok(methods)
}

fn require_known<P>(provider: &P, element: &ElementRef) -> Result<(), MetadataError>
where
    P: ElementProvider + ?Sized,
{
    if provider.contains(element) {
        Ok(())
    } else {
        Err(MetadataError::InvalidArgument(format!(
            "{} `{element}` is not known to the element provider",
            element.kind()
        )))
    }
}

fn require_annotation_type(annotation_type: &ElementRef) -> Result<(), MetadataError> {
    if annotation_type.kind() == ElementKind::AnnotationType {
        Ok(())
    } else {
        Err(MetadataError::InvalidArgument(format!(
            "`{annotation_type}` is a {}, not an annotation type",
            annotation_type.kind()
        )))
    }
}

fn find_in<P>(
    provider: &P,
    element: &ElementRef,
    annotation_type: &ElementRef,
    visited: &mut HashSet<AnnotationId>,
) -> Option<Annotation>
where
    P: ElementProvider + ?Sized,
{
    let declared = provider.declared_annotations(element);
    if let Some(direct) = declared.iter().find(|a| a.is_of(annotation_type)) {
        return Some(direct.clone());
    }
    if let Some(meta) = find_meta(provider, declared, annotation_type, visited) {
        return Some(meta);
    }

    let visible = provider.visible_annotations(element);
    if let Some(indirect) = visible.iter().find(|a| a.is_of(annotation_type)) {
        return Some(indirect.clone());
    }
    find_meta(provider, visible, annotation_type, visited)
}

fn find_meta<P>(
    provider: &P,
    candidates: &[Annotation],
    annotation_type: &ElementRef,
    visited: &mut HashSet<AnnotationId>,
) -> Option<Annotation>
where
    P: ElementProvider + ?Sized,
{
    for candidate in candidates {
        if provider.is_reserved(candidate) || !visited.insert(candidate.id()) {
            continue;
        }
        if let Some(found) = find_in(provider, candidate.annotation_type(), annotation_type, visited) {
            return Some(found);
        }
    }
    None
}
