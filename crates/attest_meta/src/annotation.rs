//! Applied annotations and their attribute values.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use attest_core::MarkerId;
use attest_core::lang::markers;

use crate::element::ElementRef;

/// Identity of one applied annotation instance, assigned by the metadata table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(pub(crate) u32);

/// Value of an annotation attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(Arc<str>),
    Int(i64),
    Bool(bool),
    List(Vec<AttributeValue>),
    /// Annotations held by a container (produced when repeatable annotations are folded).
    Annotations(Vec<Annotation>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_annotations(&self) -> Option<&[Annotation]> {
        match self {
            AttributeValue::Annotations(list) => Some(list),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.into())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value.into())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => write!(f, "{s:?}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AttributeValue::Annotations(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// An annotation before it is registered: a type name plus attributes.
///
/// Specs carry no identity; the metadata table turns each spec into a distinct [`Annotation`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSpec {
    pub(crate) type_name: Arc<str>,
    pub(crate) attributes: Vec<(Arc<str>, AttributeValue)>,
}

impl AnnotationSpec {
    pub fn new(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn marker(id: MarkerId) -> Self {
        Self::new(markers::as_str(id))
    }

    /// Set an attribute; a later value for the same name replaces the earlier one.
    pub fn with(mut self, name: impl Into<Arc<str>>, value: impl Into<AttributeValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|(n, _)| &**n == name).map(|(_, v)| v)
    }

    pub(crate) fn is_marker(&self, id: MarkerId) -> bool {
        &*self.type_name == markers::as_str(id)
    }
}

#[derive(Debug)]
struct AnnotationData {
    id: AnnotationId,
    annotation_type: ElementRef,
    attributes: Vec<(Arc<str>, AttributeValue)>,
}

/// One applied annotation.
///
/// Equality and hashing use the instance identity, never the attribute values: two `@Tag("x")` applied to
/// different elements are different annotations.
#[derive(Clone)]
pub struct Annotation(Arc<AnnotationData>);

impl Annotation {
    pub(crate) fn new(
        id: AnnotationId,
        annotation_type: ElementRef,
        attributes: Vec<(Arc<str>, AttributeValue)>,
    ) -> Self {
        Self(Arc::new(AnnotationData {
            id,
            annotation_type,
            attributes,
        }))
    }

    pub fn id(&self) -> AnnotationId {
        self.0.id
    }

    /// The annotation's defining type, itself an annotatable element.
    pub fn annotation_type(&self) -> &ElementRef {
        &self.0.annotation_type
    }

    pub fn type_name(&self) -> &str {
        self.0.annotation_type.path()
    }

    pub fn is_of(&self, annotation_type: &ElementRef) -> bool {
        &self.0.annotation_type == annotation_type
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.0.attributes.iter().find(|(n, _)| &**n == name).map(|(_, v)| v)
    }

    pub fn str_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(AttributeValue::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.attributes.iter().map(|(n, v)| (&**n, v))
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Annotation {}

impl Hash for Annotation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.type_name())?;
        if !self.0.attributes.is_empty() {
            let parts: Vec<String> = self.attributes().map(|(n, v)| format!("{n} = {v}")).collect();
            write!(f, "({})", parts.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self, self.0.id.0)
    }
}
