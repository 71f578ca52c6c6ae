//! Program-element handles.
//!
//! Elements are addressed by qualified paths:
//! - classes and annotation types: `acme.CalcTests`, `acme.Fast`
//! - methods: `acme.CalcTests#add`
//! - parameters: `acme.CalcTests#add[0]`

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use attest_core::MarkerId;
use attest_core::lang::markers;

/// What kind of program element a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Class,
    AnnotationType,
    Method,
    Parameter,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Class => write!(f, "class"),
            ElementKind::AnnotationType => write!(f, "annotation type"),
            ElementKind::Method => write!(f, "method"),
            ElementKind::Parameter => write!(f, "parameter"),
        }
    }
}

/// Opaque, cheaply clonable handle to a class, annotation type, method or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef {
    kind: ElementKind,
    path: Arc<str>,
}

impl ElementRef {
    pub fn class(path: impl Into<Arc<str>>) -> Self {
        Self {
            kind: ElementKind::Class,
            path: path.into(),
        }
    }

    pub fn annotation_type(path: impl Into<Arc<str>>) -> Self {
        Self {
            kind: ElementKind::AnnotationType,
            path: path.into(),
        }
    }

    /// Handle for a built-in marker's annotation type.
    pub fn marker(id: MarkerId) -> Self {
        Self::annotation_type(markers::as_str(id))
    }

    pub fn method(class: &str, name: &str) -> Self {
        Self {
            kind: ElementKind::Method,
            path: format!("{class}#{name}").into(),
        }
    }

    pub fn parameter(method: &ElementRef, index: usize) -> Self {
        Self {
            kind: ElementKind::Parameter,
            path: format!("{}[{index}]", method.path).into(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The last path segment: `CalcTests` for a class, `add` for a method, `add[0]` for a parameter.
    pub fn simple_name(&self) -> &str {
        let path: &str = &self.path;
        match self.kind {
            ElementKind::Method | ElementKind::Parameter => path.rsplit('#').next().unwrap_or(path),
            ElementKind::Class | ElementKind::AnnotationType => path.rsplit('.').next().unwrap_or(path),
        }
    }

    /// For a method or parameter, the path of the declaring class.
    pub fn declaring_class(&self) -> Option<&str> {
        match self.kind {
            ElementKind::Method | ElementKind::Parameter => self.path.split('#').next(),
            ElementKind::Class | ElementKind::AnnotationType => None,
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    element: ElementRef,
    method: ElementRef,
    index: usize,
    name: Arc<str>,
    type_name: Arc<str>,
    declared_type: Option<TypeId>,
}

impl Parameter {
    pub fn new(method: &ElementRef, index: usize, name: impl Into<Arc<str>>, type_name: impl Into<Arc<str>>) -> Self {
        Self {
            element: ElementRef::parameter(method, index),
            method: method.clone(),
            index,
            name: name.into(),
            type_name: type_name.into(),
            declared_type: None,
        }
    }

    /// Record the Rust type the parameter was declared with.
    pub fn with_declared_type(mut self, declared_type: TypeId) -> Self {
        self.declared_type = Some(declared_type);
        self
    }

    /// Handle used to look up the parameter's own annotations.
    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    pub fn method(&self) -> &ElementRef {
        &self.method
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified Rust type path, as produced by [`std::any::type_name`].
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// `TypeId` of the declared type; `None` when the parameter was declared by name only.
    pub fn declared_type(&self) -> Option<TypeId> {
        self.declared_type
    }

    /// Whether the parameter was declared with type `T`.
    pub fn is_type<T: ?Sized>(&self) -> bool {
        &*self.type_name == std::any::type_name::<T>()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)
    }
}
