//! Registration-based metadata table.
//!
//! Rust has no runtime annotation reflection, so metadata is registered up front: annotation types, classes and
//! methods are described with small `*Def` values, and [`MetadataTableBuilder::build`] validates them, assigns every
//! applied annotation its identity, folds repeated annotations into their containers and computes inherited
//! (visible) annotations. The resulting [`MetadataTable`] is immutable and implements [`ElementProvider`].

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use attest_core::MarkerId;
use attest_core::lang::markers::{self, API_NAMESPACE, REPEATABLE_CONTAINER_ATTR, VALUE_ATTR};

use crate::annotation::{Annotation, AnnotationId, AnnotationSpec, AttributeValue};
use crate::element::{ElementKind, ElementRef, Parameter};
use crate::errors::MetadataError;
use crate::provider::ElementProvider;

// ============================================================================
// Definitions
// ============================================================================

/// Definition of an annotation type and the (meta-)annotations declared on it.
#[derive(Debug, Clone)]
pub struct AnnotationTypeDef {
    path: Arc<str>,
    annotations: Vec<AnnotationSpec>,
}

impl AnnotationTypeDef {
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, spec: AnnotationSpec) -> Self {
        self.annotations.push(spec);
        self
    }

    fn has_marker(&self, id: MarkerId) -> bool {
        self.annotations.iter().any(|a| a.is_marker(id))
    }

    fn repeatable_container(&self) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| a.is_marker(MarkerId::Repeatable))
            .and_then(|a| a.attribute(REPEATABLE_CONTAINER_ATTR))
            .and_then(AttributeValue::as_str)
    }
}

/// Definition of a class.
#[derive(Debug, Clone)]
pub struct ClassDef {
    path: Arc<str>,
    superclass: Option<Arc<str>>,
    annotations: Vec<AnnotationSpec>,
}

impl ClassDef {
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            superclass: None,
            annotations: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: impl Into<Arc<str>>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn annotated(mut self, spec: AnnotationSpec) -> Self {
        self.annotations.push(spec);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Definition of a method declared on a class.
#[derive(Debug, Clone)]
pub struct MethodDef {
    class: Arc<str>,
    name: Arc<str>,
    annotations: Vec<AnnotationSpec>,
    params: Vec<ParameterDef>,
}

impl MethodDef {
    pub fn new(class: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            annotations: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn annotated(mut self, spec: AnnotationSpec) -> Self {
        self.annotations.push(spec);
        self
    }

    pub fn param(mut self, param: ParameterDef) -> Self {
        self.params.push(param);
        self
    }

    pub fn element(&self) -> ElementRef {
        ElementRef::method(&self.class, &self.name)
    }
}

/// Definition of a method parameter.
#[derive(Debug, Clone)]
pub struct ParameterDef {
    name: Arc<str>,
    type_name: Arc<str>,
    declared_type: Option<TypeId>,
    annotations: Vec<AnnotationSpec>,
}

impl ParameterDef {
    pub fn new(name: impl Into<Arc<str>>, type_name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            declared_type: None,
            annotations: Vec::new(),
        }
    }

    /// Parameter of Rust type `T`.
    pub fn of<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
        Self {
            declared_type: Some(TypeId::of::<T>()),
            ..Self::new(name, std::any::type_name::<T>())
        }
    }

    pub fn annotated(mut self, spec: AnnotationSpec) -> Self {
        self.annotations.push(spec);
        self
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects definitions and builds a [`MetadataTable`].
#[derive(Debug, Clone)]
pub struct MetadataTableBuilder {
    annotation_types: Vec<AnnotationTypeDef>,
    classes: Vec<ClassDef>,
    methods: Vec<MethodDef>,
}

impl Default for MetadataTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataTableBuilder {
    /// Create a builder with every built-in marker already registered as an annotation type.
    pub fn new() -> Self {
        let mut builder = Self {
            annotation_types: Vec::new(),
            classes: Vec::new(),
            methods: Vec::new(),
        };
        for info in markers::MARKERS {
            builder.annotation_types.push(builtin_type_def(info.id, info.canonical, info.namespace));
        }
        builder
    }

    pub fn annotation_type(&mut self, def: AnnotationTypeDef) -> &mut Self {
        self.annotation_types.push(def);
        self
    }

    pub fn class(&mut self, def: ClassDef) -> &mut Self {
        self.classes.push(def);
        self
    }

    pub fn method(&mut self, def: MethodDef) -> &mut Self {
        self.methods.push(def);
        self
    }

    /// Validate the definitions and materialize the table.
    #[tracing::instrument(skip_all, fields(
        annotation_types = self.annotation_types.len(),
        classes = self.classes.len(),
        methods = self.methods.len()
    ))]
    pub fn build(self) -> Result<MetadataTable, MetadataError> {
        let mut ctx = BuildContext::new(&self.annotation_types);
        let mut table = MetadataTable::default();

        for def in &self.annotation_types {
            table.register_path(ElementRef::annotation_type(def.path.clone()))?;
        }
        for def in &self.classes {
            table.register_path(ElementRef::class(def.path.clone()))?;
        }

        for def in &self.annotation_types {
            let element = ElementRef::annotation_type(def.path.clone());
            let declared = ctx.materialize(&def.annotations, &element)?;
            table.insert(element, declared.clone(), declared);
        }

        let class_defs: HashMap<&str, &ClassDef> = self.classes.iter().map(|c| (&*c.path, c)).collect();
        let mut class_declared: HashMap<&str, Vec<Annotation>> = HashMap::new();
        for def in &self.classes {
            if let Some(superclass) = &def.superclass {
                if !class_defs.contains_key(&**superclass) {
                    return Err(MetadataError::UnknownElement {
                        kind: "superclass",
                        path: superclass.to_string(),
                        referrer: def.path.to_string(),
                    });
                }
            }
            let element = ElementRef::class(def.path.clone());
            class_declared.insert(&*def.path, ctx.materialize(&def.annotations, &element)?);
        }

        for def in &self.classes {
            let declared = class_declared.get(&*def.path).cloned().unwrap_or_default();
            let mut visible = declared.clone();
            let mut seen = HashSet::new();
            seen.insert(def.path.clone());
            let mut ancestor = def.superclass.clone();
            while let Some(path) = ancestor {
                if !seen.insert(path.clone()) {
                    return Err(MetadataError::InheritanceCycle(def.path.to_string()));
                }
                for inherited in class_declared.get(&*path).map(Vec::as_slice).unwrap_or(&[]) {
                    let already_present = visible.iter().any(|a| a.annotation_type() == inherited.annotation_type());
                    if !already_present && ctx.is_inherited(inherited.type_name()) {
                        visible.push(inherited.clone());
                    }
                }
                ancestor = class_defs.get(&*path).and_then(|c| c.superclass.clone());
            }
            table.insert(ElementRef::class(def.path.clone()), declared, visible);
            if let Some(superclass) = &def.superclass {
                table
                    .superclasses
                    .insert(ElementRef::class(def.path.clone()), ElementRef::class(superclass.clone()));
            }
            table.methods.entry(ElementRef::class(def.path.clone())).or_default();
        }

        for def in &self.methods {
            let class = ElementRef::class(def.class.clone());
            let method = def.element();
            if !class_defs.contains_key(&*def.class) {
                return Err(MetadataError::UnknownElement {
                    kind: "class",
                    path: def.class.to_string(),
                    referrer: method.to_string(),
                });
            }
            table.register_path(method.clone())?;

            let declared = ctx.materialize(&def.annotations, &method)?;
            table.insert(method.clone(), declared.clone(), declared);

            let mut params = Vec::with_capacity(def.params.len());
            for (index, param_def) in def.params.iter().enumerate() {
                let mut param = Parameter::new(&method, index, param_def.name.clone(), param_def.type_name.clone());
                if let Some(declared_type) = param_def.declared_type {
                    param = param.with_declared_type(declared_type);
                }
                let declared = ctx.materialize(&param_def.annotations, param.element())?;
                table.register_path(param.element().clone())?;
                table.insert(param.element().clone(), declared.clone(), declared);
                params.push(param);
            }
            table.parameters.insert(method.clone(), params);
            table.methods.entry(class).or_default().push(method);
        }

        tracing::debug!(
            elements = table.entries.len(),
            annotations = ctx.next_id,
            "metadata table built"
        );
        Ok(table)
    }
}

/// Every built-in marker is `Documented`; reserved markers describe themselves, so this is a self-cycle for
/// `Documented` that the search never enters.
fn builtin_type_def(id: MarkerId, canonical: &'static str, namespace: &'static str) -> AnnotationTypeDef {
    let mut def = AnnotationTypeDef::new(canonical).annotated(AnnotationSpec::marker(MarkerId::Documented));
    if namespace == API_NAMESPACE {
        let target = match id {
            MarkerId::Test | MarkerId::Before | MarkerId::After => "method",
            _ => "class, method",
        };
        def = def.annotated(AnnotationSpec::marker(MarkerId::Target).with(VALUE_ATTR, target));
    }
    if id == MarkerId::Tag {
        def = def.annotated(
            AnnotationSpec::marker(MarkerId::Repeatable)
                .with(REPEATABLE_CONTAINER_ATTR, markers::as_str(MarkerId::Tags)),
        );
    }
    def
}

struct BuildContext<'a> {
    types: HashMap<&'a str, &'a AnnotationTypeDef>,
    next_id: u32,
}

impl<'a> BuildContext<'a> {
    fn new(defs: &'a [AnnotationTypeDef]) -> Self {
        Self {
            types: defs.iter().map(|d| (&*d.path, d)).collect(),
            next_id: 0,
        }
    }

    fn is_inherited(&self, type_name: &str) -> bool {
        self.types.get(type_name).is_some_and(|d| d.has_marker(MarkerId::Inherited))
    }

    fn next_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Turn specs into identified annotations, folding repeats into their container.
    fn materialize(&mut self, specs: &[AnnotationSpec], owner: &ElementRef) -> Result<Vec<Annotation>, MetadataError> {
        let mut instances: Vec<Annotation> = Vec::with_capacity(specs.len());
        for spec in specs {
            if !self.types.contains_key(spec.type_name()) {
                return Err(MetadataError::UnknownElement {
                    kind: "annotation type",
                    path: spec.type_name.to_string(),
                    referrer: owner.to_string(),
                });
            }
            let id = self.next_id();
            instances.push(Annotation::new(
                id,
                ElementRef::annotation_type(spec.type_name.clone()),
                spec.attributes.clone(),
            ));
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for spec in specs {
            *counts.entry(spec.type_name()).or_default() += 1;
        }
        if counts.values().all(|&n| n == 1) {
            return Ok(instances);
        }

        let mut folded: Vec<Annotation> = Vec::with_capacity(instances.len());
        let mut emitted: HashSet<String> = HashSet::new();
        for instance in &instances {
            let type_name = instance.type_name();
            let count = counts.get(type_name).copied().unwrap_or(0);
            if count == 1 {
                folded.push(instance.clone());
                continue;
            }
            if !emitted.insert(type_name.to_string()) {
                continue;
            }
            let container = self.container_for(type_name, count, owner)?;
            let repeats: Vec<Annotation> = instances.iter().filter(|a| a.type_name() == type_name).cloned().collect();
            let id = self.next_id();
            folded.push(Annotation::new(
                id,
                ElementRef::annotation_type(container),
                vec![(VALUE_ATTR.into(), AttributeValue::Annotations(repeats))],
            ));
        }
        Ok(folded)
    }

    fn container_for(&self, type_name: &str, count: usize, owner: &ElementRef) -> Result<Arc<str>, MetadataError> {
        let container = self
            .types
            .get(type_name)
            .and_then(|d| d.repeatable_container())
            .ok_or_else(|| {
                MetadataError::InvalidArgument(format!(
                    "annotation type `{type_name}` is declared {count} times on `{owner}` but is not repeatable"
                ))
            })?;
        if !self.types.contains_key(container) {
            return Err(MetadataError::UnknownElement {
                kind: "annotation type",
                path: container.to_string(),
                referrer: type_name.to_string(),
            });
        }
        Ok(container.into())
    }
}

// ============================================================================
// Table
// ============================================================================

#[derive(Debug, Default)]
struct Entry {
    declared: Vec<Annotation>,
    visible: Vec<Annotation>,
}

/// Immutable, registration-based [`ElementProvider`].
#[derive(Debug, Default)]
pub struct MetadataTable {
    paths: HashMap<Arc<str>, ElementRef>,
    entries: HashMap<ElementRef, Entry>,
    methods: HashMap<ElementRef, Vec<ElementRef>>,
    parameters: HashMap<ElementRef, Vec<Parameter>>,
    superclasses: HashMap<ElementRef, ElementRef>,
}

impl MetadataTable {
    /// Look up an element by its qualified path.
    pub fn lookup(&self, path: &str) -> Option<&ElementRef> {
        self.paths.get(path)
    }

    pub fn superclass(&self, class: &ElementRef) -> Option<&ElementRef> {
        self.superclasses.get(class)
    }

    /// Find a declared method of `class` by simple name.
    pub fn method(&self, class: &ElementRef, name: &str) -> Option<&ElementRef> {
        self.declared_methods(class).iter().find(|m| m.simple_name() == name)
    }

    fn register_path(&mut self, element: ElementRef) -> Result<(), MetadataError> {
        let key: Arc<str> = element.path().into();
        if self.paths.contains_key(&key) {
            return Err(MetadataError::DuplicateElement(element.to_string()));
        }
        self.paths.insert(key, element);
        Ok(())
    }

    fn insert(&mut self, element: ElementRef, declared: Vec<Annotation>, visible: Vec<Annotation>) {
        self.entries.insert(element, Entry { declared, visible });
    }
}

impl ElementProvider for MetadataTable {
    fn contains(&self, element: &ElementRef) -> bool {
        self.entries.contains_key(element)
    }

    fn declared_annotations(&self, element: &ElementRef) -> &[Annotation] {
        self.entries.get(element).map(|e| e.declared.as_slice()).unwrap_or(&[])
    }

    fn visible_annotations(&self, element: &ElementRef) -> &[Annotation] {
        self.entries.get(element).map(|e| e.visible.as_slice()).unwrap_or(&[])
    }

    fn declared_methods(&self, class: &ElementRef) -> &[ElementRef] {
        if class.kind() != ElementKind::Class {
            return &[];
        }
        self.methods.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    fn parameters(&self, method: &ElementRef) -> &[Parameter] {
        self.parameters.get(method).map(Vec::as_slice).unwrap_or(&[])
    }
}
