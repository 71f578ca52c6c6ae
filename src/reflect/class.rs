use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use attest_meta::{AnnotationSpec, ClassDef, ElementRef, MetadataTableBuilder, MethodDef, ParameterDef};

use super::value::{Arguments, BoxError, Value};

type ErasedBody = Arc<dyn Fn(&mut dyn Any, Arguments) -> Result<Value, BoxError> + Send + Sync>;
type InstanceFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// An invocable method: its element handle plus a type-erased body.
#[derive(Clone)]
pub struct Method {
    element: ElementRef,
    target_type: TypeId,
    target_type_name: &'static str,
    body: ErasedBody,
}

impl Method {
    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    /// Rust type of the instance this method must be invoked on.
    pub fn target_type_name(&self) -> &'static str {
        self.target_type_name
    }

    /// Whether `target` is an instance of the declaring type.
    pub fn accepts(&self, target: &dyn Any) -> bool {
        target.type_id() == self.target_type
    }

    /// Run the body. Callers check [`Method::accepts`] first.
    pub(crate) fn call(&self, target: &mut dyn Any, arguments: Arguments) -> Result<Value, BoxError> {
        (self.body)(target, arguments)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("element", &self.element)
            .field("target_type", &self.target_type_name)
            .finish_non_exhaustive()
    }
}

/// The invocable side of a registered test class.
#[derive(Clone)]
pub struct TestClass {
    element: ElementRef,
    type_name: &'static str,
    factory: InstanceFactory,
    methods: HashMap<ElementRef, Method>,
}

impl TestClass {
    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    /// Rust type backing this class.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Create a fresh instance with the registered factory.
    pub fn new_instance(&self) -> Value {
        (self.factory)()
    }

    /// The invocable method for `element`, if a body was registered for it.
    pub fn method(&self, element: &ElementRef) -> Option<&Method> {
        self.methods.get(element)
    }

    /// Look up a method by simple name.
    pub fn method_named(&self, name: &str) -> Option<&Method> {
        self.method(&ElementRef::method(self.element.path(), name))
    }
}

impl fmt::Debug for TestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&ElementRef> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("TestClass")
            .field("element", &self.element)
            .field("type_name", &self.type_name)
            .field("methods", &methods)
            .finish_non_exhaustive()
    }
}

/// Registers a test class backed by Rust type `T`.
///
/// ## Examples
/// ```rust
/// use attest::{AnnotationSpec, ClassBuilder, MarkerId, MetadataTableBuilder};
///
/// #[derive(Default)]
/// struct CalcTests {
///     calls: u32,
/// }
///
/// let mut meta = MetadataTableBuilder::new();
/// let class = ClassBuilder::<CalcTests>::with_default("acme.CalcTests")
///     .method("adds", |m| {
///         m.annotated(AnnotationSpec::marker(MarkerId::Test))
///             .param::<i64>("n")
///             .body(|this, mut args| {
///                 this.calls += 1;
///                 Ok(args.take::<i64>(0)? + 1)
///             })
///     })
///     .register(&mut meta);
/// let table = meta.build().unwrap();
/// assert!(class.method_named("adds").is_some());
/// # let _ = table;
/// ```
pub struct ClassBuilder<T> {
    def: ClassDef,
    factory: InstanceFactory,
    methods: Vec<MethodBuilder<T>>,
}

impl<T: Any + Send> ClassBuilder<T> {
    /// Class at `path` whose instances come from `factory`.
    pub fn new(path: impl Into<Arc<str>>, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            def: ClassDef::new(path),
            factory: Arc::new(move || Box::new(factory()) as Value),
            methods: Vec::new(),
        }
    }

    /// Class whose instances come from `T::default()`.
    pub fn with_default(path: impl Into<Arc<str>>) -> Self
    where
        T: Default,
    {
        Self::new(path, T::default)
    }

    pub fn extends(mut self, superclass: impl Into<Arc<str>>) -> Self {
        self.def = self.def.extends(superclass);
        self
    }

    pub fn annotated(mut self, spec: AnnotationSpec) -> Self {
        self.def = self.def.annotated(spec);
        self
    }

    /// Declare a method named `name`, configured by `declare`. Declaration order is preserved.
    pub fn method(
        mut self,
        name: impl Into<Arc<str>>,
        declare: impl FnOnce(MethodBuilder<T>) -> MethodBuilder<T>,
    ) -> Self {
        self.methods.push(declare(MethodBuilder::new(name)));
        self
    }

    /// Add the class and its methods to `builder` and return the invocable class.
    ///
    /// Methods declared without a body are registered as metadata only.
    pub fn register(self, builder: &mut MetadataTableBuilder) -> TestClass {
        let element = ElementRef::class(self.def.path());
        let mut methods = HashMap::new();

        builder.class(self.def);
        for method in self.methods {
            let mut def = MethodDef::new(element.path(), method.name);
            for spec in method.annotations {
                def = def.annotated(spec);
            }
            for param in method.params {
                def = def.param(param);
            }
            let method_element = def.element();
            builder.method(def);

            if let Some(body) = method.body {
                methods.insert(
                    method_element.clone(),
                    Method {
                        element: method_element,
                        target_type: TypeId::of::<T>(),
                        target_type_name: std::any::type_name::<T>(),
                        body,
                    },
                );
            }
        }

        TestClass {
            element,
            type_name: std::any::type_name::<T>(),
            factory: self.factory,
            methods,
        }
    }
}

/// A method declaration on a [`ClassBuilder`]. Methods declared without a body are metadata only.
pub struct MethodBuilder<T> {
    name: Arc<str>,
    annotations: Vec<AnnotationSpec>,
    params: Vec<ParameterDef>,
    body: Option<ErasedBody>,
    _target: PhantomData<fn(&mut T)>,
}

impl<T: Any> MethodBuilder<T> {
    fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            params: Vec::new(),
            body: None,
            _target: PhantomData,
        }
    }

    pub fn annotated(mut self, spec: AnnotationSpec) -> Self {
        self.annotations.push(spec);
        self
    }

    /// Declare a parameter of Rust type `P`.
    pub fn param<P: ?Sized + 'static>(self, name: impl Into<Arc<str>>) -> Self {
        self.param_def(ParameterDef::of::<P>(name))
    }

    /// Declare a parameter from a full definition (for parameter annotations).
    pub fn param_def(mut self, param: ParameterDef) -> Self {
        self.params.push(param);
        self
    }

    /// Set the method body. `R` becomes the invocation's return value.
    pub fn body<R, F>(mut self, body: F) -> Self
    where
        R: Any + Send,
        F: Fn(&mut T, Arguments) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(move |target: &mut dyn Any, arguments: Arguments| {
            let this = target
                .downcast_mut::<T>()
                .ok_or_else(|| BoxError::from(format!("target is not a `{}`", std::any::type_name::<T>())))?;
            Ok(Box::new(body(this, arguments)?) as Value)
        }));
        self
    }
}

#[cfg(test)]
mod tests {
    use attest_core::MarkerId;
    use attest_meta::ElementProvider;

    use super::*;

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    fn counter_class(meta: &mut MetadataTableBuilder) -> TestClass {
        ClassBuilder::<Counter>::with_default("acme.CounterTests")
            .method("hit", |m| {
                m.annotated(AnnotationSpec::marker(MarkerId::Test))
                    .param::<u32>("by")
                    .body(|this, mut args| {
                        this.hits += args.take::<u32>(0)?;
                        Ok(this.hits)
                    })
            })
            .method("declared_only", |m| m)
            .register(meta)
    }

    #[test]
    fn test_register_populates_metadata() {
        let mut meta = MetadataTableBuilder::new();
        let class = counter_class(&mut meta);
        let table = meta.build().unwrap();

        let names: Vec<&str> = table.declared_methods(class.element()).iter().map(|m| m.simple_name()).collect();
        assert_eq!(names, ["hit", "declared_only"]);
        let hit = ElementRef::method("acme.CounterTests", "hit");
        assert_eq!(table.parameters(&hit)[0].type_name(), "u32");
    }

    #[test]
    fn test_only_methods_with_bodies_are_invocable() {
        let mut meta = MetadataTableBuilder::new();
        let class = counter_class(&mut meta);
        assert!(class.method_named("hit").is_some());
        assert!(class.method_named("declared_only").is_none());
    }

    #[test]
    fn test_call_runs_body_on_instance() {
        let mut meta = MetadataTableBuilder::new();
        let class = counter_class(&mut meta);
        let method = class.method_named("hit").unwrap();

        let mut instance = class.new_instance();
        assert!(method.accepts(&*instance));
        let result = method.call(&mut *instance, Arguments::new(vec![Box::new(3_u32)])).unwrap();
        assert_eq!(result.downcast_ref::<u32>(), Some(&3));
        assert_eq!(instance.downcast_ref::<Counter>().unwrap().hits, 3);
    }

    #[test]
    fn test_accepts_rejects_other_types() {
        let mut meta = MetadataTableBuilder::new();
        let class = counter_class(&mut meta);
        let method = class.method_named("hit").unwrap();
        assert!(!method.accepts(&String::new()));
        assert_eq!(method.target_type_name(), std::any::type_name::<Counter>());
    }
}
