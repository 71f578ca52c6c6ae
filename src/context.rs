//! Per-invocation execution context handed to argument resolvers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use attest_core::MarkerId;
use attest_core::lang::markers::TEST_NAME_ATTR;
use attest_meta::search::find_marker;
use attest_meta::{ElementKind, ElementProvider, ElementRef};

use crate::errors::ExecutionError;

/// Read-only facts about the test unit being executed, plus typed attributes supplied by the hosting engine.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    display_name: String,
    test_class: Option<ElementRef>,
    test_method: Option<ElementRef>,
    attributes: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ExecutionContext {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Context for running `method` of `class`.
    ///
    /// The display name is the `Test` marker's non-empty `name` attribute, otherwise the method's simple name.
    pub fn for_method<P>(provider: &P, class: &ElementRef, method: &ElementRef) -> Result<Self, ExecutionError>
    where
        P: ElementProvider + ?Sized,
    {
        if method.kind() != ElementKind::Method {
            return Err(ExecutionError::InvalidArgument(format!(
                "`{method}` is a {}, not a method",
                method.kind()
            )));
        }
        let test = find_marker(provider, method, MarkerId::Test)?;
        let display_name = test
            .as_ref()
            .and_then(|annotation| annotation.str_attribute(TEST_NAME_ATTR))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| method.simple_name())
            .to_string();

        Ok(Self {
            display_name,
            test_class: Some(class.clone()),
            test_method: Some(method.clone()),
            attributes: HashMap::new(),
        })
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn test_class(&self) -> Option<&ElementRef> {
        self.test_class.as_ref()
    }

    pub fn test_method(&self) -> Option<&ElementRef> {
        self.test_method.as_ref()
    }

    /// Attach an attribute. Replaces any previous value under `key`.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.attributes.insert(key.into(), Arc::new(value));
    }

    pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// The attribute under `key`, if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.attributes.get(key)?.downcast_ref::<T>()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("ExecutionContext")
            .field("display_name", &self.display_name)
            .field("test_class", &self.test_class)
            .field("test_method", &self.test_method)
            .field("attributes", &keys)
            .finish()
    }
}
