use std::fmt;

use attest_meta::{ElementProvider, ElementRef, Parameter};

/// A method together with its declared parameters, rendered as `Class#name(p1: T1, p2: T2)`.
///
/// Used as the method context in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    method: ElementRef,
    parameters: Vec<Parameter>,
}

impl MethodSignature {
    pub fn new(method: ElementRef, parameters: Vec<Parameter>) -> Self {
        Self { method, parameters }
    }

    /// Signature of `method` as declared in `provider`.
    pub fn of<P: ElementProvider + ?Sized>(provider: &P, method: &ElementRef) -> Self {
        Self::new(method.clone(), provider.parameters(method).to_vec())
    }

    pub fn method(&self) -> &ElementRef {
        &self.method
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{parameter}")?;
        }
        write!(f, ")")
    }
}
