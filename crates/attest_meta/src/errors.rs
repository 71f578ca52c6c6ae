//! Metadata errors.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building a metadata table or when a search receives malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum MetadataError {
    #[error("invalid argument: {0}")]
    #[diagnostic(code(attest::invalid_argument))]
    InvalidArgument(String),

    #[error("duplicate element `{0}`")]
    #[diagnostic(
        code(attest_meta::duplicate_element),
        help("class and annotation type paths share one namespace; method names must be unique per class")
    )]
    DuplicateElement(String),

    #[error("unknown {kind} `{path}` referenced by `{referrer}`")]
    #[diagnostic(code(attest_meta::unknown_element), help("register the {kind} before building the table"))]
    UnknownElement {
        kind: &'static str,
        path: String,
        referrer: String,
    },

    #[error("inheritance cycle through class `{0}`")]
    #[diagnostic(code(attest_meta::inheritance_cycle))]
    InheritanceCycle(String),
}
