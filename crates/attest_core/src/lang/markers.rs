//! Built-in marker vocabulary.
//!
//! Markers in [`API_NAMESPACE`] drive test execution (`Test`, `Before`, `After`, ...). Markers in
//! [`RESERVED_NAMESPACE`] only describe *other* annotation types; meta-annotation search never descends into them.

use crate::lang::registry::{LangItemInfo, Stability};

/// Namespace of the user-facing test markers.
pub const API_NAMESPACE: &str = "attest.api";

/// Namespace of annotation-definition markers (`Inherited`, `Repeatable`, ...).
pub const RESERVED_NAMESPACE: &str = "attest.lang.annotation";

/// Attribute of `Test` holding a custom display name.
pub const TEST_NAME_ATTR: &str = "name";

/// Attribute of `Repeatable` naming the container annotation type.
pub const REPEATABLE_CONTAINER_ATTR: &str = "container";

/// Attribute holding the single value of a marker (`Tag`, container annotations).
pub const VALUE_ATTR: &str = "value";

/// Stable identifier for built-in markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerId {
    Test,
    Before,
    After,
    Tag,
    Tags,
    Disabled,
    Inherited,
    Repeatable,
    Documented,
    Target,
}

/// Metadata entry for a marker.
pub type MarkerInfo = LangItemInfo<MarkerId>;

/// Registry of built-in markers.
pub const MARKERS: &[MarkerInfo] = &[
    info(
        MarkerId::Test,
        "attest.api.Test",
        "Test",
        API_NAMESPACE,
        "Mark a method as a test; `name` overrides the display name.",
        &[TEST_NAME_ATTR],
    ),
    info(
        MarkerId::Before,
        "attest.api.Before",
        "Before",
        API_NAMESPACE,
        "Run the method before each test method of its class.",
        &[],
    ),
    info(
        MarkerId::After,
        "attest.api.After",
        "After",
        API_NAMESPACE,
        "Run the method after each test method of its class.",
        &[],
    ),
    info(
        MarkerId::Tag,
        "attest.api.Tag",
        "Tag",
        API_NAMESPACE,
        "Attach a free-form tag to a class or method; repeatable.",
        &[VALUE_ATTR],
    ),
    info(
        MarkerId::Tags,
        "attest.api.Tags",
        "Tags",
        API_NAMESPACE,
        "Container that repeated `Tag` annotations fold into.",
        &[VALUE_ATTR],
    ),
    info(
        MarkerId::Disabled,
        "attest.api.Disabled",
        "Disabled",
        API_NAMESPACE,
        "Exclude a class or method from execution.",
        &[],
    ),
    info(
        MarkerId::Inherited,
        "attest.lang.annotation.Inherited",
        "Inherited",
        RESERVED_NAMESPACE,
        "Make an annotation type visible on subclasses of the annotated class.",
        &[],
    ),
    info(
        MarkerId::Repeatable,
        "attest.lang.annotation.Repeatable",
        "Repeatable",
        RESERVED_NAMESPACE,
        "Allow an annotation type to be applied more than once; repeats fold into `container`.",
        &[REPEATABLE_CONTAINER_ATTR],
    ),
    info(
        MarkerId::Documented,
        "attest.lang.annotation.Documented",
        "Documented",
        RESERVED_NAMESPACE,
        "Mark an annotation type as part of the public documentation surface.",
        &[],
    ),
    info(
        MarkerId::Target,
        "attest.lang.annotation.Target",
        "Target",
        RESERVED_NAMESPACE,
        "Restrict the element kinds an annotation type may be applied to.",
        &[VALUE_ATTR],
    ),
];

/// Resolve a qualified marker name to its stable id.
pub fn from_str(name: &str) -> Option<MarkerId> {
    MARKERS.iter().find(|m| m.canonical == name).map(|m| m.id)
}

/// Return the qualified spelling for a marker.
pub fn as_str(id: MarkerId) -> &'static str {
    info_for(id).canonical
}

/// Return the metadata entry for a marker.
pub fn info_for(id: MarkerId) -> &'static MarkerInfo {
    MARKERS
        .iter()
        .find(|m| m.id == id)
        .expect("INVARIANT: every MarkerId has a MARKERS entry")
}

/// Whether a qualified annotation type name lives in [`RESERVED_NAMESPACE`] (or below it).
///
/// ## Examples
/// ```rust
/// use attest_core::lang::markers::is_reserved_type_name;
///
/// assert!(is_reserved_type_name("attest.lang.annotation.Inherited"));
/// assert!(!is_reserved_type_name("attest.lang.annotations.Custom"));
/// assert!(!is_reserved_type_name("attest.api.Test"));
/// ```
pub fn is_reserved_type_name(name: &str) -> bool {
    name.strip_prefix(RESERVED_NAMESPACE)
        .is_some_and(|rest| rest.starts_with('.'))
}

const fn info(
    id: MarkerId,
    canonical: &'static str,
    simple_name: &'static str,
    namespace: &'static str,
    description: &'static str,
    attributes: &'static [&'static str],
) -> MarkerInfo {
    LangItemInfo {
        id,
        canonical,
        simple_name,
        namespace,
        description,
        attributes,
        since_version: "0.1.0",
        stability: Stability::Stable,
    }
}
