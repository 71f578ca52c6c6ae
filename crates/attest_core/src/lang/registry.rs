//! Shareable metadata for `attest_core::lang` registries.
//!
//! ## Notes
//! - These types are `Copy`-friendly so registries can live in `const` tables.
//! - Metadata is meant for diagnostics and docs; enforcement still lives in the metadata store.

/// Identify the version a vocabulary item is available since.
///
/// ## Examples
/// ```rust
/// use attest_core::lang::registry::SinceVersion;
///
/// let since: SinceVersion = "0.1.0";
/// assert!(!since.is_empty());
/// ```
pub type SinceVersion = &'static str;

/// Describe the lifecycle status of a vocabulary item.
///
/// ## Examples
/// ```rust
/// use attest_core::lang::registry::Stability;
///
/// let s = Stability::Stable;
/// assert_eq!(format!("{s:?}"), "Stable");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stability {
    Stable,
    Experimental,
    Deprecated,
}

/// Shared metadata shape for registry vocabulary items.
///
/// - stable identity (`id`)
/// - qualified spelling (`canonical`), e.g. `attest.api.Test`
/// - documentation (`description`)
/// - declared attribute names (`attributes`)
///
/// ## Notes
/// - `namespace` is always the `canonical` spelling up to its last `.`; the guardrail tests check this.
#[derive(Debug, Clone, Copy)]
pub struct LangItemInfo<Id> {
    pub id: Id,
    pub canonical: &'static str,
    pub simple_name: &'static str,
    pub namespace: &'static str,
    pub description: &'static str,
    pub attributes: &'static [&'static str],
    pub since_version: SinceVersion,
    pub stability: Stability,
}
