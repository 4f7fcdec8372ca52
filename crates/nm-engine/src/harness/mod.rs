//! Test harness integration.
//!
//! The engine only needs two facts from a harness: whether a test module has
//! already been instantiated, and which original-to-mock registry (`NG_MOCKS`)
//! it exposes. [`TestHarness`] captures exactly that; [`TestBed`] is the
//! in-memory implementation that also renders templates.
//!
//! # Module Organization
//!
//! - [`template`] - Template parser
//! - [`selector`] - CSS selector matching
//! - [`host`] - Host template generation for rendering a class
//! - [`render`] - Fixtures and change detection
//! - [`testbed`] - The harness itself

pub mod host;
pub mod render;
pub mod selector;
pub mod template;
pub mod testbed;

pub use host::host_template;
pub use render::Fixture;
pub use selector::Selector;
pub use template::{AttrKind, Attribute, Element, Node, parse_template};
pub use testbed::TestBed;

use nm_core::{ClassRef, FxHashMap, fx_hash_map};

use crate::oracle::MetadataOracle;

/// What the engine may ask of a test harness.
pub trait TestHarness {
    /// Returns `true` once a test module has been created.
    fn is_instantiated(&self) -> bool;

    /// Returns the authoritative original-to-mock registry, if the harness
    /// was configured through the mock builder.
    fn active_mocks(&self) -> Option<&MockRegistry>;
}

/// A harness that was never configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl TestHarness for Detached {
    fn is_instantiated(&self) -> bool {
        false
    }

    fn active_mocks(&self) -> Option<&MockRegistry> {
        None
    }
}

static DETACHED: Detached = Detached;

/// The collaborators every walk needs.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    /// Metadata lookups.
    pub oracle: &'a dyn MetadataOracle,
    /// The active test harness.
    pub harness: &'a dyn TestHarness,
}

impl<'a> Host<'a> {
    /// Pairs an oracle with a harness.
    #[must_use]
    pub fn new(oracle: &'a dyn MetadataOracle, harness: &'a dyn TestHarness) -> Self {
        Self { oracle, harness }
    }

    /// Uses `oracle` without any harness.
    #[must_use]
    pub fn detached(oracle: &'a dyn MetadataOracle) -> Self {
        Self {
            oracle,
            harness: &DETACHED,
        }
    }
}

impl std::fmt::Debug for Host<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("instantiated", &self.harness.is_instantiated())
            .finish_non_exhaustive()
    }
}

/// Original-to-mock registry exposed by a configured harness.
///
/// Kept classes map to themselves.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    entries: FxHashMap<ClassRef, ClassRef>,
}

impl MockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: fx_hash_map(),
        }
    }

    /// Registers what `original` resolves to. The first registration wins.
    pub fn insert(&mut self, original: ClassRef, resolved: ClassRef) {
        self.entries.entry(original).or_insert(resolved);
    }

    /// Returns what `original` resolves to.
    #[must_use]
    pub fn get(&self, original: &ClassRef) -> Option<&ClassRef> {
        self.entries.get(original)
    }

    /// Returns `true` if `original` is registered.
    #[must_use]
    pub fn contains(&self, original: &ClassRef) -> bool {
        self.entries.contains_key(original)
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
