//! Configuration-layer decisions consulted during a walk.

use super::class::ClassRef;
use super::provider::ProviderDef;

/// What to do with a class or token when the rewriter meets it.
///
/// # Examples
///
/// ```
/// use nm_core::{ClassRef, Decision, Replacement};
///
/// let fake = ClassRef::new("FakeLogger");
/// let decision = Decision::Replace(Replacement::Class(fake));
/// assert!(decision.keeps_dependencies());
/// assert!(!Decision::Mock.keeps_dependencies());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Keep the original.
    Keep,
    /// Mock it, even where mocking is otherwise skipped.
    Mock,
    /// Substitute something else.
    Replace(Replacement),
    /// Provide nothing (`undefined`).
    Suppress,
}

impl Decision {
    /// Returns `true` if descendants of a module with this decision are kept
    /// as originals.
    #[must_use]
    pub const fn keeps_dependencies(&self) -> bool {
        matches!(self, Self::Keep | Self::Replace(_))
    }
}

/// A custom substitute.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// A class used instead of the original.
    Class(ClassRef),
    /// A full provider used instead of the original provider.
    Provider(ProviderDef),
}
