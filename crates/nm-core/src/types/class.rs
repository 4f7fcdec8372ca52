//! Class identity types.
//!
//! A [`ClassRef`] is the universal key of the resolution engine. Two refs are
//! the same class only when they were produced by the same declaration, no
//! matter how similar their names or metadata are.
//!
//! Mock classes are ordinary [`ClassRef`]s that additionally carry a
//! [`MockTag`] (the back-reference to the class they stand in for) and an
//! inline [`Annotation`] describing their synthesized shape.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::meta::Annotation;
use super::value::Value;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique identifier.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// An opaque, process-unique identifier for a declared class.
///
/// # Examples
///
/// ```
/// use nm_core::ClassRef;
///
/// let a = ClassRef::new("UserService");
/// let b = ClassRef::new("UserService");
/// assert_ne!(a.id(), b.id());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    /// Returns the inner u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// The framework role a class plays.
///
/// `Plain` is the "none" classification: injectables, values and anything the
/// metadata oracle does not recognise as a declarable or a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// An `NgModule`.
    Module,
    /// A component (a directive with a template).
    Component,
    /// An attribute or structural directive.
    Directive,
    /// A named template transform.
    Pipe,
    /// Not a framework declarable.
    #[default]
    Plain,
}

impl Kind {
    /// Returns `true` for kinds that can appear in a module's `declarations`.
    ///
    /// # Examples
    ///
    /// ```
    /// use nm_core::Kind;
    ///
    /// assert!(Kind::Pipe.is_declarable());
    /// assert!(!Kind::Module.is_declarable());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_declarable(self) -> bool {
        matches!(self, Self::Component | Self::Directive | Self::Pipe)
    }

    /// Returns a human-readable label.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Component => "component",
            Self::Directive => "directive",
            Self::Pipe => "pipe",
            Self::Plain => "plain class",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A custom implementation for a recorded method, e.g. a pipe transform.
pub type StubFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Back-reference carried by every synthesized mock class.
#[derive(Clone)]
pub struct MockTag {
    /// The original class this mock stands in for.
    pub mock_of: ClassRef,

    /// The kind the mock mimics.
    pub kind: Kind,

    /// Custom transform for pipe mocks.
    pub transform: Option<StubFn>,
}

impl fmt::Debug for MockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTag")
            .field("mock_of", &self.mock_of.name())
            .field("kind", &self.kind)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

struct ClassDecl {
    id: ClassId,
    name: String,
    mock: Option<MockTag>,
    synthesized: OnceLock<Annotation>,
}

/// Identity of a declared class.
///
/// Cheap to clone; equality and hashing use the [`ClassId`] only.
///
/// # Examples
///
/// ```
/// use nm_core::{ClassRef, Kind};
///
/// let original = ClassRef::new("HeaderComponent");
/// let mock = ClassRef::mock(&original, Kind::Component);
///
/// assert_eq!(mock.name(), "MockOfHeaderComponent");
/// assert!(mock.is_mocked_def_of(&original, Some(Kind::Component)));
/// assert!(!mock.is_mocked_def_of(&original, Some(Kind::Pipe)));
/// assert!(!original.is_mock());
/// ```
#[derive(Clone)]
pub struct ClassRef(Arc<ClassDecl>);

impl ClassRef {
    /// Declares a new class.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(ClassDecl {
            id: ClassId(next_id()),
            name: name.into(),
            mock: None,
            synthesized: OnceLock::new(),
        }))
    }

    /// Declares a mock class for `original` without a shape yet.
    ///
    /// The shape is attached later with [`define`](Self::define); this is how
    /// the module rewriter hands out a mock before its members are resolved.
    #[must_use]
    pub fn mock(original: &Self, kind: Kind) -> Self {
        Self::mock_with(MockTag {
            mock_of: original.clone(),
            kind,
            transform: None,
        })
    }

    /// Declares a mock class from a fully specified tag.
    #[must_use]
    pub fn mock_with(tag: MockTag) -> Self {
        let name = format!("MockOf{}", tag.mock_of.name());
        Self(Arc::new(ClassDecl {
            id: ClassId(next_id()),
            name,
            mock: Some(tag),
            synthesized: OnceLock::new(),
        }))
    }

    /// Declares a mock class with its synthesized shape.
    #[must_use]
    pub fn synthesize(tag: MockTag, annotation: Annotation) -> Self {
        let class = Self::mock_with(tag);
        class.define(annotation);
        class
    }

    /// Attaches the synthesized shape. Returns `false` if one was already set.
    pub fn define(&self, annotation: Annotation) -> bool {
        self.0.synthesized.set(annotation).is_ok()
    }

    /// Returns the class identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ClassId {
        self.0.id
    }

    /// Returns the declared name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the mock tag, if this class is a mock.
    #[inline]
    #[must_use]
    pub fn mock_tag(&self) -> Option<&MockTag> {
        self.0.mock.as_ref()
    }

    /// Returns `true` if this class was synthesized as a mock.
    #[inline]
    #[must_use]
    pub fn is_mock(&self) -> bool {
        self.0.mock.is_some()
    }

    /// Returns the original class this mock stands in for.
    #[inline]
    #[must_use]
    pub fn mock_of(&self) -> Option<&ClassRef> {
        self.0.mock.as_ref().map(|tag| &tag.mock_of)
    }

    /// Returns the inline shape of a synthesized class.
    #[inline]
    #[must_use]
    pub fn synthesized(&self) -> Option<&Annotation> {
        self.0.synthesized.get()
    }

    /// Checks whether this class is a mock of `original`, optionally of a
    /// specific kind.
    #[must_use]
    pub fn is_mocked_def_of(&self, original: &ClassRef, kind: Option<Kind>) -> bool {
        self.mock_tag().is_some_and(|tag| {
            tag.mock_of == *original && kind.is_none_or(|expected| tag.kind == expected)
        })
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.name, self.0.id.0)
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}
