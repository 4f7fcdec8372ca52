//! Dependency-injection tokens and provider recipes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::class::{ClassRef, next_id};
use super::value::Value;

/// An `InjectionToken`: an opaque, non-class DI key.
///
/// Tokens compare by identity, like classes.
///
/// # Examples
///
/// ```
/// use nm_core::InjectionToken;
///
/// let a = InjectionToken::new("HTTP_INTERCEPTORS");
/// let b = InjectionToken::new("HTTP_INTERCEPTORS");
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// ```
#[derive(Clone)]
pub struct InjectionToken {
    id: u64,
    description: Arc<str>,
}

impl InjectionToken {
    /// Creates a new token.
    #[must_use]
    pub fn new(description: &str) -> Self {
        Self {
            id: next_id(),
            description: Arc::from(description),
        }
    }

    /// Returns the description passed at creation.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for InjectionToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for InjectionToken {}

impl Hash for InjectionToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for InjectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InjectionToken({})", self.description)
    }
}

/// A DI key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A class used as its own token.
    Class(ClassRef),
    /// An injection token.
    Injection(InjectionToken),
    /// A string token.
    Name(String),
}

impl Token {
    /// Returns the class behind a class token.
    #[must_use]
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Self::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Returns a display name for logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Class(class) => class.name(),
            Self::Injection(token) => token.description(),
            Self::Name(name) => name,
        }
    }
}

impl From<ClassRef> for Token {
    fn from(class: ClassRef) -> Self {
        Self::Class(class)
    }
}

impl From<&ClassRef> for Token {
    fn from(class: &ClassRef) -> Self {
        Self::Class(class.clone())
    }
}

impl From<InjectionToken> for Token {
    fn from(token: InjectionToken) -> Self {
        Self::Injection(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a provider produces its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRecipe {
    /// `useClass`.
    UseClass(ClassRef),
    /// `useValue`.
    UseValue(Value),
    /// `useExisting`.
    UseExisting(Token),
}

/// A provider object: `{ provide, use*, multi }`.
///
/// # Examples
///
/// ```
/// use nm_core::{InjectionToken, ProviderDef, ProviderRecipe, Value};
///
/// let token = InjectionToken::new("HTTP_INTERCEPTORS");
/// let provider = ProviderDef::value(token.into(), Value::Undefined).multi();
///
/// assert!(provider.multi);
/// assert!(matches!(provider.recipe, ProviderRecipe::UseValue(Value::Undefined)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDef {
    /// The DI key.
    pub token: Token,
    /// The recipe.
    pub recipe: ProviderRecipe,
    /// Whether several providers contribute to one token.
    pub multi: bool,
}

impl ProviderDef {
    /// `{ provide: token, useValue: value }`.
    #[must_use]
    pub fn value(token: Token, value: Value) -> Self {
        Self {
            token,
            recipe: ProviderRecipe::UseValue(value),
            multi: false,
        }
    }

    /// `{ provide: token, useClass: class }`.
    #[must_use]
    pub fn class(token: Token, class: ClassRef) -> Self {
        Self {
            token,
            recipe: ProviderRecipe::UseClass(class),
            multi: false,
        }
    }

    /// `{ provide: token, useExisting: existing }`.
    #[must_use]
    pub fn existing(token: Token, existing: Token) -> Self {
        Self {
            token,
            recipe: ProviderRecipe::UseExisting(existing),
            multi: false,
        }
    }

    /// Marks the provider as multi.
    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Returns the provided value of a `useValue` provider.
    #[must_use]
    pub fn use_value(&self) -> Option<&Value> {
        match &self.recipe {
            ProviderRecipe::UseValue(value) => Some(value),
            _ => None,
        }
    }
}
