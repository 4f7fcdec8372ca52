//! Domain types for the mock resolution engine.
//!
//! # Module Organization
//!
//! - [`class`] - Class identity, kinds and mock tags
//! - [`meta`] - Decorator metadata and module definitions
//! - [`provider`] - DI tokens and provider recipes
//! - [`decision`] - Configuration-layer decisions
//! - [`value`] - Runtime values
//! - [`instance`] - Object instances and recording stand-ins
//!
//! # Re-exports
//!
//! All public types are re-exported at this module level and at the crate
//! root:
//!
//! ```
//! use nm_core::types::{ClassRef, Decision, Kind, NgModuleDef};
//! use nm_core::{DefEntry, Token};
//! ```

pub mod class;
pub mod decision;
pub mod instance;
pub mod meta;
pub mod provider;
pub mod value;

pub use class::{ClassId, ClassRef, Kind, MockTag, StubFn};
pub use decision::{Decision, Replacement};
pub use instance::{EventEmitter, Instance, MockMethod, RenderHook, Subscriber};
pub use meta::{
    Annotation, Binding, Bindings, ClassMembers, DefEntry, DirectiveMeta, InjectableMeta,
    ModuleWithProviders, NgModuleDef, PipeMeta,
};
pub use provider::{InjectionToken, ProviderDef, ProviderRecipe, Token};
pub use value::Value;
