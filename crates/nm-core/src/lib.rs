//! Core types, errors, and configuration for nm-doubles.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Class identity ([`ClassRef`]) and mock tagging ([`MockTag`])
//! - The decorator metadata model ([`Annotation`], [`NgModuleDef`], [`DefEntry`])
//! - DI tokens and providers ([`Token`], [`ProviderDef`])
//! - Runtime values and recording stand-ins ([`Value`], [`Instance`], [`MockMethod`])
//! - Configuration ([`Flags`], [`MockConfig`]) and decisions ([`Decision`])
//! - Error types ([`MockError`])
//! - Type aliases for `FxHashMap`/`FxHashSet`

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{ClassConfig, Flags, MockConfig};
pub use error::{ConfigError, MockError, Result, TemplateError};
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use types::*;
