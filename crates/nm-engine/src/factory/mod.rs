//! Per-kind mock factories.
//!
//! - [`declarable`] - components, directives and pipes
//! - [`provider`] - providers and service values
//! - [`instance`] - instances of declared and synthesized classes

pub mod declarable;
pub mod instance;
pub mod provider;

pub use declarable::{MOCK_TEMPLATE, mock_component, mock_directive, mock_pipe};
pub use instance::instantiate;
pub use provider::{mock_provider, mock_service};
