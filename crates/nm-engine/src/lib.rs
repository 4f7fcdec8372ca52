//! Mock synthesis and module graph rewriting for nm-doubles.
//!
//! The engine turns real framework classes into test doubles:
//!
//! - [`MetadataOracle`] classifies classes and reads their decorator
//!   metadata; [`StaticOracle`] is the in-memory registry tests populate
//! - [`ResolutionContext`] holds the state shared by one resolution epoch:
//!   the mock cache, skip-mock mode, decisions and export markers
//! - the [`factory`] functions synthesize mocks of components, directives,
//!   pipes and providers
//! - [`mock_module_def`] and [`mock_module`] rewrite module graphs
//! - [`resolve_mock`] maps an original class to the mock in use
//! - [`TestBed`] is an in-memory harness that renders templates against a
//!   rewritten module
//!
//! # Module Organization
//!
//! - [`oracle`] - Type classification and metadata lookups
//! - [`context`] - Resolution state
//! - [`factory`] - Per-kind mock factories
//! - [`module`] - Module graph rewriter
//! - [`resolve`] - Resolution API
//! - [`harness`] - Test harness, templates and rendering

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod context;
pub mod factory;
pub mod harness;
pub mod module;
pub mod oracle;
pub mod resolve;

pub use context::{ResolutionContext, SkipMockGuard};
pub use factory::{
    MOCK_TEMPLATE, instantiate, mock_component, mock_directive, mock_pipe, mock_provider,
    mock_service,
};
pub use harness::{Detached, Fixture, Host, MockRegistry, TestBed, TestHarness, host_template};
pub use module::{mock_module, mock_module_def};
pub use oracle::{ClassShape, MetadataOracle, StaticOracle, is_mock_of, is_mocked_def_of};
pub use resolve::resolve_mock;
