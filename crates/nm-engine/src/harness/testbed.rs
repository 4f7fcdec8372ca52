//! The in-memory test harness.

use nm_core::{ClassRef, DefEntry, FxHashSet, Kind, NgModuleDef, Result, fx_hash_set};
use tracing::{debug, info};

use super::host::host_template;
use super::render::Fixture;
use super::{Host, MockRegistry, TestHarness};
use crate::context::ResolutionContext;
use crate::module::mock_module_def;
use crate::oracle::MetadataOracle;

/// A test module plus the state the engine reads from a harness.
///
/// The harness counts as instantiated from the first render until it is
/// reconfigured or reset. A module configured through
/// [`configure_mocked`](Self::configure_mocked) exposes the registry of every
/// class it ended up with, which makes later resolutions reuse exactly the
/// mocks the rendered module uses.
///
/// # Examples
///
/// ```
/// use nm_core::{DirectiveMeta, NgModuleDef};
/// use nm_engine::{ResolutionContext, StaticOracle, TestBed};
/// use serde_json::json;
///
/// let mut oracle = StaticOracle::new();
/// let header = oracle.component(
///     "HeaderComponent",
///     DirectiveMeta::new("app-header").with_template("<h1>Header</h1>"),
/// );
///
/// let mut ctx = ResolutionContext::new();
/// let mut bed = TestBed::new();
/// bed.configure_mocked(&mut ctx, &oracle, &NgModuleDef::default().with_declarations([&header]))
///     .unwrap();
///
/// let fixture = bed.render(&oracle, "<app-header></app-header>", &json!({})).unwrap();
/// assert_eq!(fixture.html(), "<app-header></app-header>");
/// assert!(fixture.find(&header).unwrap().class().is_mock());
/// ```
#[derive(Debug, Default)]
pub struct TestBed {
    module: NgModuleDef,
    registry: Option<MockRegistry>,
    instantiated: bool,
}

impl TestBed {
    /// Creates an unconfigured harness.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `def` as the test module as it is.
    pub fn configure(&mut self, def: NgModuleDef) {
        self.module = def;
        self.registry = None;
        self.instantiated = false;
    }

    /// Rewrites `def` and uses the result as the test module.
    ///
    /// # Errors
    ///
    /// Whatever the rewrite reports. The harness is left unconfigured.
    pub fn configure_mocked(
        &mut self,
        ctx: &mut ResolutionContext,
        oracle: &dyn MetadataOracle,
        def: &NgModuleDef,
    ) -> Result<&NgModuleDef> {
        self.reset();
        let (_, rewritten) = mock_module_def(ctx, Host::new(oracle, &*self), def, None)?;

        let registry = collect_registry(oracle, &rewritten);
        info!(classes = registry.len(), "Test module configured");
        self.module = rewritten;
        self.registry = Some(registry);
        Ok(&self.module)
    }

    /// Forgets the test module.
    pub fn reset(&mut self) {
        self.module = NgModuleDef::default();
        self.registry = None;
        self.instantiated = false;
    }

    /// The current test module.
    #[must_use]
    pub fn module(&self) -> &NgModuleDef {
        &self.module
    }

    /// Renders `template` against the test module.
    ///
    /// Top-level bindings evaluate against the keys of `params`.
    ///
    /// # Errors
    ///
    /// [`MockError::Template`](nm_core::MockError::Template) on malformed
    /// markup.
    pub fn render<'o>(
        &mut self,
        oracle: &'o dyn MetadataOracle,
        template: &str,
        params: &serde_json::Value,
    ) -> Result<Fixture<'o>> {
        self.mount(oracle, template, params, None)
    }

    /// Renders `class` through a generated host template.
    ///
    /// Every input and output of `class` named in `params` is bound.
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render).
    pub fn render_component<'o>(
        &mut self,
        oracle: &'o dyn MetadataOracle,
        class: &ClassRef,
        params: &serde_json::Value,
    ) -> Result<Fixture<'o>> {
        let template = host_template(&oracle.shape_of(class), params.as_object());
        debug!(class = %class, template = %template, "Rendering class");
        self.mount(oracle, &template, params, Some(class.clone()))
    }

    fn mount<'o>(
        &mut self,
        oracle: &'o dyn MetadataOracle,
        template: &str,
        params: &serde_json::Value,
        point: Option<ClassRef>,
    ) -> Result<Fixture<'o>> {
        let params = params.as_object().cloned().unwrap_or_default();
        let mut fixture = Fixture::new(oracle, &self.module, template, params, point)?;
        self.instantiated = true;
        fixture.detect_changes()?;
        Ok(fixture)
    }
}

impl TestHarness for TestBed {
    fn is_instantiated(&self) -> bool {
        self.instantiated
    }

    fn active_mocks(&self) -> Option<&MockRegistry> {
        self.registry.as_ref()
    }
}

/// Records what every class reachable from `def` resolved to.
///
/// Mocks are registered under their source, everything else under itself.
fn collect_registry(oracle: &dyn MetadataOracle, def: &NgModuleDef) -> MockRegistry {
    let mut registry = MockRegistry::new();
    let mut visited = fx_hash_set();
    visit(oracle, def, &mut registry, &mut visited);
    registry
}

fn visit(
    oracle: &dyn MetadataOracle,
    def: &NgModuleDef,
    registry: &mut MockRegistry,
    visited: &mut FxHashSet<ClassRef>,
) {
    let lists = [
        &def.imports,
        &def.declarations,
        &def.exports,
        &def.bootstrap,
        &def.entry_components,
    ];
    for entry in lists.into_iter().flat_map(|list| DefEntry::flatten(list)) {
        let Some(class) = entry.module_class() else {
            continue;
        };
        if !visited.insert(class.clone()) {
            continue;
        }
        registry.insert(class.mock_of().unwrap_or(class).clone(), class.clone());
        if oracle.is_kind(class, Kind::Module) {
            if let Some(nested) = oracle.module_metadata(class) {
                visit(oracle, &nested, registry, visited);
            }
        }
    }
}
