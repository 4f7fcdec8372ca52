//! The type classification oracle.
//!
//! The engine never inspects classes itself. It asks a [`MetadataOracle`]
//! for the decorator metadata of a class and derives everything else from
//! the returned [`Annotation`]. Mock classes carry their synthesized shape
//! inline, so [`MetadataOracle::resolve`] consults that first and the
//! host-provided oracle only has to know about original classes.
//!
//! # Examples
//!
//! ```
//! use nm_core::{DirectiveMeta, Kind, NgModuleDef};
//! use nm_engine::{MetadataOracle, StaticOracle};
//!
//! let mut oracle = StaticOracle::new();
//! let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
//! let module = oracle.module("LayoutModule", NgModuleDef::default().with_declarations([&header]));
//!
//! assert_eq!(oracle.classify(&header), Kind::Component);
//! assert_eq!(oracle.classify(&module), Kind::Module);
//! assert_eq!(oracle.shape_of(&header).selector.as_deref(), Some("app-header"));
//! ```

use nm_core::{
    Annotation, Bindings, ClassMembers, ClassRef, DefEntry, DirectiveMeta, FxHashMap,
    InjectableMeta, Instance, Kind, NgModuleDef, PipeMeta, fx_hash_map,
};

/// Read-only access to framework metadata.
pub trait MetadataOracle {
    /// Returns the decorator metadata the host knows for `class`.
    fn annotation(&self, class: &ClassRef) -> Option<Annotation>;

    /// Returns the effective metadata: the inline shape of a synthesized
    /// class, otherwise whatever the host declares.
    fn resolve(&self, class: &ClassRef) -> Option<Annotation> {
        match class.synthesized() {
            Some(annotation) => Some(annotation.clone()),
            None => self.annotation(class),
        }
    }

    /// Classifies a class; unknown classes are [`Kind::Plain`].
    fn classify(&self, class: &ClassRef) -> Kind {
        self.resolve(class).map_or(Kind::Plain, |annotation| annotation.kind())
    }

    /// Returns `true` if the class is of the given kind.
    fn is_kind(&self, class: &ClassRef, kind: Kind) -> bool {
        self.classify(class) == kind
    }

    /// Module definition of an `NgModule`.
    fn module_metadata(&self, class: &ClassRef) -> Option<NgModuleDef> {
        match self.resolve(class)? {
            Annotation::NgModule(def) => Some(def),
            _ => None,
        }
    }

    /// Metadata of a component or directive.
    fn directive_metadata(&self, class: &ClassRef) -> Option<DirectiveMeta> {
        match self.resolve(class)? {
            Annotation::Component(meta) | Annotation::Directive(meta) => Some(meta),
            _ => None,
        }
    }

    /// Metadata of a pipe.
    fn pipe_metadata(&self, class: &ClassRef) -> Option<PipeMeta> {
        match self.resolve(class)? {
            Annotation::Pipe(meta) => Some(meta),
            _ => None,
        }
    }

    /// Metadata of an injectable.
    fn injectable_metadata(&self, class: &ClassRef) -> Option<InjectableMeta> {
        match self.resolve(class)? {
            Annotation::Injectable(meta) => Some(meta),
            _ => None,
        }
    }

    /// Declared members of any class; empty when unknown.
    fn members_of(&self, class: &ClassRef) -> ClassMembers {
        self.resolve(class)
            .and_then(|annotation| annotation.members().cloned())
            .unwrap_or_default()
    }

    /// The structural contract of a class. Unknown classes have an empty shape.
    fn shape_of(&self, class: &ClassRef) -> ClassShape {
        match self.resolve(class) {
            Some(Annotation::Component(meta) | Annotation::Directive(meta)) => ClassShape {
                kind: self.classify(class),
                selector: meta.selector,
                inputs: meta.inputs,
                outputs: meta.outputs,
                export_as: meta.export_as,
                providers: meta.providers,
            },
            Some(annotation) => ClassShape {
                kind: annotation.kind(),
                ..ClassShape::default()
            },
            None => ClassShape::default(),
        }
    }
}

/// The declared structural contract of a class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassShape {
    /// Classification.
    pub kind: Kind,
    /// Selector of a component or directive.
    pub selector: Option<String>,
    /// Declared inputs.
    pub inputs: Bindings,
    /// Declared outputs.
    pub outputs: Bindings,
    /// Template reference name.
    pub export_as: Option<String>,
    /// Class-level providers.
    pub providers: Vec<DefEntry>,
}

/// Checks whether `class` is a mock of `original`, optionally of a kind.
#[inline]
#[must_use]
pub fn is_mocked_def_of(class: &ClassRef, original: &ClassRef, kind: Option<Kind>) -> bool {
    class.is_mocked_def_of(original, kind)
}

/// Checks whether `instance` is an instance of a mock of `original`.
#[inline]
#[must_use]
pub fn is_mock_of(instance: &Instance, original: &ClassRef, kind: Option<Kind>) -> bool {
    instance.is_mock_of(original, kind)
}

/// An in-memory registry of class metadata.
///
/// Classes are registered once; cycles are built by declaring the classes
/// first and registering their annotations afterwards.
///
/// ```
/// use nm_core::{ClassRef, NgModuleDef};
/// use nm_engine::{MetadataOracle, StaticOracle};
///
/// let a = ClassRef::new("AModule");
/// let b = ClassRef::new("BModule");
///
/// let mut oracle = StaticOracle::new();
/// oracle.register_module(&a, NgModuleDef::default().with_imports([&b]));
/// oracle.register_module(&b, NgModuleDef::default().with_imports([&a]));
///
/// assert_eq!(oracle.module_metadata(&b).map(|def| def.imports.len()), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct StaticOracle {
    annotations: FxHashMap<ClassRef, Annotation>,
}

impl StaticOracle {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            annotations: fx_hash_map(),
        }
    }

    /// Attaches metadata to an existing class, replacing earlier metadata.
    pub fn register(&mut self, class: &ClassRef, annotation: Annotation) {
        self.annotations.insert(class.clone(), annotation);
    }

    /// Declares a class with metadata.
    pub fn declare(&mut self, name: &str, annotation: Annotation) -> ClassRef {
        let class = ClassRef::new(name);
        self.register(&class, annotation);
        class
    }

    /// Attaches a module definition to an existing class.
    pub fn register_module(&mut self, class: &ClassRef, def: NgModuleDef) {
        self.register(class, Annotation::NgModule(def));
    }

    /// Declares an `NgModule`.
    pub fn module(&mut self, name: &str, def: NgModuleDef) -> ClassRef {
        self.declare(name, Annotation::NgModule(def))
    }

    /// Declares a component.
    pub fn component(&mut self, name: &str, meta: DirectiveMeta) -> ClassRef {
        self.declare(name, Annotation::Component(meta))
    }

    /// Declares a directive.
    pub fn directive(&mut self, name: &str, meta: DirectiveMeta) -> ClassRef {
        self.declare(name, Annotation::Directive(meta))
    }

    /// Declares a pipe.
    pub fn pipe(&mut self, name: &str, meta: PipeMeta) -> ClassRef {
        self.declare(name, Annotation::Pipe(meta))
    }

    /// Declares an injectable service.
    pub fn injectable(&mut self, name: &str, meta: InjectableMeta) -> ClassRef {
        self.declare(name, Annotation::Injectable(meta))
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl MetadataOracle for StaticOracle {
    fn annotation(&self, class: &ClassRef) -> Option<Annotation> {
        self.annotations.get(class).cloned()
    }
}
