//! Framework metadata: the tagged annotation model.
//!
//! Every framework role a class can play is described by one [`Annotation`]
//! variant. The metadata oracle hands these out for declared classes and mock
//! classes carry one inline as their synthesized shape.
//!
//! # Module definitions
//!
//! An [`NgModuleDef`] lists its members as [`DefEntry`] values, which may nest
//! arbitrarily. Consumers always work on [`DefEntry::flatten`]ed lists.
//!
//! ```
//! use nm_core::{ClassRef, DefEntry, NgModuleDef};
//!
//! let header = ClassRef::new("HeaderComponent");
//! let footer = ClassRef::new("FooterComponent");
//!
//! let def = NgModuleDef::default().with_declarations([DefEntry::Nested(vec![
//!     header.clone().into(),
//!     DefEntry::Nested(vec![footer.clone().into()]),
//! ])]);
//!
//! let flat = DefEntry::flatten(&def.declarations);
//! assert_eq!(flat, vec![DefEntry::Class(header), DefEntry::Class(footer)]);
//! ```

use smallvec::SmallVec;

use super::class::{ClassRef, Kind};
use super::provider::{ProviderDef, Token};
use super::value::Value;

/// Decorator metadata attached to a class.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// `@NgModule`.
    NgModule(NgModuleDef),
    /// `@Component`.
    Component(DirectiveMeta),
    /// `@Directive`.
    Directive(DirectiveMeta),
    /// `@Pipe`.
    Pipe(PipeMeta),
    /// `@Injectable`.
    Injectable(InjectableMeta),
}

impl Annotation {
    /// Returns the kind the annotation declares.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::NgModule(_) => Kind::Module,
            Self::Component(_) => Kind::Component,
            Self::Directive(_) => Kind::Directive,
            Self::Pipe(_) => Kind::Pipe,
            Self::Injectable(_) => Kind::Plain,
        }
    }

    /// Returns the class members the annotation declares.
    #[must_use]
    pub fn members(&self) -> Option<&ClassMembers> {
        match self {
            Self::NgModule(_) => None,
            Self::Component(meta) | Self::Directive(meta) => Some(&meta.members),
            Self::Pipe(meta) => Some(&meta.members),
            Self::Injectable(meta) => Some(&meta.members),
        }
    }
}

/// The six member lists of a module definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NgModuleDef {
    /// Imported modules (bare or with providers).
    pub imports: Vec<DefEntry>,
    /// Declared components, directives and pipes.
    pub declarations: Vec<DefEntry>,
    /// Provider entries.
    pub providers: Vec<DefEntry>,
    /// Exported modules and declarables.
    pub exports: Vec<DefEntry>,
    /// Bootstrap components.
    pub bootstrap: Vec<DefEntry>,
    /// Entry components.
    pub entry_components: Vec<DefEntry>,
}

impl NgModuleDef {
    /// Replaces the imports.
    #[must_use]
    pub fn with_imports(mut self, entries: impl IntoIterator<Item = impl Into<DefEntry>>) -> Self {
        self.imports = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the declarations.
    #[must_use]
    pub fn with_declarations(
        mut self,
        entries: impl IntoIterator<Item = impl Into<DefEntry>>,
    ) -> Self {
        self.declarations = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the providers.
    #[must_use]
    pub fn with_providers(
        mut self,
        entries: impl IntoIterator<Item = impl Into<DefEntry>>,
    ) -> Self {
        self.providers = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the exports.
    #[must_use]
    pub fn with_exports(mut self, entries: impl IntoIterator<Item = impl Into<DefEntry>>) -> Self {
        self.exports = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the bootstrap list.
    #[must_use]
    pub fn with_bootstrap(
        mut self,
        entries: impl IntoIterator<Item = impl Into<DefEntry>>,
    ) -> Self {
        self.bootstrap = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the entry components.
    #[must_use]
    pub fn with_entry_components(
        mut self,
        entries: impl IntoIterator<Item = impl Into<DefEntry>>,
    ) -> Self {
        self.entry_components = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if every list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.declarations.is_empty()
            && self.providers.is_empty()
            && self.exports.is_empty()
            && self.bootstrap.is_empty()
            && self.entry_components.is_empty()
    }
}

/// A module paired with extra providers (`forRoot()` style imports).
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleWithProviders {
    /// The wrapped module.
    pub ng_module: ClassRef,
    /// Providers contributed by the wrapper.
    pub providers: Vec<DefEntry>,
}

impl ModuleWithProviders {
    /// Wraps a module with providers.
    #[must_use]
    pub fn new(
        ng_module: ClassRef,
        providers: impl IntoIterator<Item = impl Into<DefEntry>>,
    ) -> Self {
        Self {
            ng_module,
            providers: providers.into_iter().map(Into::into).collect(),
        }
    }
}

/// One member of a module definition list.
#[derive(Debug, Clone, PartialEq)]
pub enum DefEntry {
    /// A bare class: module, declarable, or class provider.
    Class(ClassRef),
    /// A module with providers.
    WithProviders(ModuleWithProviders),
    /// A provider object (`{ provide, use* }`).
    Provider(ProviderDef),
    /// A nested list.
    Nested(Vec<DefEntry>),
}

impl DefEntry {
    /// Flattens nested lists, preserving order.
    #[must_use]
    pub fn flatten(entries: &[Self]) -> Vec<Self> {
        let mut out = Vec::with_capacity(entries.len());
        flatten_into(entries, &mut out);
        out
    }

    /// Returns the bare class, if this entry is one.
    #[must_use]
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Self::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Returns the class a module entry refers to, unwrapping providers.
    #[must_use]
    pub fn module_class(&self) -> Option<&ClassRef> {
        match self {
            Self::Class(class) => Some(class),
            Self::WithProviders(mwp) => Some(&mwp.ng_module),
            Self::Provider(_) | Self::Nested(_) => None,
        }
    }

    /// Returns the token this entry provides or declares.
    ///
    /// Nested lists have no token.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match self {
            Self::Class(class) => Some(Token::Class(class.clone())),
            Self::WithProviders(mwp) => Some(Token::Class(mwp.ng_module.clone())),
            Self::Provider(provider) => Some(provider.token.clone()),
            Self::Nested(_) => None,
        }
    }
}

fn flatten_into(entries: &[DefEntry], out: &mut Vec<DefEntry>) {
    for entry in entries {
        match entry {
            DefEntry::Nested(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}

impl From<ClassRef> for DefEntry {
    fn from(class: ClassRef) -> Self {
        Self::Class(class)
    }
}

impl From<&ClassRef> for DefEntry {
    fn from(class: &ClassRef) -> Self {
        Self::Class(class.clone())
    }
}

impl From<ModuleWithProviders> for DefEntry {
    fn from(mwp: ModuleWithProviders) -> Self {
        Self::WithProviders(mwp)
    }
}

impl From<ProviderDef> for DefEntry {
    fn from(provider: ProviderDef) -> Self {
        Self::Provider(provider)
    }
}

impl From<Vec<DefEntry>> for DefEntry {
    fn from(entries: Vec<DefEntry>) -> Self {
        Self::Nested(entries)
    }
}

/// An input or output declaration: `property` or `property: alias`.
///
/// # Examples
///
/// ```
/// use nm_core::Binding;
///
/// let plain = Binding::parse("value");
/// assert_eq!(plain.binding_name(), "value");
///
/// let aliased = Binding::parse("something: bah");
/// assert_eq!(aliased.property, "something");
/// assert_eq!(aliased.binding_name(), "bah");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    /// The class property receiving the value.
    pub property: String,
    /// The public name used in templates, if different.
    pub alias: Option<String>,
}

impl Binding {
    /// Parses a `property` or `property: alias` declaration.
    #[must_use]
    pub fn parse(declaration: &str) -> Self {
        match declaration.split_once(':') {
            Some((property, alias)) if !alias.trim().is_empty() => Self {
                property: property.trim().to_owned(),
                alias: Some(alias.trim().to_owned()),
            },
            Some((property, _)) => Self {
                property: property.trim().to_owned(),
                alias: None,
            },
            None => Self {
                property: declaration.trim().to_owned(),
                alias: None,
            },
        }
    }

    /// Returns the name templates bind to.
    #[must_use]
    pub fn binding_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.property)
    }
}

/// Inline list of bindings; most declarables have only a few.
pub type Bindings = SmallVec<[Binding; 4]>;

/// Methods and properties a class declares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassMembers {
    /// Method names.
    pub methods: SmallVec<[String; 4]>,
    /// Properties with their initial values.
    pub properties: Vec<(String, Value)>,
}

impl ClassMembers {
    /// Creates members from method names.
    #[must_use]
    pub fn with_methods<S: Into<String>>(methods: impl IntoIterator<Item = S>) -> Self {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
            properties: Vec::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.push((name.into(), value));
        self
    }
}

/// Metadata of a component or directive.
///
/// # Examples
///
/// ```
/// use nm_core::DirectiveMeta;
///
/// let meta = DirectiveMeta::new("[exampleDirective]")
///     .with_inputs(["exampleDirective", "something: bah"])
///     .with_outputs(["someOutput"])
///     .with_export_as("foo");
///
/// assert_eq!(meta.selector.as_deref(), Some("[exampleDirective]"));
/// assert_eq!(meta.inputs[1].binding_name(), "bah");
/// assert_eq!(meta.export_as.as_deref(), Some("foo"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveMeta {
    /// CSS selector matching host elements.
    pub selector: Option<String>,
    /// Declared inputs.
    pub inputs: Bindings,
    /// Declared outputs.
    pub outputs: Bindings,
    /// Template reference name.
    pub export_as: Option<String>,
    /// Component template; `None` for directives.
    pub template: Option<String>,
    /// Declared methods and properties.
    pub members: ClassMembers,
    /// Providers declared on the class itself.
    pub providers: Vec<DefEntry>,
}

impl DirectiveMeta {
    /// Creates metadata with a selector.
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            ..Self::default()
        }
    }

    /// Sets the inputs from `property` / `property: alias` declarations.
    #[must_use]
    pub fn with_inputs<'a>(mut self, inputs: impl IntoIterator<Item = &'a str>) -> Self {
        self.inputs = inputs.into_iter().map(Binding::parse).collect();
        self
    }

    /// Sets the outputs from `property` / `property: alias` declarations.
    #[must_use]
    pub fn with_outputs<'a>(mut self, outputs: impl IntoIterator<Item = &'a str>) -> Self {
        self.outputs = outputs.into_iter().map(Binding::parse).collect();
        self
    }

    /// Sets the template reference name.
    #[must_use]
    pub fn with_export_as(mut self, export_as: impl Into<String>) -> Self {
        self.export_as = Some(export_as.into());
        self
    }

    /// Sets the template.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Sets the declared members.
    #[must_use]
    pub fn with_members(mut self, members: ClassMembers) -> Self {
        self.members = members;
        self
    }

    /// Sets the class-level providers.
    #[must_use]
    pub fn with_providers(
        mut self,
        providers: impl IntoIterator<Item = impl Into<DefEntry>>,
    ) -> Self {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }
}

/// Metadata of a pipe.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeMeta {
    /// Name used in templates.
    pub name: String,
    /// Whether the pipe is pure.
    pub pure: bool,
    /// Declared members besides `transform`.
    pub members: ClassMembers,
}

impl PipeMeta {
    /// Creates a pure pipe.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pure: true,
            members: ClassMembers::default(),
        }
    }
}

/// Metadata of an injectable service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectableMeta {
    /// Injector scope, e.g. `root`.
    pub provided_in: Option<String>,
    /// Declared methods and properties.
    pub members: ClassMembers,
}

impl InjectableMeta {
    /// Creates metadata with the given members.
    #[must_use]
    pub fn new(members: ClassMembers) -> Self {
        Self {
            provided_in: None,
            members,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderDef;
    use serde_json::json;

    #[test]
    fn test_binding_parse_trims() {
        let binding = Binding::parse(" value :  alias ");
        assert_eq!(binding.property, "value");
        assert_eq!(binding.alias.as_deref(), Some("alias"));

        let dangling = Binding::parse("value:");
        assert_eq!(dangling.alias, None);
        assert_eq!(dangling.binding_name(), "value");
    }

    #[test]
    fn test_annotation_kinds() {
        assert_eq!(
            Annotation::NgModule(NgModuleDef::default()).kind(),
            Kind::Module
        );
        assert_eq!(
            Annotation::Component(DirectiveMeta::new("app-root")).kind(),
            Kind::Component
        );
        assert_eq!(
            Annotation::Injectable(InjectableMeta::default()).kind(),
            Kind::Plain
        );
    }

    #[test]
    fn test_entry_tokens() {
        let module = ClassRef::new("RouterModule");
        let mwp = DefEntry::from(ModuleWithProviders::new(module.clone(), Vec::<DefEntry>::new()));
        assert_eq!(mwp.token(), Some(Token::Class(module.clone())));
        assert_eq!(mwp.module_class(), Some(&module));

        let provider = DefEntry::from(ProviderDef::value(
            Token::Name("API_URL".to_owned()),
            Value::from(json!("http://localhost")),
        ));
        assert_eq!(provider.token(), Some(Token::Name("API_URL".to_owned())));
        assert_eq!(DefEntry::Nested(Vec::new()).token(), None);
    }

    #[test]
    fn test_module_def_is_empty() {
        assert!(NgModuleDef::default().is_empty());
        let def = NgModuleDef::default().with_exports([ClassRef::new("Shared")]);
        assert!(!def.is_empty());
    }
}
