//! Fixtures: rendering templates against a configured test module.
//!
//! Rendering follows the framework's compilation rules closely enough for
//! mocks to be observable:
//!
//! - an element is matched against the *compilation scope* of the template
//!   it appears in: the declarations of the declaring module plus everything
//!   its imports export, transitively through re-exported modules
//! - a matched component renders its own template in its own module's scope;
//!   `<ng-content>` slots show the host element's children, rendered in the
//!   host's scope
//! - a `*structural` attribute wraps the element in a template; a mocked
//!   structural directive keeps it hidden (`<!---->`) until its render hook
//!   fired and [`Fixture::detect_changes`] ran
//! - `{{ expr | pipe }}` interpolations evaluate against the component
//!   instance (or the render parameters at the root) and run pipe
//!   `transform` stand-ins
//!
//! Instances are keyed by their position in the rendered tree, so state such
//! as a render hook survives repeated change detection.

use std::rc::Rc;
use std::sync::Arc;

use nm_core::{
    Annotation, ClassRef, DefEntry, DirectiveMeta, FxHashMap, FxHashSet, Instance, Kind,
    NgModuleDef, RenderHook, Result, TemplateError, Value, fx_hash_map, fx_hash_set,
};
use tracing::trace;

use super::selector::Selector;
use super::template::{AttrKind, Attribute, Element, Node, is_void, parse_template};
use crate::factory::instantiate;
use crate::oracle::MetadataOracle;

/// Placeholder left where a template is not rendered.
const HIDDEN: &str = "<!---->";

/// Component templates rendered inside each other before rendering fails.
const MAX_COMPONENT_DEPTH: usize = 64;

/// A rendered template.
pub struct Fixture<'o> {
    oracle: &'o dyn MetadataOracle,
    scopes: Scopes,
    nodes: Vec<Node>,
    params: serde_json::Map<String, serde_json::Value>,
    point: Option<ClassRef>,
    templates: FxHashMap<ClassRef, Rc<Vec<Node>>>,
    instances: FxHashMap<(String, ClassRef), Arc<Instance>>,
    placed: Vec<Arc<Instance>>,
    html: String,
}

impl<'o> Fixture<'o> {
    pub(crate) fn new(
        oracle: &'o dyn MetadataOracle,
        module: &NgModuleDef,
        template: &str,
        params: serde_json::Map<String, serde_json::Value>,
        point: Option<ClassRef>,
    ) -> Result<Self> {
        Ok(Self {
            oracle,
            scopes: Scopes::build(oracle, module),
            nodes: parse_template(template)?,
            params,
            point,
            templates: fx_hash_map(),
            instances: fx_hash_map(),
            placed: Vec::new(),
            html: String::new(),
        })
    }

    /// Re-renders the template.
    pub fn detect_changes(&mut self) -> Result<()> {
        let root = Rc::clone(&self.scopes.root);
        let mut renderer = Renderer {
            oracle: self.oracle,
            scopes: &self.scopes,
            templates: &mut self.templates,
            instances: &mut self.instances,
            placed: Vec::new(),
            out: String::new(),
            depth: 0,
        };
        renderer.nodes(&self.nodes, &root, Context::Host(&self.params), "", None)?;

        let Renderer { placed, out, .. } = renderer;
        trace!(instances = placed.len(), "Change detection finished");
        self.placed = placed;
        self.html = out;
        Ok(())
    }

    /// The rendered markup.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// The render parameters.
    #[must_use]
    pub fn params(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.params
    }

    /// The instance of the rendered class, when a class was rendered.
    #[must_use]
    pub fn point(&self) -> Option<Arc<Instance>> {
        let point = self.point.as_ref()?;
        self.find(point)
    }

    /// The first instance of `class`, or of a mock of it.
    #[must_use]
    pub fn find(&self, class: &ClassRef) -> Option<Arc<Instance>> {
        self.placed
            .iter()
            .find(|instance| stands_for(instance.class(), class))
            .map(Arc::clone)
    }

    /// Every instance of `class`, or of a mock of it, in render order.
    #[must_use]
    pub fn find_all(&self, class: &ClassRef) -> Vec<Arc<Instance>> {
        self.placed
            .iter()
            .filter(|instance| stands_for(instance.class(), class))
            .map(Arc::clone)
            .collect()
    }

    /// Every instance of exactly `class`, in render order.
    #[must_use]
    pub fn instances_of(&self, class: &ClassRef) -> Vec<Arc<Instance>> {
        self.placed
            .iter()
            .filter(|instance| instance.class() == class)
            .map(Arc::clone)
            .collect()
    }
}

impl std::fmt::Debug for Fixture<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fixture")
            .field("html", &self.html)
            .field("instances", &self.placed.len())
            .finish_non_exhaustive()
    }
}

fn stands_for(candidate: &ClassRef, class: &ClassRef) -> bool {
    candidate == class || candidate.mock_of() == Some(class)
}

// =============================================================================
// Compilation scopes
// =============================================================================

#[derive(Debug)]
struct Declared {
    class: ClassRef,
    kind: Kind,
    selectors: Vec<Selector>,
    meta: DirectiveMeta,
}

#[derive(Debug, Default)]
struct Scope {
    directives: Vec<Declared>,
    pipes: Vec<(String, ClassRef)>,
}

impl Scope {
    fn compile(oracle: &dyn MetadataOracle, def: &NgModuleDef) -> Self {
        let mut scope = Self::default();
        let mut added = fx_hash_set();
        for entry in DefEntry::flatten(&def.declarations) {
            if let Some(class) = entry.as_class() {
                scope.add(oracle, class, &mut added);
            }
        }
        let mut visited = fx_hash_set();
        for entry in DefEntry::flatten(&def.imports) {
            if let Some(module) = entry.module_class() {
                scope.add_exports(oracle, module, &mut visited, &mut added);
            }
        }
        scope
    }

    fn add_exports(
        &mut self,
        oracle: &dyn MetadataOracle,
        module: &ClassRef,
        visited: &mut FxHashSet<ClassRef>,
        added: &mut FxHashSet<ClassRef>,
    ) {
        if !visited.insert(module.clone()) {
            return;
        }
        let Some(def) = oracle.module_metadata(module) else {
            return;
        };
        for entry in DefEntry::flatten(&def.exports) {
            let Some(class) = entry.module_class() else {
                continue;
            };
            if oracle.is_kind(class, Kind::Module) {
                self.add_exports(oracle, class, visited, added);
            } else {
                self.add(oracle, class, added);
            }
        }
    }

    fn add(
        &mut self,
        oracle: &dyn MetadataOracle,
        class: &ClassRef,
        added: &mut FxHashSet<ClassRef>,
    ) {
        if !added.insert(class.clone()) {
            return;
        }
        match oracle.resolve(class) {
            Some(Annotation::Component(meta)) => self.push_directive(class, Kind::Component, meta),
            Some(Annotation::Directive(meta)) => self.push_directive(class, Kind::Directive, meta),
            Some(Annotation::Pipe(meta)) => self.pipes.push((meta.name, class.clone())),
            _ => {}
        }
    }

    fn push_directive(&mut self, class: &ClassRef, kind: Kind, meta: DirectiveMeta) {
        let selectors = meta
            .selector
            .as_deref()
            .map(Selector::parse_list)
            .unwrap_or_default();
        self.directives.push(Declared {
            class: class.clone(),
            kind,
            selectors,
            meta,
        });
    }

    fn matching<'s>(&'s self, tag: &str, names: &[&str]) -> Vec<&'s Declared> {
        self.directives
            .iter()
            .filter(|declared| Selector::matches_any(&declared.selectors, tag, names))
            .collect()
    }

    fn pipe(&self, name: &str) -> Option<&ClassRef> {
        self.pipes
            .iter()
            .find(|(pipe, _)| pipe == name)
            .map(|(_, class)| class)
    }
}

#[derive(Debug)]
struct Scopes {
    root: Rc<Scope>,
    by_module: FxHashMap<ClassRef, Rc<Scope>>,
    declared_in: FxHashMap<ClassRef, ClassRef>,
}

impl Scopes {
    fn build(oracle: &dyn MetadataOracle, module: &NgModuleDef) -> Self {
        let mut scopes = Self {
            root: Rc::new(Scope::compile(oracle, module)),
            by_module: fx_hash_map(),
            declared_in: fx_hash_map(),
        };

        let mut queue: Vec<ClassRef> = Vec::new();
        enqueue_modules(oracle, module, &mut queue);
        let mut index = 0;
        while let Some(module) = queue.get(index).cloned() {
            index += 1;
            if scopes.by_module.contains_key(&module) {
                continue;
            }
            let Some(def) = oracle.module_metadata(&module) else {
                continue;
            };
            for entry in DefEntry::flatten(&def.declarations) {
                if let Some(class) = entry.as_class() {
                    scopes
                        .declared_in
                        .entry(class.clone())
                        .or_insert_with(|| module.clone());
                }
            }
            scopes
                .by_module
                .insert(module, Rc::new(Scope::compile(oracle, &def)));
            enqueue_modules(oracle, &def, &mut queue);
        }
        scopes
    }

    fn for_class(&self, class: &ClassRef) -> Rc<Scope> {
        Rc::clone(
            self.declared_in
                .get(class)
                .and_then(|module| self.by_module.get(module))
                .unwrap_or(&self.root),
        )
    }
}

fn enqueue_modules(oracle: &dyn MetadataOracle, def: &NgModuleDef, queue: &mut Vec<ClassRef>) {
    let entries = DefEntry::flatten(&def.imports)
        .into_iter()
        .chain(DefEntry::flatten(&def.exports));
    for entry in entries {
        if let Some(class) = entry.module_class() {
            if oracle.is_kind(class, Kind::Module) {
                queue.push(class.clone());
            }
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

#[derive(Clone, Copy)]
enum Context<'c> {
    Host(&'c serde_json::Map<String, serde_json::Value>),
    Component(&'c Instance),
}

impl Context<'_> {
    fn eval(self, expression: &str) -> Value {
        let expression = expression.trim();
        if expression.is_empty() {
            return Value::Undefined;
        }
        if let Some(literal) = expression
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
        {
            return Value::from(serde_json::Value::from(literal));
        }
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(expression) {
            return Value::from(json);
        }
        match self {
            Self::Host(params) => params
                .get(expression)
                .cloned()
                .map_or(Value::Undefined, Value::from),
            Self::Component(instance) => instance.property(expression),
        }
    }
}

struct Projection<'p> {
    nodes: &'p [Node],
    scope: &'p Rc<Scope>,
    context: Context<'p>,
    path: &'p str,
    outer: Option<&'p Projection<'p>>,
}

struct Renderer<'f, 'o> {
    oracle: &'o dyn MetadataOracle,
    scopes: &'f Scopes,
    templates: &'f mut FxHashMap<ClassRef, Rc<Vec<Node>>>,
    instances: &'f mut FxHashMap<(String, ClassRef), Arc<Instance>>,
    placed: Vec<Arc<Instance>>,
    out: String,
    depth: usize,
}

impl Renderer<'_, '_> {
    fn nodes(
        &mut self,
        nodes: &[Node],
        scope: &Rc<Scope>,
        context: Context<'_>,
        path: &str,
        projection: Option<&Projection<'_>>,
    ) -> Result<()> {
        for (index, node) in nodes.iter().enumerate() {
            let path = format!("{path}/{index}");
            match node {
                Node::Text(text) => self.text(text, scope, context),
                Node::Element(element) => self.element(element, scope, context, &path, projection)?,
            }
        }
        Ok(())
    }

    fn element(
        &mut self,
        element: &Element,
        scope: &Rc<Scope>,
        context: Context<'_>,
        path: &str,
        projection: Option<&Projection<'_>>,
    ) -> Result<()> {
        if element.tag == "ng-content" {
            if let Some(slot) = projection {
                self.nodes(slot.nodes, slot.scope, slot.context, slot.path, slot.outer)?;
            }
            return Ok(());
        }

        if let Some(structural) = element.structural() {
            let names = [structural.name.as_str()];
            let mut visible = true;
            for declared in scope.matching("ng-template", &names) {
                if declared.kind != Kind::Directive {
                    continue;
                }
                let instance = self.instance(format!("{path}*"), &declared.class);
                bind_inputs(&instance, &declared.meta, std::slice::from_ref(structural), context);
                if declared.class.is_mock() {
                    visible &= instance.render_hook().is_some_and(RenderHook::is_rendered);
                }
            }
            if !visible {
                self.out.push_str(HIDDEN);
                return Ok(());
            }
        }

        self.out.push('<');
        self.out.push_str(&element.tag);
        for attribute in &element.attributes {
            if attribute.kind != AttrKind::Plain {
                continue;
            }
            self.out.push(' ');
            self.out.push_str(&attribute.name);
            if let Some(value) = &attribute.value {
                self.out.push_str("=\"");
                self.out.push_str(value);
                self.out.push('"');
            }
        }
        self.out.push('>');

        let names = element.match_names();
        let mut component = None;
        for declared in scope.matching(&element.tag, &names) {
            let instance = self.instance(path.to_owned(), &declared.class);
            bind_inputs(&instance, &declared.meta, &element.attributes, context);
            if declared.kind == Kind::Component && component.is_none() {
                component = Some((declared, instance));
            }
        }

        match component {
            Some((declared, instance)) => {
                if self.depth >= MAX_COMPONENT_DEPTH {
                    return Err(TemplateError::TooDeep {
                        tag: element.tag.clone(),
                        limit: MAX_COMPONENT_DEPTH,
                    }
                    .into());
                }
                let template = self.template(&declared.class, &declared.meta)?;
                let inner = self.scopes.for_class(&declared.class);
                let slot = Projection {
                    nodes: &element.children,
                    scope,
                    context,
                    path,
                    outer: projection,
                };
                let inner_path = format!("{path}/c");
                self.depth += 1;
                let rendered = self.nodes(
                    &template,
                    &inner,
                    Context::Component(&instance),
                    &inner_path,
                    Some(&slot),
                );
                self.depth -= 1;
                rendered?;
            }
            None => self.nodes(&element.children, scope, context, path, projection)?,
        }

        if !is_void(&element.tag) {
            self.out.push_str("</");
            self.out.push_str(&element.tag);
            self.out.push('>');
        }
        Ok(())
    }

    fn text(&mut self, text: &str, scope: &Rc<Scope>, context: Context<'_>) {
        let mut rest = text;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            self.out.push_str(&rest[..start]);
            let value = self.interpolate(&rest[start + 2..start + 2 + len], scope, context);
            self.out.push_str(&display(&value));
            rest = &rest[start + 2 + len + 2..];
        }
        self.out.push_str(rest);
    }

    fn interpolate(&mut self, expression: &str, scope: &Rc<Scope>, context: Context<'_>) -> Value {
        let mut parts = expression.split('|');
        let mut value = context.eval(parts.next().unwrap_or_default());
        for pipe in parts {
            let name = pipe.split(':').next().unwrap_or_default().trim();
            let Some(class) = scope.pipe(name) else {
                trace!(pipe = name, "Pipe not in scope");
                continue;
            };
            let instance = self.instance(format!("|{name}"), class);
            if let Some(transformed) = instance.call("transform", std::slice::from_ref(&value)) {
                value = transformed;
            }
        }
        value
    }

    fn instance(&mut self, path: String, class: &ClassRef) -> Arc<Instance> {
        let oracle = self.oracle;
        let instance = Arc::clone(
            self.instances
                .entry((path, class.clone()))
                .or_insert_with(|| instantiate(oracle, class)),
        );
        self.placed.push(Arc::clone(&instance));
        instance
    }

    fn template(&mut self, class: &ClassRef, meta: &DirectiveMeta) -> Result<Rc<Vec<Node>>> {
        if let Some(template) = self.templates.get(class) {
            return Ok(Rc::clone(template));
        }
        let nodes = Rc::new(parse_template(meta.template.as_deref().unwrap_or_default())?);
        self.templates.insert(class.clone(), Rc::clone(&nodes));
        Ok(nodes)
    }
}

fn bind_inputs(
    instance: &Instance,
    meta: &DirectiveMeta,
    attributes: &[Attribute],
    context: Context<'_>,
) {
    for attribute in attributes {
        let value = match attribute.kind {
            AttrKind::Plain => Value::from(serde_json::Value::from(
                attribute.value.clone().unwrap_or_default(),
            )),
            AttrKind::Input | AttrKind::TwoWay | AttrKind::Structural => {
                context.eval(attribute.value.as_deref().unwrap_or_default())
            }
            AttrKind::Output | AttrKind::Reference => continue,
        };
        if let Some(input) = meta
            .inputs
            .iter()
            .find(|input| input.binding_name() == attribute.name)
        {
            instance.set_property(input.property.as_str(), value);
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Json(serde_json::Value::Null) => String::new(),
        Value::Json(serde_json::Value::String(text)) => text.clone(),
        Value::Json(json) => json.to_string(),
        Value::Instance(_) => "[object Object]".to_owned(),
    }
}
