//! Object instances and the recording stand-ins that back mock behaviour.
//!
//! A mock never runs the original class' code. Instead:
//!
//! - every method is a [`MockMethod`] that records its arguments and returns
//!   a configurable value (undefined by default),
//! - every output is an [`EventEmitter`] the test can fire on its own,
//! - structural directives get a [`RenderHook`] the test triggers manually.
//!
//! All stand-ins use `parking_lot` locks so an [`Instance`] can be shared as
//! `Arc<Instance>` between a provider table and the test that inspects it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use super::class::{ClassRef, Kind, StubFn};
use super::value::Value;
use crate::{FxHashMap, fx_hash_map};

/// Callback registered on an [`EventEmitter`].
pub type Subscriber = Arc<dyn Fn(&Value) + Send + Sync>;

/// A method replaced by a recording stand-in.
///
/// # Examples
///
/// ```
/// use nm_core::{MockMethod, Value};
/// use serde_json::json;
///
/// let method = MockMethod::new("save");
/// assert!(method.call(&[Value::from(json!(1))]).is_undefined());
///
/// method.returns(Value::from(json!(true)));
/// assert_eq!(method.call(&[]), Value::from(json!(true)));
/// assert_eq!(method.call_count(), 2);
/// assert_eq!(method.calls()[0], vec![Value::from(json!(1))]);
/// ```
pub struct MockMethod {
    name: String,
    calls: Mutex<Vec<Vec<Value>>>,
    returns: Mutex<Value>,
    implementation: Mutex<Option<StubFn>>,
}

impl MockMethod {
    /// Creates a stand-in that returns undefined.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: Mutex::new(Vec::new()),
            returns: Mutex::new(Value::Undefined),
            implementation: Mutex::new(None),
        }
    }

    /// Creates a stand-in backed by a custom implementation.
    #[must_use]
    pub fn with_implementation(name: impl Into<String>, implementation: StubFn) -> Self {
        let method = Self::new(name);
        *method.implementation.lock() = Some(implementation);
        method
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records a call and produces the configured result.
    pub fn call(&self, args: &[Value]) -> Value {
        self.calls.lock().push(args.to_vec());
        let implementation = self.implementation.lock().clone();
        match implementation {
            Some(implementation) => implementation(args),
            None => self.returns.lock().clone(),
        }
    }

    /// Sets the value returned by subsequent calls and drops any custom
    /// implementation.
    pub fn returns(&self, value: Value) {
        *self.implementation.lock() = None;
        *self.returns.lock() = value;
    }

    /// Replaces the implementation used by subsequent calls.
    pub fn implement(&self, implementation: StubFn) {
        *self.implementation.lock() = Some(implementation);
    }

    /// Returns the arguments of every recorded call, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().clone()
    }

    /// Returns the number of recorded calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

impl fmt::Debug for MockMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockMethod")
            .field("name", &self.name)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

/// An output replaced by an independently triggerable emitter.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use nm_core::{EventEmitter, Value};
///
/// let emitter = EventEmitter::default();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// emitter.subscribe(Arc::new(move |_| {
///     counter.fetch_add(1, Ordering::Relaxed);
/// }));
///
/// emitter.emit(Value::Undefined);
/// assert_eq!(seen.load(Ordering::Relaxed), 1);
/// assert_eq!(emitter.emitted().len(), 1);
/// ```
#[derive(Default)]
pub struct EventEmitter {
    emitted: Mutex<Vec<Value>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventEmitter {
    /// Emits a value to every subscriber.
    pub fn emit(&self, value: Value) {
        let subscribers = self.subscribers.lock().clone();
        for subscriber in &subscribers {
            subscriber(&value);
        }
        self.emitted.lock().push(value);
    }

    /// Registers a subscriber.
    pub fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers.lock().push(subscriber);
    }

    /// Returns every emitted value, oldest first.
    #[must_use]
    pub fn emitted(&self) -> Vec<Value> {
        self.emitted.lock().clone()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("emitted", &self.emitted.lock().len())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

/// Manual render trigger for mocked structural directives.
///
/// A mock has no template logic, so its content stays hidden until the test
/// calls [`render`](Self::render) and the fixture re-runs change detection.
#[derive(Debug, Default)]
pub struct RenderHook {
    renders: AtomicUsize,
}

impl RenderHook {
    /// Requests the directive's content to be rendered.
    pub fn render(&self) {
        self.renders.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns `true` once [`render`](Self::render) has been called.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.render_count() > 0
    }

    /// Returns how often [`render`](Self::render) was called.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::Relaxed)
    }
}

/// An instance of a class: its properties plus, for mocks, its stand-ins.
///
/// # Examples
///
/// ```
/// use nm_core::{ClassRef, Instance, Kind, Value};
/// use serde_json::json;
///
/// let original = ClassRef::new("UserService");
/// let mock = ClassRef::mock(&original, Kind::Plain);
/// let instance = Instance::new(mock)
///     .with_method("load")
///     .with_property("ready", Value::from(json!(false)));
///
/// assert!(instance.is_mock_of(&original, None));
/// assert!(instance.call("load", &[]).is_some());
/// assert!(instance.call("missing", &[]).is_none());
/// assert_eq!(instance.property("ready"), Value::from(json!(false)));
/// ```
pub struct Instance {
    class: ClassRef,
    properties: RwLock<FxHashMap<String, Value>>,
    methods: FxHashMap<String, MockMethod>,
    outputs: FxHashMap<String, EventEmitter>,
    render_hook: Option<RenderHook>,
}

impl Instance {
    /// Creates an instance without members.
    #[must_use]
    pub fn new(class: ClassRef) -> Self {
        Self {
            class,
            properties: RwLock::new(fx_hash_map()),
            methods: fx_hash_map(),
            outputs: fx_hash_map(),
            render_hook: None,
        }
    }

    /// Adds a recording method returning undefined.
    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.methods.insert(name.clone(), MockMethod::new(name));
        self
    }

    /// Adds a prepared recording method.
    #[must_use]
    pub fn with_mock_method(mut self, method: MockMethod) -> Self {
        self.methods.insert(method.name().to_owned(), method);
        self
    }

    /// Adds a property with its initial value.
    #[must_use]
    pub fn with_property(self, name: impl Into<String>, value: Value) -> Self {
        self.properties.write().insert(name.into(), value);
        self
    }

    /// Adds an output emitter.
    #[must_use]
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.insert(name.into(), EventEmitter::default());
        self
    }

    /// Adds a manual render hook.
    #[must_use]
    pub fn with_render_hook(mut self) -> Self {
        self.render_hook = Some(RenderHook::default());
        self
    }

    /// Returns the class this is an instance of.
    #[must_use]
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Checks whether this is an instance of a mock of `original`.
    #[must_use]
    pub fn is_mock_of(&self, original: &ClassRef, kind: Option<Kind>) -> bool {
        self.class.is_mocked_def_of(original, kind)
    }

    /// Returns a property value; unknown properties are undefined.
    #[must_use]
    pub fn property(&self, name: &str) -> Value {
        self.properties.read().get(name).cloned().unwrap_or_default()
    }

    /// Sets a property value.
    pub fn set_property(&self, name: impl Into<String>, value: Value) {
        self.properties.write().insert(name.into(), value);
    }

    /// Returns the names of all properties.
    #[must_use]
    pub fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.properties.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns a recording method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MockMethod> {
        self.methods.get(name)
    }

    /// Calls a recording method; `None` if the instance has no such method.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        self.methods.get(name).map(|method| method.call(args))
    }

    /// Returns an output emitter by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&EventEmitter> {
        self.outputs.get(name)
    }

    /// Returns the render hook of a mocked directive.
    #[must_use]
    pub fn render_hook(&self) -> Option<&RenderHook> {
        self.render_hook.as_ref()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class)
            .field("properties", &self.property_names())
            .field("methods", &self.methods.len())
            .field("outputs", &self.outputs.len())
            .finish_non_exhaustive()
    }
}
