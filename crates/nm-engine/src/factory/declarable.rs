//! Component, directive and pipe mock synthesis.
//!
//! A mock declarable keeps the public contract of its original (selector,
//! inputs, outputs, `exportAs`, pipe name) and nothing else. Component mocks
//! render their projected content only; every mock also provides itself
//! under the original token so injecting the original class yields the mock.

use nm_core::{
    Annotation, ClassRef, DefEntry, DirectiveMeta, Kind, MockError, MockTag, PipeMeta,
    ProviderDef, Result, StubFn, Token,
};
use tracing::debug;

use crate::context::ResolutionContext;
use crate::oracle::MetadataOracle;

/// Template of every mock component: a single default projection slot.
pub const MOCK_TEMPLATE: &str = "<ng-content></ng-content>";

/// Synthesizes (or returns the cached) mock of a component.
///
/// # Examples
///
/// ```
/// use nm_core::{DirectiveMeta, Kind};
/// use nm_engine::{MetadataOracle, ResolutionContext, StaticOracle, mock_component};
///
/// let mut oracle = StaticOracle::new();
/// let header = oracle.component(
///     "HeaderComponent",
///     DirectiveMeta::new("app-header").with_inputs(["title"]).with_template("<h1>real</h1>"),
/// );
///
/// let mut ctx = ResolutionContext::new();
/// let mock = mock_component(&mut ctx, &oracle, &header).unwrap();
///
/// assert!(mock.is_mocked_def_of(&header, Some(Kind::Component)));
/// let shape = oracle.shape_of(&mock);
/// assert_eq!(shape.selector.as_deref(), Some("app-header"));
/// assert_eq!(shape.inputs[0].property, "title");
/// assert_eq!(mock_component(&mut ctx, &oracle, &header).unwrap(), mock);
/// ```
pub fn mock_component(
    ctx: &mut ResolutionContext,
    oracle: &dyn MetadataOracle,
    class: &ClassRef,
) -> Result<ClassRef> {
    mock_directive_like(ctx, oracle, class, Kind::Component)
}

/// Synthesizes (or returns the cached) mock of a directive.
pub fn mock_directive(
    ctx: &mut ResolutionContext,
    oracle: &dyn MetadataOracle,
    class: &ClassRef,
) -> Result<ClassRef> {
    mock_directive_like(ctx, oracle, class, Kind::Directive)
}

fn mock_directive_like(
    ctx: &mut ResolutionContext,
    oracle: &dyn MetadataOracle,
    class: &ClassRef,
    kind: Kind,
) -> Result<ClassRef> {
    if let Some(original) = class.mock_of() {
        if class.is_mocked_def_of(original, Some(kind)) {
            return Ok(class.clone());
        }
    }
    if let Some(mock) = cached_of_kind(ctx, class, kind) {
        return Ok(mock);
    }

    let meta = match oracle.resolve(class) {
        Some(Annotation::Component(meta)) if kind == Kind::Component => meta,
        Some(Annotation::Directive(meta)) if kind == Kind::Directive => meta,
        _ => return Err(unresolvable(class, kind)),
    };

    let mock = ClassRef::mock(class, kind);
    let shape = DirectiveMeta {
        selector: meta.selector,
        inputs: meta.inputs,
        outputs: meta.outputs,
        export_as: meta.export_as,
        template: (kind == Kind::Component).then(|| MOCK_TEMPLATE.to_owned()),
        members: meta.members,
        providers: vec![DefEntry::Provider(ProviderDef::existing(
            Token::from(class),
            Token::from(&mock),
        ))],
    };
    let annotation = match kind {
        Kind::Component => Annotation::Component(shape),
        _ => Annotation::Directive(shape),
    };
    mock.define(annotation);

    debug!(class = %class, kind = %kind, "Synthesized mock");
    Ok(ctx.set_cached(class.clone(), mock))
}

/// Synthesizes a mock pipe.
///
/// Without a custom transform the mock's `transform` returns undefined and
/// the result is cached per epoch. A custom transform always produces a
/// fresh class, because two transforms are two different mocks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use nm_core::{PipeMeta, Value};
/// use nm_engine::{MetadataOracle, ResolutionContext, StaticOracle, instantiate, mock_pipe};
/// use serde_json::json;
///
/// let mut oracle = StaticOracle::new();
/// let date = oracle.pipe("DatePipe", PipeMeta::new("date"));
/// let mut ctx = ResolutionContext::new();
///
/// let silent = mock_pipe(&mut ctx, &oracle, &date, None).unwrap();
/// let instance = instantiate(&oracle, &silent);
/// assert!(instance.call("transform", &[Value::from(json!(1))]).unwrap().is_undefined());
///
/// let echo = mock_pipe(&mut ctx, &oracle, &date, Some(Arc::new(|args: &[Value]| {
///     Value::from(json!(format!("{:?}", args[0])))
/// })))
/// .unwrap();
/// assert_ne!(silent, echo);
/// assert_eq!(oracle.pipe_metadata(&echo).unwrap().name, "date");
/// ```
pub fn mock_pipe(
    ctx: &mut ResolutionContext,
    oracle: &dyn MetadataOracle,
    class: &ClassRef,
    transform: Option<StubFn>,
) -> Result<ClassRef> {
    if transform.is_none() {
        if let Some(original) = class.mock_of() {
            if class.is_mocked_def_of(original, Some(Kind::Pipe)) {
                return Ok(class.clone());
            }
        }
        if let Some(mock) = cached_of_kind(ctx, class, Kind::Pipe) {
            return Ok(mock);
        }
    }

    let meta: PipeMeta = oracle
        .pipe_metadata(class)
        .ok_or_else(|| unresolvable(class, Kind::Pipe))?;
    let custom = transform.is_some();
    let mock = ClassRef::synthesize(
        MockTag {
            mock_of: class.clone(),
            kind: Kind::Pipe,
            transform,
        },
        Annotation::Pipe(meta),
    );

    debug!(class = %class, custom, "Synthesized mock pipe");
    if custom {
        Ok(mock)
    } else {
        Ok(ctx.set_cached(class.clone(), mock))
    }
}

fn cached_of_kind(ctx: &ResolutionContext, class: &ClassRef, kind: Kind) -> Option<ClassRef> {
    ctx.cached(class)
        .filter(|mock| mock.is_mocked_def_of(class, Some(kind)))
        .cloned()
}

fn unresolvable(class: &ClassRef, expected: Kind) -> MockError {
    MockError::UnresolvableMetadata {
        class: class.name().to_owned(),
        expected,
    }
}
