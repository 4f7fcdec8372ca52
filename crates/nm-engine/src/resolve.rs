//! Builder-facing resolution API.

use nm_core::{ClassRef, Kind, MockError, Result};
use tracing::trace;

use crate::context::ResolutionContext;
use crate::harness::Host;

/// Returns the mock class standing in for `class`.
///
/// A mock passed in is unwrapped to its source first. When the harness
/// exposes a mock registry, that registry is authoritative; otherwise a mock
/// passed in resolves to itself and the context's cache is consulted. With
/// an expected kind, a mock of another kind fails like a missing one.
///
/// # Errors
///
/// [`MockError::MissingMock`] when no mock exists or its kind differs.
///
/// # Examples
///
/// ```
/// use nm_core::{DirectiveMeta, Kind};
/// use nm_engine::{Host, ResolutionContext, StaticOracle, mock_component, resolve_mock};
///
/// let mut oracle = StaticOracle::new();
/// let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
/// let mut ctx = ResolutionContext::new();
/// let host = Host::detached(&oracle);
///
/// assert!(resolve_mock(&ctx, host, &header, None).is_err());
///
/// let mock = mock_component(&mut ctx, &oracle, &header).unwrap();
/// assert_eq!(resolve_mock(&ctx, host, &header, Some(Kind::Component)).unwrap(), mock);
/// assert_eq!(resolve_mock(&ctx, host, &mock, None).unwrap(), mock);
/// assert!(resolve_mock(&ctx, host, &header, Some(Kind::Pipe)).is_err());
/// ```
pub fn resolve_mock(
    ctx: &ResolutionContext,
    host: Host<'_>,
    class: &ClassRef,
    kind: Option<Kind>,
) -> Result<ClassRef> {
    let source = class.mock_of().unwrap_or(class);
    let missing = || MockError::MissingMock {
        class: source.name().to_owned(),
    };

    let mock = if let Some(registry) = host.harness.active_mocks() {
        registry.get(source).cloned().ok_or_else(missing)?
    } else if class.is_mock() {
        class.clone()
    } else {
        ctx.cached(source).cloned().ok_or_else(missing)?
    };

    if let Some(kind) = kind {
        if !mock.is_mocked_def_of(source, Some(kind)) {
            trace!(class = %source, kind = %kind, "Resolved class has another kind");
            return Err(missing());
        }
    }
    Ok(mock)
}
