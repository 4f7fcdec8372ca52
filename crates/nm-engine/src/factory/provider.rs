//! Provider and service mocks.

use std::sync::Arc;

use nm_core::{
    Annotation, ClassRef, DefEntry, InjectableMeta, Instance, Kind, MockTag, ProviderDef, Token,
    Value,
};
use tracing::{debug, trace};

use crate::context::ResolutionContext;
use crate::oracle::MetadataOracle;

/// Mocks one provider entry.
///
/// - Cached results are reused while `cache_provider` is on.
/// - Injection tokens are dropped (`None`): a mocked module cannot know what
///   to provide for them, and providing `undefined` breaks multi tokens.
/// - Infrastructure classes on the never-mock list are returned unchanged.
/// - Everything else becomes `{ provide: token, useValue: mock_service(token) }`.
///
/// The `multi` flag is left to the caller.
///
/// # Examples
///
/// ```
/// use nm_core::{ClassRef, DefEntry, InjectionToken, ProviderDef, Value};
/// use nm_engine::{ResolutionContext, StaticOracle, mock_provider};
///
/// let oracle = StaticOracle::new();
/// let mut ctx = ResolutionContext::new();
///
/// let token = InjectionToken::new("HTTP_INTERCEPTORS");
/// let entry = DefEntry::from(ProviderDef::value(token.into(), Value::Undefined).multi());
/// assert!(mock_provider(&mut ctx, &oracle, &entry).is_none());
///
/// let renderer = DefEntry::from(ClassRef::new("RendererFactory2"));
/// assert_eq!(mock_provider(&mut ctx, &oracle, &renderer), Some(renderer.clone()));
/// ```
pub fn mock_provider(
    ctx: &mut ResolutionContext,
    oracle: &dyn MetadataOracle,
    entry: &DefEntry,
) -> Option<DefEntry> {
    let token = entry.token()?;

    if ctx.flags().cache_provider {
        if let Some(cached) = ctx.cached_provider(&token) {
            trace!(token = %token, "Provider cache hit");
            return Some(cached.clone());
        }
    }

    match &token {
        Token::Injection(_) => {
            debug!(token = %token, "Dropped injection token provider");
            return None;
        }
        Token::Class(class) if ctx.is_never_mock_provider(class) => {
            return Some(entry.clone());
        }
        _ => {}
    }

    let mocked = DefEntry::Provider(ProviderDef::value(
        token.clone(),
        mock_service(oracle, &token),
    ));
    if ctx.flags().cache_provider {
        ctx.set_cached_provider(token, mocked.clone());
    }
    Some(mocked)
}

/// Builds a mock service value for a token.
///
/// Class tokens produce an [`Instance`] of a fresh mock class whose methods
/// are recording stand-ins and whose properties are as declared. Other
/// tokens carry no shape and produce undefined.
///
/// # Examples
///
/// ```
/// use nm_core::{ClassMembers, InjectableMeta, Token};
/// use nm_engine::{StaticOracle, mock_service};
///
/// let mut oracle = StaticOracle::new();
/// let api = oracle.injectable(
///     "ApiService",
///     InjectableMeta::new(ClassMembers::with_methods(["get"])),
/// );
///
/// let value = mock_service(&oracle, &Token::from(&api));
/// let instance = value.as_instance().unwrap();
/// assert!(instance.is_mock_of(&api, None));
/// assert!(instance.call("get", &[]).unwrap().is_undefined());
/// assert_eq!(instance.method("get").unwrap().call_count(), 1);
/// ```
pub fn mock_service(oracle: &dyn MetadataOracle, token: &Token) -> Value {
    let Token::Class(class) = token else {
        return Value::Undefined;
    };
    let members = oracle.members_of(class);
    let mock = ClassRef::synthesize(
        MockTag {
            mock_of: class.clone(),
            kind: Kind::Plain,
            transform: None,
        },
        Annotation::Injectable(InjectableMeta::new(members.clone())),
    );

    let mut instance = Instance::new(mock);
    for method in &members.methods {
        instance = instance.with_method(method.as_str());
    }
    for (name, value) in members.properties {
        instance = instance.with_property(name, value);
    }
    Value::Instance(Arc::new(instance))
}
