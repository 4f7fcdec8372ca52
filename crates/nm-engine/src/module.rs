//! The module graph rewriter.
//!
//! [`mock_module_def`] walks the six member lists of a module definition and
//! resolves every member exactly once per walk, with a strict precedence:
//!
//! 1. already resolved in this walk
//! 2. modules and modules-with-providers are rewritten recursively
//! 3. a configuration-layer [`Decision`]
//! 4. skip-mock keeps the original
//! 5. components, directives and pipes go to their factory
//! 6. everything else is a provider
//!
//! [`mock_module`] wraps that walk for one module class: it consults the
//! never-mock list, the harness, the cache and the decision table, allocates
//! the mock before walking so cycles terminate, and reuses the original
//! module when nothing changed.
//!
//! # Export reconstruction
//!
//! A consumer of a mocked module can only see what the module exports, so
//! the rewritten exports are the resolved original exports plus every
//! resolved import and declaration not already exported. When exports must
//! be "correct" (skip-mock is active, or the `correct_module_exports` flag is
//! on) only members carrying the `export` marker are appended. A marked
//! member also marks its module, so visibility propagates to consumers.

use nm_core::{
    Annotation, ClassRef, Decision, DefEntry, FxHashMap, Kind, MockError, ModuleWithProviders,
    NgModuleDef, ProviderDef, Replacement, Result, Token, Value, fx_hash_map,
};
use tracing::{debug, trace};

use crate::context::{PendingModule, ResolutionContext};
use crate::factory::{mock_component, mock_directive, mock_pipe, mock_provider};
use crate::harness::Host;
use crate::resolve::resolve_mock;

/// Rewrites one module definition.
///
/// Returns whether anything changed and the rewritten definition. `module`
/// is the class the definition belongs to, if any; export markers found on
/// members are propagated to it.
///
/// # Examples
///
/// ```
/// use nm_core::{DirectiveMeta, NgModuleDef};
/// use nm_engine::{Host, MetadataOracle, ResolutionContext, StaticOracle, mock_module_def};
///
/// let mut oracle = StaticOracle::new();
/// let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
/// let def = NgModuleDef::default().with_declarations([&header]);
///
/// let mut ctx = ResolutionContext::new();
/// let (changed, mocked) = mock_module_def(&mut ctx, Host::detached(&oracle), &def, None).unwrap();
///
/// assert!(changed);
/// let mock = mocked.declarations[0].as_class().unwrap();
/// assert!(mock.is_mocked_def_of(&header, None));
/// // Mocked declarations are re-exported for the test's benefit.
/// assert_eq!(mocked.exports, mocked.declarations);
/// ```
pub fn mock_module_def(
    ctx: &mut ResolutionContext,
    host: Host<'_>,
    def: &NgModuleDef,
    module: Option<&ClassRef>,
) -> Result<(bool, NgModuleDef)> {
    let mut rewriter = DefRewriter::new(host);
    let mut mocked = NgModuleDef {
        imports: rewriter.resolve_list(ctx, &def.imports)?,
        declarations: rewriter.resolve_list(ctx, &def.declarations)?,
        entry_components: rewriter.resolve_list(ctx, &def.entry_components)?,
        bootstrap: rewriter.resolve_list(ctx, &def.bootstrap)?,
        providers: rewriter.resolve_providers(ctx, &def.providers)?,
        exports: rewriter.resolve_list(ctx, &def.exports)?,
    };

    let correct = ctx.is_skip_mock() || ctx.flags().correct_module_exports;
    let members = DefEntry::flatten(&def.imports)
        .into_iter()
        .chain(DefEntry::flatten(&def.declarations));
    for member in members {
        let Some(class) = member.module_class() else {
            continue;
        };
        let Some(resolved) = rewriter.resolve(ctx, &DefEntry::Class(class.clone()))? else {
            continue;
        };

        let marked = ctx.is_exported(class);
        if marked {
            if let Some(module) = module {
                if !ctx.is_exported(module) {
                    trace!(module = %module, member = %class, "Export marker propagated");
                    ctx.mark_export(module);
                }
            }
        }

        if correct && !marked {
            continue;
        }
        if mocked.exports.contains(&resolved) {
            continue;
        }
        rewriter.changed = true;
        mocked.exports.push(resolved);
    }

    Ok((rewriter.changed, mocked))
}

/// Mocks a module or a module with providers.
///
/// Bare modules resolve to a module class; a module with providers keeps its
/// wrapper when it declared any providers.
///
/// # Examples
///
/// ```
/// use nm_core::{DefEntry, DirectiveMeta, NgModuleDef};
/// use nm_engine::{Host, ResolutionContext, StaticOracle, mock_module};
///
/// let mut oracle = StaticOracle::new();
/// let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
/// let layout = oracle.module("LayoutModule", NgModuleDef::default().with_declarations([&header]));
///
/// let mut ctx = ResolutionContext::new();
/// let host = Host::detached(&oracle);
/// let first = mock_module(&mut ctx, host, &DefEntry::from(&layout)).unwrap();
/// let second = mock_module(&mut ctx, host, &DefEntry::from(&layout)).unwrap();
///
/// assert_eq!(first, second);
/// assert!(first.as_class().unwrap().is_mocked_def_of(&layout, None));
/// ```
pub fn mock_module(
    ctx: &mut ResolutionContext,
    host: Host<'_>,
    entry: &DefEntry,
) -> Result<DefEntry> {
    let (module, providers) = match entry {
        DefEntry::Class(class) => (class, None),
        DefEntry::WithProviders(mwp) => (&mwp.ng_module, Some(&mwp.providers)),
        DefEntry::Provider(_) | DefEntry::Nested(_) => {
            return Err(MockError::UnresolvableMetadata {
                class: entry.token().map_or_else(String::new, |token| token.to_string()),
                expected: Kind::Module,
            });
        }
    };

    if ctx.is_never_mock_module(module) {
        trace!(module = %module, "Module is never mocked");
        return Ok(entry.clone());
    }

    if providers.is_none() && host.harness.is_instantiated() {
        match resolve_mock(ctx, host, module, Some(Kind::Module)) {
            Ok(mock) => return Ok(DefEntry::Class(mock)),
            Err(err) if err.is_missing_mock() => {
                trace!(module = %module, "No registered mock, synthesizing");
            }
            Err(err) => return Err(err),
        }
    }

    let decision = ctx.decision_for(module).cloned();
    let skip = match &decision {
        Some(Decision::Suppress) => {
            return Err(MockError::InvalidOverride {
                class: module.name().to_owned(),
                reason: "a module cannot be suppressed".to_owned(),
            });
        }
        Some(decision) => decision.keeps_dependencies(),
        None => ctx.is_skip_mock(),
    };
    let mut scope = ctx.skip_mock_scope(skip);

    let mocked = mock_module_class(&mut scope, host, module, decision.as_ref())?;
    let Some(providers) = providers else {
        return Ok(DefEntry::Class(mocked));
    };
    if providers.is_empty() {
        return Ok(DefEntry::Class(mocked));
    }

    let def = NgModuleDef {
        providers: providers.clone(),
        ..NgModuleDef::default()
    };
    let (changed, rewritten) = mock_module_def(&mut scope, host, &def, None)?;
    let providers = if changed { rewritten.providers } else { def.providers };
    Ok(DefEntry::WithProviders(ModuleWithProviders {
        ng_module: mocked,
        providers,
    }))
}

fn mock_module_class(
    ctx: &mut ResolutionContext,
    host: Host<'_>,
    module: &ClassRef,
    decision: Option<&Decision>,
) -> Result<ClassRef> {
    if module.is_mock() {
        return Ok(module.clone());
    }

    if let Some(pending) = ctx.pending.get_mut(module) {
        trace!(module = %module, "Module cycle, handing out pending mock");
        pending.handed_out = true;
        return Ok(pending.mock.clone());
    }

    if ctx.flags().cache_module {
        if let Some(cached) = ctx.cached(module) {
            trace!(module = %module, "Module cache hit");
            return Ok(cached.clone());
        }
    }

    match decision {
        Some(Decision::Replace(Replacement::Class(replacement))) if replacement != module => {
            if host.oracle.is_kind(replacement, Kind::Module) {
                debug!(module = %module, replacement = %replacement, "Module replaced");
                return Ok(replacement.clone());
            }
            return Err(MockError::InvalidOverride {
                class: module.name().to_owned(),
                reason: format!("replacement {replacement} is not a module"),
            });
        }
        Some(Decision::Replace(Replacement::Provider(_))) => {
            return Err(MockError::InvalidOverride {
                class: module.name().to_owned(),
                reason: "a module cannot be replaced by a provider".to_owned(),
            });
        }
        _ => {}
    }

    let def = host
        .oracle
        .module_metadata(module)
        .ok_or_else(|| MockError::UnresolvableMetadata {
            class: module.name().to_owned(),
            expected: Kind::Module,
        })?;

    let mock = ClassRef::mock(module, Kind::Module);
    // The outermost module owns the journal, so a failure anywhere in the
    // graph discards every mock cached against a pending module.
    let owns_journal = ctx.begin_journal();
    ctx.pending.insert(
        module.clone(),
        PendingModule {
            mock: mock.clone(),
            handed_out: false,
        },
    );

    debug!(module = %module, skip_mock = ctx.is_skip_mock(), "Rewriting module");
    let walked = mock_module_def(ctx, host, &def, Some(module));
    let handed_out = ctx
        .pending
        .remove(module)
        .is_some_and(|pending| pending.handed_out);
    if owns_journal {
        if walked.is_ok() {
            ctx.commit_journal();
        } else {
            ctx.rollback_journal();
        }
    }
    let (changed, rewritten) = walked?;

    if !changed && !handed_out {
        debug!(module = %module, "Module unchanged, reusing original");
        return Ok(module.clone());
    }

    mock.define(Annotation::NgModule(rewritten));
    if ctx.flags().cache_module {
        Ok(ctx.set_cached(module.clone(), mock))
    } else {
        Ok(mock)
    }
}

/// Per-walk resolution state.
struct DefRewriter<'a> {
    host: Host<'a>,
    resolved: FxHashMap<Token, Option<DefEntry>>,
    changed: bool,
}

impl<'a> DefRewriter<'a> {
    fn new(host: Host<'a>) -> Self {
        Self {
            host,
            resolved: fx_hash_map(),
            changed: false,
        }
    }

    fn resolve_list(
        &mut self,
        ctx: &mut ResolutionContext,
        entries: &[DefEntry],
    ) -> Result<Vec<DefEntry>> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in DefEntry::flatten(entries) {
            if let Some(resolved) = self.resolve(ctx, &entry)? {
                out.push(resolved);
            }
        }
        Ok(out)
    }

    fn resolve_providers(
        &mut self,
        ctx: &mut ResolutionContext,
        entries: &[DefEntry],
    ) -> Result<Vec<DefEntry>> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in DefEntry::flatten(entries) {
            if let Some(resolved) = self.resolve_provider(ctx, &entry)? {
                out.push(resolved);
            }
        }
        Ok(out)
    }

    fn record(
        &mut self,
        token: Token,
        entry: &DefEntry,
        resolved: Option<DefEntry>,
    ) -> Option<DefEntry> {
        if resolved.as_ref() != Some(entry) {
            self.changed = true;
        }
        self.resolved.insert(token, resolved.clone());
        resolved
    }

    fn resolve(
        &mut self,
        ctx: &mut ResolutionContext,
        entry: &DefEntry,
    ) -> Result<Option<DefEntry>> {
        let class = match entry {
            DefEntry::Provider(_) => return self.resolve_provider(ctx, entry),
            DefEntry::Nested(_) => {
                let list = self.resolve_list(ctx, std::slice::from_ref(entry))?;
                return Ok(Some(DefEntry::Nested(list)));
            }
            DefEntry::WithProviders(mwp) => {
                let token = Token::Class(mwp.ng_module.clone());
                ctx.touch(token.clone());
                let mocked = mock_module(ctx, self.host, entry)?;
                if let Some(module) = mocked.module_class() {
                    self.resolved
                        .insert(token, Some(DefEntry::Class(module.clone())));
                }
                if &mocked != entry {
                    self.changed = true;
                }
                return Ok(Some(mocked));
            }
            DefEntry::Class(class) => class,
        };

        let token = Token::Class(class.clone());
        if let Some(hit) = self.resolved.get(&token) {
            return Ok(hit.clone());
        }

        let kind = self.host.oracle.classify(class);
        if kind == Kind::Plain {
            return self.resolve_provider(ctx, entry);
        }
        ctx.touch(token.clone());

        let resolved = if kind == Kind::Module {
            Some(mock_module(ctx, self.host, entry)?)
        } else {
            match ctx.decision(&token).cloned() {
                Some(Decision::Keep) => Some(entry.clone()),
                Some(Decision::Mock) => Some(self.mock_declarable(ctx, class, kind)?),
                Some(Decision::Replace(Replacement::Class(replacement))) => {
                    Some(DefEntry::Class(replacement))
                }
                Some(Decision::Replace(Replacement::Provider(_))) => {
                    return Err(MockError::InvalidOverride {
                        class: class.name().to_owned(),
                        reason: format!("a {kind} cannot be replaced by a provider"),
                    });
                }
                Some(Decision::Suppress) => {
                    debug!(class = %class, "Declaration suppressed");
                    None
                }
                None if ctx.is_skip_mock() => Some(entry.clone()),
                None => Some(self.mock_declarable(ctx, class, kind)?),
            }
        };

        Ok(self.record(token, entry, resolved))
    }

    fn mock_declarable(
        &self,
        ctx: &mut ResolutionContext,
        class: &ClassRef,
        kind: Kind,
    ) -> Result<DefEntry> {
        let oracle = self.host.oracle;
        let mock = match kind {
            Kind::Component => mock_component(ctx, oracle, class)?,
            Kind::Directive => mock_directive(ctx, oracle, class)?,
            Kind::Pipe => mock_pipe(ctx, oracle, class, None)?,
            Kind::Module | Kind::Plain => {
                return Err(MockError::UnresolvableMetadata {
                    class: class.name().to_owned(),
                    expected: kind,
                });
            }
        };
        Ok(DefEntry::Class(mock))
    }

    fn resolve_provider(
        &mut self,
        ctx: &mut ResolutionContext,
        entry: &DefEntry,
    ) -> Result<Option<DefEntry>> {
        let Some(token) = entry.token() else {
            return Ok(Some(entry.clone()));
        };
        let multi = matches!(entry, DefEntry::Provider(provider) if provider.multi);

        if let Some(hit) = self.resolved.get(&token) {
            return Ok(hit.clone().map(|resolved| with_multi(resolved, multi)));
        }
        ctx.touch(token.clone());

        let resolved = match ctx.decision(&token).cloned() {
            Some(Decision::Keep) => Some(entry.clone()),
            Some(Decision::Suppress) => {
                Some(DefEntry::Provider(ProviderDef::value(token.clone(), Value::Undefined)))
            }
            Some(Decision::Replace(Replacement::Provider(provider))) => {
                Some(DefEntry::Provider(provider))
            }
            Some(Decision::Replace(Replacement::Class(class))) => {
                Some(DefEntry::Provider(ProviderDef::class(token.clone(), class)))
            }
            Some(Decision::Mock) => mock_provider(ctx, self.host.oracle, entry),
            None if ctx.is_skip_mock() => Some(entry.clone()),
            None => mock_provider(ctx, self.host.oracle, entry),
        };

        Ok(self
            .record(token, entry, resolved)
            .map(|resolved| with_multi(resolved, multi)))
    }
}

fn with_multi(entry: DefEntry, multi: bool) -> DefEntry {
    match entry {
        DefEntry::Provider(provider) if multi => DefEntry::Provider(provider.multi()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{MetadataOracle, StaticOracle};
    use nm_core::{DirectiveMeta, InjectionToken, PipeMeta, ProviderRecipe};
    use serde_json::json;

    fn rewrite(
        ctx: &mut ResolutionContext,
        oracle: &StaticOracle,
        def: &NgModuleDef,
    ) -> Result<(bool, NgModuleDef)> {
        mock_module_def(ctx, Host::detached(oracle), def, None)
    }

    #[test]
    fn test_injection_tokens_dropped() {
        let oracle = StaticOracle::new();
        let token = InjectionToken::new("APP_INITIALIZER");
        let def = NgModuleDef::default().with_providers([
            ProviderDef::value(token.into(), Value::from(json!(1))).multi(),
        ]);
        let mut ctx = ResolutionContext::new();
        let (changed, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        assert!(changed);
        assert!(mocked.providers.is_empty());
    }

    #[test]
    fn test_multi_preserved_after_substitution() {
        let oracle = StaticOracle::new();
        let def = NgModuleDef::default().with_providers([
            ProviderDef::value(Token::Name("validators".to_owned()), Value::from(json!(1))).multi(),
        ]);
        let mut ctx = ResolutionContext::new();
        let (_, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        match mocked.providers.as_slice() {
            [DefEntry::Provider(provider)] => {
                assert!(provider.multi);
                assert_eq!(provider.recipe, ProviderRecipe::UseValue(Value::Undefined));
            }
            other => panic!("unexpected providers: {other:?}"),
        }
    }

    #[test]
    fn test_suppressed_provider_is_undefined() {
        let oracle = StaticOracle::new();
        let api = ClassRef::new("ApiService");
        let mut ctx = ResolutionContext::new();
        ctx.suppress(&api);
        let def = NgModuleDef::default().with_providers([&api]);
        let (changed, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        assert!(changed);
        assert_eq!(
            mocked.providers,
            vec![DefEntry::from(ProviderDef::value(Token::from(&api), Value::Undefined))]
        );
    }

    #[test]
    fn test_suppressed_declaration_is_omitted() {
        let mut oracle = StaticOracle::new();
        let pipe = oracle.pipe("DatePipe", PipeMeta::new("date"));
        let mut ctx = ResolutionContext::new();
        ctx.suppress(&pipe);
        let def = NgModuleDef::default().with_declarations([&pipe]);
        let (changed, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        assert!(changed);
        assert!(mocked.declarations.is_empty());
        assert!(mocked.exports.is_empty());
    }

    #[test]
    fn test_replaced_provider_class() {
        let oracle = StaticOracle::new();
        let logger = ClassRef::new("Logger");
        let fake = ClassRef::new("FakeLogger");
        let mut ctx = ResolutionContext::new();
        ctx.replace(&logger, Replacement::Class(fake.clone()));
        let def = NgModuleDef::default().with_providers([&logger]);
        let (_, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        assert_eq!(
            mocked.providers,
            vec![DefEntry::from(ProviderDef::class(Token::from(&logger), fake))]
        );
    }

    #[test]
    fn test_suppressed_module_is_invalid() {
        let mut oracle = StaticOracle::new();
        let shared = oracle.module("SharedModule", NgModuleDef::default());
        let mut ctx = ResolutionContext::new();
        ctx.suppress(&shared);
        let err = mock_module(&mut ctx, Host::detached(&oracle), &DefEntry::from(&shared))
            .unwrap_err();
        assert!(matches!(err, MockError::InvalidOverride { .. }));
        assert!(!ctx.is_skip_mock());
    }

    #[test]
    fn test_module_replaced_by_non_module_is_invalid() {
        let mut oracle = StaticOracle::new();
        let shared = oracle.module("SharedModule", NgModuleDef::default());
        let component = oracle.component("FakeComponent", DirectiveMeta::new("fake"));
        let mut ctx = ResolutionContext::new();
        ctx.replace(&shared, Replacement::Class(component));
        let err = mock_module(&mut ctx, Host::detached(&oracle), &DefEntry::from(&shared))
            .unwrap_err();
        assert!(matches!(err, MockError::InvalidOverride { .. }));
    }

    #[test]
    fn test_module_replaced_by_module() {
        let mut oracle = StaticOracle::new();
        let shared = oracle.module("SharedModule", NgModuleDef::default());
        let fake = oracle.module("FakeSharedModule", NgModuleDef::default());
        let mut ctx = ResolutionContext::new();
        ctx.replace(&shared, Replacement::Class(fake.clone()));
        let resolved = mock_module(&mut ctx, Host::detached(&oracle), &DefEntry::from(&shared))
            .unwrap();
        assert_eq!(resolved, DefEntry::Class(fake));
    }

    #[test]
    fn test_never_mock_module_untouched() {
        let mut oracle = StaticOracle::new();
        let common = oracle.module("CommonModule", NgModuleDef::default());
        let def = NgModuleDef::default().with_imports([&common]);
        let mut ctx = ResolutionContext::new();
        let (changed, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        assert_eq!(mocked.imports, vec![DefEntry::from(&common)]);
        // The import is still re-exported.
        assert!(changed);
        assert_eq!(mocked.exports, vec![DefEntry::from(&common)]);
    }

    #[test]
    fn test_never_mock_module_by_identity() {
        let mut oracle = StaticOracle::new();
        let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
        let vendor = oracle.module(
            "LayoutModule",
            NgModuleDef::default().with_declarations([&header]),
        );
        let local = oracle.module(
            "LayoutModule",
            NgModuleDef::default().with_declarations([&header]),
        );
        let def = NgModuleDef::default().with_imports([&vendor, &local]);

        let mut ctx = ResolutionContext::new();
        ctx.never_mock(&vendor);
        let (_, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        assert_eq!(mocked.imports[0], DefEntry::from(&vendor));
        let local_mock = mocked.imports[1].as_class().unwrap();
        assert!(local_mock.is_mocked_def_of(&local, Some(Kind::Module)));
    }

    #[test]
    fn test_module_with_providers() {
        let mut oracle = StaticOracle::new();
        let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
        let router = oracle.module(
            "RouterModule",
            NgModuleDef::default().with_declarations([&header]),
        );
        let config = ClassRef::new("RouterConfig");
        let def = NgModuleDef::default().with_imports([
            DefEntry::from(ModuleWithProviders::new(router.clone(), [&config])),
        ]);

        let mut ctx = ResolutionContext::new();
        let (_, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();

        let DefEntry::WithProviders(mwp) = &mocked.imports[0] else {
            panic!("expected a module with providers: {:?}", mocked.imports);
        };
        assert!(mwp.ng_module.is_mocked_def_of(&router, Some(Kind::Module)));
        assert!(matches!(
            mwp.providers.as_slice(),
            [DefEntry::Provider(provider)] if provider.token == Token::from(&config)
        ));
        // The bare module is exported, not the wrapper.
        assert_eq!(mocked.exports, vec![DefEntry::Class(mwp.ng_module.clone())]);
    }

    #[test]
    fn test_empty_module_with_providers_unwrapped() {
        let mut oracle = StaticOracle::new();
        let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
        let router = oracle.module(
            "RouterModule",
            NgModuleDef::default().with_declarations([&header]),
        );
        let mwp = DefEntry::from(ModuleWithProviders::new(router.clone(), Vec::<DefEntry>::new()));

        let mut ctx = ResolutionContext::new();
        let resolved = mock_module(&mut ctx, Host::detached(&oracle), &mwp).unwrap();
        assert!(resolved.as_class().is_some_and(|class| class.is_mocked_def_of(&router, None)));
    }

    #[test]
    fn test_unchanged_module_reused() {
        let mut oracle = StaticOracle::new();
        let empty = oracle.module("EmptyModule", NgModuleDef::default());
        let mut ctx = ResolutionContext::new();
        let resolved = mock_module(&mut ctx, Host::detached(&oracle), &DefEntry::from(&empty))
            .unwrap();
        assert_eq!(resolved, DefEntry::from(&empty));
        assert!(!ctx.has_cached(&empty));
    }

    #[test]
    fn test_touches_recorded() {
        let mut oracle = StaticOracle::new();
        let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
        let orphan = oracle.component("OrphanComponent", DirectiveMeta::new("app-orphan"));
        let layout = oracle.module(
            "LayoutModule",
            NgModuleDef::default().with_declarations([&header]),
        );
        let def = NgModuleDef::default().with_imports([&layout]);

        let mut ctx = ResolutionContext::new();
        rewrite(&mut ctx, &oracle, &def).unwrap();

        assert!(ctx.is_touched(&Token::from(&layout)));
        assert!(ctx.validate_touched([&header]).is_ok());
        assert!(ctx.validate_touched([&header, &orphan]).is_err());
    }

    #[test]
    fn test_failed_walk_discards_cycle_mocks() {
        let mut oracle = StaticOracle::new();
        let first = ClassRef::new("FirstModule");
        let second = ClassRef::new("SecondModule");
        let broken = oracle.module("BrokenModule", NgModuleDef::default());
        oracle.register_module(&first, NgModuleDef::default().with_imports([&second, &broken]));
        oracle.register_module(&second, NgModuleDef::default().with_imports([&first]));
        let host = Host::detached(&oracle);

        let mut ctx = ResolutionContext::new();
        ctx.suppress(&broken);
        let err = mock_module(&mut ctx, host, &DefEntry::from(&first)).unwrap_err();
        assert!(matches!(
            err,
            MockError::InvalidOverride { ref class, .. } if class == "BrokenModule"
        ));
        // The second module's mock imports a mock of the first that was never
        // defined, so it must not survive the failure.
        assert!(!ctx.has_cached(&second));
        assert!(!ctx.has_cached(&first));
        assert!(ctx.pending.is_empty());

        ctx.remove_decision(&Token::from(&broken));
        let mocked = mock_module(&mut ctx, host, &DefEntry::from(&second)).unwrap();
        let second_def = oracle.module_metadata(mocked.as_class().unwrap()).unwrap();
        let imported = second_def.imports[0].as_class().unwrap();
        assert!(imported.is_mocked_def_of(&first, Some(Kind::Module)));
        assert_eq!(oracle.classify(imported), Kind::Module);
    }

    #[test]
    fn test_replaced_provider_definition() {
        let oracle = StaticOracle::new();
        let api = ClassRef::new("ApiService");
        let fake = ProviderDef::value(Token::from(&api), Value::from(json!({ "url": "/fake" })));
        let mut ctx = ResolutionContext::new();
        ctx.replace(&api, Replacement::Provider(fake.clone()));
        let def = NgModuleDef::default().with_providers([&api]);
        let (changed, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        assert!(changed);
        assert_eq!(mocked.providers, vec![DefEntry::from(fake)]);
    }

    #[test]
    fn test_replaced_declaration_class() {
        let mut oracle = StaticOracle::new();
        let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
        let fake = oracle.component("FakeHeaderComponent", DirectiveMeta::new("app-header"));
        let mut ctx = ResolutionContext::new();
        ctx.replace(&header, Replacement::Class(fake.clone()));
        let def = NgModuleDef::default().with_declarations([&header]);
        let (_, mocked) = rewrite(&mut ctx, &oracle, &def).unwrap();
        assert_eq!(mocked.declarations, vec![DefEntry::Class(fake.clone())]);
        assert_eq!(mocked.exports, vec![DefEntry::Class(fake)]);
        assert!(!ctx.has_cached(&header));
    }

    #[test]
    fn test_declaration_replaced_by_provider_is_invalid() {
        let mut oracle = StaticOracle::new();
        let header = oracle.component("HeaderComponent", DirectiveMeta::new("app-header"));
        let mut ctx = ResolutionContext::new();
        ctx.replace(
            &header,
            Replacement::Provider(ProviderDef::value(Token::from(&header), Value::Undefined)),
        );
        let def = NgModuleDef::default().with_declarations([&header]);
        let err = rewrite(&mut ctx, &oracle, &def).unwrap_err();
        assert!(matches!(
            err,
            MockError::InvalidOverride { ref class, .. } if class == "HeaderComponent"
        ));
    }

    #[test]
    fn test_module_replaced_by_provider_is_invalid() {
        let mut oracle = StaticOracle::new();
        let shared = oracle.module("SharedModule", NgModuleDef::default());
        let mut ctx = ResolutionContext::new();
        ctx.replace(
            &shared,
            Replacement::Provider(ProviderDef::value(Token::from(&shared), Value::Undefined)),
        );
        let err = mock_module(&mut ctx, Host::detached(&oracle), &DefEntry::from(&shared))
            .unwrap_err();
        assert!(matches!(
            err,
            MockError::InvalidOverride { ref class, .. } if class == "SharedModule"
        ));
        assert!(!ctx.is_skip_mock());
    }

    #[test]
    fn test_mocked_module_inside_kept_module() {
        let mut oracle = StaticOracle::new();
        let title = oracle.component("TitleComponent", DirectiveMeta::new("app-title"));
        let badge = oracle.component("BadgeComponent", DirectiveMeta::new("app-badge"));
        let inner = oracle.module(
            "InnerModule",
            NgModuleDef::default()
                .with_declarations([&badge])
                .with_exports([&badge]),
        );
        let outer = oracle.module(
            "OuterModule",
            NgModuleDef::default()
                .with_imports([&inner])
                .with_declarations([&title]),
        );
        let host = Host::detached(&oracle);

        let mut ctx = ResolutionContext::new();
        ctx.keep(&outer);
        ctx.mock(&inner);
        let mocked = mock_module(&mut ctx, host, &DefEntry::from(&outer)).unwrap();

        let outer_def = oracle.module_metadata(mocked.as_class().unwrap()).unwrap();
        assert!(mocked.as_class().unwrap().is_mocked_def_of(&outer, Some(Kind::Module)));
        assert_eq!(outer_def.declarations, vec![DefEntry::from(&title)]);

        let inner_mock = outer_def.imports[0].as_class().unwrap();
        assert!(inner_mock.is_mocked_def_of(&inner, Some(Kind::Module)));
        let inner_def = oracle.module_metadata(inner_mock).unwrap();
        let badge_mock = inner_def.declarations[0].as_class().unwrap();
        assert!(badge_mock.is_mocked_def_of(&badge, Some(Kind::Component)));
        assert!(!ctx.is_skip_mock());
    }
}
