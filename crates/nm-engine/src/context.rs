//! Global resolution state.
//!
//! [`ResolutionContext`] owns every table the engine consults during a walk:
//! the original-to-mock cache, the provider cache, the configuration layer's
//! decision table, the touched set, feature flags, and per-class config
//! markers. It is passed `&mut` to every entry point and scoped to one
//! test-setup lifecycle; [`reset`](ResolutionContext::reset) starts a new
//! epoch.
//!
//! # Skip-mock scoping
//!
//! Keeping a module as original keeps all of its descendants as originals.
//! The flag is held by a [`SkipMockGuard`] so it is released on every exit
//! path, including `?` returns:
//!
//! ```
//! use nm_engine::ResolutionContext;
//!
//! let mut ctx = ResolutionContext::new();
//! {
//!     let guard = ctx.skip_mock_scope(true);
//!     assert!(guard.is_skip_mock());
//! }
//! assert!(!ctx.is_skip_mock());
//! ```

use std::ops::{Deref, DerefMut};

use nm_core::{
    ClassConfig, ClassRef, Decision, DefEntry, Flags, FxHashMap, FxHashSet, MockConfig, MockError,
    Replacement, Result, Token, fx_hash_map, fx_hash_set,
};
use tracing::{debug, info};

/// A module whose rewrite is in progress.
#[derive(Debug, Clone)]
pub(crate) struct PendingModule {
    /// Mock allocated before the members were walked.
    pub(crate) mock: ClassRef,
    /// Whether a re-entrant request received `mock`.
    pub(crate) handed_out: bool,
}

/// Tables consulted and filled during resolution.
#[derive(Debug)]
pub struct ResolutionContext {
    epoch: u64,
    flags: Flags,
    skip_mock: bool,
    cache: FxHashMap<ClassRef, ClassRef>,
    provider_cache: FxHashMap<Token, DefEntry>,
    decisions: FxHashMap<Token, Decision>,
    touches: FxHashSet<Token>,
    config: FxHashMap<ClassRef, ClassConfig>,
    never_mock_modules: FxHashSet<String>,
    never_mock_providers: FxHashSet<String>,
    never_mock_classes: FxHashSet<ClassRef>,
    journal: Option<Vec<ClassRef>>,
    pub(crate) pending: FxHashMap<ClassRef, PendingModule>,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionContext {
    /// Creates a context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&MockConfig::default())
    }

    /// Creates a context from a configuration.
    #[must_use]
    pub fn with_config(config: &MockConfig) -> Self {
        Self {
            epoch: 0,
            flags: config.flags,
            skip_mock: false,
            cache: fx_hash_map(),
            provider_cache: fx_hash_map(),
            decisions: fx_hash_map(),
            touches: fx_hash_set(),
            config: fx_hash_map(),
            never_mock_modules: config.never_mock_modules.iter().cloned().collect(),
            never_mock_providers: config.never_mock_providers.iter().cloned().collect(),
            never_mock_classes: fx_hash_set(),
            journal: None,
            pending: fx_hash_map(),
        }
    }

    /// Clears every table and starts a new cache epoch.
    ///
    /// Flags and the never-mock entries are configuration and survive.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.provider_cache.clear();
        self.decisions.clear();
        self.touches.clear();
        self.config.clear();
        self.pending.clear();
        self.journal = None;
        self.skip_mock = false;
        self.epoch += 1;
        info!(epoch = self.epoch, "Resolution context reset");
    }

    /// Returns the current epoch.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    // =========================================================================
    // Flags
    // =========================================================================

    /// Returns the feature flags.
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> &Flags {
        &self.flags
    }

    /// Returns the feature flags for modification.
    #[inline]
    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    /// Returns `true` while mocking is skipped.
    #[inline]
    #[must_use]
    pub const fn is_skip_mock(&self) -> bool {
        self.skip_mock
    }

    /// Sets `skip_mock` for the lifetime of the returned guard.
    ///
    /// The previous value is restored when the guard drops.
    pub fn skip_mock_scope(&mut self, skip: bool) -> SkipMockGuard<'_> {
        let previous = self.skip_mock;
        if previous != skip {
            debug!(skip, "Skip-mock acquired");
        }
        self.skip_mock = skip;
        SkipMockGuard {
            ctx: self,
            previous,
        }
    }

    /// Never mocks `class`, wherever it appears as a module or a provider.
    ///
    /// Unlike the configured name lists, this matches `class` by identity
    /// only: an unrelated class that happens to share its name is still
    /// mocked.
    pub fn never_mock(&mut self, class: &ClassRef) {
        self.never_mock_classes.insert(class.clone());
    }

    /// Returns `true` if `class` is never rewritten as a module.
    ///
    /// Classes registered through [`never_mock`](Self::never_mock) match by
    /// identity. Entries of [`MockConfig::never_mock_modules`] match by
    /// name, so every module class with a listed name is left alone.
    #[must_use]
    pub fn is_never_mock_module(&self, class: &ClassRef) -> bool {
        self.never_mock_classes.contains(class) || self.never_mock_modules.contains(class.name())
    }

    /// Returns `true` if providers of `class` are never mocked.
    ///
    /// Matching follows [`is_never_mock_module`](Self::is_never_mock_module).
    #[must_use]
    pub fn is_never_mock_provider(&self, class: &ClassRef) -> bool {
        self.never_mock_classes.contains(class)
            || self.never_mock_providers.contains(class.name())
    }

    // =========================================================================
    // Mock cache
    // =========================================================================

    /// Returns the cached mock of `original`.
    #[must_use]
    pub fn cached(&self, original: &ClassRef) -> Option<&ClassRef> {
        self.cache.get(original)
    }

    /// Returns `true` if `original` has a cached mock.
    #[must_use]
    pub fn has_cached(&self, original: &ClassRef) -> bool {
        self.cache.contains_key(original)
    }

    /// Caches `mock` for `original`.
    ///
    /// The first mock wins: a class resolves to at most one mock per epoch.
    pub fn set_cached(&mut self, original: ClassRef, mock: ClassRef) -> ClassRef {
        if let Some(existing) = self.cache.get(&original) {
            return existing.clone();
        }
        if let Some(journal) = &mut self.journal {
            journal.push(original.clone());
        }
        self.cache.insert(original, mock.clone());
        mock
    }

    /// Starts recording new cache entries.
    ///
    /// Returns `false` when a journal is already open; only the caller that
    /// opened it may commit or roll it back.
    pub(crate) fn begin_journal(&mut self) -> bool {
        if self.journal.is_some() {
            return false;
        }
        self.journal = Some(Vec::new());
        true
    }

    /// Keeps every entry recorded since [`begin_journal`](Self::begin_journal).
    pub(crate) fn commit_journal(&mut self) {
        self.journal = None;
    }

    /// Forgets every entry recorded since [`begin_journal`](Self::begin_journal).
    pub(crate) fn rollback_journal(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        if !journal.is_empty() {
            debug!(entries = journal.len(), "Cache entries rolled back");
        }
        for original in journal {
            self.cache.remove(&original);
        }
    }

    /// Forgets the cached mock of `original`.
    pub fn delete_cached(&mut self, original: &ClassRef) -> Option<ClassRef> {
        self.cache.remove(original)
    }

    /// Iterates over all cached original/mock pairs.
    pub fn cached_mocks(&self) -> impl Iterator<Item = (&ClassRef, &ClassRef)> {
        self.cache.iter()
    }

    /// Returns the cached mocked provider for `token`.
    #[must_use]
    pub fn cached_provider(&self, token: &Token) -> Option<&DefEntry> {
        self.provider_cache.get(token)
    }

    /// Caches a mocked provider.
    pub fn set_cached_provider(&mut self, token: Token, entry: DefEntry) {
        self.provider_cache.insert(token, entry);
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    /// Records a decision for a class or token.
    pub fn decide(&mut self, token: impl Into<Token>, decision: Decision) {
        self.decisions.insert(token.into(), decision);
    }

    /// Keeps `class` as original.
    pub fn keep(&mut self, class: &ClassRef) {
        self.decide(class, Decision::Keep);
    }

    /// Mocks `class` even where mocking is skipped.
    pub fn mock(&mut self, class: &ClassRef) {
        self.decide(class, Decision::Mock);
    }

    /// Replaces `token` with a custom class or provider.
    pub fn replace(&mut self, token: impl Into<Token>, replacement: Replacement) {
        self.decide(token, Decision::Replace(replacement));
    }

    /// Provides nothing for `token`.
    pub fn suppress(&mut self, token: impl Into<Token>) {
        self.decide(token, Decision::Suppress);
    }

    /// Returns the decision for `token`.
    #[must_use]
    pub fn decision(&self, token: &Token) -> Option<&Decision> {
        self.decisions.get(token)
    }

    /// Returns the decision for `class`.
    #[must_use]
    pub fn decision_for(&self, class: &ClassRef) -> Option<&Decision> {
        self.decisions.get(&Token::Class(class.clone()))
    }

    /// Removes a decision.
    pub fn remove_decision(&mut self, token: &Token) -> Option<Decision> {
        self.decisions.remove(token)
    }

    // =========================================================================
    // Touched set
    // =========================================================================

    /// Records that a walk met `token`.
    pub fn touch(&mut self, token: Token) {
        self.touches.insert(token);
    }

    /// Returns `true` if a walk met `token`.
    #[must_use]
    pub fn is_touched(&self, token: &Token) -> bool {
        self.touches.contains(token)
    }

    /// Number of touched tokens.
    #[must_use]
    pub fn touched_count(&self) -> usize {
        self.touches.len()
    }

    /// Fails with every declared class no walk has reached.
    pub fn validate_touched<'a>(
        &self,
        declared: impl IntoIterator<Item = &'a ClassRef>,
    ) -> Result<()> {
        let classes: Vec<String> = declared
            .into_iter()
            .filter(|class| !self.touches.contains(&Token::Class((*class).clone())))
            .map(|class| class.name().to_owned())
            .collect();
        if classes.is_empty() {
            Ok(())
        } else {
            Err(MockError::UnreachableDeclarations { classes })
        }
    }

    // =========================================================================
    // Per-class config
    // =========================================================================

    /// Returns the config markers of `class`.
    #[must_use]
    pub fn class_config(&self, class: &ClassRef) -> ClassConfig {
        self.config.get(class).copied().unwrap_or_default()
    }

    /// Replaces the config markers of `class`.
    pub fn set_class_config(&mut self, class: &ClassRef, config: ClassConfig) {
        self.config.insert(class.clone(), config);
    }

    /// Marks `class` as exported.
    pub fn mark_export(&mut self, class: &ClassRef) {
        self.config.entry(class.clone()).or_default().export = true;
    }

    /// Returns `true` if `class` carries the export marker.
    #[must_use]
    pub fn is_exported(&self, class: &ClassRef) -> bool {
        self.class_config(class).export
    }
}

/// Holds the skip-mock flag; restores the previous value on drop.
#[derive(Debug)]
pub struct SkipMockGuard<'a> {
    ctx: &'a mut ResolutionContext,
    previous: bool,
}

impl Deref for SkipMockGuard<'_> {
    type Target = ResolutionContext;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for SkipMockGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for SkipMockGuard<'_> {
    fn drop(&mut self) {
        if self.ctx.skip_mock != self.previous {
            debug!(skip = self.previous, "Skip-mock released");
        }
        self.ctx.skip_mock = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mock_wins() {
        let mut ctx = ResolutionContext::new();
        let original = ClassRef::new("Header");
        let first = ClassRef::new("MockOfHeader");
        let second = ClassRef::new("MockOfHeader");
        assert_eq!(ctx.set_cached(original.clone(), first.clone()), first);
        assert_eq!(ctx.set_cached(original.clone(), second), first);
        assert!(ctx.has_cached(&original));
        assert_eq!(ctx.delete_cached(&original), Some(first));
        assert!(ctx.cached(&original).is_none());
    }

    #[test]
    fn test_reset_starts_new_epoch() {
        let mut ctx = ResolutionContext::new();
        let class = ClassRef::new("Logger");
        ctx.keep(&class);
        ctx.touch(Token::from(&class));
        ctx.mark_export(&class);
        ctx.flags_mut().correct_module_exports = true;

        ctx.reset();

        assert_eq!(ctx.epoch(), 1);
        assert!(ctx.decision_for(&class).is_none());
        assert!(!ctx.is_touched(&Token::from(&class)));
        assert!(!ctx.is_exported(&class));
        assert!(ctx.flags().correct_module_exports);
    }

    #[test]
    fn test_nested_skip_mock_scopes() {
        let mut ctx = ResolutionContext::new();
        {
            let mut outer = ctx.skip_mock_scope(true);
            {
                let inner = outer.skip_mock_scope(false);
                assert!(!inner.is_skip_mock());
            }
            assert!(outer.is_skip_mock());
        }
        assert!(!ctx.is_skip_mock());
    }

    #[test]
    fn test_skip_mock_released_on_error() {
        fn failing(ctx: &mut ResolutionContext) -> Result<()> {
            let guard = ctx.skip_mock_scope(true);
            assert!(guard.is_skip_mock());
            Err(MockError::MissingMock {
                class: "X".to_owned(),
            })
        }

        let mut ctx = ResolutionContext::new();
        assert!(failing(&mut ctx).is_err());
        assert!(!ctx.is_skip_mock());
    }

    #[test]
    fn test_validate_touched() {
        let mut ctx = ResolutionContext::new();
        let reached = ClassRef::new("Reached");
        let orphan = ClassRef::new("Orphan");
        ctx.touch(Token::from(&reached));

        assert!(ctx.validate_touched([&reached]).is_ok());
        match ctx.validate_touched([&reached, &orphan]) {
            Err(MockError::UnreachableDeclarations { classes }) => {
                assert_eq!(classes, vec!["Orphan".to_owned()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_never_mock_lists() {
        let ctx = ResolutionContext::new();
        assert!(ctx.is_never_mock_module(&ClassRef::new("CommonModule")));
        assert!(!ctx.is_never_mock_module(&ClassRef::new("SharedModule")));
        assert!(ctx.is_never_mock_provider(&ClassRef::new("RendererFactory2")));
    }

    #[test]
    fn test_never_mock_class_matches_identity() {
        let mut ctx = ResolutionContext::new();
        let platform = ClassRef::new("PlatformModule");
        let lookalike = ClassRef::new("PlatformModule");
        ctx.never_mock(&platform);

        assert!(ctx.is_never_mock_module(&platform));
        assert!(ctx.is_never_mock_provider(&platform));
        assert!(!ctx.is_never_mock_module(&lookalike));

        ctx.reset();
        assert!(ctx.is_never_mock_module(&platform));
    }

    #[test]
    fn test_journal_rollback_keeps_earlier_entries() {
        let mut ctx = ResolutionContext::new();
        let kept = ClassRef::new("Kept");
        let dropped = ClassRef::new("Dropped");
        ctx.set_cached(kept.clone(), ClassRef::new("MockOfKept"));

        assert!(ctx.begin_journal());
        assert!(!ctx.begin_journal());
        ctx.set_cached(dropped.clone(), ClassRef::new("MockOfDropped"));
        ctx.set_cached(kept.clone(), ClassRef::new("MockOfKept"));
        ctx.rollback_journal();

        assert!(ctx.has_cached(&kept));
        assert!(!ctx.has_cached(&dropped));

        assert!(ctx.begin_journal());
        ctx.set_cached(dropped.clone(), ClassRef::new("MockOfDropped"));
        ctx.commit_journal();
        ctx.rollback_journal();
        assert!(ctx.has_cached(&dropped));
    }
}
