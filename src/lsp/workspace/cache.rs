//! Dependency-aware analysis cache
//!
//! [`DirtySet`] records edits and completed checks against a logical clock.
//! A module is stale when it is dirty itself or when any module reachable over
//! its require edges was edited after the module's last check. The
//! [`AnalysisCache`] re-runs the engine only for stale modules and memoizes
//! the check result otherwise, so every query can call
//! [`AnalysisCache::ensure_fresh`] unconditionally.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::engine::{
    AnalysisEngine, AutocompleteResult, CheckResult, FileResolver, LintResult, ModuleName, Position,
};

use super::dependency_graph::DependencyGraph;

/// Reason why a module was marked dirty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyReason {
    /// Document opened in the editor (didOpen)
    DidOpen,

    /// User edited in editor (didChange)
    DidChange,

    /// Whole workspace invalidated, e.g. after a sourcemap reload
    Invalidated,
}

#[derive(Debug, Clone, Copy)]
struct ModuleState {
    edited_at: u64,
    checked_at: Option<u64>,
    dirty: bool,
    reason: Option<DirtyReason>,
}

/// Per-workspace `ModuleName → {clean, dirty}` with edit and check stamps.
#[derive(Debug, Default)]
pub struct DirtySet {
    clock: u64,
    modules: FxHashMap<ModuleName, ModuleState>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn mark_dirty(&mut self, name: &ModuleName, reason: DirtyReason) {
        let now = self.tick();
        let state = self.modules.entry(name.clone()).or_insert(ModuleState {
            edited_at: now,
            checked_at: None,
            dirty: true,
            reason: None,
        });
        state.edited_at = now;
        state.dirty = true;
        state.reason = Some(reason);
        trace!("Marked {} dirty ({:?})", name, reason);
    }

    pub fn mark_checked(&mut self, name: &ModuleName) {
        let now = self.tick();
        let state = self.modules.entry(name.clone()).or_insert(ModuleState {
            edited_at: 0,
            checked_at: None,
            dirty: false,
            reason: None,
        });
        state.checked_at = Some(now);
        state.dirty = false;
        state.reason = None;
    }

    /// `true` until the module has completed a check after its last edit.
    pub fn is_dirty(&self, name: &ModuleName) -> bool {
        self.modules
            .get(name)
            .is_none_or(|state| state.dirty || state.checked_at.is_none())
    }

    pub fn reason(&self, name: &ModuleName) -> Option<DirtyReason> {
        self.modules.get(name).and_then(|state| state.reason)
    }

    /// Dirty, or some transitive require was edited after the last check.
    pub fn is_stale(&self, name: &ModuleName, graph: &DependencyGraph) -> bool {
        let Some(checked_at) = self.modules.get(name).and_then(|state| state.checked_at) else {
            return true;
        };
        if self.is_dirty(name) {
            return true;
        }
        graph.get_transitive_dependencies(name).iter().any(|dependency| {
            self.modules
                .get(dependency)
                .is_some_and(|state| state.edited_at > checked_at)
        })
    }

    /// Marks every known module dirty.
    pub fn invalidate_all(&mut self) -> Vec<ModuleName> {
        let names: Vec<ModuleName> = self.modules.keys().cloned().collect();
        for name in &names {
            self.mark_dirty(name, DirtyReason::Invalidated);
        }
        names
    }
}

/// Owns the engine of one workspace and decides when it has to re-check.
#[derive(Debug)]
pub struct AnalysisCache<E> {
    engine: E,
    dirty: DirtySet,
    graph: DependencyGraph,
    results: FxHashMap<ModuleName, CheckResult>,
}

impl<E: AnalysisEngine> AnalysisCache<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            dirty: DirtySet::new(),
            graph: DependencyGraph::new(),
            results: FxHashMap::default(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn dirty_set(&self) -> &DirtySet {
        &self.dirty
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Marks `name` dirty and drops the memoized results of everything that
    /// requires it, directly or not.
    pub fn mark_dirty(&mut self, name: &ModuleName, reason: DirtyReason) {
        self.dirty.mark_dirty(name, reason);
        self.engine.mark_dirty(name);
        for dependent in self.graph.get_dependents(name) {
            if self.results.remove(&dependent).is_some() {
                trace!("Dropped result of {} (requires {})", dependent, name);
            }
        }
    }

    pub fn is_stale(&self, name: &ModuleName) -> bool {
        self.dirty.is_stale(name, &self.graph) || self.engine.is_dirty(name)
    }

    /// Re-checks `name` if it is stale. Returns whether the engine ran.
    pub fn ensure_fresh(&mut self, name: &ModuleName, files: &dyn FileResolver) -> bool {
        if self.results.contains_key(name) && !self.is_stale(name) {
            trace!("{} is fresh", name);
            return false;
        }

        debug!("Checking {} ({:?})", name, self.dirty.reason(name));
        let result = self.engine.check(name, files);
        self.record_requires(name);
        self.dirty.mark_checked(name);
        self.results.insert(name.clone(), result);
        true
    }

    /// Refreshes the require edges of every module reachable from `root`, so
    /// an edit anywhere below it makes `root` stale.
    fn record_requires(&mut self, root: &ModuleName) {
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(source) = self.engine.source_module(&current) else {
                continue;
            };
            let requires = source.requires.clone();
            queue.extend(requires.iter().cloned());
            self.graph.set_dependencies(&current, requires);
        }
    }

    /// Result of the last check of `name`; call [`Self::ensure_fresh`] first.
    pub fn check_result(&self, name: &ModuleName) -> Option<&CheckResult> {
        self.results.get(name)
    }

    pub fn lint(&mut self, name: &ModuleName, files: &dyn FileResolver) -> LintResult {
        self.engine.lint(name, files)
    }

    pub fn autocomplete(&mut self, name: &ModuleName, position: Position, files: &dyn FileResolver) -> AutocompleteResult {
        self.engine.autocomplete(name, position, files)
    }

    /// Forces a re-check of every module seen so far.
    pub fn invalidate_all(&mut self) {
        for name in self.dirty.invalidate_all() {
            self.engine.mark_dirty(&name);
        }
        debug!("Invalidated all modules");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ModuleName, SourceCode};
    use crate::test_support::{ScriptedEngine, ScriptedModule, type_error};

    struct NoFiles;

    impl FileResolver for NoFiles {
        fn read_source(&self, _name: &ModuleName) -> Option<SourceCode> {
            None
        }

        fn resolve_module(
            &self,
            _context: &ModuleName,
            _source: &crate::engine::SourceModule,
            _expr: crate::engine::NodeId,
        ) -> Option<ModuleName> {
            None
        }
    }

    fn name(value: &str) -> ModuleName {
        ModuleName::from(value)
    }

    /// `a` requires `b`, `b` has one type error.
    fn a_requires_b() -> AnalysisCache<ScriptedEngine> {
        let mut engine = ScriptedEngine::default();
        engine.insert("a", ScriptedModule::requiring(&["b"]));
        engine.insert("b", ScriptedModule::empty().with_error(type_error("b", 0, "oops")));
        AnalysisCache::new(engine)
    }

    #[test]
    fn test_ensure_fresh_is_idempotent() {
        let mut cache = a_requires_b();
        cache.mark_dirty(&name("a"), DirtyReason::DidOpen);

        assert!(cache.ensure_fresh(&name("a"), &NoFiles));
        assert!(!cache.ensure_fresh(&name("a"), &NoFiles));
        assert_eq!(cache.engine().check_count("a"), 1);
        assert_eq!(cache.check_result(&name("a")).map(|r| r.errors.len()), Some(1));
    }

    #[test]
    fn test_unseen_module_is_checked() {
        let mut cache = a_requires_b();
        assert!(cache.is_stale(&name("b")));
        assert!(cache.ensure_fresh(&name("b"), &NoFiles));
        assert!(!cache.is_stale(&name("b")));
    }

    #[test]
    fn test_editing_dependency_makes_dependent_stale() {
        let mut cache = a_requires_b();
        cache.ensure_fresh(&name("a"), &NoFiles);
        cache.ensure_fresh(&name("b"), &NoFiles);
        assert!(!cache.is_stale(&name("a")));

        cache.mark_dirty(&name("b"), DirtyReason::DidChange);
        assert!(cache.is_stale(&name("a")), "clean dependent of an edited module is stale");

        assert!(cache.ensure_fresh(&name("a"), &NoFiles));
        assert_eq!(cache.engine().check_count("a"), 2);
        assert!(!cache.is_stale(&name("a")));
    }

    #[test]
    fn test_only_queried_module_is_marked_clean() {
        let mut cache = a_requires_b();
        cache.mark_dirty(&name("a"), DirtyReason::DidOpen);
        cache.mark_dirty(&name("b"), DirtyReason::DidOpen);

        cache.ensure_fresh(&name("a"), &NoFiles);
        assert!(!cache.dirty_set().is_dirty(&name("a")));
        assert!(cache.dirty_set().is_dirty(&name("b")));
        assert_eq!(cache.dirty_set().reason(&name("a")), None);
        assert_eq!(cache.dirty_set().reason(&name("b")), Some(DirtyReason::DidOpen));
    }

    #[test]
    fn test_invalidate_all_forces_recheck() {
        let mut cache = a_requires_b();
        cache.ensure_fresh(&name("a"), &NoFiles);
        cache.invalidate_all();

        assert!(cache.is_stale(&name("a")));
        assert!(cache.ensure_fresh(&name("a"), &NoFiles));
        assert_eq!(cache.engine().check_count("a"), 2);
    }

    #[test]
    fn test_require_edges_are_recorded() {
        let mut cache = a_requires_b();
        cache.ensure_fresh(&name("a"), &NoFiles);
        assert!(cache.dependency_graph().get_dependents(&name("b")).contains(&name("a")));
    }

    /// `a` requires `b`, `b` requires `c`, `c` has one type error.
    fn chain() -> AnalysisCache<ScriptedEngine> {
        let mut engine = ScriptedEngine::default();
        engine.insert("a", ScriptedModule::requiring(&["b"]));
        engine.insert("b", ScriptedModule::requiring(&["c"]));
        engine.insert("c", ScriptedModule::empty().with_error(type_error("c", 0, "oops")));
        AnalysisCache::new(engine)
    }

    #[test]
    fn test_editing_indirect_dependency_makes_root_stale() {
        let mut cache = chain();
        assert!(cache.ensure_fresh(&name("a"), &NoFiles));
        assert!(!cache.is_stale(&name("a")));

        let graph = cache.dependency_graph();
        assert!(graph.get_transitive_dependencies(&name("a")).contains(&name("c")));
        assert!(graph.get_dependents(&name("c")).contains(&name("a")));

        // Only `a` was ever queried; `c` is edited without being checked.
        cache.mark_dirty(&name("c"), DirtyReason::DidChange);
        assert!(cache.is_stale(&name("a")));
        assert!(cache.check_result(&name("a")).is_none(), "memoized result of a dependent is dropped");

        assert!(cache.ensure_fresh(&name("a"), &NoFiles));
        assert_eq!(cache.engine().check_count("a"), 2);
    }
}
