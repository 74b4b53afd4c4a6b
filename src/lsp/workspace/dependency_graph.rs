//! Require graph between modules of one workspace
//!
//! - **Forward edges**: `module A → modules that A requires`
//! - **Reverse edges**: `module B → modules that require B` (for invalidation)
//! - **Transitive closure**: BFS in either direction
//!
//! Edges of a module are replaced wholesale after each check, since the
//! engine reports the complete require list of the parsed source.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::engine::ModuleName;

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Forward edges: module → modules it requires
    forward: FxHashMap<ModuleName, FxHashSet<ModuleName>>,

    /// Reverse edges: module → modules that require it
    reverse: FxHashMap<ModuleName, FxHashSet<ModuleName>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency edge: `dependent → dependency`
    pub fn add_dependency(&mut self, dependent: ModuleName, dependency: ModuleName) {
        self.reverse
            .entry(dependency.clone())
            .or_default()
            .insert(dependent.clone());
        self.forward.entry(dependent).or_default().insert(dependency);
    }

    /// Replaces every outgoing edge of `module`.
    pub fn set_dependencies(&mut self, module: &ModuleName, dependencies: impl IntoIterator<Item = ModuleName>) {
        self.clear_dependencies(module);
        for dependency in dependencies {
            self.add_dependency(module.clone(), dependency);
        }
        trace!(
            "{} requires {} module(s)",
            module,
            self.forward.get(module).map_or(0, FxHashSet::len)
        );
    }

    fn clear_dependencies(&mut self, module: &ModuleName) {
        if let Some(dependencies) = self.forward.remove(module) {
            for dependency in dependencies {
                if let Some(dependents) = self.reverse.get_mut(&dependency) {
                    dependents.remove(module);
                }
            }
        }
    }

    /// Every module reachable over require edges, excluding `module` itself.
    pub fn get_transitive_dependencies(&self, module: &ModuleName) -> FxHashSet<ModuleName> {
        Self::closure(&self.forward, module)
    }

    /// Every module that transitively requires `module`, excluding itself.
    pub fn get_dependents(&self, module: &ModuleName) -> FxHashSet<ModuleName> {
        Self::closure(&self.reverse, module)
    }

    fn closure(
        edges: &FxHashMap<ModuleName, FxHashSet<ModuleName>>,
        start: &ModuleName,
    ) -> FxHashSet<ModuleName> {
        let mut result = FxHashSet::default();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();

        // The start node is visited up front so cycles never report it.
        visited.insert(start.clone());
        queue.push_back(start.clone());

        while let Some(current) = queue.pop_front() {
            let Some(next) = edges.get(&current) else {
                continue;
            };
            for module in next {
                if visited.insert(module.clone()) {
                    result.insert(module.clone());
                    queue.push_back(module.clone());
                }
            }
        }
        result
    }
}
