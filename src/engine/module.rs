//! Checked module: inferred types and lexical scopes

use rustc_hash::FxHashMap;

use super::ast::{LocalId, NodeId};
use super::types::{TypeArena, TypeId};
use super::{Location, ModuleName, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// Key of a scope binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Local(LocalId),
    Global(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub ty: TypeId,
    /// Where the binding was declared.
    pub location: Location,
    pub documentation_symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub location: Location,
    pub bindings: FxHashMap<Symbol, Binding>,
    pub type_alias_locations: FxHashMap<String, Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: ModuleName,
    pub types: TypeArena,
    /// Inferred type of each expression node.
    pub ast_types: FxHashMap<NodeId, TypeId>,
    scopes: Vec<Scope>,
}

impl Module {
    pub fn new(name: impl Into<ModuleName>, types: TypeArena) -> Self {
        Self {
            name: name.into(),
            types,
            ast_types: FxHashMap::default(),
            scopes: Vec::new(),
        }
    }

    pub fn add_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(scope);
        id
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    /// Innermost scope whose location contains `position`: the containing
    /// scope with the latest start wins, later scopes break ties.
    pub fn find_scope_at_position(&self, position: Position) -> Option<ScopeId> {
        let mut best: Option<(ScopeId, Position)> = None;
        for (index, scope) in self.scopes.iter().enumerate() {
            if !scope.location.contains_closed(position) {
                continue;
            }
            if best.is_none_or(|(_, begin)| scope.location.begin >= begin) {
                best = Some((ScopeId(index as u32), scope.location.begin));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Resolves a symbol through the scope chain starting at `scope`.
    pub fn lookup(&self, scope: ScopeId, symbol: &Symbol) -> Option<&Binding> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id)?;
            if let Some(binding) = scope.bindings.get(symbol) {
                return Some(binding);
            }
            current = scope.parent;
        }
        None
    }

    /// Resolves a type alias declaration through the scope chain.
    pub fn lookup_type_alias_location(&self, scope: ScopeId, name: &str) -> Option<Location> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id)?;
            if let Some(location) = scope.type_alias_locations.get(name) {
                return Some(*location);
            }
            current = scope.parent;
        }
        None
    }
}
