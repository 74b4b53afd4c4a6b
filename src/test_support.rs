//! Scripted engine and fixtures shared by unit tests

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine::ast::{Expr, Stat};
use crate::engine::types::{Primitive, Type};
use crate::engine::{
    AnalysisEngine, AstBuilder, AutocompleteResult, Binding, CheckResult, FileResolver, LintResult,
    Location, Module, ModuleName, Position, Scope, SourceModule, Symbol, TypeArena, TypeError, TypeErrorKind,
};

/// Canned analysis results for one module.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModule {
    pub source: Option<SourceModule>,
    pub module: Option<Module>,
    pub errors: Vec<TypeError>,
    pub lint: LintResult,
    pub autocomplete: AutocompleteResult,
}

impl ScriptedModule {
    /// A module whose source cannot be read.
    pub fn unreadable() -> Self {
        Self::default()
    }

    /// An empty, readable module.
    pub fn empty() -> Self {
        Self::requiring(&[])
    }

    pub fn requiring(requires: &[&str]) -> Self {
        let mut builder = AstBuilder::new();
        for require in requires {
            builder.require(*require);
        }
        Self {
            source: Some(builder.finish("scripted", Location::default(), Vec::new())),
            ..Default::default()
        }
    }

    pub fn from_parts(source: SourceModule, module: Module) -> Self {
        Self {
            source: Some(source),
            module: Some(module),
            ..Default::default()
        }
    }

    pub fn with_error(mut self, error: TypeError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_lint(mut self, lint: LintResult) -> Self {
        self.lint = lint;
        self
    }

    pub fn with_autocomplete(mut self, autocomplete: AutocompleteResult) -> Self {
        self.autocomplete = autocomplete;
        self
    }
}

/// Engine double returning canned results. A check reports the errors of
/// the module and of everything it transitively requires, like a real
/// checker surfacing errors from dependencies.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    scripts: FxHashMap<ModuleName, ScriptedModule>,
    dirty: FxHashSet<ModuleName>,
    checked: FxHashSet<ModuleName>,
    check_counts: FxHashMap<ModuleName, usize>,
}

impl ScriptedEngine {
    pub fn insert(&mut self, name: &str, script: ScriptedModule) {
        self.scripts.insert(ModuleName::from(name), script);
    }

    pub fn check_count(&self, name: &str) -> usize {
        self.check_counts.get(&ModuleName::from(name)).copied().unwrap_or(0)
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn check(&mut self, name: &ModuleName, _files: &dyn FileResolver) -> CheckResult {
        *self.check_counts.entry(name.clone()).or_default() += 1;

        let mut errors = Vec::new();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([name.clone()]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(script) = self.scripts.get(&current) else {
                continue;
            };
            errors.extend(script.errors.iter().cloned());
            if let Some(source) = &script.source {
                queue.extend(source.requires.iter().cloned());
            }
        }

        self.dirty.remove(name);
        self.checked.insert(name.clone());
        CheckResult { errors }
    }

    fn is_dirty(&self, name: &ModuleName) -> bool {
        self.dirty.contains(name) || !self.checked.contains(name)
    }

    fn mark_dirty(&mut self, name: &ModuleName) {
        self.dirty.insert(name.clone());
    }

    fn source_module(&self, name: &ModuleName) -> Option<&SourceModule> {
        self.scripts.get(name)?.source.as_ref()
    }

    fn module(&self, name: &ModuleName) -> Option<&Module> {
        self.scripts.get(name)?.module.as_ref()
    }

    fn lint(&mut self, name: &ModuleName, _files: &dyn FileResolver) -> LintResult {
        self.scripts
            .get(name)
            .map(|script| script.lint.clone())
            .unwrap_or_default()
    }

    fn autocomplete(&mut self, name: &ModuleName, _position: Position, _files: &dyn FileResolver) -> AutocompleteResult {
        self.scripts
            .get(name)
            .map(|script| script.autocomplete.clone())
            .unwrap_or_default()
    }
}

pub fn type_error(owner: &str, line: u32, message: &str) -> TypeError {
    TypeError {
        module_name: ModuleName::from(owner),
        location: Location::on_line(line, 0, 1),
        kind: TypeErrorKind::Type,
        code: 1000,
        message: message.to_string(),
    }
}

/// `local x = 5`: the literal is a number at (0,10)-(0,11), the local is
/// declared at (0,6)-(0,7), the statement spans (0,0)-(0,11).
pub fn local_x_equals_5(name: &str) -> ScriptedModule {
    let mut builder = AstBuilder::new();
    let x = builder.local("x", Location::on_line(0, 6, 7), None);
    let five = builder.expr(Location::on_line(0, 10, 11), Expr::Number(5.0));
    let stat = builder.stat(
        Location::on_line(0, 0, 11),
        Stat::Local { vars: vec![x], values: vec![five] },
    );
    let source = builder.finish(name, Location::on_line(0, 0, 11), vec![stat]);

    let mut types = TypeArena::new();
    let number = types.add(Type::Primitive(Primitive::Number));
    let mut module = Module::new(name, types);
    module.ast_types.insert(five, number);
    let mut scope = Scope {
        location: Location::new(Position::new(0, 0), Position::new(0, 11)),
        ..Default::default()
    };
    scope.bindings.insert(
        Symbol::Local(x),
        Binding {
            ty: number,
            location: Location::on_line(0, 6, 7),
            documentation_symbol: None,
        },
    );
    module.add_scope(scope);

    ScriptedModule::from_parts(source, module)
}
