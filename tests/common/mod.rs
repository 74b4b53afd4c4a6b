//! Line-oriented engine used by the integration tests
//!
//! Understands just enough Luau to drive a workspace end to end:
//!
//! ```text
//! local Name = require("path/to/file.luau")
//! local Name = require(game.ReplicatedStorage.Module)
//! -- error: <message>
//! ```
//!
//! Every other line is ignored. A check reports the `-- error:` lines of the
//! module and of everything it transitively requires.

#![allow(dead_code)]

use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use luau_language_server::engine::ast::{Expr, Stat};
use luau_language_server::engine::{
    AnalysisEngine, AstBuilder, AutocompleteResult, CheckResult, FileResolver, LintResult, Location, Module,
    ModuleName, NodeId, Position, SourceModule, TypeArena, TypeError, TypeErrorKind,
};
use luau_language_server::lsp::document::VersionedChanges;
use luau_language_server::lsp::file_resolver::normalize_path;

const ERROR_MARKER: &str = "-- error: ";

#[derive(Debug, Default)]
pub struct LineEngine {
    sources: FxHashMap<ModuleName, SourceModule>,
    modules: FxHashMap<ModuleName, Module>,
    errors: FxHashMap<ModuleName, Vec<TypeError>>,
    dirty: FxHashSet<ModuleName>,
    checks: FxHashMap<ModuleName, usize>,
}

impl LineEngine {
    pub fn check_count(&self, name: &str) -> usize {
        self.checks.get(&ModuleName::from(name)).copied().unwrap_or(0)
    }

    /// Parses and records one module, returning false when it cannot be read.
    fn parse(&mut self, name: &ModuleName, files: &dyn FileResolver) -> bool {
        let Some(code) = files.read_source(name) else {
            self.sources.remove(name);
            self.errors.remove(name);
            return false;
        };

        let mut builder = AstBuilder::new();
        let mut body = Vec::new();
        let mut arguments = Vec::new();
        let mut errors = Vec::new();
        let line_count = code.source.lines().count() as u32;

        for (line, text) in code.source.lines().enumerate() {
            let line = line as u32;
            if let Some(message) = text.trim_start().strip_prefix(ERROR_MARKER) {
                errors.push(TypeError {
                    module_name: name.clone(),
                    location: Location::on_line(line, 0, text.len() as u32),
                    kind: TypeErrorKind::Type,
                    code: 1000,
                    message: message.to_string(),
                });
            } else if let Some((stat, argument)) = parse_require(&mut builder, line, text) {
                body.push(stat);
                arguments.push(argument);
            }
        }

        let end = Position::new(line_count, 0);
        let mut source = builder.finish(name.clone(), Location::new(Position::new(0, 0), end), body);
        source.requires = arguments
            .into_iter()
            .filter_map(|argument| files.resolve_module(name, &source, argument))
            .collect();

        self.modules.insert(name.clone(), Module::new(name.clone(), TypeArena::new()));
        self.sources.insert(name.clone(), source);
        self.errors.insert(name.clone(), errors);
        true
    }
}

/// `local Name = require(<argument>)` on a single line.
fn parse_require(builder: &mut AstBuilder, line: u32, text: &str) -> Option<(NodeId, NodeId)> {
    let rest = text.strip_prefix("local ")?;
    let (local_name, rest) = rest.split_once(" = require(")?;
    let argument = rest.strip_suffix(')')?;

    let local_begin = "local ".len() as u32;
    let local = builder.local(
        local_name,
        Location::on_line(line, local_begin, local_begin + local_name.len() as u32),
        None,
    );
    let call_begin = local_begin + local_name.len() as u32 + " = ".len() as u32;
    let arg_begin = call_begin + "require(".len() as u32;
    let arg_end = arg_begin + argument.len() as u32;

    let callee = builder.expr(
        Location::on_line(line, call_begin, call_begin + "require".len() as u32),
        Expr::Global("require".to_string()),
    );
    let arg = match argument.strip_prefix('"').and_then(|quoted| quoted.strip_suffix('"')) {
        Some(path) => builder.expr(Location::on_line(line, arg_begin, arg_end), Expr::String(path.to_string())),
        None => {
            let mut parts = argument.split('.');
            let root = parts.next()?;
            let mut end = arg_begin + root.len() as u32;
            let mut expr = builder.expr(Location::on_line(line, arg_begin, end), Expr::Global(root.to_string()));
            for part in parts {
                let index_begin = end + 1;
                end = index_begin + part.len() as u32;
                expr = builder.expr(
                    Location::on_line(line, arg_begin, end),
                    Expr::IndexName {
                        expr,
                        index: part.to_string(),
                        index_location: Location::on_line(line, index_begin, end),
                        op: '.',
                    },
                );
            }
            expr
        }
    };
    let call = builder.expr(
        Location::on_line(line, call_begin, arg_end + 1),
        Expr::Call {
            func: callee,
            args: vec![arg],
            self_call: false,
            arg_location: Location::on_line(line, arg_begin, arg_end),
        },
    );
    let stat = builder.stat(
        Location::on_line(line, 0, arg_end + 1),
        Stat::Local { vars: vec![local], values: vec![call] },
    );
    Some((stat, arg))
}

impl AnalysisEngine for LineEngine {
    fn check(&mut self, name: &ModuleName, files: &dyn FileResolver) -> CheckResult {
        *self.checks.entry(name.clone()).or_default() += 1;

        let mut errors = Vec::new();
        let mut visited = FxHashSet::default();
        let mut pending = vec![name.clone()];
        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if (current == *name || self.is_dirty(&current)) && self.parse(&current, files) {
                self.dirty.remove(&current);
            }
            if let Some(source) = self.sources.get(&current) {
                pending.extend(source.requires.iter().cloned());
            }
            errors.extend(self.errors.get(&current).into_iter().flatten().cloned());
        }
        CheckResult { errors }
    }

    fn is_dirty(&self, name: &ModuleName) -> bool {
        self.dirty.contains(name) || !self.sources.contains_key(name)
    }

    fn mark_dirty(&mut self, name: &ModuleName) {
        self.dirty.insert(name.clone());
    }

    fn source_module(&self, name: &ModuleName) -> Option<&SourceModule> {
        self.sources.get(name)
    }

    fn module(&self, name: &ModuleName) -> Option<&Module> {
        self.modules.get(name)
    }

    fn lint(&mut self, _name: &ModuleName, _files: &dyn FileResolver) -> LintResult {
        LintResult::default()
    }

    fn autocomplete(&mut self, _name: &ModuleName, _position: Position, _files: &dyn FileResolver) -> AutocompleteResult {
        AutocompleteResult::default()
    }
}

pub fn file_uri(root: &Path, relative: &str) -> Url {
    Url::from_file_path(root.join(relative)).unwrap()
}

pub fn real_name(root: &Path, relative: &str) -> String {
    normalize_path(&root.join(relative))
}

pub fn full_change(version: i32, text: &str) -> VersionedChanges {
    VersionedChanges {
        version,
        changes: vec![TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_string(),
        }],
    }
}
