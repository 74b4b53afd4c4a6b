//! Interface to the Luau analysis engine
//!
//! The parser, type checker, linter and autocomplete generator are external
//! collaborators. This module defines the data model they hand back (AST arena,
//! type arena, scopes) and the [`AnalysisEngine`] trait the workspace drives.
//!
//! # Architecture
//!
//! ```text
//! Workspace
//!     ├─→ AnalysisCache ──check/lint/autocomplete──→ AnalysisEngine
//!     │                                                  │
//!     └─→ WorkspaceFileResolver ←──read_source/resolve_module
//! ```
//!
//! The engine never owns document text. Every call that may need source code
//! receives a [`FileResolver`], so the workspace keeps exclusive ownership of
//! its document store and sourcemap.

pub mod ast;
pub mod module;
pub mod to_string;
pub mod types;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use ast::{AstBuilder, LocalId, NodeId, SourceModule};
pub use module::{Binding, Module, Scope, ScopeId, Symbol};
pub use types::{TypeArena, TypeId};

/// Canonical key naming one compilation unit.
///
/// Real files use their lexically normalized path with forward slashes, while
/// sourcemap instances use a virtual path such as `game/ReplicatedStorage/Util`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ModuleName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Zero-based line/column position inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Source range `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub begin: Position,
    pub end: Position,
}

impl Location {
    pub const fn new(begin: Position, end: Position) -> Self {
        Self { begin, end }
    }

    /// Shorthand for single-line fixtures and engine adapters.
    pub const fn on_line(line: u32, begin: u32, end: u32) -> Self {
        Self {
            begin: Position::new(line, begin),
            end: Position::new(line, end),
        }
    }

    /// Half-open containment: `begin <= p < end`.
    pub fn contains(&self, position: Position) -> bool {
        self.begin <= position && position < self.end
    }

    /// Closed containment: `begin <= p <= end`.
    pub fn contains_closed(&self, position: Position) -> bool {
        self.begin <= position && position <= self.end
    }
}

/// How a script is executed, derived from its instance class or file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCodeType {
    Script,
    Local,
    Module,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCode {
    pub source: String,
    pub ty: SourceCodeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeErrorKind {
    Syntax,
    Type,
}

/// An error reported by a check pass. `module_name` is the module that owns
/// the error, which is not necessarily the module the check was requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub module_name: ModuleName,
    pub location: Location,
    pub kind: TypeErrorKind,
    pub code: u32,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResult {
    pub errors: Vec<TypeError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LintWarning {
    pub code: u32,
    /// Lint rule name, e.g. `UnknownGlobal`.
    pub name: String,
    pub text: String,
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LintResult {
    pub errors: Vec<LintWarning>,
    pub warnings: Vec<LintWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutocompleteEntryKind {
    Property,
    Binding,
    Keyword,
    String,
    Type,
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParenthesesRecommendation {
    #[default]
    None,
    CursorAfter,
    CursorInside,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutocompleteEntry {
    pub kind: AutocompleteEntryKind,
    /// Type of the entry, allocated in the queried module's arena.
    pub ty: Option<TypeId>,
    pub deprecated: bool,
    pub documentation_symbol: Option<String>,
    pub parens: ParenthesesRecommendation,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutocompleteResult {
    pub entries: BTreeMap<String, AutocompleteEntry>,
}

/// Source access the engine needs from the workspace.
pub trait FileResolver {
    /// Current text of a module: open documents first, then disk.
    fn read_source(&self, name: &ModuleName) -> Option<SourceCode>;

    /// Resolve the argument of a `require` call found in `source` (owned by
    /// `context`) to the module it names.
    fn resolve_module(
        &self,
        context: &ModuleName,
        source: &SourceModule,
        expr: NodeId,
    ) -> Option<ModuleName>;
}

/// The parser + type checker + autocomplete engine driven by a workspace.
///
/// Contract relied upon by the analysis cache: `check` re-parses and re-infers
/// the module and re-validates any stale transitive requires on its own, then
/// leaves the checked module clean.
pub trait AnalysisEngine: Send {
    fn check(&mut self, name: &ModuleName, files: &dyn FileResolver) -> CheckResult;

    fn is_dirty(&self, name: &ModuleName) -> bool;

    fn mark_dirty(&mut self, name: &ModuleName);

    /// Parsed form of the module from the last check, if it could be read.
    fn source_module(&self, name: &ModuleName) -> Option<&SourceModule>;

    /// Type information of the module from the last check.
    fn module(&self, name: &ModuleName) -> Option<&Module>;

    fn lint(&mut self, name: &ModuleName, files: &dyn FileResolver) -> LintResult;

    fn autocomplete(
        &mut self,
        name: &ModuleName,
        position: Position,
        files: &dyn FileResolver,
    ) -> AutocompleteResult;
}

/// What an engine is created for: the owning workspace and the definition
/// files to load into its global scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineContext {
    pub workspace_name: String,
    pub root: PathBuf,
    pub definitions_files: Vec<PathBuf>,
}

/// Creates the engine instance owned by one workspace folder.
pub trait EngineFactory<E>: Send + Sync {
    fn create(&self, context: &EngineContext) -> E;
}

impl<E, F> EngineFactory<E> for F
where
    F: Fn(&EngineContext) -> E + Send + Sync,
{
    fn create(&self, context: &EngineContext) -> E {
        self(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_containment() {
        let location = Location::on_line(0, 4, 8);
        assert!(location.contains(Position::new(0, 4)));
        assert!(location.contains(Position::new(0, 7)));
        assert!(!location.contains(Position::new(0, 8)), "end is exclusive");
        assert!(location.contains_closed(Position::new(0, 8)), "end is inclusive when closed");
        assert!(!location.contains_closed(Position::new(1, 0)));
    }

    #[test]
    fn test_position_ordering_is_line_major() {
        assert!(Position::new(0, 99) < Position::new(1, 0));
        assert!(Position::new(2, 3) > Position::new(2, 1));
    }
}
