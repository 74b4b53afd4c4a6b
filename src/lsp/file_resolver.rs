//! Module name resolution between URIs, real paths and sourcemap instances

use std::fs;
use std::path::{Component, Path, PathBuf};

use pathdiff::diff_paths;
use tower_lsp::lsp_types::Url;
use tracing::trace;

use crate::engine::ast::Expr;
use crate::engine::{FileResolver, ModuleName, NodeId, SourceCode, SourceCodeType, SourceModule};
use crate::lsp::document::DocumentStore;
use crate::lsp::sourcemap::{InstanceNode, InstanceTree, DATA_MODEL_ROOT, PROJECT_ROOT};

/// Lexically normalizes a path (`.` and `..` folded, no file system access)
/// and renders it with forward slashes.
pub fn normalize_path(path: &Path) -> String {
    let mut prefix = String::new();
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(drive) => prefix.push_str(&drive.as_os_str().to_string_lossy()),
            Component::RootDir => prefix.push('/'),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|last| last != "..") {
                    parts.pop();
                } else if prefix.is_empty() {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }

    let joined = parts.join("/");
    match (prefix.is_empty(), joined.is_empty()) {
        (true, true) => ".".to_string(),
        (true, false) => joined,
        (false, _) => prefix + &joined,
    }
}

/// Module name of a document URI. File URIs become normalized paths, any
/// other scheme keeps the URI string.
pub fn module_name_from_uri(uri: &Url) -> ModuleName {
    if uri.scheme() == "file" {
        if let Ok(path) = uri.to_file_path() {
            return module_name_from_path(&path);
        }
    }
    ModuleName::new(uri.as_str())
}

pub fn module_name_from_path(path: &Path) -> ModuleName {
    ModuleName::new(normalize_path(path))
}

/// `game`, `ProjectRoot`, or a path below either of them.
pub fn is_virtual_path(name: &str) -> bool {
    [DATA_MODEL_ROOT, PROJECT_ROOT].iter().any(|root| {
        name.strip_prefix(root)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

fn parent_virtual_path(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

fn source_code_type_from_suffix(path: &str) -> SourceCodeType {
    if path.ends_with(".server.lua") || path.ends_with(".server.luau") {
        SourceCodeType::Script
    } else if path.ends_with(".client.lua") || path.ends_with(".client.luau") {
        SourceCodeType::Local
    } else {
        SourceCodeType::Module
    }
}

/// Source access for one workspace: open documents layered over the file
/// system, addressed by real or virtual module names.
#[derive(Debug)]
pub struct WorkspaceFileResolver {
    pub root: PathBuf,
    pub documents: DocumentStore,
    sourcemap: Option<InstanceTree>,
}

impl WorkspaceFileResolver {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            documents: DocumentStore::new(),
            sourcemap: None,
        }
    }

    pub fn sourcemap(&self) -> Option<&InstanceTree> {
        self.sourcemap.as_ref()
    }

    /// Replaces the whole instance tree; `None` switches to pass-through mode.
    pub fn set_sourcemap(&mut self, sourcemap: Option<InstanceTree>) {
        self.sourcemap = sourcemap;
    }

    /// Path of `path` relative to the workspace root, with forward slashes.
    /// Files outside the root climb out with `..` (`../shared/x.luau`).
    pub fn relative_path(&self, path: &Path) -> String {
        let full = PathBuf::from(normalize_path(path));
        let root = PathBuf::from(normalize_path(&self.root));
        match diff_paths(&full, &root) {
            Some(relative) => normalize_path(&relative),
            None => normalize_path(&full),
        }
    }

    fn node_for_virtual_path(&self, name: &str) -> Option<&InstanceNode> {
        if !is_virtual_path(name) {
            return None;
        }
        self.sourcemap.as_ref()?.find_by_virtual_path(name)
    }

    fn node_for_real_path(&self, path: &Path) -> Option<&InstanceNode> {
        let relative = self.relative_path(path);
        self.sourcemap.as_ref()?.find_by_script_path(&relative)
    }

    pub fn resolve_virtual_path_to_real_path(&self, name: &ModuleName) -> Option<PathBuf> {
        let node = self.node_for_virtual_path(name.as_str())?;
        Some(self.root.join(node.script_file_path()?))
    }

    pub fn resolve_real_path_to_virtual_path(&self, path: &Path) -> Option<ModuleName> {
        self.node_for_real_path(path).map(|node| node.virtual_path.clone())
    }

    /// Virtual name of a module, or `None` if it has no instance.
    pub fn resolve_to_virtual_path(&self, name: &ModuleName) -> Option<ModuleName> {
        if is_virtual_path(name.as_str()) {
            return Some(name.clone());
        }
        self.resolve_real_path_to_virtual_path(Path::new(name.as_str()))
    }

    /// Real file behind a module: virtual names go through the sourcemap,
    /// real names are already paths.
    pub fn resolve_to_real_path(&self, name: &ModuleName) -> Option<PathBuf> {
        if is_virtual_path(name.as_str()) {
            self.resolve_virtual_path_to_real_path(name)
        } else {
            Some(PathBuf::from(name.as_str()))
        }
    }

    /// Resolves a `require` argument expression to a module name.
    fn resolve_expr(&self, context: &ModuleName, source: &SourceModule, expr: NodeId) -> Option<String> {
        match source.expr(expr)? {
            Expr::String(path) => {
                let mut path = path.clone();
                if Path::new(&path).extension().is_none() {
                    path.push_str(".lua");
                }
                Some(normalize_path(&self.root.join(path)))
            }
            Expr::Global(name) if name == DATA_MODEL_ROOT => Some(DATA_MODEL_ROOT.to_string()),
            Expr::Global(name) if name == "script" => self
                .resolve_to_virtual_path(context)
                .map(|name| name.as_str().to_string()),
            Expr::Group(inner) => self.resolve_expr(context, source, *inner),
            Expr::IndexName { expr, index, .. } => {
                let base = self.resolve_expr(context, source, *expr)?;
                if index == "Parent" {
                    parent_virtual_path(&base).map(str::to_string)
                } else {
                    Some(format!("{}/{}", base, index))
                }
            }
            Expr::IndexExpr { expr, index } => {
                let Some(Expr::String(index)) = source.expr(*index) else {
                    return None;
                };
                let base = self.resolve_expr(context, source, *expr)?;
                Some(format!("{}/{}", base, index))
            }
            Expr::Call { func, args, self_call: true, .. } => {
                let Some(Expr::IndexName { expr: receiver, index: method, .. }) = source.expr(*func) else {
                    return None;
                };
                let Some(Expr::String(child)) = args.first().and_then(|arg| source.expr(*arg)) else {
                    return None;
                };
                let base = self.resolve_expr(context, source, *receiver)?;
                match method.as_str() {
                    "GetService" if base == DATA_MODEL_ROOT => Some(format!("{}/{}", base, child)),
                    "WaitForChild" | "FindFirstChild" => Some(format!("{}/{}", base, child)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl FileResolver for WorkspaceFileResolver {
    fn read_source(&self, name: &ModuleName) -> Option<SourceCode> {
        let (real_name, node) = if is_virtual_path(name.as_str()) {
            let node = self.node_for_virtual_path(name.as_str())?;
            let path = self.root.join(node.script_file_path()?);
            (module_name_from_path(&path), Some(node))
        } else {
            (name.clone(), self.node_for_real_path(Path::new(name.as_str())))
        };

        let source = match self.documents.get(&real_name) {
            Some(document) => document.text(),
            None => fs::read_to_string(real_name.as_str()).ok()?,
        };
        trace!("Read source of {} from {}", name, real_name);

        let ty = node
            .and_then(InstanceNode::source_code_type)
            .unwrap_or_else(|| source_code_type_from_suffix(real_name.as_str()));
        Some(SourceCode { source, ty })
    }

    fn resolve_module(&self, context: &ModuleName, source: &SourceModule, expr: NodeId) -> Option<ModuleName> {
        self.resolve_expr(context, source, expr).map(ModuleName::new)
    }
}
