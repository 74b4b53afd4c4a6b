//! Clickable links on top-level `local X = require(...)` statements

use tower_lsp::lsp_types::{DocumentLink, Url};
use tracing::trace;

use crate::engine::ast::{Expr, Stat};
use crate::engine::{FileResolver, Location, ModuleName, NodeId, SourceModule};
use crate::lsp::features::node_finder::location_to_range;
use crate::lsp::file_resolver::WorkspaceFileResolver;

/// Argument and argument span of a `require(x)` call with exactly one argument.
fn require_argument(source: &SourceModule, value: NodeId) -> Option<(NodeId, Location)> {
    let Some(Expr::Call { func, args, arg_location, .. }) = source.expr(value) else {
        return None;
    };
    match (source.expr(*func), args.as_slice()) {
        (Some(Expr::Global(name)), [argument]) if name == "require" => Some((*argument, *arg_location)),
        _ => None,
    }
}

/// Links every resolvable top-level require to the file it loads. Requires
/// nested inside functions or blocks are not linked.
pub fn document_links(name: &ModuleName, source: &SourceModule, files: &WorkspaceFileResolver) -> Vec<DocumentLink> {
    source
        .root_body()
        .iter()
        .filter_map(|stat| match source.stat(*stat) {
            Some(Stat::Local { values, .. }) => Some(values),
            _ => None,
        })
        .flatten()
        .filter_map(|value| {
            let (argument, arg_location) = require_argument(source, *value)?;
            let module = files.resolve_module(name, source, argument)?;
            let path = files.resolve_to_real_path(&module)?;
            let target = Url::from_file_path(&path).ok()?;
            trace!("Linking require of {} to {}", module, target);
            Some(DocumentLink {
                range: location_to_range(arg_location),
                target: Some(target),
                tooltip: None,
                data: None,
            })
        })
        .collect()
}
