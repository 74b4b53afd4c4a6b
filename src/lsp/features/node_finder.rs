//! Position-to-node resolution over the arena syntax tree
//!
//! Every position query starts here. Two containment rules are used:
//!
//! - node lookup ([`find_node_at_position`], [`find_expr_or_local_at_position`])
//!   uses half-open locations, so a position sitting between two tokens
//!   belongs to the one that starts there. A position at or past the end of
//!   the document still resolves to the nodes ending there.
//! - ancestry ([`find_ast_ancestry_of_position`]) uses closed locations, so a
//!   cursor right after `foo(a, b` is still inside the call.
//!
//! When siblings overlap, the first child in source order wins.

use tower_lsp::lsp_types::{Position as LspPosition, Range};
use tracing::trace;

use crate::engine::ast::Expr;
use crate::engine::{LocalId, Location, NodeId, Position, SourceModule};

/// Converts an LSP position to an engine position.
pub fn lsp_to_engine_position(position: LspPosition) -> Position {
    Position::new(position.line, position.character)
}

pub fn engine_to_lsp_position(position: Position) -> LspPosition {
    LspPosition {
        line: position.line,
        character: position.column,
    }
}

pub fn location_to_range(location: Location) -> Range {
    Range {
        start: engine_to_lsp_position(location.begin),
        end: engine_to_lsp_position(location.end),
    }
}

/// The innermost expression or declared local at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprOrLocal {
    Expr(NodeId),
    Local(LocalId),
}

impl ExprOrLocal {
    pub fn expr(&self) -> Option<NodeId> {
        match self {
            ExprOrLocal::Expr(expr) => Some(*expr),
            ExprOrLocal::Local(_) => None,
        }
    }

    /// The local this names: a declaration, or an expression reading a local.
    pub fn local(&self, source: &SourceModule) -> Option<LocalId> {
        match self {
            ExprOrLocal::Local(local) => Some(*local),
            ExprOrLocal::Expr(expr) => match source.expr(*expr)? {
                Expr::Local(local) => Some(*local),
                _ => None,
            },
        }
    }

    pub fn location(&self, source: &SourceModule) -> Location {
        match self {
            ExprOrLocal::Expr(expr) => source.location(*expr),
            ExprOrLocal::Local(local) => source.local(*local).location,
        }
    }
}

/// Half-open containment, extended to the nodes that end where the
/// document ends when the position is at or past that end.
fn covers(source: &SourceModule, location: Location, position: Position) -> bool {
    let document_end = source.location(source.root()).end;
    location.contains(position) || (position >= document_end && location.end == document_end)
}

/// Finds the innermost node of any kind (expression, statement or type) at
/// a position.
pub fn find_node_at_position(source: &SourceModule, position: Position) -> Option<NodeId> {
    let mut current = source.root();
    if !covers(source, source.location(current), position) {
        return None;
    }

    while let Some(child) = source
        .children(current)
        .into_iter()
        .find(|child| covers(source, source.location(*child), position))
    {
        current = child;
    }
    trace!("Node at {:?}: {:?}", position, current);
    Some(current)
}

/// Finds the innermost expression or local declaration at a position.
pub fn find_expr_or_local_at_position(source: &SourceModule, position: Position) -> Option<ExprOrLocal> {
    let mut current = source.root();
    if !covers(source, source.location(current), position) {
        return None;
    }

    let mut found = None;
    loop {
        if source.expr(current).is_some() {
            found = Some(ExprOrLocal::Expr(current));
        }
        if let Some(local) = source
            .declared_locals(current)
            .into_iter()
            .find(|local| covers(source, source.local(*local).location, position))
        {
            return Some(ExprOrLocal::Local(local));
        }

        match source
            .children(current)
            .into_iter()
            .find(|child| covers(source, source.location(*child), position))
        {
            Some(child) => current = child,
            None => return found,
        }
    }
}

/// Nodes containing a position (closed locations), outermost first.
pub fn find_ast_ancestry_of_position(source: &SourceModule, position: Position) -> Vec<NodeId> {
    let mut ancestry = Vec::new();
    let mut current = source.root();
    if !source.location(current).contains_closed(position) {
        return ancestry;
    }

    loop {
        ancestry.push(current);
        match source
            .children(current)
            .into_iter()
            .find(|child| source.location(*child).contains_closed(position))
        {
            Some(child) => current = child,
            None => return ancestry,
        }
    }
}

/// Display name of a callee: `print`, `self.items`, `Account:deposit`.
pub fn function_name_for_expr(source: &SourceModule, expr: NodeId) -> Option<String> {
    match source.expr(expr)? {
        Expr::Global(name) => Some(name.clone()),
        Expr::Local(local) => Some(source.local(*local).name.clone()),
        Expr::IndexName { expr, index, op, .. } => match function_name_for_expr(source, *expr) {
            Some(base) => Some(format!("{}{}{}", base, op, index)),
            None => Some(index.clone()),
        },
        Expr::Group(inner) => function_name_for_expr(source, *inner),
        _ => None,
    }
}
