//! Goto definition and goto type definition
//!
//! ```text
//! User clicks on symbol
//!       ↓
//! goto_definition()
//!       ├─→ Find expression or local at position
//!       ├─→ Map it to a scope symbol (local declaration or global name)
//!       └─→ Return the declaration location of its binding
//!
//! goto_type_definition()
//!       ├─→ Type reference under cursor → alias declaration in scope chain
//!       └─→ Annotated local under cursor → alias named by its annotation
//! ```
//!
//! Both return locations inside the queried module. The workspace attaches
//! the document URI.

use tracing::debug;

use crate::engine::ast::{AstType, Expr};
use crate::engine::{Location, Module, Position, SourceModule, Symbol};
use crate::lsp::features::node_finder::{
    find_expr_or_local_at_position, find_node_at_position, ExprOrLocal,
};

/// Scope symbol named by the expression or local under the cursor.
fn symbol_at(source: &SourceModule, target: ExprOrLocal) -> Option<Symbol> {
    match target {
        ExprOrLocal::Local(local) => Some(Symbol::Local(local)),
        ExprOrLocal::Expr(expr) => match source.expr(expr)? {
            Expr::Local(local) => Some(Symbol::Local(*local)),
            Expr::Global(name) => Some(Symbol::Global(name.clone())),
            _ => None,
        },
    }
}

pub fn goto_definition(source: &SourceModule, module: &Module, position: Position) -> Option<Location> {
    let target = find_expr_or_local_at_position(source, position)?;
    let symbol = symbol_at(source, target)?;
    let scope = module.find_scope_at_position(position)?;
    let binding = module.lookup(scope, &symbol)?;
    debug!("Definition of {:?} at {:?}", symbol, binding.location);
    Some(binding.location)
}

/// Declaration of the type alias named by a reference annotation, looked up
/// from the scope enclosing `position`.
fn alias_location(module: &Module, name: &str, position: Position) -> Option<Location> {
    let scope = module.find_scope_at_position(position)?;
    module.lookup_type_alias_location(scope, name)
}

pub fn goto_type_definition(source: &SourceModule, module: &Module, position: Position) -> Option<Location> {
    let node = find_node_at_position(source, position)?;
    if let Some(AstType::Reference { name, .. }) = source.ty(node) {
        return alias_location(module, name, position);
    }

    let local = find_expr_or_local_at_position(source, position)?.local(source)?;
    let annotation = source.local(local).annotation?;
    // Only plain references have a declaration to jump to.
    match source.ty(annotation)? {
        AstType::Reference { name, .. } => {
            debug!("Type definition of {} through its annotation", source.local(local).name);
            alias_location(module, name, source.location(annotation).begin)
        }
        _ => None,
    }
}
