//! Hover tooltips from inferred types
//!
//! ```text
//! User hovers over symbol
//!       ↓
//! hover()
//!       ├─→ Find expression or local at position
//!       ├─→ Resolve its type (expression type map, property fallback, scope)
//!       ├─→ Render as a Luau code block
//!       └─→ Append documentation of the type, if any
//! ```

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind};
use tracing::debug;

use crate::engine::ast::Expr;
use crate::engine::to_string::{to_string_named_function, to_string_with, ToStringOptions};
use crate::engine::types::{Property, Type};
use crate::engine::{Module, NodeId, Position, SourceModule, Symbol, TypeId};
use crate::lsp::documentation::{code_block, DocumentationProvider};
use crate::lsp::features::node_finder::{
    find_expr_or_local_at_position, function_name_for_expr, location_to_range, ExprOrLocal,
};

/// Separates the type block from documentation in hover markdown.
const DOCUMENTATION_SEPARATOR: &str = "\n----------\n";

/// Type of a property accessed through `expr.index`, looked up on the type of
/// `expr`: class properties (walking parent classes), then table properties,
/// then the properties of a metatable's backing table.
fn index_name_fallback(module: &Module, expr: NodeId, index: &str) -> Option<TypeId> {
    let parent = *module.ast_types.get(&expr)?;
    let types = &module.types;
    let prop: Option<&Property> = match types.get(parent)? {
        Type::Class(class) => types.lookup_class_prop(class, index),
        Type::Table(table) => table.props.get(index),
        Type::Metatable(metatable) => match types.get(metatable.table)? {
            Type::Table(table) => table.props.get(index),
            _ => None,
        },
        _ => None,
    };
    prop.map(|prop| prop.ty)
}

/// Resolves the type of the expression or local under the cursor.
pub fn type_at(source: &SourceModule, module: &Module, target: ExprOrLocal, position: Position) -> Option<TypeId> {
    match target {
        ExprOrLocal::Expr(expr) => {
            if let Some(ty) = module.ast_types.get(&expr) {
                return Some(*ty);
            }
            match source.expr(expr)? {
                Expr::IndexName { expr, index, .. } => index_name_fallback(module, *expr, index),
                _ => None,
            }
        }
        ExprOrLocal::Local(local) => {
            let scope = module.find_scope_at_position(position)?;
            module.lookup(scope, &Symbol::Local(local)).map(|binding| binding.ty)
        }
    }
}

pub fn hover(
    source: &SourceModule,
    module: &Module,
    position: Position,
    docs: &dyn DocumentationProvider,
) -> Option<Hover> {
    let target = find_expr_or_local_at_position(source, position)?;
    let ty = module.types.follow(type_at(source, module, target, position)?);
    let types = &module.types;
    debug!("Hover at {:?} resolved to {:?}", position, ty);

    let local_name = target.local(source).map(|local| source.local(local).name.as_str());
    let type_string = to_string_with(types, ty, ToStringOptions::exhaustive());

    let expr = target.expr().and_then(|expr| source.expr(expr));

    let mut contents = if let Some(Type::Function(function)) = types.get(ty) {
        let name = match (local_name, target.expr()) {
            (Some(name), _) => name.to_string(),
            (None, Some(expr)) => function_name_for_expr(source, expr).unwrap_or_default(),
            (None, None) => String::new(),
        };
        let options = ToStringOptions {
            hide_self_argument: function.has_self && matches!(expr, Some(Expr::IndexName { op: ':', .. })),
            ..ToStringOptions::exhaustive()
        };
        code_block("lua", &to_string_named_function(types, &name, function, options))
    } else if let Some(name) = local_name {
        code_block("lua", &format!("local {}: {}", name, type_string))
    } else if let Some(Expr::Global(name)) = expr {
        code_block("lua", &format!("type {} = {}", name, type_string))
    } else {
        code_block("lua", &type_string)
    };

    if let Some(documentation) = types
        .documentation_symbol(ty)
        .and_then(|symbol| docs.print_documentation(symbol))
    {
        contents.push_str(DOCUMENTATION_SEPARATOR);
        contents.push_str(&documentation);
    }

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: contents,
        }),
        range: Some(location_to_range(target.location(source))),
    })
}
