//! Signature help for the call surrounding the cursor

use tower_lsp::lsp_types::{
    Documentation, MarkupContent, MarkupKind, ParameterInformation, ParameterLabel, SignatureHelp,
    SignatureInformation,
};
use tracing::debug;

use crate::engine::ast::Expr;
use crate::engine::to_string::{parameter_labels, to_string_named_function, ToStringOptions};
use crate::engine::types::{FunctionType, Type};
use crate::engine::{Module, NodeId, Position, SourceModule};
use crate::lsp::documentation::DocumentationProvider;
use crate::lsp::features::node_finder::{find_ast_ancestry_of_position, function_name_for_expr};

/// The call the cursor is in: the innermost node when it is a call, else
/// its parent when that is a call.
fn find_candidate_call(source: &SourceModule, ancestry: &[NodeId]) -> Option<NodeId> {
    let is_call = |node: &NodeId| matches!(source.expr(*node), Some(Expr::Call { .. }));
    match ancestry {
        [.., parent, innermost] => [innermost, parent].into_iter().find(|node| is_call(node)).copied(),
        [innermost] => Some(*innermost).filter(is_call),
        [] => None,
    }
}

pub fn signature_help(
    source: &SourceModule,
    module: &Module,
    position: Position,
    docs: &dyn DocumentationProvider,
) -> Option<SignatureHelp> {
    let ancestry = find_ast_ancestry_of_position(source, position);
    let candidate = find_candidate_call(source, &ancestry)?;
    let Some(Expr::Call { func, args, self_call, .. }) = source.expr(candidate) else {
        return None;
    };

    let active_parameter = args.len().saturating_sub(1) as u32;
    let callee = module.types.follow(*module.ast_types.get(func)?);
    let types = &module.types;

    let documentation = types
        .documentation_symbol(callee)
        .and_then(|symbol| docs.print_documentation(symbol))
        .map(|value| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            })
        });
    let name = function_name_for_expr(source, *func).unwrap_or_default();

    let signature = |function: &FunctionType| {
        let options = ToStringOptions {
            hide_self_argument: function.has_self && *self_call,
            ..Default::default()
        };
        let parameters = parameter_labels(types, function, options)
            .into_iter()
            .map(|label| ParameterInformation {
                label: ParameterLabel::Simple(label),
                documentation: None,
            })
            .collect();
        SignatureInformation {
            label: to_string_named_function(types, &name, function, options),
            documentation: documentation.clone(),
            parameters: Some(parameters),
            active_parameter: None,
        }
    };

    let signatures: Vec<SignatureInformation> = match types.get(callee)? {
        Type::Function(function) => vec![signature(function)],
        Type::Intersection(parts) => parts
            .iter()
            .filter_map(|part| match types.get(*part) {
                Some(Type::Function(function)) => Some(signature(function)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    if signatures.is_empty() {
        return None;
    }
    debug!("{} signature(s) for call at {:?}", signatures.len(), position);

    Some(SignatureHelp {
        signatures,
        active_signature: Some(0),
        active_parameter: Some(active_parameter),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ast::Stat;
    use crate::engine::types::{Primitive, TypeArena};
    use crate::engine::{AstBuilder, Location};
    use crate::lsp::documentation::DocumentationDatabase;

    /// `fire(a, b, c)` on line 0 and `fire()` on line 1, where `fire` is
    /// `(name: string, count: number, boolean) -> ()`.
    fn calls() -> (SourceModule, Module) {
        let mut types = TypeArena::new();
        let string = types.add(Type::Primitive(Primitive::String));
        let number = types.add(Type::Primitive(Primitive::Number));
        let boolean = types.add(Type::Primitive(Primitive::Boolean));
        let fire = types.add(Type::Function(FunctionType {
            args: vec![string, number, boolean],
            arg_names: vec![Some("name".into()), Some("count".into()), None],
            ..Default::default()
        }));

        let mut builder = AstBuilder::new();
        let callee = builder.expr(Location::on_line(0, 0, 4), Expr::Global("fire".into()));
        let args: Vec<NodeId> = [5, 8, 11]
            .into_iter()
            .zip(["a", "b", "c"])
            .map(|(column, name)| builder.expr(Location::on_line(0, column, column + 1), Expr::Global(name.into())))
            .collect();
        let call = builder.expr(
            Location::on_line(0, 0, 13),
            Expr::Call { func: callee, args, self_call: false, arg_location: Location::on_line(0, 5, 12) },
        );
        let first = builder.stat(Location::on_line(0, 0, 13), Stat::Expr(call));

        let empty_callee = builder.expr(Location::on_line(1, 0, 4), Expr::Global("fire".into()));
        let empty_call = builder.expr(
            Location::on_line(1, 0, 6),
            Expr::Call { func: empty_callee, args: vec![], self_call: false, arg_location: Location::on_line(1, 5, 5) },
        );
        let second = builder.stat(Location::on_line(1, 0, 6), Stat::Expr(empty_call));
        let source = builder.finish(
            "main",
            Location::new(Position::new(0, 0), Position::new(1, 6)),
            vec![first, second],
        );

        let mut module = Module::new("main", types);
        module.ast_types.insert(callee, fire);
        module.ast_types.insert(empty_callee, fire);
        (source, module)
    }

    #[test]
    fn test_active_parameter_is_last_argument() {
        let (source, module) = calls();
        let help = signature_help(&source, &module, Position::new(0, 12), &DocumentationDatabase::default())
            .expect("signature help inside call");

        assert_eq!(help.active_parameter, Some(2));
        assert_eq!(help.active_signature, Some(0));
        let signature = &help.signatures[0];
        assert_eq!(signature.label, "function fire(name: string, count: number, boolean): ()");
        let labels: Vec<_> = signature
            .parameters
            .iter()
            .flatten()
            .map(|parameter| match &parameter.label {
                ParameterLabel::Simple(label) => label.clone(),
                other => panic!("unexpected label {:?}", other),
            })
            .collect();
        assert_eq!(labels, vec!["name: string", "count: number", "boolean"]);
    }

    #[test]
    fn test_empty_call_has_active_parameter_zero() {
        let (source, module) = calls();
        let help = signature_help(&source, &module, Position::new(1, 5), &DocumentationDatabase::default()).unwrap();
        assert_eq!(help.active_parameter, Some(0));
    }

    #[test]
    fn test_argument_position_uses_enclosing_call() {
        let (source, module) = calls();
        // Inside the argument `b`: innermost node is the argument, its parent the call.
        let help = signature_help(&source, &module, Position::new(0, 8), &DocumentationDatabase::default());
        assert!(help.is_some());
    }

    #[test]
    fn test_overloads_and_method_receivers() {
        let mut types = TypeArena::new();
        let receiver = types.add(Type::Any);
        let number = types.add(Type::Primitive(Primitive::Number));
        let string = types.add(Type::Primitive(Primitive::String));
        let by_number = types.add(Type::Function(FunctionType {
            args: vec![receiver, number],
            arg_names: vec![Some("self".into()), Some("amount".into())],
            has_self: true,
            ..Default::default()
        }));
        let by_string = types.add(Type::Function(FunctionType {
            args: vec![receiver, string],
            arg_names: vec![Some("self".into()), Some("label".into())],
            has_self: true,
            ..Default::default()
        }));
        let overloads = types.add(Type::Intersection(vec![by_number, by_string]));

        let mut builder = AstBuilder::new();
        let account = builder.expr(Location::on_line(0, 0, 7), Expr::Global("account".into()));
        let method = builder.expr(
            Location::on_line(0, 0, 15),
            Expr::IndexName {
                expr: account,
                index: "deposit".into(),
                index_location: Location::on_line(0, 8, 15),
                op: ':',
            },
        );
        let call = builder.expr(
            Location::on_line(0, 0, 17),
            Expr::Call { func: method, args: vec![], self_call: true, arg_location: Location::on_line(0, 16, 16) },
        );
        let source = builder.finish("main", Location::on_line(0, 0, 17), vec![call]);
        let mut module = Module::new("main", types);
        module.ast_types.insert(method, overloads);

        let help = signature_help(&source, &module, Position::new(0, 16), &DocumentationDatabase::default()).unwrap();
        let labels: Vec<_> = help.signatures.iter().map(|signature| signature.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "function account:deposit(amount: number): ()",
                "function account:deposit(label: string): ()"
            ]
        );
        assert_eq!(help.signatures[0].parameters.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_outside_call_has_no_signature() {
        let (source, module) = calls();
        assert!(signature_help(&source, &module, Position::new(3, 0), &DocumentationDatabase::default()).is_none());
    }
}
