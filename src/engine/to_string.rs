//! Luau-syntax rendering of checker types

use super::types::{FunctionType, Primitive, TableType, Type, TypeArena, TypeId};

/// Nested types deeper than this render as `...`.
const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct ToStringOptions {
    /// Render the outermost table one property per line.
    pub use_line_breaks: bool,
    /// Drop the implicit receiver of `has_self` functions.
    pub hide_self_argument: bool,
}

impl ToStringOptions {
    pub fn exhaustive() -> Self {
        Self {
            use_line_breaks: true,
            hide_self_argument: false,
        }
    }
}

pub fn to_string(types: &TypeArena, ty: TypeId) -> String {
    to_string_with(types, ty, ToStringOptions::default())
}

pub fn to_string_with(types: &TypeArena, ty: TypeId, options: ToStringOptions) -> String {
    Renderer { types, options }.render(ty, 0)
}

/// `function name(a: number, b: string): number`
pub fn to_string_named_function(
    types: &TypeArena,
    name: &str,
    function: &FunctionType,
    options: ToStringOptions,
) -> String {
    let renderer = Renderer { types, options };
    let mut out = if name.is_empty() {
        "function".to_string()
    } else {
        format!("function {}", name)
    };
    if !function.generics.is_empty() {
        out.push('<');
        out.push_str(&function.generics.join(", "));
        out.push('>');
    }
    out.push('(');
    out.push_str(&renderer.parameters(function, 0).join(", "));
    out.push_str("): ");
    out.push_str(&renderer.returns(function, 0));
    out
}

/// Parameter labels of a function, `name: type` where a name is known.
pub fn parameter_labels(types: &TypeArena, function: &FunctionType, options: ToStringOptions) -> Vec<String> {
    Renderer { types, options }.parameters(function, 0)
}

struct Renderer<'a> {
    types: &'a TypeArena,
    options: ToStringOptions,
}

impl Renderer<'_> {
    fn render(&self, id: TypeId, depth: usize) -> String {
        if depth > MAX_DEPTH {
            return "...".to_string();
        }
        let Some(ty) = self.types.get(id) else {
            return "*error-type*".to_string();
        };

        match ty {
            Type::Bound(_) => "*cycle*".to_string(),
            Type::Primitive(primitive) => match primitive {
                Primitive::Nil => "nil",
                Primitive::Boolean => "boolean",
                Primitive::Number => "number",
                Primitive::String => "string",
                Primitive::Thread => "thread",
            }
            .to_string(),
            Type::Any => "any".to_string(),
            Type::Unknown => "unknown".to_string(),
            Type::Never => "never".to_string(),
            Type::Generic(name) => name.clone(),
            Type::Function(function) => self.function(function, depth),
            Type::Table(table) => self.table(table, depth),
            Type::Metatable(metatable) => format!(
                "{{ @metatable {}, {} }}",
                self.render(metatable.metatable, depth + 1),
                self.render(metatable.table, depth + 1)
            ),
            Type::Class(class) => class.name.clone(),
            Type::Union(parts) => self.union(parts, depth),
            Type::Intersection(parts) => parts
                .iter()
                .map(|part| self.wrapped(*part, depth + 1))
                .collect::<Vec<_>>()
                .join(" & "),
        }
    }

    /// Functions inside unions and intersections need parentheses.
    fn wrapped(&self, id: TypeId, depth: usize) -> String {
        let rendered = self.render(id, depth);
        match self.types.get(id) {
            Some(Type::Function(_)) => format!("({})", rendered),
            _ => rendered,
        }
    }

    fn union(&self, parts: &[TypeId], depth: usize) -> String {
        let is_nil = |id: &TypeId| matches!(self.types.get(*id), Some(Type::Primitive(Primitive::Nil)));
        let non_nil: Vec<&TypeId> = parts.iter().filter(|id| !is_nil(id)).collect();
        if non_nil.len() == 1 && parts.len() == 2 {
            return format!("{}?", self.wrapped(*non_nil[0], depth + 1));
        }
        parts
            .iter()
            .map(|part| self.wrapped(*part, depth + 1))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn function(&self, function: &FunctionType, depth: usize) -> String {
        let generics = if function.generics.is_empty() {
            String::new()
        } else {
            format!("<{}>", function.generics.join(", "))
        };
        format!(
            "{}({}) -> {}",
            generics,
            self.parameters(function, depth).join(", "),
            self.returns(function, depth)
        )
    }

    fn parameters(&self, function: &FunctionType, depth: usize) -> Vec<String> {
        function
            .args
            .iter()
            .enumerate()
            .filter(|(index, _)| !(*index == 0 && function.has_self && self.options.hide_self_argument))
            .map(|(index, arg)| {
                let ty = self.render(*arg, depth + 1);
                match function.arg_names.get(index).and_then(|name| name.as_deref()) {
                    Some(name) => format!("{}: {}", name, ty),
                    None => ty,
                }
            })
            .collect()
    }

    fn returns(&self, function: &FunctionType, depth: usize) -> String {
        match function.returns.as_slice() {
            [] => "()".to_string(),
            [single] => self.wrapped(*single, depth + 1),
            many => format!(
                "({})",
                many.iter()
                    .map(|ret| self.render(*ret, depth + 1))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    fn table(&self, table: &TableType, depth: usize) -> String {
        if let Some(name) = &table.name {
            return name.clone();
        }

        let mut entries: Vec<String> = Vec::new();
        if let Some((key, value)) = table.indexer {
            entries.push(format!(
                "[{}]: {}",
                self.render(key, depth + 1),
                self.render(value, depth + 1)
            ));
        }
        for (name, prop) in &table.props {
            entries.push(format!("{}: {}", name, self.render(prop.ty, depth + 1)));
        }

        if entries.is_empty() {
            "{}".to_string()
        } else if self.options.use_line_breaks && depth == 0 {
            format!("{{\n    {}\n}}", entries.join(",\n    "))
        } else {
            format!("{{ {} }}", entries.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Property;

    fn number_and_string(arena: &mut TypeArena) -> (TypeId, TypeId) {
        (
            arena.add(Type::Primitive(Primitive::Number)),
            arena.add(Type::Primitive(Primitive::String)),
        )
    }

    #[test]
    fn test_function_rendering() {
        let mut arena = TypeArena::new();
        let (number, string) = number_and_string(&mut arena);
        let function = arena.add(Type::Function(FunctionType {
            args: vec![number, string],
            arg_names: vec![Some("count".into()), None],
            returns: vec![number],
            ..Default::default()
        }));

        assert_eq!(to_string(&arena, function), "(count: number, string) -> number");
    }

    #[test]
    fn test_named_function_hides_self() {
        let mut arena = TypeArena::new();
        let (number, _) = number_and_string(&mut arena);
        let receiver = arena.add(Type::Any);
        let function = FunctionType {
            args: vec![receiver, number],
            arg_names: vec![Some("self".into()), Some("amount".into())],
            has_self: true,
            ..Default::default()
        };

        let options = ToStringOptions {
            hide_self_argument: true,
            ..Default::default()
        };
        assert_eq!(
            to_string_named_function(&arena, "Account:deposit", &function, options),
            "function Account:deposit(amount: number): ()"
        );
    }

    #[test]
    fn test_optional_and_table_rendering() {
        let mut arena = TypeArena::new();
        let (number, string) = number_and_string(&mut arena);
        let nil = arena.add(Type::Primitive(Primitive::Nil));
        let optional = arena.add(Type::Union(vec![string, nil]));
        assert_eq!(to_string(&arena, optional), "string?");

        let mut table = TableType::default();
        table.props.insert("x".into(), Property::new(number));
        table.props.insert("y".into(), Property::new(number));
        let table = arena.add(Type::Table(table));
        assert_eq!(to_string(&arena, table), "{ x: number, y: number }");
        assert_eq!(
            to_string_with(&arena, table, ToStringOptions::exhaustive()),
            "{\n    x: number,\n    y: number\n}"
        );
    }

    #[test]
    fn test_intersection_wraps_functions() {
        let mut arena = TypeArena::new();
        let (number, string) = number_and_string(&mut arena);
        let first = arena.add(Type::Function(FunctionType {
            args: vec![number],
            arg_names: vec![None],
            ..Default::default()
        }));
        let second = arena.add(Type::Function(FunctionType {
            args: vec![string],
            arg_names: vec![None],
            ..Default::default()
        }));
        let overloads = arena.add(Type::Intersection(vec![first, second]));

        assert_eq!(
            to_string(&arena, overloads),
            "((number) -> ()) & ((string) -> ())"
        );
    }
}
