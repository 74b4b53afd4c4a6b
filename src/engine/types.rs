//! Type arena produced by the checker
//!
//! Types are addressed by [`TypeId`] into a per-module [`TypeArena`]. A type may
//! be a [`Type::Bound`] indirection left behind by unification; always
//! [`TypeArena::follow`] before inspecting the shape.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Nil,
    Boolean,
    Number,
    String,
    Thread,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub ty: TypeId,
    pub deprecated: bool,
    pub documentation_symbol: Option<String>,
}

impl Property {
    pub fn new(ty: TypeId) -> Self {
        Self {
            ty,
            deprecated: false,
            documentation_symbol: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionType {
    pub generics: Vec<String>,
    pub args: Vec<TypeId>,
    /// Parallel to `args`; `None` where the parameter is unnamed.
    pub arg_names: Vec<Option<String>>,
    pub returns: Vec<TypeId>,
    /// Declared with an implicit receiver (`function T:method()`).
    pub has_self: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableType {
    pub name: Option<String>,
    pub props: BTreeMap<String, Property>,
    pub indexer: Option<(TypeId, TypeId)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassType {
    pub name: String,
    pub props: BTreeMap<String, Property>,
    pub parent: Option<TypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetatableType {
    pub table: TypeId,
    pub metatable: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Bound(TypeId),
    Primitive(Primitive),
    Any,
    Unknown,
    Never,
    Generic(String),
    Function(FunctionType),
    Table(TableType),
    Metatable(MetatableType),
    Class(ClassType),
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeVar {
    pub ty: Type,
    /// Key into the documentation database, e.g. `@roblox/globaltype/Part`.
    pub documentation_symbol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeArena {
    vars: Vec<TypeVar>,
}

/// Guards against `Bound` cycles in malformed arenas.
const MAX_FOLLOW_DEPTH: usize = 256;

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ty: Type) -> TypeId {
        self.add_var(TypeVar {
            ty,
            documentation_symbol: None,
        })
    }

    pub fn add_documented(&mut self, ty: Type, documentation_symbol: impl Into<String>) -> TypeId {
        self.add_var(TypeVar {
            ty,
            documentation_symbol: Some(documentation_symbol.into()),
        })
    }

    pub fn add_var(&mut self, var: TypeVar) -> TypeId {
        let id = TypeId(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn var(&self, id: TypeId) -> Option<&TypeVar> {
        self.vars.get(id.0 as usize)
    }

    /// Chases `Bound` links to the representative type.
    pub fn follow(&self, mut id: TypeId) -> TypeId {
        for _ in 0..MAX_FOLLOW_DEPTH {
            match self.var(id).map(|var| &var.ty) {
                Some(Type::Bound(next)) => id = *next,
                _ => return id,
            }
        }
        id
    }

    /// Shape of the followed type.
    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.var(self.follow(id)).map(|var| &var.ty)
    }

    pub fn documentation_symbol(&self, id: TypeId) -> Option<&str> {
        self.var(self.follow(id))
            .and_then(|var| var.documentation_symbol.as_deref())
    }

    /// Looks a property up on a class, walking its parent classes.
    pub fn lookup_class_prop<'a>(&'a self, class: &'a ClassType, name: &str) -> Option<&'a Property> {
        let mut current = Some(class);
        let mut depth = 0;
        while let Some(class) = current {
            if let Some(prop) = class.props.get(name) {
                return Some(prop);
            }
            depth += 1;
            if depth > MAX_FOLLOW_DEPTH {
                return None;
            }
            current = class.parent.and_then(|parent| match self.get(parent) {
                Some(Type::Class(parent)) => Some(parent),
                _ => None,
            });
        }
        None
    }
}
