//! Arena-allocated Luau syntax tree
//!
//! Nodes live in a flat `Vec` owned by [`SourceModule`] and refer to each other
//! through [`NodeId`] indices. Local variable declarations are kept in a
//! separate arena addressed by [`LocalId`], mirroring how the checker keys
//! bindings by declaration rather than by name.

use super::{Location, ModuleName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// A declared local variable (including function parameters).
#[derive(Debug, Clone, PartialEq)]
pub struct AstLocal {
    pub name: String,
    pub location: Location,
    /// Type annotation node, if written as `local x: T`.
    pub annotation: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Len,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    CompareNe,
    CompareEq,
    CompareLt,
    CompareLe,
    CompareGt,
    CompareGe,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableItem {
    pub key: Option<NodeId>,
    pub value: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Varargs,
    Global(String),
    Local(LocalId),
    Call {
        func: NodeId,
        args: Vec<NodeId>,
        /// `true` for method-call syntax `obj:method(...)`.
        self_call: bool,
        /// Range spanned by the arguments between the parentheses.
        arg_location: Location,
    },
    IndexName {
        expr: NodeId,
        index: String,
        index_location: Location,
        /// `'.'` or `':'`.
        op: char,
    },
    IndexExpr {
        expr: NodeId,
        index: NodeId,
    },
    Function {
        self_param: Option<LocalId>,
        params: Vec<LocalId>,
        body: NodeId,
    },
    Table {
        items: Vec<TableItem>,
    },
    Unary {
        op: UnaryOp,
        expr: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Group(NodeId),
    TypeAssertion {
        expr: NodeId,
        annotation: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stat {
    Block {
        body: Vec<NodeId>,
    },
    Local {
        vars: Vec<LocalId>,
        values: Vec<NodeId>,
    },
    Assign {
        vars: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    Expr(NodeId),
    Return(Vec<NodeId>),
    If {
        condition: NodeId,
        then_body: NodeId,
        else_body: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    Function {
        name: NodeId,
        func: NodeId,
    },
    LocalFunction {
        name: LocalId,
        func: NodeId,
    },
    TypeAlias {
        name: String,
        ty: NodeId,
        exported: bool,
    },
}

/// Written type annotations.
#[derive(Debug, Clone, PartialEq)]
pub enum AstType {
    Reference {
        /// Module alias for `Module.Type` references.
        prefix: Option<String>,
        name: String,
    },
    Table {
        props: Vec<(String, NodeId)>,
    },
    Function {
        args: Vec<NodeId>,
        returns: Vec<NodeId>,
    },
    Union(Vec<NodeId>),
    Optional(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expr(Expr),
    Stat(Stat),
    Type(AstType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub location: Location,
    pub node: Node,
}

/// Parsed form of one module.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceModule {
    pub name: ModuleName,
    nodes: Vec<AstNode>,
    locals: Vec<AstLocal>,
    root: NodeId,
    /// Modules named by `require` calls, as resolved by the engine.
    pub requires: Vec<ModuleName>,
}

impl SourceModule {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Statements of the top-level block.
    pub fn root_body(&self) -> &[NodeId] {
        match self.stat(self.root) {
            Some(Stat::Block { body }) => body,
            _ => &[],
        }
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.0 as usize]
    }

    pub fn location(&self, id: NodeId) -> Location {
        self.node(id).location
    }

    pub fn expr(&self, id: NodeId) -> Option<&Expr> {
        match &self.node(id).node {
            Node::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn stat(&self, id: NodeId) -> Option<&Stat> {
        match &self.node(id).node {
            Node::Stat(stat) => Some(stat),
            _ => None,
        }
    }

    pub fn ty(&self, id: NodeId) -> Option<&AstType> {
        match &self.node(id).node {
            Node::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn local(&self, id: LocalId) -> &AstLocal {
        &self.locals[id.0 as usize]
    }

    /// Local variables declared directly by this node (not by its children).
    pub fn declared_locals(&self, id: NodeId) -> Vec<LocalId> {
        match &self.node(id).node {
            Node::Stat(Stat::Local { vars, .. }) => vars.clone(),
            Node::Stat(Stat::LocalFunction { name, .. }) => vec![*name],
            Node::Expr(Expr::Function { self_param, params, .. }) => {
                self_param.iter().chain(params.iter()).copied().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Direct children in source order. Annotations of declared locals come
    /// before the values they are assigned.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let annotations = |locals: &mut dyn Iterator<Item = &LocalId>| -> Vec<NodeId> {
            locals.filter_map(|local| self.local(*local).annotation).collect()
        };

        match &self.node(id).node {
            Node::Expr(expr) => match expr {
                Expr::Nil
                | Expr::Bool(_)
                | Expr::Number(_)
                | Expr::String(_)
                | Expr::Varargs
                | Expr::Global(_)
                | Expr::Local(_) => Vec::new(),
                Expr::Call { func, args, .. } => {
                    std::iter::once(*func).chain(args.iter().copied()).collect()
                }
                Expr::IndexName { expr, .. } => vec![*expr],
                Expr::IndexExpr { expr, index } => vec![*expr, *index],
                Expr::Function { self_param, params, body } => {
                    let mut children = annotations(&mut self_param.iter().chain(params.iter()));
                    children.push(*body);
                    children
                }
                Expr::Table { items } => items
                    .iter()
                    .flat_map(|item| item.key.into_iter().chain(std::iter::once(item.value)))
                    .collect(),
                Expr::Unary { expr, .. } => vec![*expr],
                Expr::Binary { left, right, .. } => vec![*left, *right],
                Expr::Group(inner) => vec![*inner],
                Expr::TypeAssertion { expr, annotation } => vec![*expr, *annotation],
            },
            Node::Stat(stat) => match stat {
                Stat::Block { body } => body.clone(),
                Stat::Local { vars, values } => {
                    let mut children = annotations(&mut vars.iter());
                    children.extend(values.iter().copied());
                    children
                }
                Stat::Assign { vars, values } => vars.iter().chain(values.iter()).copied().collect(),
                Stat::Expr(expr) => vec![*expr],
                Stat::Return(values) => values.clone(),
                Stat::If { condition, then_body, else_body } => {
                    let mut children = vec![*condition, *then_body];
                    children.extend(else_body.iter().copied());
                    children
                }
                Stat::While { condition, body } => vec![*condition, *body],
                Stat::Function { name, func } => vec![*name, *func],
                Stat::LocalFunction { func, .. } => vec![*func],
                Stat::TypeAlias { ty, .. } => vec![*ty],
            },
            Node::Type(ty) => match ty {
                AstType::Reference { .. } => Vec::new(),
                AstType::Table { props } => props.iter().map(|(_, ty)| *ty).collect(),
                AstType::Function { args, returns } => args.iter().chain(returns.iter()).copied().collect(),
                AstType::Union(parts) => parts.clone(),
                AstType::Optional(inner) => vec![*inner],
            },
        }
    }
}

/// Incrementally builds a [`SourceModule`]. Children must be added before
/// their parents, so ids handed to a node always refer to existing nodes.
#[derive(Debug, Default)]
pub struct AstBuilder {
    nodes: Vec<AstNode>,
    locals: Vec<AstLocal>,
    requires: Vec<ModuleName>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, location: Location, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode { location, node });
        id
    }

    pub fn expr(&mut self, location: Location, expr: Expr) -> NodeId {
        self.push(location, Node::Expr(expr))
    }

    pub fn stat(&mut self, location: Location, stat: Stat) -> NodeId {
        self.push(location, Node::Stat(stat))
    }

    pub fn ty(&mut self, location: Location, ty: AstType) -> NodeId {
        self.push(location, Node::Type(ty))
    }

    pub fn local(&mut self, name: impl Into<String>, location: Location, annotation: Option<NodeId>) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(AstLocal {
            name: name.into(),
            location,
            annotation,
        });
        id
    }

    pub fn require(&mut self, module: impl Into<ModuleName>) -> &mut Self {
        self.requires.push(module.into());
        self
    }

    /// Wraps `body` in the root block spanning `location`.
    pub fn finish(mut self, name: impl Into<ModuleName>, location: Location, body: Vec<NodeId>) -> SourceModule {
        let root = self.push(location, Node::Stat(Stat::Block { body }));
        SourceModule {
            name: name.into(),
            nodes: self.nodes,
            locals: self.locals,
            root,
            requires: self.requires,
        }
    }
}
