use smol_str::SmolStr;

use crate::lexer::token::TextRange;

/// A possibly-qualified type name as written, e.g. `Int32` or `Contoso.Crm.Customer`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub name: SmolStr,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Literal(Literal),
    Ident(SmolStr),
    Member {
        target: Box<Node>,
        name: SmolStr,
    },
    MethodCall {
        target: Box<Node>,
        name: SmolStr,
        args: Vec<Node>,
    },
    Index {
        target: Box<Node>,
        args: Vec<Node>,
    },
    New {
        ty: TypeName,
        args: Vec<Node>,
    },
    NewArray {
        element: TypeName,
        items: Vec<Node>,
    },
    TypeOf(TypeName),
    Is {
        operand: Box<Node>,
        ty: TypeName,
    },
    As {
        operand: Box<Node>,
        ty: TypeName,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Conditional {
        test: Box<Node>,
        if_true: Box<Node>,
        if_false: Box<Node>,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
}

impl Node {
    pub fn new(kind: NodeKind, range: TextRange) -> Self {
        Self { kind, range }
    }

    /// The dotted path this node spells, if it is an identifier or a chain of member accesses.
    pub fn dotted_path(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Ident(name) => Some(name.to_string()),
            NodeKind::Member { target, name } => target.dotted_path().map(|prefix| format!("{prefix}.{name}")),
            _ => None,
        }
    }

    /// The identifier a dotted path starts with.
    pub fn root_ident(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Ident(name) => Some(name),
            NodeKind::Member { target, .. } => target.root_ident(),
            _ => None,
        }
    }
}
