//! Typed expression trees produced by a compiler backend.

use smol_str::SmolStr;

use crate::types::{ConstructorRef, MemberRef, MethodRef, TypeId, TypeUniverse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    AddChecked,
    And,
    AndAlso,
    Coalesce,
    Divide,
    Equal,
    ExclusiveOr,
    GreaterThan,
    GreaterThanOrEqual,
    LeftShift,
    LessThan,
    LessThanOrEqual,
    Modulo,
    Multiply,
    MultiplyChecked,
    NotEqual,
    Or,
    OrElse,
    Power,
    RightShift,
    Subtract,
    SubtractChecked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    ArrayLength,
    Negate,
    NegateChecked,
    Not,
    Quote,
    UnaryPlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertKind {
    Convert,
    ConvertChecked,
    /// `as`: yields null instead of failing.
    TypeAs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewArrayKind {
    Init,
    Bounds,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(SmolStr),
    /// Any other runtime object, kept as its display text.
    Opaque(SmolStr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Null,
    /// The value is itself a type (`typeof(T)`).
    Type(TypeId),
    Value { literal: Literal, runtime_type: TypeId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpr {
    pub test: Box<Expr>,
    pub if_true: Box<Expr>,
    pub if_false: Box<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantExpr {
    pub value: ConstantValue,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeExpr {
    pub target: Box<Expr>,
    pub arguments: Vec<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    pub parameters: Vec<ParameterExpr>,
    pub body: Box<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementInit {
    pub add_method: MethodRef,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListInitExpr {
    pub new_expression: NewExpr,
    pub initializers: Vec<ElementInit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterExpr {
    pub name: SmolStr,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    /// `None` for static members.
    pub receiver: Option<Box<Expr>>,
    pub member: MemberRef,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberBindingKind {
    Assignment(Expr),
    ListBinding(Vec<ElementInit>),
    MemberBinding(Vec<MemberBinding>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberBinding {
    pub member: MemberRef,
    pub kind: MemberBindingKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberInitExpr {
    pub new_expression: NewExpr,
    pub bindings: Vec<MemberBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayIndexExpr {
    pub array: Box<Expr>,
    pub indexes: Vec<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// `None` for static calls.
    pub receiver: Option<Box<Expr>>,
    pub method: MethodRef,
    pub arguments: Vec<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArrayExpr {
    pub kind: NewArrayKind,
    pub expressions: Vec<Expr>,
    /// The array type, not the element type.
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpr {
    /// `None` for value types constructed without a declared constructor.
    pub constructor: Option<ConstructorRef>,
    pub arguments: Vec<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeIsExpr {
    pub operand: Box<Expr>,
    pub type_operand: TypeId,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertExpr {
    pub kind: ConvertKind,
    pub operand: Box<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockExpr {
    pub variables: Vec<ParameterExpr>,
    pub expressions: Vec<Expr>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpr {
    pub target: Box<Expr>,
    pub value: Box<Expr>,
    pub ty: TypeId,
}

/// One node of a compiled expression. The variant set is closed: every analysis
/// over trees matches exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(BinaryExpr),
    Conditional(ConditionalExpr),
    Constant(ConstantExpr),
    Invoke(InvokeExpr),
    Lambda(LambdaExpr),
    ListInit(ListInitExpr),
    Parameter(ParameterExpr),
    MemberAccess(MemberExpr),
    MemberInit(MemberInitExpr),
    ArrayIndex(ArrayIndexExpr),
    Call(CallExpr),
    NewArray(NewArrayExpr),
    New(NewExpr),
    TypeIs(TypeIsExpr),
    Convert(ConvertExpr),
    Unary(UnaryExpr),
    Block(BlockExpr),
    Assign(AssignExpr),
}

impl Expr {
    /// Static type of the node.
    pub fn ty(&self) -> TypeId {
        match self {
            Expr::Binary(e) => e.ty,
            Expr::Conditional(e) => e.ty,
            Expr::Constant(e) => e.ty,
            Expr::Invoke(e) => e.ty,
            Expr::Lambda(e) => e.ty,
            Expr::ListInit(e) => e.new_expression.ty,
            Expr::Parameter(e) => e.ty,
            Expr::MemberAccess(e) => e.ty,
            Expr::MemberInit(e) => e.new_expression.ty,
            Expr::ArrayIndex(e) => e.ty,
            Expr::Call(e) => e.ty,
            Expr::NewArray(e) => e.ty,
            Expr::New(e) => e.ty,
            Expr::TypeIs(e) => e.ty,
            Expr::Convert(e) => e.ty,
            Expr::Unary(e) => e.ty,
            Expr::Block(e) => e.ty,
            Expr::Assign(e) => e.ty,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Binary(_) => "binary",
            Expr::Conditional(_) => "conditional",
            Expr::Constant(_) => "constant",
            Expr::Invoke(_) => "invoke",
            Expr::Lambda(_) => "lambda",
            Expr::ListInit(_) => "list-init",
            Expr::Parameter(_) => "parameter",
            Expr::MemberAccess(_) => "member-access",
            Expr::MemberInit(_) => "member-init",
            Expr::ArrayIndex(_) => "array-index",
            Expr::Call(_) => "call",
            Expr::NewArray(_) => "new-array",
            Expr::New(_) => "new",
            Expr::TypeIs(_) => "type-is",
            Expr::Convert(_) => "convert",
            Expr::Unary(_) => "unary",
            Expr::Block(_) => "block",
            Expr::Assign(_) => "assign",
        }
    }

    pub fn parameter(name: impl Into<SmolStr>, ty: TypeId) -> Self {
        Expr::Parameter(ParameterExpr {
            name: name.into(),
            ty,
        })
    }

    pub fn null(ty: TypeId) -> Self {
        Expr::Constant(ConstantExpr {
            value: ConstantValue::Null,
            ty,
        })
    }

    pub fn int(universe: &TypeUniverse, value: i64) -> Self {
        let int32 = universe.core().int32;
        Expr::Constant(ConstantExpr {
            value: ConstantValue::Value {
                literal: Literal::Int(value),
                runtime_type: int32,
            },
            ty: int32,
        })
    }

    pub fn string(universe: &TypeUniverse, value: impl Into<SmolStr>) -> Self {
        let string = universe.core().string;
        Expr::Constant(ConstantExpr {
            value: ConstantValue::Value {
                literal: Literal::Str(value.into()),
                runtime_type: string,
            },
            ty: string,
        })
    }

    pub fn type_constant(universe: &TypeUniverse, ty: TypeId) -> Self {
        Expr::Constant(ConstantExpr {
            value: ConstantValue::Type(ty),
            ty: universe.core().type_type,
        })
    }

    pub fn member(receiver: Option<Expr>, member: MemberRef) -> Self {
        let ty = member.ty;
        Expr::MemberAccess(MemberExpr {
            receiver: receiver.map(Box::new),
            member,
            ty,
        })
    }

    pub fn call(receiver: Option<Expr>, method: MethodRef, arguments: Vec<Expr>) -> Self {
        let ty = method.return_type;
        Expr::Call(CallExpr {
            receiver: receiver.map(Box::new),
            method,
            arguments,
            ty,
        })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr, ty: TypeId) -> Self {
        Expr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    pub fn convert(kind: ConvertKind, operand: Expr, ty: TypeId) -> Self {
        Expr::Convert(ConvertExpr {
            kind,
            operand: Box::new(operand),
            ty,
        })
    }
}

/// A compiled lambda: the parameters it closes over, its body and its result type.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    pub parameters: Vec<ParameterExpr>,
    pub body: Expr,
    pub return_type: TypeId,
}

impl CompiledExpression {
    pub fn new(body: Expr) -> Self {
        let return_type = body.ty();
        Self {
            parameters: Vec::new(),
            body,
            return_type,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterExpr>) -> Self {
        self.parameters = parameters;
        self
    }
}
