//! Binds a parsed Lite expression against an environment and a type universe,
//! producing a typed [`flowexpr::Expr`] tree.

use flowexpr::expr::{
    ArrayIndexExpr, AssignExpr, BinaryOp, ConditionalExpr, ConstantExpr, ConstantValue, ConvertKind, Literal as Value,
    NewArrayExpr, NewArrayKind, NewExpr, ParameterExpr, TypeIsExpr, UnaryExpr, UnaryOp,
};
use flowexpr::types::{ConstructorRef, MethodRef, TypeKind};
use flowexpr::{AssemblyName, CORE_ASSEMBLY, CompiledExpression, Environment, Expr, TypeId, TypeUniverse};
use indexmap::IndexMap;
use itertools::Itertools;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use thiserror::Error;

use crate::ast::{BinaryOperator, Literal, Node, NodeKind, TypeName, UnaryOperator};
use crate::lexer::token::TextRange;

/// Short names accepted in place of core type names.
pub const TYPE_ALIASES: &[(&str, &str)] = &[
    ("bool", "System.Boolean"),
    ("int", "System.Int32"),
    ("long", "System.Int64"),
    ("double", "System.Double"),
    ("string", "System.String"),
    ("object", "System.Object"),
];

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
pub struct BindError {
    pub kind: BindErrorKind,
    pub range: TextRange,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindErrorKind {
    #[error("The name `{0}` does not exist in the current context")]
    UnknownName(SmolStr),
    #[error("The type or namespace name `{0}` could not be found")]
    UnknownType(SmolStr),
    #[error("`{0}` is an ambiguous reference between {1}")]
    AmbiguousType(SmolStr, String),
    #[error("Type `{0}` is defined in assembly `{1}`, which is not referenced")]
    AssemblyNotReferenced(String, SmolStr),
    #[error("`{0}` is a type, which is not valid in the given context")]
    TypeUsedAsValue(SmolStr),
    #[error("`{0}` does not contain a definition for `{1}`")]
    UnknownMember(String, SmolStr),
    #[error("No overload for method `{1}` of `{0}` takes {2} argument(s) of these types")]
    NoOverload(String, SmolStr, usize),
    #[error("`{0}` does not contain a constructor that takes {1} argument(s) of these types")]
    NoConstructor(String, usize),
    #[error("Cannot apply indexing to an expression of type `{0}`")]
    NotIndexable(String),
    #[error("Operator `{0}` cannot be applied to operands of type `{1}` and `{2}`")]
    BinaryOperands(&'static str, String, String),
    #[error("Operator `{0}` cannot be applied to operand of type `{1}`")]
    UnaryOperand(&'static str, String),
    #[error("Cannot implicitly convert type `{0}` to `{1}`")]
    Conversion(String, String),
    #[error("Type of conditional expression cannot be determined between `{0}` and `{1}`")]
    ConditionalBranches(String, String),
    #[error("The as operator must be used with a reference type, not `{0}`")]
    AsValueType(String),
    #[error("Array type `{0}[]` is not available")]
    ArrayUnavailable(String),
}

impl BindErrorKind {
    fn at(self, range: TextRange) -> BindError {
        BindError { kind: self, range }
    }
}

type Result<T> = std::result::Result<T, BindError>;

enum Receiver {
    Value(Expr),
    Type(TypeId),
}

pub struct Binder<'a> {
    universe: &'a TypeUniverse,
    environment: &'a Environment,
    namespaces: Vec<SmolStr>,
    assemblies: &'a FxHashSet<AssemblyName>,
    parameters: IndexMap<SmolStr, ParameterExpr>,
}

impl<'a> Binder<'a> {
    pub fn new(
        universe: &'a TypeUniverse,
        environment: &'a Environment,
        namespaces: &FxHashSet<SmolStr>,
        assemblies: &'a FxHashSet<AssemblyName>,
    ) -> Self {
        let namespaces = std::iter::once(SmolStr::new("System"))
            .chain(namespaces.iter().filter(|ns| *ns != "System").cloned().sorted())
            .collect();
        Self {
            universe,
            environment,
            namespaces,
            assemblies,
            parameters: IndexMap::new(),
        }
    }

    /// Binds `node` as the body of a lambda over the environment variables it uses.
    pub fn bind_expression(mut self, node: &Node) -> Result<CompiledExpression> {
        let body = self.bind(node)?;
        Ok(CompiledExpression::new(body).with_parameters(self.parameters.into_values().collect()))
    }

    /// Applies an implicit conversion of `expr` to `to`, or fails.
    pub fn coerce(&self, expr: Expr, to: TypeId, range: TextRange) -> Result<Expr> {
        let from = expr.ty();
        if from == to {
            return Ok(expr);
        }
        if is_null(&expr) && !self.universe.is_value_type(to) {
            return Ok(Expr::null(to));
        }
        if self.universe.is_widening(from, to) || self.universe.is_assignable(from, to) {
            return Ok(Expr::convert(ConvertKind::Convert, expr, to));
        }
        Err(BindErrorKind::Conversion(self.name(from), self.name(to)).at(range))
    }

    fn bind(&mut self, node: &Node) -> Result<Expr> {
        match &node.kind {
            NodeKind::Literal(literal) => Ok(self.bind_literal(literal)),
            NodeKind::Ident(name) => self.bind_ident(name, node.range),
            NodeKind::Member { target, name } => {
                let receiver = self.bind_receiver(target)?;
                self.bind_member(receiver, name, node.range)
            }
            NodeKind::MethodCall { target, name, args } => {
                let receiver = self.bind_receiver(target)?;
                self.bind_call(receiver, name, args, node.range)
            }
            NodeKind::Index { target, args } => self.bind_index(target, args, node.range),
            NodeKind::New { ty, args } => self.bind_new(ty, args, node.range),
            NodeKind::NewArray { element, items } => self.bind_new_array(element, items, node.range),
            NodeKind::TypeOf(ty) => {
                let ty = self.resolve_type(ty)?;
                Ok(Expr::type_constant(self.universe, ty))
            }
            NodeKind::Is { operand, ty } => {
                let operand = self.bind(operand)?;
                let type_operand = self.resolve_type(ty)?;
                Ok(Expr::TypeIs(TypeIsExpr {
                    operand: Box::new(operand),
                    type_operand,
                    ty: self.universe.core().boolean,
                }))
            }
            NodeKind::As { operand, ty } => {
                let operand = self.bind(operand)?;
                let target = self.resolve_type(ty)?;
                if self.universe.is_value_type(target) {
                    return Err(BindErrorKind::AsValueType(self.name(target)).at(ty.range));
                }
                Ok(Expr::convert(ConvertKind::TypeAs, operand, target))
            }
            NodeKind::Unary { op, operand } => self.bind_unary(*op, operand, node.range),
            NodeKind::Binary { op, left, right } => self.bind_binary(*op, left, right, node.range),
            NodeKind::Conditional {
                test,
                if_true,
                if_false,
            } => self.bind_conditional(test, if_true, if_false, node.range),
            NodeKind::Assign { target, value } => {
                let target = self.bind(target)?;
                let value_range = value.range;
                let value = self.bind(value)?;
                let ty = target.ty();
                let value = self.coerce(value, ty, value_range)?;
                Ok(Expr::Assign(AssignExpr {
                    target: Box::new(target),
                    value: Box::new(value),
                    ty,
                }))
            }
        }
    }

    fn bind_literal(&self, literal: &Literal) -> Expr {
        let core = self.universe.core();
        let (literal, ty) = match literal {
            Literal::Null => return Expr::null(core.object),
            Literal::String(s) => return Expr::string(self.universe, s.as_str()),
            Literal::Bool(b) => (Value::Bool(*b), core.boolean),
            Literal::Int(n) if i32::try_from(*n).is_ok() => (Value::Int(*n), core.int32),
            Literal::Int(n) => (Value::Int(*n), core.int64),
            Literal::Float(n) => (Value::Float(*n), core.double),
        };
        Expr::Constant(ConstantExpr {
            value: ConstantValue::Value {
                literal,
                runtime_type: ty,
            },
            ty,
        })
    }

    fn bind_ident(&mut self, name: &SmolStr, range: TextRange) -> Result<Expr> {
        if let Some(ty) = self.environment.lookup(name) {
            let parameter = self
                .parameters
                .entry(name.clone())
                .or_insert_with(|| ParameterExpr { name: name.clone(), ty });
            return Ok(Expr::Parameter(parameter.clone()));
        }
        if self.try_resolve_type(name).is_some() {
            return Err(BindErrorKind::TypeUsedAsValue(name.clone()).at(range));
        }
        Err(BindErrorKind::UnknownName(name.clone()).at(range))
    }

    /// Binds the left side of `.`: a dotted path not rooted in a variable may name a type.
    fn bind_receiver(&mut self, node: &Node) -> Result<Receiver> {
        if let Some(root) = node.root_ident()
            && self.environment.lookup(root).is_none()
            && let Some(path) = node.dotted_path()
            && let Some(ty) = self.try_resolve_type(&path)
        {
            self.check_visible(ty, node.range)?;
            return Ok(Receiver::Type(ty));
        }
        if let NodeKind::Member { target, name } = &node.kind {
            let receiver = self.bind_receiver(target)?;
            return Ok(Receiver::Value(self.bind_member(receiver, name, node.range)?));
        }
        Ok(Receiver::Value(self.bind(node)?))
    }

    fn bind_member(&mut self, receiver: Receiver, name: &SmolStr, range: TextRange) -> Result<Expr> {
        let (receiver, ty, is_static) = match receiver {
            Receiver::Value(expr) => {
                let ty = expr.ty();
                (Some(expr), ty, false)
            }
            Receiver::Type(ty) => (None, ty, true),
        };
        match self.universe.find_member(ty, name) {
            Some(member) if member.is_static == is_static => Ok(Expr::member(receiver, member.clone())),
            _ => Err(BindErrorKind::UnknownMember(self.name(ty), name.clone()).at(range)),
        }
    }

    fn bind_call(&mut self, receiver: Receiver, name: &SmolStr, args: &[Node], range: TextRange) -> Result<Expr> {
        let (receiver, ty, is_static) = match receiver {
            Receiver::Value(expr) => {
                let ty = expr.ty();
                (Some(expr), ty, false)
            }
            Receiver::Type(ty) => (None, ty, true),
        };
        let arguments = self.bind_all(args)?;
        let candidates: Vec<MethodRef> = self
            .universe
            .find_methods(ty, name)
            .into_iter()
            .filter(|m| m.is_static == is_static && m.parameters.len() == arguments.len())
            .cloned()
            .collect();
        if candidates.is_empty() && self.universe.find_methods(ty, name).is_empty() {
            return Err(BindErrorKind::UnknownMember(self.name(ty), name.clone()).at(range));
        }

        for method in candidates {
            if let Some(converted) = self.coerce_all(&arguments, &method.parameters, args) {
                return Ok(Expr::call(receiver, method, converted));
            }
        }
        Err(BindErrorKind::NoOverload(self.name(ty), name.clone(), arguments.len()).at(range))
    }

    fn bind_index(&mut self, target: &Node, args: &[Node], range: TextRange) -> Result<Expr> {
        let target = self.bind(target)?;
        let ty = target.ty();
        let arguments = self.bind_all(args)?;

        if let Some(element) = self.universe.element_type(ty) {
            let int32 = self.universe.core().int32;
            let indexes = arguments
                .into_iter()
                .zip(args)
                .map(|(index, node)| self.coerce(index, int32, node.range))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Expr::ArrayIndex(ArrayIndexExpr {
                array: Box::new(target),
                indexes,
                ty: element,
            }));
        }

        let Some(indexer) = self.universe.find_indexer(ty).cloned() else {
            return Err(BindErrorKind::NotIndexable(self.name(ty)).at(range));
        };
        match self.coerce_all(&arguments, &indexer.parameters, args) {
            Some(converted) => Ok(Expr::call(Some(target), indexer, converted)),
            None => Err(BindErrorKind::NoOverload(self.name(ty), indexer.name.clone(), arguments.len()).at(range)),
        }
    }

    fn bind_new(&mut self, type_name: &TypeName, args: &[Node], range: TextRange) -> Result<Expr> {
        let ty = self.resolve_type(type_name)?;
        let arguments = self.bind_all(args)?;
        let constructors = self.universe.constructors(ty);
        let is_interface = self
            .universe
            .get(ty)
            .is_some_and(|info| matches!(info.kind, TypeKind::Interface) || info.is_generic_definition);

        if !is_interface {
            for constructor in constructors {
                if constructor.parameters.len() != arguments.len() {
                    continue;
                }
                if let Some(converted) = self.coerce_all(&arguments, &constructor.parameters, args) {
                    return Ok(Expr::New(NewExpr {
                        constructor: Some(constructor.clone()),
                        arguments: converted,
                        ty,
                    }));
                }
            }
            if constructors.is_empty() && arguments.is_empty() {
                let constructor = (!self.universe.is_value_type(ty)).then(|| ConstructorRef {
                    declaring_type: ty,
                    parameters: Vec::new(),
                });
                return Ok(Expr::New(NewExpr {
                    constructor,
                    arguments,
                    ty,
                }));
            }
        }
        Err(BindErrorKind::NoConstructor(self.name(ty), arguments.len()).at(range))
    }

    fn bind_new_array(&mut self, element: &TypeName, items: &[Node], range: TextRange) -> Result<Expr> {
        let element_ty = self.resolve_type(element)?;
        let Some(array) = self.universe.find_array(element_ty, 1) else {
            return Err(BindErrorKind::ArrayUnavailable(self.name(element_ty)).at(range));
        };
        let expressions = items
            .iter()
            .map(|item| {
                let bound = self.bind(item)?;
                self.coerce(bound, element_ty, item.range)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Expr::NewArray(NewArrayExpr {
            kind: NewArrayKind::Init,
            expressions,
            ty: array,
        }))
    }

    fn bind_unary(&mut self, op: UnaryOperator, operand: &Node, range: TextRange) -> Result<Expr> {
        let operand = self.bind(operand)?;
        let ty = operand.ty();
        let (unary, symbol, valid) = match op {
            UnaryOperator::Negate => (UnaryOp::Negate, "-", self.universe.is_numeric(ty)),
            UnaryOperator::Not => (UnaryOp::Not, "!", ty == self.universe.core().boolean),
        };
        if !valid {
            return Err(BindErrorKind::UnaryOperand(symbol, self.name(ty)).at(range));
        }
        Ok(Expr::Unary(UnaryExpr {
            op: unary,
            operand: Box::new(operand),
            ty,
        }))
    }

    fn bind_binary(&mut self, op: BinaryOperator, left: &Node, right: &Node, range: TextRange) -> Result<Expr> {
        let left = self.bind(left)?;
        let right = self.bind(right)?;
        let core = *self.universe.core();
        let (lt, rt) = (left.ty(), right.ty());
        let mismatch = |binder: &Self| {
            BindErrorKind::BinaryOperands(symbol(op), binder.name(lt), binder.name(rt)).at(range)
        };

        match op {
            BinaryOperator::Add if lt == core.string && rt == core.string => {
                let concat = self
                    .universe
                    .find_methods(core.string, "Concat")
                    .into_iter()
                    .find(|m| m.is_static && m.parameters == [core.string, core.string])
                    .cloned()
                    .ok_or_else(|| mismatch(self))?;
                Ok(Expr::call(None, concat, vec![left, right]))
            }
            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::Mod => {
                let (left, right, ty) = self.promote(left, right).ok_or_else(|| mismatch(self))?;
                Ok(Expr::binary(arithmetic(op), left, right, ty))
            }
            BinaryOperator::Lt | BinaryOperator::Lte | BinaryOperator::Gt | BinaryOperator::Gte => {
                let (left, right, _) = self.promote(left, right).ok_or_else(|| mismatch(self))?;
                Ok(Expr::binary(arithmetic(op), left, right, core.boolean))
            }
            BinaryOperator::Eq | BinaryOperator::Ne => {
                let (left, right) = match self.promote(left.clone(), right.clone()) {
                    Some((left, right, _)) => (left, right),
                    None if lt == rt
                        || is_null(&left) && !self.universe.is_value_type(rt)
                        || is_null(&right) && !self.universe.is_value_type(lt)
                        || self.universe.is_assignable(lt, rt)
                        || self.universe.is_assignable(rt, lt) =>
                    {
                        (left, right)
                    }
                    None => return Err(mismatch(self)),
                };
                Ok(Expr::binary(arithmetic(op), left, right, core.boolean))
            }
            BinaryOperator::And | BinaryOperator::Or => {
                if lt != core.boolean || rt != core.boolean {
                    return Err(mismatch(self));
                }
                Ok(Expr::binary(arithmetic(op), left, right, core.boolean))
            }
        }
    }

    fn bind_conditional(&mut self, test: &Node, if_true: &Node, if_false: &Node, range: TextRange) -> Result<Expr> {
        let test_range = test.range;
        let test = self.bind(test)?;
        let test = self.coerce(test, self.universe.core().boolean, test_range)?;
        let if_true = self.bind(if_true)?;
        let if_false = self.bind(if_false)?;
        let (tt, ft) = (if_true.ty(), if_false.ty());

        let ty = if tt == ft {
            tt
        } else if is_null(&if_true) && !self.universe.is_value_type(ft) {
            ft
        } else if is_null(&if_false) && !self.universe.is_value_type(tt) {
            tt
        } else if self.universe.is_widening(tt, ft) || self.universe.is_assignable(tt, ft) {
            ft
        } else if self.universe.is_widening(ft, tt) || self.universe.is_assignable(ft, tt) {
            tt
        } else {
            return Err(BindErrorKind::ConditionalBranches(self.name(tt), self.name(ft)).at(range));
        };

        let if_true = self.coerce(if_true, ty, range)?;
        let if_false = self.coerce(if_false, ty, range)?;
        Ok(Expr::Conditional(ConditionalExpr {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            ty,
        }))
    }

    fn bind_all(&mut self, nodes: &[Node]) -> Result<Vec<Expr>> {
        nodes.iter().map(|node| self.bind(node)).collect()
    }

    fn coerce_all(&self, arguments: &[Expr], parameters: &[TypeId], nodes: &[Node]) -> Option<Vec<Expr>> {
        if arguments.len() != parameters.len() {
            return None;
        }
        arguments
            .iter()
            .zip(parameters)
            .zip(nodes)
            .map(|((argument, parameter), node)| self.coerce(argument.clone(), *parameter, node.range).ok())
            .collect()
    }

    /// Brings two numeric operands to their common type.
    fn promote(&self, left: Expr, right: Expr) -> Option<(Expr, Expr, TypeId)> {
        let (lt, rt) = (left.ty(), right.ty());
        if !self.universe.is_numeric(lt) || !self.universe.is_numeric(rt) {
            return None;
        }
        let ty = if lt == rt || self.universe.is_widening(rt, lt) { lt } else { rt };
        let widen = |expr: Expr| {
            if expr.ty() == ty {
                expr
            } else {
                Expr::convert(ConvertKind::Convert, expr, ty)
            }
        };
        Some((widen(left), widen(right), ty))
    }

    fn resolve_type(&self, type_name: &TypeName) -> Result<TypeId> {
        let name = &type_name.name;
        let matches = self.type_candidates(name);
        let ty = match matches.as_slice() {
            [] => return Err(BindErrorKind::UnknownType(name.clone()).at(type_name.range)),
            [ty] => *ty,
            _ => {
                let names = matches.iter().map(|ty| format!("`{}`", self.universe.full_name(*ty))).join(" and ");
                return Err(BindErrorKind::AmbiguousType(name.clone(), names).at(type_name.range));
            }
        };
        self.check_visible(ty, type_name.range)?;
        Ok(ty)
    }

    fn try_resolve_type(&self, name: &str) -> Option<TypeId> {
        match self.type_candidates(name).as_slice() {
            [ty] => Some(*ty),
            _ => None,
        }
    }

    /// Types `name` may refer to: an alias, a full name, or a name under an imported namespace.
    fn type_candidates(&self, name: &str) -> Vec<TypeId> {
        let name = expand_alias(name);
        if let Some(ty) = self.universe.find_type(name) {
            return vec![ty];
        }
        self.namespaces
            .iter()
            .filter_map(|ns| self.universe.find_type(&format!("{ns}.{name}")))
            .unique()
            .collect()
    }

    /// With assembly hints present, types outside the core assembly must come from a hinted one.
    fn check_visible(&self, ty: TypeId, range: TextRange) -> Result<()> {
        if self.assemblies.is_empty() {
            return Ok(());
        }
        let Some(assembly) = self.universe.assembly_of(ty) else {
            return Ok(());
        };
        if assembly.name.name == CORE_ASSEMBLY || self.assemblies.iter().any(|a| a.name == assembly.name.name) {
            return Ok(());
        }
        Err(BindErrorKind::AssemblyNotReferenced(self.universe.full_name(ty), assembly.name.name.clone()).at(range))
    }

    fn name(&self, ty: TypeId) -> String {
        self.universe.display_name(ty)
    }
}

/// The full core type name `name` abbreviates, or `name` itself.
pub fn expand_alias(name: &str) -> &str {
    TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, full)| *full)
}

fn is_null(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Constant(ConstantExpr {
            value: ConstantValue::Null,
            ..
        })
    )
}

fn arithmetic(op: BinaryOperator) -> BinaryOp {
    match op {
        BinaryOperator::Add => BinaryOp::Add,
        BinaryOperator::Sub => BinaryOp::Subtract,
        BinaryOperator::Mul => BinaryOp::Multiply,
        BinaryOperator::Div => BinaryOp::Divide,
        BinaryOperator::Mod => BinaryOp::Modulo,
        BinaryOperator::Lt => BinaryOp::LessThan,
        BinaryOperator::Lte => BinaryOp::LessThanOrEqual,
        BinaryOperator::Gt => BinaryOp::GreaterThan,
        BinaryOperator::Gte => BinaryOp::GreaterThanOrEqual,
        BinaryOperator::Eq => BinaryOp::Equal,
        BinaryOperator::Ne => BinaryOp::NotEqual,
        BinaryOperator::And => BinaryOp::AndAlso,
        BinaryOperator::Or => BinaryOp::OrElse,
    }
}

fn symbol(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Add => "+",
        BinaryOperator::Sub => "-",
        BinaryOperator::Mul => "*",
        BinaryOperator::Div => "/",
        BinaryOperator::Mod => "%",
        BinaryOperator::Lt => "<",
        BinaryOperator::Lte => "<=",
        BinaryOperator::Gt => ">",
        BinaryOperator::Gte => ">=",
        BinaryOperator::Eq => "==",
        BinaryOperator::Ne => "!=",
        BinaryOperator::And => "&&",
        BinaryOperator::Or => "||",
    }
}
