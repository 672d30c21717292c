//! Reference closure over a compiled expression tree.
//!
//! Walks every node of an [`Expr`] and collects the nominal types that a persisted
//! definition must be able to name in order to recompile the same text:
//!
//! - each node kind contributes its anchor types (constant value types, declaring
//!   types of static members, constructors and static calls, conversion targets,
//!   parameter and member types, call signatures);
//! - every collected type is expanded with its interfaces and its base chain up
//!   to, but excluding, the universal root;
//! - a reference is either *direct* (needed verbatim at the use site, always
//!   kept) or *non-direct* (dropped when its defining assembly is a default one).

use indexmap::IndexSet;
use rustc_hash::FxHashSet;

use crate::config::DefaultAssemblies;
use crate::expr::{ConstantValue, ElementInit, Expr, MemberBinding, MemberBindingKind, NewExpr};
use crate::types::{TypeId, TypeUniverse};

/// Collects the type closure of `expr`. Types are returned in first-discovery order.
pub fn collect_type_references(
    expr: &Expr,
    universe: &TypeUniverse,
    defaults: &DefaultAssemblies,
) -> IndexSet<TypeId> {
    let mut collector = TypeReferenceCollector::new(universe, defaults);
    collector.visit(expr);
    collector.finish()
}

/// Stateful form of [`collect_type_references`], usable across several trees.
pub struct TypeReferenceCollector<'a> {
    universe: &'a TypeUniverse,
    defaults: &'a DefaultAssemblies,
    references: IndexSet<TypeId>,
    expanded: FxHashSet<TypeId>,
}

impl<'a> TypeReferenceCollector<'a> {
    pub fn new(universe: &'a TypeUniverse, defaults: &'a DefaultAssemblies) -> Self {
        Self {
            universe,
            defaults,
            references: IndexSet::new(),
            expanded: FxHashSet::default(),
        }
    }

    pub fn finish(self) -> IndexSet<TypeId> {
        self.references
    }

    pub fn visit(&mut self, expr: &Expr) {
        match expr {
            Expr::Binary(binary) => {
                self.visit(&binary.left);
                self.visit(&binary.right);
            }
            Expr::Conditional(conditional) => {
                self.visit(&conditional.test);
                self.visit(&conditional.if_true);
                self.visit(&conditional.if_false);
            }
            Expr::Constant(constant) => match &constant.value {
                ConstantValue::Type(ty) => self.ensure_referenced(*ty, true),
                ConstantValue::Value { runtime_type, .. } => self.ensure_referenced(*runtime_type, true),
                ConstantValue::Null => {}
            },
            Expr::Invoke(invoke) => {
                self.visit(&invoke.target);
                self.visit_all(&invoke.arguments);
            }
            Expr::Lambda(lambda) => {
                self.visit(&lambda.body);
                for parameter in &lambda.parameters {
                    self.ensure_referenced(parameter.ty, false);
                }
            }
            Expr::ListInit(list_init) => {
                self.visit_new(&list_init.new_expression);
                self.visit_initializers(&list_init.initializers);
            }
            Expr::Parameter(parameter) => self.ensure_referenced(parameter.ty, false),
            Expr::MemberAccess(member_access) => {
                match &member_access.receiver {
                    Some(receiver) => self.visit(receiver),
                    None => self.ensure_referenced(member_access.member.declaring_type, true),
                }
                self.ensure_referenced(member_access.ty, false);
            }
            Expr::MemberInit(member_init) => {
                self.visit_new(&member_init.new_expression);
                for binding in &member_init.bindings {
                    self.visit_binding(binding);
                }
            }
            Expr::ArrayIndex(array_index) => {
                self.visit(&array_index.array);
                self.visit_all(&array_index.indexes);
            }
            Expr::Call(call) => {
                let method = &call.method;
                match &call.receiver {
                    Some(receiver) => self.visit(receiver),
                    None => self.ensure_referenced(method.declaring_type, true),
                }
                self.ensure_referenced(call.ty, false);
                if method.is_closed_generic(self.universe) {
                    for argument in method.generic_arguments.iter().skip(1) {
                        self.ensure_referenced(*argument, false);
                    }
                }
                for parameter in &method.parameters {
                    self.ensure_referenced(*parameter, false);
                }
                self.visit_all(&call.arguments);
            }
            Expr::NewArray(new_array) => {
                if let Some(element) = self.universe.element_type(new_array.ty) {
                    self.ensure_referenced(element, true);
                }
                self.visit_all(&new_array.expressions);
            }
            Expr::New(new) => self.visit_new(new),
            Expr::TypeIs(type_is) => {
                self.visit(&type_is.operand);
                self.ensure_referenced(type_is.type_operand, true);
            }
            Expr::Convert(convert) => {
                self.visit(&convert.operand);
                self.ensure_referenced(convert.ty, true);
            }
            Expr::Unary(unary) => self.visit(&unary.operand),
            Expr::Block(block) => {
                for variable in &block.variables {
                    self.ensure_referenced(variable.ty, false);
                }
                self.visit_all(&block.expressions);
            }
            Expr::Assign(assign) => {
                self.visit(&assign.target);
                self.visit(&assign.value);
            }
        }
    }

    fn visit_all(&mut self, exprs: &[Expr]) {
        for expr in exprs {
            self.visit(expr);
        }
    }

    fn visit_new(&mut self, new: &NewExpr) {
        match &new.constructor {
            Some(constructor) => self.ensure_referenced(constructor.declaring_type, true),
            None => self.ensure_referenced(new.ty, true),
        }
        self.visit_all(&new.arguments);
    }

    fn visit_initializers(&mut self, initializers: &[ElementInit]) {
        for initializer in initializers {
            self.visit_all(&initializer.arguments);
        }
    }

    fn visit_binding(&mut self, binding: &MemberBinding) {
        match &binding.kind {
            MemberBindingKind::Assignment(expr) => self.visit(expr),
            MemberBindingKind::ListBinding(initializers) => self.visit_initializers(initializers),
            MemberBindingKind::MemberBinding(bindings) => {
                for nested in bindings {
                    self.visit_binding(nested);
                }
            }
        }
    }

    /// Adds `ty`, unwrapping array element types and pulling in the non-first
    /// arguments of closed generic types with the same directness.
    pub fn ensure_referenced(&mut self, ty: TypeId, is_direct: bool) {
        if let Some(element) = self.universe.element_type(ty) {
            self.ensure_referenced(element, is_direct);
            return;
        }

        let universe = self.universe;
        self.ensure_referenced_recurse(ty, is_direct);
        if universe.is_closed_generic(ty) {
            for argument in universe.generic_arguments(ty).iter().skip(1) {
                self.ensure_referenced(*argument, is_direct);
            }
        }
    }

    fn ensure_referenced_recurse(&mut self, ty: TypeId, is_direct: bool) {
        if self.references.contains(&ty) {
            return;
        }

        // non-direct references into default assemblies would only produce no-op imports
        if is_direct || !self.defaults.defines(self.universe, ty) {
            tracing::trace!(
                ty = %self.universe.full_name(ty),
                is_direct,
                "adding type reference"
            );
            self.references.insert(ty);
        }

        if !self.expanded.insert(ty) {
            return;
        }

        let universe = self.universe;
        for interface in universe.interfaces(ty) {
            self.ensure_referenced_recurse(*interface, false);
        }

        let root = universe.object();
        let mut base = universe.base_type(ty);
        while let Some(base_type) = base.filter(|b| *b != root) {
            self.ensure_referenced_recurse(base_type, false);
            base = universe.base_type(base_type);
        }
    }
}
