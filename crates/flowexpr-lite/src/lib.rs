//! Lite: a small, statically typed expression language and a reference
//! [`flowexpr::ExpressionCompiler`] backend for it.
//!
//! Lite covers member access, method and indexer calls, object and array
//! creation, `typeof`/`is`/`as`, unary and binary operators, the conditional
//! operator and assignment. Types and variables come from a [`Schema`].
//!
//! ```text
//! let schema = Schema::from_file(Path::new("crm.toml"))?;
//! let universe = Arc::new(schema.universe);
//! let compiler = LiteCompiler::new(Arc::clone(&universe));
//! let recompiler = Recompiler::new(compiler, universe, &EngineConfig::default());
//! ```

pub mod ast;
pub mod binder;
pub mod lexer;
pub mod parser;
pub mod schema;

use std::sync::Arc;

use flowexpr::expr::Expr;
use flowexpr::{
    AssemblyName, BackendError, CompileSession, CompiledExpression, DispatchError, Environment, ExpressionCompiler,
    SourceDiagnostic, TypeId, TypeUniverse,
};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::trace;

pub use binder::{BindError, BindErrorKind, Binder};
pub use lexer::error::LexerError;
pub use lexer::token::TextRange;
pub use parser::ParseError;
pub use schema::{Schema, SchemaError};

/// Language identifier Lite expressions declare.
pub const LANGUAGE: &str = "Lite";

#[derive(Debug, Clone)]
pub struct LiteCompiler {
    universe: Arc<TypeUniverse>,
}

impl LiteCompiler {
    pub fn new(universe: Arc<TypeUniverse>) -> Self {
        Self { universe }
    }

    pub fn universe(&self) -> &Arc<TypeUniverse> {
        &self.universe
    }
}

impl ExpressionCompiler for LiteCompiler {
    type Session = LiteSession;

    fn language(&self) -> &str {
        LANGUAGE
    }

    fn session(
        &self,
        expression_text: &str,
        assemblies: &FxHashSet<AssemblyName>,
        namespaces: &FxHashSet<SmolStr>,
    ) -> Self::Session {
        LiteSession {
            universe: Arc::clone(&self.universe),
            text: expression_text.to_string(),
            assemblies: assemblies.clone(),
            namespaces: namespaces.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiteSession {
    universe: Arc<TypeUniverse>,
    text: String,
    assemblies: FxHashSet<AssemblyName>,
    namespaces: FxHashSet<SmolStr>,
}

impl LiteSession {
    fn binder<'a>(&'a self, environment: &'a Environment) -> Binder<'a> {
        Binder::new(&self.universe, environment, &self.namespaces, &self.assemblies)
    }

    fn diagnostic(&self, message: impl ToString, range: TextRange) -> SourceDiagnostic {
        SourceDiagnostic::new(self.text.as_str(), message.to_string()).with_span(range.offset, range.len)
    }

    fn compile(&self, environment: &Environment) -> Result<CompiledExpression, SourceDiagnostic> {
        let tokens = lexer::tokenize(&self.text).map_err(|e| self.diagnostic(&e, e.range()))?;
        trace!(tokens = tokens.len(), "tokenized expression");
        let node = parser::parse(&tokens).map_err(|e| self.diagnostic(&e, e.range()))?;
        self.binder(environment)
            .bind_expression(&node)
            .map_err(|e| self.diagnostic(&e, e.range))
    }
}

impl CompileSession for LiteSession {
    fn compile_inferred(&self, environment: &Environment) -> Result<CompiledExpression, BackendError> {
        Ok(self.compile(environment)?)
    }

    fn compile_targeted(
        &self,
        environment: &Environment,
        target: TypeId,
    ) -> Result<CompiledExpression, DispatchError> {
        let compiled = self.compile(environment)?;
        if compiled.return_type == target {
            return Ok(compiled);
        }
        if self.universe.get(target).is_none() {
            return Err(DispatchError::new(BackendError::Internal(
                "target type is not part of the type universe".to_string(),
            )));
        }

        let whole = TextRange::new(0, self.text.len());
        let CompiledExpression { parameters, body, .. } = compiled;
        let body = self
            .binder(environment)
            .coerce(body, target, whole)
            .map_err(|e| self.diagnostic(&e, e.range))?;
        Ok(CompiledExpression::new(body).with_parameters(parameters))
    }

    fn explain_non_location(&self, compiled: &CompiledExpression) -> Option<String> {
        let fragment = match &compiled.body {
            Expr::Constant(_) => "a constant value cannot be assigned to",
            Expr::Binary(_) | Expr::Unary(_) | Expr::Conditional(_) => {
                "the result of an operator cannot be assigned to"
            }
            Expr::Call(call) if call.method.kind == flowexpr::types::MethodKind::Ordinary => {
                "the result of a method call cannot be assigned to"
            }
            Expr::New(_) | Expr::NewArray(_) => "a newly created value cannot be assigned to",
            Expr::Convert(_) | Expr::TypeIs(_) => "the result of a type test or conversion cannot be assigned to",
            _ => return None,
        };
        Some(fragment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use flowexpr::expr::ConvertKind;
    use rstest::rstest;

    use super::*;

    fn session(text: &str) -> (LiteSession, Environment) {
        let universe = Arc::new(TypeUniverse::new());
        let core = *universe.core();
        let environment = Environment::new().bind("x", core.int32).bind("name", core.string);
        let compiler = LiteCompiler::new(universe);
        let session = compiler.session(text, &FxHashSet::default(), &FxHashSet::default());
        (session, environment)
    }

    #[test]
    fn test_compile_inferred() {
        let (session, environment) = session("x + 1");
        let compiled = session.compile_inferred(&environment).unwrap();
        assert_eq!(compiled.return_type, session.universe.core().int32);
        assert_eq!(compiled.parameters.len(), 1);
    }

    #[rstest]
    #[case::lexer("x # 1", "Unexpected character `#`", (2, 1))]
    #[case::parser("x +", "Unexpected end of expression", (3, 0))]
    #[case::binder("y", "The name `y` does not exist in the current context", (0, 1))]
    fn test_source_diagnostics(#[case] text: &str, #[case] message: &str, #[case] span: (usize, usize)) {
        let (session, environment) = session(text);
        let Err(BackendError::Source(diagnostic)) = session.compile_inferred(&environment) else {
            panic!("expected a source diagnostic");
        };
        assert_eq!(diagnostic.message, message);
        assert_eq!(diagnostic.expression_text, text);
        assert_eq!(diagnostic.span, Some(span.into()));
    }

    #[test]
    fn test_deep_nesting_is_a_source_diagnostic() {
        let text = format!("{}x{}", "(".repeat(5_000), ")".repeat(5_000));
        let (session, environment) = session(&text);
        let Err(BackendError::Source(diagnostic)) = session.compile_inferred(&environment) else {
            panic!("expected a source diagnostic");
        };
        assert_eq!(diagnostic.message, "Expression is nested too deeply");
        assert_eq!(diagnostic.span, Some((128usize, 1usize).into()));
    }

    #[test]
    fn test_compile_targeted_widens() {
        let (session, environment) = session("x");
        let double = session.universe.core().double;
        let compiled = session.compile_targeted(&environment, double).unwrap();
        assert_eq!(compiled.return_type, double);
        assert!(matches!(&compiled.body, Expr::Convert(c) if c.kind == ConvertKind::Convert));
        assert_eq!(compiled.parameters.len(), 1);
    }

    #[test]
    fn test_compile_targeted_rejects_narrowing() {
        let (session, environment) = session("name");
        let int32 = session.universe.core().int32;
        let err = session.compile_targeted(&environment, int32).unwrap_err();
        let BackendError::Source(diagnostic) = err.into_inner() else {
            panic!("expected a source diagnostic");
        };
        assert_eq!(diagnostic.message, "Cannot implicitly convert type `String` to `Int32`");
    }

    #[rstest]
    #[case::constant("1", Some("a constant value cannot be assigned to"))]
    #[case::operator("x + 1", Some("the result of an operator cannot be assigned to"))]
    #[case::call("name.ToUpper()", Some("the result of a method call cannot be assigned to"))]
    #[case::parameter("x", None)]
    #[case::member("name.Length", None)]
    fn test_explain_non_location(#[case] text: &str, #[case] expected: Option<&str>) {
        let (session, environment) = session(text);
        let compiled = session.compile_inferred(&environment).unwrap();
        assert_eq!(session.explain_non_location(&compiled).as_deref(), expected);
    }
}
