//! Boundary to the per-language expression compiler.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use thiserror::Error;

use crate::environment::Environment;
use crate::error::SourceDiagnostic;
use crate::expr::CompiledExpression;
use crate::types::{AssemblyName, TypeId};

/// Failure reported by a compile session.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Malformed or ill-typed expression text.
    #[error(transparent)]
    Source(#[from] SourceDiagnostic),
    /// Anything else: misconfiguration, internal faults.
    #[error("{0}")]
    Internal(String),
}

/// Envelope a targeted (type-specialised) compilation wraps its failure in.
#[derive(Debug, Clone, Error)]
#[error("targeted compilation failed: {inner}")]
pub struct DispatchError {
    pub inner: BackendError,
}

impl DispatchError {
    pub fn new(inner: impl Into<BackendError>) -> Self {
        Self { inner: inner.into() }
    }

    pub fn into_inner(self) -> BackendError {
        self.inner
    }
}

impl From<SourceDiagnostic> for DispatchError {
    fn from(diagnostic: SourceDiagnostic) -> Self {
        Self::new(diagnostic)
    }
}

/// A compiler for one expression language.
pub trait ExpressionCompiler {
    type Session: CompileSession;

    /// Language identifier expressions must declare to be compiled here.
    fn language(&self) -> &str;

    /// Prepares a session for one expression text under the given hints.
    fn session(
        &self,
        expression_text: &str,
        assemblies: &FxHashSet<AssemblyName>,
        namespaces: &FxHashSet<SmolStr>,
    ) -> Self::Session;
}

/// One expression text, ready to be compiled against an environment.
pub trait CompileSession {
    /// Compiles without an expected type; the result type is inferred.
    fn compile_inferred(&self, environment: &Environment) -> Result<CompiledExpression, BackendError>;

    /// Compiles specialised to `target`; the result type must be `target`.
    fn compile_targeted(
        &self,
        environment: &Environment,
        target: TypeId,
    ) -> Result<CompiledExpression, DispatchError>;

    /// Explanation of why `compiled` is not an assignable location, if the
    /// backend has a better one than the structural check.
    fn explain_non_location(&self, _compiled: &CompiledExpression) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_envelope_unwraps() {
        let diagnostic = SourceDiagnostic::new("x +", "unexpected end");
        let envelope = DispatchError::from(diagnostic.clone());
        assert!(matches!(envelope.into_inner(), BackendError::Source(d) if d == diagnostic));

        let envelope = DispatchError::new(BackendError::Internal("no compiler".to_string()));
        assert_eq!(envelope.to_string(), "targeted compilation failed: no compiler");
    }
}
